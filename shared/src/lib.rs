//! Reelforge Shared Library
//!
//! Shared API types, the authentication error taxonomy and input
//! validation used by the backend and the WASM module.

pub mod errors;
pub mod types;
pub mod validation;

// Re-export commonly used items
pub use errors::*;
pub use types::*;
