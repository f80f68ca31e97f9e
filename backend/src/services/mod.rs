//! Business logic services
//!
//! Services encapsulate business logic and coordinate between
//! repositories, the token codec and the revocation store.

pub mod auth;
pub mod user;

pub use auth::AuthService;
pub use user::UserService;
