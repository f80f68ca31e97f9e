//! Authentication module
//!
//! Password hashing, JWT issuance and decoding, the refresh-token whitelist
//! and the bearer-token extractor.

pub mod clock;
mod jwt;
mod middleware;
mod password;
pub mod revocation;
pub mod seed_accounts;

pub use clock::{Clock, ManualClock, SystemClock};
pub use jwt::{Access, Claims, JwtService, Refresh, TokenClaims, TokenKind};
pub use middleware::AuthUser;
pub use password::PasswordService;
pub use revocation::{Consumed, RevocationStore};
