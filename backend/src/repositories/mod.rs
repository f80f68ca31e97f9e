//! Database repositories
//!
//! Provides data access layer for database operations.

pub mod user;

pub use user::{
    CreateUserError, MemoryUserStore, NewUser, PgUserRepository, UpdateUser, UserRecord,
    UserStore,
};
