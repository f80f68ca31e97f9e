//! Built-in development accounts
//!
//! When `auth.seed_accounts` is enabled, logging in with one of these
//! credentials for an email that does not exist yet provisions the account
//! on the spot. Production config validation refuses to start with this on.

/// Role a seed account is created with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedRole {
    Admin,
    User,
    Guest,
}

/// A built-in account
#[derive(Debug, Clone, Copy)]
pub struct SeedAccount {
    pub email: &'static str,
    pub username: &'static str,
    pub password: &'static str,
    pub role: SeedRole,
}

impl SeedAccount {
    pub fn is_superuser(&self) -> bool {
        self.role == SeedRole::Admin
    }

    pub fn full_name(&self) -> &'static str {
        match self.role {
            SeedRole::Admin => "Test Admin",
            SeedRole::User => "Test User",
            SeedRole::Guest => "Test Guest",
        }
    }
}

pub const SEED_ACCOUNTS: &[SeedAccount] = &[
    SeedAccount {
        email: "test@reelforge.dev",
        username: "testuser",
        password: "Test123456!",
        role: SeedRole::User,
    },
    SeedAccount {
        email: "admin@reelforge.dev",
        username: "adminuser",
        password: "Admin123456!",
        role: SeedRole::Admin,
    },
    SeedAccount {
        email: "guest@reelforge.dev",
        username: "guestuser",
        password: "Guest123456!",
        role: SeedRole::Guest,
    },
];

/// Seed account matching both email and password
pub fn verify_credentials(email: &str, password: &str) -> Option<&'static SeedAccount> {
    SEED_ACCOUNTS
        .iter()
        .find(|account| account.email.eq_ignore_ascii_case(email) && account.password == password)
}
