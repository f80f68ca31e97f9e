//! Error types for the Reelforge application

use thiserror::Error;

/// Authentication error types
///
/// The `Display` text is for logs. Clients only ever see
/// [`AuthError::public_message`], which never tells an unknown account
/// apart from a wrong password.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Inactive user")]
    InactiveUser,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("User not found")]
    UserNotFound,

    #[error("Missing token")]
    MissingToken,
}

impl AuthError {
    /// Message safe to return to the client
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials | AuthError::InactiveUser => {
                "Incorrect email or password"
            }
            AuthError::InvalidToken | AuthError::TokenRevoked | AuthError::UserNotFound => {
                "Could not validate credentials"
            }
            AuthError::MissingToken => "Not authenticated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_failures_share_message() {
        assert_eq!(
            AuthError::InvalidCredentials.public_message(),
            AuthError::InactiveUser.public_message()
        );
    }

    #[test]
    fn test_token_failures_share_message() {
        assert_eq!(
            AuthError::InvalidToken.public_message(),
            AuthError::TokenRevoked.public_message()
        );
        assert_eq!(
            AuthError::TokenRevoked.public_message(),
            AuthError::UserNotFound.public_message()
        );
    }
}
