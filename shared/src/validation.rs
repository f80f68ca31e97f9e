//! Input validation functions
//!
//! Validators for account registration and profile updates. Used by the
//! backend before touching the user store and by the WASM bindings so the
//! browser forms can reject input early.

use once_cell::sync::Lazy;
use regex_lite::Regex;

/// Minimum username length
pub const USERNAME_MIN_LEN: usize = 3;
/// Maximum username length
pub const USERNAME_MAX_LEN: usize = 50;
/// Minimum password length
pub const PASSWORD_MIN_LEN: usize = 8;
/// Maximum password length
pub const PASSWORD_MAX_LEN: usize = 100;
/// Maximum full name length
pub const FULL_NAME_MAX_LEN: usize = 100;
/// Maximum avatar URL length
pub const AVATAR_URL_MAX_LEN: usize = 500;
/// Maximum bio length
pub const BIO_MAX_LEN: usize = 2000;

/// Minimal `local@domain.tld` shape, no whitespace
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// Validate email format
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email cannot be empty".to_string());
    }
    if !email.contains('@') || !email.contains('.') {
        return Err("Invalid email format".to_string());
    }
    if email.len() > 255 {
        return Err("Email too long".to_string());
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }
    Ok(())
}

/// Validate username
///
/// 3-50 characters of ASCII letters, digits, `_`, `.` or `-`.
pub fn validate_username(username: &str) -> Result<(), String> {
    let len = username.chars().count();
    if len < USERNAME_MIN_LEN {
        return Err(format!(
            "Username must be at least {} characters",
            USERNAME_MIN_LEN
        ));
    }
    if len > USERNAME_MAX_LEN {
        return Err(format!(
            "Username must be at most {} characters",
            USERNAME_MAX_LEN
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(
            "Username may only contain letters, digits, '_', '.' and '-'".to_string(),
        );
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), String> {
    let len = password.chars().count();
    if len < PASSWORD_MIN_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN_LEN
        ));
    }
    if len > PASSWORD_MAX_LEN {
        return Err("Password too long".to_string());
    }
    Ok(())
}

/// Validate optional display name
pub fn validate_full_name(full_name: &str) -> Result<(), String> {
    if full_name.chars().count() > FULL_NAME_MAX_LEN {
        return Err(format!(
            "Full name must be at most {} characters",
            FULL_NAME_MAX_LEN
        ));
    }
    Ok(())
}

/// Validate profile bio
pub fn validate_bio(bio: &str) -> Result<(), String> {
    if bio.chars().count() > BIO_MAX_LEN {
        return Err(format!("Bio must be at most {} characters", BIO_MAX_LEN));
    }
    Ok(())
}

/// Validate avatar URL (http or https only)
pub fn validate_avatar_url(url: &str) -> Result<(), String> {
    if url.len() > AVATAR_URL_MAX_LEN {
        return Err("Avatar URL too long".to_string());
    }
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err("Avatar URL must start with http:// or https://".to_string());
    }
    if url.chars().any(char::is_whitespace) {
        return Err("Avatar URL cannot contain whitespace".to_string());
    }
    Ok(())
}

// ============================================================================
// User-Friendly Field Labels
// ============================================================================

/// Map technical field names to user-friendly display labels
pub fn get_field_display_label(field_name: &str) -> &str {
    match field_name {
        "email" => "Email",
        "username" => "Username",
        "password" => "Password",
        "full_name" => "Full Name",
        "bio" => "Bio",
        "avatar_url" => "Avatar URL",
        _ => field_name,
    }
}

/// Validation error with field context
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub display_label: String,
}

impl ValidationError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
            display_label: get_field_display_label(field).to_string(),
        }
    }

    /// Format as user-friendly error message
    pub fn user_message(&self) -> String {
        format!("{}: {}", self.display_label, self.message)
    }
}

/// Validate every registration field, returning the first failure
pub fn validate_registration(
    email: &str,
    username: &str,
    password: &str,
    full_name: Option<&str>,
) -> Result<(), ValidationError> {
    validate_email(email).map_err(|m| ValidationError::new("email", &m))?;
    validate_username(username).map_err(|m| ValidationError::new("username", &m))?;
    validate_password(password).map_err(|m| ValidationError::new("password", &m))?;
    if let Some(name) = full_name {
        validate_full_name(name).map_err(|m| ValidationError::new("full_name", &m))?;
    }
    Ok(())
}

/// Validate the fields present in a profile update
pub fn validate_profile_update(
    full_name: Option<&str>,
    bio: Option<&str>,
    avatar_url: Option<&str>,
) -> Result<(), ValidationError> {
    if let Some(name) = full_name {
        validate_full_name(name).map_err(|m| ValidationError::new("full_name", &m))?;
    }
    if let Some(bio) = bio {
        validate_bio(bio).map_err(|m| ValidationError::new("bio", &m))?;
    }
    if let Some(url) = avatar_url {
        validate_avatar_url(url).map_err(|m| ValidationError::new("avatar_url", &m))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("test@example.com").is_ok());
        assert!(validate_email("user.name@domain.co.uk").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("no@dot").is_err());
        assert!(validate_email("spaces in@email.com").is_err());
    }

    #[test]
    fn test_email_pattern_is_shared_across_calls() {
        assert!(EMAIL_REGEX.is_match("a@b.co"));
        assert!(!EMAIL_REGEX.is_match("a@@b.co"));
        for _ in 0..3 {
            assert!(validate_email("repeat@example.com").is_ok());
        }
    }

    #[rstest]
    #[case("alice", true)]
    #[case("a.b-c_d", true)]
    #[case("ab", false)]
    #[case("has space", false)]
    #[case("émile", false)]
    #[case("x", false)]
    fn test_validate_username(#[case] username: &str, #[case] ok: bool) {
        assert_eq!(validate_username(username).is_ok(), ok);
    }

    #[test]
    fn test_username_length_bounds() {
        assert!(validate_username(&"a".repeat(USERNAME_MAX_LEN)).is_ok());
        assert!(validate_username(&"a".repeat(USERNAME_MAX_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("Secret123").is_ok());
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"a".repeat(PASSWORD_MAX_LEN)).is_ok());
        assert!(validate_password(&"a".repeat(PASSWORD_MAX_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_avatar_url() {
        assert!(validate_avatar_url("https://cdn.example.com/a.png").is_ok());
        assert!(validate_avatar_url("ftp://example.com/a.png").is_err());
        assert!(validate_avatar_url("https://example.com/a b.png").is_err());
    }

    #[test]
    fn test_validate_registration_reports_field() {
        let err = validate_registration("a@x.com", "al", "Secret123", None).unwrap_err();
        assert_eq!(err.field, "username");
        assert!(err.user_message().starts_with("Username:"));

        let err = validate_registration("a@x.com", "alice", "Secret123", Some(&"n".repeat(101)))
            .unwrap_err();
        assert_eq!(err.field, "full_name");

        assert!(validate_registration("a@x.com", "alice", "Secret123", Some("Alice")).is_ok());
    }

    #[test]
    fn test_validate_profile_update_skips_absent_fields() {
        assert!(validate_profile_update(None, None, None).is_ok());

        let err = validate_profile_update(None, Some(&"b".repeat(2001)), None).unwrap_err();
        assert_eq!(err.field, "bio");

        let err = validate_profile_update(Some("Alice"), None, Some("avatar.png")).unwrap_err();
        assert_eq!(err.field, "avatar_url");
    }

    proptest! {
        #[test]
        fn prop_short_passwords_rejected(password in "[a-zA-Z0-9]{0,7}") {
            prop_assert!(validate_password(&password).is_err());
        }

        #[test]
        fn prop_well_formed_usernames_accepted(username in "[a-zA-Z0-9_.-]{3,50}") {
            prop_assert!(validate_username(&username).is_ok());
        }
    }
}
