//! Reelforge WASM Module
//!
//! WebAssembly bindings that let the browser run the same registration
//! and profile validators as the backend before submitting a form.

use reelforge_shared::validation;
use wasm_bindgen::prelude::*;

/// Validate an email address; returns the error message or `None`
#[wasm_bindgen(js_name = checkEmail)]
pub fn check_email(email: &str) -> Option<String> {
    validation::validate_email(email).err()
}

/// Validate a username; returns the error message or `None`
#[wasm_bindgen(js_name = checkUsername)]
pub fn check_username(username: &str) -> Option<String> {
    validation::validate_username(username).err()
}

/// Validate a password; returns the error message or `None`
#[wasm_bindgen(js_name = checkPassword)]
pub fn check_password(password: &str) -> Option<String> {
    validation::validate_password(password).err()
}

/// Validate a whole registration form
///
/// Returns a JSON object `{"field": ..., "message": ...}` for the first
/// failing field, or `None` when the form is acceptable.
#[wasm_bindgen(js_name = checkRegistration)]
pub fn check_registration(
    email: &str,
    username: &str,
    password: &str,
    full_name: Option<String>,
) -> Option<String> {
    validation::validate_registration(email, username, password, full_name.as_deref())
        .err()
        .map(|e| {
            serde_json::json!({
                "field": e.field,
                "message": e.user_message(),
            })
            .to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_email() {
        assert!(check_email("a@x.com").is_none());
        assert!(check_email("nope").is_some());
    }

    #[test]
    fn test_check_registration_reports_first_field() {
        let report = check_registration("a@x.com", "alice", "short", None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&report).unwrap();
        assert_eq!(value["field"], "password");

        assert!(check_registration("a@x.com", "alice", "Secret123", None).is_none());
    }
}
