/// Input validators for the auth endpoints
///
/// Values are trimmed before checking. Email stays case-sensitive: it is
/// the lookup key and is stored exactly as given.

use lazy_static::lazy_static;
use regex::Regex;

use crate::auth::MAX_PASSWORD_BYTES;
use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MAX_NAME_LENGTH: usize = 256;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).expect("email regex is valid");
}

/// Validates an email address for registration
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = require("email", email)?;

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    if let Some(at_pos) = trimmed.find('@') {
        if at_pos > 64 {
            return Err(ValidationError::SuspiciousContent("email".to_string()));
        }
    }

    Ok(trimmed.to_string())
}

/// Validates a display name
pub fn is_valid_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = require("name", name)?;

    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong("name".to_string(), MAX_NAME_LENGTH));
    }

    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::SuspiciousContent("name".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates a password before hashing. Not trimmed: whitespace is significant.
pub fn is_valid_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()));
    }

    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_BYTES,
        ));
    }

    Ok(())
}

/// Presence check; returns the trimmed value
pub fn require<'a>(field: &str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field.to_string()));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(is_valid_email("user@example.com").is_ok());
        assert!(is_valid_email("test.email@domain.co.uk").is_ok());
        assert!(is_valid_email("user+tag@example.com").is_ok());
        assert!(is_valid_email("jon@x.com").is_ok());
    }

    #[test]
    fn test_email_is_trimmed_but_keeps_case() {
        assert_eq!(is_valid_email("  Jon@X.com ").unwrap(), "Jon@X.com");
    }

    #[test]
    fn test_invalid_email_format() {
        assert!(is_valid_email("invalid").is_err());
        assert!(is_valid_email("user@").is_err());
        assert!(is_valid_email("@example.com").is_err());
        assert!(is_valid_email("user@@example.com").is_err());
        assert_eq!(
            is_valid_email("   "),
            Err(ValidationError::EmptyField("email".to_string()))
        );
    }

    #[test]
    fn test_email_length_limits() {
        let too_long = format!("{}@example.com", "a".repeat(250));
        assert!(is_valid_email(&too_long).is_err());

        let long_local = format!("{}@example.com", "a".repeat(65));
        assert_eq!(
            is_valid_email(&long_local),
            Err(ValidationError::SuspiciousContent("email".to_string()))
        );
    }

    #[test]
    fn test_valid_name() {
        assert!(is_valid_name("Jon").is_ok());
        assert!(is_valid_name("Jean-Pierre").is_ok());
        assert!(is_valid_name("O'Brien").is_ok());
    }

    #[test]
    fn test_name_limits() {
        assert!(is_valid_name(&"a".repeat(257)).is_err());
        assert!(is_valid_name("").is_err());
        assert!(is_valid_name("Name\0with\0null").is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(is_valid_password("secret").is_ok());
        assert!(is_valid_password(" ").is_ok());
        assert_eq!(
            is_valid_password(""),
            Err(ValidationError::EmptyField("password".to_string()))
        );
        assert!(is_valid_password(&"a".repeat(MAX_PASSWORD_BYTES + 1)).is_err());
    }
}
