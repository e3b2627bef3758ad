//! Input validation for sign-up fields
//!
//! Validated newtypes keep their field private so a value can only exist
//! after passing `new()`.

use std::fmt;

/// Validation errors for user input
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("Invalid length for {field}: expected {min}-{max}, got {actual}")]
    InvalidLength {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("Invalid format for {field}: '{value}' (expected: {expected})")]
    InvalidFormat {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

fn check_length(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    let actual = value.len();
    if actual < min || actual > max {
        return Err(ValidationError::InvalidLength {
            field,
            min,
            max,
            actual,
        });
    }
    Ok(())
}

// ============================================================================
// Username
// ============================================================================

/// Validated username
///
/// # Validation Rules
/// - Length: 3-100 characters
/// - Regex: ^[a-z0-9_]+$
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        check_length("username", name, 3, 100)?;
        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(ValidationError::InvalidFormat {
                field: "username",
                value: name.to_string(),
                expected: "lowercase letters, digits, underscore only",
            });
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// FullName
// ============================================================================

/// Validated full name (3-100 characters, letters and spaces)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullName(String);

impl FullName {
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        check_length("full_name", name, 3, 100)?;
        if !name.chars().all(|c| c.is_ascii_alphabetic() || c.is_whitespace()) {
            return Err(ValidationError::InvalidFormat {
                field: "full_name",
                value: name.to_string(),
                expected: "letters and spaces only",
            });
        }
        Ok(Self(name.to_string()))
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

// ============================================================================
// Email
// ============================================================================

/// Validated email address (5-100 characters, `local@domain.tld`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email(String);

impl Email {
    pub fn new(email: &str) -> Result<Self, ValidationError> {
        check_length("email", email, 5, 100)?;

        let invalid = || ValidationError::InvalidFormat {
            field: "email",
            value: email.to_string(),
            expected: "a valid email address",
        };

        if email.chars().any(char::is_whitespace) {
            return Err(invalid());
        }
        let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
        if local.is_empty() || domain.contains('@') {
            return Err(invalid());
        }
        let labels: Vec<&str> = domain.split('.').collect();
        if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
            return Err(invalid());
        }
        Ok(Self(email.to_string()))
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

// ============================================================================
// Password
// ============================================================================

/// Plain-text password that passed the length rule (6-100)
///
/// Debug output is redacted.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: &str) -> Result<Self, ValidationError> {
        check_length("password", password, 6, 100)?;
        Ok(Self(password.to_string()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(Username::new("alice_01").is_ok());
        assert!(matches!(
            Username::new("al"),
            Err(ValidationError::InvalidLength { actual: 2, .. })
        ));
        assert!(matches!(
            Username::new("Alice"),
            Err(ValidationError::InvalidFormat { field: "username", .. })
        ));
        assert!(Username::new("bob-smith").is_err());
        assert!(Username::new(&"a".repeat(101)).is_err());
    }

    #[test]
    fn test_full_name_rules() {
        assert!(FullName::new("Alice Smith").is_ok());
        assert!(FullName::new("Al").is_err());
        assert!(FullName::new("R2 D2").is_err());
    }

    #[test]
    fn test_email_rules() {
        assert!(Email::new("alice@example.com").is_ok());
        assert!(Email::new("a.b+c@mail.example.org").is_ok());
        for bad in [
            "a@b",
            "alice.example.com",
            "@example.com",
            "alice@@example.com",
            "alice@example..com",
            "ali ce@example.com",
        ] {
            assert!(Email::new(bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_password_rules() {
        assert!(Password::new("secret").is_ok());
        assert!(Password::new("short").is_err());
        assert_eq!(format!("{:?}", Password::new("secret").unwrap()), "Password(***)");
    }

    #[test]
    fn test_error_display() {
        let err = Username::new("ab").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid length for username: expected 3-100, got 2"
        );
    }
}
