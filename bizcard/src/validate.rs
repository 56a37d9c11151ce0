//! Module for validating form input before it reaches the backend.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

/// Minimum number of characters of a username.
pub const MIN_USERNAME_LEN: usize = 3;
/// Minimum number of characters of a password.
pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Validation messages keyed by the name of the offending field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<&'static str, String>);

impl ValidationErrors {
    /// Creates an error with a single message for `field`.
    pub fn single<S: Into<String>>(field: &'static str, message: S) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    /// Adds a message for `field`, keeping the first message if there is one already.
    pub fn add<S: Into<String>>(&mut self, field: &'static str, message: S) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    /// Returns the message for `field`.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the fields and their messages in field name order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

fn check_username(errors: &mut ValidationErrors, username: &str) {
    let username = username.trim();
    if username.is_empty() {
        errors.add("username", "Username is required");
    } else if username.chars().count() < MIN_USERNAME_LEN {
        errors.add(
            "username",
            format!("Username must be at least {} characters", MIN_USERNAME_LEN),
        );
    }
}

fn check_email(errors: &mut ValidationErrors, email: &str) {
    if email.trim().is_empty() {
        errors.add("email", "Email is required");
    } else if !EMAIL.is_match(email.trim()) {
        errors.add("email", "Invalid email");
    }
}

/// Validates the sign up form.
pub fn sign_up(username: &str, email: &str, password: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    check_username(&mut errors, username);
    check_email(&mut errors, email);
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            "password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        );
    }
    errors.into_result()
}

/// Validates the sign in form.
pub fn sign_in(email: &str, password: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    check_email(&mut errors, email);
    if password.is_empty() {
        errors.add("password", "Password is required");
    }
    errors.into_result()
}

/// Validates a username on its own, as entered in the settings form.
pub fn username(username: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    check_username(&mut errors, username);
    errors.into_result()
}

/// Validates an email address on its own, as entered in the password reset form.
pub fn email(email: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    check_email(&mut errors, email);
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_up_collects_every_field() {
        let errors = sign_up("al", "not-an-email", "123").unwrap_err();
        assert_eq!(
            errors.get("username"),
            Some("Username must be at least 3 characters")
        );
        assert_eq!(errors.get("email"), Some("Invalid email"));
        assert_eq!(
            errors.get("password"),
            Some("Password must be at least 6 characters")
        );
        assert!(sign_up("alice", "alice@x.com", "secret1").is_ok());
    }

    #[test]
    fn required_fields() {
        let errors = sign_in("", "").unwrap_err();
        assert_eq!(errors.get("email"), Some("Email is required"));
        assert_eq!(errors.get("password"), Some("Password is required"));
        assert_eq!(
            username("   ").unwrap_err().get("username"),
            Some("Username is required")
        );
    }

    #[test]
    fn display_joins_messages() {
        let errors = sign_in("bob@", "x").unwrap_err();
        assert_eq!(errors.to_string(), "email: Invalid email");
    }
}
