//! Form field checks run before any backend call

use crate::error::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Shortest accepted password
pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

/// Check an e-mail address
///
/// # Errors
/// `Required` when blank, `InvalidEmail` when malformed.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::Required("email"));
    }
    match EMAIL_PATTERN.as_ref() {
        Some(re) if re.is_match(email) => Ok(()),
        _ => Err(ValidationError::InvalidEmail(email.to_string())),
    }
}

/// Check a new password and its confirmation
///
/// # Errors
/// `PasswordTooShort` or `PasswordMismatch`.
pub fn validate_new_password(password: &str, confirmation: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    if password != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

/// Sign-up form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupForm {
    /// Display name
    pub full_name: String,
    /// Login e-mail
    pub email: String,
    /// Password
    pub password: String,
    /// Password again
    pub confirm_password: String,
}

impl SignupForm {
    /// Field checks in form order
    ///
    /// # Errors
    /// The first failing field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.full_name.trim().is_empty() {
            return Err(ValidationError::Required("full name"));
        }
        validate_email(&self.email)?;
        validate_new_password(&self.password, &self.confirm_password)
    }
}
