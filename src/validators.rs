/// Input validators for account and board payloads
///
/// Every validator trims its input, enforces length limits (counted in
/// characters, not bytes) and returns the cleaned value.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 100;
const MIN_EMAIL_LENGTH: usize = 5;
const MAX_USERNAME_LENGTH: usize = 20;
const MAX_FULLNAME_LENGTH: usize = 10;
const MAX_TITLE_LENGTH: usize = 255;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    // ASCII letters, digits and @/./+/-/_ only
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9@.+_-]+$").unwrap();
}

/// Unwraps an optional payload field, reporting it as missing otherwise
pub fn require<T>(value: Option<T>, field: &str) -> Result<T, ValidationError> {
    value.ok_or_else(|| ValidationError::MissingField(field.to_string()))
}

/// Validates email address
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(trimmed) || has_suspicious_email_patterns(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates a login name: 1-20 characters of `[\w.@+-]`
pub fn is_valid_username(username: &str) -> Result<String, ValidationError> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("username".to_string()));
    }

    if trimmed.chars().count() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong("username".to_string(), MAX_USERNAME_LENGTH));
    }

    if !USERNAME_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("username".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates a display name: 1-10 characters, no control characters
pub fn is_valid_fullname(fullname: &str) -> Result<String, ValidationError> {
    let trimmed = fullname.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("fullname".to_string()));
    }

    if trimmed.chars().count() > MAX_FULLNAME_LENGTH {
        return Err(ValidationError::TooLong("fullname".to_string(), MAX_FULLNAME_LENGTH));
    }

    if has_control_characters(trimmed) {
        return Err(ValidationError::SuspiciousContent("fullname".to_string()));
    }

    Ok(trimmed.to_string())
}

pub fn is_valid_title(title: &str) -> Result<String, ValidationError> {
    let trimmed = title.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("title".to_string()));
    }

    if trimmed.chars().count() > MAX_TITLE_LENGTH {
        return Err(ValidationError::TooLong("title".to_string(), MAX_TITLE_LENGTH));
    }

    if has_control_characters(trimmed) {
        return Err(ValidationError::SuspiciousContent("title".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Post and comment bodies: free text, but not blank and no NUL bytes
pub fn is_valid_contents(contents: &str) -> Result<String, ValidationError> {
    if contents.trim().is_empty() {
        return Err(ValidationError::EmptyField("contents".to_string()));
    }

    if contents.contains('\0') {
        return Err(ValidationError::SuspiciousContent("contents".to_string()));
    }

    Ok(contents.to_string())
}

fn has_suspicious_email_patterns(email: &str) -> bool {
    if let Some(at_pos) = email.find('@') {
        if at_pos > 64 {
            return true;
        }
    }

    email.matches('@').count() != 1 || email.contains('\0')
}

fn has_control_characters(value: &str) -> bool {
    value.chars().any(|c| c.is_control())
}
