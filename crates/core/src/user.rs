//! Account field validation.

use validator::{ValidateEmail, ValidateUrl};

use crate::error::CoreError;

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 30;
pub const MAX_DISPLAY_NAME_LENGTH: usize = 50;
pub const MAX_BIO_LENGTH: usize = 500;
pub const MAX_LOCATION_LENGTH: usize = 100;
pub const MAX_GITHUB_LENGTH: usize = 39;
pub const MAX_LINKEDIN_LENGTH: usize = 100;

/// Usernames are 3-30 characters of ASCII letters, digits, `_` or `-`.
pub fn validate_username(username: &str) -> Result<(), CoreError> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&len) {
        return Err(CoreError::Validation(format!(
            "Username must be between {MIN_USERNAME_LENGTH} and {MAX_USERNAME_LENGTH} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(CoreError::Validation(
            "Username may only contain letters, numbers, underscores and hyphens".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), CoreError> {
    if !email.validate_email() {
        return Err(CoreError::Validation(
            "Please provide a valid email".to_string(),
        ));
    }
    Ok(())
}

/// Emails are compared case-insensitively, so they are stored lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_password(password: &str, min_length: usize) -> Result<(), CoreError> {
    if password.chars().count() < min_length {
        return Err(CoreError::Validation(format!(
            "Password must be at least {min_length} characters"
        )));
    }
    Ok(())
}

fn validate_max_len(field: &str, value: &str, max: usize) -> Result<(), CoreError> {
    if value.chars().count() > max {
        return Err(CoreError::Validation(format!(
            "{field} cannot exceed {max} characters"
        )));
    }
    Ok(())
}

/// Editable profile fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub avatar: Option<String>,
    pub dark_mode: Option<bool>,
    pub email_notifications: Option<bool>,
    pub public_profile: Option<bool>,
}

impl ProfileChanges {
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(name) = &self.display_name {
            if name.trim().is_empty() {
                return Err(CoreError::Validation(
                    "Display name must not be empty".to_string(),
                ));
            }
            validate_max_len("Display name", name, MAX_DISPLAY_NAME_LENGTH)?;
        }
        if let Some(bio) = &self.bio {
            validate_max_len("Bio", bio, MAX_BIO_LENGTH)?;
        }
        if let Some(location) = &self.location {
            validate_max_len("Location", location, MAX_LOCATION_LENGTH)?;
        }
        if let Some(website) = self.website.as_deref().filter(|w| !w.is_empty()) {
            if !website.validate_url() {
                return Err(CoreError::Validation(
                    "Please provide a valid website URL".to_string(),
                ));
            }
        }
        if let Some(github) = &self.github {
            validate_max_len("GitHub username", github, MAX_GITHUB_LENGTH)?;
        }
        if let Some(linkedin) = &self.linkedin {
            validate_max_len("LinkedIn URL", linkedin, MAX_LINKEDIN_LENGTH)?;
        }
        Ok(())
    }
}
