use crate::error::ApiError;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 2000;
pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 32;
pub const MIN_PASSWORD_LEN: usize = 8;

/// Trimmed username of 3-32 characters.
pub fn username(value: &str) -> Result<String, ApiError> {
    let username = required("username", value, MAX_USERNAME_LEN)?;
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(ApiError::invalid("Username must be 3-32 characters"));
    }
    Ok(username)
}

pub fn password(value: &str) -> Result<(), ApiError> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::invalid("Password must be at least 8 characters"));
    }
    Ok(())
}

/// Trimmed, non-empty `value` of at most `max` characters.
pub fn required(field: &str, value: &str, max: usize) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::invalid(format!("{} must not be empty", field)));
    }
    bounded(field, value, max)?;
    Ok(value.to_string())
}

/// Optional text of at most `max` characters; stored as given.
pub fn optional(field: &str, value: Option<&str>, max: usize) -> Result<(), ApiError> {
    match value {
        Some(v) => bounded(field, v, max),
        None => Ok(()),
    }
}

fn bounded(field: &str, value: &str, max: usize) -> Result<(), ApiError> {
    if value.chars().count() > max {
        return Err(ApiError::invalid(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}
