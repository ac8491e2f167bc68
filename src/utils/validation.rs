use crate::utils::error::{Result, SyncError};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: impl ToString, reason: impl Into<String>) -> SyncError {
    SyncError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// The content API is only reachable over http(s).
pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.trim().is_empty() {
        return Err(invalid(field_name, url_str, "URL cannot be empty"));
    }
    let url = Url::parse(url_str).map_err(|e| invalid(field_name, url_str, e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(field_name, url_str, format!("scheme '{other}' is not http(s)"))),
    }
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(invalid(field_name, value, format!("must be at least {min_value}")));
    }
    Ok(())
}

pub fn validate_one_of(field_name: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(invalid(
        field_name,
        value,
        format!("expected one of: {}", allowed.join(", ")),
    ))
}
