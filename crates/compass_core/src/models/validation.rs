//! Shared field validators for request payloads.

use validator::ValidationError;

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Reject empty and whitespace-only text.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("blank", "must not be empty or whitespace"));
    }
    Ok(())
}

/// Require an absolute `http`/`https` URL with a host.
///
/// Blank links are accepted here; the normalizer turns them into `null`.
pub fn validate_link(value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(());
    }
    match url::Url::parse(trimmed) {
        Ok(parsed)
            if matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some() =>
        {
            Ok(())
        }
        _ => Err(invalid("url", "must be an http(s) URL")),
    }
}

/// Require a single ASCII letter (case-insensitive) after trimming.
pub fn validate_letter(value: &str) -> Result<(), ValidationError> {
    let mut chars = value.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Ok(()),
        _ => Err(invalid("letter", "must be a single letter A-Z")),
    }
}
