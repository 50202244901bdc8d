//! Name validation.
//!
//! Anchored names are arbitrary UTF-8 (paths are the common case) with a few
//! restrictions:
//! - Must be non-empty
//! - Must be at most [`MAX_NAME_LEN`] bytes
//! - Must not contain control characters

use crate::error::{NamingError, NamingResult};

/// Longest accepted name, in bytes.
pub const MAX_NAME_LEN: usize = 1024;

/// Validate a name, returning `Ok(())` if it may be anchored or resolved.
///
/// # Examples
///
/// ```
/// use dbx_naming::names::validate_name;
///
/// assert!(validate_name("docs/report.pdf").is_ok());
/// assert!(validate_name("").is_err());
/// assert!(validate_name("bad\nname").is_err());
/// ```
pub fn validate_name(name: &str) -> NamingResult<()> {
    if name.is_empty() {
        return Err(invalid(name, "name must not be empty".into()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid(
            name,
            format!("{} bytes exceeds the {MAX_NAME_LEN}-byte limit", name.len()),
        ));
    }
    if let Some(ch) = name.chars().find(|c| c.is_control()) {
        return Err(invalid(name, format!("contains control character {ch:?}")));
    }
    Ok(())
}

fn invalid(name: &str, reason: String) -> NamingError {
    let mut shown: String = name.chars().take(64).collect();
    if shown.len() < name.len() {
        shown.push('…');
    }
    NamingError::InvalidName {
        name: shown,
        reason,
    }
}
