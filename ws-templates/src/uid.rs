//! Template names and the identifiers derived from them.

use ws_core::WsError;

pub const MIN_NAME_LENGTH: usize = 3;
pub const MAX_NAME_LENGTH: usize = 30;
pub const MAX_UID_LENGTH: usize = 30;

pub fn validate_name(name: &str) -> Result<(), WsError> {
    let length = name.trim().chars().count();
    if !(MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&length) {
        return Err(WsError::Validation(format!(
            "Name should be between {} to {} characters",
            MIN_NAME_LENGTH, MAX_NAME_LENGTH
        )));
    }
    Ok(())
}

/// Derives a DNS-label-safe identifier from a human name.
///
/// `"ML Notebook (GPU)"` becomes `"ml-notebook-gpu"`.
pub fn generate_uid(name: &str) -> Result<String, WsError> {
    let mut uid = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !uid.is_empty() {
                uid.push('-');
            }
            pending_dash = false;
            uid.push(c);
        } else {
            pending_dash = true;
        }
    }

    uid.truncate(MAX_UID_LENGTH);
    let uid = uid.trim_end_matches('-').to_string();

    if uid.is_empty() {
        return Err(WsError::Validation(format!(
            "Name '{}' does not contain any usable characters",
            name
        )));
    }
    Ok(uid)
}
