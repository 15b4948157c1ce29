//! Shared validation for container and object names.
//!
//! Containers follow blob-container naming: 3-63 characters of lowercase letters,
//! digits and single hyphens, starting and ending with a letter or digit.
//! Object names are relative paths without `..` segments.

use crate::traits::{StorageError, StorageResult};

pub fn validate_container(container: &str) -> StorageResult<()> {
    let valid_chars = container
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let valid_edges = !container.starts_with('-') && !container.ends_with('-');

    if !(3..=63).contains(&container.len())
        || !valid_chars
        || !valid_edges
        || container.contains("--")
    {
        return Err(StorageError::InvalidKey(format!(
            "Invalid container name: {}",
            container
        )));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> StorageResult<()> {
    if name.is_empty() {
        return Err(StorageError::InvalidKey("Object name is empty".to_string()));
    }
    if name.starts_with('/') || name.contains('\\') {
        return Err(StorageError::InvalidKey(format!(
            "Object name must be relative: {}",
            name
        )));
    }
    if name.split('/').any(|segment| segment.is_empty() || segment == "..") {
        return Err(StorageError::InvalidKey(format!(
            "Object name contains invalid segments: {}",
            name
        )));
    }
    Ok(())
}

/// Validate both parts of an object address.
pub fn validate(container: &str, name: &str) -> StorageResult<()> {
    validate_container(container)?;
    validate_name(name)
}
