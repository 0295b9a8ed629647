//! Path validation shared by all backends.
//!
//! Segments must be non-empty, must not be `.` or `..`, and paths must not
//! start or end with `/`.

use crate::traits::{StoreError, StoreResult};

fn segments(path: &str) -> StoreResult<Vec<&str>> {
    if path.is_empty() {
        return Err(StoreError::InvalidPath("path is empty".to_string()));
    }
    if path.starts_with('/') || path.ends_with('/') {
        return Err(StoreError::InvalidPath(format!(
            "path must not start or end with '/': {}",
            path
        )));
    }
    let parts: Vec<&str> = path.split('/').collect();
    for part in &parts {
        if part.is_empty() || *part == "." || *part == ".." {
            return Err(StoreError::InvalidPath(format!(
                "path contains an invalid segment: {}",
                path
            )));
        }
    }
    Ok(parts)
}

/// Validate a document path and return its segments.
pub fn document_segments(path: &str) -> StoreResult<Vec<&str>> {
    let parts = segments(path)?;
    if parts.len() % 2 != 0 {
        return Err(StoreError::InvalidPath(format!(
            "not a document path (odd segment count): {}",
            path
        )));
    }
    Ok(parts)
}

/// Validate a collection path and return its segments.
pub fn collection_segments(path: &str) -> StoreResult<Vec<&str>> {
    let parts = segments(path)?;
    if parts.len() % 2 == 0 {
        return Err(StoreError::InvalidPath(format!(
            "not a collection path (even segment count): {}",
            path
        )));
    }
    Ok(parts)
}

/// Last segment of a validated document path.
pub fn document_id(path: &str) -> StoreResult<String> {
    let parts = document_segments(path)?;
    parts
        .last()
        .map(|id| id.to_string())
        .ok_or_else(|| StoreError::InvalidPath(path.to_string()))
}
