//! Validation functions for tree paths.

use crate::types::PathStep;
use crate::PathError;

/// Maximum allowed path string length.
pub const MAX_PATH_LENGTH: usize = 4096;

/// Maximum allowed number of steps in a path.
pub const MAX_PATH_DEPTH: usize = 512;

/// Validate a path string.
///
/// # Errors
///
/// Returns an error if:
/// - The path is non-empty but doesn't start with `/`
/// - The path exceeds the maximum length (4096 bytes)
///
/// # Example
///
/// ```
/// use arbor_path::validate_path;
///
/// validate_path("").unwrap();
/// validate_path("/root/a.style").unwrap();
/// validate_path("root").unwrap_err();
/// ```
pub fn validate_path(path: &str) -> Result<(), PathError> {
    if path.is_empty() {
        return Ok(());
    }
    if !path.starts_with('/') {
        return Err(PathError::NotAbsolute(path.to_string()));
    }
    if path.len() > MAX_PATH_LENGTH {
        return Err(PathError::TooLong(path.len()));
    }
    Ok(())
}

/// Validate parsed path steps.
///
/// # Errors
///
/// Returns an error if the path has more than 512 steps, or if it begins
/// with a field step (absolute paths always begin at a tree node).
pub fn validate_steps(steps: &[PathStep]) -> Result<(), PathError> {
    if steps.len() > MAX_PATH_DEPTH {
        return Err(PathError::TooDeep(steps.len()));
    }
    if let Some(PathStep::Field(name)) = steps.first() {
        return Err(PathError::NotAbsolute(format!(".{name}")));
    }
    Ok(())
}
