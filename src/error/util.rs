//! Utility functions for error handling
//!
//! Path checks that turn the common IO failure modes into errors that name
//! the file and what it was needed for.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{CridError, Result};

/// Safely open a file with rich error information
///
/// # Arguments
/// * `path` - The path to the file to open
/// * `purpose` - Why the file is being opened (for error context)
pub fn safe_open_file(path: &Path, purpose: &str) -> Result<fs::File> {
    if !path.exists() {
        return Err(CridError::io(
            path,
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found (needed for {purpose})"),
            ),
        ));
    }

    if !path.is_file() {
        return Err(CridError::io(
            path,
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path is not a file (expected a file for {purpose})"),
            ),
        ));
    }

    fs::File::open(path).map_err(|e| {
        let context = match e.kind() {
            io::ErrorKind::PermissionDenied => "permission denied - check file permissions".to_string(),
            _ => format!("failed to open file for {purpose}: {e}"),
        };
        CridError::io(path, io::Error::new(e.kind(), context))
    })
}

/// Check that a directory exists and is readable
pub fn validate_directory(path: &Path, purpose: &str) -> Result<()> {
    if !path.is_dir() {
        return Err(CridError::io(
            path,
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found (needed for {purpose})"),
            ),
        ));
    }

    fs::read_dir(path).map(|_| ()).map_err(|e| CridError::io(path, e))
}

/// Safely read a file to string with rich error information
pub fn safe_read_to_string(path: &Path, purpose: &str) -> Result<String> {
    let mut file = safe_open_file(path, purpose)?;

    let mut content = String::new();
    io::Read::read_to_string(&mut file, &mut content).map_err(|e| {
        let context = match e.kind() {
            io::ErrorKind::InvalidData => "file contains invalid UTF-8 data".to_string(),
            _ => format!("failed to read file content for {purpose}: {e}"),
        };
        CridError::io(path, io::Error::new(e.kind(), context))
    })?;

    Ok(content)
}
