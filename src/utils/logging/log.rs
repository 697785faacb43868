//! Logging utilities
//!
//! Uniform messages for file-level operations so that a run's log reads as a
//! sequence of load, compute and write steps.

use std::path::Path;
use std::time::Duration;

/// Log the start of a file-level operation
///
/// # Arguments
/// * `operation` - What is being done, e.g. "Reading observations from"
/// * `path` - File or directory being operated on
pub fn log_operation_start(operation: &str, path: &Path) {
    log::info!("{} {}", operation, path.display());
}

/// Log the completion of a file-level operation
///
/// # Arguments
/// * `operation` - Past-tense verb, e.g. "read" or "wrote"
/// * `path` - File or directory that was operated on
/// * `items` - Number of rows or files handled
/// * `elapsed` - Optional elapsed time
pub fn log_operation_complete(operation: &str, path: &Path, items: usize, elapsed: Option<Duration>) {
    match elapsed {
        Some(duration) => log::info!(
            "{} {} rows at {} in {:?}",
            capitalize(operation),
            items,
            path.display(),
            duration
        ),
        None => log::info!("{} {} rows at {}", capitalize(operation), items, path.display()),
    }
}

/// Log a data or configuration warning
///
/// # Arguments
/// * `message` - Warning message
/// * `path` - Optional path related to the warning
pub fn log_warning(message: &str, path: Option<&Path>) {
    if let Some(path) = path {
        log::warn!("{}: {}", message, path.display());
    } else {
        log::warn!("{message}");
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
