//! Script subsystem errors.

use std::time::Duration;

/// Infrastructure failures of the registry and dispatcher.
///
/// A script that runs and exits non-zero is not an error; it is reported
/// through [`DispatchResult::success`](crate::scripts::DispatchResult).
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Traversal attempt or malformed identifier. Checked before any
    /// filesystem access.
    #[error("Invalid script name")]
    InvalidName(String),

    /// Malformed parameter key.
    #[error("Invalid parameter name: {0}")]
    InvalidParameter(String),

    #[error("Script not found: {0}")]
    NotFound(String),

    #[error("Script execution timed out after {0:?}")]
    Timeout(Duration),

    /// The process could not be started or waited on.
    #[error("Failed to launch script: {0}")]
    LaunchFailure(#[source] std::io::Error),

    /// The scripts directory could not be read.
    #[error("Failed to read scripts directory: {0}")]
    Io(#[from] std::io::Error),
}
