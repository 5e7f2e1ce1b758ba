//! CLI error types.

use std::path::PathBuf;

use fire_wireguard::WireGuardError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Mesh generation or config conversion failed.
    #[error(transparent)]
    WireGuard(#[from] WireGuardError),

    /// Reading input or writing output failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Reading or writing a specific file failed.
    #[error("{}: {source}", path.display())]
    File {
        /// The file involved.
        path: PathBuf,
        /// The underlying failure.
        source: std::io::Error,
    },

    /// JSON output could not be produced.
    #[error("format error: {0}")]
    Format(#[from] serde_json::Error),
}

impl CliError {
    /// Wraps an IO error with the path it concerns.
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }
}
