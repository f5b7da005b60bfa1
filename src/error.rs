//! Centralized error types for mailshare.
//!
//! MIME decoding never fails and has no variants here; these cover the
//! token store, configuration and file access.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailshare library.
#[derive(Error, Debug)]
pub enum MailShareError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Stored or received JSON could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An admin operation referenced a token that does not exist.
    #[error("Token not found: {0}")]
    TokenNotFound(String),

    /// A viewer presented an unknown token.
    #[error("Token is invalid or has expired")]
    TokenInvalid,

    /// The token's expiry time has passed.
    #[error("Token has expired")]
    TokenExpired,

    /// The token was disabled by an admin.
    #[error("Token has been disabled")]
    TokenDisabled,

    /// The key-value store holds data we cannot interpret.
    #[error("Store error: {0}")]
    Store(String),

    /// A request was missing required fields or had invalid values.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Convenience alias for `Result<T, MailShareError>`.
pub type Result<T> = std::result::Result<T, MailShareError>;

impl MailShareError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// `true` for the errors a viewer gets for an unusable token.
    pub fn is_access_denied(&self) -> bool {
        matches!(
            self,
            Self::TokenInvalid | Self::TokenExpired | Self::TokenDisabled
        )
    }
}
