//! UI error types.

use thiserror::Error;

/// Errors raised by UI state helpers.
#[derive(Debug, Error)]
pub enum UiError {
    /// Walking the avatar directory failed.
    #[error("avatar directory scan failed: {0}")]
    AvatarScan(#[from] walkdir::Error),

    /// An avatar asset could not be loaded.
    #[error("avatar asset unavailable: {path}: {message}")]
    AssetUnavailable {
        /// Asset path.
        path: String,
        /// What went wrong.
        message: String,
    },

    /// The attachment cannot be sent as message content.
    #[error("unsupported attachment {name}: {media_type}")]
    UnsupportedAttachment {
        /// File name shown to the user.
        name: String,
        /// Declared MIME type.
        media_type: String,
    },

    /// No attachment at the given position.
    #[error("no attachment at index {0}")]
    AttachmentIndex(usize),
}

/// Convenience result type for UI operations.
pub type Result<T> = std::result::Result<T, UiError>;
