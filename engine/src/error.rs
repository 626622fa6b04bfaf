//! Error types for the copy engine.
//!
//! `CopyError` covers both the failures recorded on a transfer (missing
//! source, data mismatch, cancellation, stream errors) and the failures
//! returned synchronously by engine calls (unknown handle, engine shut down).
//! Transfer-time errors are never returned from `submit`; they are stored on
//! the transfer and surfaced through its status snapshot.

use serde::Serialize;
use std::io;
use std::path::PathBuf;

use crate::model::CopyMode;

/// Errors produced by the copy engine and its `Files` backends.
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    /// A path that must exist does not
    #[error("No such file: {}", path.display())]
    NoSuchFile { path: PathBuf },

    /// Target exists and the mode does not allow overwriting it
    #[error("Target already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },

    /// Source is a directory or link where a regular file is required
    #[error("Illegal source path {} ({})", path.display(), reason)]
    IllegalSourcePath { path: PathBuf, reason: &'static str },

    /// Target cannot be used for this mode (directory, link, equal to source)
    #[error("Illegal target path {} ({})", path.display(), reason)]
    IllegalTargetPath { path: PathBuf, reason: &'static str },

    /// Target is not a prefix of source
    #[error("Data in target {} does not match source {}", target.display(), source_path.display())]
    InvalidData { source_path: PathBuf, target: PathBuf },

    /// Handle is not known to the engine
    #[error("No such transfer: {handle}")]
    NoSuchTransfer { handle: String },

    /// Handle was already submitted to the engine
    #[error("Transfer {handle} was already submitted")]
    DuplicateTransfer { handle: String },

    /// Transfer is still pending or running
    #[error("Transfer {handle} has not finished")]
    TransferNotFinished { handle: String },

    /// Transfer was cancelled by the user
    #[error("Copy cancelled by user")]
    Cancelled,

    /// Underlying stream or metadata failure
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Unsupported combination of open options
    #[error("Invalid open options: {reason}")]
    InvalidOpenOptions { reason: String },

    /// A strategy was handed a mode it does not implement
    #[error("Internal error: mode {mode} routed to the wrong strategy")]
    InvalidMode { mode: CopyMode },

    /// Engine no longer accepts transfers
    #[error("Copy engine has been shut down")]
    EngineShutDown,

    /// Engine configuration was rejected
    #[error("Invalid engine configuration: {reason}")]
    InvalidConfig { reason: String },
}

/// Discriminant of a [`CopyError`], cheap to copy and match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyErrorKind {
    NoSuchFile,
    AlreadyExists,
    IllegalSourcePath,
    IllegalTargetPath,
    InvalidData,
    NoSuchTransfer,
    DuplicateTransfer,
    TransferNotFinished,
    Cancelled,
    IoFailure,
    InvalidOpenOptions,
    InvalidMode,
    EngineShutDown,
    InvalidConfig,
}

impl CopyError {
    /// Wrap an io error with a description of the failed operation.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        CopyError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> CopyErrorKind {
        match self {
            Self::NoSuchFile { .. } => CopyErrorKind::NoSuchFile,
            Self::AlreadyExists { .. } => CopyErrorKind::AlreadyExists,
            Self::IllegalSourcePath { .. } => CopyErrorKind::IllegalSourcePath,
            Self::IllegalTargetPath { .. } => CopyErrorKind::IllegalTargetPath,
            Self::InvalidData { .. } => CopyErrorKind::InvalidData,
            Self::NoSuchTransfer { .. } => CopyErrorKind::NoSuchTransfer,
            Self::DuplicateTransfer { .. } => CopyErrorKind::DuplicateTransfer,
            Self::TransferNotFinished { .. } => CopyErrorKind::TransferNotFinished,
            Self::Cancelled => CopyErrorKind::Cancelled,
            Self::Io { .. } => CopyErrorKind::IoFailure,
            Self::InvalidOpenOptions { .. } => CopyErrorKind::InvalidOpenOptions,
            Self::InvalidMode { .. } => CopyErrorKind::InvalidMode,
            Self::EngineShutDown => CopyErrorKind::EngineShutDown,
            Self::InvalidConfig { .. } => CopyErrorKind::InvalidConfig,
        }
    }

    /// Extract the OS error code from this error, if available.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Io { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        let err = CopyError::NoSuchFile {
            path: PathBuf::from("/missing"),
        };
        assert_eq!(err.kind(), CopyErrorKind::NoSuchFile);
        assert_eq!(CopyError::Cancelled.kind(), CopyErrorKind::Cancelled);

        let err = CopyError::io("read failed", io::Error::other("boom"));
        assert_eq!(err.kind(), CopyErrorKind::IoFailure);
    }

    #[test]
    fn test_display_includes_paths() {
        let err = CopyError::InvalidData {
            source_path: PathBuf::from("/a/src.bin"),
            target: PathBuf::from("/b/dst.bin"),
        };
        let message = err.to_string();
        assert!(message.contains("/a/src.bin"));
        assert!(message.contains("/b/dst.bin"));
    }

    #[test]
    fn test_io_error_keeps_source_and_os_code() {
        use std::error::Error;

        let err = CopyError::io(
            "Failed to open /x",
            io::Error::from_raw_os_error(13),
        );
        assert_eq!(err.raw_os_error(), Some(13));
        assert!(err.source().is_some());
        assert_eq!(CopyError::Cancelled.raw_os_error(), None);
    }
}
