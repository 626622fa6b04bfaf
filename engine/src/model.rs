//! Core data model for copy requests.
//!
//! This module defines the value types describing a transfer:
//! - CopyRequest: source, target and mode of one copy
//! - CopyMode: how an existing target is treated
//! - CopyState: the externally visible lifecycle state of a transfer

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// How a transfer treats its target.
///
/// The mode is fixed when the request is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyMode {
    /// Copy to a new target; fail if it already exists
    Create,
    /// Copy, truncating and overwriting an existing target
    Replace,
    /// Copy unless the target exists, in which case do nothing
    Ignore,
    /// Append the whole source to the end of an existing target
    Append,
    /// Append only the part of the source the target is missing.
    ///
    /// With `verify` set, the existing target is first compared byte for
    /// byte against the head of the source.
    Resume { verify: bool },
}

impl CopyMode {
    /// Returns true for the modes handled by the plain copy strategy.
    pub fn is_plain_copy(&self) -> bool {
        matches!(self, CopyMode::Create | CopyMode::Replace | CopyMode::Ignore)
    }
}

impl fmt::Display for CopyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyMode::Create => write!(f, "CREATE"),
            CopyMode::Replace => write!(f, "REPLACE"),
            CopyMode::Ignore => write!(f, "IGNORE"),
            CopyMode::Append => write!(f, "APPEND"),
            CopyMode::Resume { verify: true } => write!(f, "RESUME (verify)"),
            CopyMode::Resume { verify: false } => write!(f, "RESUME"),
        }
    }
}

/// Lifecycle state of a transfer as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CopyState {
    /// Queued, not yet picked up by the worker
    Pending,
    /// Currently executing
    Running,
    /// Finished, successfully or with an error
    Done,
    /// Cancelled; still winding down if the status says it is running
    Killed,
}

impl fmt::Display for CopyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyState::Pending => write!(f, "PENDING"),
            CopyState::Running => write!(f, "RUNNING"),
            CopyState::Done => write!(f, "DONE"),
            CopyState::Killed => write!(f, "KILLED"),
        }
    }
}

/// Parameters of a single copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRequest {
    pub source: PathBuf,
    pub target: PathBuf,
    pub mode: CopyMode,
}

impl CopyRequest {
    pub fn new(source: impl AsRef<Path>, target: impl AsRef<Path>, mode: CopyMode) -> Self {
        CopyRequest {
            source: source.as_ref().to_path_buf(),
            target: target.as_ref().to_path_buf(),
            mode,
        }
    }
}
