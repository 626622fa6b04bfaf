//! Read-only snapshots of a transfer.
//!
//! A `CopyStatus` is captured under the engine lock and never changes
//! afterwards, so callers can hold on to it while the transfer moves on.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::path::PathBuf;
use std::sync::Arc;

use crate::descriptor::CopyInfo;
use crate::error::CopyError;
use crate::model::{CopyMode, CopyState};

#[derive(Debug, Clone, Serialize)]
pub struct CopyStatus {
    pub handle: String,
    pub source: PathBuf,
    pub target: PathBuf,
    pub mode: CopyMode,
    pub state: CopyState,
    /// True while a thread is still executing the transfer
    pub is_running: bool,
    /// True once the transfer finished without being cancelled
    pub is_done: bool,
    pub cancelled: bool,
    pub bytes_to_copy: u64,
    pub bytes_copied: u64,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<Arc<CopyError>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct ErrorView {
    kind: crate::error::CopyErrorKind,
    message: String,
}

fn serialize_error<S: Serializer>(
    error: &Option<Arc<CopyError>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    error
        .as_ref()
        .map(|e| ErrorView {
            kind: e.kind(),
            message: e.to_string(),
        })
        .serialize(serializer)
}

impl CopyStatus {
    pub(crate) fn capture(info: &CopyInfo, state: CopyState, is_running: bool) -> Self {
        CopyStatus {
            handle: info.handle().to_string(),
            source: info.source().to_path_buf(),
            target: info.target().to_path_buf(),
            mode: info.mode(),
            state,
            is_running,
            is_done: state == CopyState::Done,
            cancelled: info.is_cancelled(),
            bytes_to_copy: info.bytes_to_copy(),
            bytes_copied: info.bytes_copied(),
            error: info.error(),
            started_at: info.started_at(),
            finished_at: info.finished_at(),
        }
    }

    /// Snapshot of a transfer that has left the running slot.
    ///
    /// The state comes from the recorded error, not the cancel flag. A
    /// cancel that lands after the copy loop has reached end of input finds
    /// nothing left to abort, so the copy completes and reports DONE with
    /// `cancelled` set,
    /// even though the snapshot returned by that `cancel` call said KILLED.
    pub(crate) fn terminal(info: &CopyInfo) -> Self {
        let state = if info.was_killed() {
            CopyState::Killed
        } else {
            CopyState::Done
        };
        Self::capture(info, state, false)
    }

    /// True if the transfer will not change any more.
    pub fn is_terminal(&self) -> bool {
        !self.is_running && matches!(self.state, CopyState::Done | CopyState::Killed)
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Fraction of `bytes_to_copy` already copied, in `0.0..=1.0`.
    pub fn progress_fraction(&self) -> f64 {
        if self.bytes_to_copy == 0 {
            return if self.is_done { 1.0 } else { 0.0 };
        }
        (self.bytes_copied as f64 / self.bytes_to_copy as f64).min(1.0)
    }
}
