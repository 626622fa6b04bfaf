//! Live record of one submitted transfer.
//!
//! A `CopyInfo` is shared between the engine's bookkeeping and the thread
//! executing the transfer. Every mutable field is an atomic or a set-once
//! cell, so progress can be read while the transfer is running.

use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::{CopyError, CopyErrorKind};
use crate::model::{CopyMode, CopyRequest};

#[derive(Debug)]
pub struct CopyInfo {
    handle: String,
    request: CopyRequest,
    bytes_to_copy: AtomicU64,
    bytes_copied: AtomicU64,
    cancelled: AtomicBool,
    error: OnceLock<Arc<CopyError>>,
    created_at: DateTime<Utc>,
    started_at: OnceLock<DateTime<Utc>>,
    finished_at: OnceLock<DateTime<Utc>>,
}

impl CopyInfo {
    pub fn new(handle: impl Into<String>, request: CopyRequest) -> Self {
        CopyInfo {
            handle: handle.into(),
            request,
            bytes_to_copy: AtomicU64::new(0),
            bytes_copied: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
            error: OnceLock::new(),
            created_at: Utc::now(),
            started_at: OnceLock::new(),
            finished_at: OnceLock::new(),
        }
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn source(&self) -> &Path {
        &self.request.source
    }

    pub fn target(&self) -> &Path {
        &self.request.target
    }

    pub fn mode(&self) -> CopyMode {
        self.request.mode
    }

    pub fn bytes_to_copy(&self) -> u64 {
        self.bytes_to_copy.load(Ordering::Relaxed)
    }

    pub(crate) fn set_bytes_to_copy(&self, bytes: u64) {
        self.bytes_to_copy.store(bytes, Ordering::Relaxed);
    }

    pub fn bytes_copied(&self) -> u64 {
        self.bytes_copied.load(Ordering::Relaxed)
    }

    pub(crate) fn set_bytes_copied(&self, bytes: u64) {
        self.bytes_copied.store(bytes, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Raise the cancellation flag. Returns false if it was already set.
    pub(crate) fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::Relaxed)
    }

    pub fn error(&self) -> Option<Arc<CopyError>> {
        self.error.get().cloned()
    }

    /// Record the terminal error. Only the first error sticks.
    pub(crate) fn set_error(&self, error: CopyError) -> bool {
        self.error.set(Arc::new(error)).is_ok()
    }

    /// True if the transfer ended because it was cancelled.
    pub fn was_killed(&self) -> bool {
        self.error
            .get()
            .is_some_and(|e| e.kind() == CopyErrorKind::Cancelled)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at.get().copied()
    }

    pub(crate) fn mark_started(&self) {
        let _ = self.started_at.set(Utc::now());
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at.get().copied()
    }

    pub(crate) fn mark_finished(&self) {
        let _ = self.finished_at.set(Utc::now());
    }
}
