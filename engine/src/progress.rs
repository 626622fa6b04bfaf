//! Progress reporting trait.
//!
//! This module defines the ProgressCallback trait, which allows decoupling
//! the copy engine from any specific UI technology (CLI, GUI, etc.).
//! Polling `CopyEngine::status` works without it; the callback exists for
//! front-ends that prefer being told.

use crate::status::CopyStatus;

/// Trait for receiving progress updates from the copy engine.
///
/// All methods are called synchronously on the thread executing the
/// transfer: the engine's worker for asynchronous submissions, the caller for
/// synchronous ones. Implementations should return quickly.
pub trait ProgressCallback: Send + Sync {
    /// Called when a transfer starts executing.
    fn on_transfer_started(&self, status: &CopyStatus);

    /// Called after each chunk is written.
    fn on_transfer_progress(&self, handle: &str, bytes_copied: u64, bytes_to_copy: u64);

    /// Called when a transfer is done (copied, skipped, failed or killed).
    fn on_transfer_completed(&self, status: &CopyStatus);
}
