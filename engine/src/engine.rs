//! The copy engine.
//!
//! A `CopyEngine` owns a FIFO queue of pending transfers, one background
//! worker thread draining it, and a table of finished transfers. All of that
//! bookkeeping sits behind a single mutex; bytes are streamed outside of it,
//! touching only the descriptor's own atomic fields.
//!
//! Lifecycle of a handle:
//!
//! ```text
//! submit(async) -> pending -> running (worker) -> finished
//! submit(sync)  ------------> running (caller) -> finished
//! cancel(pending) ------------------------------> finished (killed)
//! ```

use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::descriptor::CopyInfo;
use crate::error::CopyError;
use crate::files::Files;
use crate::model::{CopyRequest, CopyState};
use crate::progress::ProgressCallback;
use crate::status::CopyStatus;
use crate::strategy::{self, Transfer};

#[derive(Default)]
struct EngineState {
    pending: VecDeque<Arc<CopyInfo>>,
    /// Transfer currently executed by the worker
    running: Option<Arc<CopyInfo>>,
    /// Synchronous transfers executing on caller threads
    inline: HashMap<String, Arc<CopyInfo>>,
    finished: HashMap<String, Arc<CopyInfo>>,
    next_id: u64,
    shutting_down: bool,
}

/// Where a handle currently lives.
enum Slot {
    Pending(usize),
    Running(Arc<CopyInfo>),
    Finished(Arc<CopyInfo>),
}

impl EngineState {
    fn locate(&self, handle: &str) -> Option<Slot> {
        if let Some(running) = self.running.as_ref().filter(|r| r.handle() == handle) {
            return Some(Slot::Running(running.clone()));
        }
        if let Some(info) = self.inline.get(handle) {
            return Some(Slot::Running(info.clone()));
        }
        if let Some(info) = self.finished.get(handle) {
            return Some(Slot::Finished(info.clone()));
        }
        self.pending
            .iter()
            .position(|p| p.handle() == handle)
            .map(Slot::Pending)
    }

    fn contains(&self, handle: &str) -> bool {
        self.locate(handle).is_some()
    }

    /// Move a pending transfer to the finished table without running it.
    fn kill_pending(&mut self, index: usize) -> Option<Arc<CopyInfo>> {
        let info = self.pending.remove(index)?;
        info.cancel();
        info.set_error(CopyError::Cancelled);
        info.mark_finished();
        self.finished
            .insert(info.handle().to_string(), info.clone());
        Some(info)
    }
}

fn running_status(info: &CopyInfo) -> CopyStatus {
    let state = if info.is_cancelled() {
        CopyState::Killed
    } else {
        CopyState::Running
    };
    CopyStatus::capture(info, state, true)
}

struct Shared {
    state: Mutex<EngineState>,
    work_ready: Condvar,
    files: Arc<dyn Files>,
    config: EngineConfig,
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until a transfer is queued; None once shutdown is requested.
    fn next_pending(&self) -> Option<Arc<CopyInfo>> {
        let mut state = self.lock();
        loop {
            if state.shutting_down {
                return None;
            }
            if let Some(info) = state.pending.pop_front() {
                state.running = Some(info.clone());
                return Some(info);
            }
            state = self
                .work_ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn finish_running(&self, info: Arc<CopyInfo>) {
        let mut state = self.lock();
        state.running = None;
        state.finished.insert(info.handle().to_string(), info);
    }

    /// Execute one transfer on the current thread. All descriptor fields are
    /// final when this returns.
    fn run_transfer(&self, info: &CopyInfo) {
        debug!(
            handle = info.handle(),
            source = %info.source().display(),
            target = %info.target().display(),
            mode = %info.mode(),
            "start copy"
        );
        info.mark_started();
        self.notify(info, "on_transfer_started", |callback| {
            callback.on_transfer_started(&CopyStatus::capture(info, CopyState::Running, true))
        });

        let transfer = Transfer {
            files: self.files.as_ref(),
            buffer_size: self.config.buffer_size,
            progress: self.progress.as_deref(),
        };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| strategy::execute(transfer, info)));
        if outcome.is_err() {
            info.set_error(CopyError::io(
                format!("Copy of {} panicked", info.source().display()),
                std::io::Error::other("transfer panicked"),
            ));
        }
        info.mark_finished();

        let status = CopyStatus::terminal(info);
        match &status.error {
            Some(e) if status.state == CopyState::Killed => debug!(
                handle = info.handle(),
                bytes_copied = status.bytes_copied,
                "copy killed: {}",
                e
            ),
            Some(e) => warn!(handle = info.handle(), "copy failed: {}", e),
            None => debug!(
                handle = info.handle(),
                bytes_copied = status.bytes_copied,
                "finished copy"
            ),
        }
        self.notify(info, "on_transfer_completed", |callback| {
            callback.on_transfer_completed(&status)
        });
    }

    /// Invoke the progress callback, if any. A panicking callback is logged
    /// and otherwise ignored so it cannot take the executing thread down.
    fn notify(&self, info: &CopyInfo, event: &str, call: impl FnOnce(&dyn ProgressCallback)) {
        let Some(callback) = self.progress.as_deref() else {
            return;
        };
        if panic::catch_unwind(AssertUnwindSafe(|| call(callback))).is_err() {
            warn!(handle = info.handle(), "progress callback panicked in {}", event);
        }
    }
}

/// Files a synchronous transfer as finished when dropped, including when the
/// calling thread unwinds.
struct InlineRun<'a> {
    shared: &'a Shared,
    info: Arc<CopyInfo>,
}

impl Drop for InlineRun<'_> {
    fn drop(&mut self) {
        self.info.mark_finished();
        let handle = self.info.handle().to_string();
        let mut state = self.shared.lock();
        state.inline.remove(&handle);
        state.finished.insert(handle, self.info.clone());
    }
}

fn worker_loop(shared: Arc<Shared>) {
    while let Some(info) = shared.next_pending() {
        shared.run_transfer(&info);
        shared.finish_running(info);
    }
    debug!("copy worker exiting");
}

/// Executes copy requests against a [`Files`] backend.
///
/// Asynchronous submissions run one at a time, in submission order, on a
/// dedicated worker thread. Dropping the engine shuts it down.
pub struct CopyEngine {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CopyEngine {
    /// Start an engine and its worker thread.
    pub fn new(files: Arc<dyn Files>, config: EngineConfig) -> Result<Self, CopyError> {
        Self::start(files, config, None)
    }

    /// Start an engine that reports progress to `progress`.
    pub fn with_progress(
        files: Arc<dyn Files>,
        config: EngineConfig,
        progress: Arc<dyn ProgressCallback>,
    ) -> Result<Self, CopyError> {
        Self::start(files, config, Some(progress))
    }

    fn start(
        files: Arc<dyn Files>,
        config: EngineConfig,
        progress: Option<Arc<dyn ProgressCallback>>,
    ) -> Result<Self, CopyError> {
        config.validate()?;

        let shared = Arc::new(Shared {
            state: Mutex::new(EngineState::default()),
            work_ready: Condvar::new(),
            files,
            config,
            progress,
        });

        let worker_shared = shared.clone();
        let worker = thread::Builder::new()
            .name(shared.config.worker_name.clone())
            .spawn(move || worker_loop(worker_shared))
            .map_err(|e| CopyError::io("Failed to spawn copy worker", e))?;

        info!(
            worker = %shared.config.worker_name,
            buffer_size = shared.config.buffer_size,
            "copy engine started"
        );

        Ok(CopyEngine {
            shared,
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Allocate a new handle: `prefix` followed by an engine-wide counter.
    pub fn next_handle(&self, prefix: &str) -> String {
        let mut state = self.shared.lock();
        let handle = format!("{}{}", prefix, state.next_id);
        state.next_id += 1;
        handle
    }

    /// Submit a transfer.
    ///
    /// Asynchronous submissions are queued and this returns immediately.
    /// Synchronous ones execute on the calling thread and return once the
    /// transfer is finished. Either way the outcome of the copy itself is
    /// only available through [`status`](Self::status); the error returned
    /// here is about the submission.
    pub fn submit(&self, info: CopyInfo, asynchronous: bool) -> Result<String, CopyError> {
        let handle = info.handle().to_string();
        let info = Arc::new(info);

        {
            let mut state = self.shared.lock();
            if state.shutting_down {
                return Err(CopyError::EngineShutDown);
            }
            if state.contains(&handle) {
                return Err(CopyError::DuplicateTransfer { handle });
            }

            if asynchronous {
                state.pending.push_back(info);
                self.shared.work_ready.notify_one();
                debug!(handle = %handle, queued = state.pending.len(), "copy queued");
                return Ok(handle);
            }

            state.inline.insert(handle.clone(), info.clone());
        }

        let run = InlineRun {
            shared: &self.shared,
            info,
        };
        self.shared.run_transfer(&run.info);
        drop(run);
        Ok(handle)
    }

    /// Allocate a handle with the configured prefix and submit `request`.
    pub fn copy(&self, request: CopyRequest, asynchronous: bool) -> Result<String, CopyError> {
        let handle = self.next_handle(&self.shared.config.handle_prefix);
        self.submit(CopyInfo::new(handle, request), asynchronous)
    }

    /// Cancel a transfer.
    ///
    /// A running transfer is flagged and stops at its next chunk boundary;
    /// the returned snapshot says KILLED while it winds down. A queued
    /// transfer is removed from the queue and never runs. Cancelling a
    /// finished transfer changes nothing and returns its final status.
    pub fn cancel(&self, handle: &str) -> Result<CopyStatus, CopyError> {
        let mut state = self.shared.lock();
        match state.locate(handle) {
            Some(Slot::Running(info)) => {
                if info.cancel() {
                    debug!(handle = handle, "cancelling running copy");
                }
                Ok(running_status(&info))
            }
            Some(Slot::Pending(index)) => {
                let info = state
                    .kill_pending(index)
                    .ok_or_else(|| CopyError::NoSuchTransfer {
                        handle: handle.to_string(),
                    })?;
                debug!(handle = handle, "cancelled queued copy");
                Ok(CopyStatus::capture(&info, CopyState::Pending, false))
            }
            Some(Slot::Finished(info)) => Ok(CopyStatus::terminal(&info)),
            None => Err(CopyError::NoSuchTransfer {
                handle: handle.to_string(),
            }),
        }
    }

    /// Snapshot of a transfer's state and progress.
    pub fn status(&self, handle: &str) -> Result<CopyStatus, CopyError> {
        let state = self.shared.lock();
        match state.locate(handle) {
            Some(Slot::Running(info)) => Ok(running_status(&info)),
            Some(Slot::Pending(index)) => Ok(CopyStatus::capture(
                &state.pending[index],
                CopyState::Pending,
                false,
            )),
            Some(Slot::Finished(info)) => Ok(CopyStatus::terminal(&info)),
            None => Err(CopyError::NoSuchTransfer {
                handle: handle.to_string(),
            }),
        }
    }

    /// Remove a finished transfer from the engine, returning its final
    /// status. The handle is unknown to the engine afterwards.
    pub fn reap(&self, handle: &str) -> Result<CopyStatus, CopyError> {
        let mut state = self.shared.lock();
        if let Some(info) = state.finished.remove(handle) {
            return Ok(CopyStatus::terminal(&info));
        }
        if state.contains(handle) {
            return Err(CopyError::TransferNotFinished {
                handle: handle.to_string(),
            });
        }
        Err(CopyError::NoSuchTransfer {
            handle: handle.to_string(),
        })
    }

    /// Number of transfers waiting for the worker.
    pub fn pending_count(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// Stop accepting transfers and stop the worker.
    ///
    /// Queued transfers are cancelled and filed as finished (KILLED) without
    /// running. Running transfers are flagged for cancellation; this waits
    /// for the worker's current chunk to complete. Safe to call repeatedly.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.lock();
            if !state.shutting_down {
                state.shutting_down = true;
                let mut drained = 0;
                while !state.pending.is_empty() {
                    state.kill_pending(0);
                    drained += 1;
                }
                if let Some(running) = &state.running {
                    running.cancel();
                }
                for info in state.inline.values() {
                    info.cancel();
                }
                info!(drained = drained, "copy engine shutting down");
            }
            self.shared.work_ready.notify_all();
        }

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            if worker.thread().id() != thread::current().id() && worker.join().is_err() {
                warn!("copy worker terminated abnormally");
            }
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.lock().shutting_down
    }
}

impl Drop for CopyEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
