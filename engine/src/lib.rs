//! # Copy Engine - Asynchronous Transfer Library
//!
//! A headless engine that copies files through a pluggable filesystem
//! backend, one transfer at a time, with cooperative cancellation and a
//! polling status API.
//!
//! ## Overview
//!
//! - Asynchronous (queued) and synchronous (inline) submission
//! - Five modes: create, replace, ignore, append, and resume with optional
//!   byte-for-byte verification of the existing target
//! - Cancellation of queued and running transfers
//! - Status snapshots that stay consistent while a worker mutates progress
//! - Progress reporting via callbacks (decoupled from UI technology)
//!
//! ## Basic Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use copy_engine::{CopyEngine, CopyMode, CopyRequest, EngineConfig, LocalFiles};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = CopyEngine::new(Arc::new(LocalFiles::new()), EngineConfig::default())?;
//!
//! let handle = engine.copy(
//!     CopyRequest::new("/data/in.bin", "/backup/in.bin", CopyMode::Resume { verify: true }),
//!     true,
//! )?;
//!
//! loop {
//!     let status = engine.status(&handle)?;
//!     if status.is_terminal() {
//!         println!("{}: {} of {} bytes", status.state, status.bytes_copied, status.bytes_to_copy);
//!         break;
//!     }
//!     std::thread::sleep(std::time::Duration::from_millis(100));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **model**: Request and state types (CopyRequest, CopyMode, CopyState)
//! - **error**: Error types and handling
//! - **descriptor**: Live per-transfer record shared with the executing thread
//! - **files**: The filesystem capability and path helpers
//! - **local**: Local disk backend
//! - **stream**: Chunked copy and prefix comparison
//! - **engine**: Queue, worker, cancel and status
//! - **status**: Read-only status snapshots
//! - **progress**: Progress callback trait
//! - **config**: Engine configuration

pub mod config;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod files;
pub mod local;
pub mod model;
pub mod progress;
pub mod status;
pub mod stream;
mod strategy;

// Re-export main types
pub use config::EngineConfig;
pub use descriptor::CopyInfo;
pub use engine::CopyEngine;
pub use error::{CopyError, CopyErrorKind};
pub use files::{Files, OpenOption};
pub use local::LocalFiles;
pub use model::{CopyMode, CopyRequest, CopyState};
pub use progress::ProgressCallback;
pub use status::CopyStatus;
