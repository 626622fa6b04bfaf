//! Mode strategies.
//!
//! Each strategy checks its preconditions against the [`Files`] backend
//! before opening any stream. Errors are returned to [`execute`], which
//! records them on the descriptor; nothing is propagated past it.

use std::path::Path;
use tracing::debug;

use crate::descriptor::CopyInfo;
use crate::error::CopyError;
use crate::files::{parent_dir, same_path, Files, OpenOption};
use crate::model::CopyMode;
use crate::progress::ProgressCallback;
use crate::stream;

/// Everything a strategy needs besides the descriptor.
#[derive(Clone, Copy)]
pub(crate) struct Transfer<'a> {
    pub files: &'a dyn Files,
    pub buffer_size: usize,
    pub progress: Option<&'a dyn ProgressCallback>,
}

/// Run the strategy selected by the descriptor's mode, recording any failure
/// on the descriptor.
pub(crate) fn execute(transfer: Transfer<'_>, info: &CopyInfo) {
    let result = match info.mode() {
        mode if mode.is_plain_copy() => copy_file(transfer, info),
        CopyMode::Append => append_file(transfer, info),
        CopyMode::Resume { verify } => resume_file(transfer, info, verify),
        mode => Err(CopyError::InvalidMode { mode }),
    };

    if let Err(e) = result {
        info.set_error(e);
    }
}

fn require_exists(files: &dyn Files, path: &Path) -> Result<(), CopyError> {
    if files.exists(path)? {
        Ok(())
    } else {
        Err(CopyError::NoSuchFile {
            path: path.to_path_buf(),
        })
    }
}

fn require_regular_source(
    files: &dyn Files,
    path: &Path,
    reject_links: bool,
) -> Result<(), CopyError> {
    require_exists(files, path)?;
    if files.is_directory(path)? {
        return Err(CopyError::IllegalSourcePath {
            path: path.to_path_buf(),
            reason: "is a directory",
        });
    }
    if reject_links && files.is_symbolic_link(path)? {
        return Err(CopyError::IllegalSourcePath {
            path: path.to_path_buf(),
            reason: "is a symbolic link",
        });
    }
    Ok(())
}

fn require_regular_target(
    files: &dyn Files,
    path: &Path,
    reject_links: bool,
) -> Result<(), CopyError> {
    require_exists(files, path)?;
    if files.is_directory(path)? {
        return Err(CopyError::IllegalTargetPath {
            path: path.to_path_buf(),
            reason: "is a directory",
        });
    }
    if reject_links && files.is_symbolic_link(path)? {
        return Err(CopyError::IllegalTargetPath {
            path: path.to_path_buf(),
            reason: "is a symbolic link",
        });
    }
    Ok(())
}

/// CREATE, REPLACE and IGNORE.
fn copy_file(transfer: Transfer<'_>, info: &CopyInfo) -> Result<(), CopyError> {
    let files = transfer.files;
    let source = info.source();
    let target = info.target();

    let replace = match info.mode() {
        CopyMode::Replace => true,
        CopyMode::Create | CopyMode::Ignore => false,
        mode => return Err(CopyError::InvalidMode { mode }),
    };

    require_regular_source(files, source, false)?;

    if files.exists(target)? {
        match info.mode() {
            CopyMode::Ignore => {
                debug!(handle = info.handle(), target = %target.display(), "target exists, ignoring");
                return Ok(());
            }
            CopyMode::Create => {
                return Err(CopyError::AlreadyExists {
                    path: target.to_path_buf(),
                });
            }
            _ => {}
        }
    }

    let parent = parent_dir(target);
    if !files.exists(&parent)? {
        return Err(CopyError::NoSuchFile { path: parent });
    }

    if same_path(source, target) {
        return Ok(());
    }

    info.set_bytes_to_copy(files.size(source)?);

    let mut input = files.new_input_stream(source)?;
    let options: &[OpenOption] = if replace {
        &[OpenOption::OpenOrCreate, OpenOption::Truncate]
    } else {
        &[OpenOption::Create, OpenOption::Append]
    };
    let mut output = files.new_output_stream(target, options)?;

    stream::stream_copy(
        &mut input,
        &mut output,
        info,
        transfer.buffer_size,
        transfer.progress,
    )
}

/// Append `source`, starting at `from_offset`, to the end of `target`.
fn append_from(transfer: Transfer<'_>, info: &CopyInfo, from_offset: u64) -> Result<(), CopyError> {
    let files = transfer.files;
    let source = info.source();
    let target = info.target();

    let mut input = files.new_input_stream(source)?;
    let mut output = files.new_output_stream(target, &[OpenOption::Open, OpenOption::Append])?;

    if from_offset > 0 {
        stream::skip(&mut input, from_offset, source)?;
    }

    stream::stream_copy(
        &mut input,
        &mut output,
        info,
        transfer.buffer_size,
        transfer.progress,
    )
}

fn append_file(transfer: Transfer<'_>, info: &CopyInfo) -> Result<(), CopyError> {
    let files = transfer.files;
    let source = info.source();
    let target = info.target();

    require_regular_source(files, source, false)?;
    require_regular_target(files, target, false)?;

    if same_path(source, target) {
        return Err(CopyError::IllegalTargetPath {
            path: target.to_path_buf(),
            reason: "cannot append a file to itself",
        });
    }

    info.set_bytes_to_copy(files.size(source)?);
    append_from(transfer, info, 0)
}

fn resume_file(transfer: Transfer<'_>, info: &CopyInfo, verify: bool) -> Result<(), CopyError> {
    let files = transfer.files;
    let source = info.source();
    let target = info.target();

    require_regular_source(files, source, true)?;
    require_regular_target(files, target, true)?;

    if same_path(source, target) {
        return Ok(());
    }

    let target_size = files.size(target)?;
    let source_size = files.size(source)?;

    // A longer target cannot be a partial copy of the source.
    if target_size > source_size {
        return Err(CopyError::InvalidData {
            source_path: source.to_path_buf(),
            target: target.to_path_buf(),
        });
    }

    if verify
        && !stream::compare_head(files, target, source, target_size, transfer.buffer_size)?
    {
        return Err(CopyError::InvalidData {
            source_path: source.to_path_buf(),
            target: target.to_path_buf(),
        });
    }

    if target_size == source_size {
        info.set_bytes_to_copy(0);
        info.set_bytes_copied(0);
        return Ok(());
    }

    info.set_bytes_to_copy(source_size - target_size);
    debug!(
        handle = info.handle(),
        offset = target_size,
        remaining = source_size - target_size,
        "resuming transfer"
    );
    append_from(transfer, info, target_size)
}
