//! The filesystem capability the engine copies through.
//!
//! Backends (local disk, SFTP, FTP, ...) implement [`Files`]; the engine only
//! needs metadata queries and byte streams. Path handling is lexical: the
//! engine never resolves links or touches the backend to compare paths.

use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};

use crate::error::CopyError;

/// Options for opening an output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOption {
    /// Open an existing file; fail if it does not exist
    Open,
    /// Open an existing file or create a new one
    OpenOrCreate,
    /// Create a new file; fail if it already exists
    Create,
    /// Discard existing content
    Truncate,
    /// Write at the end of existing content
    Append,
}

/// How an output stream treats a file that may or may not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Open,
    OpenOrCreate,
    Create,
}

/// A validated set of [`OpenOption`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedOpenOptions {
    pub disposition: Disposition,
    pub append: bool,
}

/// Validate open options: exactly one of `Open`/`OpenOrCreate`/`Create`, and
/// at most one of `Truncate`/`Append`. Without `Append` the file is truncated.
pub fn resolve_open_options(options: &[OpenOption]) -> Result<ResolvedOpenOptions, CopyError> {
    let mut disposition = None;
    let mut truncate = false;
    let mut append = false;

    for option in options {
        let wanted = match option {
            OpenOption::Open => Disposition::Open,
            OpenOption::OpenOrCreate => Disposition::OpenOrCreate,
            OpenOption::Create => Disposition::Create,
            OpenOption::Truncate => {
                truncate = true;
                continue;
            }
            OpenOption::Append => {
                append = true;
                continue;
            }
        };
        match disposition {
            Some(existing) if existing != wanted => {
                return Err(CopyError::InvalidOpenOptions {
                    reason: format!("conflicting options {:?} and {:?}", existing, wanted),
                });
            }
            _ => disposition = Some(wanted),
        }
    }

    if truncate && append {
        return Err(CopyError::InvalidOpenOptions {
            reason: "Truncate and Append are mutually exclusive".to_string(),
        });
    }

    let disposition = disposition.ok_or_else(|| CopyError::InvalidOpenOptions {
        reason: "one of Open, OpenOrCreate or Create is required".to_string(),
    })?;

    Ok(ResolvedOpenOptions {
        disposition,
        append,
    })
}

/// Filesystem operations needed to execute a copy.
///
/// Implementations must be usable from the engine's worker thread and from
/// callers submitting synchronous transfers at the same time.
pub trait Files: Send + Sync {
    fn exists(&self, path: &Path) -> Result<bool, CopyError>;

    fn is_directory(&self, path: &Path) -> Result<bool, CopyError>;

    fn is_symbolic_link(&self, path: &Path) -> Result<bool, CopyError>;

    /// Size of a file in bytes.
    fn size(&self, path: &Path) -> Result<u64, CopyError>;

    fn new_input_stream(&self, path: &Path) -> Result<Box<dyn Read + Send>, CopyError>;

    fn new_output_stream(
        &self,
        path: &Path,
        options: &[OpenOption],
    ) -> Result<Box<dyn Write + Send>, CopyError>;
}

/// Lexically normalize a path, dropping `.` and folding `..` into the
/// preceding component where there is one.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// True if both paths normalize to the same location.
pub fn same_path(a: &Path, b: &Path) -> bool {
    normalize(a) == normalize(b)
}

/// Directory that must exist for `path` to be created.
pub fn parent_dir(path: &Path) -> PathBuf {
    match normalize(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
