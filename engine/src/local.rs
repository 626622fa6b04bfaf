//! Local filesystem backend.
//!
//! `LocalFiles` implements [`Files`] over `std::fs`. Open options are
//! validated with [`resolve_open_options`] and mapped onto
//! `std::fs::OpenOptions`.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::error::CopyError;
use crate::files::{resolve_open_options, Disposition, Files, OpenOption};

/// [`Files`] implementation for the local disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFiles;

impl LocalFiles {
    pub fn new() -> Self {
        LocalFiles
    }
}

/// Map an io error on `path` to the matching engine error.
fn map_io_error(path: &Path, action: &str, err: io::Error) -> CopyError {
    match err.kind() {
        io::ErrorKind::NotFound => CopyError::NoSuchFile {
            path: path.to_path_buf(),
        },
        io::ErrorKind::AlreadyExists => CopyError::AlreadyExists {
            path: path.to_path_buf(),
        },
        _ => CopyError::io(format!("Failed to {} {}", action, path.display()), err),
    }
}

impl Files for LocalFiles {
    fn exists(&self, path: &Path) -> Result<bool, CopyError> {
        path.try_exists()
            .map_err(|e| map_io_error(path, "stat", e))
    }

    fn is_directory(&self, path: &Path) -> Result<bool, CopyError> {
        match fs::metadata(path) {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(map_io_error(path, "stat", e)),
        }
    }

    fn is_symbolic_link(&self, path: &Path) -> Result<bool, CopyError> {
        match fs::symlink_metadata(path) {
            Ok(metadata) => Ok(metadata.file_type().is_symlink()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(map_io_error(path, "stat", e)),
        }
    }

    fn size(&self, path: &Path) -> Result<u64, CopyError> {
        fs::metadata(path)
            .map(|metadata| metadata.len())
            .map_err(|e| map_io_error(path, "stat", e))
    }

    fn new_input_stream(&self, path: &Path) -> Result<Box<dyn Read + Send>, CopyError> {
        let file = fs::File::open(path).map_err(|e| map_io_error(path, "open", e))?;
        Ok(Box::new(file))
    }

    fn new_output_stream(
        &self,
        path: &Path,
        options: &[OpenOption],
    ) -> Result<Box<dyn Write + Send>, CopyError> {
        let resolved = resolve_open_options(options)?;

        let mut open = fs::OpenOptions::new();
        if resolved.append {
            open.append(true);
        } else {
            open.write(true).truncate(true);
        }
        match resolved.disposition {
            Disposition::Open => {}
            Disposition::OpenOrCreate => {
                open.create(true);
            }
            Disposition::Create => {
                open.create_new(true);
            }
        }

        let file = open.open(path).map_err(|e| map_io_error(path, "open", e))?;
        Ok(Box::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_queries() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let file = temp_dir.path().join("file.txt");
        fs::write(&file, b"test content").expect("Failed to write file");

        let files = LocalFiles::new();
        assert!(files.exists(&file).expect("exists"));
        assert!(!files.is_directory(&file).expect("is_directory"));
        assert!(files.is_directory(temp_dir.path()).expect("is_directory"));
        assert!(!files.is_symbolic_link(&file).expect("is_symbolic_link"));
        assert_eq!(files.size(&file).expect("size"), 12);

        let missing = temp_dir.path().join("missing");
        assert!(!files.exists(&missing).expect("exists"));
        assert!(!files.is_directory(&missing).expect("is_directory"));
        assert!(matches!(
            files.size(&missing),
            Err(CopyError::NoSuchFile { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symbolic_link_detected() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let file = temp_dir.path().join("file.txt");
        let link = temp_dir.path().join("link.txt");
        fs::write(&file, b"data").expect("Failed to write file");
        std::os::unix::fs::symlink(&file, &link).expect("Failed to create link");

        let files = LocalFiles::new();
        assert!(files.is_symbolic_link(&link).expect("is_symbolic_link"));
        assert!(files.exists(&link).expect("exists"));
    }

    #[test]
    fn test_create_fails_on_existing_file() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let file = temp_dir.path().join("file.txt");
        fs::write(&file, b"existing").expect("Failed to write file");

        let result = LocalFiles::new().new_output_stream(&file, &[OpenOption::Create, OpenOption::Append]);
        assert!(matches!(result, Err(CopyError::AlreadyExists { .. })));
    }

    #[test]
    fn test_open_requires_existing_file() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let file = temp_dir.path().join("missing.txt");

        let result = LocalFiles::new().new_output_stream(&file, &[OpenOption::Open, OpenOption::Append]);
        assert!(matches!(result, Err(CopyError::NoSuchFile { .. })));
    }

    #[test]
    fn test_append_and_truncate() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let file = temp_dir.path().join("file.txt");
        fs::write(&file, b"hello").expect("Failed to write file");
        let files = LocalFiles::new();

        {
            let mut out = files
                .new_output_stream(&file, &[OpenOption::Open, OpenOption::Append])
                .expect("open for append");
            out.write_all(b" world").expect("append");
        }
        assert_eq!(fs::read(&file).expect("read"), b"hello world");

        {
            let mut out = files
                .new_output_stream(&file, &[OpenOption::OpenOrCreate, OpenOption::Truncate])
                .expect("open for truncate");
            out.write_all(b"x").expect("write");
        }
        assert_eq!(fs::read(&file).expect("read"), b"x");
    }

    #[test]
    fn test_input_stream_reads_content() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let file = temp_dir.path().join("file.txt");
        fs::write(&file, b"stream me").expect("Failed to write file");

        let mut input = LocalFiles::new().new_input_stream(&file).expect("open");
        let mut content = String::new();
        input.read_to_string(&mut content).expect("read");
        assert_eq!(content, "stream me");
    }
}
