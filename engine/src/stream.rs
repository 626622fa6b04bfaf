//! Streaming primitives: chunked copy with cancellation, and prefix compare.

use std::io::{self, Read, Write};
use std::path::Path;

use crate::descriptor::CopyInfo;
use crate::error::CopyError;
use crate::files::Files;
use crate::progress::ProgressCallback;

/// Default chunk size for copies and comparisons.
pub const DEFAULT_BUFFER_SIZE: usize = 4 * 1024;

/// Copy `input` to `output` in chunks of `buffer_size` bytes.
///
/// `bytes_copied` on the descriptor is updated after every chunk and the
/// cancellation flag is checked before every read. A cancelled copy records
/// [`CopyError::Cancelled`] on the descriptor and returns `Ok`; at most one
/// chunk is written after the flag is raised.
pub(crate) fn stream_copy(
    input: &mut dyn Read,
    output: &mut dyn Write,
    info: &CopyInfo,
    buffer_size: usize,
    progress: Option<&dyn ProgressCallback>,
) -> Result<(), CopyError> {
    let mut buffer = vec![0u8; buffer_size];
    let mut total: u64 = 0;

    loop {
        if info.is_cancelled() {
            info.set_error(CopyError::Cancelled);
            return Ok(());
        }

        let size = match input.read(&mut buffer) {
            Ok(0) => break,
            Ok(size) => size,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(CopyError::io(
                    format!("Failed to read {}", info.source().display()),
                    e,
                ))
            }
        };

        output.write_all(&buffer[..size]).map_err(|e| {
            CopyError::io(format!("Failed to write {}", info.target().display()), e)
        })?;

        total += size as u64;
        info.set_bytes_copied(total);

        if let Some(callback) = progress {
            callback.on_transfer_progress(info.handle(), total, info.bytes_to_copy());
        }
    }

    output
        .flush()
        .map_err(|e| CopyError::io(format!("Failed to flush {}", info.target().display()), e))
}

/// Discard the first `offset` bytes of `input`.
pub(crate) fn skip(input: &mut dyn Read, offset: u64, path: &Path) -> Result<(), CopyError> {
    let skipped = io::copy(&mut input.take(offset), &mut io::sink())
        .map_err(|e| CopyError::io(format!("Failed to skip into {}", path.display()), e))?;
    if skipped != offset {
        return Err(CopyError::io(
            format!("Failed to skip into {}", path.display()),
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("stream ended after {} of {} bytes", skipped, offset),
            ),
        ));
    }
    Ok(())
}

/// Fill `buffer` as far as the stream allows; returns the number of bytes read.
fn read_chunk(input: &mut dyn Read, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match input.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(size) => filled += size,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Compare two streams chunk by chunk.
///
/// Returns false on the first chunk that differs in length or content, true
/// once both streams end together.
pub(crate) fn streams_equal(
    left: &mut dyn Read,
    right: &mut dyn Read,
    buffer_size: usize,
) -> io::Result<bool> {
    let mut left_buf = vec![0u8; buffer_size];
    let mut right_buf = vec![0u8; buffer_size];

    loop {
        let left_size = read_chunk(left, &mut left_buf)?;
        let right_size = read_chunk(right, &mut right_buf)?;

        if left_size != right_size {
            return Ok(false);
        }
        if left_size == 0 {
            return Ok(true);
        }
        if left_buf[..left_size] != right_buf[..right_size] {
            return Ok(false);
        }
    }
}

/// Check that `target` holds exactly the first `size(target)` bytes of
/// `source`.
pub(crate) fn compare_head(
    files: &dyn Files,
    target: &Path,
    source: &Path,
    target_size: u64,
    buffer_size: usize,
) -> Result<bool, CopyError> {
    let mut target_in = files.new_input_stream(target)?;
    let source_in = files.new_input_stream(source)?;
    let mut source_head = source_in.take(target_size);

    streams_equal(&mut target_in, &mut source_head, buffer_size).map_err(|e| {
        CopyError::io(
            format!(
                "Failed to compare {} to {}",
                source.display(),
                target.display()
            ),
            e,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CopyMode, CopyRequest};
    use std::io::Cursor;
    use std::sync::Mutex;

    /// Reader that hands out at most `max` bytes per call.
    struct Trickle<R> {
        inner: R,
        max: usize,
    }

    impl<R: Read> Read for Trickle<R> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let limit = buf.len().min(self.max);
            self.inner.read(&mut buf[..limit])
        }
    }

    /// Reader that raises the descriptor's cancel flag after `after` reads.
    struct CancelAfter<'a> {
        inner: Cursor<Vec<u8>>,
        info: &'a CopyInfo,
        reads: usize,
        after: usize,
    }

    impl Read for CancelAfter<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads += 1;
            if self.reads == self.after {
                self.info.cancel();
            }
            self.inner.read(buf)
        }
    }

    struct RecordingProgress {
        calls: Mutex<Vec<u64>>,
    }

    impl ProgressCallback for RecordingProgress {
        fn on_transfer_started(&self, _status: &crate::status::CopyStatus) {}

        fn on_transfer_progress(&self, _handle: &str, bytes_copied: u64, _bytes_to_copy: u64) {
            self.calls.lock().unwrap().push(bytes_copied);
        }

        fn on_transfer_completed(&self, _status: &crate::status::CopyStatus) {}
    }

    fn info() -> CopyInfo {
        CopyInfo::new("S-0", CopyRequest::new("/src", "/dst", CopyMode::Create))
    }

    fn data(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_stream_copy_copies_all_bytes() {
        let info = info();
        let source = data(10_000);
        let mut output = Vec::new();

        stream_copy(&mut Cursor::new(source.clone()), &mut output, &info, 4096, None)
            .expect("copy succeeds");

        assert_eq!(output, source);
        assert_eq!(info.bytes_copied(), 10_000);
        assert!(info.error().is_none());
    }

    #[test]
    fn test_stream_copy_reports_each_chunk() {
        let info = info();
        let progress = RecordingProgress {
            calls: Mutex::new(Vec::new()),
        };
        let mut output = Vec::new();

        stream_copy(
            &mut Cursor::new(data(10_000)),
            &mut output,
            &info,
            4096,
            Some(&progress),
        )
        .expect("copy succeeds");

        assert_eq!(*progress.calls.lock().unwrap(), vec![4096, 8192, 10_000]);
    }

    #[test]
    fn test_stream_copy_stops_within_one_chunk_of_cancel() {
        let info = info();
        let mut input = CancelAfter {
            inner: Cursor::new(data(40_000)),
            info: &info,
            reads: 0,
            after: 2,
        };
        let mut output = Vec::new();

        stream_copy(&mut input, &mut output, &info, 4096, None).expect("cancel is not an error");

        // The chunk read when the flag went up is still written.
        assert_eq!(output.len(), 8192);
        assert_eq!(info.bytes_copied(), 8192);
        assert!(info.was_killed());
    }

    #[test]
    fn test_stream_copy_cancelled_before_start_copies_nothing() {
        let info = info();
        info.cancel();
        let mut output = Vec::new();

        stream_copy(&mut Cursor::new(data(100)), &mut output, &info, 4096, None)
            .expect("cancel is not an error");

        assert!(output.is_empty());
        assert_eq!(info.bytes_copied(), 0);
        assert!(info.was_killed());
    }

    #[test]
    fn test_streams_equal_with_irregular_reads() {
        let bytes = data(9_000);
        let mut left = Trickle {
            inner: Cursor::new(bytes.clone()),
            max: 1000,
        };
        let mut right = Trickle {
            inner: Cursor::new(bytes),
            max: 777,
        };
        assert!(streams_equal(&mut left, &mut right, 4096).expect("compare"));
    }

    #[test]
    fn test_streams_equal_detects_difference_and_length() {
        let bytes = data(5_000);
        let mut changed = bytes.clone();
        changed[4_500] ^= 0xff;

        assert!(!streams_equal(&mut Cursor::new(bytes.clone()), &mut Cursor::new(changed), 4096)
            .expect("compare"));
        assert!(!streams_equal(
            &mut Cursor::new(bytes.clone()),
            &mut Cursor::new(bytes[..4_999].to_vec()),
            4096
        )
        .expect("compare"));
    }

    #[test]
    fn test_skip_past_end_fails() {
        let mut input = Cursor::new(data(10));
        assert!(skip(&mut input, 5, Path::new("/src")).is_ok());
        assert!(skip(&mut input, 10, Path::new("/src")).is_err());
    }
}
