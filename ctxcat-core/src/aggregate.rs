//! Concurrent writing of folder sections into the output artifact.
//!
//! One worker runs per folder, bounded by a semaphore sized to the machine's
//! parallelism. Each worker owns a disjoint byte range of the shared output
//! handle (from the layout plan) and advances a private cursor through it, so
//! the handle needs no lock. Token totals are worker-local and summed only
//! after every worker has joined; failures travel back through the join
//! handles, so simultaneous failures can never block a worker.

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use crate::error::CoreError;
use crate::layout::{file_header, DiscoveredFile, FolderGroups, LayoutPlan};
use crate::tokens::{estimate, EstimateMethod};
use crate::write::WriteAt;

/// Totals for one completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingResult {
    pub total_size: u64,
    pub total_tokens: usize,
}

fn worker_limit() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(4)
}

/// Writes every folder section at its planned offset.
///
/// Waits for all workers even after a failure; the first failure observed
/// (in completion order) is returned and the partially written artifact is
/// the caller's to discard. On success the token totals of all workers are
/// summed and the plan's total size is reported.
pub async fn aggregate<W>(
    groups: &FolderGroups,
    plan: &LayoutPlan,
    delimiter: &str,
    root: &Path,
    out: Arc<W>,
    skip_tokens: bool,
) -> Result<ProcessingResult, CoreError>
where
    W: WriteAt + Send + Sync + 'static,
{
    let workers = Arc::new(Semaphore::new(worker_limit()));
    let mut tasks: JoinSet<Result<usize, CoreError>> = JoinSet::new();

    for (folder, files) in groups.iter() {
        let start = plan
            .offset(folder)
            .expect("plan was built from the same folder groups");

        let permit = Arc::clone(&workers)
            .acquire_owned()
            .await
            .expect("semaphore is never closed");

        debug!("folder {} starts at offset {start}", folder.display());

        let files: Vec<DiscoveredFile> = files.to_vec();
        let root = root.to_path_buf();
        let delimiter = delimiter.to_string();
        let out = Arc::clone(&out);
        tasks.spawn_blocking(move || {
            let _permit = permit;
            write_folder(&root, &files, start, &delimiter, out.as_ref(), skip_tokens)
        });
    }

    let mut total_tokens = 0usize;
    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(tokens)) => total_tokens += tokens,
            Ok(Err(err)) => {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => unreachable!("workers are never cancelled"),
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(ProcessingResult {
            total_size: plan.total_size(),
            total_tokens,
        }),
    }
}

/// Writes one folder's files sequentially starting at `start`. Returns the
/// folder's token total, or the first read/write error; earlier writes are
/// not undone.
fn write_folder<W: WriteAt>(
    root: &Path,
    files: &[DiscoveredFile],
    start: u64,
    delimiter: &str,
    out: &W,
    skip_tokens: bool,
) -> Result<usize, CoreError> {
    let mut offset = start;
    let mut tokens = 0usize;

    for file in files {
        let data = std::fs::read(root.join(&file.path)).map_err(|source| CoreError::Read {
            path: file.path.clone(),
            source,
        })?;

        if !skip_tokens {
            tokens += estimate(&String::from_utf8_lossy(&data), EstimateMethod::Max);
        }

        offset += write_record(out, &file.path, &data, delimiter, offset)?;
    }

    Ok(tokens)
}

/// Writes `header + contents + delimiter` at `offset`; returns bytes written.
fn write_record<W: WriteAt>(
    out: &W,
    path: &Path,
    data: &[u8],
    delimiter: &str,
    offset: u64,
) -> Result<u64, CoreError> {
    let write_err = |offset| move |source| CoreError::Write { offset, source };

    let header = file_header(path);
    out.write_all_at(header.as_bytes(), offset)
        .map_err(write_err(offset))?;

    let mut cursor = offset + header.len() as u64;
    out.write_all_at(data, cursor).map_err(write_err(cursor))?;
    cursor += data.len() as u64;

    if !delimiter.is_empty() {
        out.write_all_at(delimiter.as_bytes(), cursor)
            .map_err(write_err(cursor))?;
        cursor += delimiter.len() as u64;
    }

    Ok(cursor - offset)
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use super::*;

    /// In-memory positional-write target.
    struct MemWriter {
        buf: Mutex<Vec<u8>>,
    }

    impl MemWriter {
        fn new() -> Self {
            Self {
                buf: Mutex::new(Vec::new()),
            }
        }

        fn contents(&self) -> Vec<u8> {
            self.buf.lock().unwrap().clone()
        }
    }

    impl WriteAt for MemWriter {
        fn write_all_at(&self, data: &[u8], offset: u64) -> io::Result<()> {
            let mut buf = self.buf.lock().unwrap();
            let end = offset as usize + data.len();
            if buf.len() < end {
                buf.resize(end, 0);
            }
            buf[offset as usize..end].copy_from_slice(data);
            Ok(())
        }
    }

    #[test]
    fn record_is_header_contents_delimiter() {
        let out = MemWriter::new();
        let path = PathBuf::from("a.txt");

        let written = write_record(&out, &path, b"hi", "\n---\n", 0).unwrap();

        let expected = b"===> File: a.txt\n\nhi\n---\n";
        assert_eq!(out.contents(), expected);
        assert_eq!(written, expected.len() as u64);
    }

    #[test]
    fn empty_delimiter_is_not_written() {
        let out = MemWriter::new();
        let path = PathBuf::from("a.txt");

        let written = write_record(&out, &path, b"hi", "", 0).unwrap();

        assert_eq!(out.contents(), b"===> File: a.txt\n\nhi");
        assert_eq!(written, out.contents().len() as u64);
    }
}
