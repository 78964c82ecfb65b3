use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the aggregation engine. Every variant is fatal to the
/// run; there is no retry or local recovery anywhere in this crate.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid method '{0}'. Use 'average', 'words', 'chars', 'max', or 'min'")]
    InvalidMethod(String),

    #[error("unable to determine size of {}: {source}", path.display())]
    FileSizeUnavailable { path: PathBuf, source: io::Error },

    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write at offset {offset}: {source}")]
    Write { offset: u64, source: io::Error },

    #[error("input folder {} does not exist", .0.display())]
    InputNotFound(PathBuf),
}
