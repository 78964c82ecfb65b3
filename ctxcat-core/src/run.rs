use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::info;

use crate::aggregate::aggregate;
use crate::discover::Traverser;
use crate::error::CoreError;
use crate::layout::{plan, FolderGroups, FsSizer};
use crate::tree;
use crate::write::WriteAt;

/// Fully-validated options for one aggregation run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub use_gitignore: bool,
    pub folder_tree: bool,
    pub recursive: bool,
    pub delimiter: String,
    pub skip_tokens: bool,
}

/// What the run produced, for reporting. Nothing is persisted beyond the
/// output artifact itself.
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub files: usize,
    pub total_size: u64,
    pub total_tokens: usize,
    pub elapsed: Duration,
}

/// Discovers, plans, and aggregates the input folder into the output file.
///
/// On error the output file may exist with partial contents; deciding
/// whether to delete it is left to the caller.
pub async fn run(options: RunOptions) -> Result<RunSummary> {
    if !options.input.exists() {
        return Err(CoreError::InputNotFound(options.input.clone()).into());
    }

    let traverser = Traverser::new(
        options.input.clone(),
        options.use_gitignore,
        options.recursive,
        &options.include,
        &options.exclude,
    )?;
    let files = traverser
        .traverse()
        .with_context(|| format!("error traversing folder {}", options.input.display()))?;

    let found_size: u64 = files.iter().map(|f| f.size).sum();
    info!(
        "Found {} files, total size: {}",
        files.len(),
        format_bytes(found_size)
    );

    let start = Instant::now();
    let file_count = files.len();
    let groups = FolderGroups::from_files(files);

    let out = File::create(&options.output)
        .with_context(|| format!("error creating output file {}", options.output.display()))?;

    if options.folder_tree {
        let mut lead = tree::render(&groups).into_bytes();
        lead.extend_from_slice(options.delimiter.as_bytes());
        out.write_all_at(&lead, 0).context("error writing file tree")?;
    }

    let layout = plan(
        &groups,
        &options.delimiter,
        options.folder_tree,
        &FsSizer::new(options.input.clone()),
    )?;

    let result = aggregate(
        &groups,
        &layout,
        &options.delimiter,
        &options.input,
        Arc::new(out),
        options.skip_tokens,
    )
    .await
    .context("error processing files")?;

    let elapsed = start.elapsed();
    info!(
        "Processed {} files, total size: {}, total tokens estimate: {}, processing time: {:.2?}",
        file_count,
        format_bytes(result.total_size),
        result.total_tokens,
        elapsed
    );

    Ok(RunSummary {
        files: file_count,
        total_size: result.total_size,
        total_tokens: result.total_tokens,
        elapsed,
    })
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "kB", "MB", "GB", "TB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_uses_si_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(999), "999 B");
        assert_eq!(format_bytes(1000), "1.0 kB");
        assert_eq!(format_bytes(1_500_000), "1.5 MB");
    }
}
