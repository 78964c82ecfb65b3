//! File discovery: walks the input folder and filters what the aggregation
//! engine will see. The engine itself never touches the directory tree.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use tracing::debug;

use crate::layout::{slash_path, DiscoveredFile};

/// Always skipped, regardless of patterns or gitignore settings.
const HARD_IGNORE_DIRS: &[&str] = &[".git", ".vscode"];
const HARD_IGNORE_FILES: &[&str] = &[".gitignore", ".ctxcat.yml"];

pub struct Traverser {
    root: PathBuf,
    use_gitignore: bool,
    recursive: bool,
    include: GlobSet,
    exclude: GlobSet,
}

impl Traverser {
    pub fn new(
        root: PathBuf,
        use_gitignore: bool,
        recursive: bool,
        include: &[String],
        exclude: &[String],
    ) -> Result<Self> {
        Ok(Self {
            root,
            use_gitignore,
            recursive,
            include: build_globset(include).context("invalid include pattern")?,
            exclude: build_globset(exclude).context("invalid exclude pattern")?,
        })
    }

    /// Walks the input folder and returns the files to aggregate, with paths
    /// relative to the root. The walk order is sorted by path so repeated
    /// runs discover files in the same order.
    pub fn traverse(&self) -> Result<Vec<DiscoveredFile>> {
        let mut walker = WalkBuilder::new(&self.root);
        walker
            .hidden(false)
            .ignore(false)
            .parents(false)
            .git_global(false)
            .git_exclude(false)
            .require_git(false)
            .git_ignore(self.use_gitignore)
            .sort_by_file_path(|a, b| a.cmp(b))
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                !HARD_IGNORE_DIRS.contains(&name.as_ref())
            });
        if !self.recursive {
            walker.max_depth(Some(1));
        }

        let mut files = Vec::new();
        for result in walker.build() {
            let entry = result?;
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let rel = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .to_path_buf();
            let rel_display = slash_path(&rel);

            if HARD_IGNORE_FILES.contains(&rel_display.as_str()) {
                continue;
            }
            if !self.include.is_empty() && !self.include.is_match(&rel) {
                debug!("skipping file {:?} by include patterns", rel_display);
                continue;
            }
            if self.exclude.is_match(&rel) {
                debug!("skipping file {:?} by exclude patterns", rel_display);
                continue;
            }

            let metadata = entry
                .metadata()
                .with_context(|| format!("failed to stat {rel_display}"))?;

            debug!("adding file {:?}", rel_display);
            files.push(DiscoveredFile {
                extension: rel
                    .extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                path: rel,
                size: metadata.len(),
            });
        }

        Ok(files)
    }
}

/// Builds a glob set from semicolon-split patterns; empty patterns are
/// dropped, so a list of only empty strings matches nothing (include lists
/// treat an empty set as "match everything").
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        if pattern.is_empty() {
            continue;
        }
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
