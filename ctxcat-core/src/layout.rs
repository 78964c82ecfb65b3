//! Folder grouping and byte-layout planning.
//!
//! The plan assigns every folder section an absolute starting offset in the
//! output artifact before any data is written. Workers later write at those
//! offsets concurrently, so the plan and the writers must walk folders and
//! files through the same structure: a `BTreeMap` keyed by folder path keeps
//! the iteration order fixed (lexicographic) and identical on both sides.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::tree;

/// A file found by discovery. Paths are relative to the input folder.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub extension: String,
    pub size: u64,
}

/// Files partitioned by parent folder. Files keep their discovery order
/// within a group; folders iterate in lexicographic order.
#[derive(Debug, Default)]
pub struct FolderGroups {
    groups: BTreeMap<PathBuf, Vec<DiscoveredFile>>,
}

impl FolderGroups {
    pub fn from_files(files: Vec<DiscoveredFile>) -> Self {
        let mut groups: BTreeMap<PathBuf, Vec<DiscoveredFile>> = BTreeMap::new();
        for file in files {
            let folder = match file.path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            groups.entry(folder).or_default().push(file);
        }
        Self { groups }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &[DiscoveredFile])> {
        self.groups.iter().map(|(folder, files)| (folder, files.as_slice()))
    }

    pub fn folder_count(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Renders `path` with forward slashes regardless of platform.
pub fn slash_path(path: &Path) -> String {
    let s = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        s.into_owned()
    } else {
        s.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

/// The header written before each file's contents. Computed from the path
/// alone, at planning time and again at write time; the two must agree
/// byte-for-byte or writers would corrupt neighboring sections.
pub fn file_header(path: &Path) -> String {
    format!("===> File: {}\n\n", slash_path(path))
}

/// File-size lookup injected into planning, so tests can plan without a
/// real filesystem.
pub trait FileSizer {
    fn size_of(&self, path: &Path) -> io::Result<u64>;
}

/// Stats files under an input root.
pub struct FsSizer {
    root: PathBuf,
}

impl FsSizer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl FileSizer for FsSizer {
    fn size_of(&self, path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(self.root.join(path))?.len())
    }
}

/// Byte layout of the output artifact: each folder section's starting
/// offset, and the total artifact size.
#[derive(Debug)]
pub struct LayoutPlan {
    offsets: BTreeMap<PathBuf, u64>,
    total_size: u64,
}

impl LayoutPlan {
    pub fn offset(&self, folder: &Path) -> Option<u64> {
        self.offsets.get(folder).copied()
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }
}

/// Computes the byte offset of every folder section.
///
/// When `include_tree` is set the leading tree section (tree text plus one
/// delimiter) is reserved at the front, so the first folder starts after it.
/// Each file contributes `header + contents + delimiter` bytes; the final
/// cursor is the exact size of the finished artifact.
pub fn plan<S: FileSizer>(
    groups: &FolderGroups,
    delimiter: &str,
    include_tree: bool,
    sizer: &S,
) -> Result<LayoutPlan, CoreError> {
    let mut cursor = if include_tree {
        (tree::render(groups).len() + delimiter.len()) as u64
    } else {
        0
    };

    let mut offsets = BTreeMap::new();
    for (folder, files) in groups.iter() {
        offsets.insert(folder.clone(), cursor);
        for file in files {
            let size = sizer
                .size_of(&file.path)
                .map_err(|source| CoreError::FileSizeUnavailable {
                    path: file.path.clone(),
                    source,
                })?;
            cursor += file_header(&file.path).len() as u64 + size + delimiter.len() as u64;
        }
    }

    Ok(LayoutPlan {
        offsets,
        total_size: cursor,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct MapSizer(HashMap<PathBuf, u64>);

    impl FileSizer for MapSizer {
        fn size_of(&self, path: &Path) -> io::Result<u64> {
            self.0
                .get(path)
                .copied()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
        }
    }

    fn file(path: &str, size: u64) -> DiscoveredFile {
        DiscoveredFile {
            path: PathBuf::from(path),
            extension: Path::new(path)
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size,
        }
    }

    fn sizer_for(files: &[DiscoveredFile]) -> MapSizer {
        MapSizer(files.iter().map(|f| (f.path.clone(), f.size)).collect())
    }

    #[test]
    fn groups_partition_on_parent_folder() {
        let groups = FolderGroups::from_files(vec![
            file("a.txt", 1),
            file("src/b.rs", 2),
            file("src/a.rs", 3),
        ]);

        let folders: Vec<_> = groups.iter().map(|(f, _)| f.clone()).collect();
        assert_eq!(folders, vec![PathBuf::from("."), PathBuf::from("src")]);

        let (_, src_files) = groups.iter().nth(1).unwrap();
        // discovery order is preserved, not re-sorted
        assert_eq!(src_files[0].path, PathBuf::from("src/b.rs"));
        assert_eq!(src_files[1].path, PathBuf::from("src/a.rs"));
    }

    #[test]
    fn plan_total_equals_sum_of_record_sizes() {
        let files = vec![file("a.txt", 10), file("src/b.rs", 20), file("lib/c.rs", 7)];
        let sizer = sizer_for(&files);
        let groups = FolderGroups::from_files(files.clone());
        let delimiter = "\n---\n";

        let plan = plan(&groups, delimiter, false, &sizer).unwrap();

        let expected: u64 = files
            .iter()
            .map(|f| file_header(&f.path).len() as u64 + f.size + delimiter.len() as u64)
            .sum();
        assert_eq!(plan.total_size(), expected);
    }

    #[test]
    fn plan_reserves_tree_section() {
        let files = vec![file("a.txt", 10)];
        let sizer = sizer_for(&files);
        let groups = FolderGroups::from_files(files);
        let delimiter = "\n---\n";

        let without = plan(&groups, delimiter, false, &sizer).unwrap();
        let with = plan(&groups, delimiter, true, &sizer).unwrap();

        let reserved = (tree::render(&groups).len() + delimiter.len()) as u64;
        assert_eq!(with.offset(Path::new(".")).unwrap(), reserved);
        assert_eq!(with.total_size(), without.total_size() + reserved);
    }

    #[test]
    fn folder_sections_do_not_overlap() {
        let files = vec![
            file("a.txt", 100),
            file("src/b.rs", 50),
            file("src/c.rs", 1),
            file("lib/d.rs", 0),
        ];
        let sizer = sizer_for(&files);
        let groups = FolderGroups::from_files(files);
        let delimiter = "|";

        let plan = plan(&groups, delimiter, true, &sizer).unwrap();

        // collect each folder's [start, end) range in plan order
        let mut ranges: Vec<(u64, u64)> = Vec::new();
        for (folder, files) in groups.iter() {
            let start = plan.offset(folder).unwrap();
            let len: u64 = files
                .iter()
                .map(|f| file_header(&f.path).len() as u64 + f.size + delimiter.len() as u64)
                .sum();
            ranges.push((start, start + len));
        }

        for pair in ranges.windows(2) {
            assert!(pair[0].1 <= pair[1].0, "sections overlap: {pair:?}");
        }
        assert_eq!(ranges.last().unwrap().1, plan.total_size());
    }

    #[test]
    fn plan_surfaces_missing_file_size() {
        let groups = FolderGroups::from_files(vec![file("a.txt", 1)]);
        let sizer = MapSizer(HashMap::new());

        let err = plan(&groups, "|", false, &sizer).unwrap_err();
        assert!(matches!(err, CoreError::FileSizeUnavailable { .. }));
    }

    #[test]
    fn header_uses_forward_slashes() {
        let header = file_header(Path::new("src/a.rs"));
        assert_eq!(header, "===> File: src/a.rs\n\n");
    }
}
