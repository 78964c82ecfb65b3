use crate::layout::{slash_path, FolderGroups};

/// Renders a folder tree summary for the top of the output artifact.
///
/// Folders and files are sorted lexicographically for display only; the
/// order files are written in the artifact is unrelated.
pub fn render(groups: &FolderGroups) -> String {
    let mut out = String::from("File Tree:\n");

    for (folder, files) in groups.iter() {
        out.push_str("└── ");
        out.push_str(&slash_path(folder));
        out.push('\n');

        let mut paths: Vec<String> = files.iter().map(|f| slash_path(&f.path)).collect();
        paths.sort();

        for (i, path) in paths.iter().enumerate() {
            let name = path.rsplit('/').next().unwrap_or(path);
            let branch = if i + 1 == paths.len() {
                "└── "
            } else {
                "├── "
            };
            out.push_str("    ");
            out.push_str(branch);
            out.push_str(name);
            out.push('\n');
        }
    }

    out
}
