use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Optional per-folder configuration, read from a YAML file inside the input
/// folder. Values given on the command line win over the file.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub output: Option<String>,
    pub include: Option<String>,
    pub exclude: Option<String>,
    pub disable_gitignore: Option<bool>,
    pub disable_folder_tree: Option<bool>,
    pub non_recursive: Option<bool>,
    pub delimiter: Option<String>,
    pub skip_tokens: Option<bool>,
}

/// Loads the config file if it exists; a missing file is an empty config.
pub fn load(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}
