use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A Proton build present under the install root.
///
/// `name` is the directory name, which doubles as the version identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledVersion {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub directories: usize,
    pub files: usize,
    pub skipped: usize,
}
