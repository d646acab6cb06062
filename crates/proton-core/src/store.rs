use std::path::Path;

use log::debug;

use crate::error::ProtonError;
use crate::types::InstalledVersion;

/// List the versions installed under `root`, sorted by name.
///
/// Only directories count as versions; stray files (for example an archive
/// that is still downloading) are ignored. Symlinks are not followed.
///
/// # Errors
/// Returns [`ProtonError::NotFound`] when `root` does not exist and
/// [`ProtonError::Unreadable`] when it cannot be listed.
pub fn list_installed(root: &Path) -> Result<Vec<InstalledVersion>, ProtonError> {
    let entries = std::fs::read_dir(root).map_err(|error| ProtonError::listing(root, &error))?;

    let mut versions = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|error| ProtonError::listing(root, &error))?;
        let file_type = entry
            .file_type()
            .map_err(|error| ProtonError::listing(root, &error))?;
        if !file_type.is_dir() {
            continue;
        }

        versions.push(InstalledVersion {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: root.join(entry.file_name()),
        });
    }

    versions.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(
        "Found {} installed versions in {}",
        versions.len(),
        root.display()
    );
    Ok(versions)
}
