use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use log::{debug, info, warn};

use crate::error::ProtonError;
use crate::types::ExtractSummary;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Unpack a gzip-compressed tar archive into `dest_root`.
///
/// Directories and regular files are materialized with the permission bits
/// recorded in the archive; setuid, setgid and sticky bits are dropped.
/// Directory modes are applied last, so read-only directories can still be
/// filled. Symlinks, hard links, devices and other special entries are
/// skipped. Any entry whose name would land outside `dest_root` aborts the
/// whole extraction before it is written.
///
/// Extraction is not transactional: entries written before a failure stay on
/// disk.
///
/// # Errors
/// Returns [`ProtonError::CorruptArchive`] on gzip or tar format errors,
/// [`ProtonError::PathTraversal`] on escaping entry names and
/// [`ProtonError::Io`] on filesystem failures.
pub fn extract_archive(archive_path: &Path, dest_root: &Path) -> Result<ExtractSummary, ProtonError> {
    let file = File::open(archive_path)
        .map_err(|error| ProtonError::io_with_path("open archive", archive_path, &error))?;
    let decoder = GzDecoder::new(BufReader::new(file));

    info!(
        "Extracting {} into {}",
        archive_path.display(),
        dest_root.display()
    );
    let summary = unpack(decoder, dest_root)?;
    info!(
        "Extraction complete: {} directories, {} files, {} skipped",
        summary.directories, summary.files, summary.skipped
    );
    Ok(summary)
}

fn unpack<R: Read>(reader: R, dest_root: &Path) -> Result<ExtractSummary, ProtonError> {
    let root = dest_root
        .canonicalize()
        .map_err(|error| ProtonError::io_with_path("resolve destination", dest_root, &error))?;

    let mut archive = tar::Archive::new(reader);
    let entries = archive.entries().map_err(ProtonError::corrupt)?;
    let mut summary = ExtractSummary::default();
    let mut directory_modes = Vec::new();

    for entry in entries {
        let mut entry = entry.map_err(ProtonError::corrupt)?;
        let path = entry.path().map_err(ProtonError::corrupt)?.into_owned();
        let name = path.display().to_string();
        let entry_type = entry.header().entry_type();

        if !entry_type.is_dir() && !entry_type.is_file() {
            warn!("Skipping unsupported {entry_type:?} entry: {name}");
            summary.skipped += 1;
            continue;
        }

        let Some(relative) = relative_entry_path(&path, &name)? else {
            continue;
        };
        let target = root.join(&relative);
        let mode = entry.header().mode().map_err(ProtonError::corrupt)? & 0o777;

        if entry_type.is_dir() {
            ensure_contained(&root, &target, &name)?;
            create_dir(&target)?;
            directory_modes.push((target, mode));
            summary.directories += 1;
        } else {
            let parent = target.parent().unwrap_or(&root);
            ensure_contained(&root, parent, &name)?;
            std::fs::create_dir_all(parent).map_err(|error| {
                ProtonError::io_with_path("create parent directory", parent, &error)
            })?;
            write_file(&mut entry, &target, mode)?;
            summary.files += 1;
        }
    }

    // Deepest first, so a read-only parent is locked down after its children.
    directory_modes.sort_by_key(|(path, _)| std::cmp::Reverse(path.components().count()));
    for (path, mode) in &directory_modes {
        set_mode(path, *mode)?;
    }

    Ok(summary)
}

/// Lexical containment: `./` segments are dropped, anything that climbs or
/// anchors the path is rejected. `None` means the entry names the root
/// itself.
fn relative_entry_path(path: &Path, name: &str) -> Result<Option<PathBuf>, ProtonError> {
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ProtonError::path_traversal(name));
            }
        }
    }

    if relative.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(relative))
    }
}

/// Canonical containment: the deepest existing ancestor of `path` must
/// resolve inside `root`. Catches symlinks already present on disk.
fn ensure_contained(root: &Path, path: &Path, name: &str) -> Result<(), ProtonError> {
    let mut existing = path;
    while existing.symlink_metadata().is_err() {
        match existing.parent() {
            Some(parent) => existing = parent,
            None => return Err(ProtonError::path_traversal(name)),
        }
    }

    let resolved = existing
        .canonicalize()
        .map_err(|error| ProtonError::io_with_path("resolve entry path", existing, &error))?;
    if resolved.starts_with(root) {
        Ok(())
    } else {
        Err(ProtonError::path_traversal(name))
    }
}

/// Directories stay owner-writable while their contents are unpacked; the
/// recorded mode is applied once every entry is on disk.
fn create_dir(target: &Path) -> Result<(), ProtonError> {
    std::fs::create_dir_all(target)
        .map_err(|error| ProtonError::io_with_path("create directory", target, &error))?;
    set_mode(target, 0o755)?;
    debug!("Created directory {}", target.display());
    Ok(())
}

fn write_file<R: Read>(entry: &mut R, target: &Path, mode: u32) -> Result<(), ProtonError> {
    // Replace rather than open an existing path: never write through a link,
    // and read-only leftovers from a previous install must not block us.
    if let Ok(metadata) = target.symlink_metadata()
        && !metadata.is_dir()
    {
        std::fs::remove_file(target)
            .map_err(|error| ProtonError::io_with_path("replace existing file", target, &error))?;
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    let mut file = options
        .open(target)
        .map_err(|error| ProtonError::io_with_path("create extracted file", target, &error))?;

    copy_entry(entry, &mut file, target)?;
    file.flush()
        .map_err(|error| ProtonError::io_with_path("flush extracted file", target, &error))?;
    drop(file);

    set_mode(target, mode)
}

/// Copy an entry's payload, keeping read-side (archive) failures apart from
/// write-side (disk) failures.
fn copy_entry<R: Read>(entry: &mut R, out: &mut File, target: &Path) -> Result<u64, ProtonError> {
    let mut buffer = vec![0_u8; COPY_BUFFER_SIZE];
    let mut written: u64 = 0;

    loop {
        let read = match entry.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(error) if error.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(ProtonError::corrupt(error)),
        };
        out.write_all(&buffer[..read])
            .map_err(|error| ProtonError::io_with_path("write extracted file", target, &error))?;
        written += read as u64;
    }

    Ok(written)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), ProtonError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(|error| ProtonError::io_with_path("set permissions", path, &error))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), ProtonError> {
    Ok(())
}
