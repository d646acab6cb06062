use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use log::{debug, info};
use tokio::io::AsyncWriteExt;

use crate::error::ProtonError;

pub const DEFAULT_RELEASE_REPO_URL: &str = "https://github.com/GloriousEggroll/proton-ge-custom";

/// Download location of a release archive. The tag and the archive base name
/// are the same identifier.
#[must_use]
pub fn archive_url(repo_url: &str, version: &str) -> String {
    format!(
        "{}/releases/download/{version}/{version}.tar.gz",
        repo_url.trim_end_matches('/')
    )
}

#[must_use]
pub fn archive_path(root: &Path, version: &str) -> PathBuf {
    root.join(format!("{version}.tar.gz"))
}

/// A version doubles as a file name under the install root, so it must be a
/// single plain path component.
///
/// # Errors
/// Returns [`ProtonError::PathTraversal`] for empty names, separators, or
/// dot-prefixed names.
pub fn validate_version(version: &str) -> Result<(), ProtonError> {
    let mut components = Path::new(version).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );

    if !single_normal || version.starts_with('.') || version.contains(['/', '\\']) {
        return Err(ProtonError::path_traversal(version));
    }
    Ok(())
}

/// Download the archive for `version` into `<root>/<version>.tar.gz`.
///
/// The file is only created once the server has answered with a success
/// status. Removing it afterwards is the caller's job.
///
/// # Errors
/// Returns [`ProtonError::Network`] on transport failures,
/// [`ProtonError::HttpStatus`] on non-success responses,
/// [`ProtonError::Io`] on local write failures and
/// [`ProtonError::Timeout`] once `timeout` elapses.
pub async fn fetch_archive(
    client: &reqwest::Client,
    repo_url: &str,
    root: &Path,
    version: &str,
    timeout: Duration,
) -> Result<PathBuf, ProtonError> {
    validate_version(version)?;

    let url = archive_url(repo_url, version);
    let dest = archive_path(root, version);

    info!("Downloading {version} from {url}");
    tokio::time::timeout(timeout, download_file(client, &url, &dest, timeout))
        .await
        .map_err(|_| ProtonError::Timeout {
            operation: "archive download",
            seconds: timeout.as_secs(),
        })??;

    Ok(dest)
}

async fn download_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    timeout: Duration,
) -> Result<u64, ProtonError> {
    let response = client.get(url).send().await.map_err(|error| {
        ProtonError::from_request("archive download", &error, timeout.as_secs())
    })?;

    if !response.status().is_success() {
        return Err(ProtonError::HttpStatus {
            operation: "archive download",
            status: response.status().as_u16(),
            url: url.to_string(),
        });
    }

    let total = response.content_length();
    let mut downloaded: u64 = 0;

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|error| ProtonError::io_with_path("create archive file", dest, &error))?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|error| {
            ProtonError::from_request("archive download", &error, timeout.as_secs())
        })?;
        file.write_all(&chunk)
            .await
            .map_err(|error| ProtonError::io_with_path("write archive data", dest, &error))?;
        downloaded += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|error| ProtonError::io_with_path("flush archive file", dest, &error))?;

    if let Some(total) = total {
        debug!("Received {downloaded} of {total} advertised bytes");
    }
    info!("Download complete: {downloaded} bytes");
    Ok(downloaded)
}
