use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::ProtonError;
use crate::extract::extract_archive;
use crate::fetch::{DEFAULT_RELEASE_REPO_URL, archive_path, fetch_archive, validate_version};
use crate::locks::VersionLocks;
use crate::resolver::{
    DEFAULT_RELEASE_INDEX_URL, GitHubReleaseResolver, ReleaseResolver, resolve,
};
use crate::store::list_installed;
use crate::types::InstalledVersion;

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(600);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct InstallerConfig {
    pub install_root: PathBuf,
    pub release_repo_url: String,
    pub release_index_url: String,
    pub fetch_timeout: Duration,
}

impl InstallerConfig {
    #[must_use]
    pub fn new(install_root: impl Into<PathBuf>) -> Self {
        Self {
            install_root: install_root.into(),
            release_repo_url: DEFAULT_RELEASE_REPO_URL.to_string(),
            release_index_url: DEFAULT_RELEASE_INDEX_URL.to_string(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Build the HTTP client shared by the fetcher and the release resolver.
///
/// # Errors
/// Returns [`ProtonError::Network`] if the TLS backend cannot be initialized.
pub fn build_http_client(connect_timeout: Option<Duration>) -> Result<reqwest::Client, ProtonError> {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT))
        .user_agent(format!("proton-manager/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|error| ProtonError::network("build HTTP client", error))
}

/// Create the install root if needed. Idempotent.
///
/// # Errors
/// Returns [`ProtonError::Io`] when the directory cannot be created.
pub fn ensure_install_root(root: &Path) -> Result<(), ProtonError> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder
        .create(root)
        .map_err(|error| ProtonError::io_with_path("create install root", root, &error))
}

/// Owns the downloaded archive for the duration of one install and removes
/// it on every exit path.
struct TempArchive {
    path: PathBuf,
    removed: bool,
}

impl TempArchive {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            removed: false,
        }
    }

    fn remove(mut self) -> Result<(), ProtonError> {
        self.removed = true;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(ProtonError::io_with_path(
                "remove temporary archive",
                &self.path,
                &error,
            )),
        }
    }
}

impl Drop for TempArchive {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed temporary archive {}", self.path.display()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => warn!(
                "Failed to remove temporary archive {}: {error}",
                self.path.display()
            ),
        }
    }
}

pub struct Installer {
    config: InstallerConfig,
    client: reqwest::Client,
    resolver: Box<dyn ReleaseResolver>,
    locks: VersionLocks,
}

impl Installer {
    /// Installer that resolves "latest" against `config.release_index_url`.
    #[must_use]
    pub fn new(config: InstallerConfig, client: reqwest::Client) -> Self {
        let resolver = GitHubReleaseResolver::new(
            client.clone(),
            config.release_index_url.clone(),
            config.fetch_timeout,
        );
        Self::with_resolver(config, client, Box::new(resolver))
    }

    #[must_use]
    pub fn with_resolver(
        config: InstallerConfig,
        client: reqwest::Client,
        resolver: Box<dyn ReleaseResolver>,
    ) -> Self {
        Self {
            config,
            client,
            resolver,
            locks: VersionLocks::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    /// Snapshot of the versions currently under the install root.
    ///
    /// # Errors
    /// See [`list_installed`].
    pub async fn list_installed(&self) -> Result<Vec<InstalledVersion>, ProtonError> {
        let root = self.config.install_root.clone();
        run_blocking("list installed versions", move || list_installed(&root)).await
    }

    /// Install `requested` (or the latest release when empty) using the
    /// configured download timeout. Returns the installed version.
    ///
    /// # Errors
    /// Returns the first error raised by root creation, resolution, download
    /// or extraction.
    pub async fn install(&self, requested: &str) -> Result<String, ProtonError> {
        self.install_with_timeout(requested, self.config.fetch_timeout)
            .await
    }

    /// Like [`Installer::install`] with a caller-supplied deadline. The
    /// deadline bounds the release lookup and the download, each on its own.
    ///
    /// Extraction runs to completion on a blocking thread even if this future
    /// is dropped; the version stays locked until it ends. A failed install
    /// may leave a partially extracted version directory behind; installing
    /// the same version again overwrites it.
    ///
    /// # Errors
    /// Returns the first error raised by root creation, resolution, download
    /// or extraction.
    pub async fn install_with_timeout(
        &self,
        requested: &str,
        timeout: Duration,
    ) -> Result<String, ProtonError> {
        let root = self.config.install_root.clone();
        {
            let root = root.clone();
            run_blocking("create install root", move || ensure_install_root(&root)).await?;
        }

        let version = tokio::time::timeout(timeout, resolve(requested, self.resolver.as_ref()))
            .await
            .map_err(|_| ProtonError::Timeout {
                operation: "release index",
                seconds: timeout.as_secs(),
            })??;
        validate_version(&version)?;

        let guard = self.locks.acquire(&version).await;
        info!("Installing {version} into {}", root.display());

        let temp = TempArchive::new(archive_path(&root, &version));
        fetch_archive(
            &self.client,
            &self.config.release_repo_url,
            &root,
            &version,
            timeout,
        )
        .await?;

        // The guard and the archive move into the task so they outlive a
        // cancelled caller.
        run_blocking("run extraction", move || {
            let _guard = guard;
            extract_archive(&temp.path, &root)?;
            temp.remove()
        })
        .await?;

        info!("Installed {version}");
        Ok(version)
    }
}

async fn run_blocking<T, F>(context: &'static str, task: F) -> Result<T, ProtonError>
where
    F: FnOnce() -> Result<T, ProtonError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|error| ProtonError::Io {
            context,
            kind: std::io::ErrorKind::Other,
            message: error.to_string(),
        })?
}
