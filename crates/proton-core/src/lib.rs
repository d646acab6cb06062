//! Proton build management.
//!
//! This crate holds the version manager used by the management API:
//! - Listing the builds installed under the install root.
//! - Resolving "latest" against the upstream release index.
//! - Downloading release archives and unpacking them safely.
//! - Orchestrating installs with per-version serialization.

mod error;
mod extract;
mod fetch;
mod install;
mod locks;
mod resolver;
mod store;
mod types;

/// Error taxonomy shared by every operation.
pub use error::ProtonError;
/// Safe tar.gz extraction into the install root.
pub use extract::extract_archive;
/// Release archive download helpers.
pub use fetch::{
    DEFAULT_RELEASE_REPO_URL, archive_path, archive_url, fetch_archive, validate_version,
};
/// Install orchestration and HTTP client setup.
pub use install::{Installer, InstallerConfig, build_http_client, ensure_install_root};
/// Per-version install serialization.
pub use locks::VersionLocks;
/// Version resolution strategies.
pub use resolver::{
    DEFAULT_RELEASE_INDEX_URL, GitHubRelease, GitHubReleaseResolver, ReleaseResolver, resolve,
};
/// Installed version enumeration.
pub use store::list_installed;
pub use types::{ExtractSummary, InstalledVersion};
