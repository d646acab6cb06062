use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Deserialize;

use crate::error::ProtonError;

pub const DEFAULT_RELEASE_INDEX_URL: &str =
    "https://api.github.com/repos/GloriousEggroll/proton-ge-custom/releases";

/// Strategy for picking a version when the caller did not name one.
#[async_trait]
pub trait ReleaseResolver: Send + Sync {
    async fn latest(&self) -> Result<String, ProtonError>;
}

/// Map a requested version to a concrete identifier.
///
/// A non-empty request passes through unchanged; an empty (or all
/// whitespace) request asks `resolver` for the newest release.
///
/// # Errors
/// Returns whatever the resolver reports when the request is empty.
pub async fn resolve(
    requested: &str,
    resolver: &dyn ReleaseResolver,
) -> Result<String, ProtonError> {
    if requested.trim().is_empty() {
        let latest = resolver.latest().await?;
        info!("Resolved latest release to {latest}");
        Ok(latest)
    } else {
        Ok(requested.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRelease {
    pub tag_name: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

/// Resolves "latest" against a GitHub-style release listing.
#[derive(Debug, Clone)]
pub struct GitHubReleaseResolver {
    client: reqwest::Client,
    index_url: String,
    timeout: Duration,
}

impl GitHubReleaseResolver {
    #[must_use]
    pub fn new(client: reqwest::Client, index_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            index_url: index_url.into(),
            timeout,
        }
    }

    async fn fetch_releases(&self) -> Result<Vec<GitHubRelease>, ProtonError> {
        let response = self
            .client
            .get(&self.index_url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|error| {
                ProtonError::from_request("release index", &error, self.timeout.as_secs())
            })?;

        if !response.status().is_success() {
            return Err(ProtonError::HttpStatus {
                operation: "release index",
                status: response.status().as_u16(),
                url: self.index_url.clone(),
            });
        }

        response
            .json::<Vec<GitHubRelease>>()
            .await
            .map_err(|error| ProtonError::resolution(format!("invalid release index: {error}")))
    }
}

#[async_trait]
impl ReleaseResolver for GitHubReleaseResolver {
    async fn latest(&self) -> Result<String, ProtonError> {
        debug!("Querying release index {}", self.index_url);
        let releases = tokio::time::timeout(self.timeout, self.fetch_releases())
            .await
            .map_err(|_| ProtonError::Timeout {
                operation: "release index",
                seconds: self.timeout.as_secs(),
            })??;

        pick_latest(&releases).ok_or_else(|| {
            ProtonError::resolution(format!("no stable releases listed at {}", self.index_url))
        })
    }
}

/// Newest published, non-draft, non-prerelease tag.
fn pick_latest(releases: &[GitHubRelease]) -> Option<String> {
    releases
        .iter()
        .filter(|release| !release.draft && !release.prerelease)
        .filter(|release| !release.tag_name.trim().is_empty())
        .max_by(|a, b| {
            a.published_at
                .cmp(&b.published_at)
                .then_with(|| a.tag_name.cmp(&b.tag_name))
        })
        .map(|release| release.tag_name.clone())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::{GitHubRelease, ReleaseResolver, pick_latest, resolve};
    use crate::error::ProtonError;

    struct FixedResolver(Result<String, ProtonError>);

    #[async_trait]
    impl ReleaseResolver for FixedResolver {
        async fn latest(&self) -> Result<String, ProtonError> {
            self.0.clone()
        }
    }

    fn release(tag: &str, published_at: &str, prerelease: bool) -> GitHubRelease {
        GitHubRelease {
            tag_name: tag.to_string(),
            draft: false,
            prerelease,
            published_at: Some(published_at.parse().expect("valid RFC 3339 timestamp")),
        }
    }

    #[tokio::test]
    async fn explicit_version_passes_through_unchanged() {
        let resolver = FixedResolver(Err(ProtonError::resolution("should not be called")));

        let resolved = resolve("GE-Proton9-20", &resolver)
            .await
            .expect("explicit version should resolve");

        assert_eq!(resolved, "GE-Proton9-20");
    }

    #[tokio::test]
    async fn empty_request_uses_resolver() {
        let resolver = FixedResolver(Ok("GE-Proton10-4".to_string()));

        let resolved = resolve("  ", &resolver)
            .await
            .expect("empty request should use resolver");

        assert_eq!(resolved, "GE-Proton10-4");
    }

    #[tokio::test]
    async fn resolver_failure_is_surfaced() {
        let resolver = FixedResolver(Err(ProtonError::resolution("index offline")));

        let result = resolve("", &resolver).await;

        assert_eq!(result, Err(ProtonError::resolution("index offline")));
    }

    #[test]
    fn pick_latest_prefers_newest_stable_release() {
        let releases = vec![
            release("GE-Proton9-27", "2025-03-01T10:00:00Z", false),
            release("GE-Proton10-1", "2025-05-20T10:00:00Z", false),
            release("GE-Proton10-2-rc", "2025-06-01T10:00:00Z", true),
            GitHubRelease {
                tag_name: "GE-Proton10-3".to_string(),
                draft: true,
                prerelease: false,
                published_at: None,
            },
        ];

        assert_eq!(pick_latest(&releases).as_deref(), Some("GE-Proton10-1"));
    }

    #[test]
    fn pick_latest_returns_none_without_stable_releases() {
        let releases = vec![release("GE-Proton10-2-rc", "2025-06-01T10:00:00Z", true)];

        assert!(pick_latest(&releases).is_none());
        assert!(pick_latest(&[]).is_none());
    }

    #[test]
    fn release_index_json_deserializes() {
        let json = r#"[
            {"tag_name": "GE-Proton10-4", "draft": false, "prerelease": false,
             "published_at": "2025-06-10T18:22:01Z", "html_url": "https://example.invalid"}
        ]"#;

        let releases: Vec<GitHubRelease> =
            serde_json::from_str(json).expect("release index should deserialize");

        assert_eq!(pick_latest(&releases).as_deref(), Some("GE-Proton10-4"));
    }
}
