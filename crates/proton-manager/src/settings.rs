use std::path::{Path, PathBuf};
use std::time::Duration;

use proton_core::{DEFAULT_RELEASE_INDEX_URL, DEFAULT_RELEASE_REPO_URL, InstallerConfig};
use proton_platform::{AppPaths, AppPathsError};
use serde::{Deserialize, Serialize};
use simplelog::LevelFilter;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("no install_root configured and the default is unavailable: {0}")]
    InstallRoot(#[source] AppPathsError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_api_address")]
    pub api_address: String,

    #[serde(default)]
    pub log_level: LogLevel,

    #[serde(default)]
    pub install_root: Option<PathBuf>,

    #[serde(default = "default_release_repo_url")]
    pub release_repo_url: String,

    #[serde(default = "default_release_api_url")]
    pub release_api_url: String,

    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

fn default_api_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_release_repo_url() -> String {
    DEFAULT_RELEASE_REPO_URL.to_string()
}

fn default_release_api_url() -> String {
    DEFAULT_RELEASE_INDEX_URL.to_string()
}

fn default_fetch_timeout() -> u64 {
    600
}

fn default_http_timeout() -> u64 {
    10
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_address: default_api_address(),
            log_level: LogLevel::default(),
            install_root: None,
            release_repo_url: default_release_repo_url(),
            release_api_url: default_release_api_url(),
            fetch_timeout_secs: default_fetch_timeout(),
            http_timeout_secs: default_http_timeout(),
            max_log_size_bytes: default_max_log_size_bytes(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file. A missing or empty file yields the
    /// defaults; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Settings file location: the explicit override, else the per-user
    /// config directory.
    pub fn default_path() -> Option<PathBuf> {
        AppPaths::new().ok().map(|paths| paths.settings_file())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn installer_config(&self) -> Result<InstallerConfig, SettingsError> {
        let install_root = match &self.install_root {
            Some(root) => root.clone(),
            None => {
                AppPaths::new()
                    .map_err(SettingsError::InstallRoot)?
                    .install_root
            }
        };

        Ok(InstallerConfig {
            install_root,
            release_repo_url: self.release_repo_url.clone(),
            release_index_url: self.release_api_url.clone(),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::{LogLevel, Settings, SettingsError};

    #[test]
    fn defaults_match_expected_values() {
        let settings = Settings::default();

        assert_eq!(settings.api_address, "127.0.0.1:8080");
        assert_eq!(settings.log_level, LogLevel::Info);
        assert!(settings.install_root.is_none());
        assert_eq!(
            settings.release_repo_url,
            "https://github.com/GloriousEggroll/proton-ge-custom"
        );
        assert_eq!(settings.fetch_timeout_secs, 600);
        assert_eq!(settings.http_timeout_secs, 10);
        assert_eq!(settings.max_log_size_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempfile::tempdir().expect("tempdir should be created");

        let settings =
            Settings::load(&temp.path().join("config.yaml")).expect("missing file is not an error");

        assert_eq!(settings.api_address, Settings::default().api_address);
    }

    #[test]
    fn empty_file_yields_defaults() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "\n").expect("settings should be written");

        let settings = Settings::load(&path).expect("empty file is not an error");

        assert_eq!(settings.log_level, LogLevel::Info);
    }

    #[test]
    fn partial_yaml_keeps_defaults_for_missing_keys() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            "api_address: \":9090\"\nlog_level: debug\ninstall_root: /srv/compat\n",
        )
        .expect("settings should be written");

        let settings = Settings::load(&path).expect("settings should parse");

        assert_eq!(settings.api_address, ":9090");
        assert_eq!(settings.log_level, LogLevel::Debug);
        assert_eq!(settings.install_root, Some(PathBuf::from("/srv/compat")));
        assert_eq!(settings.fetch_timeout_secs, 600);
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "log_level: [not, a, level]\n").expect("settings should be written");

        let result = Settings::load(&path);

        assert!(matches!(result, Err(SettingsError::Parse { .. })));
    }

    #[test]
    fn installer_config_uses_explicit_values() {
        let settings = Settings {
            install_root: Some(PathBuf::from("/srv/compat")),
            release_repo_url: "http://mirror.local/proton".to_string(),
            fetch_timeout_secs: 42,
            ..Settings::default()
        };

        let config = settings
            .installer_config()
            .expect("explicit root needs no platform lookup");

        assert_eq!(config.install_root, PathBuf::from("/srv/compat"));
        assert_eq!(config.release_repo_url, "http://mirror.local/proton");
        assert_eq!(config.fetch_timeout, Duration::from_secs(42));
    }

    #[test]
    fn log_levels_map_to_filters() {
        assert_eq!(LogLevel::Warn.filter(), simplelog::LevelFilter::Warn);
        assert_eq!(LogLevel::Trace.filter(), simplelog::LevelFilter::Trace);
    }
}
