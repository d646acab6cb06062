use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AppPathsError {
    #[error("Could not determine home directory")]
    HomeDirUnavailable,
    #[error("Could not determine config directory")]
    ConfigDirUnavailable,
    #[error("Could not determine data directory")]
    DataDirUnavailable,
}

pub struct AppPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    /// Steam's compatibility tools directory, where each installed Proton
    /// build lives as an immediate subdirectory.
    pub install_root: PathBuf,
}

impl AppPaths {
    /// Build application paths for the current user.
    ///
    /// # Errors
    /// Returns an error when a required base directory (home, config or data
    /// directory) cannot be determined.
    pub fn new() -> Result<Self, AppPathsError> {
        let home = dirs::home_dir().ok_or(AppPathsError::HomeDirUnavailable)?;

        #[cfg(target_os = "macos")]
        {
            Ok(Self {
                config_dir: home.join("Library/Application Support/proton-manager"),
                data_dir: home.join("Library/Application Support/proton-manager"),
                install_root: home.join("Library/Application Support/Steam/compatibilitytools.d"),
            })
        }

        #[cfg(not(target_os = "macos"))]
        {
            Ok(Self {
                config_dir: dirs::config_dir()
                    .ok_or(AppPathsError::ConfigDirUnavailable)?
                    .join("proton-manager"),
                data_dir: dirs::data_dir()
                    .ok_or(AppPathsError::DataDirUnavailable)?
                    .join("proton-manager"),
                install_root: home.join(".steam/root/compatibilitytools.d"),
            })
        }
    }

    #[must_use]
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("config.yaml")
    }

    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("proton-manager.log")
    }

    /// Ensure the config and data directories exist on disk.
    ///
    /// The install root is not created here; the installer owns it.
    ///
    /// # Errors
    /// Returns an error if any directory cannot be created.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}
