//! proton-manager: lists and installs Proton builds for Steam, either from
//! the command line or through a small HTTP management API.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{error, info};
use proton_core::{Installer, build_http_client};
use proton_platform::AppPaths;

mod api;
mod logging;
mod settings;

use settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "proton-manager", version, about = "Manage installed Proton builds")]
struct Cli {
    /// Settings file (YAML). Defaults to the per-user config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP management API (default).
    Serve,
    /// Print installed versions.
    List,
    /// Download and install a version; omit it to install the latest release.
    Install {
        version: Option<String>,

        /// Deadline in seconds for the release lookup and the download,
        /// overriding the configured one.
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings_path = cli.config.clone().or_else(Settings::default_path);
    let settings = match settings_path.as_deref().map(Settings::load) {
        Some(Ok(settings)) => settings,
        Some(Err(error)) => {
            eprintln!("Failed to load settings: {error}");
            return ExitCode::FAILURE;
        }
        None => Settings::default(),
    };

    let log_path = match AppPaths::new() {
        Ok(paths) => {
            if let Err(error) = paths.ensure_dirs() {
                eprintln!("Failed to create application directories: {error}");
            }
            Some(paths.log_file())
        }
        Err(error) => {
            eprintln!("Logging to stderr only: {error}");
            None
        }
    };
    logging::init_logging(
        settings.log_level.filter(),
        log_path.as_deref(),
        settings.max_log_size_bytes,
    );

    match run(cli.command.unwrap_or(Command::Serve), &settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("{message}");
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, settings: &Settings) -> Result<(), String> {
    let config = settings.installer_config().map_err(|e| e.to_string())?;
    let client = build_http_client(Some(settings.http_timeout())).map_err(|e| e.to_string())?;
    let installer = Installer::new(config, client);

    match command {
        Command::Serve => serve(installer, &settings.api_address).await,
        Command::List => {
            let versions = installer
                .list_installed()
                .await
                .map_err(|e| e.to_string())?;
            for version in versions {
                println!("{}\t{}", version.name, version.path.display());
            }
            Ok(())
        }
        Command::Install { version, timeout } => {
            let requested = version.unwrap_or_default();
            let result = match timeout {
                Some(secs) => {
                    installer
                        .install_with_timeout(&requested, Duration::from_secs(secs))
                        .await
                }
                None => installer.install(&requested).await,
            };
            let installed = result.map_err(|e| e.to_string())?;
            println!("Installed {installed}");
            Ok(())
        }
    }
}

async fn serve(installer: Installer, address: &str) -> Result<(), String> {
    let listener = tokio::net::TcpListener::bind(normalize_address(address))
        .await
        .map_err(|e| format!("Failed to bind {address}: {e}"))?;
    let local = listener.local_addr().map_err(|e| e.to_string())?;
    info!(
        "Management API listening on http://{local}, install root {}",
        installer.config().install_root.display()
    );

    axum::serve(listener, api::router(Arc::new(installer)))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .map_err(|e| format!("Server error: {e}"))
}

/// Accept Go-style ":8080" addresses by binding every interface.
fn normalize_address(address: &str) -> String {
    if address.starts_with(':') {
        format!("0.0.0.0{address}")
    } else {
        address.to_string()
    }
}
