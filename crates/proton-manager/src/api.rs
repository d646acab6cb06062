//! HTTP management API over the installer.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, info};
use proton_core::{InstalledVersion, Installer, ProtonError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct InstallRequest {
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InstallResponse {
    pub installed: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
    pub kind: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ApiErrorBody,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ApiErrorBody {
                error: message.into(),
                kind: "bad_request".to_string(),
            },
        }
    }
}

impl From<ProtonError> for ApiError {
    fn from(error: ProtonError) -> Self {
        Self {
            status: status_for(&error),
            body: ApiErrorBody {
                error: error.to_string(),
                kind: error.kind_name().to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub fn status_for(error: &ProtonError) -> StatusCode {
    match error {
        ProtonError::NotFound { .. } => StatusCode::NOT_FOUND,
        ProtonError::Network { .. }
        | ProtonError::HttpStatus { .. }
        | ProtonError::Resolution { .. } => StatusCode::BAD_GATEWAY,
        ProtonError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        ProtonError::CorruptArchive { .. } | ProtonError::PathTraversal { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ProtonError::Io { .. } | ProtonError::Unreadable { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub fn router(installer: Arc<Installer>) -> Router {
    Router::new()
        .route("/protons", get(list_protons))
        .route("/protons/install", post(install_proton))
        .with_state(installer)
}

/// GET /protons - List installed versions.
async fn list_protons(
    State(installer): State<Arc<Installer>>,
) -> Result<Json<Vec<InstalledVersion>>, ApiError> {
    installer.list_installed().await.map(Json).map_err(|error| {
        error!("Listing installed versions failed: {error}");
        ApiError::from(error)
    })
}

/// POST /protons/install - Install a version; an empty body or missing
/// `version` installs the latest release.
async fn install_proton(
    State(installer): State<Arc<Installer>>,
    body: Bytes,
) -> Result<Json<InstallResponse>, ApiError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        InstallRequest::default()
    } else {
        serde_json::from_slice::<InstallRequest>(&body)
            .map_err(|error| ApiError::bad_request(format!("invalid request body: {error}")))?
    };

    let requested = request.version.unwrap_or_default();
    info!("Install requested: {requested:?}");

    match installer.install(&requested).await {
        Ok(installed) => Ok(Json(InstallResponse { installed })),
        Err(error) => {
            error!("Install of {requested:?} failed: {error}");
            Err(ApiError::from(error))
        }
    }
}
