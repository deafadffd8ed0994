//! HTTP API endpoints for project management and asset upload.
//!
//! This is the administrative surface around the realtime session: list,
//! create, and delete project records, and store binary model assets so
//! clients can reference them in `model_uploaded` events. Uploaded files are
//! served statically from the upload directory (see `main.rs`).

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;
use crate::store::StoreError;
use crate::types::ProjectId;

/// Upload configuration, read from the environment at startup
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Directory uploaded assets are written to
    pub upload_dir: String,
    /// Public URL prefix the directory is served under
    pub public_prefix: String,
}

impl UploadConfig {
    pub fn from_env() -> Self {
        Self {
            upload_dir: std::env::var("SCENESYNC_UPLOAD_DIR")
                .unwrap_or_else(|_| "uploads".to_string()),
            public_prefix: "/uploads".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Stable reference usable as a `model_uploaded` model_url
    pub model_url: String,
}

/// List all projects.
///
/// GET /api/projects
pub async fn list_projects(State(state): State<Arc<AppState>>) -> Response {
    match state.store.list_projects().await {
        Ok(projects) => Json(projects).into_response(),
        Err(e) => {
            tracing::error!("Failed to list projects: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "store unavailable").into_response()
        }
    }
}

/// Create a project with a default scene.
///
/// POST /api/projects
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProjectRequest>,
) -> Response {
    if req.title.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "title must not be empty").into_response();
    }

    match state.store.create_project(req.title).await {
        Ok(project) => {
            tracing::info!("Created project {} ({})", project.id, project.title);
            (StatusCode::CREATED, Json(project)).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to create project: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "store unavailable").into_response()
        }
    }
}

/// Delete a project's persisted document.
///
/// DELETE /api/projects/{id}
///
/// Room membership for the project is left as-is; connections still joined
/// simply stop receiving events once nothing mutates the deleted document.
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<ProjectId>,
) -> Response {
    match state.store.delete_project(&project_id).await {
        Ok(()) => {
            tracing::info!("Deleted project {}", project_id);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(StoreError::NotFound(_)) => (StatusCode::NOT_FOUND, "no such project").into_response(),
        Err(e) => {
            tracing::error!("Failed to delete project {}: {}", project_id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "store unavailable").into_response()
        }
    }
}

/// Store a binary model asset.
///
/// POST /api/upload?filename=part.glb (raw body)
pub async fn upload_asset(
    State(config): State<Arc<UploadConfig>>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Response {
    if body.is_empty() {
        return (StatusCode::BAD_REQUEST, "empty upload").into_response();
    }

    let filename = query.filename.unwrap_or_else(|| "model.glb".to_string());

    match save_upload(&config, &filename, &body).await {
        Ok(model_url) => (StatusCode::CREATED, Json(UploadResponse { model_url })).into_response(),
        Err(e) => {
            tracing::error!("Asset upload failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "upload failed").into_response()
        }
    }
}

/// Write the asset under a ulid-prefixed name and return its public URL
pub async fn save_upload(
    config: &UploadConfig,
    filename: &str,
    bytes: &[u8],
) -> std::io::Result<String> {
    let stored_name = format!("{}_{}", ulid::Ulid::new(), sanitize_filename(filename));

    tokio::fs::create_dir_all(&config.upload_dir).await?;
    let path = std::path::Path::new(&config.upload_dir).join(&stored_name);
    tokio::fs::write(&path, bytes).await?;

    Ok(format!("{}/{}", config.public_prefix, stored_name))
}

/// Strip path separators and shell-hostile characters from client filenames
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('_').is_empty() {
        "model.glb".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("part one.glb"), "part_one.glb");
        assert_eq!(sanitize_filename("../../etc/passwd"), "______etc_passwd");
        assert_eq!(sanitize_filename("///"), "model.glb");
        assert_eq!(sanitize_filename("turbine-v2.obj"), "turbine-v2.obj");
    }

    #[tokio::test]
    async fn test_save_upload_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = UploadConfig {
            upload_dir: dir.path().to_string_lossy().into_owned(),
            public_prefix: "/uploads".to_string(),
        };

        let url = save_upload(&config, "part.glb", b"binary-model-data")
            .await
            .unwrap();

        assert!(url.starts_with("/uploads/"));
        assert!(url.ends_with("_part.glb"));

        let stored_name = url.strip_prefix("/uploads/").unwrap();
        let contents = tokio::fs::read(dir.path().join(stored_name)).await.unwrap();
        assert_eq!(contents, b"binary-model-data");
    }
}
