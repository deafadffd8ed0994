//! Session synchronizer: the dispatch table at the heart of the realtime
//! session.
//!
//! Every inbound event follows the same path: validate the payload, commit
//! the store write, and only then fan the update out to the room under that
//! event's declared policy. The synchronizer holds no state of its own; the
//! store owns the documents and the registry owns membership. There is no
//! per-project lock or queue around the read-modify-write, so concurrent
//! writes to the same field resolve by store-completion order
//! (last-writer-wins).

use crate::broadcast::FanoutPolicy;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::store::StoreError;
use crate::types::*;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("invalid payload: {0}")]
    Validation(String),

    #[error("project not found: {0}")]
    NotFound(ProjectId),

    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl From<StoreError> for SyncError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => SyncError::NotFound(id),
            StoreError::Unavailable(msg) => SyncError::Persistence(msg),
        }
    }
}

impl SyncError {
    fn code(&self) -> &'static str {
        match self {
            SyncError::Validation(_) => "VALIDATION",
            SyncError::NotFound(_) => "NOT_FOUND",
            SyncError::Persistence(_) => "PERSISTENCE",
        }
    }
}

/// Fan-out policy per event type. This is the whole asymmetry contract in
/// one place: high-frequency transform/camera updates skip the sender (it
/// already holds the authoritative local value), everything else echoes to
/// the sender as a write acknowledgment. Join has no broadcast at all; the
/// snapshot goes to the caller only.
pub fn fanout_policy(msg: &ClientMessage) -> Option<FanoutPolicy> {
    match msg {
        ClientMessage::Join { .. } => None,
        ClientMessage::UpdateObject { .. } => Some(FanoutPolicy::ExcludeSender),
        ClientMessage::UpdateCamera { .. } => Some(FanoutPolicy::ExcludeSender),
        ClientMessage::UpdateColor { .. } => Some(FanoutPolicy::IncludeSender),
        ClientMessage::AddAnnotation { .. } => Some(FanoutPolicy::IncludeSender),
        ClientMessage::DeleteAnnotation { .. } => Some(FanoutPolicy::IncludeSender),
        ClientMessage::SendMessage { .. } => Some(FanoutPolicy::IncludeSender),
        ClientMessage::ModelUploaded { .. } => Some(FanoutPolicy::IncludeSender),
    }
}

fn project_of(msg: &ClientMessage) -> &ProjectId {
    match msg {
        ClientMessage::Join { project_id }
        | ClientMessage::UpdateObject { project_id, .. }
        | ClientMessage::UpdateCamera { project_id, .. }
        | ClientMessage::UpdateColor { project_id, .. }
        | ClientMessage::AddAnnotation { project_id, .. }
        | ClientMessage::DeleteAnnotation { project_id, .. }
        | ClientMessage::SendMessage { project_id, .. }
        | ClientMessage::ModelUploaded { project_id, .. } => project_id,
    }
}

/// Handle one client event. The returned message, if any, is a local reply
/// to the initiating connection; room-wide effects go through the fan-out.
pub async fn handle_event(
    msg: ClientMessage,
    connection_id: &ConnectionId,
    state: &AppState,
) -> Option<ServerMessage> {
    if let ClientMessage::Join { project_id } = &msg {
        return handle_join(project_id, connection_id, state).await;
    }

    let project_id = project_of(&msg).clone();
    // Every mutation event carries a policy; only Join is policy-less.
    let policy = fanout_policy(&msg)?;

    match apply(&msg, state).await {
        Ok(event) => {
            let members = state.rooms.members(&project_id).await;
            state
                .fanout
                .deliver(&members, connection_id, policy, event)
                .await;
            None
        }
        Err(e) => {
            tracing::warn!("Event for project {} rejected: {}", project_id, e);
            Some(ServerMessage::Error {
                code: e.code().to_string(),
                msg: e.to_string(),
            })
        }
    }
}

/// Read-only join path: record membership, read the document, push the full
/// snapshot to the caller only. An unknown project id is a silent no-op —
/// no snapshot and no error event. Surprising, but clients depend on it.
async fn handle_join(
    project_id: &ProjectId,
    connection_id: &ConnectionId,
    state: &AppState,
) -> Option<ServerMessage> {
    let scene = match state.store.load(project_id).await {
        Ok(scene) => scene,
        Err(StoreError::NotFound(_)) => {
            tracing::debug!("Join ignored for unknown project {}", project_id);
            return None;
        }
        Err(e) => {
            tracing::warn!("Join failed to load project {}: {}", project_id, e);
            return None;
        }
    };

    state.rooms.join(connection_id, project_id).await;
    tracing::info!("Connection {} joined project {}", connection_id, project_id);

    Some(ServerMessage::Snapshot {
        project_id: project_id.clone(),
        scene,
    })
}

/// Validate a mutation payload and commit its store write. Returns the event
/// to broadcast; the caller broadcasts only on Ok, so a failed write is
/// never followed by a delivery.
async fn apply(msg: &ClientMessage, state: &AppState) -> Result<ServerMessage, SyncError> {
    match msg {
        ClientMessage::UpdateObject {
            project_id,
            position,
            rotation,
            scale,
        } => {
            let transform = Transform {
                position: *position,
                rotation: *rotation,
                scale: *scale,
            };
            state.store.write_object(project_id, transform).await?;
            Ok(ServerMessage::ObjectUpdated {
                project_id: project_id.clone(),
                position: *position,
                rotation: *rotation,
                scale: *scale,
            })
        }

        ClientMessage::UpdateCamera {
            project_id,
            camera,
            connection_hint,
        } => {
            state.store.write_camera(project_id, *camera).await?;
            Ok(ServerMessage::CameraUpdated {
                project_id: project_id.clone(),
                camera: *camera,
                connection_hint: connection_hint.clone(),
            })
        }

        ClientMessage::UpdateColor { project_id, color } => {
            if color.is_empty() {
                return Err(SyncError::Validation("color must not be empty".into()));
            }
            state.store.write_color(project_id, color.clone()).await?;
            Ok(ServerMessage::ColorUpdated {
                project_id: project_id.clone(),
                color: color.clone(),
            })
        }

        ClientMessage::AddAnnotation {
            project_id,
            annotation,
        } => {
            if annotation.id.is_empty() {
                return Err(SyncError::Validation(
                    "annotation must carry an id".into(),
                ));
            }
            state
                .store
                .append_annotation(project_id, annotation.clone())
                .await?;
            Ok(ServerMessage::AnnotationAdded {
                project_id: project_id.clone(),
                annotation: annotation.clone(),
            })
        }

        ClientMessage::DeleteAnnotation {
            project_id,
            annotation_id,
        } => {
            if annotation_id.is_empty() {
                return Err(SyncError::Validation(
                    "annotation id must not be empty".into(),
                ));
            }
            // Removing an id that was never added is a no-op, not an error
            state
                .store
                .remove_annotation(project_id, annotation_id)
                .await?;
            Ok(ServerMessage::AnnotationDeleted {
                project_id: project_id.clone(),
                annotation_id: annotation_id.clone(),
            })
        }

        ClientMessage::SendMessage {
            project_id,
            message,
        } => {
            if message.author.is_empty() || message.text.is_empty() {
                return Err(SyncError::Validation(
                    "chat message requires author and text".into(),
                ));
            }
            let stamped = ChatMessage {
                author: message.author.clone(),
                text: message.text.clone(),
                sent_at: Some(chrono::Utc::now().to_rfc3339()),
            };
            state
                .store
                .append_chat(project_id, stamped.clone())
                .await?;
            Ok(ServerMessage::ReceiveMessage {
                project_id: project_id.clone(),
                message: stamped,
            })
        }

        ClientMessage::ModelUploaded {
            project_id,
            model_url,
        } => {
            if model_url.is_empty() {
                return Err(SyncError::Validation("model_url must not be empty".into()));
            }
            state
                .store
                .apply_model_swap(project_id, model_url.clone())
                .await?;
            Ok(ServerMessage::ModelLoaded {
                project_id: project_id.clone(),
                model_url: model_url.clone(),
            })
        }

        ClientMessage::Join { .. } => unreachable!("join is handled before apply"),
    }
}
