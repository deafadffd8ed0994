use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to a project's realtime session and request a snapshot.
    /// An unknown project id is silently ignored (no snapshot, no error).
    Join {
        project_id: ProjectId,
    },
    UpdateObject {
        project_id: ProjectId,
        position: Vec3,
        rotation: Vec3,
        scale: Vec3,
    },
    UpdateCamera {
        project_id: ProjectId,
        camera: CameraPose,
        /// Opaque hint identifying the sending client, echoed through to peers
        #[serde(skip_serializing_if = "Option::is_none")]
        connection_hint: Option<String>,
    },
    UpdateColor {
        project_id: ProjectId,
        color: String,
    },
    AddAnnotation {
        project_id: ProjectId,
        annotation: Annotation,
    },
    DeleteAnnotation {
        project_id: ProjectId,
        annotation_id: AnnotationId,
    },
    SendMessage {
        project_id: ProjectId,
        message: ChatMessage,
    },
    /// Announce that a new model asset is the project's geometry. The server
    /// resets the object transform and color and clears annotations as a side
    /// effect, so clients must not assume only the model reference changed.
    ModelUploaded {
        project_id: ProjectId,
        model_url: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full scene state, delivered only to the joining connection
    Snapshot {
        project_id: ProjectId,
        scene: SceneState,
    },
    ObjectUpdated {
        project_id: ProjectId,
        position: Vec3,
        rotation: Vec3,
        scale: Vec3,
    },
    CameraUpdated {
        project_id: ProjectId,
        camera: CameraPose,
        #[serde(skip_serializing_if = "Option::is_none")]
        connection_hint: Option<String>,
    },
    ColorUpdated {
        project_id: ProjectId,
        color: String,
    },
    AnnotationAdded {
        project_id: ProjectId,
        annotation: Annotation,
    },
    AnnotationDeleted {
        project_id: ProjectId,
        annotation_id: AnnotationId,
    },
    ReceiveMessage {
        project_id: ProjectId,
        message: ChatMessage,
    },
    ModelLoaded {
        project_id: ProjectId,
        model_url: String,
    },
    Error {
        code: String,
        msg: String,
    },
}
