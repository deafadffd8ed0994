use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type ProjectId = String;
pub type ConnectionId = String;
pub type AnnotationId = String;

/// Default object color applied on project creation and model swap
pub const DEFAULT_COLOR: &str = "#cccccc";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
    pub const ONE: Vec3 = Vec3 {
        x: 1.0,
        y: 1.0,
        z: 1.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Position/rotation/scale of the shared scene object
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

/// Last-known camera pose, shared so late joiners can match the view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: Vec3,
    pub target: Vec3,
}

/// A spatial marker anchored to the scene. The id is caller-supplied;
/// uniqueness within a project is expected but not enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub position: Vec3,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub author: String,
    pub text: String,
    /// Stamped server-side on append (ISO8601)
    #[serde(default)]
    pub sent_at: Option<String>,
}

/// Canonical mutable scene document for one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneState {
    pub object: Transform,
    pub color: Option<String>,
    pub model_url: Option<String>,
    pub camera: Option<CameraPose>,
    pub annotations: Vec<Annotation>,
    pub chat: Vec<ChatMessage>,
}

impl Default for SceneState {
    fn default() -> Self {
        Self {
            object: Transform::default(),
            color: Some(DEFAULT_COLOR.to_string()),
            model_url: None,
            camera: None,
            annotations: Vec::new(),
            chat: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    pub created_at: String, // ISO timestamp
    pub scene: SceneState,
}
