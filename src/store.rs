//! Canonical persisted scene state, one document per project.
//!
//! The store is the only durable state in the system. Every write targets a
//! single field or field group and is atomic at that granularity; there is no
//! transaction spanning different event types and no per-project write queue.
//! Under concurrent writers the persisted value is whichever write completes
//! last (last-writer-wins).

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::types::*;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("project not found: {0}")]
    NotFound(ProjectId),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Field-level reads and writes against the per-project scene document.
///
/// Injectable so tests can substitute a store that controls write-completion
/// order. A write that returns an error must never be followed by a broadcast.
#[async_trait]
pub trait SceneStore: Send + Sync {
    async fn load(&self, project_id: &ProjectId) -> StoreResult<SceneState>;

    async fn write_object(&self, project_id: &ProjectId, transform: Transform) -> StoreResult<()>;

    async fn write_camera(&self, project_id: &ProjectId, camera: CameraPose) -> StoreResult<()>;

    async fn write_color(&self, project_id: &ProjectId, color: String) -> StoreResult<()>;

    async fn append_annotation(
        &self,
        project_id: &ProjectId,
        annotation: Annotation,
    ) -> StoreResult<()>;

    /// Removes every annotation matching the id. Absent ids are a no-op.
    async fn remove_annotation(
        &self,
        project_id: &ProjectId,
        annotation_id: &AnnotationId,
    ) -> StoreResult<()>;

    async fn append_chat(&self, project_id: &ProjectId, message: ChatMessage) -> StoreResult<()>;

    /// Atomically sets the model reference, resets the object to the default
    /// transform and color, and clears annotations. A model swap invalidates
    /// annotations anchored to the old geometry.
    async fn apply_model_swap(&self, project_id: &ProjectId, model_url: String) -> StoreResult<()>;

    // Admin contract

    async fn create_project(&self, title: String) -> StoreResult<Project>;

    async fn list_projects(&self) -> StoreResult<Vec<Project>>;

    async fn delete_project(&self, project_id: &ProjectId) -> StoreResult<()>;
}

/// In-memory store backing a single-process deployment
pub struct MemoryStore {
    projects: RwLock<HashMap<ProjectId, Project>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            projects: RwLock::new(HashMap::new()),
        }
    }

    /// Run a closure against one project's scene under the write lock
    async fn with_scene<F>(&self, project_id: &ProjectId, f: F) -> StoreResult<()>
    where
        F: FnOnce(&mut SceneState),
    {
        let mut projects = self.projects.write().await;
        let project = projects
            .get_mut(project_id)
            .ok_or_else(|| StoreError::NotFound(project_id.clone()))?;
        f(&mut project.scene);
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SceneStore for MemoryStore {
    async fn load(&self, project_id: &ProjectId) -> StoreResult<SceneState> {
        let projects = self.projects.read().await;
        projects
            .get(project_id)
            .map(|p| p.scene.clone())
            .ok_or_else(|| StoreError::NotFound(project_id.clone()))
    }

    async fn write_object(&self, project_id: &ProjectId, transform: Transform) -> StoreResult<()> {
        self.with_scene(project_id, |scene| scene.object = transform)
            .await
    }

    async fn write_camera(&self, project_id: &ProjectId, camera: CameraPose) -> StoreResult<()> {
        self.with_scene(project_id, |scene| scene.camera = Some(camera))
            .await
    }

    async fn write_color(&self, project_id: &ProjectId, color: String) -> StoreResult<()> {
        self.with_scene(project_id, |scene| scene.color = Some(color))
            .await
    }

    async fn append_annotation(
        &self,
        project_id: &ProjectId,
        annotation: Annotation,
    ) -> StoreResult<()> {
        self.with_scene(project_id, |scene| scene.annotations.push(annotation))
            .await
    }

    async fn remove_annotation(
        &self,
        project_id: &ProjectId,
        annotation_id: &AnnotationId,
    ) -> StoreResult<()> {
        self.with_scene(project_id, |scene| {
            scene.annotations.retain(|a| a.id != *annotation_id)
        })
        .await
    }

    async fn append_chat(&self, project_id: &ProjectId, message: ChatMessage) -> StoreResult<()> {
        self.with_scene(project_id, |scene| scene.chat.push(message))
            .await
    }

    async fn apply_model_swap(&self, project_id: &ProjectId, model_url: String) -> StoreResult<()> {
        self.with_scene(project_id, |scene| {
            scene.model_url = Some(model_url);
            scene.object = Transform::default();
            scene.color = Some(DEFAULT_COLOR.to_string());
            scene.annotations.clear();
        })
        .await
    }

    async fn create_project(&self, title: String) -> StoreResult<Project> {
        let project = Project {
            id: ulid::Ulid::new().to_string(),
            title,
            created_at: chrono::Utc::now().to_rfc3339(),
            scene: SceneState::default(),
        };

        let mut projects = self.projects.write().await;
        projects.insert(project.id.clone(), project.clone());
        Ok(project)
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        let projects = self.projects.read().await;
        let mut list: Vec<Project> = projects.values().cloned().collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(list)
    }

    async fn delete_project(&self, project_id: &ProjectId) -> StoreResult<()> {
        let mut projects = self.projects.write().await;
        projects
            .remove(project_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(project_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_project_defaults() {
        let store = MemoryStore::new();
        let project = store.create_project("Demo".to_string()).await.unwrap();

        assert_eq!(project.title, "Demo");
        assert!(!project.id.is_empty());

        let scene = store.load(&project.id).await.unwrap();
        assert_eq!(scene.object, Transform::default());
        assert_eq!(scene.color, Some(DEFAULT_COLOR.to_string()));
        assert!(scene.camera.is_none());
        assert!(scene.model_url.is_none());
        assert!(scene.annotations.is_empty());
        assert!(scene.chat.is_empty());
    }

    #[tokio::test]
    async fn test_load_unknown_project() {
        let store = MemoryStore::new();
        let result = store.load(&"nope".to_string()).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_write_object_persists() {
        let store = MemoryStore::new();
        let project = store.create_project("Demo".to_string()).await.unwrap();

        let transform = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Vec3::new(0.0, 0.5, 0.0),
            scale: Vec3::ONE,
        };
        store.write_object(&project.id, transform).await.unwrap();

        let scene = store.load(&project.id).await.unwrap();
        assert_eq!(scene.object, transform);
    }

    #[tokio::test]
    async fn test_write_against_unknown_project() {
        let store = MemoryStore::new();
        let result = store
            .write_color(&"nope".to_string(), "#ff0000".to_string())
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_annotation_add_then_remove() {
        let store = MemoryStore::new();
        let project = store.create_project("Demo".to_string()).await.unwrap();

        let annotation = Annotation {
            id: "a1".to_string(),
            position: Vec3::new(0.1, 0.2, 0.3),
            text: "check this edge".to_string(),
        };
        store
            .append_annotation(&project.id, annotation)
            .await
            .unwrap();
        assert_eq!(store.load(&project.id).await.unwrap().annotations.len(), 1);

        store
            .remove_annotation(&project.id, &"a1".to_string())
            .await
            .unwrap();
        assert!(store.load(&project.id).await.unwrap().annotations.is_empty());
    }

    #[tokio::test]
    async fn test_remove_missing_annotation_is_noop() {
        let store = MemoryStore::new();
        let project = store.create_project("Demo".to_string()).await.unwrap();

        let result = store
            .remove_annotation(&project.id, &"ghost".to_string())
            .await;
        assert!(result.is_ok());
        assert!(store.load(&project.id).await.unwrap().annotations.is_empty());
    }

    #[tokio::test]
    async fn test_chat_is_append_only_in_order() {
        let store = MemoryStore::new();
        let project = store.create_project("Demo".to_string()).await.unwrap();

        for text in ["first", "second", "third"] {
            store
                .append_chat(
                    &project.id,
                    ChatMessage {
                        author: "ana".to_string(),
                        text: text.to_string(),
                        sent_at: None,
                    },
                )
                .await
                .unwrap();
        }

        let chat = store.load(&project.id).await.unwrap().chat;
        let texts: Vec<&str> = chat.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_model_swap_resets_scene() {
        let store = MemoryStore::new();
        let project = store.create_project("Demo".to_string()).await.unwrap();

        store
            .write_object(
                &project.id,
                Transform {
                    position: Vec3::new(5.0, 5.0, 5.0),
                    rotation: Vec3::ZERO,
                    scale: Vec3::new(2.0, 2.0, 2.0),
                },
            )
            .await
            .unwrap();
        store
            .write_color(&project.id, "#00ff00".to_string())
            .await
            .unwrap();
        store
            .append_annotation(
                &project.id,
                Annotation {
                    id: "a1".to_string(),
                    position: Vec3::ZERO,
                    text: "old geometry".to_string(),
                },
            )
            .await
            .unwrap();

        store
            .apply_model_swap(&project.id, "/uploads/m1.glb".to_string())
            .await
            .unwrap();

        let scene = store.load(&project.id).await.unwrap();
        assert_eq!(scene.model_url, Some("/uploads/m1.glb".to_string()));
        assert_eq!(scene.object, Transform::default());
        assert_eq!(scene.color, Some(DEFAULT_COLOR.to_string()));
        assert!(scene.annotations.is_empty());
    }

    #[tokio::test]
    async fn test_model_swap_keeps_chat() {
        let store = MemoryStore::new();
        let project = store.create_project("Demo".to_string()).await.unwrap();

        store
            .append_chat(
                &project.id,
                ChatMessage {
                    author: "bo".to_string(),
                    text: "swapping model".to_string(),
                    sent_at: None,
                },
            )
            .await
            .unwrap();
        store
            .apply_model_swap(&project.id, "/uploads/m2.glb".to_string())
            .await
            .unwrap();

        assert_eq!(store.load(&project.id).await.unwrap().chat.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_project() {
        let store = MemoryStore::new();
        let project = store.create_project("Demo".to_string()).await.unwrap();

        store.delete_project(&project.id).await.unwrap();
        assert!(matches!(
            store.load(&project.id).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.delete_project(&project.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_projects_sorted_by_creation() {
        let store = MemoryStore::new();
        let a = store.create_project("A".to_string()).await.unwrap();
        let b = store.create_project("B".to_string()).await.unwrap();

        let list = store.list_projects().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, a.id);
        assert_eq!(list[1].id, b.id);
    }
}
