use std::sync::Arc;

use validator::Validate;

use super::lifecycle::ProfileProvider;
use crate::core::{AppError, Clock, IdStrategy};
use crate::db::videos;
use crate::models::videos::{AddVideoPayload, LessonVideo};
use crate::store::Store;

/// Lesson videos a provider shares with students.
#[derive(Clone)]
pub struct ResourceLibrary {
    store: Store,
    profiles: Arc<dyn ProfileProvider>,
    clock: Arc<dyn Clock>,
    id_strategy: IdStrategy,
}

impl ResourceLibrary {
    pub fn new(
        store: Store,
        profiles: Arc<dyn ProfileProvider>,
        clock: Arc<dyn Clock>,
        id_strategy: IdStrategy,
    ) -> Self {
        Self {
            store,
            profiles,
            clock,
            id_strategy,
        }
    }

    #[tracing::instrument(name = "Add Lesson Video", skip(self, payload))]
    pub async fn add_video(&self, owner_id: &str, payload: AddVideoPayload) -> Result<LessonVideo, AppError> {
        payload.validate()?;
        let owner = self
            .profiles
            .resolve_profile(owner_id)
            .await?
            .filter(|p| p.role.is_provider())
            .ok_or_else(|| {
                AppError::validation_error(format!("{} is not a tutor or counsellor", owner_id))
            })?;

        let now = self.clock.now();
        let video = LessonVideo {
            id: String::new(),
            owner_id: owner.id,
            title: payload.title.trim().to_string(),
            module: payload.module,
            url: payload.url,
            notes: payload.notes,
            created_at: now,
        };
        videos::create_video(&self.store, video, self.id_strategy, now).await
    }

    pub async fn list_videos(&self, owner_id: &str) -> Result<Vec<LessonVideo>, AppError> {
        videos::get_videos_for_owner(&self.store, owner_id).await
    }

    #[tracing::instrument(name = "Delete Lesson Video", skip(self))]
    pub async fn delete_video(&self, owner_id: &str, video_id: &str) -> Result<LessonVideo, AppError> {
        let video = videos::get_video_by_id(&self.store, video_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Video {} not found", video_id)))?;
        if video.owner_id != owner_id {
            return Err(AppError::forbidden_error("Only the owner can delete this video"));
        }
        videos::delete_video(&self.store, video_id).await
    }
}
