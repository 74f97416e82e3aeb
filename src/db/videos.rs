use chrono::{DateTime, Utc};

use super::Entity;
use crate::core::{AppError, IdStrategy};
use crate::models::videos::LessonVideo;
use crate::store::Store;

impl Entity for LessonVideo {
    const COLLECTION: &'static str = "videos";

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }

    fn id_prefix(&self) -> &'static str {
        "video-"
    }
}

pub async fn create_video(
    store: &Store,
    video: LessonVideo,
    strategy: IdStrategy,
    now: DateTime<Utc>,
) -> Result<LessonVideo, AppError> {
    super::insert(store, video, strategy, now).await
}

pub async fn get_videos_for_owner(store: &Store, owner_id: &str) -> Result<Vec<LessonVideo>, AppError> {
    super::list_where(store, |v: &LessonVideo| v.owner_id == owner_id).await
}

pub async fn get_video_by_id(store: &Store, video_id: &str) -> Result<Option<LessonVideo>, AppError> {
    super::find_by_id(store, video_id).await
}

pub async fn delete_video(store: &Store, video_id: &str) -> Result<LessonVideo, AppError> {
    super::remove(store, video_id).await
}
