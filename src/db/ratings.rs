use chrono::{DateTime, Utc};

use super::Entity;
use crate::core::{AppError, IdStrategy};
use crate::models::ratings::Rating;
use crate::store::Store;

impl Entity for Rating {
    const COLLECTION: &'static str = "ratings";

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }

    fn id_prefix(&self) -> &'static str {
        "rating-"
    }
}

pub async fn create_rating(
    store: &Store,
    rating: Rating,
    strategy: IdStrategy,
    now: DateTime<Utc>,
) -> Result<Rating, AppError> {
    super::insert(store, rating, strategy, now).await
}

pub async fn get_ratings(store: &Store) -> Result<Vec<Rating>, AppError> {
    super::list(store).await
}
