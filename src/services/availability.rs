use std::cmp::Ordering;

use crate::core::AppError;
use crate::db::{profiles, ratings, requests};
use crate::models::profiles::{Profile, ProfilePatch, Schedule};
use crate::models::reporting::{ProviderListing, ProviderQuery};
use crate::services::reporting::{average_rating, collect_ratings};
use crate::store::Store;

/// Provider availability flags and the provider search built on them.
#[derive(Clone)]
pub struct AvailabilityTracker {
    store: Store,
}

impl AvailabilityTracker {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    async fn provider(&self, provider_id: &str) -> Result<Profile, AppError> {
        let profile = profiles::get_profile_by_id(&self.store, provider_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Provider {} not found", provider_id)))?;
        if !profile.role.is_provider() {
            return Err(AppError::validation_error(format!(
                "{} is not a tutor or counsellor",
                provider_id
            )));
        }
        Ok(profile)
    }

    #[tracing::instrument(name = "Set Availability", skip(self))]
    pub async fn set_availability(&self, provider_id: &str, available: bool) -> Result<Profile, AppError> {
        self.provider(provider_id).await?;
        let patch = ProfilePatch {
            available_now: Some(available),
            ..Default::default()
        };
        profiles::update_profile(&self.store, provider_id, &patch).await
    }

    #[tracing::instrument(name = "Set Schedule", skip(self, schedule))]
    pub async fn set_schedule(&self, provider_id: &str, schedule: Schedule) -> Result<Profile, AppError> {
        if let Schedule::Weekly(blocks) = &schedule {
            if let Some(block) = blocks.iter().find(|b| b.start >= b.end) {
                return Err(AppError::validation_error(format!(
                    "Block on {:?} ends before it starts",
                    block.day
                )));
            }
        }
        self.provider(provider_id).await?;
        let patch = ProfilePatch {
            schedule: Some(schedule),
            ..Default::default()
        };
        profiles::update_profile(&self.store, provider_id, &patch).await
    }

    /// Matching, non-suspended providers: available now first, then by
    /// average rating (unrated last). Ties keep registration order.
    #[tracing::instrument(name = "Search Providers", skip(self))]
    pub async fn search_providers(&self, query: &ProviderQuery) -> Result<Vec<ProviderListing>, AppError> {
        let providers = profiles::get_providers(&self.store).await?;
        let all_requests = requests::get_requests(&self.store).await?;
        let standalone = ratings::get_ratings(&self.store).await?;
        let ratings = collect_ratings(&all_requests, &standalone);

        let name = query.name.as_ref().map(|n| n.trim().to_lowercase());
        let mut listings: Vec<ProviderListing> = providers
            .into_iter()
            .filter(|p| !p.suspended)
            .filter(|p| !query.available_only || p.available_now)
            .filter(|p| {
                name.as_ref()
                    .map_or(true, |n| p.name.to_lowercase().contains(n.as_str()))
            })
            .filter(|p| query.module.as_ref().map_or(true, |m| p.teaches_module(m)))
            .filter(|p| query.category.map_or(true, |c| p.service_type == Some(c)))
            .map(|profile| {
                let rating_count = ratings
                    .iter()
                    .filter(|r| r.provider_id == profile.id)
                    .count();
                ProviderListing {
                    average_rating: average_rating(&ratings, &profile.id),
                    rating_count,
                    profile,
                }
            })
            .collect();

        listings.sort_by(rank);
        Ok(listings)
    }

    /// Providers that can take an urgent request. Falls back to everyone
    /// matching when nobody is marked available.
    pub async fn need_help_now(&self, query: &ProviderQuery) -> Result<Vec<ProviderListing>, AppError> {
        let available = self
            .search_providers(&ProviderQuery {
                available_only: true,
                ..query.clone()
            })
            .await?;
        if !available.is_empty() {
            return Ok(available);
        }
        self.search_providers(&ProviderQuery {
            available_only: false,
            ..query.clone()
        })
        .await
    }
}

fn rank(a: &ProviderListing, b: &ProviderListing) -> Ordering {
    b.profile
        .available_now
        .cmp(&a.profile.available_now)
        .then_with(|| match (a.average_rating, b.average_rating) {
            (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}
