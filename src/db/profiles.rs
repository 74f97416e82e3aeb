use chrono::{DateTime, Utc};

use super::Entity;
use crate::core::{AppError, IdStrategy};
use crate::models::profiles::{Profile, ProfilePatch, Role};
use crate::store::Store;

impl Entity for Profile {
    const COLLECTION: &'static str = "profiles";

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }

    fn id_prefix(&self) -> &'static str {
        self.role.id_prefix()
    }
}

pub async fn create_profile(
    store: &Store,
    profile: Profile,
    strategy: IdStrategy,
    now: DateTime<Utc>,
) -> Result<Profile, AppError> {
    super::insert(store, profile, strategy, now).await
}

pub async fn get_profiles(store: &Store) -> Result<Vec<Profile>, AppError> {
    super::list(store).await
}

pub async fn get_profile_by_id(store: &Store, profile_id: &str) -> Result<Option<Profile>, AppError> {
    super::find_by_id(store, profile_id).await
}

pub async fn get_profiles_by_role(store: &Store, role: Role) -> Result<Vec<Profile>, AppError> {
    super::list_where(store, |p: &Profile| p.role == role).await
}

pub async fn get_providers(store: &Store) -> Result<Vec<Profile>, AppError> {
    super::list_where(store, |p: &Profile| p.role.is_provider()).await
}

/// Email (case-insensitive) or student/staff number. Not unique.
pub async fn find_profiles_by_contact(store: &Store, contact: &str) -> Result<Vec<Profile>, AppError> {
    let contact = contact.trim();
    super::list_where(store, |p: &Profile| {
        p.email
            .as_deref()
            .map(|email| email.eq_ignore_ascii_case(contact))
            .unwrap_or(false)
            || p.number.as_deref() == Some(contact)
    })
    .await
}

pub async fn update_profile(store: &Store, profile_id: &str, patch: &ProfilePatch) -> Result<Profile, AppError> {
    super::update(store, profile_id, patch).await
}

pub async fn toggle_suspended(store: &Store, profile_id: &str) -> Result<Profile, AppError> {
    super::patch_with(store, profile_id, |p: &Profile| {
        Ok(ProfilePatch {
            suspended: Some(!p.suspended),
            ..Default::default()
        })
    })
    .await
}

pub async fn delete_profile(store: &Store, profile_id: &str) -> Result<Profile, AppError> {
    super::remove(store, profile_id).await
}
