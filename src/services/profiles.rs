use std::sync::Arc;

use async_trait::async_trait;
use validator::Validate;

use super::lifecycle::ProfileProvider;
use crate::core::config::LifecycleConfig;
use crate::core::{AppError, Clock};
use crate::db::{profiles, requests};
use crate::models::profiles::{
    Profile, ProfilePatch, RegisterProfilePayload, Role, UpdateProfilePayload,
};
use crate::store::Store;

#[derive(Clone)]
pub struct ProfileService {
    store: Store,
    clock: Arc<dyn Clock>,
    settings: LifecycleConfig,
}

impl ProfileService {
    pub fn new(store: Store, clock: Arc<dyn Clock>, settings: LifecycleConfig) -> Self {
        Self {
            store,
            clock,
            settings,
        }
    }

    fn ensure_admin(&self, actor_id: &str) -> Result<(), AppError> {
        if self.settings.is_admin(actor_id) {
            Ok(())
        } else {
            Err(AppError::forbidden_error(
                "This action is restricted to administrators",
            ))
        }
    }

    #[tracing::instrument(
        name = "Register Profile",
        skip(self, payload),
        fields(role = %payload.role)
    )]
    pub async fn register(&self, payload: RegisterProfilePayload) -> Result<Profile, AppError> {
        payload.validate()?;
        if payload.role == Role::Student && payload.service_type.is_some() {
            return Err(AppError::validation_error(
                "Students do not offer a service type",
            ));
        }

        let now = self.clock.now();
        let profile = Profile {
            id: String::new(),
            role: payload.role,
            name: payload.name.trim().to_string(),
            email: payload.email,
            number: payload.number,
            phone: payload.phone,
            university: payload.university,
            modules: payload.modules,
            service_type: payload.service_type,
            bio: payload.bio,
            available_now: false,
            schedule: payload.schedule,
            suspended: false,
            created_at: Some(now),
        };

        let profile =
            profiles::create_profile(&self.store, profile, self.settings.id_strategy, now).await?;
        tracing::info!(profile_id = %profile.id, "profile registered");
        Ok(profile)
    }

    #[tracing::instrument(name = "Update Profile", skip(self, payload))]
    pub async fn update_profile(
        &self,
        profile_id: &str,
        payload: UpdateProfilePayload,
    ) -> Result<Profile, AppError> {
        payload.validate()?;
        let patch = ProfilePatch {
            name: payload.name.as_ref().map(|n| n.trim().to_string()),
            ..ProfilePatch::from(payload)
        };
        profiles::update_profile(&self.store, profile_id, &patch).await
    }

    pub async fn find_by_id(&self, profile_id: &str) -> Result<Profile, AppError> {
        profiles::get_profile_by_id(&self.store, profile_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Profile {} not found", profile_id)))
    }

    pub async fn find_by_contact(&self, contact: &str) -> Result<Vec<Profile>, AppError> {
        profiles::find_profiles_by_contact(&self.store, contact).await
    }

    pub async fn list_by_role(&self, role: Role) -> Result<Vec<Profile>, AppError> {
        profiles::get_profiles_by_role(&self.store, role).await
    }

    #[tracing::instrument(name = "Toggle Suspension", skip(self))]
    pub async fn toggle_suspended(&self, admin_id: &str, profile_id: &str) -> Result<Profile, AppError> {
        self.ensure_admin(admin_id)?;
        let profile = profiles::toggle_suspended(&self.store, profile_id).await?;
        tracing::info!(suspended = profile.suspended, "suspension toggled");
        Ok(profile)
    }

    #[tracing::instrument(name = "Set Suspension", skip(self))]
    pub async fn set_suspended(
        &self,
        admin_id: &str,
        profile_id: &str,
        suspended: bool,
    ) -> Result<Profile, AppError> {
        self.ensure_admin(admin_id)?;
        let patch = ProfilePatch {
            suspended: Some(suspended),
            ..Default::default()
        };
        profiles::update_profile(&self.store, profile_id, &patch).await
    }

    /// Remove the profile. Requests it took part in are kept and show
    /// "Deleted Account" in place of its name. Returns how many requests
    /// were tombstoned.
    #[tracing::instrument(name = "Delete Profile", skip(self))]
    pub async fn delete_profile(&self, admin_id: &str, profile_id: &str) -> Result<usize, AppError> {
        self.ensure_admin(admin_id)?;
        profiles::delete_profile(&self.store, profile_id).await?;
        let tombstoned = requests::tombstone_participant(&self.store, profile_id).await?;
        tracing::info!(tombstoned, "profile deleted");
        Ok(tombstoned)
    }
}

#[async_trait]
impl ProfileProvider for ProfileService {
    async fn resolve_profile(&self, profile_id: &str) -> Result<Option<Profile>, AppError> {
        profiles::get_profile_by_id(&self.store, profile_id).await
    }
}
