use std::path::PathBuf;
use std::sync::Arc;

use crate::core::config::{LifecycleConfig, NotificationConfig, StoreBackendKind};
use crate::core::{AppConfig, AppError, Clock, SystemClock};
use crate::jobs::stale_requests::start_stale_request_monitor;
use crate::services::{
    AvailabilityTracker, LifecycleEngine, NotificationRelay, ProfileProvider, ProfileService,
    ReportingService, ResourceLibrary,
};
use crate::store::{FileBackend, KvStore, MemoryBackend, RedisBackend, Store, StoreBackend};

/// Every service wired onto one shared namespace.
#[derive(Clone)]
pub struct CampusSupport {
    pub store: Store,
    pub profiles: ProfileService,
    pub lifecycle: LifecycleEngine,
    pub notifications: NotificationRelay,
    pub reporting: ReportingService,
    pub availability: AvailabilityTracker,
    pub resources: ResourceLibrary,
    stale_check_interval: std::time::Duration,
}

impl CampusSupport {
    pub fn build(configuration: &AppConfig) -> Result<Self, AppError> {
        let backend: Arc<dyn StoreBackend> = match configuration.store.backend {
            StoreBackendKind::Memory => Arc::new(MemoryBackend::default()),
            StoreBackendKind::File => Arc::new(FileBackend::new(PathBuf::from(
                &configuration.store.data_directory,
            ))),
            StoreBackendKind::Redis => Arc::new(RedisBackend::new(
                configuration.redis.connect()?,
                configuration.application.name.clone(),
            )),
        };

        let store = Arc::new(KvStore::new(backend)).namespace(configuration.store.namespace.clone());
        let mut support = Self::with_store(
            store,
            Arc::new(SystemClock),
            configuration.lifecycle.clone(),
            &configuration.notifications,
        );
        support.stale_check_interval =
            std::time::Duration::from_secs(configuration.jobs.stale_check_interval_secs);
        Ok(support)
    }

    /// Wire the services over an existing namespace with an explicit clock.
    pub fn with_store(
        store: Store,
        clock: Arc<dyn Clock>,
        lifecycle: LifecycleConfig,
        notifications: &NotificationConfig,
    ) -> Self {
        let relay = NotificationRelay::new(
            store.clone(),
            clock.clone(),
            lifecycle.id_strategy,
            notifications,
        );
        let profiles = ProfileService::new(store.clone(), clock.clone(), lifecycle.clone());
        let provider: Arc<dyn ProfileProvider> = Arc::new(profiles.clone());

        Self {
            lifecycle: LifecycleEngine::new(
                store.clone(),
                provider.clone(),
                relay.clone(),
                clock.clone(),
                lifecycle.clone(),
            ),
            reporting: ReportingService::new(store.clone(), clock.clone(), lifecycle.clone()),
            availability: AvailabilityTracker::new(store.clone()),
            resources: ResourceLibrary::new(store.clone(), provider, clock, lifecycle.id_strategy),
            notifications: relay,
            profiles,
            store,
            stale_check_interval: std::time::Duration::from_secs(3600),
        }
    }

    pub fn in_memory(clock: Arc<dyn Clock>, lifecycle: LifecycleConfig) -> Self {
        Self::with_store(
            Store::in_memory("uni-help"),
            clock,
            lifecycle,
            &NotificationConfig::default(),
        )
    }

    pub fn start_jobs(&self) -> tokio::task::JoinHandle<()> {
        start_stale_request_monitor(self.reporting.clone(), self.stale_check_interval)
    }
}
