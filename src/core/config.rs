use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

use super::utils::IdStrategy;
use super::AppError;

#[derive(Deserialize, Clone)]
pub struct AppConfig {
    pub application: ApplicationConfig,
    pub store: StoreConfig,
    pub redis: RedisConfig,
    pub lifecycle: LifecycleConfig,
    pub notifications: NotificationConfig,
    pub telemetry: TelemetryConfig,
    pub jobs: JobsConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self, config::ConfigError> {
        let base_path = std::env::current_dir().map_err(|e| {
            config::ConfigError::Message(format!("Failed to find the current dir: {}", e))
        })?;
        let config_dir = base_path.join("src/core/configurations");

        let app_environment: Environment = std::env::var("CAMPUS_SUPPORT_APP_ENVIRONMENT")
            .unwrap_or_else(|_| "local".into())
            .try_into()
            .map_err(config::ConfigError::Message)?;

        let configurations = config::Config::builder()
            .add_source(config::File::from(config_dir.join("base")).required(true))
            .add_source(
                config::File::from(config_dir.join(app_environment.as_str())).required(true),
            )
            .add_source(
                config::Environment::with_prefix("CAMPUS_SUPPORT")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let settings: Self = configurations.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that deserialize fine but cannot be run.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        self.notifications.validate()?;
        self.jobs.validate()
    }
}

#[derive(Deserialize, Clone)]
pub struct ApplicationConfig {
    pub name: String,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackendKind {
    Memory,
    File,
    Redis,
}

#[derive(Deserialize, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackendKind,
    pub namespace: String,
    pub data_directory: String,
}

#[derive(Deserialize, Clone)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<Secret<String>>,
}

impl RedisConfig {
    pub fn connect(&self) -> Result<redis::Client, AppError> {
        let url = format!(
            "redis://:{password}@{host}:{port}",
            password = self
                .password
                .as_ref()
                .map(|p| p.expose_secret().as_str())
                .unwrap_or(""),
            host = self.host,
            port = self.port
        );
        redis::Client::open(url).map_err(AppError::storage_error)
    }
}

/// Policy knobs of the request lifecycle and its reporting.
#[derive(Deserialize, Clone, Debug)]
pub struct LifecycleConfig {
    /// Age after which a `Pending` request is reported as ignored.
    pub staleness_hours: i64,
    pub default_decline_reason: String,
    /// Identities allowed on admin-only paths (hard delete, suspend, ...).
    pub admin_ids: Vec<String>,
    pub id_strategy: IdStrategy,
}

impl LifecycleConfig {
    pub fn staleness(&self) -> chrono::Duration {
        chrono::Duration::hours(self.staleness_hours)
    }

    pub fn is_admin(&self, actor_id: &str) -> bool {
        self.admin_ids.iter().any(|id| id == actor_id)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            staleness_hours: 48,
            default_decline_reason: "No reason provided".to_string(),
            admin_ids: vec!["admin".to_string()],
            id_strategy: IdStrategy::TimeRandom,
        }
    }
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct NotificationConfig {
    /// Keep only the newest N notifications; unbounded when absent.
    pub retain_latest: Option<usize>,
}

impl NotificationConfig {
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.retain_latest == Some(0) {
            return Err(config::ConfigError::Message(
                "notifications.retain_latest must be at least 1; omit it to keep everything"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Deserialize, Clone)]
pub struct TelemetryConfig {
    pub level: String,
    pub log_directory: String,
}

#[derive(Deserialize, Clone)]
pub struct JobsConfig {
    pub stale_check_interval_secs: u64,
}

impl JobsConfig {
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.stale_check_interval_secs == 0 {
            return Err(config::ConfigError::Message(
                "jobs.stale_check_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub enum Environment {
    Local,
    Sandbox,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Sandbox => "sandbox",
            Self::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "sandbox" => Ok(Self::Sandbox),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not supported environment. Use either `local`, `sandbox` or `production` ",
                other
            )),
        }
    }
}
