pub mod config;
mod errors;
mod telemetry;
pub mod utils;

pub use self::config::AppConfig;
pub use errors::*;
pub use telemetry::*;
pub use utils::*;
