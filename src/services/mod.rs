pub mod availability;
pub mod lifecycle;
pub mod notifications;
pub mod profiles;
pub mod reporting;
pub mod resources;

pub use availability::AvailabilityTracker;
pub use lifecycle::{LifecycleEngine, ProfileProvider};
pub use notifications::NotificationRelay;
pub use profiles::ProfileService;
pub use reporting::ReportingService;
pub use resources::ResourceLibrary;
