pub mod notifications;
pub mod profiles;
pub mod ratings;
pub mod reporting;
pub mod reports;
pub mod requests;
pub mod videos;
