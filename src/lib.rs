pub mod campus_support_service;
pub mod core;
pub mod db;
pub mod jobs;
pub mod models;
pub mod services;
pub mod store;
