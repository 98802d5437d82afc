pub mod config;
pub mod error;
pub mod models;
pub mod openapi;
pub mod query;
pub mod repo;
pub mod routes;

// Re-export commonly used items for tests / external users
pub use routes::{config as route_config, AppState};
