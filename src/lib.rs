pub mod auth;
pub mod bridge;
pub mod config;
pub mod error;
pub mod health;
pub mod store;

pub use error::CharadesError;
pub use health::{HealthMonitor, HealthOptions, HealthVerdict};
pub use store::StoreHandle;
