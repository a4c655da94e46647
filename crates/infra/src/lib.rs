//! Infrastructure layer: configuration, persistence and application services.

pub mod config;
pub mod services;
pub mod store;

pub use config::{AppConfig, ConfigError, StoreBackend};
pub use services::{ServiceError, ServiceResult, Services};
pub use store::{InMemoryCartStore, InMemoryStore, PostgresStore, StoreError, StoreResult};
