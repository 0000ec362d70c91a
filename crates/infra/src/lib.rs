//! Infrastructure layer: part storage, the creation and inventory engines,
//! and the service the HTTP boundary calls.

pub mod config;
pub mod creation;
pub mod error;
pub mod graph;
pub mod inventory_engine;
pub mod part_service;
pub mod part_store;


pub use config::{AppConfig, ConfigError};
pub use error::{PartServiceError, ServiceResult};
pub use part_service::PartService;
pub use part_store::{open_store, InMemoryPartStore, PartStore, PostgresPartStore, StoreError};
