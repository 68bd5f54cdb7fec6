//! Ranking services
//!
//! - [`catalog`]: the catalog collaborator seam and its implementations
//! - [`loader`]: item set loading and validation
//! - [`ranking_service`]: the start/status/answer/delete boundary

pub mod catalog;
pub mod loader;
pub mod ranking_service;

pub use catalog::{item_from_record, CatalogFilter, CatalogSource, SqliteCatalog, StaticCatalog};
pub use loader::{ItemSetLoader, MIN_ITEMS};
pub use ranking_service::RankingService;
