//! gtier-rank library interface
//!
//! Interactive preference ranking: a resumable merge sort driven by binary
//! "which do you prefer?" answers, persisted per owner between calls, with
//! tier assignment once the order is complete.

pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use crate::config::RankingSettings;
pub use crate::error::{RankError, RankResult};
pub use crate::models::{Item, ItemId, OwnerId, RankingSession, SessionOptions, SessionView};
pub use crate::services::{CatalogFilter, CatalogSource, RankingService, SqliteCatalog};
pub use crate::store::{MemorySessionStore, SessionStore, SqliteSessionStore};

use gtier_common::events::EventBus;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Event bus capacity for a service instance
pub const EVENT_BUS_CAPACITY: usize = 100;

/// Wire a service over an initialized database
///
/// Catalog and sessions both live in `db`; settings are read once here and the
/// lock-retry budget is handed to the session store.
pub async fn build_sqlite_service(
    db: SqlitePool,
    event_bus: EventBus,
) -> gtier_common::Result<RankingService> {
    let settings = RankingSettings::load(&db).await?;
    Ok(RankingService::new(
        Arc::new(SqliteCatalog::new(db.clone())),
        Arc::new(SqliteSessionStore::new(db).with_max_lock_wait_ms(settings.max_lock_wait_ms)),
        settings,
        event_bus,
    ))
}
