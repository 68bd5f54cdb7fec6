//! Catalog collaborator
//!
//! The catalog of games belongs to the surrounding application. The engine
//! only needs one question answered: which items has this owner played?

use async_trait::async_trait;
use gtier_common::db::GameRecord;
use gtier_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::engine::UNCATEGORISED;
use crate::models::{Item, ItemId, OwnerId};

/// Catalog list filters (substring match, case-insensitive)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFilter {
    pub genre: Option<String>,
    pub platform: Option<String>,
}

impl CatalogFilter {
    pub fn is_empty(&self) -> bool {
        self.genre.is_none() && self.platform.is_none()
    }
}

/// Source of rankable items
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Items the owner has played, in a stable order
    async fn load_played_items(&self, owner: &OwnerId, filter: &CatalogFilter)
        -> Result<Vec<Item>>;
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}

/// Build an item from a catalog row
pub fn item_from_record(record: &GameRecord) -> Result<Item> {
    let payload = serde_json::to_value(record)
        .map_err(|e| Error::Internal(format!("Failed to serialize game {}: {}", record.id, e)))?;
    Ok(Item::new(
        ItemId(record.id),
        record.primary_genre().unwrap_or(UNCATEGORISED),
        payload,
    ))
}

/// Catalog held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    played: HashMap<OwnerId, Vec<GameRecord>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add played games for an owner (builder style)
    pub fn with_played(mut self, owner: OwnerId, games: Vec<GameRecord>) -> Self {
        self.played.entry(owner).or_default().extend(games);
        self
    }
}

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn load_played_items(
        &self,
        owner: &OwnerId,
        filter: &CatalogFilter,
    ) -> Result<Vec<Item>> {
        let Some(games) = self.played.get(owner) else {
            return Ok(Vec::new());
        };

        games
            .iter()
            .filter(|g| filter.genre.as_deref().map_or(true, |f| contains_ci(&g.genre, f)))
            .filter(|g| {
                filter
                    .platform
                    .as_deref()
                    .map_or(true, |f| contains_ci(&g.platform, f))
            })
            .map(item_from_record)
            .collect()
    }
}

/// Catalog backed by the `games` and `played_games` tables
#[derive(Debug, Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert catalog rows and mark them played for the owner
    ///
    /// Returns the number of games imported.
    pub async fn import_games(&self, owner: &OwnerId, games: &[GameRecord]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        for game in games {
            sqlx::query(
                r#"
                INSERT INTO games (id, name, genre, platform, release_date, rating, image)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    genre = excluded.genre,
                    platform = excluded.platform,
                    release_date = excluded.release_date,
                    rating = excluded.rating,
                    image = excluded.image
                "#,
            )
            .bind(game.id)
            .bind(&game.name)
            .bind(&game.genre)
            .bind(&game.platform)
            .bind(&game.release_date)
            .bind(game.rating)
            .bind(&game.image)
            .execute(&mut *tx)
            .await?;

            sqlx::query("INSERT OR IGNORE INTO played_games (owner, game_id) VALUES (?, ?)")
                .bind(owner.as_str())
                .bind(game.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        info!(owner = %owner, count = games.len(), "Imported played games");
        Ok(games.len())
    }
}

#[async_trait]
impl CatalogSource for SqliteCatalog {
    async fn load_played_items(
        &self,
        owner: &OwnerId,
        filter: &CatalogFilter,
    ) -> Result<Vec<Item>> {
        let genre = filter.genre.as_deref().map(|g| format!("%{}%", g.trim()));
        let platform = filter.platform.as_deref().map(|p| format!("%{}%", p.trim()));

        // LIKE is case-insensitive for ASCII in SQLite
        let records: Vec<GameRecord> = sqlx::query_as(
            r#"
            SELECT g.id, g.name, g.genre, g.platform, g.release_date, g.rating, g.image
            FROM games g
            JOIN played_games p ON p.game_id = g.id
            WHERE p.owner = ?
              AND (? IS NULL OR g.genre LIKE ?)
              AND (? IS NULL OR g.platform LIKE ?)
            ORDER BY g.id
            "#,
        )
        .bind(owner.as_str())
        .bind(&genre)
        .bind(&genre)
        .bind(&platform)
        .bind(&platform)
        .fetch_all(&self.pool)
        .await?;

        debug!(owner = %owner, count = records.len(), "Loaded played games");
        records.iter().map(item_from_record).collect()
    }
}
