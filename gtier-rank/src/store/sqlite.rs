//! SQLite session store
//!
//! One row per owner in `ranking_sessions`. The full session is serialized
//! into `state`; `session_id`, `phase` and `revision` are copied out of it so
//! writes can compare against them. Every write is a single statement, so a
//! failed write leaves the previous row as it was.
//!
//! The lock-retry budget is fixed at construction; writes never re-read the
//! settings table.

use async_trait::async_trait;
use gtier_common::{time, Error, Result};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::SessionStore;
use crate::models::{OwnerId, RankingSession};
use crate::utils::retry_on_lock;

#[derive(Debug, Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
    max_lock_wait_ms: u64,
}

/// Retry budget used when none is configured
pub const DEFAULT_MAX_LOCK_WAIT_MS: u64 = 5000;

/// Column values for one session row, prepared before touching the database
struct SessionRow {
    owner: String,
    session_id: String,
    phase: &'static str,
    revision: i64,
    state: String,
    started_at: String,
    updated_at: String,
}

impl SessionRow {
    fn from_session(session: &RankingSession) -> Result<Self> {
        let state = serde_json::to_string(session)
            .map_err(|e| Error::Internal(format!("Failed to serialize session: {}", e)))?;
        Ok(Self {
            owner: session.owner.as_str().to_string(),
            session_id: session.session_id.to_string(),
            phase: session.phase.as_str(),
            revision: session.revision as i64,
            state,
            started_at: time::to_storage(&session.started_at),
            updated_at: time::to_storage(&session.updated_at),
        })
    }
}

impl SqliteSessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            max_lock_wait_ms: DEFAULT_MAX_LOCK_WAIT_MS,
        }
    }

    pub fn with_max_lock_wait_ms(mut self, max_lock_wait_ms: u64) -> Self {
        self.max_lock_wait_ms = max_lock_wait_ms;
        self
    }

    pub fn max_lock_wait_ms(&self) -> u64 {
        self.max_lock_wait_ms
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn upsert(&self, operation: &str, session: &RankingSession) -> Result<()> {
        let row = SessionRow::from_session(session)?;

        retry_on_lock(operation, self.max_lock_wait_ms, || async {
            sqlx::query(
                r#"
                INSERT INTO ranking_sessions (
                    owner, session_id, phase, revision, state, started_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(owner) DO UPDATE SET
                    session_id = excluded.session_id,
                    phase = excluded.phase,
                    revision = excluded.revision,
                    state = excluded.state,
                    started_at = excluded.started_at,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&row.owner)
            .bind(&row.session_id)
            .bind(row.phase)
            .bind(row.revision)
            .bind(&row.state)
            .bind(&row.started_at)
            .bind(&row.updated_at)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

            Ok(())
        })
        .await
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn create(&self, session: &RankingSession) -> Result<()> {
        self.upsert("create_session", session).await?;
        debug!(owner = %session.owner, session_id = %session.session_id, "Session row written");
        Ok(())
    }

    async fn get(&self, owner: &OwnerId) -> Result<Option<RankingSession>> {
        let row = sqlx::query("SELECT state FROM ranking_sessions WHERE owner = ?")
            .bind(owner.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let state: String = row.get("state");
                let session: RankingSession = serde_json::from_str(&state).map_err(|e| {
                    Error::Internal(format!("Failed to deserialize session for {}: {}", owner, e))
                })?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, session: &RankingSession) -> Result<()> {
        self.upsert("save_session", session).await
    }

    async fn compare_and_save(
        &self,
        session: &RankingSession,
        expected_revision: u64,
    ) -> Result<()> {
        let row = SessionRow::from_session(session)?;
        let expected = expected_revision as i64;

        let rows_affected = retry_on_lock("compare_and_save_session", self.max_lock_wait_ms, || async {
            let result = sqlx::query(
                r#"
                UPDATE ranking_sessions
                SET phase = ?, revision = ?, state = ?, updated_at = ?
                WHERE owner = ? AND session_id = ? AND revision = ?
                "#,
            )
            .bind(row.phase)
            .bind(row.revision)
            .bind(&row.state)
            .bind(&row.updated_at)
            .bind(&row.owner)
            .bind(&row.session_id)
            .bind(expected)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

            Ok(result.rows_affected())
        })
        .await?;

        if rows_affected == 0 {
            return Err(Error::Conflict(format!(
                "Session {} for {} is no longer at revision {}",
                session.session_id, session.owner, expected_revision
            )));
        }
        Ok(())
    }

    async fn delete(&self, owner: &OwnerId) -> Result<bool> {
        let rows_affected = retry_on_lock("delete_session", self.max_lock_wait_ms, || async {
            let result = sqlx::query("DELETE FROM ranking_sessions WHERE owner = ?")
                .bind(owner.as_str())
                .execute(&self.pool)
                .await
                .map_err(Error::Database)?;
            Ok(result.rows_affected())
        })
        .await?;

        Ok(rows_affected > 0)
    }
}
