//! In-memory session store
//!
//! For tests and for embedding the engine in a long-running process.

use async_trait::async_trait;
use gtier_common::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::SessionStore;
use crate::models::{OwnerId, RankingSession};

#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<OwnerId, RankingSession>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, session: &RankingSession) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.owner.clone(), session.clone());
        Ok(())
    }

    async fn get(&self, owner: &OwnerId) -> Result<Option<RankingSession>> {
        Ok(self.sessions.read().await.get(owner).cloned())
    }

    async fn save(&self, session: &RankingSession) -> Result<()> {
        self.create(session).await
    }

    async fn compare_and_save(
        &self,
        session: &RankingSession,
        expected_revision: u64,
    ) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(&session.owner) {
            Some(stored)
                if stored.session_id == session.session_id
                    && stored.revision == expected_revision =>
            {
                sessions.insert(session.owner.clone(), session.clone());
                Ok(())
            }
            Some(stored) => Err(Error::Conflict(format!(
                "Session for {} is at revision {} of {}, expected revision {} of {}",
                session.owner,
                stored.revision,
                stored.session_id,
                expected_revision,
                session.session_id
            ))),
            None => Err(Error::Conflict(format!(
                "Session for {} no longer exists",
                session.owner
            ))),
        }
    }

    async fn delete(&self, owner: &OwnerId) -> Result<bool> {
        Ok(self.sessions.write().await.remove(owner).is_some())
    }
}
