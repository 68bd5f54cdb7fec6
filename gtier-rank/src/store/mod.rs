//! Session persistence
//!
//! One session per owner. `create` overwrites, `save` is last-write-wins,
//! `compare_and_save` only writes over the revision the caller read.

use async_trait::async_trait;
use gtier_common::Result;

use crate::models::{OwnerId, RankingSession};

pub mod memory;
pub mod sqlite;

pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a new session, replacing any prior one for the owner
    async fn create(&self, session: &RankingSession) -> Result<()>;

    /// Fetch the owner's session
    async fn get(&self, owner: &OwnerId) -> Result<Option<RankingSession>>;

    /// Replace the owner's session unconditionally
    async fn save(&self, session: &RankingSession) -> Result<()>;

    /// Replace the owner's session only if the stored one has the same
    /// session id and `expected_revision`
    ///
    /// Fails with [`gtier_common::Error::Conflict`] otherwise.
    async fn compare_and_save(&self, session: &RankingSession, expected_revision: u64)
        -> Result<()>;

    /// Remove the owner's session; true if one existed
    async fn delete(&self, owner: &OwnerId) -> Result<bool>;
}
