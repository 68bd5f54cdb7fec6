//! Ranking service
//!
//! The boundary the outside world talks to: `start`, `status`, `answer`,
//! `delete`. Every call is a complete read-validate-write cycle against the
//! session store, so callers can be independent processes.
//!
//! Answers for one owner are serialized by a per-owner async mutex held only
//! for the duration of one transition. Across processes the store's revision
//! check does the same job. A lock entry lives only while some call for that
//! owner is in flight.

use gtier_common::events::{EventBus, RankingEvent, RankingPhase};
use gtier_common::{time, Error};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::catalog::{CatalogFilter, CatalogSource};
use super::loader::ItemSetLoader;
use crate::config::RankingSettings;
use crate::error::{RankError, RankResult};
use crate::models::{ItemId, OwnerId, RankingSession, SessionOptions, SessionView};
use crate::store::SessionStore;

pub struct RankingService {
    loader: ItemSetLoader,
    store: Arc<dyn SessionStore>,
    settings: RankingSettings,
    event_bus: EventBus,
    owner_locks: Arc<Mutex<HashMap<OwnerId, Arc<Mutex<()>>>>>,
}

impl RankingService {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        store: Arc<dyn SessionStore>,
        settings: RankingSettings,
        event_bus: EventBus,
    ) -> Self {
        Self {
            loader: ItemSetLoader::new(catalog),
            store,
            settings,
            event_bus,
            owner_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn settings(&self) -> &RankingSettings {
        &self.settings
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    async fn owner_lock(&self, owner: &OwnerId) -> Arc<Mutex<()>> {
        let mut locks = self.owner_locks.lock().await;
        locks
            .entry(owner.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the owner's entry unless another call still holds a handle to it
    ///
    /// Handles are only cloned under the map lock, so the count cannot rise
    /// while it is checked here.
    async fn release_owner_lock(&self, owner: &OwnerId, lock: Arc<Mutex<()>>) {
        let mut locks = self.owner_locks.lock().await;
        let tracked = locks
            .get(owner)
            .is_some_and(|current| Arc::ptr_eq(current, &lock));
        if tracked && Arc::strong_count(&lock) == 2 {
            locks.remove(owner);
        }
    }

    /// Start (or restart) a ranking over all played items
    pub async fn start(&self, owner: &OwnerId) -> RankResult<SessionView> {
        self.start_with(owner, &CatalogFilter::default(), self.settings.session_options())
            .await
    }

    /// Start over the played items matching `filter`
    pub async fn start_filtered(
        &self,
        owner: &OwnerId,
        filter: &CatalogFilter,
    ) -> RankResult<SessionView> {
        self.start_with(owner, filter, self.settings.session_options())
            .await
    }

    /// Start with explicit options
    ///
    /// Overwrites any prior session for the owner. When the item set is too
    /// small the prior session is left alone.
    pub async fn start_with(
        &self,
        owner: &OwnerId,
        filter: &CatalogFilter,
        options: SessionOptions,
    ) -> RankResult<SessionView> {
        let lock = self.owner_lock(owner).await;
        let result = {
            let _guard = lock.lock().await;
            self.start_locked(owner, filter, options).await
        };
        self.release_owner_lock(owner, lock).await;
        result
    }

    async fn start_locked(
        &self,
        owner: &OwnerId,
        filter: &CatalogFilter,
        options: SessionOptions,
    ) -> RankResult<SessionView> {
        let items = self.loader.load(owner, filter).await?;
        let session = RankingSession::start(owner.clone(), items, options);

        self.store.create(&session).await.map_err(|e| {
            error!(owner = %owner, error = %e, "Failed to persist new session");
            RankError::Store(e)
        })?;

        info!(
            owner = %owner,
            session_id = %session.session_id,
            items = session.items.len(),
            phase = ?session.phase,
            grouping = session.options.grouping,
            expected = session.comparisons_expected,
            "Ranking session started"
        );

        self.event_bus.emit_lossy(RankingEvent::SessionStarted {
            owner: owner.to_string(),
            session_id: session.session_id,
            item_count: session.items.len(),
            phase: session.phase,
            comparisons_expected: session.comparisons_expected,
            timestamp: time::now(),
        });
        if session.is_finished() {
            self.emit_finished(&session);
        }

        Ok(SessionView::build(&session))
    }

    /// Current view of the owner's session (read-only)
    pub async fn status(&self, owner: &OwnerId) -> RankResult<SessionView> {
        let session = self
            .store
            .get(owner)
            .await?
            .ok_or_else(|| RankError::NotFound(owner.clone()))?;

        debug!(owner = %owner, phase = ?session.phase, done = session.comparisons_done, "Status read");
        Ok(SessionView::build(&session))
    }

    /// Record that `winner` is preferred over `loser`
    pub async fn answer(
        &self,
        owner: &OwnerId,
        winner: ItemId,
        loser: ItemId,
    ) -> RankResult<SessionView> {
        let lock = self.owner_lock(owner).await;
        let result = {
            let _guard = lock.lock().await;
            self.answer_locked(owner, winner, loser).await
        };
        self.release_owner_lock(owner, lock).await;
        result
    }

    async fn answer_locked(
        &self,
        owner: &OwnerId,
        winner: ItemId,
        loser: ItemId,
    ) -> RankResult<SessionView> {
        let mut session = self
            .store
            .get(owner)
            .await?
            .ok_or_else(|| RankError::NoActivePair(owner.clone()))?;

        if session.is_finished() {
            return Err(RankError::NoActivePair(owner.clone()));
        }

        let expected_revision = session.revision;
        let transition = session.answer(winner, loser).map_err(|e| {
            warn!(owner = %owner, winner = %winner, loser = %loser, error = %e, "Answer rejected");
            RankError::from_merge(owner, e)
        })?;

        match self.store.compare_and_save(&session, expected_revision).await {
            Ok(()) => {}
            Err(Error::Conflict(msg)) => {
                warn!(owner = %owner, winner = %winner, loser = %loser, "Answer lost race: {}", msg);
                return Err(RankError::StalePair {
                    winner,
                    loser,
                    expected: None,
                });
            }
            Err(e) => {
                error!(owner = %owner, error = %e, "Failed to persist answer");
                return Err(RankError::Store(e));
            }
        }

        debug!(
            owner = %owner,
            session_id = %session.session_id,
            winner = %winner,
            loser = %loser,
            done = session.comparisons_done,
            "Comparison recorded"
        );

        self.event_bus.emit_lossy(RankingEvent::ComparisonRecorded {
            owner: owner.to_string(),
            session_id: session.session_id,
            winner: winner.0,
            loser: loser.0,
            comparisons_done: session.comparisons_done,
            comparisons_expected: session.comparisons_expected,
            timestamp: time::now(),
        });

        if let Some(transition) = transition {
            info!(
                owner = %owner,
                session_id = %session.session_id,
                from = ?transition.from,
                to = ?transition.to,
                "Ranking phase changed"
            );
            self.event_bus.emit_lossy(RankingEvent::PhaseChanged {
                owner: owner.to_string(),
                session_id: session.session_id,
                old_phase: transition.from,
                new_phase: transition.to,
                timestamp: time::now(),
            });
            if transition.to == RankingPhase::Finished {
                self.emit_finished(&session);
            }
        }

        Ok(SessionView::build(&session))
    }

    /// Remove the owner's session (owner deletion); true if one existed
    pub async fn delete(&self, owner: &OwnerId) -> RankResult<bool> {
        let lock = self.owner_lock(owner).await;
        let result = {
            let _guard = lock.lock().await;
            self.store.delete(owner).await
        };
        self.release_owner_lock(owner, lock).await;

        let existed = result?;
        if existed {
            info!(owner = %owner, "Ranking session deleted");
            self.event_bus.emit_lossy(RankingEvent::SessionDeleted {
                owner: owner.to_string(),
                timestamp: time::now(),
            });
        }
        Ok(existed)
    }

    fn emit_finished(&self, session: &RankingSession) {
        let ranked_count = session.final_order.as_ref().map_or(0, Vec::len);
        info!(
            owner = %session.owner,
            session_id = %session.session_id,
            ranked = ranked_count,
            eliminated = session.eliminated.len(),
            comparisons = session.comparisons_done,
            "Ranking finished"
        );
        self.event_bus.emit_lossy(RankingEvent::SessionFinished {
            owner: session.owner.to_string(),
            session_id: session.session_id,
            ranked_count,
            eliminated_count: session.eliminated.len(),
            comparisons_done: session.comparisons_done,
            timestamp: time::now(),
        });
    }
}
