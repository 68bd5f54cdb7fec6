//! Ranking session model
//!
//! One session per owner. The whole struct is what the session store
//! persists; state transitions live in [`crate::engine::machine`].

use chrono::{DateTime, Utc};
use gtier_common::events::RankingPhase;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::item::{Item, ItemId, OwnerId};
use crate::engine::{EliminationPolicy, Group, MergeSort, TierPolicy};

/// Settings a session is started with
///
/// Captured at start so a finished ranking does not change when settings are
/// edited later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Run the grouping stage before the final merge
    pub grouping: bool,
    /// Qualifiers per group (at least 1)
    pub qualifiers_per_group: usize,
    pub elimination: EliminationPolicy,
    /// Tier label given to eliminated items under `rank_after_qualifiers`
    pub eliminated_tier: String,
    pub tier_policy: TierPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            grouping: false,
            qualifiers_per_group: 3,
            elimination: EliminationPolicy::default(),
            eliminated_tier: "D".to_string(),
            tier_policy: TierPolicy::default(),
        }
    }
}

impl SessionOptions {
    pub fn with_grouping(mut self, grouping: bool) -> Self {
        self.grouping = grouping;
        self
    }

    pub fn with_qualifiers_per_group(mut self, k: usize) -> Self {
        self.qualifiers_per_group = k.max(1);
        self
    }
}

/// Persisted ranking session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingSession {
    pub session_id: Uuid,
    pub owner: OwnerId,
    pub phase: RankingPhase,
    pub options: SessionOptions,

    /// Roster in catalog order
    pub items: Vec<Item>,

    /// Grouping stage state; kept after GROUP for reporting
    #[serde(default)]
    pub groups: Vec<Group>,

    /// Final merge, present from MERGE on
    #[serde(default)]
    pub merge: Option<MergeSort>,

    pub comparisons_done: u64,
    pub comparisons_expected: u64,

    /// Set iff phase is FINISHED
    #[serde(default)]
    pub final_order: Option<Vec<ItemId>>,

    /// Group-stage losers, position order then group order
    #[serde(default)]
    pub eliminated: Vec<ItemId>,

    /// Bumped on every answer; store writes compare against it
    pub revision: u64,

    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}
