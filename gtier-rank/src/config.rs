//! Ranking settings
//!
//! Runtime policy read from the `settings` table. Keys missing from the table
//! fall back to the compiled defaults; a present but malformed value is a
//! configuration error rather than a silent fallback.

use gtier_common::db::settings::{
    self, ELIMINATED_POLICY, ELIMINATED_TIER, GROUPING_ENABLED, QUALIFIERS_PER_GROUP,
    TIER_POLICY,
};
use gtier_common::Result;
use sqlx::SqlitePool;
use tracing::debug;

use crate::engine::{EliminationPolicy, TierPolicy};
use crate::models::SessionOptions;

/// Ranking policy in effect for new sessions
#[derive(Debug, Clone, PartialEq)]
pub struct RankingSettings {
    pub grouping_enabled: bool,
    pub qualifiers_per_group: usize,
    pub tier_policy: TierPolicy,
    pub elimination: EliminationPolicy,
    pub eliminated_tier: String,
    /// Lock-retry budget for session writes
    pub max_lock_wait_ms: u64,
}

impl Default for RankingSettings {
    fn default() -> Self {
        let options = SessionOptions::default();
        Self {
            grouping_enabled: options.grouping,
            qualifiers_per_group: options.qualifiers_per_group,
            tier_policy: options.tier_policy,
            elimination: options.elimination,
            eliminated_tier: options.eliminated_tier,
            max_lock_wait_ms: 5000,
        }
    }
}

impl RankingSettings {
    /// Load from the settings table
    pub async fn load(db: &SqlitePool) -> Result<Self> {
        let defaults = Self::default();

        let grouping_enabled = settings::get_setting::<bool>(db, GROUPING_ENABLED)
            .await?
            .unwrap_or(defaults.grouping_enabled);
        let qualifiers_per_group = settings::get_setting::<usize>(db, QUALIFIERS_PER_GROUP)
            .await?
            .unwrap_or(defaults.qualifiers_per_group)
            .max(1);
        let tier_policy = settings::get_setting::<String>(db, TIER_POLICY)
            .await?
            .map(|raw| TierPolicy::parse(&raw))
            .transpose()?
            .unwrap_or(defaults.tier_policy);
        let elimination = settings::get_setting::<String>(db, ELIMINATED_POLICY)
            .await?
            .map(|raw| raw.parse::<EliminationPolicy>())
            .transpose()?
            .unwrap_or(defaults.elimination);
        let eliminated_tier = settings::get_setting::<String>(db, ELIMINATED_TIER)
            .await?
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(defaults.eliminated_tier);
        let max_lock_wait_ms = settings::get_max_lock_wait_ms(db).await?;

        let loaded = Self {
            grouping_enabled,
            qualifiers_per_group,
            tier_policy,
            elimination,
            eliminated_tier,
            max_lock_wait_ms,
        };
        debug!(
            grouping = loaded.grouping_enabled,
            k = loaded.qualifiers_per_group,
            tiers = %loaded.tier_policy,
            elimination = %loaded.elimination,
            "Loaded ranking settings"
        );
        Ok(loaded)
    }

    /// Options a new session is started with
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            grouping: self.grouping_enabled,
            qualifiers_per_group: self.qualifiers_per_group.max(1),
            elimination: self.elimination,
            eliminated_tier: self.eliminated_tier.clone(),
            tier_policy: self.tier_policy.clone(),
        }
    }
}
