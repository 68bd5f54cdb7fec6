//! Client-facing session view
//!
//! What `start`, `status` and `answer` return. Built from a session on every
//! call; never stored.

use gtier_common::events::RankingPhase;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::item::{Item, ItemId};
use super::session::RankingSession;
use crate::engine::EliminationPolicy;

/// Comparison progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub comparisons_done: u64,
    /// Upper bound, for progress bars
    pub comparisons_expected: u64,
    /// `min(100, done / expected · 100)`
    pub percentage: f64,
}

impl Progress {
    pub fn new(done: u64, expected: u64) -> Self {
        let percentage = if expected == 0 {
            100.0
        } else {
            (done as f64 / expected as f64 * 100.0).min(100.0)
        };
        Self {
            comparisons_done: done,
            comparisons_expected: expected,
            percentage,
        }
    }
}

/// The two items awaiting a decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairView {
    pub left: Item,
    pub right: Item,
}

/// Group currently being sorted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupProgress {
    pub label: String,
    /// Zero-based
    pub index: usize,
    pub total: usize,
}

/// Rank and tier of one item in the finished ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierAssignment {
    pub item: Item,
    /// 1-based
    pub rank: u32,
    pub tier: String,
}

/// Snapshot of a session for the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub owner: String,
    pub phase: RankingPhase,
    pub progress: Progress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_pair: Option<PairView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_group: Option<GroupProgress>,
    /// FINISHED only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking: Option<Vec<TierAssignment>>,
    /// FINISHED only; empty unless the grouping stage eliminated items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eliminated: Option<Vec<Item>>,
}

impl SessionView {
    pub fn build(session: &RankingSession) -> Self {
        let pending_pair = session.pending_pair().and_then(|(left, right)| {
            Some(PairView {
                left: session.item(left)?.clone(),
                right: session.item(right)?.clone(),
            })
        });

        let current_group = session.current_group().map(|(index, group)| GroupProgress {
            label: group.label.clone(),
            index,
            total: session.groups.len(),
        });

        let (ranking, eliminated) = match &session.final_order {
            Some(order) if session.is_finished() => {
                let (ranking, eliminated) = rank_items(session, order);
                (Some(ranking), Some(eliminated))
            }
            _ => (None, None),
        };

        Self {
            session_id: session.session_id,
            owner: session.owner.to_string(),
            phase: session.phase,
            progress: Progress::new(session.comparisons_done, session.comparisons_expected),
            pending_pair,
            current_group,
            ranking,
            eliminated,
        }
    }
}

/// Ranked list and the eliminated items, per the session's policies
fn rank_items(session: &RankingSession, order: &[ItemId]) -> (Vec<TierAssignment>, Vec<Item>) {
    let options = &session.options;
    let tiers = options.tier_policy.assign(order.len());
    let index = session.item_index();

    let mut ranking: Vec<TierAssignment> = order
        .iter()
        .zip(tiers)
        .filter_map(|(id, tier)| index.get(id).map(|item| (*item, tier)))
        .enumerate()
        .map(|(pos, (item, tier))| TierAssignment {
            item: item.clone(),
            rank: pos as u32 + 1,
            tier,
        })
        .collect();

    let eliminated: Vec<Item> = session
        .eliminated
        .iter()
        .filter_map(|id| index.get(id).map(|item| (*item).clone()))
        .collect();

    if options.elimination == EliminationPolicy::RankAfterQualifiers {
        let offset = ranking.len() as u32;
        ranking.extend(
            eliminated
                .iter()
                .enumerate()
                .map(|(pos, item)| TierAssignment {
                    item: item.clone(),
                    rank: offset + pos as u32 + 1,
                    tier: options.eliminated_tier.clone(),
                }),
        );
    }

    (ranking, eliminated)
}
