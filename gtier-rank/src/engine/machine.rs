//! Session state machine
//!
//! ```text
//! SEEDING ──grouping──▶ GROUP ──all groups resolved──▶ MERGE ──one run──▶ FINISHED
//!    └────────────────no grouping───────────────────────▲
//! ```
//!
//! `start` leaves SEEDING before returning, so a stored session is never in
//! SEEDING. Every transition after that is driven by `answer`.

use gtier_common::events::RankingPhase;
use gtier_common::time;
use std::collections::HashMap;
use uuid::Uuid;

use super::grouping::{self, Group};
use super::merge::{expected_comparisons, MergeError, MergeSort};
use crate::models::{Item, ItemId, OwnerId, RankingSession, SessionOptions};

/// Phase change caused by one answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: RankingPhase,
    pub to: RankingPhase,
}

impl RankingSession {
    /// Fresh session over `items`, advanced to its first pending pair
    pub fn start(owner: OwnerId, items: Vec<Item>, options: SessionOptions) -> Self {
        let now = time::now();
        let mut options = options;
        options.qualifiers_per_group = options.qualifiers_per_group.max(1);

        let comparisons_expected = if options.grouping {
            let sizes: Vec<usize> = grouping::partition(&items)
                .iter()
                .map(|g| g.members.len())
                .collect();
            grouping::expected_grouped_comparisons(&sizes, options.qualifiers_per_group)
        } else {
            expected_comparisons(items.len())
        };

        let mut session = Self {
            session_id: Uuid::new_v4(),
            owner,
            phase: RankingPhase::Seeding,
            options,
            items,
            groups: Vec::new(),
            merge: None,
            comparisons_done: 0,
            comparisons_expected,
            final_order: None,
            eliminated: Vec::new(),
            revision: 0,
            started_at: now,
            updated_at: now,
            finished_at: None,
        };
        session.advance();
        session
    }

    /// Pair awaiting the oracle, if any
    pub fn pending_pair(&self) -> Option<(ItemId, ItemId)> {
        match self.phase {
            RankingPhase::Group => self
                .current_group()
                .and_then(|(_, group)| group.sort.pending_pair()),
            RankingPhase::Merge => self.merge.as_ref().and_then(MergeSort::pending_pair),
            RankingPhase::Seeding | RankingPhase::Finished => None,
        }
    }

    /// First unresolved group with its index (GROUP phase only)
    pub fn current_group(&self) -> Option<(usize, &Group)> {
        if self.phase != RankingPhase::Group {
            return None;
        }
        self.groups.iter().enumerate().find(|(_, g)| !g.is_resolved())
    }

    /// Record "winner preferred over loser" and advance
    ///
    /// On error nothing changes. On success `comparisons_done` and `revision`
    /// are bumped and the phase change, if any, is returned.
    pub fn answer(
        &mut self,
        winner: ItemId,
        loser: ItemId,
    ) -> Result<Option<PhaseTransition>, MergeError> {
        let sort = match self.phase {
            RankingPhase::Group => self
                .groups
                .iter_mut()
                .find(|g| !g.is_resolved())
                .map(|g| &mut g.sort),
            RankingPhase::Merge => self.merge.as_mut(),
            RankingPhase::Seeding | RankingPhase::Finished => None,
        };
        let sort = sort.ok_or(MergeError::NoActivePair)?;
        sort.record(winner, loser)?;

        self.comparisons_done += 1;
        self.revision += 1;
        self.updated_at = time::now();

        let from = self.phase;
        self.advance();
        Ok((from != self.phase).then_some(PhaseTransition {
            from,
            to: self.phase,
        }))
    }

    /// Run transitions until an answer is needed or the session is finished
    fn advance(&mut self) {
        loop {
            match self.phase {
                RankingPhase::Seeding => {
                    if self.options.grouping {
                        self.groups = grouping::partition(&self.items);
                        self.phase = RankingPhase::Group;
                    } else {
                        self.merge = Some(MergeSort::new(self.items.iter().map(|i| i.id)));
                        self.phase = RankingPhase::Merge;
                    }
                }
                RankingPhase::Group => {
                    let k = self.options.qualifiers_per_group;
                    // Resolve in order; stop at the first group still sorting
                    let all_resolved = self.groups.iter_mut().all(|g| g.resolve(k));
                    if !all_resolved {
                        return;
                    }
                    self.merge = Some(MergeSort::new(grouping::qualifiers_in_order(
                        &self.groups,
                    )));
                    self.eliminated = grouping::eliminated_in_order(&self.groups);
                    self.phase = RankingPhase::Merge;
                }
                RankingPhase::Merge => {
                    let sorted = self
                        .merge
                        .as_ref()
                        .and_then(MergeSort::sorted)
                        .map(<[ItemId]>::to_vec);
                    match sorted {
                        Some(order) => {
                            self.final_order = Some(order);
                            self.finished_at = Some(time::now());
                            self.phase = RankingPhase::Finished;
                        }
                        None => return,
                    }
                }
                RankingPhase::Finished => return,
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase == RankingPhase::Finished
    }

    /// Look up a roster item
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Roster keyed by id, for callers that resolve many ids at once
    pub fn item_index(&self) -> HashMap<ItemId, &Item> {
        self.items.iter().map(|i| (i.id, i)).collect()
    }
}
