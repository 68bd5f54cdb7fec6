//! Resumable interactive merge sort
//!
//! A queue merge sort whose comparisons are answered from outside. The state
//! is a FIFO queue of sorted runs plus at most one merge in flight; the
//! "awaiting oracle" point is the cursor pair of that merge, so the whole
//! structure can be serialized between answers.
//!
//! The two oldest runs are always merged next. When one side of a merge runs
//! out, the rest of the other side is appended without asking, which is why a
//! sort can finish with fewer than `⌈N·log₂N⌉` comparisons.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

use crate::models::ItemId;

/// Errors from feeding an answer to a merge sort
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// Nothing is waiting for an answer
    #[error("no comparison is pending")]
    NoActivePair,

    /// Answer does not name the pending pair
    #[error("answer {winner} over {loser} does not match pending pair ({}, {})", .expected.0, .expected.1)]
    StalePair {
        winner: ItemId,
        loser: ItemId,
        expected: (ItemId, ItemId),
    },
}

/// The merge currently in flight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveMerge {
    pub left: Vec<ItemId>,
    pub right: Vec<ItemId>,
    /// Cursor into `left`
    pub li: usize,
    /// Cursor into `right`
    pub rj: usize,
    /// Items already placed, most preferred first
    pub output: Vec<ItemId>,
}

impl ActiveMerge {
    fn new(left: Vec<ItemId>, right: Vec<ItemId>) -> Self {
        let capacity = left.len() + right.len();
        Self {
            left,
            right,
            li: 0,
            rj: 0,
            output: Vec::with_capacity(capacity),
        }
    }

    /// Heads of both runs, when both still have unplaced items
    pub fn pending_pair(&self) -> Option<(ItemId, ItemId)> {
        match (self.left.get(self.li), self.right.get(self.rj)) {
            (Some(&l), Some(&r)) => Some((l, r)),
            _ => None,
        }
    }

    fn unplaced_left(&self) -> &[ItemId] {
        self.left.get(self.li..).unwrap_or(&[])
    }

    fn unplaced_right(&self) -> &[ItemId] {
        self.right.get(self.rj..).unwrap_or(&[])
    }

    /// Append whatever is left of either run; no comparison needed
    fn drain_remainder(mut self) -> Vec<ItemId> {
        let rest: Vec<ItemId> = self
            .unplaced_left()
            .iter()
            .chain(self.unplaced_right())
            .copied()
            .collect();
        self.output.extend(rest);
        self.output
    }
}

/// Merge sort state for one set of items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSort {
    runs: VecDeque<Vec<ItemId>>,
    active: Option<ActiveMerge>,
    comparisons: u64,
}

impl MergeSort {
    /// Seed with one singleton run per item, in the given order
    pub fn new(items: impl IntoIterator<Item = ItemId>) -> Self {
        let mut sort = Self {
            runs: items.into_iter().map(|id| vec![id]).collect(),
            active: None,
            comparisons: 0,
        };
        sort.advance();
        sort
    }

    /// Pair the oracle must decide next
    pub fn pending_pair(&self) -> Option<(ItemId, ItemId)> {
        self.active.as_ref().and_then(ActiveMerge::pending_pair)
    }

    /// Apply "winner is preferred over loser" to the pending pair
    ///
    /// On error the state is left untouched.
    pub fn record(&mut self, winner: ItemId, loser: ItemId) -> Result<(), MergeError> {
        let active = self.active.as_mut().ok_or(MergeError::NoActivePair)?;
        let (left_head, right_head) = active.pending_pair().ok_or(MergeError::NoActivePair)?;

        if winner == left_head && loser == right_head {
            active.output.push(left_head);
            active.li += 1;
        } else if winner == right_head && loser == left_head {
            active.output.push(right_head);
            active.rj += 1;
        } else {
            return Err(MergeError::StalePair {
                winner,
                loser,
                expected: (left_head, right_head),
            });
        }

        self.comparisons += 1;
        self.advance();
        Ok(())
    }

    /// Run forward until an answer is needed or one run remains
    fn advance(&mut self) {
        loop {
            if let Some(active) = &self.active {
                if active.pending_pair().is_some() {
                    return;
                }
                if let Some(done) = self.active.take() {
                    self.runs.push_back(done.drain_remainder());
                }
            }

            if self.runs.len() < 2 {
                return;
            }

            // Oldest two runs; both exist since len >= 2
            if let (Some(left), Some(right)) = (self.runs.pop_front(), self.runs.pop_front()) {
                self.active = Some(ActiveMerge::new(left, right));
            }
        }
    }

    /// No merge in flight and at most one run left
    pub fn is_finished(&self) -> bool {
        self.active.is_none() && self.runs.len() <= 1
    }

    /// Final order, most preferred first, once finished
    pub fn sorted(&self) -> Option<&[ItemId]> {
        if !self.is_finished() {
            return None;
        }
        Some(self.runs.front().map(Vec::as_slice).unwrap_or(&[]))
    }

    /// Comparisons answered so far
    pub fn comparisons(&self) -> u64 {
        self.comparisons
    }

    /// Runs waiting in the queue, oldest first
    pub fn runs(&self) -> impl Iterator<Item = &[ItemId]> {
        self.runs.iter().map(Vec::as_slice)
    }

    pub fn active(&self) -> Option<&ActiveMerge> {
        self.active.as_ref()
    }

    /// Every item currently held, wherever it sits
    ///
    /// Each input item appears exactly once.
    pub fn items(&self) -> Vec<ItemId> {
        let mut all: Vec<ItemId> = Vec::new();
        if let Some(active) = &self.active {
            all.extend(&active.output);
            all.extend(active.unplaced_left());
            all.extend(active.unplaced_right());
        }
        for run in &self.runs {
            all.extend(run);
        }
        all
    }

    /// Number of items held
    pub fn len(&self) -> usize {
        let in_flight = self
            .active
            .as_ref()
            .map(|a| a.output.len() + a.unplaced_left().len() + a.unplaced_right().len())
            .unwrap_or(0);
        in_flight + self.runs.iter().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Upper bound on comparisons for `n` items: `⌈n·log₂n⌉`
///
/// Used for progress reporting only; early run exhaustion usually finishes
/// sooner.
pub fn expected_comparisons(n: usize) -> u64 {
    if n < 2 {
        return 0;
    }
    let n = n as f64;
    (n * n.log2()).ceil() as u64
}
