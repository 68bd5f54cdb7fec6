//! Grouping stage
//!
//! Optional pre-phase: items are split by group label, each group is sorted
//! with its own [`MergeSort`], and the top `k` of every group qualify for the
//! final merge. Groups are resolved one at a time in order of first
//! appearance.
//!
//! Items below the cut are eliminated. What happens to them afterwards is an
//! [`EliminationPolicy`] decision; they are never dropped without a trace.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use gtier_common::Error;

use super::merge::{expected_comparisons, MergeSort};
use crate::models::{Item, ItemId};

/// Label for items whose group label is blank
pub const UNCATEGORISED: &str = "Uncategorised";

/// What the finished ranking does with group-stage losers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EliminationPolicy {
    /// No rank; listed separately in the finished view
    #[default]
    Exclude,
    /// Ranked after every qualifier with a fixed tier label
    RankAfterQualifiers,
}

impl EliminationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EliminationPolicy::Exclude => "exclude",
            EliminationPolicy::RankAfterQualifiers => "rank_after_qualifiers",
        }
    }
}

impl fmt::Display for EliminationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EliminationPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exclude" => Ok(EliminationPolicy::Exclude),
            "rank_after_qualifiers" => Ok(EliminationPolicy::RankAfterQualifiers),
            other => Err(Error::Config(format!(
                "Unknown elimination policy '{}' (expected exclude or rank_after_qualifiers)",
                other
            ))),
        }
    }
}

/// One group of the grouping stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub label: String,
    /// Members in catalog order
    pub members: Vec<ItemId>,
    pub sort: MergeSort,
    /// Top `k` of the group, set once the group's sort finishes
    pub qualifiers: Option<Vec<ItemId>>,
}

impl Group {
    pub fn new(label: impl Into<String>, members: Vec<ItemId>) -> Self {
        let sort = MergeSort::new(members.iter().copied());
        Self {
            label: label.into(),
            members,
            sort,
            qualifiers: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.qualifiers.is_some()
    }

    /// Fix the qualifiers if the group's sort is done
    ///
    /// Returns true when the group is resolved after the call.
    pub fn resolve(&mut self, qualifiers_per_group: usize) -> bool {
        if self.qualifiers.is_none() {
            if let Some(sorted) = self.sort.sorted() {
                let k = qualifiers_per_group.min(sorted.len());
                self.qualifiers = Some(sorted[..k].to_vec());
            }
        }
        self.is_resolved()
    }

    /// Sorted members below the qualifier cut, best first
    pub fn eliminated(&self) -> &[ItemId] {
        match (&self.qualifiers, self.sort.sorted()) {
            (Some(q), Some(sorted)) => sorted.get(q.len()..).unwrap_or(&[]),
            _ => &[],
        }
    }
}

/// Split items into groups by label, groups ordered by first appearance
pub fn partition(items: &[Item]) -> Vec<Group> {
    let mut order: Vec<(String, Vec<ItemId>)> = Vec::new();

    for item in items {
        let label = match item.group_label.trim() {
            "" => UNCATEGORISED,
            l => l,
        };
        match order.iter_mut().find(|(l, _)| l == label) {
            Some((_, members)) => members.push(item.id),
            None => order.push((label.to_string(), vec![item.id])),
        }
    }

    order
        .into_iter()
        .map(|(label, members)| Group::new(label, members))
        .collect()
}

/// Qualifiers in group order, then in-group order
pub fn qualifiers_in_order(groups: &[Group]) -> Vec<ItemId> {
    groups
        .iter()
        .filter_map(|g| g.qualifiers.as_ref())
        .flatten()
        .copied()
        .collect()
}

/// Eliminated items ordered by in-group position, then group order
///
/// Every group's 4th place comes before any group's 5th place.
pub fn eliminated_in_order(groups: &[Group]) -> Vec<ItemId> {
    let tails: Vec<&[ItemId]> = groups.iter().map(Group::eliminated).collect();
    let longest = tails.iter().map(|t| t.len()).max().unwrap_or(0);

    let mut out = Vec::with_capacity(tails.iter().map(|t| t.len()).sum());
    for position in 0..longest {
        for tail in &tails {
            if let Some(id) = tail.get(position) {
                out.push(*id);
            }
        }
    }
    out
}

/// Comparison upper bound for a grouped session
///
/// Sum of every group's bound plus the bound for the final merge over all
/// qualifiers (known up front because `k` is fixed).
pub fn expected_grouped_comparisons(group_sizes: &[usize], qualifiers_per_group: usize) -> u64 {
    let within: u64 = group_sizes.iter().map(|&g| expected_comparisons(g)).sum();
    let qualifiers: usize = group_sizes
        .iter()
        .map(|&g| g.min(qualifiers_per_group))
        .sum();
    within + expected_comparisons(qualifiers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn item(id: i64, label: &str) -> Item {
        Item::new(id, label, Value::Null)
    }

    fn finish(group: &mut Group, truth: &[i64]) {
        let rank = |id: ItemId| truth.iter().position(|t| *t == id.0).unwrap();
        while let Some((a, b)) = group.sort.pending_pair() {
            if rank(a) < rank(b) {
                group.sort.record(a, b).unwrap();
            } else {
                group.sort.record(b, a).unwrap();
            }
        }
    }

    #[test]
    fn test_partition_by_first_appearance() {
        let items = vec![
            item(1, "RPG"),
            item(2, "Shooter"),
            item(3, "RPG"),
            item(4, " "),
            item(5, "Shooter"),
        ];
        let groups = partition(&items);

        let labels: Vec<&str> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["RPG", "Shooter", UNCATEGORISED]);
        assert_eq!(groups[0].members, vec![ItemId(1), ItemId(3)]);
        assert_eq!(groups[1].members, vec![ItemId(2), ItemId(5)]);
        assert_eq!(groups[2].members, vec![ItemId(4)]);
    }

    #[test]
    fn test_singleton_group_resolves_without_comparisons() {
        let mut group = Group::new("Puzzle", vec![ItemId(7)]);
        assert!(group.resolve(3));
        assert_eq!(group.qualifiers, Some(vec![ItemId(7)]));
        assert!(group.eliminated().is_empty());
    }

    #[test]
    fn test_resolve_takes_top_k() {
        let mut group = Group::new("RPG", (1..=5).map(ItemId).collect());
        assert!(!group.resolve(3));

        finish(&mut group, &[4, 2, 5, 1, 3]);
        assert!(group.resolve(3));
        assert_eq!(group.qualifiers, Some(vec![ItemId(4), ItemId(2), ItemId(5)]));
        assert_eq!(group.eliminated(), &[ItemId(1), ItemId(3)]);
    }

    #[test]
    fn test_eliminated_order_is_position_then_group() {
        let mut a = Group::new("A", (1..=5).map(ItemId).collect());
        let mut b = Group::new("B", (11..=14).map(ItemId).collect());
        finish(&mut a, &[1, 2, 3, 4, 5]);
        finish(&mut b, &[11, 12, 13, 14]);
        a.resolve(2);
        b.resolve(2);

        let groups = vec![a, b];
        assert_eq!(
            qualifiers_in_order(&groups),
            vec![ItemId(1), ItemId(2), ItemId(11), ItemId(12)]
        );
        assert_eq!(
            eliminated_in_order(&groups),
            vec![ItemId(3), ItemId(13), ItemId(4), ItemId(14), ItemId(5)]
        );
    }

    #[test]
    fn test_expected_grouped_comparisons() {
        // Groups of 5 and 2 with k=3: ⌈5·log₂5⌉=12, ⌈2·log₂2⌉=2, Q=5 → 12
        assert_eq!(expected_grouped_comparisons(&[5, 2], 3), 12 + 2 + 12);
        // Singletons only: no group work, merge over all of them
        assert_eq!(expected_grouped_comparisons(&[1, 1, 1, 1], 3), 8);
    }

    #[test]
    fn test_elimination_policy_parse() {
        assert_eq!(
            "exclude".parse::<EliminationPolicy>().unwrap(),
            EliminationPolicy::Exclude
        );
        assert_eq!(
            " Rank_After_Qualifiers ".parse::<EliminationPolicy>().unwrap(),
            EliminationPolicy::RankAfterQualifiers
        );
        assert!(matches!(
            "drop".parse::<EliminationPolicy>(),
            Err(Error::Config(_))
        ));
    }
}
