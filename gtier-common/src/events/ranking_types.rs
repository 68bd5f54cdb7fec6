//! Ranking-related types shared by events and the ranking engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ranking session phase
///
/// SEEDING → GROUP (grouping enabled) → MERGE → FINISHED, or
/// SEEDING → MERGE → FINISHED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RankingPhase {
    /// Items loaded, no comparison structure built yet
    Seeding,
    /// Per-group qualifier selection
    Group,
    /// Final merge sort over all (remaining) items
    Merge,
    /// Total order available; terminal until restart
    Finished,
}

impl RankingPhase {
    /// Terminal phase check
    pub fn is_terminal(&self) -> bool {
        matches!(self, RankingPhase::Finished)
    }

    /// Stable text form, as stored in the `phase` column
    pub fn as_str(&self) -> &'static str {
        match self {
            RankingPhase::Seeding => "SEEDING",
            RankingPhase::Group => "GROUP",
            RankingPhase::Merge => "MERGE",
            RankingPhase::Finished => "FINISHED",
        }
    }
}

impl fmt::Display for RankingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_serializes_uppercase() {
        let json = serde_json::to_string(&RankingPhase::Merge).unwrap();
        assert_eq!(json, "\"MERGE\"");
        let back: RankingPhase = serde_json::from_str("\"FINISHED\"").unwrap();
        assert_eq!(back, RankingPhase::Finished);
    }

    #[test]
    fn test_only_finished_is_terminal() {
        assert!(RankingPhase::Finished.is_terminal());
        assert!(!RankingPhase::Seeding.is_terminal());
        assert!(!RankingPhase::Group.is_terminal());
        assert!(!RankingPhase::Merge.is_terminal());
    }
}
