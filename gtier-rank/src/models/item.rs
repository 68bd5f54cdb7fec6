//! Item and owner identities
//!
//! The engine only ever looks at [`ItemId`]; the payload travels with the
//! item so views can show it, but is never inspected.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{RankError, RankResult};

/// Opaque item identifier (catalog game id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub i64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        ItemId(id)
    }
}

/// Identity a ranking session is keyed by
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Wrap an identity supplied by a trusted resolver
    pub fn new(owner: impl Into<String>) -> Self {
        OwnerId(owner.into())
    }

    /// Validate an identity coming from user input (trimmed, non-empty)
    pub fn parse(raw: &str) -> RankResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RankError::InvalidInput("owner must not be empty".to_string()));
        }
        Ok(OwnerId(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rankable item handle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    /// Categorical label used by the grouping stage (primary genre)
    pub group_label: String,
    /// Display data, opaque to the engine
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Item {
    pub fn new(id: impl Into<ItemId>, group_label: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            group_label: group_label.into(),
            payload,
        }
    }
}
