//! Error types for gtier-rank
//!
//! Domain errors are client-recoverable: the caller can fix the request and
//! try again. Store failures wrap [`gtier_common::Error`] and abort the
//! operation with prior state untouched.

use serde_json::json;
use thiserror::Error;

use crate::engine::MergeError;
use crate::models::{ItemId, OwnerId};

/// Ranking error type
#[derive(Debug, Error)]
pub enum RankError {
    /// Fewer than two rankable items for the owner
    #[error("Not enough played items to rank for {owner}: found {found}, need at least 2")]
    NoItems { owner: OwnerId, found: usize },

    /// No session exists for the owner
    #[error("No ranking session for {0}")]
    NotFound(OwnerId),

    /// No session, or the session is already finished
    #[error("No comparison pending for {0}")]
    NoActivePair(OwnerId),

    /// Answer does not match the pair currently presented
    #[error("{}", stale_message(.winner, .loser, .expected))]
    StalePair {
        winner: ItemId,
        loser: ItemId,
        /// Pair that is actually pending, when known
        expected: Option<(ItemId, ItemId)>,
    },

    /// Malformed request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// gtier-common error (database, configuration, io)
    #[error("Store error: {0}")]
    Store(#[from] gtier_common::Error),
}

fn stale_message(winner: &ItemId, loser: &ItemId, expected: &Option<(ItemId, ItemId)>) -> String {
    match expected {
        Some((left, right)) => format!(
            "Answer {} over {} does not match pending pair ({}, {})",
            winner, loser, left, right
        ),
        None => format!("Answer {} over {} does not match pending pair", winner, loser),
    }
}

impl RankError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            RankError::NoItems { .. } => "NO_ITEMS",
            RankError::NotFound(_) => "NOT_FOUND",
            RankError::NoActivePair(_) => "NO_ACTIVE_PAIR",
            RankError::StalePair { .. } => "STALE_PAIR",
            RankError::InvalidInput(_) => "INVALID_INPUT",
            RankError::Store(_) => "STORE_ERROR",
        }
    }

    /// True when the caller can recover by changing the request
    pub fn is_client_recoverable(&self) -> bool {
        !matches!(self, RankError::Store(_))
    }

    /// `{"error": {"code", "message"}}` body for front ends
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        })
    }

    /// Lift an engine error into the owner's context
    pub(crate) fn from_merge(owner: &OwnerId, err: MergeError) -> Self {
        match err {
            MergeError::NoActivePair => RankError::NoActivePair(owner.clone()),
            MergeError::StalePair {
                winner,
                loser,
                expected,
            } => RankError::StalePair {
                winner,
                loser,
                expected: Some(expected),
            },
        }
    }
}

/// Result type for ranking operations
pub type RankResult<T> = Result<T, RankError>;
