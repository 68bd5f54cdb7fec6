//! # gtier Common Library
//!
//! Shared code for the gtier workspace including:
//! - Database initialization and the settings table
//! - Ranking event types (RankingEvent enum) and the EventBus
//! - Configuration loading and root folder resolution
//! - Utility functions

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
