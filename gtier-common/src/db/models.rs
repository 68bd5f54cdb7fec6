//! Database models

use serde::{Deserialize, Serialize};

/// One row of the `games` catalog table
///
/// The catalog is owned by the surrounding application; gtier only reads it
/// (and writes it from the `import` convenience command).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GameRecord {
    pub id: i64,
    pub name: String,
    /// Comma-separated genre list, first entry is the primary genre
    #[serde(default)]
    pub genre: String,
    /// Comma-separated platform list
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub image: Option<String>,
}

impl GameRecord {
    /// Primary genre: first comma-separated entry, trimmed
    pub fn primary_genre(&self) -> Option<&str> {
        self.genre
            .split(',')
            .map(str::trim)
            .find(|g| !g.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(genre: &str) -> GameRecord {
        GameRecord {
            id: 1,
            name: "Test Game".to_string(),
            genre: genre.to_string(),
            platform: String::new(),
            release_date: None,
            rating: None,
            image: None,
        }
    }

    #[test]
    fn test_primary_genre_takes_first_entry() {
        assert_eq!(record("Shooter, RPG").primary_genre(), Some("Shooter"));
    }

    #[test]
    fn test_primary_genre_skips_blank_entries() {
        assert_eq!(record(" , Puzzle").primary_genre(), Some("Puzzle"));
        assert_eq!(record("   ").primary_genre(), None);
    }
}
