//! Item set loader
//!
//! Pulls the owner's played items from the catalog and checks there is
//! something to rank.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use super::catalog::{CatalogFilter, CatalogSource};
use crate::error::{RankError, RankResult};
use crate::models::{Item, OwnerId};

/// Fewest items a ranking can be started with
pub const MIN_ITEMS: usize = 2;

#[derive(Clone)]
pub struct ItemSetLoader {
    catalog: Arc<dyn CatalogSource>,
}

impl ItemSetLoader {
    pub fn new(catalog: Arc<dyn CatalogSource>) -> Self {
        Self { catalog }
    }

    /// Ordered, duplicate-free item list for the owner
    ///
    /// Fails with `NoItems` when fewer than two items remain. Not retried.
    pub async fn load(&self, owner: &OwnerId, filter: &CatalogFilter) -> RankResult<Vec<Item>> {
        let raw = self.catalog.load_played_items(owner, filter).await?;
        let raw_len = raw.len();

        let mut seen = HashSet::with_capacity(raw_len);
        let items: Vec<Item> = raw.into_iter().filter(|i| seen.insert(i.id)).collect();

        if items.len() != raw_len {
            warn!(
                owner = %owner,
                duplicates = raw_len - items.len(),
                "Catalog returned duplicate items; keeping first occurrence"
            );
        }

        if items.len() < MIN_ITEMS {
            return Err(RankError::NoItems {
                owner: owner.clone(),
                found: items.len(),
            });
        }

        debug!(owner = %owner, count = items.len(), "Loaded item set");
        Ok(items)
    }
}
