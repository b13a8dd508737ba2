pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

use crate::error::Result;
use crate::models::*;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn all_items(&self) -> Result<Vec<Item>>;
    async fn item(&self, item_id: Uuid) -> Result<Option<Item>>;

    async fn items_by_category(&self, category: Category) -> Result<Vec<Item>> {
        let items = self.all_items().await?;
        Ok(items
            .into_iter()
            .filter(|item| item.category == Some(category))
            .collect())
    }

    /// Distinct categories present in the catalog, sorted.
    async fn categories(&self) -> Result<Vec<Category>> {
        let items = self.all_items().await?;
        let categories: BTreeSet<Category> = items.iter().filter_map(|i| i.category).collect();
        Ok(categories.into_iter().collect())
    }
}

#[async_trait]
pub trait Identity: Send + Sync {
    async fn user(&self, user_id: Uuid) -> Result<Option<User>>;
    async fn upsert_user(&self, user: &User) -> Result<()>;
    /// Removes the profile; interaction history is kept. Returns whether a
    /// profile existed.
    async fn delete_user(&self, user_id: Uuid) -> Result<bool>;
}

/// Append-only interaction history.
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn append(&self, event: &InteractionEvent) -> Result<()>;
    async fn events_for_user(&self, user_id: Uuid) -> Result<Vec<InteractionEvent>>;
    async fn events_for_item(&self, item_id: Uuid) -> Result<Vec<InteractionEvent>>;
    /// Total events per item id; items without events are absent.
    async fn interaction_counts(&self) -> Result<HashMap<Uuid, u64>>;
}

#[async_trait]
pub trait VoteLedger: Send + Sync {
    /// Earliest vote the user cast on the item, if any. A read-only lookup;
    /// `record_vote` repeats the check under its own lock.
    async fn prior_vote(&self, user_id: Uuid, item_id: Uuid) -> Result<Option<VoteDirection>>;

    /// Atomically checks for a prior vote and, if none, records the vote event
    /// and bumps the item's counter. Unknown items are a validation error.
    async fn record_vote(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        direction: VoteDirection,
    ) -> Result<VoteWrite>;
}

pub trait DiscoveryStore: Catalog + Identity + EventLog + VoteLedger {}

impl<T: Catalog + Identity + EventLog + VoteLedger> DiscoveryStore for T {}
