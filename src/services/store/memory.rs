use super::{Catalog, EventLog, Identity, VoteLedger};
use crate::error::{DiscoveryError, Result};
use crate::models::*;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Lock order is always items, then events.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    items: Arc<RwLock<HashMap<Uuid, Item>>>,
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    events: Arc<RwLock<Vec<InteractionEvent>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let items = snapshot.items.into_iter().map(|i| (i.id, i)).collect();
        let users = snapshot.users.into_iter().map(|u| (u.id, u)).collect();

        Self {
            items: Arc::new(RwLock::new(items)),
            users: Arc::new(RwLock::new(users)),
            events: Arc::new(RwLock::new(snapshot.events)),
        }
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let snapshot: Snapshot = serde_json::from_str(&raw)?;
        info!(
            "Loaded snapshot {} ({} items, {} users, {} events)",
            path.as_ref().display(),
            snapshot.items.len(),
            snapshot.users.len(),
            snapshot.events.len()
        );
        Ok(Self::from_snapshot(snapshot))
    }

    pub async fn snapshot(&self) -> Snapshot {
        let items = self.items.read().await;
        let users = self.users.read().await;
        let events = self.events.read().await;

        let mut items: Vec<Item> = items.values().cloned().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        let mut users: Vec<User> = users.values().cloned().collect();
        users.sort_by_key(|u| u.id);

        Snapshot {
            items,
            users,
            events: events.clone(),
        }
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let snapshot = self.snapshot().await;
        let json = serde_json::to_string_pretty(&snapshot)?;
        tokio::fs::write(path.as_ref(), json).await?;
        info!("Saved snapshot to {}", path.as_ref().display());
        Ok(())
    }

    pub async fn insert_item(&self, item: Item) {
        let mut items = self.items.write().await;
        items.insert(item.id, item);
    }

    pub async fn batch_insert_items(&self, batch: Vec<Item>) {
        let count = batch.len();
        let mut items = self.items.write().await;
        for item in batch {
            items.insert(item.id, item);
        }
        info!("Batch inserted {} items", count);
    }
}

fn first_vote(events: &[InteractionEvent], user_id: Uuid, item_id: Uuid) -> Option<VoteDirection> {
    events
        .iter()
        .filter(|e| e.user_id == user_id && e.item_id == item_id)
        .find_map(|e| VoteDirection::from_kind(e.kind))
}

#[async_trait]
impl Catalog for InMemoryStore {
    async fn all_items(&self) -> Result<Vec<Item>> {
        let items = self.items.read().await;
        let mut all: Vec<Item> = items.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn item(&self, item_id: Uuid) -> Result<Option<Item>> {
        let items = self.items.read().await;
        Ok(items.get(&item_id).cloned())
    }
}

#[async_trait]
impl Identity for InMemoryStore {
    async fn user(&self, user_id: Uuid) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&user_id).cloned())
    }

    async fn upsert_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<bool> {
        let mut users = self.users.write().await;
        Ok(users.remove(&user_id).is_some())
    }
}

#[async_trait]
impl EventLog for InMemoryStore {
    async fn append(&self, event: &InteractionEvent) -> Result<()> {
        let mut events = self.events.write().await;
        events.push(event.clone());
        Ok(())
    }

    async fn events_for_user(&self, user_id: Uuid) -> Result<Vec<InteractionEvent>> {
        let events = self.events.read().await;
        Ok(events.iter().filter(|e| e.user_id == user_id).cloned().collect())
    }

    async fn events_for_item(&self, item_id: Uuid) -> Result<Vec<InteractionEvent>> {
        let events = self.events.read().await;
        Ok(events.iter().filter(|e| e.item_id == item_id).cloned().collect())
    }

    async fn interaction_counts(&self) -> Result<HashMap<Uuid, u64>> {
        let events = self.events.read().await;
        let mut counts = HashMap::new();
        for event in events.iter() {
            *counts.entry(event.item_id).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

#[async_trait]
impl VoteLedger for InMemoryStore {
    async fn prior_vote(&self, user_id: Uuid, item_id: Uuid) -> Result<Option<VoteDirection>> {
        let events = self.events.read().await;
        Ok(first_vote(&events, user_id, item_id))
    }

    async fn record_vote(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        direction: VoteDirection,
    ) -> Result<VoteWrite> {
        let mut items = self.items.write().await;
        let mut events = self.events.write().await;

        if let Some(existing) = first_vote(&events, user_id, item_id) {
            return Ok(VoteWrite::AlreadyVoted(existing));
        }

        let item = items
            .get_mut(&item_id)
            .ok_or_else(|| DiscoveryError::validation(format!("Unknown item: {}", item_id)))?;

        events.push(InteractionEvent::new(user_id, item_id, direction.kind()));
        match direction {
            VoteDirection::Approve => item.approve_count += 1,
            VoteDirection::Disapprove => item.disapprove_count += 1,
        }

        let total_interactions = events.iter().filter(|e| e.item_id == item_id).count() as u64;
        Ok(VoteWrite::Recorded(VoteAggregates {
            item_id,
            direction,
            approve_count: item.approve_count,
            disapprove_count: item.disapprove_count,
            total_interactions,
            approval_percentage: item.approval_percentage(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn art_item(name: &str) -> Item {
        Item::new(Uuid::new_v4(), name, Some(Category::Art))
    }

    #[tokio::test]
    async fn test_catalog_reads() {
        let store = InMemoryStore::new();
        let zoo = Item::new(Uuid::new_v4(), "Zoo", Some(Category::Science));
        let gallery = art_item("Gallery");
        store.batch_insert_items(vec![zoo.clone(), gallery.clone()]).await;

        let all = store.all_items().await.unwrap();
        assert_eq!(all[0].name, "Gallery");
        assert_eq!(store.item(zoo.id).await.unwrap(), Some(zoo));
        assert!(store.item(Uuid::new_v4()).await.unwrap().is_none());
        assert_eq!(store.items_by_category(Category::Art).await.unwrap(), vec![gallery]);
        assert_eq!(
            store.categories().await.unwrap(),
            vec![Category::Art, Category::Science]
        );
    }

    #[tokio::test]
    async fn test_record_vote_once_per_pair() {
        let store = InMemoryStore::new();
        let item = art_item("Gallery");
        store.insert_item(item.clone()).await;
        let user = Uuid::new_v4();

        let first = store.record_vote(user, item.id, VoteDirection::Approve).await.unwrap();
        let VoteWrite::Recorded(aggregates) = first else {
            panic!("first vote should be recorded");
        };
        assert_eq!(aggregates.approve_count, 1);
        assert_eq!(aggregates.approval_percentage, Some(100.0));

        let second = store.record_vote(user, item.id, VoteDirection::Disapprove).await.unwrap();
        assert_eq!(second, VoteWrite::AlreadyVoted(VoteDirection::Approve));

        let stored = store.item(item.id).await.unwrap().unwrap();
        assert_eq!(stored.total_votes(), 1);
        assert_eq!(store.events_for_item(item.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_prior_vote_reports_first_direction() {
        let store = InMemoryStore::new();
        let item = art_item("Gallery");
        store.insert_item(item.clone()).await;
        let user = Uuid::new_v4();

        assert_eq!(store.prior_vote(user, item.id).await.unwrap(), None);
        store
            .append(&InteractionEvent::new(user, item.id, InteractionKind::View))
            .await
            .unwrap();
        assert_eq!(store.prior_vote(user, item.id).await.unwrap(), None);

        store.record_vote(user, item.id, VoteDirection::Disapprove).await.unwrap();
        assert_eq!(
            store.prior_vote(user, item.id).await.unwrap(),
            Some(VoteDirection::Disapprove)
        );
        assert_eq!(store.prior_vote(Uuid::new_v4(), item.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_user_keeps_history() {
        let store = InMemoryStore::new();
        let item = art_item("Gallery");
        store.insert_item(item.clone()).await;
        let user = User::new(Uuid::new_v4()).with_preferences([Category::Art]);
        store.upsert_user(&user).await.unwrap();
        store
            .append(&InteractionEvent::new(user.id, item.id, InteractionKind::View))
            .await
            .unwrap();

        assert!(store.delete_user(user.id).await.unwrap());
        assert!(store.user(user.id).await.unwrap().is_none());
        assert!(!store.delete_user(user.id).await.unwrap());
        assert_eq!(store.events_for_user(user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_record_vote_unknown_item() {
        let store = InMemoryStore::new();
        let err = store
            .record_vote(Uuid::new_v4(), Uuid::new_v4(), VoteDirection::Approve)
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(store.interaction_counts().await.unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_round_trip_keeps_events() {
        tokio_test::block_on(async {
            let store = InMemoryStore::new();
            let item = art_item("Gallery");
            store.insert_item(item.clone()).await;
            let user = User::new(Uuid::new_v4()).with_preferences([Category::Art]);
            store.upsert_user(&user).await.unwrap();
            store
                .append(&InteractionEvent::new(user.id, item.id, InteractionKind::View))
                .await
                .unwrap();

            let restored = InMemoryStore::from_snapshot(store.snapshot().await);
            assert_eq!(restored.user(user.id).await.unwrap(), Some(user.clone()));
            assert_eq!(restored.events_for_user(user.id).await.unwrap().len(), 1);
            assert_eq!(restored.interaction_counts().await.unwrap()[&item.id], 1);
        });
    }
}
