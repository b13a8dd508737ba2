use crate::algorithms::{affinity, ExplorationPolicy};
use crate::config::Config;
use crate::error::Result;
use crate::models::*;
use crate::services::store::{Catalog, DiscoveryStore, EventLog};
use crate::utils::validation::validate_user_id;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Behavioral signals derived from one user's interaction history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserSignals {
    pub engagement_score: u64,
    pub affinity: CategoryAffinity,
}

pub struct EngagementService {
    store: Arc<dyn DiscoveryStore>,
    policy: ExplorationPolicy,
}

impl EngagementService {
    pub fn new(store: Arc<dyn DiscoveryStore>, config: &Config) -> Self {
        Self {
            store,
            policy: ExplorationPolicy::new(config.discovery.default_exploration),
        }
    }

    pub async fn engagement_for_user(&self, user_id: Uuid) -> Result<EngagementSummary> {
        validate_user_id(user_id)?;
        let events = self.store.events_for_user(user_id).await?;
        Ok(affinity::engagement_summary(user_id, &events))
    }

    pub async fn category_affinity(&self, user_id: Uuid) -> Result<CategoryAffinity> {
        validate_user_id(user_id)?;
        let items = self.store.all_items().await?;
        Ok(self.signals(user_id, &items).await?.affinity)
    }

    /// Engagement and category affinity, joined against an already loaded catalog.
    pub async fn signals(&self, user_id: Uuid, catalog: &[Item]) -> Result<UserSignals> {
        let events = self.store.events_for_user(user_id).await?;
        let categories: HashMap<Uuid, Option<Category>> =
            catalog.iter().map(|item| (item.id, item.category)).collect();

        let signals = UserSignals {
            engagement_score: affinity::engagement_score(&events),
            affinity: affinity::category_affinity(&events, &categories),
        };
        debug!(
            "User {} engagement={} affinity={:?}",
            user_id, signals.engagement_score, signals.affinity
        );
        Ok(signals)
    }

    pub fn exploration(&self, style: DiscoveryStyle, engagement_score: u64) -> f64 {
        self.policy.fraction(style, engagement_score)
    }
}
