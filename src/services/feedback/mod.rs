use crate::error::{DiscoveryError, Result};
use crate::models::*;
use crate::services::store::{Catalog, DiscoveryStore, EventLog, VoteLedger};
use crate::utils::metrics::ServingStats;
use crate::utils::validation::{validate_item_id, validate_tracked_interaction, validate_user_id};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

/// Write side: votes and tracked interactions.
pub struct FeedbackService {
    store: Arc<dyn DiscoveryStore>,
    stats: Arc<ServingStats>,
}

impl FeedbackService {
    pub fn new(store: Arc<dyn DiscoveryStore>, stats: Arc<ServingStats>) -> Self {
        Self { store, stats }
    }

    /// One vote per (user, item). A repeat returns `AlreadyVoted` with the
    /// first direction and leaves every counter untouched.
    pub async fn submit_vote(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        direction: &str,
    ) -> Result<VoteOutcome> {
        let start = Instant::now();
        let result = self.vote(user_id, item_id, direction).await;
        self.stats.record("submit_vote", start.elapsed(), result.is_ok());
        result
    }

    pub async fn track_interaction(&self, event: &InteractionEvent) -> Result<()> {
        let start = Instant::now();
        let result = self.track(event).await;
        self.stats.record("track_interaction", start.elapsed(), result.is_ok());
        result
    }

    async fn vote(&self, user_id: Uuid, item_id: Uuid, direction: &str) -> Result<VoteOutcome> {
        let direction = VoteDirection::parse(direction)?;
        validate_user_id(user_id)?;
        validate_item_id(item_id)?;

        let outcome = match self.store.prior_vote(user_id, item_id).await? {
            Some(existing) => VoteOutcome::AlreadyVoted { existing },
            None => VoteOutcome::from(self.store.record_vote(user_id, item_id, direction).await?),
        };
        match &outcome {
            VoteOutcome::Recorded { aggregates } => info!(
                "Recorded {} vote on {} by {} ({} up / {} down)",
                direction.as_str(),
                item_id,
                user_id,
                aggregates.approve_count,
                aggregates.disapprove_count
            ),
            VoteOutcome::AlreadyVoted { existing } => info!(
                "Ignored duplicate vote on {} by {} (existing: {})",
                item_id,
                user_id,
                existing.as_str()
            ),
        }
        Ok(outcome)
    }

    async fn track(&self, event: &InteractionEvent) -> Result<()> {
        validate_tracked_interaction(event)?;
        if self.store.item(event.item_id).await?.is_none() {
            return Err(DiscoveryError::validation(format!("Unknown item: {}", event.item_id)));
        }

        self.store.append(event).await?;
        info!(
            "Tracked {} on {} by {}",
            event.kind.as_str(),
            event.item_id,
            event.user_id
        );
        Ok(())
    }
}
