use crate::algorithms::adaptation::{ActiveSettings, AdaptationContext};
use crate::algorithms::distance::{annotate_and_filter, DistanceBands};
use crate::algorithms::hidden_gems::select_hidden_gems;
use crate::algorithms::similarity;
use crate::algorithms::{DiscoveryRanker, RankMode};
use crate::config::Config;
use crate::error::Result;
use crate::models::*;
use crate::services::engagement::EngagementService;
use crate::services::store::{Catalog, DiscoveryStore, EventLog, Identity};
use crate::utils::metrics::ServingStats;
use crate::utils::validation::{validate_item_id, validate_user_id};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

/// A bounded ranking sized and presented for the visitor's session.
#[derive(Debug, Clone, Serialize)]
pub struct AdaptedRanking {
    pub settings: ActiveSettings,
    pub adaptation_log: Option<String>,
    pub items: Vec<LocatedItem>,
}

pub struct DiscoveryService {
    store: Arc<dyn DiscoveryStore>,
    engagement: Arc<EngagementService>,
    config: Arc<Config>,
    ranker: DiscoveryRanker,
    bands: DistanceBands,
    stats: Arc<ServingStats>,
}

impl DiscoveryService {
    pub fn new(
        store: Arc<dyn DiscoveryStore>,
        engagement: Arc<EngagementService>,
        config: Arc<Config>,
        stats: Arc<ServingStats>,
    ) -> Self {
        Self {
            ranker: DiscoveryRanker::from_config(&config.discovery),
            bands: DistanceBands::from(&config.distance),
            store,
            engagement,
            config,
            stats,
        }
    }

    /// Personalized ordering, then the user's distance band. `None` ranks the
    /// whole catalog.
    pub async fn rank_for_user(
        &self,
        user_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<LocatedItem>> {
        self.timed("rank_for_user", self.rank(user_id, limit)).await
    }

    pub fn active_settings(&self, context: &AdaptationContext) -> ActiveSettings {
        ActiveSettings::for_context(context, self.config.discovery.default_limit)
    }

    /// Bounded ranking whose size comes from the session's active settings.
    pub async fn rank_in_context(
        &self,
        user_id: Uuid,
        context: &AdaptationContext,
    ) -> Result<AdaptedRanking> {
        let settings = self.active_settings(context);
        let adaptation_log = settings.log_message();
        if let Some(message) = &adaptation_log {
            info!("{} ({})", message, user_id);
        }

        let items = self
            .timed("rank_for_user", self.rank(user_id, Some(settings.max_results)))
            .await?;
        Ok(AdaptedRanking {
            settings,
            adaptation_log,
            items,
        })
    }

    pub async fn hidden_gems(
        &self,
        user_id: Option<Uuid>,
        limit: Option<usize>,
    ) -> Result<Vec<HiddenGem>> {
        self.timed("hidden_gems", self.gems(user_id, limit)).await
    }

    pub async fn similar_items(&self, item_id: Uuid, limit: Option<usize>) -> Result<Vec<Item>> {
        self.timed("similar_items", self.similar(item_id, limit)).await
    }

    /// Annotates distances from the user's reference location and keeps the
    /// items their band admits. `bands` overrides the configured thresholds.
    pub async fn annotate_and_filter_by_distance(
        &self,
        user_id: Uuid,
        items: Vec<Item>,
        bands: Option<&DistanceBands>,
    ) -> Result<Vec<LocatedItem>> {
        validate_user_id(user_id)?;
        let user = self.user_or_anonymous(user_id).await?;
        Ok(self.apply_distance(&user, items, bands.unwrap_or(&self.bands)))
    }

    pub async fn items_by_category(&self, category: Category) -> Result<Vec<Item>> {
        let mut items = self.store.items_by_category(category).await?;
        crate::algorithms::sort_by_popularity(&mut items);
        Ok(items)
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        self.store.categories().await
    }

    async fn rank(&self, user_id: Uuid, limit: Option<usize>) -> Result<Vec<LocatedItem>> {
        validate_user_id(user_id)?;
        let user = self.user_or_anonymous(user_id).await?;
        let items = self.store.all_items().await?;
        let signals = self.engagement.signals(user_id, &items).await?;

        let preferences =
            DiscoveryRanker::effective_preferences(&user.preferences, &signals.affinity);
        let exploration = self
            .engagement
            .exploration(user.discovery_style, signals.engagement_score);
        debug!(
            "Ranking {} items for {} (preferences={:?}, exploration={:.2})",
            items.len(),
            user_id,
            preferences,
            exploration
        );

        let ranked = self.ranker.rank(
            items,
            &preferences,
            &signals.affinity,
            exploration,
            RankMode::from_limit(limit),
        );
        Ok(self.apply_distance(&user, ranked, &self.bands))
    }

    async fn gems(&self, user_id: Option<Uuid>, limit: Option<usize>) -> Result<Vec<HiddenGem>> {
        let preferences = match user_id {
            Some(id) => {
                validate_user_id(id)?;
                self.user_or_anonymous(id).await?.preferences
            }
            None => Default::default(),
        };

        let items = self.store.all_items().await?;
        let counts = self.store.interaction_counts().await?;
        let settings = &self.config.hidden_gems;

        Ok(select_hidden_gems(
            items,
            &counts,
            &preferences,
            settings.max_total_interactions,
            limit.unwrap_or(settings.max_results),
        ))
    }

    async fn similar(&self, item_id: Uuid, limit: Option<usize>) -> Result<Vec<Item>> {
        validate_item_id(item_id)?;
        let Some(source) = self.store.item(item_id).await? else {
            return Ok(Vec::new());
        };
        let Some(category) = source.category else {
            return Ok(Vec::new());
        };

        let candidates = self.store.items_by_category(category).await?;
        let k = limit.unwrap_or(self.config.similarity.max_results);
        Ok(similarity::similar_items(&source, candidates, k))
    }

    async fn user_or_anonymous(&self, user_id: Uuid) -> Result<User> {
        Ok(self
            .store
            .user(user_id)
            .await?
            .unwrap_or_else(|| User::anonymous(user_id)))
    }

    fn apply_distance(
        &self,
        user: &User,
        items: Vec<Item>,
        bands: &DistanceBands,
    ) -> Vec<LocatedItem> {
        let origin = user
            .reference_location
            .as_deref()
            .and_then(|key| self.config.distance.reference_location(key));
        annotate_and_filter(items, origin, user.distance_preference, bands)
    }

    async fn timed<T, F>(&self, operation: &'static str, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let start = Instant::now();
        let result = work.await;
        self.stats.record(operation, start.elapsed(), result.is_ok());
        result
    }
}
