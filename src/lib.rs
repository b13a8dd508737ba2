pub mod algorithms;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{DiscoveryError, Result};
pub use models::*;

use config::StorageBackend;
use services::store::{DiscoveryStore, Identity, InMemoryStore, PgStore};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use utils::metrics::{OperationStats, ServingStats};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn DiscoveryStore>,
    pub engagement_service: Arc<services::EngagementService>,
    pub discovery_service: Arc<services::DiscoveryService>,
    pub feedback_service: Arc<services::FeedbackService>,
    stats: Arc<ServingStats>,
    snapshot: Option<Arc<InMemoryStore>>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self> {
        let backend = config.storage.backend;
        match backend {
            StorageBackend::Memory => {
                let store = match config.storage.snapshot_path.as_deref() {
                    Some(path) if std::path::Path::new(path).exists() => {
                        InMemoryStore::load(path).await?
                    }
                    _ => {
                        info!("Starting with an empty in-memory store");
                        InMemoryStore::new()
                    }
                };
                Ok(Self::with_memory_store(config, Arc::new(store)))
            }
            StorageBackend::Postgres => {
                let store = PgStore::connect(&config.storage.postgres).await?;
                store.ensure_schema().await?;
                Ok(Self::with_store(config, Arc::new(store)))
            }
        }
    }

    /// Like `with_store`, but `persist` writes the store to the configured
    /// snapshot path.
    pub fn with_memory_store(config: Config, store: Arc<InMemoryStore>) -> Self {
        let mut state = Self::with_store(config, store.clone());
        state.snapshot = Some(store);
        state
    }

    pub fn with_store(config: Config, store: Arc<dyn DiscoveryStore>) -> Self {
        let config = Arc::new(config);
        let stats = Arc::new(ServingStats::new());

        let engagement_service = Arc::new(services::EngagementService::new(store.clone(), &config));

        let discovery_service = Arc::new(services::DiscoveryService::new(
            store.clone(),
            engagement_service.clone(),
            config.clone(),
            stats.clone(),
        ));

        let feedback_service =
            Arc::new(services::FeedbackService::new(store.clone(), stats.clone()));

        Self {
            config,
            store,
            engagement_service,
            discovery_service,
            feedback_service,
            stats,
            snapshot: None,
        }
    }

    /// Validates and stores a user profile.
    pub async fn save_profile(&self, user: &User) -> Result<()> {
        utils::validation::validate_user(user)?;
        self.store.upsert_user(user).await?;
        info!("Saved profile for {}", user.id);
        Ok(())
    }

    /// Deletes the stored profile so the user starts over as anonymous.
    /// Their interaction history stays.
    pub async fn reset_profile(&self, user_id: Uuid) -> Result<bool> {
        utils::validation::validate_user_id(user_id)?;
        let existed = self.store.delete_user(user_id).await?;
        info!("Reset profile for {} (existed: {})", user_id, existed);
        Ok(existed)
    }

    /// Saves the in-memory store to the snapshot path; a no-op for postgres.
    pub async fn persist(&self) -> Result<()> {
        if let (Some(store), Some(path)) = (&self.snapshot, &self.config.storage.snapshot_path) {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            store.save(path).await?;
        }
        Ok(())
    }

    pub fn serving_stats(&self) -> BTreeMap<String, OperationStats> {
        self.stats.snapshot()
    }
}

pub async fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
