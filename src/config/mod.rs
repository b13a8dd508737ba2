use crate::error::{DiscoveryError, Result};
use crate::models::Coordinates;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub discovery: DiscoveryConfig,
    pub hidden_gems: HiddenGemsConfig,
    pub similarity: SimilarityConfig,
    pub distance: DistanceConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub snapshot_path: Option<String>,
    pub postgres: PostgresConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Exploration base for users who never declared a discovery style.
    pub default_exploration: f64,
    pub front_window: usize,
    pub min_step: usize,
    pub min_exploration: f64,
    pub default_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HiddenGemsConfig {
    pub max_total_interactions: u64,
    pub max_results: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityConfig {
    pub max_results: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistanceConfig {
    pub nearby_km: u32,
    pub medium_km: u32,
    pub reference_locations: BTreeMap<String, Coordinates>,
}

impl DistanceConfig {
    pub fn reference_location(&self, key: &str) -> Option<Coordinates> {
        let wanted = key.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.reference_locations
            .iter()
            .find(|(name, _)| name.to_lowercase() == wanted)
            .map(|(_, coords)| *coords)
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut reference_locations = BTreeMap::new();
        reference_locations.insert("Lyon".to_string(), Coordinates::new(45.7640, 4.8357));
        reference_locations.insert(
            "Clermont-Ferrand".to_string(),
            Coordinates::new(45.7772, 3.0870),
        );
        reference_locations.insert("Saint-Etienne".to_string(), Coordinates::new(45.4397, 4.3872));
        reference_locations.insert("Grenoble".to_string(), Coordinates::new(45.1885, 5.7245));

        Self {
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                snapshot_path: None,
                postgres: PostgresConfig {
                    url: "postgresql://localhost:5432/discovery".to_string(),
                    max_connections: 10,
                },
            },
            discovery: DiscoveryConfig {
                default_exploration: 0.20,
                front_window: 40,
                min_step: 4,
                min_exploration: 0.05,
                default_limit: 12,
            },
            hidden_gems: HiddenGemsConfig {
                max_total_interactions: 10,
                max_results: 30,
            },
            similarity: SimilarityConfig { max_results: 3 },
            distance: DistanceConfig {
                nearby_km: 20,
                medium_km: 50,
                reference_locations,
            },
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("DISCOVERY").separator("__"))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would make the ranker or the bands meaningless.
    pub fn validate(&self) -> Result<()> {
        let discovery = &self.discovery;
        if discovery.min_step == 0 {
            return Err(DiscoveryError::Config("discovery.min_step must be at least 1".into()));
        }
        if !discovery.min_exploration.is_finite() || discovery.min_exploration <= 0.0 {
            return Err(DiscoveryError::Config(format!(
                "discovery.min_exploration must be positive, got {}",
                discovery.min_exploration
            )));
        }
        if !(0.0..=1.0).contains(&discovery.default_exploration) {
            return Err(DiscoveryError::Config(format!(
                "discovery.default_exploration must be within [0, 1], got {}",
                discovery.default_exploration
            )));
        }
        if self.distance.nearby_km > self.distance.medium_km {
            return Err(DiscoveryError::Config(format!(
                "distance.nearby_km ({}) exceeds distance.medium_km ({})",
                self.distance.nearby_km, self.distance.medium_km
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_location_lookup_is_case_insensitive() {
        let config = Config::default();
        let lyon = config.distance.reference_location("  lyon ").unwrap();
        assert!((lyon.latitude - 45.7640).abs() < 1e-9);
        assert!(config.distance.reference_location("").is_none());
        assert!(config.distance.reference_location("Paris").is_none());
    }

    #[test]
    fn test_default_bands() {
        let config = Config::default();
        assert_eq!(config.distance.nearby_km, 20);
        assert_eq!(config.distance.medium_km, 50);
        assert_eq!(config.hidden_gems.max_total_interactions, 10);
    }

    #[test]
    fn test_validate_rejects_degenerate_stride_settings() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.discovery.min_step = 0;
        assert!(matches!(config.validate(), Err(DiscoveryError::Config(_))));

        let mut config = Config::default();
        config.discovery.min_exploration = 0.0;
        assert!(config.validate().is_err());
        config.discovery.min_exploration = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.distance.nearby_km = 80;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_validates() {
        let path = std::env::temp_dir().join(format!("discovery-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[discovery]\nmin_step = 0\n").unwrap();
        let result = Config::from_file(path.to_str().unwrap());
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(DiscoveryError::Config(_))));
    }
}
