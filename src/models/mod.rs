use crate::error::{DiscoveryError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Art,
    History,
    Science,
    #[serde(rename = "Local Heritage")]
    LocalHeritage,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Art,
        Category::History,
        Category::Science,
        Category::LocalHeritage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Art => "Art",
            Category::History => "History",
            Category::Science => "Science",
            Category::LocalHeritage => "Local Heritage",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DiscoveryError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '_' || c == '-' { ' ' } else { c })
            .collect();
        match normalized.as_str() {
            "art" => Ok(Category::Art),
            "history" => Ok(Category::History),
            "science" => Ok(Category::Science),
            "local heritage" => Ok(Category::LocalHeritage),
            _ => Err(DiscoveryError::validation(format!("Unknown category: {}", s.trim()))),
        }
    }
}

/// Accumulated engagement points per category.
pub type CategoryAffinity = BTreeMap<Category, u32>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Great-circle distance in kilometers (haversine).
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;

        let lat1_rad = self.latitude.to_radians();
        let lat2_rad = other.latitude.to_radians();
        let delta_lat = (other.latitude - self.latitude).to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_KM * c
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub category: Option<Category>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub popularity_score: i64,
    #[serde(default)]
    pub approve_count: u32,
    #[serde(default)]
    pub disapprove_count: u32,
    #[serde(default)]
    pub description: String,
    /// "city, region"
    #[serde(default)]
    pub location: String,
}

impl Item {
    pub fn new(id: Uuid, name: impl Into<String>, category: Option<Category>) -> Self {
        Self {
            id,
            name: name.into(),
            category,
            region: None,
            latitude: None,
            longitude: None,
            popularity_score: 0,
            approve_count: 0,
            disapprove_count: 0,
            description: String::new(),
            location: String::new(),
        }
    }

    pub fn with_popularity(mut self, score: i64) -> Self {
        self.popularity_score = score;
        self
    }

    pub fn with_location(mut self, city: &str, region: &str) -> Self {
        self.location = format!("{}, {}", city, region);
        self.region = Some(region.to_string());
        self
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn with_votes(mut self, approve_count: u32, disapprove_count: u32) -> Self {
        self.approve_count = approve_count;
        self.disapprove_count = disapprove_count;
        self
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        }
    }

    /// Leading city token of `location`, lowercased.
    pub fn city(&self) -> String {
        crate::utils::city_token(&self.location)
    }

    pub fn total_votes(&self) -> u32 {
        self.approve_count + self.disapprove_count
    }

    pub fn approval_percentage(&self) -> Option<f64> {
        crate::utils::approval_percentage(self.approve_count, self.disapprove_count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStyle {
    Classics,
    Balanced,
    HiddenGems,
    #[default]
    Unset,
}

impl DiscoveryStyle {
    /// Unrecognized labels fall back to `Unset`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "classics" => DiscoveryStyle::Classics,
            "balanced" => DiscoveryStyle::Balanced,
            "hidden_gems" | "hidden-gems" => DiscoveryStyle::HiddenGems,
            _ => DiscoveryStyle::Unset,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveryStyle::Classics => "classics",
            DiscoveryStyle::Balanced => "balanced",
            DiscoveryStyle::HiddenGems => "hidden_gems",
            DiscoveryStyle::Unset => "unset",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistancePreference {
    Nearby,
    Medium,
    FarOk,
    #[default]
    Unset,
}

impl DistancePreference {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "nearby" => DistancePreference::Nearby,
            "medium" => DistancePreference::Medium,
            "far_ok" | "far" => DistancePreference::FarOk,
            _ => DistancePreference::Unset,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DistancePreference::Nearby => "nearby",
            DistancePreference::Medium => "medium",
            DistancePreference::FarOk => "far_ok",
            DistancePreference::Unset => "unset",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub preferences: BTreeSet<Category>,
    #[serde(default)]
    pub discovery_style: DiscoveryStyle,
    #[serde(default)]
    pub distance_preference: DistancePreference,
    #[serde(default)]
    pub reference_location: Option<String>,
}

impl User {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            preferences: BTreeSet::new(),
            discovery_style: DiscoveryStyle::Unset,
            distance_preference: DistancePreference::Unset,
            reference_location: None,
        }
    }

    /// Stand-in for callers without a stored profile.
    pub fn anonymous(id: Uuid) -> Self {
        Self::new(id)
    }

    pub fn with_preferences<I: IntoIterator<Item = Category>>(mut self, preferences: I) -> Self {
        self.preferences = preferences.into_iter().collect();
        self
    }

    pub fn with_style(mut self, style: DiscoveryStyle) -> Self {
        self.discovery_style = style;
        self
    }

    pub fn with_distance(mut self, preference: DistancePreference, reference: &str) -> Self {
        self.distance_preference = preference;
        self.reference_location = Some(reference.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    View,
    DetailClick,
    DetailOpen,
    Favorite,
    WebsiteVisit,
    Approve,
    Disapprove,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::View => "view",
            InteractionKind::DetailClick => "detail_click",
            InteractionKind::DetailOpen => "detail_open",
            InteractionKind::Favorite => "favorite",
            InteractionKind::WebsiteVisit => "website_visit",
            InteractionKind::Approve => "approve",
            InteractionKind::Disapprove => "disapprove",
        }
    }

    pub fn is_vote(&self) -> bool {
        matches!(self, InteractionKind::Approve | InteractionKind::Disapprove)
    }
}

impl FromStr for InteractionKind {
    type Err = DiscoveryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "view" | "click" => Ok(InteractionKind::View),
            "detail_click" | "view-details" => Ok(InteractionKind::DetailClick),
            "detail_open" | "reading" => Ok(InteractionKind::DetailOpen),
            "favorite" => Ok(InteractionKind::Favorite),
            "website_visit" => Ok(InteractionKind::WebsiteVisit),
            "approve" | "thumbs_up" => Ok(InteractionKind::Approve),
            "disapprove" | "thumbs_down" => Ok(InteractionKind::Disapprove),
            other => Err(DiscoveryError::validation(format!(
                "Unknown interaction kind: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub item_id: Uuid,
    pub kind: InteractionKind,
    /// Seconds; only meaningful for `DetailOpen`.
    #[serde(default)]
    pub duration_secs: f64,
    pub timestamp: DateTime<Utc>,
}

impl InteractionEvent {
    pub fn new(user_id: Uuid, item_id: Uuid, kind: InteractionKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            item_id,
            kind,
            duration_secs: 0.0,
            timestamp: Utc::now(),
        }
    }

    pub fn with_duration(mut self, duration_secs: f64) -> Self {
        self.duration_secs = duration_secs;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteDirection {
    Approve,
    Disapprove,
}

impl VoteDirection {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "up" | "thumbs_up" | "approve" => Ok(VoteDirection::Approve),
            "down" | "thumbs_down" | "disapprove" => Ok(VoteDirection::Disapprove),
            _ => Err(DiscoveryError::validation("direction must be 'up' or 'down'")),
        }
    }

    pub fn kind(&self) -> InteractionKind {
        match self {
            VoteDirection::Approve => InteractionKind::Approve,
            VoteDirection::Disapprove => InteractionKind::Disapprove,
        }
    }

    pub fn from_kind(kind: InteractionKind) -> Option<Self> {
        match kind {
            InteractionKind::Approve => Some(VoteDirection::Approve),
            InteractionKind::Disapprove => Some(VoteDirection::Disapprove),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.kind().as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteAggregates {
    pub item_id: Uuid,
    pub direction: VoteDirection,
    pub approve_count: u32,
    pub disapprove_count: u32,
    pub total_interactions: u64,
    pub approval_percentage: Option<f64>,
}

/// Result of an atomic check-and-record in the vote ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum VoteWrite {
    Recorded(VoteAggregates),
    AlreadyVoted(VoteDirection),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VoteOutcome {
    #[serde(rename = "ok")]
    Recorded { aggregates: VoteAggregates },
    AlreadyVoted { existing: VoteDirection },
}

impl VoteOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, VoteOutcome::Recorded { .. })
    }
}

impl From<VoteWrite> for VoteOutcome {
    fn from(write: VoteWrite) -> Self {
        match write {
            VoteWrite::Recorded(aggregates) => VoteOutcome::Recorded { aggregates },
            VoteWrite::AlreadyVoted(existing) => VoteOutcome::AlreadyVoted { existing },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiddenGem {
    #[serde(flatten)]
    pub item: Item,
    pub total_interactions: u64,
    pub approval_percentage: Option<f64>,
}

/// Distance annotation; `Unannotated` means no reference location was available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Distance {
    #[default]
    Unannotated,
    Unknown,
    Km(u32),
}

impl Distance {
    pub fn is_unannotated(&self) -> bool {
        matches!(self, Distance::Unannotated)
    }

    pub fn km(&self) -> Option<u32> {
        match self {
            Distance::Km(km) => Some(*km),
            _ => None,
        }
    }
}

impl Serialize for Distance {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Distance::Km(km) => serializer.serialize_u32(*km),
            _ => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocatedItem {
    #[serde(flatten)]
    pub item: Item,
    #[serde(skip_serializing_if = "Distance::is_unannotated")]
    pub distance_km: Distance,
}

impl LocatedItem {
    pub fn unannotated(item: Item) -> Self {
        Self {
            item,
            distance_km: Distance::Unannotated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementLevel {
    Low,
    Medium,
    High,
}

impl EngagementLevel {
    pub fn from_score(score: u64) -> Self {
        if score >= 20 {
            EngagementLevel::High
        } else if score >= 10 {
            EngagementLevel::Medium
        } else {
            EngagementLevel::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementSummary {
    pub user_id: Uuid,
    pub engagement_score: u64,
    pub total_interactions: u64,
    pub total_duration_secs: f64,
    pub level: EngagementLevel,
}

/// Full store contents, used to seed and persist the in-memory backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub events: Vec<InteractionEvent>,
}
