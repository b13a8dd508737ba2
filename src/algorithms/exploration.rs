use crate::models::DiscoveryStyle;

const MAX_ENGAGEMENT_BUMP: f64 = 0.05;
const ENGAGEMENT_FOR_FULL_BUMP: f64 = 2000.0;
const UNSET_CAP: f64 = 0.25;

/// Share of a ranked result reserved for items outside the user's preferences.
#[derive(Debug, Clone, Copy)]
pub struct ExplorationPolicy {
    default_base: f64,
}

impl ExplorationPolicy {
    pub fn new(default_base: f64) -> Self {
        Self { default_base }
    }

    /// (base, cap) for a discovery style.
    pub fn bounds(&self, style: DiscoveryStyle) -> (f64, f64) {
        match style {
            DiscoveryStyle::Classics => (0.10, 0.15),
            DiscoveryStyle::Balanced => (0.30, 0.35),
            DiscoveryStyle::HiddenGems => (0.50, 0.55),
            DiscoveryStyle::Unset => (self.default_base, UNSET_CAP),
        }
    }

    pub fn fraction(&self, style: DiscoveryStyle, engagement_score: u64) -> f64 {
        let (base, cap) = self.bounds(style);
        let bump = (engagement_score as f64 / ENGAGEMENT_FOR_FULL_BUMP).min(MAX_ENGAGEMENT_BUMP);
        (base + bump).max(0.0).min(cap)
    }
}

impl Default for ExplorationPolicy {
    fn default() -> Self {
        Self::new(0.20)
    }
}
