pub mod adaptation;
pub mod affinity;
pub mod discovery;
pub mod distance;
pub mod exploration;
pub mod hidden_gems;
pub mod similarity;

pub use adaptation::{ActiveSettings, AdaptationContext};
pub use discovery::{DiscoveryRanker, RankMode};
pub use exploration::ExplorationPolicy;

use crate::models::Item;
use std::cmp::Ordering;

/// Popularity descending, then name ascending.
pub fn by_popularity(a: &Item, b: &Item) -> Ordering {
    b.popularity_score
        .cmp(&a.popularity_score)
        .then_with(|| a.name.cmp(&b.name))
}

pub fn sort_by_popularity(items: &mut [Item]) {
    items.sort_by(by_popularity);
}
