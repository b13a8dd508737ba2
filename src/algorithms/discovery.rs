use super::affinity::top_categories;
use super::sort_by_popularity;
use crate::config::DiscoveryConfig;
use crate::models::*;
use crate::utils::round_to_count;
use std::collections::BTreeSet;

/// How many dynamic categories are promoted into the preference set.
pub const PROMOTED_CATEGORIES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankMode {
    /// At most `n` items, with a reserved exploration share.
    Bounded(usize),
    /// Every item, exploration interleaved into the front window.
    Full,
}

impl RankMode {
    pub fn from_limit(limit: Option<usize>) -> Self {
        match limit {
            Some(n) => RankMode::Bounded(n),
            None => RankMode::Full,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiscoveryRanker {
    front_window: usize,
    min_step: usize,
    min_exploration: f64,
}

impl Default for DiscoveryRanker {
    fn default() -> Self {
        Self {
            front_window: 40,
            min_step: 4,
            min_exploration: 0.05,
        }
    }
}

impl DiscoveryRanker {
    pub fn new(front_window: usize, min_step: usize, min_exploration: f64) -> Self {
        Self {
            front_window,
            min_step,
            min_exploration,
        }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(config.front_window, config.min_step, config.min_exploration)
    }

    /// Declared categories plus the strongest observed ones.
    pub fn effective_preferences(
        declared: &BTreeSet<Category>,
        affinity: &CategoryAffinity,
    ) -> BTreeSet<Category> {
        let mut preferred = declared.clone();
        preferred.extend(top_categories(affinity, PROMOTED_CATEGORIES));
        preferred
    }

    /// Every `stride`-th slot of the front window goes to an exploration item.
    pub fn stride(&self, exploration: f64) -> usize {
        let step = round_to_count(1.0 / exploration.max(self.min_exploration));
        step.max(self.min_step).max(1)
    }

    pub fn rank(
        &self,
        mut items: Vec<Item>,
        preferences: &BTreeSet<Category>,
        affinity: &CategoryAffinity,
        exploration: f64,
        mode: RankMode,
    ) -> Vec<Item> {
        if preferences.is_empty() {
            sort_by_popularity(&mut items);
            if let RankMode::Bounded(limit) = mode {
                items.truncate(limit);
            }
            return items;
        }

        let (matched, others) = partition(items, preferences, affinity);
        match mode {
            RankMode::Bounded(limit) => blend_bounded(matched, others, limit, exploration),
            RankMode::Full => self.interleave(matched, others, exploration),
        }
    }

    fn interleave(&self, matched: Vec<Item>, others: Vec<Item>, exploration: f64) -> Vec<Item> {
        let total = matched.len() + others.len();
        if total == 0 {
            return Vec::new();
        }

        let front_n = self.front_window.min(total);
        let step = self.stride(exploration);

        let mut matched = matched.into_iter().peekable();
        let mut others = others.into_iter().peekable();
        let mut result = Vec::with_capacity(total);

        while result.len() < front_n {
            let position = result.len();
            let next = if (position + 1) % step == 0 && others.peek().is_some() {
                others.next()
            } else {
                matched.next().or_else(|| others.next())
            };
            match next {
                Some(item) => result.push(item),
                None => break,
            }
        }

        result.extend(matched);
        result.extend(others);
        result
    }
}

fn partition(
    items: Vec<Item>,
    preferences: &BTreeSet<Category>,
    affinity: &CategoryAffinity,
) -> (Vec<Item>, Vec<Item>) {
    let (mut matched, mut others): (Vec<Item>, Vec<Item>) = items
        .into_iter()
        .partition(|item| item.category.is_some_and(|c| preferences.contains(&c)));

    let dynamic_score = |item: &Item| {
        item.category
            .and_then(|c| affinity.get(&c).copied())
            .unwrap_or(0)
    };
    let order = |a: &Item, b: &Item| {
        dynamic_score(b)
            .cmp(&dynamic_score(a))
            .then_with(|| super::by_popularity(a, b))
    };
    matched.sort_by(&order);
    others.sort_by(&order);

    (matched, others)
}

fn blend_bounded(
    matched: Vec<Item>,
    others: Vec<Item>,
    limit: usize,
    exploration: f64,
) -> Vec<Item> {
    let reserved = round_to_count(limit as f64 * exploration).max(1);
    let n_matched = matched.len().min(limit.saturating_sub(reserved));
    let n_explore = others.len().min(limit - n_matched);

    let mut result: Vec<Item> = matched.into_iter().take(n_matched).collect();
    result.extend(others.into_iter().take(n_explore));
    result.truncate(limit);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn item(name: &str, category: Category, popularity: i64) -> Item {
        Item::new(Uuid::new_v4(), name, Some(category)).with_popularity(popularity)
    }

    fn names(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    fn prefs(categories: &[Category]) -> BTreeSet<Category> {
        categories.iter().copied().collect()
    }

    /// Ranks without any observed affinity.
    fn rank_plain(
        ranker: &DiscoveryRanker,
        items: Vec<Item>,
        preferred: &[Category],
        exploration: f64,
        mode: RankMode,
    ) -> Vec<Item> {
        ranker.rank(items, &prefs(preferred), &CategoryAffinity::new(), exploration, mode)
    }

    #[test]
    fn test_empty_preferences_sort_by_popularity() {
        let ranker = DiscoveryRanker::default();
        let items = vec![
            item("B", Category::Art, 5),
            item("A", Category::History, 5),
            item("C", Category::Science, 9),
        ];
        let full = rank_plain(&ranker, items.clone(), &[], 0.2, RankMode::Full);
        assert_eq!(names(&full), vec!["C", "A", "B"]);

        let bounded = rank_plain(&ranker, items, &[], 0.2, RankMode::Bounded(2));
        assert_eq!(names(&bounded), vec!["C", "A"]);
    }

    #[test]
    fn test_bounded_reserves_exploration_slot() {
        let ranker = DiscoveryRanker::default();
        let items = vec![
            item("A", Category::Art, 10),
            item("B", Category::Art, 5),
            item("C", Category::History, 20),
        ];
        let ranked = rank_plain(&ranker, items, &[Category::Art], 0.2, RankMode::Bounded(3));
        assert_eq!(names(&ranked), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_bounded_backfills_when_one_side_runs_short() {
        let ranker = DiscoveryRanker::default();
        let items = vec![
            item("A1", Category::Art, 3),
            item("H1", Category::History, 9),
            item("H2", Category::History, 8),
            item("H3", Category::History, 7),
        ];
        // one matched item, explore fills the rest
        let ranked = rank_plain(&ranker, items, &[Category::Art], 0.1, RankMode::Bounded(3));
        assert_eq!(names(&ranked), vec!["A1", "H1", "H2"]);

        // reserved slots stay empty when nothing outside the preferences exists
        let art_only: Vec<Item> = (0..5)
            .map(|i| item(&format!("A{}", i), Category::Art, i))
            .collect();
        let ranked = rank_plain(&ranker, art_only, &[Category::Art], 0.5, RankMode::Bounded(3));
        assert_eq!(names(&ranked), vec!["A4"]);
    }

    #[test]
    fn test_bounded_zero_limit_and_empty_catalog() {
        let ranker = DiscoveryRanker::default();
        let items = vec![item("A", Category::Art, 1)];
        assert!(rank_plain(&ranker, items, &[Category::Art], 0.3, RankMode::Bounded(0)).is_empty());
        assert!(rank_plain(&ranker, Vec::new(), &[Category::Art], 0.3, RankMode::Full).is_empty());
        assert!(rank_plain(&ranker, Vec::new(), &[], 0.3, RankMode::Bounded(5)).is_empty());
    }

    #[test]
    fn test_affinity_orders_within_partitions() {
        let ranker = DiscoveryRanker::default();
        let mut affinity = CategoryAffinity::new();
        affinity.insert(Category::History, 12);
        affinity.insert(Category::Art, 3);

        let items = vec![
            item("Art Hall", Category::Art, 50),
            item("Old Fort", Category::History, 1),
            item("Lab", Category::Science, 99),
            item("Farm", Category::LocalHeritage, 5),
        ];
        let ranked = ranker.rank(
            items,
            &prefs(&[Category::Art, Category::History]),
            &affinity,
            0.0,
            RankMode::Full,
        );
        assert_eq!(names(&ranked), vec!["Old Fort", "Art Hall", "Lab", "Farm"]);
    }

    #[test]
    fn test_effective_preferences_promote_top_two() {
        let mut affinity = CategoryAffinity::new();
        affinity.insert(Category::Science, 8);
        affinity.insert(Category::History, 5);
        affinity.insert(Category::LocalHeritage, 2);

        let effective = DiscoveryRanker::effective_preferences(&prefs(&[Category::Art]), &affinity);
        assert_eq!(
            effective,
            prefs(&[Category::Art, Category::Science, Category::History])
        );

        let from_nothing =
            DiscoveryRanker::effective_preferences(&BTreeSet::new(), &CategoryAffinity::new());
        assert!(from_nothing.is_empty());
    }

    #[test]
    fn test_stride() {
        let ranker = DiscoveryRanker::default();
        assert_eq!(ranker.stride(0.2), 5);
        assert_eq!(ranker.stride(0.1), 10);
        assert_eq!(ranker.stride(0.5), 4);
        assert_eq!(ranker.stride(0.0), 20);
        assert_eq!(ranker.stride(0.35), 4);
    }

    #[test]
    fn test_stride_never_zero() {
        // 1 / 3.0 rounds to 0 and nothing lifts it
        let ranker = DiscoveryRanker::new(40, 0, 3.0);
        assert_eq!(ranker.stride(0.2), 1);
        assert_eq!(DiscoveryRanker::new(40, 0, 0.0).stride(0.0), 1);

        let items = vec![
            item("M0", Category::Art, 10),
            item("M1", Category::Art, 9),
            item("O0", Category::History, 10),
        ];
        let ranked = rank_plain(&ranker, items, &[Category::Art], 0.2, RankMode::Full);
        assert_eq!(names(&ranked), vec!["O0", "M0", "M1"]);
    }

    #[test]
    fn test_full_mode_interleaves_every_step() {
        let ranker = DiscoveryRanker::default();
        let mut items: Vec<Item> = (0..8)
            .map(|i| item(&format!("M{}", i), Category::Art, 100 - i))
            .collect();
        items.extend((0..3).map(|i| item(&format!("O{}", i), Category::Science, 100 - i)));

        // exploration 0.2 -> step 5: positions 4 and 9 are exploration slots
        let ranked = rank_plain(&ranker, items, &[Category::Art], 0.2, RankMode::Full);
        assert_eq!(
            names(&ranked),
            vec!["M0", "M1", "M2", "M3", "O0", "M4", "M5", "M6", "M7", "O1", "O2"]
        );
    }

    #[test]
    fn test_full_mode_front_window_then_remaining_matched_first() {
        let ranker = DiscoveryRanker::new(6, 4, 0.05);
        let mut items: Vec<Item> = (0..6)
            .map(|i| item(&format!("M{}", i), Category::Art, 100 - i))
            .collect();
        items.extend((0..4).map(|i| item(&format!("O{}", i), Category::History, 100 - i)));

        // step 4, window 6: slot 3 is exploration; leftovers matched then others
        let ranked = rank_plain(&ranker, items, &[Category::Art], 0.25, RankMode::Full);
        assert_eq!(
            names(&ranked),
            vec!["M0", "M1", "M2", "O0", "M3", "M4", "M5", "O1", "O2", "O3"]
        );
    }

    #[test]
    fn test_full_mode_falls_back_when_a_side_is_exhausted() {
        let ranker = DiscoveryRanker::default();
        let items = vec![
            item("M0", Category::Art, 10),
            item("O0", Category::History, 10),
            item("O1", Category::History, 9),
            item("O2", Category::History, 8),
            item("O3", Category::History, 7),
        ];
        let ranked = rank_plain(&ranker, items, &[Category::Art], 0.25, RankMode::Full);
        assert_eq!(names(&ranked), vec!["M0", "O0", "O1", "O2", "O3"]);
    }
}
