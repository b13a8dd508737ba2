use crate::models::*;
use std::collections::HashMap;
use uuid::Uuid;

pub const EVENT_BASE_POINTS: u64 = 10;
pub const READING_SECONDS_PER_POINT: f64 = 30.0;
pub const MAX_READING_POINTS: u32 = 20;

/// `total_duration + 10 * event_count`, durations truncated to whole seconds.
pub fn engagement_score(events: &[InteractionEvent]) -> u64 {
    let total_secs: f64 = events.iter().map(|e| e.duration_secs.max(0.0)).sum();
    total_secs.trunc() as u64 + EVENT_BASE_POINTS * events.len() as u64
}

pub fn engagement_summary(user_id: Uuid, events: &[InteractionEvent]) -> EngagementSummary {
    let score = engagement_score(events);
    EngagementSummary {
        user_id,
        engagement_score: score,
        total_interactions: events.len() as u64,
        total_duration_secs: events.iter().map(|e| e.duration_secs.max(0.0)).sum(),
        level: EngagementLevel::from_score(score),
    }
}

pub fn interaction_points(kind: InteractionKind, duration_secs: f64) -> u32 {
    match kind {
        InteractionKind::View | InteractionKind::DetailClick => 1,
        InteractionKind::DetailOpen => {
            let reading = (duration_secs.max(0.0) / READING_SECONDS_PER_POINT).floor() as u32;
            2 + reading.min(MAX_READING_POINTS)
        }
        InteractionKind::Favorite | InteractionKind::WebsiteVisit | InteractionKind::Approve => 3,
        // default weight
        InteractionKind::Disapprove => 1,
    }
}

/// Sum of interaction points per category; events on uncategorized or unknown items are skipped.
pub fn category_affinity(
    events: &[InteractionEvent],
    categories: &HashMap<Uuid, Option<Category>>,
) -> CategoryAffinity {
    let mut by_category = CategoryAffinity::new();
    for event in events {
        let Some(Some(category)) = categories.get(&event.item_id) else {
            continue;
        };
        *by_category.entry(*category).or_insert(0) +=
            interaction_points(event.kind, event.duration_secs);
    }
    by_category
}

/// The `n` strongest categories, ties broken by category name.
pub fn top_categories(affinity: &CategoryAffinity, n: usize) -> Vec<Category> {
    let mut ranked: Vec<(Category, u32)> = affinity.iter().map(|(c, s)| (*c, *s)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
    ranked.into_iter().take(n).map(|(c, _)| c).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(item_id: Uuid, kind: InteractionKind, secs: f64) -> InteractionEvent {
        InteractionEvent::new(Uuid::new_v4(), item_id, kind).with_duration(secs)
    }

    #[test]
    fn test_engagement_score() {
        let item = Uuid::new_v4();
        let events = vec![
            event(item, InteractionKind::View, 0.0),
            event(item, InteractionKind::DetailOpen, 45.7),
            event(item, InteractionKind::DetailOpen, 20.5),
        ];
        // floor(66.2) + 3 * 10
        assert_eq!(engagement_score(&events), 96);
        assert_eq!(engagement_score(&[]), 0);
    }

    #[test]
    fn test_interaction_points() {
        assert_eq!(interaction_points(InteractionKind::View, 0.0), 1);
        assert_eq!(interaction_points(InteractionKind::DetailClick, 0.0), 1);
        assert_eq!(interaction_points(InteractionKind::DetailOpen, 29.0), 2);
        assert_eq!(interaction_points(InteractionKind::DetailOpen, 95.0), 5);
        assert_eq!(interaction_points(InteractionKind::DetailOpen, 10_000.0), 22);
        assert_eq!(interaction_points(InteractionKind::Favorite, 0.0), 3);
        assert_eq!(interaction_points(InteractionKind::Approve, 0.0), 3);
        assert_eq!(interaction_points(InteractionKind::Disapprove, 0.0), 1);
    }

    #[test]
    fn test_category_affinity_skips_uncategorized() {
        let art = Uuid::new_v4();
        let bare = Uuid::new_v4();
        let mut categories = HashMap::new();
        categories.insert(art, Some(Category::Art));
        categories.insert(bare, None);

        let events = vec![
            event(art, InteractionKind::Favorite, 0.0),
            event(art, InteractionKind::DetailOpen, 60.0),
            event(bare, InteractionKind::Favorite, 0.0),
            event(Uuid::new_v4(), InteractionKind::Favorite, 0.0),
        ];
        let affinity = category_affinity(&events, &categories);
        assert_eq!(affinity.len(), 1);
        assert_eq!(affinity[&Category::Art], 7);
    }

    #[test]
    fn test_top_categories_tie_break() {
        let mut affinity = CategoryAffinity::new();
        affinity.insert(Category::Science, 4);
        affinity.insert(Category::History, 4);
        affinity.insert(Category::Art, 9);
        affinity.insert(Category::LocalHeritage, 1);
        assert_eq!(
            top_categories(&affinity, 2),
            vec![Category::Art, Category::History]
        );
    }
}
