use crate::models::*;
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

/// Low-exposure items ranked by approval, then by how rarely they were seen.
///
/// With a non-empty `preferences` set only matching categories are eligible;
/// otherwise the whole catalog is. Items without votes sort as 0% approval but
/// keep `approval_percentage: None` in the output.
pub fn select_hidden_gems(
    items: Vec<Item>,
    interaction_counts: &HashMap<Uuid, u64>,
    preferences: &BTreeSet<Category>,
    max_total_interactions: u64,
    max_results: usize,
) -> Vec<HiddenGem> {
    let mut gems: Vec<HiddenGem> = items
        .into_iter()
        .filter(|item| {
            preferences.is_empty() || item.category.is_some_and(|c| preferences.contains(&c))
        })
        .filter_map(|item| {
            let total_interactions = interaction_counts.get(&item.id).copied().unwrap_or(0);
            if total_interactions >= max_total_interactions {
                return None;
            }
            let approval_percentage = item.approval_percentage();
            Some(HiddenGem {
                item,
                total_interactions,
                approval_percentage,
            })
        })
        .collect();

    gems.sort_by(|a, b| {
        let approval_a = a.approval_percentage.unwrap_or(0.0);
        let approval_b = b.approval_percentage.unwrap_or(0.0);
        approval_b
            .total_cmp(&approval_a)
            .then_with(|| a.total_interactions.cmp(&b.total_interactions))
            .then_with(|| a.item.name.cmp(&b.item.name))
    });
    gems.truncate(max_results);
    gems
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, category: Category, up: u32, down: u32) -> Item {
        Item::new(Uuid::new_v4(), name, Some(category)).with_votes(up, down)
    }

    #[test]
    fn test_threshold_excludes_busy_items() {
        let quiet = item("Quiet", Category::Art, 1, 1);
        let busy = item("Busy", Category::Art, 9, 0);
        let rare = item("Rare", Category::History, 3, 0);

        let mut counts = HashMap::new();
        counts.insert(quiet.id, 3);
        counts.insert(busy.id, 15);
        counts.insert(rare.id, 7);

        let gems = select_hidden_gems(vec![quiet, busy, rare], &counts, &BTreeSet::new(), 10, 30);
        let names: Vec<_> = gems.iter().map(|g| g.item.name.as_str()).collect();
        assert_eq!(names, vec!["Rare", "Quiet"]);
        assert!(gems.iter().all(|g| g.total_interactions < 10));
        assert_eq!(gems[0].approval_percentage, Some(100.0));
        assert_eq!(gems[1].approval_percentage, Some(50.0));
    }

    #[test]
    fn test_unvoted_items_sort_as_zero_but_report_none() {
        let unvoted = item("Alpha", Category::Science, 0, 0);
        let disliked = item("Beta", Category::Science, 0, 4);
        let mut counts = HashMap::new();
        counts.insert(unvoted.id, 2);
        counts.insert(disliked.id, 4);

        let gems = select_hidden_gems(vec![disliked, unvoted], &counts, &BTreeSet::new(), 10, 30);
        assert_eq!(gems[0].item.name, "Alpha");
        assert_eq!(gems[0].approval_percentage, None);
        assert_eq!(gems[1].approval_percentage, Some(0.0));
    }

    #[test]
    fn test_preferences_restrict_categories() {
        let art = item("Art", Category::Art, 1, 0);
        let science = item("Science", Category::Science, 1, 0);
        let uncategorized = Item::new(Uuid::new_v4(), "Unknown", None);
        let preferences: BTreeSet<Category> = [Category::Art].into_iter().collect();

        let gems = select_hidden_gems(
            vec![art, science, uncategorized],
            &HashMap::new(),
            &preferences,
            10,
            30,
        );
        assert_eq!(gems.len(), 1);
        assert_eq!(gems[0].item.name, "Art");
        assert_eq!(gems[0].total_interactions, 0);
    }

    #[test]
    fn test_ties_and_limit() {
        let b = item("B", Category::Art, 1, 0);
        let a = item("A", Category::Art, 2, 0);
        let c = item("C", Category::Art, 1, 0);
        let mut counts = HashMap::new();
        counts.insert(b.id, 1);
        counts.insert(a.id, 2);
        counts.insert(c.id, 1);

        let gems = select_hidden_gems(vec![a, b, c], &counts, &BTreeSet::new(), 10, 2);
        let names: Vec<_> = gems.iter().map(|g| g.item.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C"]);
    }
}
