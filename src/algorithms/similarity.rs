use super::by_popularity;
use crate::models::Item;

/// Up to `k` items related to `source`: same category and city first, then
/// same category anywhere. The source itself is never returned.
pub fn similar_items(source: &Item, catalog: Vec<Item>, k: usize) -> Vec<Item> {
    let Some(category) = source.category else {
        return Vec::new();
    };
    let source_city = source.city();

    let (mut same_city, mut same_category): (Vec<Item>, Vec<Item>) = catalog
        .into_iter()
        .filter(|item| item.id != source.id && item.category == Some(category))
        .partition(|item| !source_city.is_empty() && item.city() == source_city);

    same_city.sort_by(by_popularity);
    if same_city.len() >= k {
        same_city.truncate(k);
        return same_city;
    }

    let remaining = k - same_city.len();
    same_category.sort_by(by_popularity);
    same_city.extend(same_category.into_iter().take(remaining));
    same_city
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use uuid::Uuid;

    fn item(name: &str, category: Category, city: &str, popularity: i64) -> Item {
        Item::new(Uuid::new_v4(), name, Some(category))
            .with_location(city, "Auvergne-Rhône-Alpes")
            .with_popularity(popularity)
    }

    fn names(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn test_same_city_ranks_before_backfill() {
        let source = item("Source", Category::Art, "Lyon", 50);
        let catalog = vec![
            source.clone(),
            item("Far Famous", Category::Art, "Grenoble", 999),
            item("Local Small", Category::Art, "lyon ", 1),
            item("Local Big", Category::Art, "Lyon", 40),
            item("Other Theme", Category::History, "Lyon", 500),
        ];
        let similar = similar_items(&source, catalog, 3);
        assert_eq!(names(&similar), vec!["Local Big", "Local Small", "Far Famous"]);
    }

    #[test]
    fn test_strict_matches_fill_k() {
        let source = item("Source", Category::Science, "Grenoble", 1);
        let catalog = vec![
            source.clone(),
            item("G1", Category::Science, "Grenoble", 3),
            item("G2", Category::Science, "Grenoble", 3),
            item("Lyon Lab", Category::Science, "Lyon", 100),
        ];
        let similar = similar_items(&source, catalog, 2);
        assert_eq!(names(&similar), vec!["G1", "G2"]);
    }

    #[test]
    fn test_never_returns_source_or_duplicates() {
        let source = item("Source", Category::History, "Lyon", 10);
        let catalog = vec![source.clone(), item("Twin", Category::History, "Lyon", 10)];
        let similar = similar_items(&source, catalog, 5);
        assert_eq!(names(&similar), vec!["Twin"]);
    }

    #[test]
    fn test_uncategorized_source_has_no_matches() {
        let source = Item::new(Uuid::new_v4(), "Mystery", None);
        let catalog = vec![item("Any", Category::Art, "Lyon", 1)];
        assert!(similar_items(&source, catalog, 3).is_empty());
    }

    #[test]
    fn test_source_without_city_only_backfills() {
        let source = Item::new(Uuid::new_v4(), "Nowhere", Some(Category::Art));
        let mut blank = Item::new(Uuid::new_v4(), "Blank", Some(Category::Art)).with_popularity(1);
        blank.location = String::new();
        let catalog = vec![blank, item("Placed", Category::Art, "Lyon", 5)];
        let similar = similar_items(&source, catalog, 3);
        assert_eq!(names(&similar), vec!["Placed", "Blank"]);
    }
}
