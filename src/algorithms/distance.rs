use crate::config::DistanceConfig;
use crate::models::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistanceBands {
    /// `nearby` keeps distances strictly below this.
    pub nearby_km: u32,
    /// `medium` keeps distances up to and including this.
    pub medium_km: u32,
}

impl Default for DistanceBands {
    fn default() -> Self {
        Self {
            nearby_km: 20,
            medium_km: 50,
        }
    }
}

impl From<&DistanceConfig> for DistanceBands {
    fn from(config: &DistanceConfig) -> Self {
        Self {
            nearby_km: config.nearby_km,
            medium_km: config.medium_km,
        }
    }
}

impl DistanceBands {
    pub fn admits(&self, preference: DistancePreference, distance: Distance) -> bool {
        match preference {
            DistancePreference::Unset => true,
            DistancePreference::Nearby => distance.km().is_some_and(|km| km < self.nearby_km),
            DistancePreference::Medium => distance.km().is_some_and(|km| km <= self.medium_km),
            DistancePreference::FarOk => distance.km().is_some(),
        }
    }
}

/// Whole kilometers, rounded half to even.
pub fn distance_km(origin: &Coordinates, item: &Item) -> Distance {
    match item.coordinates() {
        Some(coords) => {
            Distance::Km(crate::utils::round_to_count(origin.distance_to(&coords)) as u32)
        }
        None => Distance::Unknown,
    }
}

/// Attach distances from `origin` and apply the band. Without an origin every
/// item passes through unannotated.
pub fn annotate_and_filter(
    items: Vec<Item>,
    origin: Option<Coordinates>,
    preference: DistancePreference,
    bands: &DistanceBands,
) -> Vec<LocatedItem> {
    let Some(origin) = origin else {
        return items.into_iter().map(LocatedItem::unannotated).collect();
    };

    items
        .into_iter()
        .map(|item| {
            let distance_km = distance_km(&origin, &item);
            LocatedItem { item, distance_km }
        })
        .filter(|located| bands.admits(preference, located.distance_km))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const LYON: Coordinates = Coordinates {
        latitude: 45.7640,
        longitude: 4.8357,
    };

    fn located(km: Option<u32>) -> Distance {
        km.map(Distance::Km).unwrap_or(Distance::Unknown)
    }

    #[test]
    fn test_haversine_lyon_grenoble() {
        let grenoble = Coordinates::new(45.1885, 5.7245);
        let km = LYON.distance_to(&grenoble);
        assert!((km - 94.5).abs() < 1.5, "got {}", km);
        assert!(LYON.distance_to(&LYON).abs() < 1e-9);
    }

    #[test]
    fn test_band_edges() {
        let bands = DistanceBands::default();
        assert!(bands.admits(DistancePreference::Nearby, located(Some(19))));
        assert!(!bands.admits(DistancePreference::Nearby, located(Some(20))));
        assert!(bands.admits(DistancePreference::Medium, located(Some(20))));
        assert!(bands.admits(DistancePreference::Medium, located(Some(50))));
        assert!(!bands.admits(DistancePreference::Medium, located(Some(51))));
        assert!(bands.admits(DistancePreference::FarOk, located(Some(400))));

        for preference in [
            DistancePreference::Nearby,
            DistancePreference::Medium,
            DistancePreference::FarOk,
        ] {
            assert!(!bands.admits(preference, located(None)));
        }
        assert!(bands.admits(DistancePreference::Unset, located(None)));
    }

    #[test]
    fn test_annotate_without_origin_passes_through() {
        let items = vec![
            Item::new(Uuid::new_v4(), "Placed", Some(Category::Art)).with_coordinates(45.0, 5.0),
            Item::new(Uuid::new_v4(), "Floating", Some(Category::Art)),
        ];
        let bands = DistanceBands::default();
        let result = annotate_and_filter(items, None, DistancePreference::Nearby, &bands);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|l| l.distance_km.is_unannotated()));
    }

    #[test]
    fn test_annotate_and_filter_nearby() {
        let close = Item::new(Uuid::new_v4(), "Close", Some(Category::Art))
            .with_coordinates(45.7700, 4.8400);
        let far = Item::new(Uuid::new_v4(), "Grenoble", Some(Category::Art))
            .with_coordinates(45.1885, 5.7245);
        let floating = Item::new(Uuid::new_v4(), "Floating", Some(Category::Art));
        let items = vec![close, far, floating];

        let bands = DistanceBands::default();
        let nearby =
            annotate_and_filter(items.clone(), Some(LYON), DistancePreference::Nearby, &bands);
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].item.name, "Close");
        assert_eq!(nearby[0].distance_km, Distance::Km(1));

        let annotated = annotate_and_filter(items, Some(LYON), DistancePreference::Unset, &bands);
        assert_eq!(annotated.len(), 3);
        assert_eq!(annotated[2].distance_km, Distance::Unknown);
        assert!(annotated[1].distance_km.km().unwrap() > 50);
    }
}
