use crate::error::{DiscoveryError, Result};
use crate::models::*;
use uuid::Uuid;

pub fn validate_uuid_string(uuid_str: &str) -> Result<Uuid> {
    let id = Uuid::parse_str(uuid_str.trim())
        .map_err(|_| DiscoveryError::validation(format!("Invalid UUID format: {}", uuid_str)))?;
    if id.is_nil() {
        return Err(DiscoveryError::validation("ID cannot be nil"));
    }
    Ok(id)
}

pub fn validate_user_id(user_id: Uuid) -> Result<()> {
    if user_id.is_nil() {
        return Err(DiscoveryError::validation("User ID cannot be nil"));
    }
    Ok(())
}

pub fn validate_item_id(item_id: Uuid) -> Result<()> {
    if item_id.is_nil() {
        return Err(DiscoveryError::validation("Item ID cannot be nil"));
    }
    Ok(())
}

pub fn validate_interaction_event(event: &InteractionEvent) -> Result<()> {
    validate_user_id(event.user_id)?;
    validate_item_id(event.item_id)?;

    if !event.duration_secs.is_finite() || event.duration_secs < 0.0 {
        return Err(DiscoveryError::validation(
            "Duration must be a finite, non-negative number of seconds",
        ));
    }

    // Validate timestamp is not too far in the future
    let max_future = chrono::Utc::now() + chrono::Duration::hours(1);
    if event.timestamp > max_future {
        return Err(DiscoveryError::validation(
            "Timestamp cannot be more than 1 hour in the future",
        ));
    }

    Ok(())
}

/// Vote kinds only enter the log through the feedback ledger.
pub fn validate_tracked_interaction(event: &InteractionEvent) -> Result<()> {
    validate_interaction_event(event)?;
    if event.kind.is_vote() {
        return Err(DiscoveryError::validation(
            "Votes must be submitted through the feedback ledger",
        ));
    }
    Ok(())
}

pub fn validate_user(user: &User) -> Result<()> {
    validate_user_id(user.id)?;
    if let Some(ref reference) = user.reference_location {
        if reference.len() > 100 {
            return Err(DiscoveryError::validation(
                "Reference location too long (max 100 characters)",
            ));
        }
    }
    Ok(())
}

pub fn validate_item(item: &Item) -> Result<()> {
    validate_item_id(item.id)?;

    if item.name.trim().is_empty() {
        return Err(DiscoveryError::validation("Item name cannot be empty"));
    }

    match (item.latitude, item.longitude) {
        (Some(lat), Some(lon)) => {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                return Err(DiscoveryError::validation("Item coordinates out of range"));
            }
        }
        (None, None) => {}
        _ => {
            return Err(DiscoveryError::validation(
                "Item coordinates must include both latitude and longitude",
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_validate_uuid_string() {
        assert!(validate_uuid_string("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid_string("invalid-uuid").unwrap_err().is_validation());
        assert!(validate_uuid_string("00000000-0000-0000-0000-000000000000").is_err());
    }

    #[test]
    fn test_validate_interaction_event() {
        let valid =
            InteractionEvent::new(Uuid::new_v4(), Uuid::new_v4(), InteractionKind::DetailOpen)
                .with_duration(95.0);
        assert!(validate_interaction_event(&valid).is_ok());

        let nil_user = InteractionEvent::new(Uuid::nil(), Uuid::new_v4(), InteractionKind::View);
        assert!(validate_interaction_event(&nil_user).is_err());

        let negative = valid.clone().with_duration(-1.0);
        assert!(validate_interaction_event(&negative).is_err());

        let mut future = valid;
        future.timestamp = Utc::now() + chrono::Duration::hours(3);
        assert!(validate_interaction_event(&future).is_err());
    }

    #[test]
    fn test_tracked_interaction_rejects_votes() {
        let vote = InteractionEvent::new(Uuid::new_v4(), Uuid::new_v4(), InteractionKind::Approve);
        assert!(validate_tracked_interaction(&vote).unwrap_err().is_validation());
    }

    #[test]
    fn test_validate_item_coordinates() {
        let item = Item::new(Uuid::new_v4(), "Musée des Confluences", Some(Category::Science))
            .with_coordinates(45.7326, 4.8183);
        assert!(validate_item(&item).is_ok());

        let mut half = item.clone();
        half.longitude = None;
        assert!(validate_item(&half).is_err());

        let far_off = item.with_coordinates(123.0, 4.0);
        assert!(validate_item(&far_off).is_err());
    }
}
