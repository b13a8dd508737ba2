pub mod metrics;
pub mod validation;

/// Text before the first comma of a "city, region" location, trimmed and lowercased.
pub fn city_token(location: &str) -> String {
    location
        .split(',')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

pub fn approval_percentage(approve_count: u32, disapprove_count: u32) -> Option<f64> {
    let total_votes = approve_count + disapprove_count;
    if total_votes == 0 {
        None
    } else {
        Some(approve_count as f64 / total_votes as f64 * 100.0)
    }
}

/// Round half to even, returning a non-negative count.
pub fn round_to_count(value: f64) -> usize {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    value.round_ties_even() as usize
}
