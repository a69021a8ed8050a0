//! Focus session core: active-session registry, lifecycle, duration
//! aggregation and analytics

pub mod aggregator;
pub mod analytics;
pub mod lifecycle;
pub mod registry;

/// Convert whole seconds to minutes, rounding to the nearest integer
pub fn seconds_to_minutes(seconds: i64) -> i64 {
    (seconds as f64 / 60.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_to_minutes_rounds() {
        assert_eq!(seconds_to_minutes(0), 0);
        assert_eq!(seconds_to_minutes(29), 0);
        assert_eq!(seconds_to_minutes(30), 1);
        assert_eq!(seconds_to_minutes(1500), 25);
        assert_eq!(seconds_to_minutes(89), 1);
        assert_eq!(seconds_to_minutes(90), 2);
    }
}
