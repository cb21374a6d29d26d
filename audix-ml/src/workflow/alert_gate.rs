//! Alert gate
//!
//! Turns a health score into a binary "notify" decision at a fixed threshold.

/// Health score at or below which a device alert is published
pub const ALERT_THRESHOLD: f64 = 0.5;

/// Slack applied at the boundary so that a mean of exactly `1 - threshold`
/// still alerts after floating-point summation
const BOUNDARY_TOLERANCE: f64 = 1e-9;

/// Whether a device with `health_score` should raise an alert
///
/// Inclusive at the boundary: a score exactly at `threshold` alerts.
pub fn should_alert(health_score: f64, threshold: f64) -> bool {
    health_score <= threshold + BOUNDARY_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_alerts() {
        assert!(should_alert(0.5, ALERT_THRESHOLD));
    }

    #[test]
    fn test_rounding_noise_at_boundary_alerts() {
        // 1 - (0.0 + 0.4 + 1.0 + 0.7 + 0.4) / 5 in f64
        let score = 1.0 - (0.0 + 0.4 + 1.0 + 0.7 + 0.4) / 5.0;
        assert!(should_alert(score, ALERT_THRESHOLD));
        assert!(should_alert(0.5 + f64::EPSILON, ALERT_THRESHOLD));
    }

    #[test]
    fn test_monotonic_over_unit_interval() {
        for step in 0..=1000 {
            let score = step as f64 / 1000.0;
            assert_eq!(should_alert(score, ALERT_THRESHOLD), score <= 0.5, "score {}", score);
        }
    }

    #[test]
    fn test_just_above_threshold_does_not_alert() {
        assert!(!should_alert(0.5 + 1e-6, ALERT_THRESHOLD));
        assert!(!should_alert(1.0, ALERT_THRESHOLD));
        assert!(should_alert(0.0, ALERT_THRESHOLD));
    }
}
