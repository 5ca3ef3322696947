use serde_json::Value;

/// Shown when a direction can't be interpreted
pub const UNKNOWN_DIRECTION: &str = "—";

const LABELS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

/// Nearest of the 8 compass points, 45° sectors centered on each label.
///
/// Wraps around at 360°, so `compass_label(360.0) == "N"` and negative
/// bearings count back from north.
pub fn compass_label(degrees: f64) -> &'static str {
    if !degrees.is_finite() {
        return UNKNOWN_DIRECTION;
    }
    let sector = (degrees.rem_euclid(360.0) / 45.0).round() as usize % LABELS.len();
    LABELS[sector]
}

/// Same as [`compass_label`] for untyped upstream values
pub fn compass_label_json(value: &Value) -> &'static str {
    value.as_f64().map_or(UNKNOWN_DIRECTION, compass_label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cardinal_points() {
        assert_eq!(compass_label(0.0), "N");
        assert_eq!(compass_label(45.0), "NE");
        assert_eq!(compass_label(90.0), "E");
        assert_eq!(compass_label(180.0), "S");
        assert_eq!(compass_label(270.0), "W");
        assert_eq!(compass_label(315.0), "NW");
    }

    #[test]
    fn test_wraparound() {
        assert_eq!(compass_label(360.0), "N");
        assert_eq!(compass_label(350.0), "N");
        assert_eq!(compass_label(337.6), "N");
        assert_eq!(compass_label(-45.0), "NW");
        assert_eq!(compass_label(720.0 + 90.0), "E");
    }

    #[test]
    fn test_rounds_to_nearest_sector() {
        assert_eq!(compass_label(22.0), "N");
        assert_eq!(compass_label(23.0), "NE");
        assert_eq!(compass_label(230.0), "SW");
    }

    #[test]
    fn test_every_degree_maps_to_a_label() {
        for tenth in 0..3600 {
            let label = compass_label(f64::from(tenth) / 10.0);
            assert!(LABELS.contains(&label), "{tenth}: {label}");
        }
    }

    #[test]
    fn test_non_numeric_is_unknown() {
        assert_eq!(compass_label(f64::NAN), UNKNOWN_DIRECTION);
        assert_eq!(compass_label(f64::INFINITY), UNKNOWN_DIRECTION);
        assert_eq!(compass_label_json(&json!("north")), UNKNOWN_DIRECTION);
        assert_eq!(compass_label_json(&Value::Null), UNKNOWN_DIRECTION);
        assert_eq!(compass_label_json(&json!(200)), "S");
    }
}
