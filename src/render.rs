//! Plain-text rendering for the terminal front-end.

use weathernow_forecast::{compass_label, describe_wmo_code, Place, WeatherSnapshot};

pub const HELP: &str = "\
Type a place name to search. Commands:
  :pick N   select result N        :first   select the first result
  :here     use my location        :show    show the current reading
  :temp     toggle °C/°F           :wind    cycle wind units
  :ai       enable activity briefs :quit    exit";

pub fn place_list(places: &[Place]) -> String {
    places
        .iter()
        .enumerate()
        .map(|(i, place)| {
            let subtitle = place.subtitle();
            if subtitle.is_empty() {
                format!("  {}. {}", i + 1, place.name)
            } else {
                format!("  {}. {} ({})", i + 1, place.name, subtitle)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn snapshot(place: &Place, snapshot: &WeatherSnapshot) -> String {
    let temp = snapshot.units.temperature.label();
    let wind = snapshot.units.wind_speed.label();

    let mut out = format!(
        "{}\n  {}  {:.0}{temp} (feels like {:.0}{temp})\n  \
         Humidity {:.0}%  Clouds {:.0}%\n  \
         Wind {:.0} {wind} {} (gusts {:.0} {wind})\n  \
         Precip {:.1} mm  rain {:.1} mm  showers {:.1} mm  snow {:.1} cm",
        place.label(),
        describe_wmo_code(snapshot.weather_code),
        snapshot.temperature,
        snapshot.apparent_temperature,
        snapshot.relative_humidity,
        snapshot.cloud_cover,
        snapshot.wind_speed,
        compass_label(snapshot.wind_direction),
        snapshot.wind_gusts,
        snapshot.precipitation,
        snapshot.rain,
        snapshot.showers,
        snapshot.snowfall,
    );

    if let Some(at) = snapshot.observed_at() {
        out.push_str(&format!("\n  Observed {}", at.format("%a %H:%M")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use weathernow_forecast::MeasurementUnits;

    fn london() -> Place {
        Place {
            id: 2643743,
            name: "London".into(),
            country: "United Kingdom".into(),
            region: Some("England".into()),
            latitude: 51.51,
            longitude: -0.13,
        }
    }

    #[test]
    fn test_place_list_numbers_from_one() {
        let mut bare = london();
        bare.region = None;
        bare.country = String::new();
        let text = place_list(&[london(), bare]);
        assert_eq!(text, "  1. London (England, United Kingdom)\n  2. London");
    }

    #[test]
    fn test_snapshot_rendering() {
        let mut reading = WeatherSnapshot::empty(MeasurementUnits::default());
        reading.time = "2026-10-18T14:00".into();
        reading.temperature = 15.4;
        reading.apparent_temperature = 13.6;
        reading.wind_direction = 230.0;
        reading.weather_code = 61;

        let text = snapshot(&london(), &reading);
        assert!(text.starts_with("London, England\n"));
        assert!(text.contains("Rain: slight  15°C (feels like 14°C)"));
        assert!(text.contains("km/h SW"));
        assert!(text.contains("Observed Sun 14:00"));
    }

    #[test]
    fn test_missing_time_has_no_observed_line() {
        let reading = WeatherSnapshot::empty(MeasurementUnits::default());
        assert!(!snapshot(&london(), &reading).contains("Observed"));
    }
}
