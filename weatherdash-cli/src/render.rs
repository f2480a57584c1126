use std::fmt::Write;

use weatherdash_core::{Forecast, Settings, SystemStatus, TemperatureUnit, WeatherSnapshot};

fn degrees(value: f64, unit: TemperatureUnit) -> String {
    format!("{}{}", value.round(), unit.symbol())
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "online" } else { "offline" }
}

pub fn weather_card(snapshot: &WeatherSnapshot, unit: TemperatureUnit, favorite: bool) -> String {
    let mut out = String::new();
    let loc = &snapshot.location;
    let star = if favorite { " ★" } else { "" };

    let _ = writeln!(out, "{}{star}", loc.name);
    match &loc.region {
        Some(region) => {
            let _ = writeln!(out, "{region}, {}", loc.country);
        }
        None => {
            let _ = writeln!(out, "{}", loc.country);
        }
    }
    let _ = writeln!(out, "Local time:  {}", loc.local_time.format("%Y-%m-%d %H:%M"));
    let _ = writeln!(
        out,
        "Conditions:  {} ({})",
        snapshot.condition,
        if snapshot.is_day { "day" } else { "night" }
    );
    let _ = writeln!(
        out,
        "Temperature: {} (feels like {})",
        degrees(snapshot.temperature(unit), unit),
        degrees(snapshot.feels_like(unit), unit)
    );
    let _ = writeln!(out, "Wind:        {:.1} km/h", snapshot.wind_kph);
    let _ = writeln!(out, "Humidity:    {}%", snapshot.humidity_pct);
    let _ = writeln!(out, "Visibility:  {:.1} km", snapshot.visibility_km);
    if let Some(uv) = snapshot.uv_index {
        let _ = writeln!(out, "UV index:    {uv}");
    }
    let _ = write!(out, "Source:      {}", snapshot.provider);

    out
}

pub fn forecast_table(forecast: &Forecast, unit: TemperatureUnit) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", forecast.location_name, forecast.provider);

    for day in &forecast.days {
        let rain = day.chance_of_rain_pct.map(|p| format!("  rain {p}%")).unwrap_or_default();
        let _ = writeln!(
            out,
            "{}  {:>6} / {:<6} {}{rain}",
            day.date.format("%a %d %b"),
            degrees(day.max(unit), unit),
            degrees(day.min(unit), unit),
            day.condition,
        );
    }

    out.trim_end().to_string()
}

pub fn settings(settings: &Settings) -> String {
    format!(
        "Temperature unit: {}\nTheme:            {}",
        settings.temperature_unit.symbol(),
        settings.theme
    )
}

pub fn status(status: &SystemStatus) -> String {
    format!(
        "System:      {}\nSatellites:  {}\nAnalysis:    {}\nLast update: {}",
        yes_no(status.is_online),
        yes_no(status.satellite_link),
        yes_no(status.analysis_link),
        status.last_update.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, Utc};
    use weatherdash_core::{ProviderId, SnapshotLocation};

    fn snapshot() -> WeatherSnapshot {
        WeatherSnapshot {
            provider: ProviderId::WeatherApi,
            location: SnapshotLocation {
                name: "London".into(),
                region: Some("City of London, Greater London".into()),
                country: "United Kingdom".into(),
                local_time: NaiveDateTime::parse_from_str("2024-01-01 09:05", "%Y-%m-%d %H:%M")
                    .unwrap(),
            },
            temperature_c: 8.4,
            temperature_f: 47.1,
            feels_like_c: 5.2,
            feels_like_f: 41.4,
            condition: "Partly cloudy".into(),
            wind_kph: 15.1,
            humidity_pct: 81,
            visibility_km: 10.0,
            uv_index: None,
            is_day: true,
            observation_time: Utc::now(),
        }
    }

    #[test]
    fn card_uses_selected_unit() {
        let card = weather_card(&snapshot(), TemperatureUnit::Fahrenheit, false);
        assert!(card.contains("Temperature: 47°F (feels like 41°F)"));

        let card = weather_card(&snapshot(), TemperatureUnit::Celsius, false);
        assert!(card.contains("Temperature: 8°C (feels like 5°C)"));
    }

    #[test]
    fn card_marks_favorites_and_skips_missing_uv() {
        let card = weather_card(&snapshot(), TemperatureUnit::Celsius, true);
        assert!(card.starts_with("London ★\n"));
        assert!(!card.contains("UV index"));
    }
}
