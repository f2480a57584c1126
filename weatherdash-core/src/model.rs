use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::WeatherError, preferences::TemperatureUnit, provider::ProviderId};

/// A location as typed by the user: a free-text city or a coordinate pair.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    City(String),
    Coordinates { lat: f64, lon: f64 },
}

impl LocationQuery {
    pub fn parse(input: &str) -> Result<Self, WeatherError> {
        input.parse()
    }
}

impl FromStr for LocationQuery {
    type Err = WeatherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(WeatherError::InvalidQuery("location must not be empty".to_string()));
        }

        let coords = trimmed
            .split_once(',')
            .and_then(|(lat, lon)| Some((lat.trim().parse::<f64>().ok()?, lon.trim().parse::<f64>().ok()?)));

        if let Some((lat, lon)) = coords {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                return Err(WeatherError::InvalidQuery(format!(
                    "coordinates out of range: {lat},{lon}"
                )));
            }
            return Ok(LocationQuery::Coordinates { lat, lon });
        }

        Ok(LocationQuery::City(trimmed.to_string()))
    }
}

impl fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationQuery::City(name) => f.write_str(name),
            LocationQuery::Coordinates { lat, lon } => write!(f, "{lat},{lon}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotLocation {
    pub name: String,
    pub region: Option<String>,
    pub country: String,
    /// Wall-clock time at the location when the reading was taken.
    pub local_time: NaiveDateTime,
}

/// The most recent weather reading for a single location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub provider: ProviderId,
    pub location: SnapshotLocation,
    pub temperature_c: f64,
    pub temperature_f: f64,
    pub feels_like_c: f64,
    pub feels_like_f: f64,
    pub condition: String,
    pub wind_kph: f64,
    pub humidity_pct: u8,
    pub visibility_km: f64,
    pub uv_index: Option<f64>,
    pub is_day: bool,
    pub observation_time: DateTime<Utc>,
}

impl WeatherSnapshot {
    pub fn temperature(&self, unit: TemperatureUnit) -> f64 {
        match unit {
            TemperatureUnit::Celsius => self.temperature_c,
            TemperatureUnit::Fahrenheit => self.temperature_f,
        }
    }

    pub fn feels_like(&self, unit: TemperatureUnit) -> f64 {
        match unit {
            TemperatureUnit::Celsius => self.feels_like_c,
            TemperatureUnit::Fahrenheit => self.feels_like_f,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub max_c: f64,
    pub min_c: f64,
    pub condition: String,
    pub chance_of_rain_pct: Option<u8>,
}

impl ForecastDay {
    pub fn max(&self, unit: TemperatureUnit) -> f64 {
        unit.convert_celsius(self.max_c)
    }

    pub fn min(&self, unit: TemperatureUnit) -> f64 {
        unit.convert_celsius(self.min_c)
    }
}

/// Daily forecast for a single location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub provider: ProviderId,
    pub location_name: String,
    pub days: Vec<ForecastDay>,
}

pub(crate) fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}
