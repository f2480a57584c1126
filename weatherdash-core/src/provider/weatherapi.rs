use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::WeatherError,
    model::{Forecast, ForecastDay, LocationQuery, SnapshotLocation, WeatherSnapshot},
    provider::{ProviderId, check_forecast_days, check_status},
};

use super::WeatherProvider;

const DEFAULT_BASE_URL: &str = "http://api.weatherapi.com/v1";

#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(api_key: String) -> Self {
        Self { api_key, base_url: DEFAULT_BASE_URL.to_string(), http: Client::new() }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<String, WeatherError> {
        let url = format!("{}/{endpoint}", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        check_status(status, &body)?;

        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
    #[serde(default)]
    region: String,
    country: String,
    localtime: String,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    temp_f: f64,
    feelslike_c: f64,
    feelslike_f: f64,
    humidity: u8,
    wind_kph: f64,
    vis_km: f64,
    uv: Option<f64>,
    is_day: u8,
    condition: WaCondition,
    last_updated_epoch: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    location: WaLocation,
    current: WaCurrent,
}

#[derive(Debug, Deserialize)]
struct WaDay {
    maxtemp_c: f64,
    mintemp_c: f64,
    daily_chance_of_rain: Option<u8>,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaForecastDay {
    date: NaiveDate,
    day: WaDay,
}

#[derive(Debug, Deserialize)]
struct WaForecast {
    forecastday: Vec<WaForecastDay>,
}

#[derive(Debug, Deserialize)]
struct WaForecastResponse {
    location: WaLocation,
    forecast: WaForecast,
}

impl WaResponse {
    fn into_snapshot(self) -> Result<WeatherSnapshot, WeatherError> {
        let local_time = parse_localtime(&self.location.localtime)?;
        let observation_time = self
            .current
            .last_updated_epoch
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .unwrap_or_else(Utc::now);

        let region = Some(self.location.region).filter(|r| !r.is_empty());

        Ok(WeatherSnapshot {
            provider: ProviderId::WeatherApi,
            location: SnapshotLocation {
                name: self.location.name,
                region,
                country: self.location.country,
                local_time,
            },
            temperature_c: self.current.temp_c,
            temperature_f: self.current.temp_f,
            feels_like_c: self.current.feelslike_c,
            feels_like_f: self.current.feelslike_f,
            condition: self.current.condition.text,
            wind_kph: self.current.wind_kph,
            humidity_pct: self.current.humidity,
            visibility_km: self.current.vis_km,
            uv_index: self.current.uv,
            is_day: self.current.is_day != 0,
            observation_time,
        })
    }
}

/// WeatherAPI reports local time as `2024-01-01 9:05`, hour not always zero-padded.
fn parse_localtime(raw: &str) -> Result<NaiveDateTime, WeatherError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M").map_err(|e| {
        WeatherError::InvalidResponse(format!("unrecognized local time '{raw}': {e}"))
    })
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::WeatherApi
    }

    async fn current(&self, query: &LocationQuery) -> Result<WeatherSnapshot, WeatherError> {
        let body = self
            .get("current.json", &[("q", query.to_string()), ("aqi", "no".to_string())])
            .await?;

        let parsed: WaResponse = serde_json::from_str(&body)
            .map_err(|source| WeatherError::Parse { what: "WeatherAPI current", source })?;

        parsed.into_snapshot()
    }

    async fn forecast(&self, query: &LocationQuery, days: u8) -> Result<Forecast, WeatherError> {
        check_forecast_days(ProviderId::WeatherApi, days)?;

        let body = self
            .get(
                "forecast.json",
                &[
                    ("q", query.to_string()),
                    ("days", days.to_string()),
                    ("aqi", "no".to_string()),
                    ("alerts", "no".to_string()),
                ],
            )
            .await?;

        let parsed: WaForecastResponse = serde_json::from_str(&body)
            .map_err(|source| WeatherError::Parse { what: "WeatherAPI forecast", source })?;

        if parsed.forecast.forecastday.is_empty() {
            return Err(WeatherError::InvalidResponse(
                "WeatherAPI forecast contained no days".to_string(),
            ));
        }

        let days = parsed
            .forecast
            .forecastday
            .into_iter()
            .map(|d| ForecastDay {
                date: d.date,
                max_c: d.day.maxtemp_c,
                min_c: d.day.mintemp_c,
                condition: d.day.condition.text,
                chance_of_rain_pct: d.day.daily_chance_of_rain,
            })
            .collect();

        Ok(Forecast {
            provider: ProviderId::WeatherApi,
            location_name: format!("{}, {}", parsed.location.name, parsed.location.country),
            days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    const CURRENT: &str = r#"{
        "location": {
            "name": "London", "region": "City of London, Greater London",
            "country": "United Kingdom", "localtime_epoch": 1704110700,
            "localtime": "2024-01-01 9:05"
        },
        "current": {
            "last_updated_epoch": 1704110400,
            "temp_c": 8.0, "temp_f": 46.4, "is_day": 1,
            "condition": { "text": "Partly cloudy", "code": 1003 },
            "wind_kph": 15.1, "humidity": 81, "feelslike_c": 5.2, "feelslike_f": 41.4,
            "vis_km": 10.0, "uv": 2.0
        }
    }"#;

    #[test]
    fn maps_current_response_into_snapshot() {
        let parsed: WaResponse = serde_json::from_str(CURRENT).unwrap();
        let snap = parsed.into_snapshot().unwrap();

        assert_eq!(snap.provider, ProviderId::WeatherApi);
        assert_eq!(snap.location.name, "London");
        assert_eq!(snap.location.region.as_deref(), Some("City of London, Greater London"));
        assert_eq!(snap.location.local_time.hour(), 9);
        assert_eq!(snap.location.local_time.day(), 1);
        assert_eq!(snap.temperature_f, 46.4);
        assert_eq!(snap.condition, "Partly cloudy");
        assert_eq!(snap.uv_index, Some(2.0));
        assert!(snap.is_day);
        assert_eq!(snap.observation_time.timestamp(), 1704110400);
    }

    #[test]
    fn empty_region_becomes_none() {
        let json = CURRENT.replace("City of London, Greater London", "");
        let parsed: WaResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.into_snapshot().unwrap().location.region, None);
    }

    #[test]
    fn rejects_unparseable_local_time() {
        let json = CURRENT.replace("2024-01-01 9:05", "yesterday");
        let parsed: WaResponse = serde_json::from_str(&json).unwrap();
        assert!(matches!(parsed.into_snapshot(), Err(WeatherError::InvalidResponse(_))));
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let provider = WeatherApiProvider::new("KEY".into()).with_base_url("http://localhost:1234/");
        assert_eq!(provider.base_url, "http://localhost:1234");
    }
}
