use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::WeatherError,
    model::{
        Forecast, ForecastDay, LocationQuery, SnapshotLocation, WeatherSnapshot,
        celsius_to_fahrenheit,
    },
    provider::{ProviderId, check_forecast_days, check_status},
};

use super::WeatherProvider;

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self { api_key, base_url: DEFAULT_BASE_URL.to_string(), http: Client::new() }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get(
        &self,
        endpoint: &str,
        location: &LocationQuery,
        extra: &[(&str, String)],
    ) -> Result<String, WeatherError> {
        let url = format!("{}/{endpoint}", self.base_url);

        let location_params: Vec<(&str, String)> = match location {
            LocationQuery::City(name) => vec![("q", name.clone())],
            LocationQuery::Coordinates { lat, lon } => {
                vec![("lat", lat.to_string()), ("lon", lon.to_string())]
            }
        };

        let res = self
            .http
            .get(&url)
            .query(&location_params)
            .query(&[("appid", self.api_key.as_str()), ("units", "metric")])
            .query(extra)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        check_status(status, &body)?;

        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
    temp_min: Option<f64>,
    temp_max: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    #[serde(default)]
    country: String,
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    dt: i64,
    #[serde(default)]
    timezone: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    /// Metres; OpenWeather caps this at 10 km.
    visibility: Option<f64>,
    sys: OwSys,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: String,
    country: String,
    #[serde(default)]
    timezone: i64,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    /// Probability of precipitation, 0.0 to 1.0.
    pop: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    list: Vec<OwForecastEntry>,
}

fn first_description(weather: &[OwWeather]) -> String {
    weather.first().map(|w| w.description.clone()).unwrap_or_else(|| "Unknown".to_string())
}

fn local_naive(ts: i64, offset_secs: i64) -> Result<NaiveDateTime, WeatherError> {
    ts.checked_add(offset_secs)
        .and_then(|local| DateTime::<Utc>::from_timestamp(local, 0))
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| WeatherError::InvalidResponse(format!("timestamp out of range: {ts}")))
}

impl OwCurrentResponse {
    fn into_snapshot(self) -> Result<WeatherSnapshot, WeatherError> {
        let observation_time = DateTime::<Utc>::from_timestamp(self.dt, 0)
            .ok_or_else(|| WeatherError::InvalidResponse(format!("bad timestamp: {}", self.dt)))?;
        let local_time = local_naive(self.dt, self.timezone)?;

        let is_day = match (self.sys.sunrise, self.sys.sunset) {
            (Some(rise), Some(set)) => (rise..set).contains(&self.dt),
            _ => true,
        };

        Ok(WeatherSnapshot {
            provider: ProviderId::OpenWeather,
            location: SnapshotLocation {
                name: self.name,
                region: None,
                country: self.sys.country,
                local_time,
            },
            temperature_c: self.main.temp,
            temperature_f: celsius_to_fahrenheit(self.main.temp),
            feels_like_c: self.main.feels_like,
            feels_like_f: celsius_to_fahrenheit(self.main.feels_like),
            condition: first_description(&self.weather),
            wind_kph: self.wind.speed * 3.6,
            humidity_pct: self.main.humidity,
            visibility_km: self.visibility.unwrap_or(10_000.0) / 1000.0,
            uv_index: None,
            is_day,
            observation_time,
        })
    }
}

impl OwForecastResponse {
    /// Folds the 3-hourly list into per-day entries in the location's local time.
    /// The condition of each day is taken from the slot closest to local noon.
    fn into_forecast(self, days: u8) -> Result<Forecast, WeatherError> {
        struct Acc {
            max_c: f64,
            min_c: f64,
            noon_distance: u32,
            condition: String,
            pop: Option<f64>,
        }

        let mut by_date: BTreeMap<NaiveDate, Acc> = BTreeMap::new();

        for entry in &self.list {
            let local = local_naive(entry.dt, self.city.timezone)?;
            let hi = entry.main.temp_max.unwrap_or(entry.main.temp);
            let lo = entry.main.temp_min.unwrap_or(entry.main.temp);
            let noon_distance = local.hour().abs_diff(12);

            let acc = by_date.entry(local.date()).or_insert_with(|| Acc {
                max_c: hi,
                min_c: lo,
                noon_distance,
                condition: first_description(&entry.weather),
                pop: None,
            });

            acc.max_c = acc.max_c.max(hi);
            acc.min_c = acc.min_c.min(lo);
            if noon_distance < acc.noon_distance {
                acc.noon_distance = noon_distance;
                acc.condition = first_description(&entry.weather);
            }
            if let Some(pop) = entry.pop {
                acc.pop = Some(acc.pop.map_or(pop, |p: f64| p.max(pop)));
            }
        }

        if by_date.is_empty() {
            return Err(WeatherError::InvalidResponse(
                "OpenWeather forecast response contained no data".to_string(),
            ));
        }

        let days = by_date
            .into_iter()
            .take(usize::from(days))
            .map(|(date, acc)| ForecastDay {
                date,
                max_c: acc.max_c,
                min_c: acc.min_c,
                condition: acc.condition,
                chance_of_rain_pct: acc.pop.map(|p| (p * 100.0).round().clamp(0.0, 100.0) as u8),
            })
            .collect();

        Ok(Forecast {
            provider: ProviderId::OpenWeather,
            location_name: format!("{}, {}", self.city.name, self.city.country),
            days,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenWeather
    }

    async fn current(&self, query: &LocationQuery) -> Result<WeatherSnapshot, WeatherError> {
        let body = self.get("weather", query, &[]).await?;

        let parsed: OwCurrentResponse = serde_json::from_str(&body)
            .map_err(|source| WeatherError::Parse { what: "OpenWeather current", source })?;

        parsed.into_snapshot()
    }

    async fn forecast(&self, query: &LocationQuery, days: u8) -> Result<Forecast, WeatherError> {
        check_forecast_days(ProviderId::OpenWeather, days)?;

        // 8 three-hour slots per day.
        let slots = u16::from(days) * 8;
        let body = self.get("forecast", query, &[("cnt", slots.to_string())]).await?;

        let parsed: OwForecastResponse = serde_json::from_str(&body)
            .map_err(|source| WeatherError::Parse { what: "OpenWeather forecast", source })?;

        parsed.into_forecast(days)
    }
}
