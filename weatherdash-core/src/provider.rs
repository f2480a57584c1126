use crate::{
    Config, Forecast, LocationQuery, WeatherSnapshot,
    error::WeatherError,
    provider::{openweather::OpenWeatherProvider, weatherapi::WeatherApiProvider},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub mod openweather;
pub mod weatherapi;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    WeatherApi,
    OpenWeather,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::WeatherApi => "weatherapi",
            ProviderId::OpenWeather => "openweather",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::WeatherApi, ProviderId::OpenWeather]
    }

    /// Longest daily forecast the provider's free tier serves.
    pub const fn max_forecast_days(&self) -> u8 {
        match self {
            ProviderId::WeatherApi => 3,
            ProviderId::OpenWeather => 5,
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "weatherapi" => Ok(ProviderId::WeatherApi),
            "openweather" => Ok(ProviderId::OpenWeather),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: weatherapi, openweather."
            )),
        }
    }
}

/// A source of weather data.
///
/// Implementations own the parse step: the provider's JSON is decoded into
/// private wire types and normalized into [`WeatherSnapshot`] / [`Forecast`],
/// so nothing outside the provider depends on the third-party shape.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    async fn current(&self, query: &LocationQuery) -> Result<WeatherSnapshot, WeatherError>;

    async fn forecast(&self, query: &LocationQuery, days: u8) -> Result<Forecast, WeatherError>;
}

/// Construct a provider from config and explicit ProviderId.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let api_key = config.provider_api_key(id).ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for provider '{id}'.\n\
                 Hint: run `weatherdash configure {id}` and enter your API key."
        )
    })?;
    let base_url = config.provider_base_url(id);

    let boxed: Box<dyn WeatherProvider> = match id {
        ProviderId::WeatherApi => {
            let provider = WeatherApiProvider::new(api_key.to_owned());
            Box::new(match base_url {
                Some(url) => provider.with_base_url(url),
                None => provider,
            })
        }
        ProviderId::OpenWeather => {
            let provider = OpenWeatherProvider::new(api_key.to_owned());
            Box::new(match base_url {
                Some(url) => provider.with_base_url(url),
                None => provider,
            })
        }
    };

    tracing::debug!(provider = %id, "weather provider ready");
    Ok(boxed)
}

/// Construct the default provider from config, using `default_provider` field (WeatherAPI if unset).
pub fn default_provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let id = config.default_provider_id()?;
    provider_from_config(id, config)
}

pub(crate) fn check_status(status: reqwest::StatusCode, body: &str) -> Result<(), WeatherError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(WeatherError::Status { status: status.as_u16(), body: truncate_body(body) })
    }
}

pub(crate) fn check_forecast_days(id: ProviderId, days: u8) -> Result<(), WeatherError> {
    let max = id.max_forecast_days();
    if days == 0 || days > max {
        return Err(WeatherError::Unsupported(format!(
            "{id} serves between 1 and {max} forecast days, {days} requested"
        )));
    }
    Ok(())
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
