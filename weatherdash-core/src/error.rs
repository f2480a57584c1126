//! Error types for the store and its collaborators.
//!
//! Fetch failures carry enough detail for logs, but every variant renders as a
//! "weather data fetch failed" message so the presentation layer can show one
//! kind of error to the user.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while fetching weather data from a provider.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather data fetch failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("weather data fetch failed: provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("weather data fetch failed: could not parse {what} response: {source}")]
    Parse {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("weather data fetch failed: {0}")]
    InvalidResponse(String),

    #[error("weather data fetch failed: invalid location query: {0}")]
    InvalidQuery(String),

    #[error("weather data fetch failed: {0}")]
    Unsupported(String),
}

impl WeatherError {
    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::Transport(_) => "Could not reach the weather service. Check your connection.",
            WeatherError::Status { status: 400 | 404, .. } => "Location not found.",
            WeatherError::Status { status: 401 | 403, .. } => {
                "The weather service rejected the API key."
            }
            WeatherError::Status { .. } => "The weather service returned an error.",
            WeatherError::Parse { .. } | WeatherError::InvalidResponse(_) => {
                "The weather service returned unexpected data."
            }
            WeatherError::InvalidQuery(_) => "Enter a city name or \"latitude,longitude\".",
            WeatherError::Unsupported(_) => "That request is not supported by this provider.",
        }
    }
}

/// Failure while reading or writing persisted store state.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("state storage I/O failed at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not serialize store state: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("persisted store state is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),
}

/// Error returned by store operations that both fetch and persist.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Fetch(#[from] WeatherError),

    /// The fetched data was applied in memory but could not be persisted.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl StoreError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StoreError::Fetch(e) => e.user_message(),
            StoreError::Storage(_) => "Weather updated, but saving your data failed.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_fetch_error_reads_as_fetch_failure() {
        let errors = [
            WeatherError::Status { status: 404, body: "no match".into() },
            WeatherError::InvalidResponse("empty list".into()),
            WeatherError::InvalidQuery("".into()),
            WeatherError::Unsupported("10 days".into()),
        ];

        for err in errors {
            assert!(err.to_string().starts_with("weather data fetch failed"), "{err}");
        }
    }

    #[test]
    fn not_found_status_maps_to_location_message() {
        let err = WeatherError::Status { status: 400, body: String::new() };
        assert_eq!(err.user_message(), "Location not found.");
    }

    #[test]
    fn store_error_forwards_fetch_message() {
        let err = StoreError::from(WeatherError::Status { status: 401, body: String::new() });
        assert_eq!(err.user_message(), "The weather service rejected the API key.");
    }
}
