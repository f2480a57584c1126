//! The preference and weather-snapshot store.
//!
//! A [`WeatherStore`] is constructed explicitly and shared by reference with
//! whatever presents it. It is the only writer of its state, and it writes the
//! full state to its [`StateStorage`] after every mutation.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{
    error::{StorageError, StoreError},
    model::{Forecast, LocationQuery, WeatherSnapshot},
    preferences::{Favorites, SearchHistory, Settings, SettingsPatch},
    provider::WeatherProvider,
    status::{SystemStatus, SystemStatusPatch},
    storage::StateStorage,
};

/// Everything the store owns; also the persisted record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreState {
    pub current_weather: Option<WeatherSnapshot>,
    pub forecast: Option<Forecast>,
    pub search_history: SearchHistory,
    pub favorites: Favorites,
    pub settings: Settings,
    pub system_status: SystemStatus,
}

impl StoreState {
    /// Decodes a persisted record one top-level field at a time.
    ///
    /// A missing field keeps its default, and so does a field that no longer
    /// decodes (e.g. a snapshot written by an older schema); the other fields
    /// are kept. Only a record that is not a JSON object is an error.
    pub fn from_record(raw: &str) -> Result<Self, serde_json::Error> {
        let mut fields = match serde_json::from_str::<Value>(raw)? {
            Value::Object(fields) => fields,
            other => {
                return Err(serde::de::Error::custom(format!(
                    "expected a JSON object, found {}",
                    kind_of(&other)
                )));
            }
        };

        Ok(Self {
            current_weather: take_field(&mut fields, "current_weather"),
            forecast: take_field(&mut fields, "forecast"),
            search_history: take_field(&mut fields, "search_history"),
            favorites: take_field(&mut fields, "favorites"),
            settings: take_field(&mut fields, "settings"),
            system_status: take_field(&mut fields, "system_status"),
        })
    }
}

fn take_field<T: DeserializeOwned + Default>(fields: &mut Map<String, Value>, name: &str) -> T {
    let Some(value) = fields.remove(name) else {
        return T::default();
    };

    serde_json::from_value(value).unwrap_or_else(|e| {
        warn!(field = name, error = %e, "dropping unreadable persisted field");
        T::default()
    })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// What happened to a completed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    /// A later request was already applied; this result was dropped.
    Superseded,
}

impl FetchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, FetchOutcome::Applied)
    }
}

/// Issues increasing sequence numbers to requests at the moment they start.
#[derive(Debug, Default)]
struct Sequencer(AtomicU64);

impl Sequencer {
    fn issue(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: StoreState,
    applied_weather: u64,
    applied_forecast: u64,
}

impl Inner {
    /// Records `seq` as applied unless something newer already was.
    fn claim_weather(&mut self, seq: u64) -> bool {
        claim(&mut self.applied_weather, seq)
    }

    fn claim_forecast(&mut self, seq: u64) -> bool {
        claim(&mut self.applied_forecast, seq)
    }
}

fn claim(applied: &mut u64, seq: u64) -> bool {
    if seq <= *applied {
        return false;
    }
    *applied = seq;
    true
}

#[derive(Debug)]
pub struct WeatherStore {
    provider: Box<dyn WeatherProvider>,
    storage: Box<dyn StateStorage>,
    inner: Mutex<Inner>,
    weather_seq: Sequencer,
    forecast_seq: Sequencer,
}

impl WeatherStore {
    /// A store with default state. Nothing is read from `storage`.
    pub fn new(provider: Box<dyn WeatherProvider>, storage: Box<dyn StateStorage>) -> Self {
        Self::with_state(provider, storage, StoreState::default())
    }

    /// A store hydrated from `storage`.
    ///
    /// Fields absent from the persisted record keep their defaults. A record
    /// that cannot be decoded is logged and replaced by defaults; a storage
    /// that cannot be read at all is an error.
    pub fn open(
        provider: Box<dyn WeatherProvider>,
        storage: Box<dyn StateStorage>,
    ) -> Result<Self, StorageError> {
        let state = match storage.load() {
            Ok(Some(state)) => {
                debug!(
                    history = state.search_history.len(),
                    favorites = state.favorites.len(),
                    "hydrated store from storage"
                );
                state
            }
            Ok(None) => StoreState::default(),
            Err(StorageError::Corrupt(e)) => {
                warn!(error = %e, "persisted store state is corrupt, starting from defaults");
                StoreState::default()
            }
            Err(e) => return Err(e),
        };

        Ok(Self::with_state(provider, storage, state))
    }

    fn with_state(
        provider: Box<dyn WeatherProvider>,
        storage: Box<dyn StateStorage>,
        state: StoreState,
    ) -> Self {
        Self {
            provider,
            storage,
            inner: Mutex::new(Inner { state, ..Default::default() }),
            weather_seq: Sequencer::default(),
            forecast_seq: Sequencer::default(),
        }
    }

    pub fn state(&self) -> StoreState {
        self.inner.lock().state.clone()
    }

    pub fn current_weather(&self) -> Option<WeatherSnapshot> {
        self.inner.lock().state.current_weather.clone()
    }

    pub fn forecast(&self) -> Option<Forecast> {
        self.inner.lock().state.forecast.clone()
    }

    pub fn search_history(&self) -> Vec<String> {
        self.inner.lock().state.search_history.as_slice().to_vec()
    }

    pub fn favorites(&self) -> Vec<String> {
        self.inner.lock().state.favorites.as_slice().to_vec()
    }

    pub fn is_favorite(&self, city: &str) -> bool {
        self.inner.lock().state.favorites.contains(city)
    }

    pub fn settings(&self) -> Settings {
        self.inner.lock().state.settings
    }

    pub fn system_status(&self) -> SystemStatus {
        self.inner.lock().state.system_status
    }

    /// Replaces the snapshot. Fetches started before this call will not overwrite it.
    pub fn set_current_weather(&self, snapshot: WeatherSnapshot) -> Result<(), StorageError> {
        let seq = self.weather_seq.issue();
        self.mutate_inner(|inner| {
            inner.claim_weather(seq);
            inner.state.current_weather = Some(snapshot);
        })
    }

    pub fn set_forecast(&self, forecast: Forecast) -> Result<(), StorageError> {
        let seq = self.forecast_seq.issue();
        self.mutate_inner(|inner| {
            inner.claim_forecast(seq);
            inner.state.forecast = Some(forecast);
        })
    }

    /// Fetches current weather for a city or `"lat,lon"` query.
    ///
    /// On failure the state is left untouched. On success the snapshot is
    /// applied only if no later fetch has been applied in the meantime.
    pub async fn fetch_weather(&self, query: &str) -> Result<FetchOutcome, StoreError> {
        let query = LocationQuery::parse(query)?;
        let seq = self.weather_seq.issue();
        debug!(seq, %query, provider = %self.provider.id(), "fetching current weather");

        let snapshot = self.provider.current(&query).await.inspect_err(|e| {
            warn!(seq, %query, error = %e, "current weather fetch failed");
        })?;

        let mut inner = self.inner.lock();
        if !inner.claim_weather(seq) {
            debug!(seq, %query, "discarding superseded weather result");
            return Ok(FetchOutcome::Superseded);
        }

        inner.state.current_weather = Some(snapshot);
        inner.state.system_status.last_update = Utc::now();
        self.persist(&inner.state)?;

        debug!(seq, %query, "applied weather result");
        Ok(FetchOutcome::Applied)
    }

    /// Fetches a daily forecast; same ordering rules as [`Self::fetch_weather`].
    pub async fn fetch_forecast(&self, query: &str, days: u8) -> Result<FetchOutcome, StoreError> {
        let query = LocationQuery::parse(query)?;
        let seq = self.forecast_seq.issue();
        debug!(seq, %query, days, "fetching forecast");

        let forecast = self.provider.forecast(&query, days).await.inspect_err(|e| {
            warn!(seq, %query, error = %e, "forecast fetch failed");
        })?;

        let mut inner = self.inner.lock();
        if !inner.claim_forecast(seq) {
            debug!(seq, %query, "discarding superseded forecast result");
            return Ok(FetchOutcome::Superseded);
        }

        inner.state.forecast = Some(forecast);
        inner.state.system_status.last_update = Utc::now();
        self.persist(&inner.state)?;

        Ok(FetchOutcome::Applied)
    }

    /// A user search: fetch, and once the result is applied, remember the query.
    pub async fn search(&self, query: &str) -> Result<FetchOutcome, StoreError> {
        let outcome = self.fetch_weather(query).await?;
        if outcome.is_applied() {
            self.add_to_search_history(query.trim())?;
        }
        Ok(outcome)
    }

    pub fn add_to_search_history(&self, city: &str) -> Result<(), StorageError> {
        self.mutate(|state| state.search_history.record(city))
    }

    pub fn clear_search_history(&self) -> Result<(), StorageError> {
        self.mutate(|state| state.search_history.clear())
    }

    /// Returns whether the city was newly added.
    pub fn add_to_favorites(&self, city: &str) -> Result<bool, StorageError> {
        self.mutate(|state| state.favorites.insert(city))
    }

    /// Returns whether the city was present.
    pub fn remove_from_favorites(&self, city: &str) -> Result<bool, StorageError> {
        self.mutate(|state| state.favorites.remove(city))
    }

    pub fn update_settings(&self, patch: SettingsPatch) -> Result<(), StorageError> {
        self.mutate(|state| state.settings.merge(patch))
    }

    pub fn toggle_theme(&self) -> Result<Settings, StorageError> {
        self.mutate(|state| {
            state.settings.theme = state.settings.theme.toggled();
            state.settings
        })
    }

    pub fn update_system_status(&self, patch: SystemStatusPatch) -> Result<(), StorageError> {
        self.mutate(|state| state.system_status.merge(patch))
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut StoreState) -> T) -> Result<T, StorageError> {
        self.mutate_inner(|inner| f(&mut inner.state))
    }

    fn mutate_inner<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> Result<T, StorageError> {
        let mut inner = self.inner.lock();
        let out = f(&mut inner);
        self.persist(&inner.state)?;
        Ok(out)
    }

    fn persist(&self, state: &StoreState) -> Result<(), StorageError> {
        self.storage.save(state).inspect_err(|e| {
            warn!(error = %e, "failed to persist store state");
        })
    }
}
