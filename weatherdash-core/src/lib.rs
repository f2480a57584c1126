//! Core library for the `weatherdash` weather dashboard.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Abstraction over weather providers
//! - Shared domain models (snapshots, forecasts, location queries)
//! - The preference & weather-snapshot store and its persistence
//!
//! It is used by `weatherdash-cli`, but can also back other front ends.

pub mod config;
pub mod error;
pub mod model;
pub mod preferences;
pub mod provider;
pub mod status;
pub mod storage;
pub mod store;

pub use config::{Config, ProviderConfig};
pub use error::{StorageError, StoreError, WeatherError};
pub use model::{Forecast, ForecastDay, LocationQuery, SnapshotLocation, WeatherSnapshot};
pub use preferences::{Favorites, SearchHistory, Settings, SettingsPatch, TemperatureUnit, Theme};
pub use provider::{ProviderId, WeatherProvider};
pub use status::{SystemStatus, SystemStatusPatch};
pub use storage::{FileStorage, MemoryStorage, StateStorage};
pub use store::{FetchOutcome, StoreState, WeatherStore};
