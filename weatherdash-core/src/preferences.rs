//! User preferences kept by the store: search history, favorites and settings.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::celsius_to_fahrenheit;

/// Maximum number of entries kept in [`SearchHistory`].
pub const SEARCH_HISTORY_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TemperatureUnit {
    #[default]
    #[serde(rename = "C")]
    Celsius,
    #[serde(rename = "F")]
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }

    pub fn convert_celsius(&self, celsius: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius_to_fahrenheit(celsius),
        }
    }
}

impl TryFrom<&str> for TemperatureUnit {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_uppercase().as_str() {
            "C" | "CELSIUS" => Ok(TemperatureUnit::Celsius),
            "F" | "FAHRENHEIT" => Ok(TemperatureUnit::Fahrenheit),
            _ => Err(anyhow::anyhow!("Unknown temperature unit '{value}'. Use C or F.")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Theme {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(anyhow::anyhow!("Unknown theme '{value}'. Use light or dark.")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub temperature_unit: TemperatureUnit,
    pub theme: Theme,
}

/// Partial update for [`Settings`]; `None` fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub temperature_unit: Option<TemperatureUnit>,
    pub theme: Option<Theme>,
}

impl Settings {
    pub fn merge(&mut self, patch: SettingsPatch) {
        if let Some(unit) = patch.temperature_unit {
            self.temperature_unit = unit;
        }
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
    }
}

/// Recent searches, most recent first, at most [`SEARCH_HISTORY_LIMIT`] entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct SearchHistory(Vec<String>);

impl SearchHistory {
    /// Moves `city` to the front, dropping any earlier occurrence and the oldest overflow.
    pub fn record(&mut self, city: &str) {
        self.0.retain(|c| c != city);
        self.0.insert(0, city.to_string());
        self.0.truncate(SEARCH_HISTORY_LIMIT);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for SearchHistory {
    fn from(entries: Vec<String>) -> Self {
        let mut normalized: Vec<String> = Vec::with_capacity(SEARCH_HISTORY_LIMIT);
        for entry in entries {
            if normalized.len() == SEARCH_HISTORY_LIMIT {
                break;
            }
            if !normalized.contains(&entry) {
                normalized.push(entry);
            }
        }
        Self(normalized)
    }
}

impl From<SearchHistory> for Vec<String> {
    fn from(history: SearchHistory) -> Self {
        history.0
    }
}

/// Favorite cities in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Favorites(Vec<String>);

impl Favorites {
    /// Returns `false` when the city was already present.
    pub fn insert(&mut self, city: &str) -> bool {
        if self.contains(city) {
            return false;
        }
        self.0.push(city.to_string());
        true
    }

    /// Returns `false` when the city was not present.
    pub fn remove(&mut self, city: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|c| c != city);
        self.0.len() != before
    }

    pub fn contains(&self, city: &str) -> bool {
        self.0.iter().any(|c| c == city)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for Favorites {
    fn from(entries: Vec<String>) -> Self {
        let mut favorites = Favorites::default();
        for entry in &entries {
            favorites.insert(entry);
        }
        favorites
    }
}

impl From<Favorites> for Vec<String> {
    fn from(favorites: Favorites) -> Self {
        favorites.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_moves_repeated_city_to_front() {
        let mut history = SearchHistory::default();
        history.record("Paris");
        history.record("Paris");
        history.record("Tokyo");

        assert_eq!(history.as_slice(), ["Tokyo", "Paris"]);
    }

    #[test]
    fn history_never_exceeds_limit_or_repeats() {
        let mut history = SearchHistory::default();
        let cities = ["A", "B", "C", "A", "D", "E", "F", "B", "G", "G", "H"];

        for city in cities {
            history.record(city);
            assert!(history.len() <= SEARCH_HISTORY_LIMIT);

            let mut seen = history.as_slice().to_vec();
            seen.sort();
            seen.dedup();
            assert_eq!(seen.len(), history.len());
        }

        assert_eq!(history.as_slice(), ["H", "G", "B", "F", "E"]);
    }

    #[test]
    fn history_from_persisted_list_is_normalized() {
        let raw: Vec<String> =
            ["A", "B", "A", "C", "D", "E", "F"].into_iter().map(String::from).collect();
        let history = SearchHistory::from(raw);

        assert_eq!(history.as_slice(), ["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn favorites_have_set_semantics() {
        let mut favorites = Favorites::default();
        assert!(favorites.insert("London"));
        assert!(!favorites.insert("London"));
        assert_eq!(favorites.as_slice(), ["London"]);

        assert!(!favorites.remove("Nowhere"));
        assert_eq!(favorites.as_slice(), ["London"]);

        assert!(favorites.remove("London"));
        assert!(favorites.is_empty());
    }

    #[test]
    fn settings_merge_keeps_unspecified_fields() {
        let mut settings = Settings {
            temperature_unit: TemperatureUnit::Fahrenheit,
            theme: Theme::Light,
        };

        settings.merge(SettingsPatch { theme: Some(Theme::Dark), ..Default::default() });

        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.temperature_unit, TemperatureUnit::Fahrenheit);
    }

    #[test]
    fn settings_serialize_with_short_unit_names() {
        let json = serde_json::to_string(&Settings::default()).unwrap();
        assert_eq!(json, r#"{"temperature_unit":"C","theme":"light"}"#);
    }

    #[test]
    fn parses_units_and_themes() {
        assert_eq!(TemperatureUnit::try_from("f").unwrap(), TemperatureUnit::Fahrenheit);
        assert_eq!(Theme::try_from("Dark").unwrap(), Theme::Dark);
        assert!(Theme::try_from("sepia").is_err());
    }
}
