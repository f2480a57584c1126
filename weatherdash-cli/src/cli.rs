use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Confirm, Password, PasswordDisplayMode, Text};
use weatherdash_core::{
    Config, FileStorage, ProviderId, SettingsPatch, StoreError, TemperatureUnit, Theme,
    WeatherStore,
    provider::{default_provider_from_config, provider_from_config},
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherdash", version, about = "Weather dashboard")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// State file to use instead of the platform default.
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    /// Provider to query instead of the configured default.
    #[arg(long, global = true)]
    pub provider: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "weatherapi" or "openweather".
        provider: String,
    },

    #[command(flatten)]
    Store(StoreCommand),
}

/// Commands that read or change the dashboard state.
#[derive(Debug, Subcommand)]
pub enum StoreCommand {
    /// Show current weather for a city or "lat,lon" and remember the search.
    Show {
        /// City name or coordinates; defaults to the configured city.
        query: Option<String>,
    },

    /// Show the daily forecast.
    Forecast {
        /// City name or coordinates; defaults to the configured city.
        query: Option<String>,

        #[arg(long, default_value_t = 3)]
        days: u8,
    },

    /// List recent searches.
    History {
        /// Forget all recent searches.
        #[arg(long)]
        clear: bool,
    },

    /// Manage favorite cities.
    Favorites {
        #[command(subcommand)]
        action: Option<FavoritesAction>,
    },

    /// Show or change settings.
    Settings {
        /// Temperature unit: C or F.
        #[arg(long)]
        unit: Option<String>,

        /// Theme: light or dark.
        #[arg(long, conflicts_with = "toggle_theme")]
        theme: Option<String>,

        #[arg(long)]
        toggle_theme: bool,
    },

    /// Show the dashboard status indicators.
    Status,
}

#[derive(Debug, Subcommand)]
pub enum FavoritesAction {
    List,
    Add { city: String },
    Remove { city: String },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config_path = match &self.config {
            Some(path) => path.clone(),
            None => Config::config_file_path()?,
        };
        let config = Config::load_from(&config_path)?;

        let Cli { provider, state, command, .. } = self;

        match command {
            Command::Configure { provider } => {
                let id = ProviderId::try_from(provider.as_str())?;
                configure(config, &config_path, id)
            }
            Command::Store(command) => {
                let store = open_store(&config, provider.as_deref(), state)?;
                execute(command, &config, &store).await
            }
        }
    }
}

fn open_store(
    config: &Config,
    provider: Option<&str>,
    state: Option<PathBuf>,
) -> anyhow::Result<WeatherStore> {
    let provider = match provider {
        Some(name) => provider_from_config(ProviderId::try_from(name)?, config)?,
        None => default_provider_from_config(config)?,
    };

    let storage = match state {
        Some(path) => FileStorage::new(path),
        None => FileStorage::in_dir(&Config::data_dir()?),
    };
    tracing::debug!(path = %storage.path().display(), "opening store");

    WeatherStore::open(provider, Box::new(storage)).context("Failed to load saved dashboard state")
}

async fn execute(
    command: StoreCommand,
    config: &Config,
    store: &WeatherStore,
) -> anyhow::Result<()> {
    match command {
        StoreCommand::Show { query } => {
            let query = query.unwrap_or_else(|| config.default_city().to_string());
            store.search(&query).await.map_err(fetch_failed)?;

            if let Some(snapshot) = store.current_weather() {
                let unit = store.settings().temperature_unit;
                let favorite = store.is_favorite(&snapshot.location.name);
                println!("{}", render::weather_card(&snapshot, unit, favorite));
            }
        }
        StoreCommand::Forecast { query, days } => {
            let query = query.unwrap_or_else(|| config.default_city().to_string());
            store.fetch_forecast(&query, days).await.map_err(fetch_failed)?;

            if let Some(forecast) = store.forecast() {
                let unit = store.settings().temperature_unit;
                println!("{}", render::forecast_table(&forecast, unit));
            }
        }
        StoreCommand::History { clear } => {
            if clear {
                store.clear_search_history()?;
                println!("Search history cleared.");
            } else {
                let history = store.search_history();
                if history.is_empty() {
                    println!("No recent searches.");
                }
                for city in history {
                    let star = if store.is_favorite(&city) { " ★" } else { "" };
                    println!("{city}{star}");
                }
            }
        }
        StoreCommand::Favorites { action } => match action.unwrap_or(FavoritesAction::List) {
            FavoritesAction::List => {
                let favorites = store.favorites();
                if favorites.is_empty() {
                    println!("No favorites yet.");
                }
                for city in favorites {
                    println!("{city}");
                }
            }
            FavoritesAction::Add { city } => {
                if store.add_to_favorites(&city)? {
                    println!("Added {city} to favorites.");
                } else {
                    println!("{city} is already a favorite.");
                }
            }
            FavoritesAction::Remove { city } => {
                if store.remove_from_favorites(&city)? {
                    println!("Removed {city} from favorites.");
                } else {
                    println!("{city} is not a favorite.");
                }
            }
        },
        StoreCommand::Settings { unit, theme, toggle_theme } => {
            let patch = SettingsPatch {
                temperature_unit: unit.as_deref().map(TemperatureUnit::try_from).transpose()?,
                theme: theme.as_deref().map(Theme::try_from).transpose()?,
            };

            if patch != SettingsPatch::default() {
                store.update_settings(patch)?;
            }
            if toggle_theme {
                store.toggle_theme()?;
            }

            println!("{}", render::settings(&store.settings()));
        }
        StoreCommand::Status => {
            println!("{}", render::status(&store.system_status()));
        }
    }

    Ok(())
}

fn fetch_failed(err: StoreError) -> anyhow::Error {
    let message = err.user_message();
    anyhow::Error::new(err).context(message)
}

fn configure(mut config: Config, path: &std::path::Path, id: ProviderId) -> anyhow::Result<()> {
    println!("Configuring provider: {id}");

    let api_key = Password::new(&format!("API key for {id}:"))
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        anyhow::bail!("API key must not be empty");
    }

    config.upsert_provider_api_key(id, api_key);

    if config.default_provider_id().ok() != Some(id) {
        let make_default = Confirm::new(&format!("Use {id} as the default provider?"))
            .with_default(false)
            .prompt()
            .context("Failed to read answer")?;
        if make_default {
            config.set_default_provider(id);
        }
    }

    let city = Text::new("Default city:")
        .with_default(config.default_city())
        .prompt()
        .context("Failed to read default city")?;
    let city = city.trim();
    if !city.is_empty() {
        config.default_city = Some(city.to_string());
    }

    config.save_to(path)?;
    println!("Saved configuration to {}", path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn configure_is_parsed_apart_from_store_commands() {
        let cli = Cli::try_parse_from(["weatherdash", "configure", "openweather"]).unwrap();
        assert!(matches!(cli.command, Command::Configure { provider } if provider == "openweather"));

        let cli = Cli::try_parse_from(["weatherdash", "show", "Paris"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Store(StoreCommand::Show { query: Some(query) }) if query == "Paris"
        ));
    }

    #[test]
    fn store_commands_keep_their_flags() {
        let cli =
            Cli::try_parse_from(["weatherdash", "--state", "/tmp/s.json", "forecast", "--days", "2"])
                .unwrap();
        assert_eq!(cli.state.as_deref(), Some(std::path::Path::new("/tmp/s.json")));
        assert!(matches!(
            cli.command,
            Command::Store(StoreCommand::Forecast { query: None, days: 2 })
        ));

        let err =
            Cli::try_parse_from(["weatherdash", "settings", "--theme", "dark", "--toggle-theme"]);
        assert!(err.is_err());
    }
}
