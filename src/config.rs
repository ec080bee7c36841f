//! Application-level configuration loading: team color palette and default game rules.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

use crate::state::game::GameConfig;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "PARTY_TRIVIA_CONFIG_PATH";
/// Built-in palette, assigned to teams in creation order.
const DEFAULT_COLORS: [&str; 8] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#FFA07A", "#98D8C8", "#F7DC6F", "#BB8FCE", "#85C1E2",
];

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    colors: Vec<String>,
    game: GameConfig,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        colors = app_config.colors.len(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Color of the `index`-th team created in a session, cycling through the palette.
    pub fn team_color(&self, index: usize) -> String {
        self.colors[index % self.colors.len()].clone()
    }

    /// Rules a new session starts with.
    pub fn game_defaults(&self) -> GameConfig {
        self.game.clone()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            colors: default_colors(),
            game: GameConfig::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    colors: Vec<String>,
    game: Option<GameConfig>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let colors: Vec<String> = value
            .colors
            .into_iter()
            .map(|color| color.trim().to_string())
            .filter(|color| !color.is_empty())
            .collect();
        let colors = if colors.is_empty() {
            default_colors()
        } else {
            colors
        };

        let game = match value.game {
            Some(game) => match game.validate() {
                Ok(()) => game,
                Err(err) => {
                    warn!(error = %err, "invalid default game rules; using built-in rules");
                    GameConfig::default()
                }
            },
            None => GameConfig::default(),
        };

        Self { colors, game }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn default_colors() -> Vec<String> {
    DEFAULT_COLORS.iter().map(|color| color.to_string()).collect()
}
