//! Settings for the terminal host: server connection, card and locale.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use agenda_core::{CardConfig, HostLocale};
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

static DEFAULT_SERVER_URL: &str = "http://homeassistant.local:8123";
const ENV_PREFIX: &str = "AGENDA";

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_interval_secs() -> u64 {
    300
}

fn default_quiet_ms() -> u64 {
    500
}

/// Settings at ~/.config/agenda/config.toml, overridable with
/// `AGENDA__SECTION__KEY` environment variables.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub card: CardConfig,
    #[serde(default)]
    pub locale: HostLocale,
    #[serde(default)]
    pub watch: WatchSettings,
}

#[derive(Clone, PartialEq, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_server_url")]
    pub url: String,
    /// Long-lived access token
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            url: default_server_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for ServerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerSettings")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ServerSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn token(&self) -> Result<&str> {
        self.token.as_deref().filter(|t| !t.is_empty()).with_context(|| {
            format!(
                "No access token configured.\n\n\
                Create a long-lived token in your Home Assistant profile and set it as\n  \
                [server] token = \"...\"\n\
                in {}, or export {ENV_PREFIX}__SERVER__TOKEN.",
                Settings::default_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "the config file".into())
            )
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WatchSettings {
    /// Seconds between refreshes
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Quiet period that coalesces bursts of changes before refetching
    #[serde(default = "default_quiet_ms")]
    pub quiet_ms: u64,
}

impl Default for WatchSettings {
    fn default() -> Self {
        WatchSettings {
            interval_secs: default_interval_secs(),
            quiet_ms: default_quiet_ms(),
        }
    }
}

impl Settings {
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("agenda");
        Ok(config_dir.join("config.toml"))
    }

    /// `path` with `~` expanded, or the default location.
    pub fn resolve_path(path: Option<&Path>) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(PathBuf::from(
                shellexpand::tilde(&p.to_string_lossy()).into_owned(),
            )),
            None => Self::default_path(),
        }
    }

    /// Load from `path` (or the default location, created on first use),
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path.is_some();
        let path = Self::resolve_path(path)?;
        if !explicit && !path.exists() {
            Self::create_default_config(&path)?;
        }

        let settings: Settings = Config::builder()
            .add_source(File::from(path.as_path()).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("card.entities")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Could not read {}", path.display()))?
            .try_deserialize()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;

        tracing::debug!(?settings, path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Write a starter config file with every option commented out.
    pub fn create_default_config(path: &Path) -> Result<()> {
        let contents = format!(
            "\
# agenda configuration

[server]
# url = \"{DEFAULT_SERVER_URL}\"
# token = \"<long-lived access token>\"
# timeout_secs = 10

[card]
# title = \"Agenda\"
# Calendars to show; earlier entries win when the same event appears twice
# entities = [\"calendar.work\", \"calendar.personal\"]
# today | today_tomorrow | tomorrow | week | this_week
# date_range = \"today\"
# hide_background = false
# hide_when_empty = false
# dedupe = false

[locale]
# 0 = Sunday, 1 = Monday, ... 6 = Saturday (or a name such as \"monday\")
# first_weekday = 1
# local | server
# time_zone = \"local\"
# server_time_zone = \"Europe/Berlin\"
# time_format = \"24\"

[watch]
# interval_secs = 300
# quiet_ms = 500
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Could not create config directory")?;
        }
        std::fs::write(path, contents).context("Could not write config file")?;
        Ok(())
    }
}
