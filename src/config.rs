use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    /// How long a meet stays active after it is formed
    #[serde(default = "default_meet_lifetime_ms")]
    pub meet_lifetime_ms: u64,
}

impl MatchingSettings {
    pub fn meet_lifetime(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(i64::try_from(self.meet_lifetime_ms).unwrap_or(i64::MAX))
    }
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            meet_lifetime_ms: default_meet_lifetime_ms(),
        }
    }
}

// Three days
fn default_meet_lifetime_ms() -> u64 { 259_200_000 }

/// Upper bound for `meet_lifetime_ms`: one year
pub const MAX_MEET_LIFETIME_MS: u64 = 31_536_000_000;

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with MEET__, `.env` honoured)
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., MEET__MATCHING__MEET_LIFETIME_MS -> matching.meet_lifetime_ms
            .add_source(env_source())
            .build()?;

        settings.try_deserialize::<Self>()?.validated()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(env_source())
            .build()?;

        settings.try_deserialize::<Self>()?.validated()
    }

    /// Parse settings from an inline TOML document, without env overrides
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        // Surface syntax errors with toml's positions before handing off
        toml::from_str::<toml::Value>(source).map_err(|e| ConfigError::Message(e.to_string()))?;

        let settings = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?;

        settings.try_deserialize::<Self>()?.validated()
    }

    fn validated(self) -> Result<Self, ConfigError> {
        let lifetime = self.matching.meet_lifetime_ms;
        if lifetime == 0 {
            return Err(ConfigError::Message(
                "matching.meet_lifetime_ms must be greater than zero".to_string(),
            ));
        }
        if lifetime > MAX_MEET_LIFETIME_MS {
            return Err(ConfigError::Message(format!(
                "matching.meet_lifetime_ms must not exceed {} (one year), got {}",
                MAX_MEET_LIFETIME_MS, lifetime
            )));
        }
        Ok(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            matching: MatchingSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("MEET")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
