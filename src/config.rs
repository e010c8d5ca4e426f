//! Static run configuration.
//!
//! Settings are read once at start-up from a file (JSON, TOML or YAML, picked
//! by extension) and may be overridden by `NWS_HISTORY_*` environment
//! variables, with `__` separating nested keys (`NWS_HISTORY_STORE__PATH`).
//! The resulting [`Settings`] value is passed explicitly to every component.

use ::config::{Config, Environment, File};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::{Validate, ValidationError};

use crate::error::{HistoryError, Result};
use crate::readers::validate_station_id;
use crate::store::sqlite::validate_collection_name;
use crate::utils::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_COLLECTION, DEFAULT_OBSERVATION_LIMIT,
    DEFAULT_REQUEST_TIMEOUT_SECS, ENV_PREFIX,
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Settings {
    #[validate(custom(function = "validate_station"))]
    pub station_id: String,

    #[validate(url)]
    pub healthcheck_url: String,

    #[validate(custom(function = "validate_timezone"))]
    pub timezone: String,

    #[validate(nested)]
    pub store: StoreSettings,

    #[serde(default)]
    #[validate(nested)]
    pub api: ApiSettings,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StoreSettings {
    #[validate(length(min = 1))]
    pub path: String,

    #[serde(default = "default_collection")]
    #[validate(custom(function = "validate_collection"))]
    pub collection: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    #[validate(url)]
    pub base_url: String,

    #[serde(default = "default_observation_limit")]
    #[validate(range(min = 1, max = 500))]
    pub observation_limit: u32,

    #[serde(default = "default_timeout_secs")]
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            observation_limit: default_observation_limit(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl StoreSettings {
    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }
}

impl Settings {
    /// Load settings from a file plus environment overrides. A missing file,
    /// a missing required key or a failed validation is an error.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_env_prefix(path, ENV_PREFIX)
    }

    fn load_with_env_prefix(path: &Path, env_prefix: &str) -> Result<Self> {
        if !path.is_file() {
            return Err(HistoryError::Config(format!(
                "Configuration file {} not found",
                path.display()
            )));
        }

        let settings: Settings = Config::builder()
            .add_source(File::from(path).required(true))
            .add_source(
                Environment::with_prefix(env_prefix)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// The configured IANA timezone.
    pub fn tz(&self) -> Result<Tz> {
        parse_timezone(&self.timezone)
    }
}

fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| HistoryError::Config(format!("Unknown timezone '{}': {}", name, e)))
}

fn validate_timezone(name: &str) -> std::result::Result<(), ValidationError> {
    parse_timezone(name)
        .map(|_| ())
        .map_err(|_| ValidationError::new("unknown_timezone"))
}

fn validate_station(station_id: &str) -> std::result::Result<(), ValidationError> {
    validate_station_id(station_id).map_err(|_| ValidationError::new("invalid_station_id"))
}

fn validate_collection(name: &str) -> std::result::Result<(), ValidationError> {
    validate_collection_name(name).map_err(|_| ValidationError::new("invalid_collection_name"))
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_observation_limit() -> u32 {
    DEFAULT_OBSERVATION_LIMIT
}

fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}
