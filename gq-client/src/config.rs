//! Client configuration

use std::path::PathBuf;

use reqwest::Url;
use serde::{Deserialize, Deserializer};
use tracing_subscriber::filter::Directive;

use crate::storage::{self, FileStorage};

/// Endpoint used when none is configured
const DEFAULT_ENDPOINT: &str = "http://localhost:5000/";

/// Logging output format
#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Logging {
    /// Additional filtering directives
    #[serde(default, deserialize_with = "Logging::deserialize_filters")]
    pub filters: Vec<Directive>,

    /// Logging format
    #[serde(default)]
    pub format: LogFormat,
}

impl Logging {
    fn deserialize_filters<'de, D>(deserializer: D) -> Result<Vec<Directive>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let dirs: Vec<String> = Deserialize::deserialize(deserializer)?;
        dirs.into_iter()
            .map(|dir| dir.parse().map_err(serde::de::Error::custom))
            .collect()
    }
}

/// Token storage configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Storage {
    /// Base directory for stored data, the platform local data directory by default
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Storage {
    /// Opens the storage for the given API endpoint
    pub fn open(&self, endpoint: &Url) -> Result<FileStorage, storage::Error> {
        let base = match &self.dir {
            Some(dir) => dir.clone(),
            None => dirs::data_local_dir()
                .ok_or(storage::Error::Disabled)?
                .join(env!("CARGO_PKG_NAME")),
        };

        Ok(FileStorage::for_origin(base, endpoint))
    }
}

/// Top level client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// GraphQL API endpoint
    #[serde(
        default = "Config::default_endpoint",
        deserialize_with = "Config::deserialize_endpoint"
    )]
    pub endpoint: Url,

    /// Token storage configuration
    #[serde(default)]
    pub storage: Storage,

    /// Logging configuration
    #[serde(default)]
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            storage: Storage::default(),
            logging: Logging::default(),
        }
    }
}

impl Config {
    fn default_endpoint() -> Url {
        Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL")
    }

    fn deserialize_endpoint<'de, D>(deserializer: D) -> Result<Url, D::Error>
    where
        D: Deserializer<'de>,
    {
        let url: String = Deserialize::deserialize(deserializer)?;
        url.parse().map_err(serde::de::Error::custom)
    }
}
