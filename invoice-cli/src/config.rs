use std::path::{Path, PathBuf};

use invoice_core::db::DbConfig;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_BACKEND: &str = "sqlite";
pub const DEFAULT_DATABASE: &str = "invoices.db";
pub const DEFAULT_CURRENCY_SYMBOL: &str = "€";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read settings file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Optional settings, as read from a TOML file or collected from flags.
///
/// ```toml
/// backend = "sqlite"
/// database = "invoices.db"
/// currency_symbol = "€"
/// log_level = "warn"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub backend: Option<String>,
    pub database: Option<String>,
    pub currency_symbol: Option<String>,
    pub log_level: Option<String>,
}

impl Settings {
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Values set here win; unset ones are taken from `lower`.
    pub fn layered_over(self, lower: Settings) -> Settings {
        Settings {
            backend: self.backend.or(lower.backend),
            database: self.database.or(lower.database),
            currency_symbol: self.currency_symbol.or(lower.currency_symbol),
            log_level: self.log_level.or(lower.log_level),
        }
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            backend: self
                .backend
                .clone()
                .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
            connection_string: self
                .database
                .clone()
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
        }
    }

    pub fn currency_symbol(&self) -> &str {
        self.currency_symbol
            .as_deref()
            .unwrap_or(DEFAULT_CURRENCY_SYMBOL)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}
