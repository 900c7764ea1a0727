use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use url::Url;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub migration: MigrationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: u64,
    pub create_if_missing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Locale every product page should end up in.
    pub target_locale: String,
    pub transfer_batch_size: usize,
    pub short_description_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<String>,
}

impl AppConfig {
    /// Layers built-in defaults, `config/default`, `config/{RUN_MODE}`,
    /// `config/local`, an optional explicit file and `CATALOG__*` variables.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            .set_default("database.url", "sqlite://data/catalog.db")?
            .set_default("database.max_connections", 1_i64)?
            .set_default("database.acquire_timeout", 30_i64)?
            .set_default("database.create_if_missing", true)?
            .set_default("migration.target_locale", "tr")?
            .set_default("migration.transfer_batch_size", 10_i64)?
            .set_default("migration.short_description_limit", 50_i64)?
            .set_default("logging.level", "info")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add local config (ignored by git)
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config: AppConfig = builder
            .add_source(Environment::with_prefix("CATALOG").separator("__"))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate database configuration
        match Url::parse(&self.database.url) {
            Ok(url) if url.scheme() == "sqlite" => {}
            _ => {
                return Err(ConfigError::Message(
                    "Database url must be a sqlite URL".into(),
                ))
            }
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Message(
                "Database max_connections must be greater than 0".into(),
            ));
        }

        // Validate migration configuration
        if self.migration.target_locale.trim().is_empty() {
            return Err(ConfigError::Message(
                "Migration target_locale must not be empty".into(),
            ));
        }

        if self.migration.transfer_batch_size == 0 {
            return Err(ConfigError::Message(
                "Migration transfer_batch_size must be greater than 0".into(),
            ));
        }

        if self.migration.short_description_limit == 0 {
            return Err(ConfigError::Message(
                "Migration short_description_limit must be greater than 0".into(),
            ));
        }

        // Validate logging configuration
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Message(format!(
                "Unknown logging level '{}'",
                self.logging.level
            )));
        }

        Ok(())
    }
}
