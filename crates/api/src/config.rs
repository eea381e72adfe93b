//! Service Configuration
//!
//! Read from an optional `config/forecast.toml` and then from environment
//! variables (`DB_HOST`, `DB_SOCKET`, `DB_POOL_SIZE`, ...), the latter
//! taking precedence.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use storage::{DatabaseConfig, DatabaseEndpoint, TableConfig};

const DEFAULT_MYSQL_PORT: u16 = 3306;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Process settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Listen address
    #[serde(default = "default_server_addr")]
    pub server_addr: String,
    /// Root of the per-pollutant model directories
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,

    pub db_host: Option<String>,
    pub db_port: Option<u16>,
    /// Unix socket path, preferred over `db_host` when both are set
    pub db_socket: Option<String>,
    pub db_database: Option<String>,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
    #[serde(default = "default_pool_size")]
    pub db_pool_size: u32,

    pub source_table: Option<String>,
    pub forecast_table: Option<String>,
    pub vehicle_flow_column: Option<String>,
}

fn default_server_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("./models")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_pool_size() -> u32 {
    5
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Settings {
    /// Load from `config/forecast.toml` (optional) and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/forecast").required(false))
            .add_source(Environment::default().try_parsing(true))
            .build()?;
        Self::from_config(config)
    }

    /// Deserialize from an already built configuration
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        config.try_deserialize()
    }

    /// Database connection settings; fails when neither socket nor host is set
    pub fn database(&self) -> Result<DatabaseConfig, ConfigError> {
        let endpoint = if let Some(socket) = non_empty(&self.db_socket) {
            DatabaseEndpoint::Socket(PathBuf::from(socket))
        } else if let Some(host) = non_empty(&self.db_host) {
            let (host, port) = match host.rsplit_once(':') {
                Some((name, port)) => match port.parse::<u16>() {
                    Ok(port) => (name.to_string(), port),
                    Err(_) => {
                        return Err(ConfigError::Message(format!("invalid port in DB_HOST: {}", host)))
                    }
                },
                None => (host.to_string(), self.db_port.unwrap_or(DEFAULT_MYSQL_PORT)),
            };
            DatabaseEndpoint::Tcp { host, port }
        } else {
            return Err(ConfigError::Message(
                "database location missing: set DB_SOCKET or DB_HOST".to_string(),
            ));
        };

        let database = non_empty(&self.db_database)
            .ok_or_else(|| ConfigError::Message("DB_DATABASE is not set".to_string()))?;
        let username = non_empty(&self.db_user)
            .ok_or_else(|| ConfigError::Message("DB_USER is not set".to_string()))?;

        Ok(DatabaseConfig {
            endpoint,
            database: database.to_string(),
            username: username.to_string(),
            password: self.db_password.clone(),
            pool_size: self.db_pool_size,
        })
    }

    /// Table names and column mapping
    pub fn tables(&self) -> TableConfig {
        let mut tables = TableConfig::default();
        if let Some(table) = non_empty(&self.source_table) {
            tables.source_table = table.to_string();
        }
        if let Some(table) = non_empty(&self.forecast_table) {
            tables.forecast_table = table.to_string();
        }
        if let Some(column) = non_empty(&self.vehicle_flow_column) {
            tables = tables.with_vehicle_flow_column(column);
        }
        tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let mut builder = Config::builder();
        for (key, value) in pairs {
            builder = builder.set_override(*key, *value).unwrap();
        }
        Settings::from_config(builder.build().unwrap()).unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = settings(&[]);
        assert_eq!(settings.server_addr, "0.0.0.0:8000");
        assert_eq!(settings.models_dir, PathBuf::from("./models"));
        assert_eq!(settings.db_pool_size, 5);
        assert_eq!(settings.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_missing_location_is_fatal() {
        let settings = settings(&[("db_database", "emissions"), ("db_user", "app")]);
        assert!(settings.database().is_err());
    }

    #[test]
    fn test_host_with_port() {
        let settings = settings(&[
            ("db_host", "db.internal:3307"),
            ("db_database", "emissions"),
            ("db_user", "app"),
            ("db_password", "secret"),
        ]);
        let database = settings.database().unwrap();
        assert_eq!(
            database.endpoint,
            DatabaseEndpoint::Tcp {
                host: "db.internal".into(),
                port: 3307
            }
        );
        assert_eq!(database.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_socket_preferred_over_host() {
        let settings = settings(&[
            ("db_host", "localhost"),
            ("db_socket", "/cloudsql/project:region:instance"),
            ("db_database", "emissions"),
            ("db_user", "app"),
            ("db_pool_size", "10"),
        ]);
        let database = settings.database().unwrap();
        assert_eq!(
            database.endpoint,
            DatabaseEndpoint::Socket(PathBuf::from("/cloudsql/project:region:instance"))
        );
        assert_eq!(database.pool_size, 10);
    }

    #[test]
    fn test_table_overrides() {
        let settings = settings(&[
            ("source_table", "readings"),
            ("vehicle_flow_column", "Fluxo_Veiculos"),
            ("log_format", "json"),
        ]);
        let tables = settings.tables();
        assert_eq!(tables.source_table, "readings");
        assert_eq!(tables.forecast_table, "previsoes_poluicao");
        assert_eq!(
            tables.mapping.source(feature_engine::SensorField::VehicleFlow),
            "Fluxo_Veiculos"
        );
        assert_eq!(settings.log_format, LogFormat::Json);
    }
}
