//! Database Configuration

use crate::StorageError;
use feature_engine::{FieldMapping, SensorField};
use serde::{Deserialize, Serialize};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use std::path::PathBuf;
use tracing::info;

/// Where the MySQL server listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseEndpoint {
    Tcp { host: String, port: u16 },
    Socket(PathBuf),
}

/// Connection settings
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub endpoint: DatabaseEndpoint,
    pub database: String,
    pub username: String,
    pub password: Option<String>,
    /// Upper bound on concurrently open connections
    pub pool_size: u32,
}

impl DatabaseConfig {
    /// Connect options for this configuration
    pub fn connect_options(&self) -> MySqlConnectOptions {
        let options = MySqlConnectOptions::new()
            .username(&self.username)
            .database(&self.database);

        let options = match &self.endpoint {
            DatabaseEndpoint::Tcp { host, port } => options.host(host).port(*port),
            DatabaseEndpoint::Socket(path) => options.socket(path),
        };

        match &self.password {
            Some(password) => options.password(password),
            None => options,
        }
    }

    /// Open the connection pool, failing if the server is unreachable
    pub async fn connect(&self) -> Result<MySqlPool, StorageError> {
        if self.pool_size == 0 {
            return Err(StorageError::InvalidConfig("pool size must be at least 1".into()));
        }
        match &self.endpoint {
            DatabaseEndpoint::Tcp { host, port } => {
                info!("Connecting to MySQL at {}:{} (pool size {})", host, port, self.pool_size)
            }
            DatabaseEndpoint::Socket(path) => {
                info!("Connecting to MySQL via {} (pool size {})", path.display(), self.pool_size)
            }
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(self.pool_size)
            .connect_with(self.connect_options())
            .await?;
        Ok(pool)
    }
}

/// Table names and source column mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Emissions readings
    pub source_table: String,
    /// Forecast output
    pub forecast_table: String,
    /// Canonical field to source column table
    pub mapping: FieldMapping,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            source_table: "cetesb_emissions_vehicles_osasco".to_string(),
            forecast_table: "previsoes_poluicao".to_string(),
            mapping: FieldMapping::default(),
        }
    }
}

impl TableConfig {
    /// Use a different source column for the vehicle count
    pub fn with_vehicle_flow_column(mut self, column: impl Into<String>) -> Self {
        self.mapping = self.mapping.with_source(SensorField::VehicleFlow, column);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tables() {
        let tables = TableConfig::default();
        assert_eq!(tables.source_table, "cetesb_emissions_vehicles_osasco");
        assert_eq!(tables.forecast_table, "previsoes_poluicao");
        assert_eq!(tables.mapping.source(SensorField::VehicleFlow), "vehicles");
    }

    #[test]
    fn test_vehicle_flow_override() {
        let tables = TableConfig::default().with_vehicle_flow_column("Fluxo_Veiculos");
        assert_eq!(tables.mapping.source(SensorField::VehicleFlow), "Fluxo_Veiculos");
    }

    #[tokio::test]
    async fn test_zero_pool_rejected() {
        let config = DatabaseConfig {
            endpoint: DatabaseEndpoint::Tcp {
                host: "localhost".into(),
                port: 3306,
            },
            database: "emissions".into(),
            username: "forecast".into(),
            password: None,
            pool_size: 0,
        };
        assert!(matches!(config.connect().await, Err(StorageError::InvalidConfig(_))));
    }
}
