//! MySQL Repository

use crate::config::{DatabaseConfig, TableConfig};
use crate::{ForecastRecord, ForecastStore, ForecastTx, StorageError};
use chrono::NaiveDateTime;
use feature_engine::{SensorField, SensorRecord};
use sqlx::mysql::{MySqlPool, MySqlRow};
use sqlx::{MySql, Row, Transaction};
use std::sync::Arc;
use tracing::{debug, info};

/// SQL text built once from the table configuration
#[derive(Debug)]
struct Statements {
    select_recent: String,
    insert_forecast: String,
}

impl Statements {
    fn build(tables: &TableConfig) -> Result<Self, StorageError> {
        let columns = tables
            .mapping
            .pairs()
            .map(|(field, source)| {
                let column = quote_ident(source)?;
                let alias = quote_ident(field.as_str())?;
                // DECIMAL and integer columns arrive as DOUBLE
                if field.is_measurement() {
                    Ok(format!("CAST({} AS DOUBLE) AS {}", column, alias))
                } else {
                    Ok(format!("{} AS {}", column, alias))
                }
            })
            .collect::<Result<Vec<_>, StorageError>>()?
            .join(", ");
        let created_at = quote_ident(tables.mapping.source(SensorField::CreatedAt))?;

        let select_recent = format!(
            "SELECT {} FROM {} WHERE {} < ? ORDER BY {} DESC LIMIT ?",
            columns,
            quote_ident(&tables.source_table)?,
            created_at,
            created_at,
        );
        let insert_forecast = format!(
            "INSERT INTO {} (id_registro_base, previsao_co_t1, previsao_co_t2, previsao_co_t3, data_previsao) \
             VALUES (?, ?, ?, ?, ?)",
            quote_ident(&tables.forecast_table)?,
        );

        Ok(Self {
            select_recent,
            insert_forecast,
        })
    }
}

/// Backtick-quote an identifier, allowing only `[A-Za-z0-9_]`
fn quote_ident(name: &str) -> Result<String, StorageError> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(StorageError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("`{}`", name))
}

fn read_id(row: &MySqlRow, column: &str) -> Result<i64, sqlx::Error> {
    match row.try_get::<i64, _>(column) {
        Ok(id) => Ok(id),
        Err(_) => {
            let id = row.try_get::<u64, _>(column)?;
            i64::try_from(id).map_err(|e| sqlx::Error::Decode(Box::new(e)))
        }
    }
}

fn sensor_from_row(row: &MySqlRow) -> Result<SensorRecord, sqlx::Error> {
    Ok(SensorRecord {
        id: read_id(row, SensorField::Id.as_str())?,
        mp10: row.try_get(SensorField::Mp10.as_str())?,
        mp25: row.try_get(SensorField::Mp25.as_str())?,
        co: row.try_get(SensorField::Co.as_str())?,
        nox: row.try_get(SensorField::Nox.as_str())?,
        vehicle_flow: row.try_get(SensorField::VehicleFlow.as_str())?,
        created_at: row.try_get(SensorField::CreatedAt.as_str())?,
    })
}

/// Repository backed by a MySQL connection pool
#[derive(Debug, Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
    statements: Arc<Statements>,
}

impl MySqlRepository {
    /// Connect the pool and prepare statements
    pub async fn connect(config: &DatabaseConfig, tables: &TableConfig) -> Result<Self, StorageError> {
        let statements = Statements::build(tables)?;
        let pool = config.connect().await?;
        info!("MySQL pool ready (source {}, forecasts {})", tables.source_table, tables.forecast_table);
        Ok(Self {
            pool,
            statements: Arc::new(statements),
        })
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl ForecastStore for MySqlRepository {
    type Tx = MySqlForecastTx;

    async fn begin(&self) -> Result<MySqlForecastTx, StorageError> {
        let tx = self.pool.begin().await?;
        Ok(MySqlForecastTx {
            tx,
            statements: Arc::clone(&self.statements),
        })
    }
}

/// Transaction on one pooled connection; rolls back when dropped uncommitted
pub struct MySqlForecastTx {
    tx: Transaction<'static, MySql>,
    statements: Arc<Statements>,
}

impl ForecastTx for MySqlForecastTx {
    async fn fetch_recent(
        &mut self,
        before: NaiveDateTime,
        limit: usize,
    ) -> Result<Vec<SensorRecord>, StorageError> {
        let rows = sqlx::query(&self.statements.select_recent)
            .bind(before)
            .bind(limit as u64)
            .fetch_all(&mut *self.tx)
            .await?;
        debug!("Fetched {} readings before {}", rows.len(), before);

        let records = rows
            .iter()
            .map(sensor_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    async fn persist_forecast(&mut self, record: &ForecastRecord) -> Result<(), StorageError> {
        sqlx::query(&self.statements.insert_forecast)
            .bind(record.base_id)
            .bind(record.t1)
            .bind(record.t2)
            .bind(record.t3)
            .bind(record.base_timestamp)
            .execute(&mut *self.tx)
            .await?;
        debug!("Staged forecast for base reading {}", record.base_id);
        Ok(())
    }

    async fn commit(self) -> Result<(), StorageError> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_statement() {
        let statements = Statements::build(&TableConfig::default()).unwrap();
        assert_eq!(
            statements.select_recent,
            "SELECT `id` AS `id`, CAST(`mp10` AS DOUBLE) AS `mp10`, CAST(`mp25` AS DOUBLE) AS `mp25`, \
             CAST(`co` AS DOUBLE) AS `co`, CAST(`nox` AS DOUBLE) AS `nox`, \
             CAST(`vehicles` AS DOUBLE) AS `vehicle_flow`, `created_at` AS `created_at` \
             FROM `cetesb_emissions_vehicles_osasco` \
             WHERE `created_at` < ? ORDER BY `created_at` DESC LIMIT ?"
        );
    }

    #[test]
    fn test_insert_statement() {
        let statements = Statements::build(&TableConfig::default()).unwrap();
        assert_eq!(
            statements.insert_forecast,
            "INSERT INTO `previsoes_poluicao` \
             (id_registro_base, previsao_co_t1, previsao_co_t2, previsao_co_t3, data_previsao) \
             VALUES (?, ?, ?, ?, ?)"
        );
    }

    #[test]
    fn test_identifiers_validated() {
        let tables = TableConfig {
            source_table: "readings; DROP TABLE x".into(),
            ..Default::default()
        };
        assert!(matches!(
            Statements::build(&tables),
            Err(StorageError::InvalidIdentifier(_))
        ));

        let tables = TableConfig::default().with_vehicle_flow_column("");
        assert!(Statements::build(&tables).is_err());
    }
}
