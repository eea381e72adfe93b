//! Source Column Mapping
//!
//! The source table does not always use the canonical field names (the
//! vehicle count lives in a column called `vehicles`). Every canonical field
//! is mapped to its source column through this table, and the mapping is
//! applied unconditionally when rows are selected.

use serde::{Deserialize, Serialize};

/// Canonical fields of a [`SensorRecord`](crate::SensorRecord)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorField {
    Id,
    Mp10,
    Mp25,
    Co,
    Nox,
    VehicleFlow,
    CreatedAt,
}

impl SensorField {
    /// All fields in select order
    pub const ALL: [SensorField; 7] = [
        SensorField::Id,
        SensorField::Mp10,
        SensorField::Mp25,
        SensorField::Co,
        SensorField::Nox,
        SensorField::VehicleFlow,
        SensorField::CreatedAt,
    ];

    /// Canonical column alias
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorField::Id => "id",
            SensorField::Mp10 => "mp10",
            SensorField::Mp25 => "mp25",
            SensorField::Co => "co",
            SensorField::Nox => "nox",
            SensorField::VehicleFlow => "vehicle_flow",
            SensorField::CreatedAt => "created_at",
        }
    }

    /// Pollutant and traffic readings, as opposed to the row id and time
    pub fn is_measurement(&self) -> bool {
        !matches!(self, SensorField::Id | SensorField::CreatedAt)
    }
}

/// Canonical field to source column table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    columns: Vec<(SensorField, String)>,
}

impl Default for FieldMapping {
    fn default() -> Self {
        let columns = SensorField::ALL
            .iter()
            .map(|field| {
                let source = match field {
                    SensorField::VehicleFlow => "vehicles",
                    other => other.as_str(),
                };
                (*field, source.to_string())
            })
            .collect();
        Self { columns }
    }
}

impl FieldMapping {
    /// Override the source column for one field
    pub fn with_source(mut self, field: SensorField, column: impl Into<String>) -> Self {
        let column = column.into();
        if let Some(entry) = self.columns.iter_mut().find(|(f, _)| *f == field) {
            entry.1 = column;
        }
        self
    }

    /// Source column for a field
    pub fn source(&self, field: SensorField) -> &str {
        self.columns
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, column)| column.as_str())
            .unwrap_or_else(|| field.as_str())
    }

    /// `(field, source column)` pairs in select order
    pub fn pairs(&self) -> impl Iterator<Item = (SensorField, &str)> + '_ {
        SensorField::ALL
            .iter()
            .map(move |field| (*field, self.source(*field)))
    }
}
