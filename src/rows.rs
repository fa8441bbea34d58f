use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use crate::error::PgBindError;
use crate::types::RowValues;

/// A single row from a query result.
///
/// Column names are shared across all rows of a result set.
#[derive(Debug, Clone)]
pub struct DbRow {
    column_names: Arc<Vec<String>>,
    column_index: Arc<HashMap<String, usize>>,
    values: Vec<RowValues>,
}

impl DbRow {
    /// Get a value from the row by column name.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.column_index
            .get(column_name)
            .and_then(|&idx| self.values.get(idx))
    }

    /// Get a value from the row by column index.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    /// Column names, in result order.
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Consume the row into `(column_name, value)` pairs in result order.
    pub(crate) fn into_columns(self) -> impl Iterator<Item = (String, RowValues)> {
        let names = self.column_names;
        self.values
            .into_iter()
            .enumerate()
            .map(move |(i, v)| (names.get(i).cloned().unwrap_or_default(), v))
    }
}

/// Materialized rows from one query execution, the row cursor the mapper
/// consumes.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub rows: Vec<DbRow>,
    column_names: Arc<Vec<String>>,
    column_index: Arc<HashMap<String, usize>>,
}

impl ResultSet {
    /// Create an empty result set with the given column names.
    #[must_use]
    pub fn new(column_names: Vec<String>) -> ResultSet {
        let column_index = Arc::new(
            column_names
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), i))
                .collect::<HashMap<_, _>>(),
        );
        ResultSet {
            rows: Vec::new(),
            column_names: Arc::new(column_names),
            column_index,
        }
    }

    /// Append a row; values must be in column order.
    pub fn add_row(&mut self, values: Vec<RowValues>) {
        self.rows.push(DbRow {
            column_names: self.column_names.clone(),
            column_index: self.column_index.clone(),
            values,
        });
    }

    /// Number of rows in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the set holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Build a [`ResultSet`] from driver rows.
///
/// # Errors
/// Returns an error if a column value cannot be extracted.
pub fn build_result_set(rows: &[tokio_postgres::Row]) -> Result<ResultSet, PgBindError> {
    let column_names: Vec<String> = rows.first().map_or_else(Vec::new, |row| {
        row.columns().iter().map(|c| c.name().to_string()).collect()
    });
    let column_count = column_names.len();

    let mut result_set = ResultSet::new(column_names);
    for row in rows {
        let mut values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            values.push(extract_value(row, idx)?);
        }
        result_set.add_row(values);
    }

    Ok(result_set)
}

/// Extract one column of a driver row as a [`RowValues`].
///
/// # Errors
/// Returns an error if the driver cannot decode the column.
pub fn extract_value(row: &tokio_postgres::Row, idx: usize) -> Result<RowValues, PgBindError> {
    let type_name = row.columns()[idx].type_().name();

    match type_name {
        "int2" => {
            let val: Option<i16> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))))
        }
        "int4" => {
            let val: Option<i32> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))))
        }
        "int8" => {
            let val: Option<i64> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Int))
        }
        "float4" | "float8" => {
            let val: Option<f64> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Float))
        }
        "bool" => {
            let val: Option<bool> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Bool))
        }
        "timestamp" | "timestamptz" => {
            let val: Option<NaiveDateTime> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Timestamp))
        }
        "json" | "jsonb" => {
            let val: Option<JsonValue> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::JSON))
        }
        "bytea" => {
            let val: Option<Vec<u8>> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Blob))
        }
        // Everything else is fetched as text.
        _ => {
            let val: Option<String> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Text))
        }
    }
}
