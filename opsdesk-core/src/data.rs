//! Data-access capability.
//!
//! The engine never issues free-text queries. Every read goes through a named
//! operation with a flat parameter map, and the store answers with JSON rows.

use crate::error::{ConfigError, ConfigResult, DataError, DataResult};
use crate::text::normalize;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// One result row.
pub type Row = serde_json::Map<String, Value>;

/// Named parameters passed to an operation.
pub type Params = serde_json::Map<String, Value>;

/// Suffix of a parameter that bounds a date field from below (inclusive).
pub const FROM_SUFFIX: &str = "_from";

/// Suffix of a parameter that bounds a date field from above (inclusive).
pub const TO_SUFFIX: &str = "_to";

/// The external store, seen as a set of named read operations.
///
/// Parameter conventions shared by every implementation:
/// - `<field>_from` / `<field>_to`: inclusive ISO date bounds on `<field>`
/// - any other string: case and diacritic insensitive containment on `<field>`
/// - numbers and booleans: equality on `<field>`
#[async_trait]
pub trait DataAccess: Send + Sync {
    /// Run `operation` and return its rows.
    async fn execute(&self, operation: &str, params: &Params) -> DataResult<Vec<Row>>;
}

/// Read a numeric cell. Numeric strings are accepted.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a cell as display text.
pub fn value_as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Date prefix (`YYYY-MM-DD`) of a date or datetime cell.
pub fn date_prefix(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) if s.len() >= 10 && s.is_char_boundary(10) => Some(&s[..10]),
        _ => None,
    }
}

/// Fixture-backed data source: one JSON table per operation name.
///
/// Used by the console and by tests. The file format is an object mapping
/// operation names to arrays of row objects.
#[derive(Debug, Clone, Default)]
pub struct StaticDataSource {
    tables: HashMap<String, Vec<Row>>,
}

impl StaticDataSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the table answering `operation`.
    pub fn with_table(mut self, operation: impl Into<String>, rows: Vec<Row>) -> Self {
        self.tables.insert(operation.into(), rows);
        self
    }

    /// Parse `{ "operation": [ {row}, ... ], ... }`.
    pub fn from_json_str(source: &str) -> ConfigResult<Self> {
        let tables: HashMap<String, Vec<Row>> = serde_json::from_str(source)?;
        Ok(Self { tables })
    }

    /// Load a fixture file.
    pub async fn load_json(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json_str(&source)
    }

    /// Names of the operations this source answers.
    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

#[async_trait]
impl DataAccess for StaticDataSource {
    async fn execute(&self, operation: &str, params: &Params) -> DataResult<Vec<Row>> {
        let table = self
            .tables
            .get(operation)
            .ok_or_else(|| DataError::UnknownOperation(operation.to_string()))?;

        Ok(table
            .iter()
            .filter(|row| params.iter().all(|(key, value)| row_matches(row, key, value)))
            .cloned()
            .collect())
    }
}

fn row_matches(row: &Row, key: &str, expected: &Value) -> bool {
    if let Some(field) = key.strip_suffix(FROM_SUFFIX) {
        return compare_date(row, field, expected, |cell, bound| cell >= bound);
    }
    if let Some(field) = key.strip_suffix(TO_SUFFIX) {
        return compare_date(row, field, expected, |cell, bound| cell <= bound);
    }

    let Some(cell) = row.get(key) else {
        return false;
    };

    match expected {
        Value::String(needle) => normalize(&value_as_text(cell)).contains(&normalize(needle)),
        Value::Number(_) => match (value_as_f64(cell), value_as_f64(expected)) {
            (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
            _ => false,
        },
        other => cell == other,
    }
}

fn compare_date(row: &Row, field: &str, bound: &Value, keep: impl Fn(&str, &str) -> bool) -> bool {
    match (row.get(field).and_then(date_prefix), bound.as_str()) {
        (Some(cell), Some(bound)) => keep(cell, bound),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    fn source() -> StaticDataSource {
        StaticDataSource::new().with_table(
            "clientes",
            vec![
                row(json!({"nome": "Construtora Silva", "ativo": true, "criado_em": "2026-10-02"})),
                row(json!({"nome": "Padaria São João", "ativo": false, "criado_em": "2026-09-15T10:00:00"})),
                row(json!({"nome": "Silvana Reparos", "ativo": true, "criado_em": "2025-01-20"})),
            ],
        )
    }

    #[tokio::test]
    async fn test_string_filters_fold_case_and_accents() {
        let rows = source()
            .execute("clientes", &params(json!({"nome": "SAO JOAO"})))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);

        let rows = source()
            .execute("clientes", &params(json!({"nome": "silva"})))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_bool_and_date_filters() {
        let rows = source()
            .execute(
                "clientes",
                &params(json!({"ativo": true, "criado_em_from": "2026-01-01", "criado_em_to": "2026-12-31"})),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["nome"], "Construtora Silva");
    }

    #[tokio::test]
    async fn test_unknown_operation() {
        let err = source().execute("nope", &Params::new()).await.unwrap_err();
        assert!(matches!(err, DataError::UnknownOperation(_)));
    }

    #[test]
    fn test_fixture_parsing() {
        let src = StaticDataSource::from_json_str(r#"{"produtos": [{"nome": "Cabo"}]}"#).unwrap();
        assert_eq!(src.operations().collect::<Vec<_>>(), vec!["produtos"]);
    }

    #[test]
    fn test_value_helpers() {
        assert_eq!(value_as_f64(&json!(12.5)), Some(12.5));
        assert_eq!(value_as_f64(&json!("7")), Some(7.0));
        assert_eq!(value_as_f64(&json!(null)), None);
        assert_eq!(value_as_text(&json!("x")), "x");
        assert_eq!(value_as_text(&json!(3)), "3");
        assert_eq!(date_prefix(&json!("2026-10-19T08:00:00")), Some("2026-10-19"));
        assert_eq!(date_prefix(&json!("10/2026")), None);
    }
}
