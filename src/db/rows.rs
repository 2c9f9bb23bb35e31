//! Row rendering and parameter binding.
//!
//! Result sets are always fetched over the text protocol, so every cell
//! arrives as its textual form and is classified by the column's declared
//! type.

use serde_json::{Map, Number, Value};
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, MySql, Row, TypeInfo};

/// One result row keyed by column name, in column order.
pub type JsonRow = Map<String, Value>;

/// Column names of a row, in order.
pub fn column_names(row: &MySqlRow) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

/// Render a full row as a JSON object.
pub fn row_to_json(row: &MySqlRow) -> JsonRow {
    row.columns()
        .iter()
        .map(|column| {
            let ordinal = column.ordinal();
            let kind = CellKind::of(column.type_info().name());
            (column.name().to_string(), kind.render(text(row, ordinal)))
        })
        .collect()
}

/// Textual value of a cell; `None` for SQL NULL. Non-UTF-8 bytes are
/// replaced lossily.
pub fn text(row: &MySqlRow, index: usize) -> Option<String> {
    match row.try_get_unchecked::<Option<String>, _>(index) {
        Ok(value) => value,
        Err(_) => row
            .try_get_unchecked::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Signed,
    Unsigned,
    Float,
    Json,
    Text,
}

impl CellKind {
    fn of(type_name: &str) -> Self {
        let upper = type_name.to_ascii_uppercase();
        if upper.contains("INT") || upper == "YEAR" || upper == "BOOLEAN" {
            if upper.contains("UNSIGNED") {
                CellKind::Unsigned
            } else {
                CellKind::Signed
            }
        } else if upper.contains("FLOAT") || upper.contains("DOUBLE") {
            CellKind::Float
        } else if upper == "JSON" {
            CellKind::Json
        } else {
            CellKind::Text
        }
    }

    fn render(self, raw: Option<String>) -> Value {
        let Some(raw) = raw else {
            return Value::Null;
        };
        let parsed = match self {
            CellKind::Signed => raw.parse::<i64>().ok().map(Value::from),
            CellKind::Unsigned => raw.parse::<u64>().ok().map(Value::from),
            CellKind::Float => raw
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
            CellKind::Json => serde_json::from_str(&raw).ok(),
            CellKind::Text => None,
        };
        parsed.unwrap_or(Value::String(raw))
    }
}

/// Bind a JSON value as a statement parameter.
///
/// Arrays and objects are stored as their JSON text.
pub fn bind_json<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(u) = n.as_u64() {
                query.bind(u)
            } else {
                query.bind(n.as_f64())
            }
        }
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}

/// Render a value for log lines and messages, without JSON quoting for strings.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
