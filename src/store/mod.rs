//! SQLite-backed post store.
//!
//! Posts live in a single table with an identity column and a parent
//! column pointing at the post being replied to. Thread roots are selected
//! with [`SeedQuery`] and their descendants fetched with
//! [`SqliteThreadFetcher`], which walks the parent relation with a
//! recursive common table expression.

mod fetcher;
mod seeds;

pub use fetcher::SqliteThreadFetcher;
pub use seeds::{SeedQuery, DEFAULT_SEED_LIMIT};

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Row;

use crate::error::{Error, Result};
use crate::threading::{Payload, Value};

/// Default identity column.
pub const DEFAULT_ID_COLUMN: &str = "id";

/// Default parent column.
pub const DEFAULT_PARENT_COLUMN: &str = "in_reply_to_status_id";

/// Names of the identity and parent columns of a posts table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadSchema {
    /// Column holding a post's identity
    pub id_column: String,
    /// Column holding the identity of the post replied to
    pub parent_column: String,
}

impl Default for ThreadSchema {
    fn default() -> Self {
        Self {
            id_column: DEFAULT_ID_COLUMN.to_string(),
            parent_column: DEFAULT_PARENT_COLUMN.to_string(),
        }
    }
}

impl ThreadSchema {
    /// Create a schema with custom column names.
    pub fn new(id_column: impl Into<String>, parent_column: impl Into<String>) -> Self {
        Self {
            id_column: id_column.into(),
            parent_column: parent_column.into(),
        }
    }
}

/// Quote a table or column name for use in generated SQL.
///
/// Only plain identifiers (`[A-Za-z_][A-Za-z0-9_]*`) are accepted; anything
/// else is rejected rather than escaped.
pub fn quote_identifier(name: &str) -> Result<String> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(format!("\"{name}\""))
    } else {
        Err(Error::config(format!("invalid SQL identifier '{name}'")))
    }
}

/// Quote every name in `columns`, prefixing each with `qualifier.` if given.
pub(crate) fn quote_columns(columns: &[String], qualifier: Option<&str>) -> Result<Vec<String>> {
    columns
        .iter()
        .map(|column| {
            let quoted = quote_identifier(column)?;
            Ok(match qualifier {
                Some(q) => format!("{q}.{quoted}"),
                None => quoted,
            })
        })
        .collect()
}

/// Read `columns` from `row`, starting at column index `offset`.
pub(crate) fn read_payload(row: &Row<'_>, columns: &[String], offset: usize) -> rusqlite::Result<Payload> {
    let mut payload = Payload::new();
    for (idx, name) in columns.iter().enumerate() {
        let value: Value = row.get(offset + idx)?;
        payload = payload.with(name.as_str(), value);
    }
    Ok(payload)
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            Value::Null => ValueRef::Null,
            Value::Integer(i) => ValueRef::Integer(*i),
            Value::Real(r) => ValueRef::Real(*r),
            Value::Text(s) => ValueRef::Text(s.as_bytes()),
            Value::Blob(b) => ValueRef::Blob(b),
        };
        Ok(ToSqlOutput::Borrowed(value))
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("tweets").unwrap(), "\"tweets\"");
        assert_eq!(quote_identifier("_col2").unwrap(), "\"_col2\"");
        assert!(quote_identifier("").is_err());
        assert!(quote_identifier("2col").is_err());
        assert!(quote_identifier("a b").is_err());
        assert!(quote_identifier("x\"; DROP TABLE t; --").is_err());
    }

    #[test]
    fn test_quote_columns_qualified() {
        let cols = vec!["id".to_string(), "tweet".to_string()];
        assert_eq!(
            quote_columns(&cols, Some("c")).unwrap(),
            vec!["c.\"id\"", "c.\"tweet\""]
        );
    }

    #[test]
    fn test_schema_defaults() {
        let schema = ThreadSchema::default();
        assert_eq!(schema.id_column, "id");
        assert_eq!(schema.parent_column, "in_reply_to_status_id");
    }

    #[test]
    fn test_value_sql_round_trip() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE v (a, b, c, d, e)", []).unwrap();
        conn.execute(
            "INSERT INTO v VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                Value::Null,
                Value::Integer(7),
                Value::Real(0.5),
                Value::from("text"),
                Value::Blob(vec![1, 2])
            ],
        )
        .unwrap();

        let values: Vec<Value> = conn
            .query_row("SELECT a, b, c, d, e FROM v", [], |row| {
                (0..5usize).map(|i| row.get(i)).collect()
            })
            .unwrap();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Integer(7),
                Value::Real(0.5),
                Value::from("text"),
                Value::Blob(vec![1, 2]),
            ]
        );
    }
}
