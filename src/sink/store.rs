//! Persisted-table output.

use rusqlite::{params_from_iter, Connection};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::store::{quote_columns, quote_identifier};
use crate::threading::{NestedSequence, NodeRecord, Value};

use super::OutputSink;

/// Appends threads to a SQLite table, one transaction per thread.
///
/// Each record becomes one row: the projected columns followed by `depth`,
/// `path`, `is_seed`, `seed_id` and `order_id`. The seed row has depth 1 and
/// its own identity as path. `order_id` comes from a counter owned by the
/// sink that runs across every thread of the run and is never reset.
///
/// A thread is committed after its last row. If any insert fails the
/// thread's transaction rolls back, earlier threads stay committed, and the
/// counter returns to where it was before the thread.
pub struct StoreSink {
    conn: Connection,
    table: String,
    columns: Vec<String>,
    next_order_id: i64,
}

impl StoreSink {
    /// Create a sink writing `columns` to `table`, numbering rows from 0.
    pub fn new(conn: Connection, table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            conn,
            table: table.into(),
            columns,
            next_order_id: 0,
        }
    }

    /// Number rows starting at `order_id`, e.g. to continue an earlier run.
    pub fn starting_at(mut self, order_id: i64) -> Self {
        self.next_order_id = order_id;
        self
    }

    /// Create the output table if it does not exist.
    pub fn ensure_table(&self) -> Result<()> {
        let table = quote_identifier(&self.table)?;
        let columns = quote_columns(&self.columns, None)?;

        let mut definition: Vec<String> = columns;
        definition.extend(
            [
                "depth INTEGER",
                "path TEXT",
                "is_seed INTEGER",
                "seed_id INTEGER",
                "order_id INTEGER",
            ]
            .map(String::from),
        );

        self.conn.execute(
            &format!("CREATE TABLE IF NOT EXISTS {table} ({})", definition.join(", ")),
            [],
        )?;
        Ok(())
    }

    /// The `order_id` the next row will receive.
    pub fn next_order_id(&self) -> i64 {
        self.next_order_id
    }

    /// Get the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Consume the sink, returning the connection.
    pub fn into_connection(self) -> Connection {
        self.conn
    }

    fn insert_sql(&self) -> Result<String> {
        let table = quote_identifier(&self.table)?;
        let mut columns = quote_columns(&self.columns, None)?;
        columns.extend(["depth", "path", "is_seed", "seed_id", "order_id"].map(String::from));

        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        Ok(format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        ))
    }

    fn row_values(
        &self,
        record: &NodeRecord,
        is_seed: bool,
        seed_id: i64,
        order_id: i64,
    ) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(self.columns.len() + 5);
        for column in &self.columns {
            let value = record.field(column).ok_or_else(|| Error::MissingColumn {
                column: column.clone(),
                node: record.id(),
            })?;
            values.push(value.clone());
        }
        values.push(Value::Integer(i64::from(record.depth())));
        values.push(Value::from(record.path()));
        values.push(Value::Integer(i64::from(is_seed)));
        values.push(Value::Integer(seed_id));
        values.push(Value::Integer(order_id));
        Ok(values)
    }
}

impl OutputSink for StoreSink {
    fn accept(&mut self, root: &NodeRecord, nested: &NestedSequence) -> Result<()> {
        let sql = self.insert_sql()?;
        let seed_id = root.id();
        let mut order_id = self.next_order_id;

        // Build every row first so a missing column never opens a transaction
        let mut rows = Vec::with_capacity(nested.len() + 1);
        rows.push(self.row_values(root, true, seed_id, order_id)?);
        order_id += 1;
        for record in nested {
            rows.push(self.row_values(record, false, seed_id, order_id)?);
            order_id += 1;
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&sql)?;
            for row in &rows {
                stmt.execute(params_from_iter(row))?;
            }
        }
        tx.commit()?;

        trace!(seed = seed_id, rows = rows.len(), "committed thread");
        self.next_order_id = order_id;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        debug!(table = %self.table, next_order_id = self.next_order_id, "store sink finished");
        Ok(())
    }
}
