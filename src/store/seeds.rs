//! Seed (thread root) selection.

use rusqlite::Connection;
use tracing::info;

use crate::error::{Error, Result};
use crate::threading::NodeRecord;

use super::{quote_columns, quote_identifier, read_payload, ThreadSchema};

/// Default number of seeds selected per run.
pub const DEFAULT_SEED_LIMIT: u32 = 500;

/// Resolution of the random sampling predicate.
const SAMPLE_SCALE: f64 = 1_000_000.0;

/// Selects thread roots from a posts table.
///
/// Builds `SELECT <id>, <columns> FROM <table> [WHERE ...] [LIMIT n]`, where
/// the predicate combines an optional caller-supplied SQL condition with an
/// optional random sample of a percentage of rows. The identity column is
/// not repeated when `columns` already starts with it.
#[derive(Debug, Clone)]
pub struct SeedQuery {
    table: String,
    columns: Vec<String>,
    schema: ThreadSchema,
    condition: Option<String>,
    limit: Option<u32>,
    random_percent: Option<f64>,
    verbose: bool,
}

impl SeedQuery {
    /// Select seeds from `table`, projecting `columns` into each payload.
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            columns,
            schema: ThreadSchema::default(),
            condition: None,
            limit: Some(DEFAULT_SEED_LIMIT),
            random_percent: None,
            verbose: false,
        }
    }

    /// Use custom identity and parent columns.
    pub fn schema(mut self, schema: ThreadSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Only select rows matching a SQL predicate, e.g.
    /// `in_reply_to_status_id IS NULL`.
    ///
    /// The predicate is inserted verbatim and must come from a trusted
    /// configuration.
    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Cap the number of seeds (`None` selects every matching row).
    pub fn limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit;
        self
    }

    /// Keep each row with probability `percent / 100`.
    pub fn random_percent(mut self, percent: f64) -> Self {
        self.random_percent = Some(percent);
        self
    }

    /// Log the generated query before running it.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Offset of the first payload column in a result row.
    fn payload_offset(&self) -> usize {
        if self.columns.first() == Some(&self.schema.id_column) {
            0
        } else {
            1
        }
    }

    /// Build the seed query.
    pub fn sql(&self) -> Result<String> {
        let table = quote_identifier(&self.table)?;
        let mut selected = quote_columns(&self.columns, None)?;
        if self.payload_offset() == 1 {
            selected.insert(0, quote_identifier(&self.schema.id_column)?);
        }

        let mut sql = format!("SELECT {}", selected.join(", "));
        sql.push_str(" FROM ");
        sql.push_str(&table);

        let mut predicates = Vec::new();
        if let Some(ref condition) = self.condition {
            predicates.push(format!("({condition})"));
        }
        if let Some(percent) = self.random_percent {
            if !(0.0..=100.0).contains(&percent) {
                return Err(Error::config(format!(
                    "random sample percentage {percent} is outside 0..=100"
                )));
            }
            let threshold = (percent / 100.0 * SAMPLE_SCALE).round() as i64;
            predicates.push(format!(
                "abs(random() % {}) < {threshold}",
                SAMPLE_SCALE as i64
            ));
        }
        if !predicates.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&predicates.join(" AND "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        Ok(sql)
    }

    /// Run the query, returning one root record per selected row.
    pub fn fetch(&self, conn: &Connection) -> Result<Vec<NodeRecord>> {
        let sql = self.sql()?;
        if self.verbose {
            info!(%sql, "seed query");
        }

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(NodeRecord::root(
                row.get(0)?,
                read_payload(row, &self.columns, self.payload_offset())?,
            ))
        })?;
        let seeds = rows.collect::<rusqlite::Result<Vec<_>>>()?;

        info!(table = %self.table, count = seeds.len(), "selected seeds");
        Ok(seeds)
    }
}
