//! Export configuration loaded from TOML.
//!
//! ```toml
//! database = "tweets.db"
//! table = "tweets"
//! columns = ["tweet", "user_id", "created_at"]
//! reply_range = [2, 500]
//!
//! [seeds]
//! condition = "in_reply_to_status_id IS NULL"
//! limit = 100
//!
//! [output]
//! type = "csv"
//! path = "threads.csv"
//! ```

use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::sink::{DEFAULT_TIME_COLUMN, DEFAULT_USER_COLUMN};
use crate::store::{quote_identifier, ThreadSchema, DEFAULT_ID_COLUMN, DEFAULT_PARENT_COLUMN, DEFAULT_SEED_LIMIT};
use crate::threading::{FetchRequest, ReplyRange};

/// Payload columns exported when the configuration names none.
pub const DEFAULT_COLUMNS: &[&str] = &[
    "tweet",
    "user_id",
    "user_name",
    "user_screen_name",
    "created_at",
    "in_reply_to_user_id",
    "in_reply_to_user_screen_name",
    "in_reply_to_status_id",
    "user_followers_count",
];

/// Upper bound of the reply range applied when none is configured.
pub const DEFAULT_REPLY_MAX: u64 = 10_000_000_000_000;

/// One export run.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportConfig {
    /// SQLite file holding the posts
    pub database: PathBuf,
    /// Table holding the posts
    pub table: String,
    /// Payload columns to export
    #[serde(default = "default_columns")]
    pub columns: Vec<String>,
    /// Identity column
    #[serde(default = "default_id_column")]
    pub id_column: String,
    /// Parent column
    #[serde(default = "default_parent_column")]
    pub parent_column: String,
    /// Accepted descendant counts, `[min, max]`
    #[serde(default = "default_reply_range")]
    pub reply_range: ReplyRange,
    /// Deepest level a kept thread may reach (root is 1)
    #[serde(default)]
    pub max_depth: Option<u32>,
    /// Log generated SQL
    #[serde(default)]
    pub verbose: bool,
    /// Seed selection
    #[serde(default)]
    pub seeds: SeedConfig,
    /// Output destination
    pub output: OutputConfig,
}

/// Seed selection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedConfig {
    /// SQLite file to select seeds from (defaults to the posts database)
    #[serde(default)]
    pub database: Option<PathBuf>,
    /// Table to select seeds from (defaults to the posts table)
    #[serde(default)]
    pub table: Option<String>,
    /// SQL predicate restricting seeds
    #[serde(default)]
    pub condition: Option<String>,
    /// Maximum number of seeds, 0 for no limit
    #[serde(default = "default_seed_limit")]
    pub limit: u32,
    /// Percentage of rows to sample
    #[serde(default)]
    pub random_percent: Option<f64>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            database: None,
            table: None,
            condition: None,
            limit: DEFAULT_SEED_LIMIT,
            random_percent: None,
        }
    }
}

/// Where threads are written.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputConfig {
    /// CSV record stream
    Csv {
        /// Output file
        path: PathBuf,
        /// Output text encoding label (UTF-8 if unset)
        #[serde(default)]
        encoding: Option<String>,
    },
    /// Reply graphs persisted as JSON
    Graph {
        /// Output file
        path: PathBuf,
        /// Column holding post times
        #[serde(default = "default_time_column")]
        time_column: String,
        /// Column holding author identities
        #[serde(default = "default_user_column")]
        user_column: String,
    },
    /// Rows appended to a SQLite table
    Database {
        /// SQLite file to write to (defaults to the posts database)
        #[serde(default)]
        database: Option<PathBuf>,
        /// Output table, created if missing
        table: String,
        /// First `order_id` assigned
        #[serde(default)]
        start_order_id: i64,
    },
}

fn default_columns() -> Vec<String> {
    DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect()
}

fn default_id_column() -> String {
    DEFAULT_ID_COLUMN.to_string()
}

fn default_parent_column() -> String {
    DEFAULT_PARENT_COLUMN.to_string()
}

fn default_reply_range() -> ReplyRange {
    ReplyRange::new(1, DEFAULT_REPLY_MAX).unwrap_or_default()
}

fn default_seed_limit() -> u32 {
    DEFAULT_SEED_LIMIT
}

fn default_time_column() -> String {
    DEFAULT_TIME_COLUMN.to_string()
}

fn default_user_column() -> String {
    DEFAULT_USER_COLUMN.to_string()
}

impl ExportConfig {
    /// Load, parse and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings that parsing alone does not.
    pub fn validate(&self) -> Result<()> {
        quote_identifier(&self.table)?;
        quote_identifier(&self.id_column)?;
        quote_identifier(&self.parent_column)?;
        for column in self.projection() {
            quote_identifier(&column)?;
        }
        if let Some(ref table) = self.seeds.table {
            quote_identifier(table)?;
        }

        if self.max_depth == Some(0) {
            return Err(Error::config("max_depth must be at least 1"));
        }
        if let Some(percent) = self.seeds.random_percent {
            if !(0.0..=100.0).contains(&percent) {
                return Err(Error::config(format!(
                    "random_percent {percent} is outside 0..=100"
                )));
            }
        }

        match self.output {
            OutputConfig::Csv {
                encoding: Some(ref label),
                ..
            } => {
                if Encoding::for_label(label.trim().as_bytes()).is_none() {
                    return Err(Error::config(format!("unknown output encoding '{label}'")));
                }
            }
            OutputConfig::Database {
                ref database,
                ref table,
                ..
            } => {
                quote_identifier(table)?;
                let same_file = database.as_ref().map_or(true, |db| *db == self.database);
                if same_file && *table == self.table {
                    return Err(Error::config(format!(
                        "output table '{table}' is the posts table"
                    )));
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Columns projected for every record.
    ///
    /// The identity column always comes first and the parent column is
    /// appended when missing; graph output also needs its time and author
    /// columns.
    pub fn projection(&self) -> Vec<String> {
        let mut columns = vec![self.id_column.clone()];
        for column in &self.columns {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }

        let mut required = vec![&self.parent_column];
        if let OutputConfig::Graph {
            ref time_column,
            ref user_column,
            ..
        } = self.output
        {
            required.push(time_column);
            required.push(user_column);
        }
        for column in required {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }

        columns
    }

    /// Identity and parent column names.
    pub fn schema(&self) -> ThreadSchema {
        ThreadSchema::new(self.id_column.as_str(), self.parent_column.as_str())
    }

    /// Fetch parameters for the run.
    pub fn fetch_request(&self) -> FetchRequest {
        let mut request = FetchRequest::new(self.projection())
            .reply_range(self.reply_range)
            .verbose(self.verbose);
        if let Some(depth) = self.max_depth {
            request = request.max_depth(depth);
        }
        request
    }

    /// Database seeds are selected from.
    pub fn seed_database(&self) -> &Path {
        self.seeds.database.as_deref().unwrap_or(self.database.as_path())
    }

    /// Table seeds are selected from.
    pub fn seed_table(&self) -> &str {
        self.seeds.table.as_deref().unwrap_or(self.table.as_str())
    }
}
