//! Running a configured export against SQLite.

use std::fs::File;
use std::io::BufWriter;

use rusqlite::Connection;
use tracing::info;

use crate::config::{ExportConfig, OutputConfig};
use crate::error::Result;
use crate::pipeline::{RunSummary, ThreadPipeline};
use crate::sink::{GraphSink, RecordStreamSink, StoreSink};
use crate::store::{SeedQuery, SqliteThreadFetcher};
use crate::threading::NodeRecord;

/// Select the seeds of a configured export.
pub fn select_seeds(config: &ExportConfig) -> Result<Vec<NodeRecord>> {
    let conn = Connection::open(config.seed_database())?;

    let mut query = SeedQuery::new(config.seed_table(), config.projection())
        .schema(config.schema())
        .limit((config.seeds.limit > 0).then_some(config.seeds.limit))
        .verbose(config.verbose);
    if let Some(ref condition) = config.seeds.condition {
        query = query.condition(condition.as_str());
    }
    if let Some(percent) = config.seeds.random_percent {
        query = query.random_percent(percent);
    }

    query.fetch(&conn)
}

/// Run a configured export: select seeds, then fetch, nest and write every
/// thread to the configured output.
pub fn run_export(config: &ExportConfig) -> Result<RunSummary> {
    config.validate()?;

    let seeds = select_seeds(config)?;
    let conn = Connection::open(&config.database)?;
    let fetcher = SqliteThreadFetcher::with_schema(&conn, config.table.as_str(), config.schema());
    let request = config.fetch_request();
    let columns = config.projection();

    info!(
        database = %config.database.display(),
        table = %config.table,
        seeds = seeds.len(),
        "exporting threads"
    );

    match config.output {
        OutputConfig::Csv {
            ref path,
            ref encoding,
        } => {
            let writer = BufWriter::new(File::create(path)?);
            let mut sink = RecordStreamSink::new(writer, columns);
            if let Some(label) = encoding {
                sink = sink.with_encoding(label)?;
            }
            ThreadPipeline::new(fetcher, sink, request).run(&seeds)
        }
        OutputConfig::Graph {
            ref path,
            ref time_column,
            ref user_column,
        } => {
            let sink = GraphSink::new()
                .time_column(time_column.as_str())
                .user_column(user_column.as_str())
                .persist_to(path);
            ThreadPipeline::new(fetcher, sink, request).run(&seeds)
        }
        OutputConfig::Database {
            ref database,
            ref table,
            start_order_id,
        } => {
            let output = Connection::open(database.as_ref().unwrap_or(&config.database))?;
            let sink = StoreSink::new(output, table.as_str(), columns).starting_at(start_order_id);
            sink.ensure_table()?;
            ThreadPipeline::new(fetcher, sink, request).run(&seeds)
        }
    }
}
