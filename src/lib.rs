//! # reply-threads
//!
//! Reconstructs reply threads from a store of posts with parent pointers
//! and exports each thread in nested reading order.
//!
//! A recursive store query returns a thread's replies level by level. This
//! library reorders them so every reply directly follows its parent and a
//! reply's whole subtree comes before its next sibling, the order a reader
//! sees in a threaded discussion view.
//!
//! ## Design
//!
//! - **Ordering**: [`threading::nest_descendants`] is pure and does no I/O
//! - **Sources**: anything implementing [`ThreadFetcher`]; SQLite is built in
//! - **Outputs**: anything implementing [`OutputSink`]; CSV rows, reply
//!   graphs and a SQLite table are built in
//! - **Driving**: [`ThreadPipeline`] connects one fetcher to one sink
//!
//! ## Examples
//!
//! ### Nesting a fetched thread
//!
//! ```rust
//! use reply_threads::threading::{nest_descendants, NodeRecord, Payload};
//!
//! let root = NodeRecord::root(10, Payload::new());
//! let fetched = vec![
//!     NodeRecord::reply(11, 10, 2, "10->11", Payload::new()),
//!     NodeRecord::reply(12, 10, 2, "10->12", Payload::new()),
//!     NodeRecord::reply(14, 11, 3, "10->11->14", Payload::new()),
//! ];
//!
//! let nested = nest_descendants(&root, fetched);
//! assert_eq!(nested.ids(), vec![11, 14, 12]);
//! ```
//!
//! ### Exporting from SQLite
//!
//! ```rust
//! use reply_threads::store::{SeedQuery, SqliteThreadFetcher};
//! use reply_threads::{FetchRequest, RecordStreamSink, ThreadPipeline};
//! use rusqlite::Connection;
//!
//! # fn main() -> reply_threads::Result<()> {
//! let conn = Connection::open_in_memory()?;
//! conn.execute_batch(
//!     "CREATE TABLE tweets (id INTEGER, in_reply_to_status_id INTEGER, tweet TEXT);
//!      INSERT INTO tweets VALUES (1, NULL, 'hello'), (2, 1, 'hi'), (3, 2, 'hey');",
//! )?;
//!
//! let columns = vec!["id".to_string(), "tweet".to_string()];
//! let seeds = SeedQuery::new("tweets", columns.clone())
//!     .condition("in_reply_to_status_id IS NULL")
//!     .fetch(&conn)?;
//!
//! let fetcher = SqliteThreadFetcher::new(&conn, "tweets");
//! let sink = RecordStreamSink::new(Vec::new(), columns.clone());
//! let mut pipeline = ThreadPipeline::new(fetcher, sink, FetchRequest::new(columns));
//! let summary = pipeline.run(&seeds)?;
//!
//! assert_eq!(summary.records_written, 3);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod export;
pub mod media;
pub mod pipeline;
pub mod sink;
pub mod store;
pub mod threading;

// In-memory store for testing
pub mod mock;

pub use config::{ExportConfig, OutputConfig, SeedConfig};
pub use error::{Error, Result};
pub use export::{run_export, select_seeds};
pub use pipeline::{RunSummary, ThreadPipeline};
pub use sink::{GraphSink, OutputSink, RecordStreamSink, StoreSink};
pub use threading::{
    nest_descendants, FetchRequest, NestedSequence, NodeId, NodeRecord, Payload, ReplyRange,
    ThreadFetcher, Value,
};
