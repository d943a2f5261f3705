//! Output sinks for nested threads.
//!
//! Every sink implements [`OutputSink`], which accepts one thread at a time:
//! the seed record followed by its descendants in nested order.
//!
//! - [`RecordStreamSink`]: CSV-like rows on any [`std::io::Write`]
//! - [`GraphSink`]: one directed reply graph per thread, persisted as JSON
//! - [`StoreSink`]: rows appended to a SQLite table, one transaction per thread

mod graph;
mod store;
mod stream;

pub use graph::{
    GraphSink, PostNode, ThreadGraph, ThreadGraphs, DEFAULT_TIME_COLUMN, DEFAULT_USER_COLUMN,
};
pub use store::StoreSink;
pub use stream::RecordStreamSink;

use crate::error::Result;
use crate::threading::{NestedSequence, NodeRecord};

/// Consumer of nested threads.
///
/// `accept` receives the seed of one thread and its descendants in nested
/// order. Each descendant belongs to the seed passed alongside it. Sinks
/// whose output is ordered must preserve the sequence order, seed first.
pub trait OutputSink {
    /// Accept one thread.
    fn accept(&mut self, root: &NodeRecord, nested: &NestedSequence) -> Result<()>;

    /// Called once after the last thread of a run.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: OutputSink + ?Sized> OutputSink for &mut S {
    fn accept(&mut self, root: &NodeRecord, nested: &NestedSequence) -> Result<()> {
        (**self).accept(root, nested)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn accept(&mut self, root: &NodeRecord, nested: &NestedSequence) -> Result<()> {
        (**self).accept(root, nested)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}
