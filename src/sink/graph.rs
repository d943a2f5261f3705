//! Reply-graph output.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::threading::{NestedSequence, NodeId, NodeRecord, Value};

use super::OutputSink;

/// Default payload column holding the post time.
pub const DEFAULT_TIME_COLUMN: &str = "created_at";

/// Default payload column holding the author identity.
pub const DEFAULT_USER_COLUMN: &str = "user_id";

/// Node weight of a reply graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostNode {
    /// Post identity
    pub id: NodeId,
    /// Post time, as stored
    pub time: Value,
    /// Author identity, as stored
    pub user_id: Value,
    /// Depth in the thread (1 for the root)
    pub depth: u32,
}

/// The reply graph of one thread.
///
/// Edges point from a reply to the post it replies to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadGraph {
    /// Identity of the thread root
    pub root_id: NodeId,
    /// Posts and reply edges
    pub graph: DiGraph<PostNode, ()>,
}

impl ThreadGraph {
    /// Number of posts in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of reply edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Find the graph index of a post.
    pub fn find(&self, id: NodeId) -> Option<NodeIndex> {
        self.graph.node_indices().find(|&idx| self.graph[idx].id == id)
    }

    /// Get the post a reply points to.
    pub fn parent_of(&self, id: NodeId) -> Option<&PostNode> {
        let idx = self.find(id)?;
        self.graph
            .neighbors(idx)
            .next()
            .map(|parent| &self.graph[parent])
    }

    /// Get a post by identity.
    pub fn post(&self, id: NodeId) -> Option<&PostNode> {
        self.find(id).map(|idx| &self.graph[idx])
    }
}

/// A collection of thread graphs, one per processed root, in run order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadGraphs {
    graphs: Vec<ThreadGraph>,
}

impl ThreadGraphs {
    /// Get all graphs.
    pub fn graphs(&self) -> &[ThreadGraph] {
        &self.graphs
    }

    /// Get the number of graphs.
    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    /// Check if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    /// Find the graph of a root.
    pub fn find_by_root(&self, root_id: NodeId) -> Option<&ThreadGraph> {
        self.graphs.iter().find(|g| g.root_id == root_id)
    }

    /// Iterate over graphs.
    pub fn iter(&self) -> impl Iterator<Item = &ThreadGraph> {
        self.graphs.iter()
    }

    /// Serialize the whole collection as JSON.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }
}

impl IntoIterator for ThreadGraphs {
    type Item = ThreadGraph;
    type IntoIter = std::vec::IntoIter<ThreadGraph>;

    fn into_iter(self) -> Self::IntoIter {
        self.graphs.into_iter()
    }
}

/// Builds one directed reply graph per thread.
///
/// Each record becomes a node carrying its time, author and depth; each
/// descendant adds one edge to its parent. Sequence position is not kept.
/// If a persistence path is set, [`finish`](OutputSink::finish) writes the
/// collected graphs there as JSON.
#[derive(Debug)]
pub struct GraphSink {
    time_column: String,
    user_column: String,
    output: Option<PathBuf>,
    graphs: ThreadGraphs,
}

impl Default for GraphSink {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphSink {
    /// Create a sink reading time and author from the default columns.
    pub fn new() -> Self {
        Self {
            time_column: DEFAULT_TIME_COLUMN.to_string(),
            user_column: DEFAULT_USER_COLUMN.to_string(),
            output: None,
            graphs: ThreadGraphs::default(),
        }
    }

    /// Read post times from `column`.
    pub fn time_column(mut self, column: impl Into<String>) -> Self {
        self.time_column = column.into();
        self
    }

    /// Read author identities from `column`.
    pub fn user_column(mut self, column: impl Into<String>) -> Self {
        self.user_column = column.into();
        self
    }

    /// Write the collection to `path` when the run finishes.
    pub fn persist_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Graphs collected so far.
    pub fn graphs(&self) -> &ThreadGraphs {
        &self.graphs
    }

    /// Consume the sink, returning the collected graphs.
    pub fn into_graphs(self) -> ThreadGraphs {
        self.graphs
    }

    fn post_node(&self, record: &NodeRecord) -> Result<PostNode> {
        let column = |name: &str| {
            record.field(name).cloned().ok_or_else(|| Error::MissingColumn {
                column: name.to_string(),
                node: record.id(),
            })
        };

        Ok(PostNode {
            id: record.id(),
            time: column(&self.time_column)?,
            user_id: column(&self.user_column)?,
            depth: record.depth(),
        })
    }
}

impl OutputSink for GraphSink {
    fn accept(&mut self, root: &NodeRecord, nested: &NestedSequence) -> Result<()> {
        let mut graph = DiGraph::with_capacity(nested.len() + 1, nested.len());
        let mut index: HashMap<NodeId, NodeIndex> = HashMap::with_capacity(nested.len() + 1);

        index.insert(root.id(), graph.add_node(self.post_node(root)?));

        for record in nested {
            let idx = graph.add_node(self.post_node(record)?);
            index.insert(record.id(), idx);

            // Parents always precede children in nested order
            if let Some(&parent_idx) = record.parent_id().and_then(|p| index.get(&p)) {
                graph.add_edge(idx, parent_idx, ());
            }
        }

        debug!(
            seed = root.id(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "built thread graph"
        );

        self.graphs.graphs.push(ThreadGraph {
            root_id: root.id(),
            graph,
        });
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(ref path) = self.output {
            let mut writer = BufWriter::new(File::create(path)?);
            self.graphs.write_json(&mut writer)?;
            writer.flush()?;
            info!(path = %path.display(), graphs = self.graphs.len(), "wrote thread graphs");
        }
        Ok(())
    }
}
