//! In-memory post store and recording sink for testing purposes.
//!
//! [`MemoryStore`] holds posts in memory and answers descendant fetches the
//! way the SQLite fetcher does: breadth-first, with depth, parent and path
//! filled in. [`RecordingSink`] keeps every thread it is handed so tests can
//! inspect what a pipeline produced.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::Result;
use crate::sink::OutputSink;
use crate::threading::{
    FetchRequest, NestedSequence, NodeId, NodeRecord, Payload, ThreadFetcher, Value, PATH_SEPARATOR,
};

#[derive(Debug, Clone)]
struct StoredPost {
    id: NodeId,
    parent_id: Option<NodeId>,
    fields: Payload,
}

/// An in-memory posts table.
///
/// Replies to a post are returned in insertion order, mirroring a table scan.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    posts: Vec<StoredPost>,
    children: HashMap<NodeId, Vec<usize>>,
    index: HashMap<NodeId, usize>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a post. `parent_id` is `None` for thread roots.
    ///
    /// Every post carries its identity as an `id` field in addition to
    /// `fields`, so it can be projected like any other column.
    pub fn insert(&mut self, id: NodeId, parent_id: Option<NodeId>, fields: Payload) -> &mut Self {
        let idx = self.posts.len();
        self.posts.push(StoredPost {
            id,
            parent_id,
            fields: fields.with("id", id).with("in_reply_to_status_id", parent_id),
        });
        self.index.insert(id, idx);
        if let Some(parent) = parent_id {
            self.children.entry(parent).or_default().push(idx);
        }
        self
    }

    /// Insert a post with no payload beyond its identity and parent.
    pub fn insert_bare(&mut self, id: NodeId, parent_id: Option<NodeId>) -> &mut Self {
        self.insert(id, parent_id, Payload::new())
    }

    /// Number of posts stored.
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Root record of a stored post, projecting `columns`.
    ///
    /// Columns the post lacks are projected as NULL.
    pub fn root(&self, id: NodeId, columns: &[String]) -> Option<NodeRecord> {
        let post = &self.posts[*self.index.get(&id)?];
        Some(NodeRecord::root(post.id, project(&post.fields, columns)))
    }

    /// Root records of every post without a parent, in insertion order.
    pub fn roots(&self, columns: &[String]) -> Vec<NodeRecord> {
        self.posts
            .iter()
            .filter(|post| post.parent_id.is_none())
            .map(|post| NodeRecord::root(post.id, project(&post.fields, columns)))
            .collect()
    }
}

fn project(fields: &Payload, columns: &[String]) -> Payload {
    columns
        .iter()
        .map(|column| (column.as_str(), fields.get(column).cloned().unwrap_or(Value::Null)))
        .collect()
}

impl ThreadFetcher for MemoryStore {
    fn fetch(
        &mut self,
        root: &NodeRecord,
        request: &FetchRequest,
    ) -> Result<Option<Vec<NodeRecord>>> {
        let max_depth = request.max_depth.unwrap_or(u32::MAX);
        let mut descendants = Vec::new();
        let mut visited = HashSet::from([root.id()]);

        // (parent identity, parent depth, parent path)
        let mut queue: VecDeque<(NodeId, u32, String)> = VecDeque::new();
        queue.push_back((root.id(), 1, root.id().to_string()));

        while let Some((parent_id, depth, path)) = queue.pop_front() {
            let Some(child_idxs) = self.children.get(&parent_id) else {
                continue;
            };
            if depth >= max_depth {
                if child_idxs.iter().any(|&idx| !visited.contains(&self.posts[idx].id)) {
                    return Ok(None);
                }
                continue;
            }
            for &idx in child_idxs {
                let post = &self.posts[idx];
                if !visited.insert(post.id) {
                    continue;
                }
                let child_path = format!("{path}{PATH_SEPARATOR}{}", post.id);
                descendants.push(NodeRecord::reply(
                    post.id,
                    parent_id,
                    depth + 1,
                    child_path.clone(),
                    project(&post.fields, &request.columns),
                ));
                queue.push_back((post.id, depth + 1, child_path));
            }
        }

        Ok(request.accepts(descendants.len()).then_some(descendants))
    }
}

/// A sink that keeps every thread it accepts.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    threads: Vec<(NodeRecord, NestedSequence)>,
    finished: bool,
}

impl RecordingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Threads accepted so far, in order.
    pub fn threads(&self) -> &[(NodeRecord, NestedSequence)] {
        &self.threads
    }

    /// Root and descendant identities of every accepted thread.
    pub fn ids(&self) -> Vec<(NodeId, Vec<NodeId>)> {
        self.threads
            .iter()
            .map(|(root, nested)| (root.id(), nested.ids()))
            .collect()
    }

    /// Check whether [`OutputSink::finish`] was called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl OutputSink for RecordingSink {
    fn accept(&mut self, root: &NodeRecord, nested: &NestedSequence) -> Result<()> {
        self.threads.push((root.clone(), nested.clone()));
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
