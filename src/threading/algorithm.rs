//! Thread ordering algorithm.
//!
//! This module turns the flat, breadth-ordered descendant list returned by a
//! recursive store query into nested order: a depth-first preorder in which
//! every reply directly follows its parent and each reply's whole subtree is
//! emitted before its next sibling.

use std::collections::HashMap;

use super::types::{NestedSequence, NodeId, NodeRecord};

/// Order the descendants of `root` into nested (depth-first preorder) order.
///
/// The root itself is not part of the output; callers emit it first so they
/// can tag it as the thread's seed.
///
/// Children of a node are visited in the relative order they appear in
/// `descendants`. Records whose parent chain does not reach `root` (orphans)
/// are silently excluded, as is any record carrying the root's own identity.
///
/// Steps:
/// 1. Index child positions by parent identity, preserving input order
/// 2. Walk the index from the root with an explicit stack
///
/// The walk is iterative so arbitrarily deep reply chains cannot overflow
/// the call stack. Each parent's child list is consumed when first visited,
/// which also bounds the walk on malformed input.
pub fn nest_descendants(root: &NodeRecord, descendants: Vec<NodeRecord>) -> NestedSequence {
    if descendants.is_empty() {
        return NestedSequence::default();
    }

    let root_id = root.id();

    // Parent identity -> positions of its children in `descendants`
    let mut children: HashMap<NodeId, Vec<usize>> = HashMap::with_capacity(descendants.len());
    for (idx, record) in descendants.iter().enumerate() {
        if record.id() == root_id {
            continue;
        }
        if let Some(parent_id) = record.parent_id() {
            children.entry(parent_id).or_default().push(idx);
        }
    }

    let mut slots: Vec<Option<NodeRecord>> = descendants.into_iter().map(Some).collect();
    let mut ordered = Vec::with_capacity(slots.len());
    let mut stack: Vec<usize> = Vec::new();

    push_children(root_id, &mut children, &mut stack);

    while let Some(idx) = stack.pop() {
        let Some(record) = slots[idx].take() else {
            continue;
        };
        let id = record.id();
        ordered.push(record);
        push_children(id, &mut children, &mut stack);
    }

    NestedSequence::new(ordered)
}

/// Push a node's children onto the stack in reverse so they pop left-to-right.
fn push_children(
    parent_id: NodeId,
    children: &mut HashMap<NodeId, Vec<usize>>,
    stack: &mut Vec<usize>,
) {
    if let Some(child_idxs) = children.remove(&parent_id) {
        stack.extend(child_idxs.into_iter().rev());
    }
}

/// Check that records are in breadth order (non-decreasing depth).
///
/// Fetchers are expected to return descendants in this order; the pipeline
/// logs a warning when a fetcher breaks it.
pub fn is_breadth_ordered(records: &[NodeRecord]) -> bool {
    records.windows(2).all(|w| w[0].depth() <= w[1].depth())
}
