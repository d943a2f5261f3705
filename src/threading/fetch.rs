//! Fetching the descendants of a thread root.

use crate::error::Result;

use super::filter::ReplyRange;
use super::types::NodeRecord;

/// Parameters for one descendant fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchRequest {
    /// Payload columns to project for every descendant
    pub columns: Vec<String>,
    /// Accepted descendant counts (`None` accepts every thread)
    pub reply_range: Option<ReplyRange>,
    /// Deepest level a thread may reach (`None` = unlimited)
    pub max_depth: Option<u32>,
    /// Log the generated query before running it
    pub verbose: bool,
}

impl FetchRequest {
    /// Create a request projecting the given columns.
    pub fn new(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Only accept threads whose descendant count is within `range`.
    pub fn reply_range(mut self, range: ReplyRange) -> Self {
        self.reply_range = Some(range);
        self
    }

    /// Discard threads with descendants deeper than `depth` (root is 1).
    pub fn max_depth(mut self, depth: u32) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Log generated queries.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Check whether a thread with `count` descendants passes the range.
    pub fn accepts(&self, count: usize) -> bool {
        self.reply_range
            .map_or(true, |range| range.contains(count as u64))
    }
}

/// Source of thread descendants.
///
/// Implementations return every transitive reply of `root` (the root itself
/// excluded) in breadth order: non-decreasing depth, with ties in the
/// underlying traversal's own visitation order. Every record carries its
/// depth, parent identity and path.
///
/// If the descendant count falls outside `request.reply_range`, or any
/// descendant lies deeper than `request.max_depth`, the fetcher returns
/// `Ok(None)` and the caller discards the whole thread. A thread is never
/// returned truncated.
pub trait ThreadFetcher {
    /// Fetch the descendants of `root`.
    fn fetch(&mut self, root: &NodeRecord, request: &FetchRequest)
        -> Result<Option<Vec<NodeRecord>>>;
}

impl<F: ThreadFetcher + ?Sized> ThreadFetcher for &mut F {
    fn fetch(
        &mut self,
        root: &NodeRecord,
        request: &FetchRequest,
    ) -> Result<Option<Vec<NodeRecord>>> {
        (**self).fetch(root, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = FetchRequest::new(["tweet", "user_id"])
            .reply_range(ReplyRange::new(2, 5).unwrap())
            .max_depth(10)
            .verbose(true);

        assert_eq!(request.columns, vec!["tweet", "user_id"]);
        assert_eq!(request.max_depth, Some(10));
        assert!(request.verbose);
    }

    #[test]
    fn test_request_accepts() {
        let open = FetchRequest::new(Vec::<String>::new());
        assert!(open.accepts(0));
        assert!(open.accepts(1_000_000));

        let bounded = open.reply_range(ReplyRange::new(2, 5).unwrap());
        assert!(!bounded.accepts(1));
        assert!(bounded.accepts(2));
        assert!(bounded.accepts(5));
        assert!(!bounded.accepts(6));
    }
}
