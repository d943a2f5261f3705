//! Reply-thread reconstruction.
//!
//! This module holds the thread-reconstruction engine: the types describing
//! posts in a thread, the descendant-count filter, the fetcher contract, and
//! the algorithm that turns a breadth-ordered descendant list into nested
//! reading order.
//!
//! # Overview
//!
//! - [`NodeRecord`]: one post with its identity, parent, depth, path and payload
//! - [`ReplyRange`]: inclusive bounds on a thread's descendant count
//! - [`ThreadFetcher`]: source of breadth-ordered descendants for a root
//! - [`nest_descendants`]: reorders descendants into a [`NestedSequence`]
//!
//! # Example
//!
//! ```
//! use reply_threads::threading::{nest_descendants, NodeRecord, Payload};
//!
//! let root = NodeRecord::root(1, Payload::new());
//! let replies = vec![
//!     NodeRecord::reply(2, 1, 2, "1->2", Payload::new()),
//!     NodeRecord::reply(3, 1, 2, "1->3", Payload::new()),
//!     NodeRecord::reply(4, 2, 3, "1->2->4", Payload::new()),
//! ];
//!
//! let nested = nest_descendants(&root, replies);
//! assert_eq!(nested.ids(), vec![2, 4, 3]);
//! ```

mod algorithm;
mod fetch;
mod filter;
mod types;

// Re-export public types
pub use algorithm::{is_breadth_ordered, nest_descendants};
pub use fetch::{FetchRequest, ThreadFetcher};
pub use filter::ReplyRange;
pub use types::{NestedSequence, NodeId, NodeRecord, Payload, Value, PATH_SEPARATOR};
