//! Descendant-count bounds for accepting or discarding whole threads.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Inclusive `[min, max]` range of acceptable descendant counts.
///
/// A thread whose descendant count falls outside the range is discarded
/// as a whole, never truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[u64; 2]", into = "[u64; 2]")]
pub struct ReplyRange {
    min: u64,
    max: u64,
}

impl Default for ReplyRange {
    fn default() -> Self {
        Self {
            min: 1,
            max: u64::MAX,
        }
    }
}

impl ReplyRange {
    /// Create a range, rejecting `min > max`.
    pub fn new(min: u64, max: u64) -> Result<Self> {
        if min > max {
            return Err(Error::config(format!(
                "reply range min {min} is greater than max {max}"
            )));
        }
        Ok(Self { min, max })
    }

    /// A range that accepts every count, including threads with no replies.
    pub fn unbounded() -> Self {
        Self {
            min: 0,
            max: u64::MAX,
        }
    }

    /// Lower bound (inclusive).
    pub fn min(&self) -> u64 {
        self.min
    }

    /// Upper bound (inclusive).
    pub fn max(&self) -> u64 {
        self.max
    }

    /// Check whether a thread with `count` descendants is accepted.
    pub fn contains(&self, count: u64) -> bool {
        self.min <= count && count <= self.max
    }
}

impl TryFrom<[u64; 2]> for ReplyRange {
    type Error = Error;

    fn try_from([min, max]: [u64; 2]) -> Result<Self> {
        Self::new(min, max)
    }
}

impl From<ReplyRange> for [u64; 2] {
    fn from(range: ReplyRange) -> Self {
        [range.min, range.max]
    }
}
