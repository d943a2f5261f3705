//! Core types for reply-thread reconstruction.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a post in the store.
pub type NodeId = i64;

/// Separator between identities in a [`NodeRecord`] path.
pub const PATH_SEPARATOR: &str = "->";

/// A dynamically typed payload value projected from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL
    Null,
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit float
    Real(f64),
    /// UTF-8 text
    Text(String),
    /// Raw bytes
    Blob(Vec<u8>),
}

impl Value {
    /// Check if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the value as an integer, if it is one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the value as text, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => f.write_str(s),
            Value::Blob(b) => f.write_str(&String::from_utf8_lossy(b)),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Ordered set of named payload values.
///
/// The column order is the projection order of the run and is preserved
/// by every sink that writes columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    fields: Vec<(String, Value)>,
}

impl Payload {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a named value, returning the payload for chaining.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Look up a value by column name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Column names in projection order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Iterate over `(name, value)` pairs in projection order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the payload has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<N: Into<String>, V: Into<Value>> FromIterator<(N, V)> for Payload {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

/// One post within a thread.
///
/// Records are created by a fetcher (or by the seed query for roots) and
/// never mutated afterwards; all fields are read through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    id: NodeId,
    parent_id: Option<NodeId>,
    depth: u32,
    path: String,
    fields: Payload,
}

impl NodeRecord {
    /// Create a thread root: depth 1, no parent, path equal to its identity.
    pub fn root(id: NodeId, fields: Payload) -> Self {
        Self {
            id,
            parent_id: None,
            depth: 1,
            path: id.to_string(),
            fields,
        }
    }

    /// Create a reply record as returned by a fetcher.
    pub fn reply(
        id: NodeId,
        parent_id: NodeId,
        depth: u32,
        path: impl Into<String>,
        fields: Payload,
    ) -> Self {
        Self {
            id,
            parent_id: Some(parent_id),
            depth,
            path: path.into(),
            fields,
        }
    }

    /// Identity of this post.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Identity of the post this one replies to (`None` for a root).
    pub fn parent_id(&self) -> Option<NodeId> {
        self.parent_id
    }

    /// Depth in the thread, 1 for the root.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Root-to-node identity chain, e.g. `10->11->14`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Projected payload columns.
    pub fn fields(&self) -> &Payload {
        &self.fields
    }

    /// Look up a single payload column.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Check if this record is a thread root.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Descendants of one root in nested (depth-first preorder) order.
///
/// Every record's parent appears earlier in the sequence (or is the root),
/// and a record's whole subtree is contiguous.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NestedSequence {
    records: Vec<NodeRecord>,
}

impl NestedSequence {
    pub(crate) fn new(records: Vec<NodeRecord>) -> Self {
        Self { records }
    }

    /// Number of records in the sequence.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over records in nested order.
    pub fn iter(&self) -> std::slice::Iter<'_, NodeRecord> {
        self.records.iter()
    }

    /// View the records as a slice.
    pub fn as_slice(&self) -> &[NodeRecord] {
        &self.records
    }

    /// Identities in nested order.
    pub fn ids(&self) -> Vec<NodeId> {
        self.records.iter().map(NodeRecord::id).collect()
    }

    /// Consume the sequence, returning the records.
    pub fn into_vec(self) -> Vec<NodeRecord> {
        self.records
    }
}

impl IntoIterator for NestedSequence {
    type Item = NodeRecord;
    type IntoIter = std::vec::IntoIter<NodeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a NestedSequence {
    type Item = &'a NodeRecord;
    type IntoIter = std::slice::Iter<'a, NodeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_record() {
        let root = NodeRecord::root(10, Payload::new().with("tweet", "hello"));
        assert!(root.is_root());
        assert_eq!(root.depth(), 1);
        assert_eq!(root.path(), "10");
        assert_eq!(root.parent_id(), None);
        assert_eq!(root.field("tweet"), Some(&Value::from("hello")));
    }

    #[test]
    fn test_reply_record() {
        let reply = NodeRecord::reply(14, 11, 3, "10->11->14", Payload::new());
        assert!(!reply.is_root());
        assert_eq!(reply.parent_id(), Some(11));
        assert_eq!(reply.depth(), 3);
        assert_eq!(reply.path(), "10->11->14");
        assert!(reply.field("tweet").is_none());
    }

    #[test]
    fn test_payload_preserves_order() {
        let payload = Payload::new()
            .with("user_id", 7i64)
            .with("tweet", "hi")
            .with("created_at", Value::Null);

        let names: Vec<&str> = payload.names().collect();
        assert_eq!(names, vec!["user_id", "tweet", "created_at"]);
        assert_eq!(payload.len(), 3);
        assert!(payload.get("created_at").unwrap().is_null());
    }

    #[test]
    fn test_payload_from_iter() {
        let payload: Payload = vec![("a", 1i64), ("b", 2i64)].into_iter().collect();
        assert_eq!(payload.get("b").and_then(Value::as_i64), Some(2));
        assert!(!payload.is_empty());
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Integer(-3).to_string(), "-3");
        assert_eq!(Value::Real(1.5).to_string(), "1.5");
        assert_eq!(Value::from("text").to_string(), "text");
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn test_value_serializes_untagged() {
        let json = serde_json::to_string(&vec![
            Value::Null,
            Value::Integer(1),
            Value::from("x"),
        ])
        .unwrap();
        assert_eq!(json, r#"[null,1,"x"]"#);
    }

    #[test]
    fn test_nested_sequence_accessors() {
        let seq = NestedSequence::new(vec![
            NodeRecord::reply(2, 1, 2, "1->2", Payload::new()),
            NodeRecord::reply(3, 2, 3, "1->2->3", Payload::new()),
        ]);

        assert_eq!(seq.len(), 2);
        assert!(!seq.is_empty());
        assert_eq!(seq.ids(), vec![2, 3]);
        assert_eq!((&seq).into_iter().count(), 2);
        assert_eq!(seq.into_vec().len(), 2);
        assert!(NestedSequence::default().is_empty());
    }
}
