//! Recursive descendant fetch over a SQLite posts table.

use rusqlite::{params, Connection};
use tracing::{debug, info, trace};

use crate::error::Result;
use crate::threading::{FetchRequest, NodeRecord, ThreadFetcher, PATH_SEPARATOR};

use super::{quote_columns, quote_identifier, read_payload, ThreadSchema};

/// Fetches thread descendants with a `WITH RECURSIVE` query.
///
/// Without an `ORDER BY`, SQLite processes the recursive queue first in,
/// first out, so rows come back level by level: breadth order, ties in the
/// order each parent's replies were found.
pub struct SqliteThreadFetcher<'c> {
    conn: &'c Connection,
    table: String,
    schema: ThreadSchema,
}

impl<'c> SqliteThreadFetcher<'c> {
    /// Create a fetcher over `table` using the default column names.
    pub fn new(conn: &'c Connection, table: impl Into<String>) -> Self {
        Self::with_schema(conn, table, ThreadSchema::default())
    }

    /// Create a fetcher with custom identity and parent columns.
    pub fn with_schema(conn: &'c Connection, table: impl Into<String>, schema: ThreadSchema) -> Self {
        Self {
            conn,
            table: table.into(),
            schema,
        }
    }

    /// The table queried.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Build the recursive query for the given payload columns.
    ///
    /// Parameters: `?1` root identity, `?2` deepest level to walk. The
    /// anchor row is built from `?1` alone, so the root need not exist in
    /// the table being walked. Payload columns are aliased positionally
    /// inside the CTE so they cannot clash with its bookkeeping columns.
    pub fn descendant_sql(&self, columns: &[String]) -> Result<String> {
        let table = quote_identifier(&self.table)?;
        let id = quote_identifier(&self.schema.id_column)?;
        let parent = quote_identifier(&self.schema.parent_column)?;
        let child_cols = quote_columns(columns, Some("c"))?;

        let aliases: Vec<String> = (0..columns.len()).map(|i| format!("col_{i}")).collect();
        let nulls = vec!["NULL".to_string(); columns.len()];

        Ok(format!(
            "WITH RECURSIVE thread(node_id, parent_id, depth, path{alias_list}) AS (\
             SELECT ?1, NULL, 1, CAST(?1 AS TEXT){seed_list} \
             UNION ALL \
             SELECT c.{id}, c.{parent}, p.depth + 1, p.path || '{sep}' || c.{id}{child_list} \
             FROM {table} AS c JOIN thread AS p ON c.{parent} = p.node_id \
             WHERE p.depth < ?2) \
             SELECT node_id, parent_id, depth, path{alias_list} FROM thread WHERE depth > 1",
            alias_list = prefixed(&aliases),
            seed_list = prefixed(&nulls),
            child_list = prefixed(&child_cols),
            sep = PATH_SEPARATOR,
        ))
    }
}

fn prefixed(cols: &[String]) -> String {
    cols.iter().map(|col| format!(", {col}")).collect()
}

impl ThreadFetcher for SqliteThreadFetcher<'_> {
    fn fetch(
        &mut self,
        root: &NodeRecord,
        request: &FetchRequest,
    ) -> Result<Option<Vec<NodeRecord>>> {
        let sql = self.descendant_sql(&request.columns)?;
        if request.verbose {
            info!(seed = root.id(), %sql, "descendant query");
        }

        // One level past the cap, to tell a shallow thread from a cut one
        let walk_depth = request.max_depth.map_or(i64::MAX, |depth| i64::from(depth) + 1);
        let columns = &request.columns;

        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(params![root.id(), walk_depth], |row| {
            Ok(NodeRecord::reply(
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get::<_, String>(3)?,
                read_payload(row, columns, 4)?,
            ))
        })?;
        let descendants = rows.collect::<rusqlite::Result<Vec<_>>>()?;

        trace!(seed = root.id(), count = descendants.len(), "fetched descendants");

        if let Some(max_depth) = request.max_depth {
            if descendants.iter().any(|record| record.depth() > max_depth) {
                debug!(seed = root.id(), max_depth, "thread deeper than max_depth");
                return Ok(None);
            }
        }

        if request.accepts(descendants.len()) {
            Ok(Some(descendants))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threading::{is_breadth_ordered, Payload, ReplyRange, Value};

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE tweets (id INTEGER PRIMARY KEY, in_reply_to_status_id INTEGER, tweet TEXT);
             INSERT INTO tweets VALUES (1, NULL, 'root');
             INSERT INTO tweets VALUES (2, 1, 'a');
             INSERT INTO tweets VALUES (3, 1, 'b');
             INSERT INTO tweets VALUES (4, 2, 'c');
             INSERT INTO tweets VALUES (5, 4, 'd');
             INSERT INTO tweets VALUES (6, NULL, 'other');",
        )
        .unwrap();
        conn
    }

    fn root(id: i64) -> NodeRecord {
        NodeRecord::root(id, Payload::new())
    }

    #[test]
    fn test_fetch_breadth_order_and_paths() {
        let conn = setup();
        let mut fetcher = SqliteThreadFetcher::new(&conn, "tweets");
        let request = FetchRequest::new(["tweet"]);

        let records = fetcher.fetch(&root(1), &request).unwrap().unwrap();
        assert!(is_breadth_ordered(&records));

        let summary: Vec<(i64, u32, &str)> = records
            .iter()
            .map(|r| (r.id(), r.depth(), r.path()))
            .collect();
        assert_eq!(
            summary,
            vec![(2, 2, "1->2"), (3, 2, "1->3"), (4, 3, "1->2->4"), (5, 4, "1->2->4->5")]
        );
        assert_eq!(records[2].parent_id(), Some(2));
        assert_eq!(records[0].field("tweet"), Some(&Value::from("a")));
    }

    #[test]
    fn test_fetch_no_replies() {
        let conn = setup();
        let mut fetcher = SqliteThreadFetcher::new(&conn, "tweets");
        let records = fetcher
            .fetch(&root(6), &FetchRequest::new(["tweet"]))
            .unwrap()
            .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_fetch_reply_range() {
        let conn = setup();
        let mut fetcher = SqliteThreadFetcher::new(&conn, "tweets");

        let narrow = FetchRequest::new(["tweet"]).reply_range(ReplyRange::new(1, 3).unwrap());
        assert!(fetcher.fetch(&root(1), &narrow).unwrap().is_none());

        let exact = FetchRequest::new(["tweet"]).reply_range(ReplyRange::new(4, 4).unwrap());
        assert_eq!(fetcher.fetch(&root(1), &exact).unwrap().unwrap().len(), 4);

        // Default range excludes threads without replies
        let default = FetchRequest::new(["tweet"]).reply_range(ReplyRange::default());
        assert!(fetcher.fetch(&root(6), &default).unwrap().is_none());
    }

    #[test]
    fn test_fetch_max_depth_discards_deeper_threads() {
        let conn = setup();
        let mut fetcher = SqliteThreadFetcher::new(&conn, "tweets");

        // Post 5 sits at depth 4
        let capped = FetchRequest::new(["tweet"]).max_depth(3);
        assert!(fetcher.fetch(&root(1), &capped).unwrap().is_none());

        let exact = FetchRequest::new(["tweet"]).max_depth(4);
        let ids: Vec<i64> = fetcher
            .fetch(&root(1), &exact)
            .unwrap()
            .unwrap()
            .iter()
            .map(NodeRecord::id)
            .collect();
        assert_eq!(ids, vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_fetch_root_outside_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE replies (id INTEGER, in_reply_to_status_id INTEGER, tweet TEXT);
             INSERT INTO replies VALUES (2, 1, 'a');
             INSERT INTO replies VALUES (3, 2, 'b');",
        )
        .unwrap();

        let mut fetcher = SqliteThreadFetcher::new(&conn, "replies");
        let records = fetcher
            .fetch(&root(1), &FetchRequest::new(["tweet"]))
            .unwrap()
            .unwrap();
        let paths: Vec<&str> = records.iter().map(NodeRecord::path).collect();
        assert_eq!(paths, vec!["1->2", "1->2->3"]);
        assert_eq!(records[1].field("tweet"), Some(&Value::from("b")));
    }

    #[test]
    fn test_custom_schema() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE posts (post_id INTEGER, reply_to INTEGER, body TEXT);
             INSERT INTO posts VALUES (10, NULL, 'r');
             INSERT INTO posts VALUES (11, 10, 'x');",
        )
        .unwrap();

        let mut fetcher =
            SqliteThreadFetcher::with_schema(&conn, "posts", ThreadSchema::new("post_id", "reply_to"));
        let records = fetcher
            .fetch(&root(10), &FetchRequest::new(["body"]))
            .unwrap()
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path(), "10->11");
    }

    #[test]
    fn test_rejects_bad_identifier() {
        let conn = setup();
        let mut fetcher = SqliteThreadFetcher::new(&conn, "tweets; DROP TABLE tweets");
        assert!(fetcher.fetch(&root(1), &FetchRequest::new(["tweet"])).is_err());
    }
}
