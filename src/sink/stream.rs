//! Sequential record stream (CSV) output.

use std::io::Write;

use bytes::{BufMut, Bytes, BytesMut};
use encoding_rs::{Encoding, UTF_8};
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::threading::{NestedSequence, NodeId, NodeRecord};

use super::OutputSink;

/// Columns appended after the projected payload columns.
const TRAILING_COLUMNS: [&str; 4] = ["path", "depth", "is_seed", "seed_id"];

/// Path placeholder written for seed rows.
const SEED_PATH: &str = "NONE";

const DELIMITER: char = ',';
const LINE_END: &str = "\r\n";

/// Writes threads as CSV rows, in exactly the order received.
///
/// The header is the projected columns followed by `path, depth, is_seed,
/// seed_id`. It is written before the first row, or on
/// [`finish`](OutputSink::finish) if no thread was accepted. Each thread produces its seed row
/// (path `NONE`, depth `1`, `TRUE`) and then one row per descendant
/// (`FALSE`, carrying the seed's identity).
///
/// Rows for a thread are encoded into a single buffer with
/// [`encode_thread`](Self::encode_thread) and written with one call, so a
/// caller can also take the bytes and do the I/O itself.
pub struct RecordStreamSink<W: Write> {
    writer: W,
    columns: Vec<String>,
    encoding: &'static Encoding,
    header_written: bool,
    rows_written: u64,
}

impl<W: Write> RecordStreamSink<W> {
    /// Create a sink writing the given payload columns to `writer`.
    pub fn new(writer: W, columns: Vec<String>) -> Self {
        Self {
            writer,
            columns,
            encoding: UTF_8,
            header_written: false,
            rows_written: 0,
        }
    }

    /// Transcode output to the encoding named by `label` (e.g. `windows-1252`).
    ///
    /// Labels follow the WHATWG Encoding Standard. UTF-16 labels produce
    /// UTF-8, since UTF-16 is decode-only in that standard.
    pub fn with_encoding(mut self, label: &str) -> Result<Self> {
        self.encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| Error::config(format!("unknown output encoding '{label}'")))?;
        Ok(self)
    }

    /// The header row.
    pub fn header(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(String::as_str)
            .chain(TRAILING_COLUMNS)
            .collect()
    }

    /// Number of data rows written so far (header excluded).
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Get a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Consume the sink, returning the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Encode one thread's rows (and the header, on the first call).
    ///
    /// Nothing is marked written until every row encoded successfully.
    pub fn encode_thread(&mut self, root: &NodeRecord, nested: &NestedSequence) -> Result<Bytes> {
        let mut text = String::new();

        if !self.header_written {
            self.push_header(&mut text);
        }

        let seed_id = root.id().to_string();

        let mut seed_row = self.payload_cells(root)?;
        seed_row.extend([
            SEED_PATH.to_string(),
            "1".to_string(),
            "TRUE".to_string(),
            seed_id.clone(),
        ]);
        push_row(&mut text, seed_row);

        for record in nested {
            let mut row = self.payload_cells(record)?;
            row.extend([
                record.path().to_string(),
                record.depth().to_string(),
                "FALSE".to_string(),
                seed_id.clone(),
            ]);
            push_row(&mut text, row);
        }

        self.header_written = true;
        self.rows_written += 1 + nested.len() as u64;

        Ok(self.encode_text(&text, Some(root.id())))
    }

    fn push_header(&self, text: &mut String) {
        push_row(text, self.header().into_iter().map(str::to_string));
    }

    fn encode_text(&self, text: &str, seed: Option<NodeId>) -> Bytes {
        let (encoded, _, had_unmappable) = self.encoding.encode(text);
        if had_unmappable {
            warn!(
                encoding = self.encoding.name(),
                ?seed,
                "unmappable characters written as numeric character references"
            );
        }
        let mut buf = BytesMut::with_capacity(encoded.len());
        buf.put_slice(&encoded);
        buf.freeze()
    }

    fn payload_cells(&self, record: &NodeRecord) -> Result<Vec<String>> {
        self.columns
            .iter()
            .map(|column| {
                record
                    .field(column)
                    .map(|value| value.to_string())
                    .ok_or_else(|| Error::MissingColumn {
                        column: column.clone(),
                        node: record.id(),
                    })
            })
            .collect()
    }
}

impl<W: Write> OutputSink for RecordStreamSink<W> {
    fn accept(&mut self, root: &NodeRecord, nested: &NestedSequence) -> Result<()> {
        let bytes = self.encode_thread(root, nested)?;
        self.writer.write_all(&bytes)?;
        trace!(seed = root.id(), rows = nested.len() + 1, "wrote thread rows");
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if !self.header_written {
            let mut text = String::new();
            self.push_header(&mut text);
            let bytes = self.encode_text(&text, None);
            self.writer.write_all(&bytes)?;
            self.header_written = true;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Append one CSV row, quoting fields that need it.
fn push_row(line: &mut String, fields: impl IntoIterator<Item = String>) {
    for (idx, field) in fields.into_iter().enumerate() {
        if idx > 0 {
            line.push(DELIMITER);
        }
        if field.contains([DELIMITER, '"', '\r', '\n']) {
            line.push('"');
            line.push_str(&field.replace('"', "\"\""));
            line.push('"');
        } else {
            line.push_str(&field);
        }
    }
    line.push_str(LINE_END);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threading::{nest_descendants, Payload, Value};

    fn post(id: i64, text: &str) -> Payload {
        Payload::new().with("id", id).with("tweet", text)
    }

    fn sample_thread() -> (NodeRecord, NestedSequence) {
        let root = NodeRecord::root(1, post(1, "root"));
        let nested = nest_descendants(
            &root,
            vec![
                NodeRecord::reply(2, 1, 2, "1->2", post(2, "a")),
                NodeRecord::reply(3, 1, 2, "1->3", post(3, "b")),
                NodeRecord::reply(4, 2, 3, "1->2->4", post(4, "c")),
            ],
        );
        (root, nested)
    }

    fn columns() -> Vec<String> {
        vec!["id".to_string(), "tweet".to_string()]
    }

    #[test]
    fn test_header_and_rows() {
        let (root, nested) = sample_thread();
        let mut sink = RecordStreamSink::new(Vec::new(), columns());
        sink.accept(&root, &nested).unwrap();
        sink.finish().unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.split("\r\n").collect();
        assert_eq!(
            lines,
            vec![
                "id,tweet,path,depth,is_seed,seed_id",
                "1,root,NONE,1,TRUE,1",
                "2,a,1->2,2,FALSE,1",
                "4,c,1->2->4,3,FALSE,1",
                "3,b,1->3,2,FALSE,1",
                "",
            ]
        );
    }

    #[test]
    fn test_header_written_once() {
        let (root, nested) = sample_thread();
        let other = NodeRecord::root(9, post(9, "other"));

        let mut sink = RecordStreamSink::new(Vec::new(), columns());
        sink.accept(&root, &nested).unwrap();
        sink.accept(&other, &NestedSequence::default()).unwrap();

        assert_eq!(sink.rows_written(), 5);
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(output.matches("is_seed").count(), 1);
        assert!(output.ends_with("9,other,NONE,1,TRUE,9\r\n"));
    }

    #[test]
    fn test_quoting() {
        let root = NodeRecord::root(
            1,
            Payload::new()
                .with("id", 1i64)
                .with("tweet", "hello, \"world\"\nbye"),
        );
        let mut sink = RecordStreamSink::new(Vec::new(), columns());
        sink.accept(&root, &NestedSequence::default()).unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.contains("1,\"hello, \"\"world\"\"\nbye\",NONE,1,TRUE,1\r\n"));
    }

    #[test]
    fn test_null_renders_empty() {
        let root = NodeRecord::root(1, Payload::new().with("id", 1i64).with("tweet", Value::Null));
        let mut sink = RecordStreamSink::new(Vec::new(), columns());
        let bytes = sink.encode_thread(&root, &NestedSequence::default()).unwrap();
        assert!(bytes.ends_with(b"1,,NONE,1,TRUE,1\r\n"));
    }

    #[test]
    fn test_missing_column() {
        let root = NodeRecord::root(1, Payload::new().with("id", 1i64));
        let mut sink = RecordStreamSink::new(Vec::new(), columns());
        let err = sink.accept(&root, &NestedSequence::default()).unwrap_err();
        assert!(matches!(err, Error::MissingColumn { ref column, node: 1 } if column == "tweet"));
    }

    #[test]
    fn test_windows_1252_encoding() {
        let root = NodeRecord::root(1, Payload::new().with("id", 1i64).with("tweet", "café"));
        let mut sink = RecordStreamSink::new(Vec::new(), columns())
            .with_encoding("windows-1252")
            .unwrap();
        sink.accept(&root, &NestedSequence::default()).unwrap();

        let output = sink.into_inner();
        // é is a single byte in windows-1252
        assert!(output.windows(5).any(|w| w == b"caf\xe9,"));
    }

    #[test]
    fn test_header_without_threads() {
        let mut sink = RecordStreamSink::new(Vec::new(), columns());
        sink.finish().unwrap();
        sink.finish().unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(output, "id,tweet,path,depth,is_seed,seed_id\r\n");
    }

    #[test]
    fn test_failed_thread_keeps_header_pending() {
        let (root, nested) = sample_thread();
        let broken = NodeRecord::root(7, Payload::new().with("id", 7i64));

        let mut sink = RecordStreamSink::new(Vec::new(), columns());
        assert!(sink.accept(&broken, &NestedSequence::default()).is_err());
        sink.accept(&root, &nested).unwrap();
        sink.finish().unwrap();

        assert_eq!(sink.rows_written(), 4);
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.starts_with("id,tweet,path,depth,is_seed,seed_id\r\n1,root,"));
        assert_eq!(output.matches("is_seed").count(), 1);
    }

    #[test]
    fn test_unmappable_characters() {
        let root = NodeRecord::root(1, Payload::new().with("id", 1i64).with("tweet", "hi \u{1F600}"));
        let mut sink = RecordStreamSink::new(Vec::new(), columns())
            .with_encoding("windows-1252")
            .unwrap();
        sink.accept(&root, &NestedSequence::default()).unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.contains("1,hi &#128512;,NONE,1,TRUE,1\r\n"));
    }

    #[test]
    fn test_unknown_encoding() {
        let result = RecordStreamSink::new(Vec::new(), columns()).with_encoding("klingon");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
