//! Example exporting threads from an in-memory store.
//!
//! This example builds a small discussion in a `MemoryStore`, runs it through
//! the pipeline twice, and prints the CSV rows and the reply graphs.

use reply_threads::mock::MemoryStore;
use reply_threads::{FetchRequest, GraphSink, Payload, RecordStreamSink, ReplyRange, ThreadPipeline};

fn post(user: i64, text: &str, time: &str) -> Payload {
    Payload::new()
        .with("user_id", user)
        .with("tweet", text)
        .with("created_at", time)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Reply Thread Export Example ===\n");

    let mut store = MemoryStore::new();
    store
        .insert(100, None, post(1, "Is Rust good for data tools?", "2020-03-01T10:00"))
        .insert(101, Some(100), post(2, "Yes, the type system helps.", "2020-03-01T10:05"))
        .insert(102, Some(100), post(3, "Depends on the ecosystem.", "2020-03-01T10:07"))
        .insert(103, Some(101), post(1, "Which parts help most?", "2020-03-01T10:09"))
        .insert(104, Some(103), post(2, "Enums, mostly.", "2020-03-01T10:12"))
        .insert(200, None, post(4, "Nobody replies to this one", "2020-03-02T08:00"));

    let columns: Vec<String> = ["id", "user_id", "tweet", "created_at"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    let seeds = store.roots(&columns);
    let request = FetchRequest::new(columns.clone()).reply_range(ReplyRange::default());

    // CSV rows in nested order
    let sink = RecordStreamSink::new(Vec::new(), columns.clone());
    let mut pipeline = ThreadPipeline::new(store.clone(), sink, request.clone());
    let summary = pipeline.run(&seeds)?;
    let (_, sink) = pipeline.into_parts();

    println!("{}", String::from_utf8(sink.into_inner())?);
    println!(
        "{} threads written, {} skipped\n",
        summary.threads_written, summary.threads_skipped
    );

    // Reply graphs
    let mut pipeline = ThreadPipeline::new(store, GraphSink::new(), request);
    pipeline.run(&seeds)?;
    let (_, sink) = pipeline.into_parts();

    for thread in sink.into_graphs() {
        println!(
            "Thread {}: {} posts, {} replies",
            thread.root_id,
            thread.node_count(),
            thread.edge_count()
        );
    }

    Ok(())
}
