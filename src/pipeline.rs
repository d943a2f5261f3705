//! Per-seed thread processing: fetch, filter, nest, write.

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::sink::OutputSink;
use crate::threading::{is_breadth_ordered, nest_descendants, FetchRequest, NodeRecord, ThreadFetcher};

/// Counts from one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Seeds processed
    pub seeds: usize,
    /// Threads handed to the sink
    pub threads_written: usize,
    /// Threads discarded by the reply range
    pub threads_skipped: usize,
    /// Records handed to the sink, seeds included
    pub records_written: usize,
}

/// Drives one fetcher and one sink over a list of seeds.
///
/// Seeds are processed strictly in order, one at a time: a thread is fetched,
/// nested and written before the next seed is fetched. Threads whose
/// descendant count falls outside the request's reply range are skipped.
/// The first error aborts the run; threads already written stay written.
pub struct ThreadPipeline<F, S> {
    fetcher: F,
    sink: S,
    request: FetchRequest,
}

impl<F: ThreadFetcher, S: OutputSink> ThreadPipeline<F, S> {
    /// Create a pipeline.
    pub fn new(fetcher: F, sink: S, request: FetchRequest) -> Self {
        Self {
            fetcher,
            sink,
            request,
        }
    }

    /// The fetch parameters used for every seed.
    pub fn request(&self) -> &FetchRequest {
        &self.request
    }

    /// Get a reference to the fetcher.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Get a reference to the sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consume the pipeline, returning the fetcher and the sink.
    pub fn into_parts(self) -> (F, S) {
        (self.fetcher, self.sink)
    }

    /// Process a single seed.
    ///
    /// Returns the number of descendants written, or `None` if the thread
    /// was skipped. Does not call [`OutputSink::finish`].
    pub fn process(&mut self, root: &NodeRecord) -> Result<Option<usize>> {
        let Some(descendants) = self.fetcher.fetch(root, &self.request)? else {
            debug!(seed = root.id(), "thread outside reply range, skipped");
            return Ok(None);
        };

        if !is_breadth_ordered(&descendants) {
            warn!(seed = root.id(), "fetched descendants are not in breadth order");
        }

        let fetched = descendants.len();
        let nested = nest_descendants(root, descendants);
        if nested.len() < fetched {
            debug!(
                seed = root.id(),
                excluded = fetched - nested.len(),
                "excluded replies not reachable from the seed"
            );
        }

        self.sink.accept(root, &nested)?;
        Ok(Some(nested.len()))
    }

    /// Process every seed in order, then finish the sink.
    pub fn run<'a, I>(&mut self, seeds: I) -> Result<RunSummary>
    where
        I: IntoIterator<Item = &'a NodeRecord>,
    {
        let mut summary = RunSummary::default();
        info!("starting thread export");

        for root in seeds {
            summary.seeds += 1;
            match self.process(root)? {
                Some(written) => {
                    summary.threads_written += 1;
                    summary.records_written += written + 1;
                }
                None => summary.threads_skipped += 1,
            }
        }

        self.sink.finish()?;

        info!(
            seeds = summary.seeds,
            written = summary.threads_written,
            skipped = summary.threads_skipped,
            records = summary.records_written,
            "thread export finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::threading::{NestedSequence, NodeId, Payload, ReplyRange};

    /// Fetcher returning canned descendant lists.
    struct Canned {
        threads: Vec<(NodeId, Vec<NodeRecord>)>,
        fail_on: Option<NodeId>,
    }

    impl ThreadFetcher for Canned {
        fn fetch(
            &mut self,
            root: &NodeRecord,
            request: &FetchRequest,
        ) -> Result<Option<Vec<NodeRecord>>> {
            if self.fail_on == Some(root.id()) {
                return Err(Error::config("store unavailable"));
            }
            let list = self
                .threads
                .iter()
                .find(|(id, _)| *id == root.id())
                .map(|(_, list)| list.clone())
                .unwrap_or_default();
            Ok(request.accepts(list.len()).then_some(list))
        }
    }

    #[derive(Default)]
    struct Collect {
        threads: Vec<(NodeId, Vec<NodeId>)>,
        finished: bool,
    }

    impl OutputSink for Collect {
        fn accept(&mut self, root: &NodeRecord, nested: &NestedSequence) -> Result<()> {
            self.threads.push((root.id(), nested.ids()));
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            self.finished = true;
            Ok(())
        }
    }

    fn reply(id: NodeId, parent: NodeId, depth: u32) -> NodeRecord {
        NodeRecord::reply(id, parent, depth, format!("{parent}->{id}"), Payload::new())
    }

    fn seeds(ids: &[NodeId]) -> Vec<NodeRecord> {
        ids.iter().map(|&id| NodeRecord::root(id, Payload::new())).collect()
    }

    fn canned() -> Canned {
        Canned {
            threads: vec![
                (1, vec![reply(2, 1, 2), reply(3, 1, 2), reply(4, 2, 3)]),
                (10, vec![reply(11, 10, 2)]),
            ],
            fail_on: None,
        }
    }

    #[test]
    fn test_run_writes_threads_in_seed_order() {
        let mut pipeline = ThreadPipeline::new(canned(), Collect::default(), FetchRequest::default());
        let summary = pipeline.run(&seeds(&[10, 1])).unwrap();

        assert_eq!(
            summary,
            RunSummary {
                seeds: 2,
                threads_written: 2,
                threads_skipped: 0,
                records_written: 6,
            }
        );

        let (_, sink) = pipeline.into_parts();
        assert!(sink.finished);
        assert_eq!(sink.threads, vec![(10, vec![11]), (1, vec![2, 4, 3])]);
    }

    #[test]
    fn test_run_skips_out_of_range() {
        let request = FetchRequest::default().reply_range(ReplyRange::new(2, 5).unwrap());
        let mut pipeline = ThreadPipeline::new(canned(), Collect::default(), request);
        let summary = pipeline.run(&seeds(&[1, 10, 99])).unwrap();

        assert_eq!(summary.threads_written, 1);
        assert_eq!(summary.threads_skipped, 2);
        assert_eq!(pipeline.sink().threads, vec![(1, vec![2, 4, 3])]);
    }

    #[test]
    fn test_run_aborts_on_error() {
        let mut fetcher = canned();
        fetcher.fail_on = Some(10);
        let mut pipeline = ThreadPipeline::new(fetcher, Collect::default(), FetchRequest::default());

        let result = pipeline.run(&seeds(&[1, 10, 1]));
        assert!(result.is_err());

        let sink = pipeline.sink();
        assert_eq!(sink.threads.len(), 1);
        assert!(!sink.finished);
    }

    #[test]
    fn test_process_excludes_orphans() {
        let fetcher = Canned {
            threads: vec![(1, vec![reply(2, 1, 2), reply(5, 77, 2), reply(6, 5, 3)])],
            fail_on: None,
        };
        let mut pipeline = ThreadPipeline::new(fetcher, Collect::default(), FetchRequest::default());

        let root = NodeRecord::root(1, Payload::new());
        assert_eq!(pipeline.process(&root).unwrap(), Some(1));
        assert_eq!(pipeline.sink().threads, vec![(1, vec![2])]);
    }

    #[test]
    fn test_empty_seed_list_still_finishes() {
        let mut pipeline = ThreadPipeline::new(canned(), Collect::default(), FetchRequest::default());
        let summary = pipeline.run(&Vec::<NodeRecord>::new()).unwrap();
        assert_eq!(summary, RunSummary::default());
        assert!(pipeline.sink().finished);
    }
}
