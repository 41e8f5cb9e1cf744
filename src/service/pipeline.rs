//! Per-request pipeline: scope, admission, service.
//!
//! The scope is created when the request arrives, so time spent queueing
//! for admission counts against the request budget. The ticket and the
//! scope are both released on every exit path.

use std::sync::Arc;

use crate::fanout::{AdmissionController, BatchError, DeadlinePropagator, FetchedUrl};
use crate::service::BatchFetcher;

#[derive(Clone)]
pub struct Pipeline {
    admission: Arc<AdmissionController>,
    deadlines: DeadlinePropagator,
    service: Arc<dyn BatchFetcher>,
}

impl Pipeline {
    pub fn new(
        admission: Arc<AdmissionController>,
        deadlines: DeadlinePropagator,
        service: Arc<dyn BatchFetcher>,
    ) -> Self {
        Self {
            admission,
            deadlines,
            service,
        }
    }

    pub fn admission(&self) -> &Arc<AdmissionController> {
        &self.admission
    }

    /// Run one inbound batch to completion.
    pub async fn run(&self, urls: Vec<String>) -> Result<Vec<FetchedUrl>, BatchError> {
        let scope = self.deadlines.scope();
        let ticket = self.admission.acquire(&scope).await?;

        tracing::trace!(
            in_flight = self.admission.in_flight(),
            remaining_ms = scope.remaining().as_millis() as u64,
            "Batch admitted"
        );

        let result = self.service.handle_urls(urls, &scope).await;

        ticket.release();
        scope.release();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::{FanOut, FetchError, RequestScope};
    use crate::service::FanOutService;
    use crate::upstream::Fetcher;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;
    use url::Url;

    /// Answers every URL after a fixed delay, recording when each fetch ran.
    struct RecordingFetcher {
        delay: Duration,
        fail_host: Option<&'static str>,
        log: Mutex<Vec<(String, Instant, Instant)>>,
    }

    impl RecordingFetcher {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                fail_host: None,
                log: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Fetcher for RecordingFetcher {
        async fn fetch(&self, url: &Url, _scope: &RequestScope) -> Result<Bytes, FetchError> {
            let started = Instant::now();
            tokio::time::sleep(self.delay).await;
            self.log
                .lock()
                .unwrap()
                .push((url.to_string(), started, Instant::now()));
            if url.host_str() == self.fail_host {
                return Err(FetchError::status(502));
            }
            Ok(Bytes::from(url.to_string()))
        }
    }

    fn pipeline(
        capacity: usize,
        request_timeout: Duration,
        fetcher: Arc<RecordingFetcher>,
    ) -> Pipeline {
        let fan_out = FanOut::new(fetcher, Duration::from_millis(500));
        Pipeline::new(
            Arc::new(AdmissionController::new(capacity)),
            DeadlinePropagator::new(request_timeout),
            Arc::new(FanOutService::new(fan_out, 3)),
        )
    }

    fn batch(prefix: &str) -> Vec<String> {
        (1..=3).map(|i| format!("http://{prefix}{i}.test/")).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn two_batches_run_side_by_side_with_capacity_two() {
        let fetcher = Arc::new(RecordingFetcher::new(Duration::from_millis(50)));
        let pipeline = pipeline(2, Duration::from_millis(500), fetcher.clone());
        let started = Instant::now();

        let (a, b) = tokio::join!(pipeline.run(batch("a")), pipeline.run(batch("b")));

        assert_eq!(a.unwrap().len(), 3);
        assert_eq!(b.unwrap().len(), 3);
        assert!(started.elapsed() < Duration::from_millis(100));
        assert_eq!(pipeline.admission().available(), 2);
    }

    /// Earliest start and latest finish of the fetches for one batch.
    fn span(log: &[(String, Instant, Instant)], prefix: &str) -> (Instant, Instant) {
        let entries: Vec<_> = log.iter().filter(|(url, _, _)| url.starts_with(prefix)).collect();
        let start = entries.iter().map(|(_, start, _)| *start).min().unwrap();
        let done = entries.iter().map(|(_, _, done)| *done).max().unwrap();
        (start, done)
    }

    #[tokio::test(start_paused = true)]
    async fn capacity_one_serialises_batches() {
        let fetcher = Arc::new(RecordingFetcher::new(Duration::from_millis(50)));
        let pipeline = pipeline(1, Duration::from_millis(500), fetcher.clone());

        let (a, b) = tokio::join!(pipeline.run(batch("a")), pipeline.run(batch("b")));
        assert!(a.is_ok());
        assert!(b.is_ok());

        let log = fetcher.log.lock().unwrap();
        let mut spans = vec![span(&log, "http://a"), span(&log, "http://b")];
        spans.sort();
        let (first, second) = (spans[0], spans[1]);
        assert!(second.0 >= first.1, "second batch started before the first released");
        assert_eq!(pipeline.admission().available(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn queued_batch_times_out_waiting_for_admission() {
        let fetcher = Arc::new(RecordingFetcher::new(Duration::from_millis(10)));
        let pipeline = pipeline(1, Duration::from_millis(300), fetcher.clone());

        let holder = RequestScope::with_timeout(Duration::from_secs(60));
        let held = pipeline.admission().acquire(&holder).await.unwrap();

        let started = Instant::now();
        let result = pipeline.run(batch("a")).await;
        assert_eq!(result.unwrap_err(), BatchError::AdmissionTimeout);
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert!(fetcher.log.lock().unwrap().is_empty());

        held.release();
        assert_eq!(pipeline.admission().available(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn request_budget_covers_fetches() {
        let fetcher = Arc::new(RecordingFetcher::new(Duration::from_millis(400)));
        let fan_out = FanOut::new(fetcher, Duration::from_secs(1));
        let pipeline = Pipeline::new(
            Arc::new(AdmissionController::new(1)),
            DeadlinePropagator::new(Duration::from_millis(300)),
            Arc::new(FanOutService::new(fan_out, 3)),
        );

        let result = pipeline.run(batch("a")).await;
        assert_eq!(
            result.unwrap_err(),
            BatchError::Timeout {
                budget: Duration::from_millis(300)
            }
        );
        assert_eq!(pipeline.admission().available(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn capacity_restored_after_mixed_outcomes() {
        let mut fetcher = RecordingFetcher::new(Duration::from_millis(20));
        fetcher.fail_host = Some("bad2.test");
        let fetcher = Arc::new(fetcher);
        let pipeline = pipeline(2, Duration::from_millis(500), fetcher);

        let ok = pipeline.run(batch("ok"));
        let failing = pipeline.run(batch("bad"));
        let empty = pipeline.run(Vec::new());
        let (ok, failing, empty) = tokio::join!(ok, failing, empty);

        assert!(ok.is_ok());
        assert!(matches!(failing, Err(BatchError::Fetch { .. })));
        assert_eq!(empty.unwrap_err(), BatchError::EmptyBatch);
        assert_eq!(pipeline.admission().available(), 2);
        assert_eq!(pipeline.admission().in_flight(), 0);
    }
}
