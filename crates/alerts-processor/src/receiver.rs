//! Bounded fan-out of webhook batches onto a fixed worker pool.
//!
//! Submission pushes each alert onto a bounded queue and returns once every
//! alert is queued. A fixed number of worker tasks drain the queue, so at most
//! `max_workers` pipelines run at any time. When the queue is full the
//! submitting caller waits for space; that wait is the backpressure applied to
//! very large batches.
//!
//! Each alert runs in its own spawned task, awaited by the worker that picked
//! it up. An error or panic in one alert is counted and logged, and the worker
//! moves on to the next.
//!
//! Every worker holds a receiver of a `watch` channel and drops it on exit, so
//! any number of callers can wait for the pool to drain via `Sender::closed`.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::error::{PipelineError, ReceiverError};
use crate::models::{AlertStatus, AlertmanagerPayload, RawAlert};
use crate::processor::AlertProcessor;

/// Default number of concurrent pipeline runs.
pub const DEFAULT_MAX_WORKERS: usize = 8;

/// Default number of alerts that may wait for a free worker.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Worker pool sizing.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Number of worker tasks
    pub max_workers: usize,
    /// Capacity of the submission queue
    pub queue_capacity: usize,
    /// Optional limit on a single alert's pipeline run
    pub alert_timeout: Option<Duration>,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            alert_timeout: None,
        }
    }
}

impl ReceiverConfig {
    #[must_use]
    pub fn with_workers(max_workers: usize) -> Self {
        Self {
            max_workers,
            ..Self::default()
        }
    }
}

/// Running totals for the receiver.
#[derive(Debug, Default)]
pub struct ReceiverStats {
    submitted: AtomicU64,
    processed: AtomicU64,
    invalid: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
}

/// Point-in-time copy of [`ReceiverStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub submitted: u64,
    pub processed: u64,
    pub invalid: u64,
    pub failed: u64,
    pub rejected: u64,
}

impl StatsSnapshot {
    /// Alerts that reached a terminal outcome, successful or not.
    #[must_use]
    pub fn finished(&self) -> u64 {
        self.processed + self.invalid + self.failed
    }
}

impl ReceiverStats {
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    fn record(&self, status: AlertStatus) {
        match status {
            AlertStatus::Processed => self.processed.fetch_add(1, Ordering::Relaxed),
            AlertStatus::Invalid => self.invalid.fetch_add(1, Ordering::Relaxed),
        };
    }
}

type Queue = Arc<tokio::sync::Mutex<mpsc::Receiver<RawAlert>>>;

/// Accepts webhook batches and dispatches each alert to the pipeline.
pub struct AlertsReceiver {
    sender: Mutex<Option<mpsc::Sender<RawAlert>>>,
    drained: watch::Sender<()>,
    stats: Arc<ReceiverStats>,
}

impl AlertsReceiver {
    /// Start the worker pool. Must be called from within a Tokio runtime.
    ///
    /// Zero-valued sizes are raised to 1.
    pub fn new(processor: Arc<dyn AlertProcessor>, config: &ReceiverConfig) -> Self {
        let max_workers = config.max_workers.max(1);
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let queue: Queue = Arc::new(tokio::sync::Mutex::new(receiver));
        let stats = Arc::new(ReceiverStats::default());
        let (drained, alive) = watch::channel(());

        for worker_id in 0..max_workers {
            tokio::spawn(run_worker(
                worker_id,
                Arc::clone(&queue),
                Arc::clone(&processor),
                Arc::clone(&stats),
                config.alert_timeout,
                alive.clone(),
            ));
        }
        drop(alive);

        info!(
            max_workers,
            queue_capacity = config.queue_capacity.max(1),
            "Alerts receiver started"
        );

        Self {
            sender: Mutex::new(Some(sender)),
            drained,
            stats,
        }
    }

    /// Queue every alert in the batch, in order. Returns the number queued
    /// once all are submitted; processing happens later on the pool.
    pub async fn handle_webhook(&self, payload: AlertmanagerPayload) -> Result<usize, ReceiverError> {
        let total = payload.len();
        let Some(sender) = self.current_sender() else {
            return Err(self.reject(total));
        };

        for (index, raw) in payload.alerts.into_iter().enumerate() {
            if sender.send(raw).await.is_err() {
                return Err(self.reject(total - index));
            }
            self.stats.submitted.fetch_add(1, Ordering::Relaxed);
        }

        debug!(alerts = total, "Webhook batch submitted");
        Ok(total)
    }

    /// Stop accepting alerts. With `wait`, block until every queued and
    /// running alert has finished; otherwise return immediately and let the
    /// workers drain the queue in the background.
    ///
    /// Every call with `wait` blocks until the pool is drained, including
    /// calls made after an earlier shutdown or concurrently with one.
    pub async fn shutdown(&self, wait: bool) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_some() {
            info!(wait, "Alerts receiver shutting down");
        }
        drop(sender);

        if !wait {
            return;
        }

        self.drained.closed().await;
        info!(stats = ?self.stats.snapshot(), "Alerts receiver drained");
    }

    /// Whether new alerts are still accepted.
    pub fn is_accepting(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn current_sender(&self) -> Option<mpsc::Sender<RawAlert>> {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn reject(&self, count: usize) -> ReceiverError {
        self.stats
            .rejected
            .fetch_add(count as u64, Ordering::Relaxed);
        warn!(rejected = count, "Receiver is shut down, rejecting alerts");
        ReceiverError::ShuttingDown { rejected: count }
    }
}

async fn run_worker(
    worker_id: usize,
    queue: Queue,
    processor: Arc<dyn AlertProcessor>,
    stats: Arc<ReceiverStats>,
    alert_timeout: Option<Duration>,
    _alive: watch::Receiver<()>,
) {
    loop {
        // Lock is held only while waiting for the next alert
        let next = queue.lock().await.recv().await;
        let Some(raw) = next else {
            break;
        };

        let alert_name = raw.name().unwrap_or("unknown_alert").to_string();
        let processor = Arc::clone(&processor);
        let run = tokio::spawn(async move {
            match alert_timeout {
                Some(limit) => tokio::time::timeout(limit, processor.process(raw))
                    .await
                    .unwrap_or_else(|_| Err(PipelineError::Timeout(limit))),
                None => processor.process(raw).await,
            }
        });

        match run.await {
            Ok(Ok(processed)) => {
                stats.record(processed.status);
                debug!(
                    worker_id,
                    alert_id = %processed.alert_id,
                    alert = %alert_name,
                    status = %processed.status,
                    "Alert processed"
                );
            }
            Ok(Err(e)) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                error!(worker_id, alert = %alert_name, error = %e, "Alert pipeline failed");
            }
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                error!(worker_id, alert = %alert_name, error = %e, "Alert pipeline panicked");
            }
        }
    }

    debug!(worker_id, "Alert worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClusterError;
    use crate::models::{DeploymentInfo, EnrichedAlert, ProcessedAlert};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    /// Processor that sleeps, tracks peak concurrency, and misbehaves on
    /// alerts named "fail" or "panic".
    #[derive(Default)]
    struct ProbeProcessor {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        records: Mutex<Vec<ProcessedAlert>>,
        delay: Duration,
    }

    impl ProbeProcessor {
        fn with_delay(delay: Duration) -> Self {
            Self {
                delay,
                ..Default::default()
            }
        }

        fn record_count(&self) -> usize {
            self.records.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AlertProcessor for ProbeProcessor {
        async fn process(&self, raw: RawAlert) -> Result<ProcessedAlert, PipelineError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let name = raw.name().unwrap_or_default().to_string();
            match name.as_str() {
                "fail" => {
                    return Err(PipelineError::Cluster(ClusterError::Unavailable(
                        "unreachable".to_string(),
                    )))
                }
                "panic" => panic!("pipeline bug"),
                _ => {}
            }

            let processed = ProcessedAlert::new(
                AlertStatus::Processed,
                EnrichedAlert {
                    cluster_verified: true,
                    deployment_info: DeploymentInfo::default(),
                    alert_name: name,
                    severity: "warning".to_string(),
                },
            );
            self.records.lock().unwrap().push(processed.clone());
            Ok(processed)
        }
    }

    fn batch(names: &[&str]) -> AlertmanagerPayload {
        AlertmanagerPayload::new(
            names
                .iter()
                .map(|name| {
                    RawAlert::firing(HashMap::from([(
                        "alertname".to_string(),
                        (*name).to_string(),
                    )]))
                })
                .collect(),
        )
    }

    fn numbered(count: usize) -> AlertmanagerPayload {
        let names: Vec<String> = (0..count).map(|i| format!("alert-{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        batch(&refs)
    }

    async fn run_batch(alerts: usize, workers: usize) -> (Arc<ProbeProcessor>, StatsSnapshot) {
        let processor = Arc::new(ProbeProcessor::with_delay(Duration::from_millis(5)));
        let receiver = AlertsReceiver::new(processor.clone(), &ReceiverConfig::with_workers(workers));

        let submitted = receiver.handle_webhook(numbered(alerts)).await.unwrap();
        assert_eq!(submitted, alerts);

        receiver.shutdown(true).await;
        (processor, receiver.stats())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_fewer_alerts_than_workers() {
        let (processor, stats) = run_batch(3, 8).await;
        assert_eq!(processor.record_count(), 3);
        assert_eq!(stats.processed, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_as_many_alerts_as_workers() {
        let (processor, stats) = run_batch(8, 8).await;
        assert_eq!(processor.record_count(), 8);
        assert_eq!(stats.submitted, 8);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_more_alerts_than_workers() {
        let (processor, stats) = run_batch(50, 4).await;
        assert_eq!(processor.record_count(), 50);
        assert_eq!(stats.finished(), 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded_by_pool_size() {
        let processor = Arc::new(ProbeProcessor::with_delay(Duration::from_millis(20)));
        let receiver = AlertsReceiver::new(processor.clone(), &ReceiverConfig::with_workers(3));

        receiver.handle_webhook(numbered(20)).await.unwrap();
        receiver.shutdown(true).await;

        let peak = processor.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency {peak} exceeded pool size");
        assert!(peak >= 1);
        assert_eq!(processor.record_count(), 20);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_small_queue_applies_backpressure_without_loss() {
        let processor = Arc::new(ProbeProcessor::with_delay(Duration::from_millis(2)));
        let config = ReceiverConfig {
            max_workers: 2,
            queue_capacity: 1,
            alert_timeout: None,
        };
        let receiver = AlertsReceiver::new(processor.clone(), &config);

        receiver.handle_webhook(numbered(30)).await.unwrap();
        receiver.shutdown(true).await;
        assert_eq!(processor.record_count(), 30);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failures_do_not_affect_siblings() {
        let processor = Arc::new(ProbeProcessor::with_delay(Duration::from_millis(1)));
        let receiver = AlertsReceiver::new(processor.clone(), &ReceiverConfig::with_workers(2));

        receiver
            .handle_webhook(batch(&["ok-1", "fail", "panic", "ok-2", "panic", "ok-3"]))
            .await
            .unwrap();
        receiver.shutdown(true).await;

        let stats = receiver.stats();
        assert_eq!(processor.record_count(), 3);
        assert_eq!(stats.processed, 3);
        assert_eq!(stats.failed, 3);
        assert_eq!(stats.submitted, 6);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let processor = Arc::new(ProbeProcessor::with_delay(Duration::from_millis(200)));
        let config = ReceiverConfig {
            max_workers: 1,
            queue_capacity: 4,
            alert_timeout: Some(Duration::from_millis(10)),
        };
        let receiver = AlertsReceiver::new(processor.clone(), &config);

        receiver.handle_webhook(batch(&["slow"])).await.unwrap();
        receiver.shutdown(true).await;

        assert_eq!(processor.record_count(), 0);
        assert_eq!(receiver.stats().failed, 1);
    }

    #[tokio::test]
    async fn test_submission_after_shutdown_is_rejected() {
        let processor = Arc::new(ProbeProcessor::default());
        let receiver = AlertsReceiver::new(processor.clone(), &ReceiverConfig::default());

        receiver.shutdown(true).await;
        assert!(!receiver.is_accepting());

        let err = receiver.handle_webhook(batch(&["late", "later"])).await.unwrap_err();
        assert!(matches!(err, ReceiverError::ShuttingDown { rejected: 2 }));
        assert_eq!(receiver.stats().rejected, 2);
        assert_eq!(processor.record_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_without_wait_still_drains() {
        let processor = Arc::new(ProbeProcessor::with_delay(Duration::from_millis(5)));
        let receiver = AlertsReceiver::new(processor.clone(), &ReceiverConfig::with_workers(2));

        receiver.handle_webhook(numbered(6)).await.unwrap();
        receiver.shutdown(false).await;
        assert!(!receiver.is_accepting());
        assert!(receiver.handle_webhook(numbered(1)).await.is_err());

        for _ in 0..100 {
            if processor.record_count() == 6 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(processor.record_count(), 6);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_wait_after_detached_shutdown_still_drains() {
        let processor = Arc::new(ProbeProcessor::with_delay(Duration::from_millis(100)));
        let receiver = AlertsReceiver::new(processor.clone(), &ReceiverConfig::with_workers(2));

        receiver.handle_webhook(numbered(6)).await.unwrap();
        receiver.shutdown(false).await;
        receiver.shutdown(true).await;

        assert_eq!(processor.record_count(), 6);
        assert_eq!(receiver.stats().processed, 6);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_shutdowns_both_wait_for_drain() {
        let processor = Arc::new(ProbeProcessor::with_delay(Duration::from_millis(100)));
        let receiver = Arc::new(AlertsReceiver::new(
            processor.clone(),
            &ReceiverConfig::with_workers(2),
        ));
        receiver.handle_webhook(numbered(6)).await.unwrap();

        let first = tokio::spawn({
            let receiver = Arc::clone(&receiver);
            async move { receiver.shutdown(true).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        receiver.shutdown(true).await;
        assert_eq!(processor.record_count(), 6);

        first.await.unwrap();
        assert_eq!(receiver.stats().finished(), 6);
    }

    #[tokio::test]
    async fn test_empty_batch_and_repeated_shutdown() {
        let processor = Arc::new(ProbeProcessor::default());
        let receiver = AlertsReceiver::new(processor, &ReceiverConfig::default());

        assert_eq!(receiver.handle_webhook(AlertmanagerPayload::default()).await.unwrap(), 0);
        receiver.shutdown(true).await;
        receiver.shutdown(true).await;
        assert_eq!(receiver.stats(), StatsSnapshot::default());
    }
}
