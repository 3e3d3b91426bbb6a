//! Progress reporting for verbose runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

/// Snapshot of a running batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressReport {
    pub processed: usize,
    pub total: usize,
    pub elapsed: Duration,
    /// Remaining time extrapolated from the mean time per processed item.
    pub eta: Option<Duration>,
}

impl ProgressReport {
    pub fn new(processed: usize, total: usize, elapsed: Duration) -> Self {
        let eta = (processed > 0 && processed <= total).then(|| {
            let per_item = elapsed.as_secs_f64() / processed as f64;
            Duration::from_secs_f64(per_item * (total - processed) as f64)
        });
        Self {
            processed,
            total,
            elapsed,
            eta,
        }
    }

    /// Fraction complete in `[0, 1]`; an empty batch counts as complete.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.processed as f64 / self.total as f64
        }
    }
}

/// Receiver of progress updates; called from worker threads.
pub trait ProgressSink: Send + Sync {
    /// Called after every finished item, including failed ones.
    fn update(&self, report: &ProgressReport);

    /// Called once when every item has been processed.
    fn finish(&self, _report: &ProgressReport) {}

    /// Called once when the batch stops early.
    fn abandon(&self, _report: &ProgressReport) {}
}

/// Sink that logs through `tracing`, at most once per tenth of the batch.
#[derive(Debug, Default)]
pub struct TracingProgress {
    last_decile: AtomicUsize,
}

impl TracingProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressSink for TracingProgress {
    fn update(&self, report: &ProgressReport) {
        let decile = (report.fraction() * 10.0).floor() as usize;
        if self.last_decile.fetch_max(decile, Ordering::Relaxed) < decile {
            info!(
                processed = report.processed,
                total = report.total,
                eta_ms = report.eta.map(|d| d.as_millis() as u64),
                "progress {:.0}%",
                report.fraction() * 100.0
            );
        }
    }

    fn finish(&self, report: &ProgressReport) {
        info!(
            total = report.total,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "all items processed"
        );
    }
}

/// Per-batch counter shared by workers.
pub(crate) struct Tracker {
    sink: Option<Arc<dyn ProgressSink>>,
    total: usize,
    processed: AtomicUsize,
    started: Instant,
}

impl Tracker {
    pub(crate) fn new(sink: Option<Arc<dyn ProgressSink>>, total: usize) -> Self {
        Self {
            sink,
            total,
            processed: AtomicUsize::new(0),
            started: Instant::now(),
        }
    }

    pub(crate) fn processed(&self) -> usize {
        self.processed.load(Ordering::Acquire)
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub(crate) fn advance(&self) {
        let done = self.processed.fetch_add(1, Ordering::AcqRel) + 1;
        if let Some(sink) = &self.sink {
            sink.update(&self.report(done));
        }
    }

    pub(crate) fn finish(&self) {
        if let Some(sink) = &self.sink {
            sink.finish(&self.report(self.processed()));
        }
    }

    pub(crate) fn abandon(&self) {
        if let Some(sink) = &self.sink {
            sink.abandon(&self.report(self.processed()));
        }
    }

    fn report(&self, processed: usize) -> ProgressReport {
        ProgressReport::new(processed, self.total, self.started.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        updates: Mutex<Vec<usize>>,
        finished: Mutex<Option<usize>>,
    }

    impl ProgressSink for Recorder {
        fn update(&self, report: &ProgressReport) {
            self.updates.lock().unwrap().push(report.processed);
        }

        fn finish(&self, report: &ProgressReport) {
            *self.finished.lock().unwrap() = Some(report.processed);
        }
    }

    #[test]
    fn fraction_and_eta_follow_progress() {
        let report = ProgressReport::new(1, 4, Duration::from_secs(2));

        assert_eq!(report.fraction(), 0.25);
        assert_eq!(report.eta, Some(Duration::from_secs(6)));
        assert_eq!(ProgressReport::new(0, 0, Duration::ZERO).fraction(), 1.0);
        assert_eq!(ProgressReport::new(0, 3, Duration::ZERO).eta, None);
    }

    #[test]
    fn tracker_reports_every_item_then_finishes() {
        let recorder = Arc::new(Recorder::default());
        let tracker = Tracker::new(Some(recorder.clone()), 3);

        for _ in 0..3 {
            tracker.advance();
        }
        tracker.finish();

        assert_eq!(*recorder.updates.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(*recorder.finished.lock().unwrap(), Some(3));
    }

    #[test]
    fn tracker_without_sink_still_counts() {
        let tracker = Tracker::new(None, 2);
        tracker.advance();

        assert_eq!(tracker.processed(), 1);
    }
}
