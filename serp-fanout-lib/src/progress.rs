//! Periodic progress reporting while workers run.
//!
//! The monitor reads the run counters without taking the sink lock and
//! hands each snapshot to a [`ProgressRenderer`]. It stops on an explicit
//! one-shot signal, at most one tick after [`ProgressMonitor::stop`] is
//! called.

use crate::sink::RunCounters;
use crate::types::ProgressSnapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Draws progress snapshots somewhere (terminal, log, test buffer).
pub trait ProgressRenderer: Send + 'static {
    fn render(&mut self, snapshot: &ProgressSnapshot);

    /// Called once after the stop signal, with the latest counters.
    fn finish(&mut self, _snapshot: &ProgressSnapshot) {}
}

impl<F> ProgressRenderer for F
where
    F: FnMut(&ProgressSnapshot) + Send + 'static,
{
    fn render(&mut self, snapshot: &ProgressSnapshot) {
        self(snapshot)
    }
}

/// Renderer that draws nothing, for non-interactive runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressRenderer for NoProgress {
    fn render(&mut self, _snapshot: &ProgressSnapshot) {}
}

/// Background task redrawing progress on a fixed interval.
pub struct ProgressMonitor {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressMonitor {
    /// Start rendering `counters` against `total` every `interval`.
    pub fn spawn<R: ProgressRenderer>(
        counters: Arc<RunCounters>,
        total: u64,
        interval: Duration,
        mut renderer: R,
    ) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => renderer.render(&counters.snapshot(total)),
                }
            }

            renderer.finish(&counters.snapshot(total));
        });

        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    /// Signal the monitor to stop and wait until it has.
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!("progress monitor ended abnormally: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[tokio::test(start_paused = true)]
    async fn test_renders_until_stopped() {
        let counters = Arc::new(RunCounters::new());
        let renders = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&renders);

        let monitor = ProgressMonitor::spawn(
            counters,
            10,
            Duration::from_millis(100),
            move |snapshot: &ProgressSnapshot| {
                assert_eq!(snapshot.total, 10);
                seen.fetch_add(1, Ordering::SeqCst);
            },
        );

        tokio::time::sleep(Duration::from_millis(350)).await;
        monitor.stop().await;

        let after_stop = renders.load(Ordering::SeqCst);
        assert!(after_stop >= 3, "expected several redraws, got {}", after_stop);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(renders.load(Ordering::SeqCst), after_stop);
    }

    struct Recorder {
        finished: Arc<Mutex<Option<ProgressSnapshot>>>,
    }

    impl ProgressRenderer for Recorder {
        fn render(&mut self, _snapshot: &ProgressSnapshot) {}

        fn finish(&mut self, snapshot: &ProgressSnapshot) {
            *self.finished.lock().unwrap() = Some(*snapshot);
        }
    }

    #[tokio::test]
    async fn test_stop_is_prompt_and_calls_finish() {
        let counters = Arc::new(RunCounters::new());
        let finished = Arc::new(Mutex::new(None));

        let monitor = ProgressMonitor::spawn(
            counters,
            3,
            Duration::from_secs(3600),
            Recorder {
                finished: Arc::clone(&finished),
            },
        );

        let start = std::time::Instant::now();
        monitor.stop().await;
        assert!(start.elapsed() < Duration::from_secs(5));

        let snapshot = finished.lock().unwrap().expect("finish was called");
        assert_eq!(snapshot.total, 3);
        assert_eq!(snapshot.completed, 0);
    }
}
