//! Periodic snapshot distribution to one subscriber
//!
//! Each subscriber gets its own loop: one cycle right away, then one per
//! interval. A failed cycle is reported and the next tick starts over, so
//! retry cadence is the interval itself.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, debug, info_span, warn};

use crate::config::MonitoringSettings;
use crate::error::MonitorError;
use crate::tracing::span_names;

use super::collector::SnapshotSource;
use super::metrics::MetricsSnapshot;

/// Events sent to a subscriber
#[derive(Debug, Clone)]
pub enum MetricsEvent {
    /// New snapshot available
    Update(Arc<MetricsSnapshot>),
    /// The cycle failed; the loop retries on the next tick
    CycleFailed(MonitorError),
    /// The loop stopped
    Stopped,
}

/// Handle to control a running distribution loop
#[derive(Debug)]
pub struct DistributionHandle {
    stop_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl DistributionHandle {
    /// Signals the loop to stop.
    ///
    /// A cycle already in flight runs to completion and is delivered first.
    pub async fn stop(&self) {
        let _ = self.stop_tx.send(()).await;
    }

    /// Returns true once the loop task has exited
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Starts a distribution loop over `source`.
///
/// Returns a handle to stop the loop and a receiver for events. Dropping the
/// receiver ends the loop after the current cycle; dropping the handle stops
/// it like [`DistributionHandle::stop`].
pub fn start_distribution(
    source: Arc<dyn SnapshotSource>,
    settings: &MonitoringSettings,
) -> (DistributionHandle, mpsc::Receiver<MetricsEvent>) {
    let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
    let (event_tx, event_rx) = mpsc::channel::<MetricsEvent>(8);
    let interval = settings.interval();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycle: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = stop_rx.recv() => break,
                _ = ticker.tick() => {
                    cycle += 1;
                    let span = info_span!(span_names::METRICS_DISTRIBUTE, cycle);
                    let event = match source.snapshot().instrument(span).await {
                        Ok(snapshot) => MetricsEvent::Update(snapshot),
                        Err(err) => {
                            warn!(cycle, error = %err, "Collection cycle failed, retrying next tick");
                            MetricsEvent::CycleFailed(err)
                        }
                    };
                    if event_tx.send(event).await.is_err() {
                        debug!(cycle, "Subscriber gone, stopping distribution");
                        return;
                    }
                }
            }
        }

        debug!(cycles = cycle, "Distribution stopped");
        let _ = event_tx.send(MetricsEvent::Stopped).await;
    });

    (DistributionHandle { stop_tx, task }, event_rx)
}
