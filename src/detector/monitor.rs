use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::detector::AnomalyDetector;
use crate::types::EngineEvent;

/// Background task that sweeps every active product for anomalies on an
/// interval and routes flagged results to the DB writer.
pub struct AnomalyMonitor {
    detector: AnomalyDetector,
    event_tx: mpsc::Sender<EngineEvent>,
    interval_secs: u64,
}

impl AnomalyMonitor {
    pub fn new(
        detector: AnomalyDetector,
        event_tx: mpsc::Sender<EngineEvent>,
        interval_secs: u64,
    ) -> Self {
        Self { detector, event_tx, interval_secs }
    }

    pub async fn run(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        interval.tick().await; // consume immediate first tick

        loop {
            interval.tick().await;
            self.sweep().await;
        }
    }

    async fn sweep(&self) {
        let flagged = self.detector.scan_all_products().await;
        let flagged_count = flagged.len();

        for summary in flagged {
            info!(
                asin = %summary.asin,
                anomaly_count = summary.anomaly_count,
                "ANOMALY | {} | {} metric(s) out of range",
                summary.asin, summary.anomaly_count,
            );
            if let Err(e) = self.event_tx.try_send(EngineEvent::AnomalyFlagged(summary)) {
                warn!("event channel full, dropping anomaly: {e}");
            }
        }

        info!(flagged = flagged_count, "Anomaly sweep complete: {flagged_count} flagged");
    }
}
