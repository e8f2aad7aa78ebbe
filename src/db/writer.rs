use tokio::sync::mpsc;
use tracing::error;

use crate::db::repository::{ProductRepository, SqliteRepository};
use crate::error::Result;
use crate::types::EngineEvent;

/// Receives engine events from the background tasks and persists them.
/// Runs as a dedicated task — storage latency never blocks a sweep.
pub struct DbWriter {
    repo: SqliteRepository,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl DbWriter {
    pub fn new(repo: SqliteRepository, event_rx: mpsc::Receiver<EngineEvent>) -> Self {
        Self { repo, event_rx }
    }

    pub async fn run(mut self) {
        while let Some(event) = self.event_rx.recv().await {
            if let Err(e) = self.write_event(&event).await {
                error!("DB write error: {e}");
            }
        }
    }

    async fn write_event(&self, event: &EngineEvent) -> Result<()> {
        match event {
            EngineEvent::AnomalyFlagged(summary) => self.repo.insert_anomaly(summary).await,
            EngineEvent::AnalysisCompleted(analysis) => self.repo.insert_analysis(analysis).await,
        }
    }
}
