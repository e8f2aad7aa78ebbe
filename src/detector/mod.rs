pub mod anomaly;
pub mod monitor;

pub use anomaly::AnomalyDetector;
pub use monitor::AnomalyMonitor;
