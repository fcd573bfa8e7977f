//! Statistical calculators over measurement and traffic time series.

pub mod performance;
pub mod thresholds;

pub use performance::{
    availability, error_rate, latency_statistics, percentile, throughput, window_start,
    AvailabilityMetrics, ErrorRateMetrics, ErrorRateWindow, LatencyStatistics, Measurement,
    ThroughputMetrics,
};
pub use thresholds::{dynamic_thresholds, remove_outliers_iqr, sla_credit, DynamicThresholds, SlaCredit};
