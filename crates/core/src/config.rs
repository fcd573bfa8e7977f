//! # Configuration Management
//!
//! Hierarchical configuration for the service assurance engines, loaded in
//! order of precedence:
//!
//! 1. **Environment variables** (`ASSURANCE__` prefix, `__` separator)
//! 2. **Environment-specific TOML file** (e.g. `config/production.toml`)
//! 3. **Default TOML file** (`config/default.toml`)
//!
//! Every option has a compiled-in default, so a bare `AssuranceConfig::default()`
//! is a fully working configuration for tests and embedded use.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;

use crate::error::Result;

/// Top-level configuration for one service assurance deployment.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AssuranceConfig {
    /// Active probe execution and result retention
    pub probes: ProbeSettings,
    /// Probe scheduler concurrency and shutdown behavior
    pub scheduler: SchedulerSettings,
    /// Alarm correlation, storm protection, and memory bounds
    pub alarms: AlarmSettings,
    /// Flow ingestion and aggregation
    pub flows: FlowSettings,
    /// SLA compliance evaluation
    pub sla: SlaSettings,
    /// Statistical anomaly detection and dynamic thresholds
    pub analytics: AnalyticsSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProbeSettings {
    /// Default measurement cadence for new probes, in seconds.
    pub default_interval_s: u32,
    /// Default per-execution deadline for new probes, in seconds.
    pub default_timeout_s: u32,
    /// In-memory result ring capacity per probe; older results are evicted.
    pub max_results_per_probe: usize,
    /// Replace the network executor with the deterministic simulator.
    pub simulation_mode: bool,
    /// Simulator success probability in `[0, 1]`.
    pub simulation_success_rate: f64,
    /// Simulator log-normal latency: median, milliseconds.
    pub simulation_latency_median_ms: f64,
    /// Simulator log-normal latency: sigma of the underlying normal.
    pub simulation_latency_sigma: f64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            default_interval_s: 30,
            default_timeout_s: 10,
            max_results_per_probe: 1000,
            simulation_mode: false,
            simulation_success_rate: 1.0,
            simulation_latency_median_ms: 10.0,
            simulation_latency_sigma: 0.25,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Cap on concurrently executing probes for the tenant.
    pub max_concurrent_probes: usize,
    /// Grace period for draining in-flight probes at shutdown, seconds.
    pub shutdown_grace_s: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            max_concurrent_probes: 16,
            shutdown_grace_s: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AlarmSettings {
    /// Alarms from one (device, type) within the window before coalescing.
    pub storm_threshold: usize,
    /// Storm detection window, minutes.
    pub storm_window_minutes: i64,
    /// Severity assigned when a rule does not specify one.
    pub default_severity: String,
    /// Upper bound on alarms held in memory.
    pub max_memory_alarms: usize,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            storm_threshold: 10,
            storm_window_minutes: 5,
            default_severity: "warning".to_string(),
            max_memory_alarms: 5000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FlowSettings {
    /// Upper bound on flow records held in memory; oldest are evicted.
    pub max_memory_flows: usize,
    /// Sampling rate assumed for collectors that do not declare one.
    pub default_sampling_rate: u32,
    /// Default bucket width for windowed aggregation, minutes.
    pub aggregation_window_minutes: i64,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            max_memory_flows: 10_000,
            default_sampling_rate: 1,
            aggregation_window_minutes: 15,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SlaSettings {
    /// Availability threshold for policies that do not declare one, percent.
    pub default_availability_threshold: f64,
    /// Latency threshold for policies that do not declare one, milliseconds.
    pub default_latency_threshold_ms: u32,
    /// Measurement window for policies that do not declare one, hours.
    pub default_measurement_window_hours: u32,
    /// Below this many windowed samples, evaluation yields INSUFFICIENT_DATA.
    pub minimum_sample_count: usize,
}

impl Default for SlaSettings {
    fn default() -> Self {
        Self {
            default_availability_threshold: 99.9,
            default_latency_threshold_ms: 100,
            default_measurement_window_hours: 24,
            minimum_sample_count: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalyticsSettings {
    /// Z-score above which a window is flagged anomalous.
    pub anomaly_detection_threshold: f64,
    /// Baseline history consulted for anomaly statistics, hours.
    pub baseline_window_hours: i64,
    /// Confidence level for dynamic thresholds; 0.95 and 0.99 supported.
    pub confidence_level: f64,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            anomaly_detection_threshold: 2.0,
            baseline_window_hours: 24,
            confidence_level: 0.95,
        }
    }
}

impl AssuranceConfig {
    /// Load configuration from TOML files and environment variables.
    ///
    /// The environment is selected by the `ENVIRONMENT` variable
    /// (`development` by default).
    pub fn load() -> Result<Self> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            .add_source(Environment::with_prefix("ASSURANCE").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AssuranceConfig::default();
        assert_eq!(config.probes.default_interval_s, 30);
        assert_eq!(config.probes.default_timeout_s, 10);
        assert_eq!(config.probes.max_results_per_probe, 1000);
        assert!(!config.probes.simulation_mode);
        assert_eq!(config.alarms.storm_threshold, 10);
        assert_eq!(config.alarms.storm_window_minutes, 5);
        assert_eq!(config.flows.max_memory_flows, 10_000);
        assert_eq!(config.flows.aggregation_window_minutes, 15);
        assert_eq!(config.sla.default_availability_threshold, 99.9);
        assert_eq!(config.sla.minimum_sample_count, 10);
        assert_eq!(config.analytics.anomaly_detection_threshold, 2.0);
        assert_eq!(config.analytics.confidence_level, 0.95);
    }
}
