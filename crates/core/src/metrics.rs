use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;
use tracing::warn;

/// Centralized prometheus registry for the assurance engines.
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    registry: Arc<Registry>,
}

impl MetricsRegistry {
    pub fn new(namespace: &str) -> Self {
        let registry = Registry::new_custom(Some(namespace.to_string()), None).unwrap_or_else(|_| {
            warn!("Failed to create custom registry, using default");
            Registry::new()
        });

        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn register<T>(&self, collector: T) -> Result<(), prometheus::Error>
    where
        T: prometheus::core::Collector + 'static,
    {
        self.registry.register(Box::new(collector))
    }

    pub fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }

    /// Render all registered metrics in the text exposition format.
    pub fn metrics_text(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.gather();

        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            warn!("Failed to encode metrics: {}", e);
            return String::new();
        }

        String::from_utf8(buffer).unwrap_or_else(|e| {
            warn!("Failed to convert metrics to UTF-8: {}", e);
            String::new()
        })
    }
}

/// Counters shared across the four engines.
///
/// Ingest paths never fail outward; these counters are where their
/// failures become observable.
#[derive(Debug, Clone)]
pub struct EngineMetrics {
    pub probes_executed: IntCounter,
    pub probe_failures: IntCounter,
    pub missed_runs: IntCounter,
    pub events_processed: IntCounter,
    pub parse_errors: IntCounter,
    pub alarms_raised: IntCounter,
    pub alarms_deduplicated: IntCounter,
    pub alarms_suppressed: IntCounter,
    pub flows_ingested: IntCounter,
    pub flows_dropped: IntCounter,
    pub sla_violations_opened: IntCounter,
    pub active_probe_executions: IntGauge,
}

impl EngineMetrics {
    pub fn new(registry: &MetricsRegistry) -> Result<Self, prometheus::Error> {
        let metrics = Self {
            probes_executed: IntCounter::new("probes_executed_total", "Probe executions completed")?,
            probe_failures: IntCounter::new("probe_failures_total", "Probe executions that failed")?,
            missed_runs: IntCounter::new(
                "probe_missed_runs_total",
                "Probe intervals skipped because the scheduler fell behind",
            )?,
            events_processed: IntCounter::new(
                "events_processed_total",
                "Normalized events handed to the alarm engine",
            )?,
            parse_errors: IntCounter::new(
                "event_parse_errors_total",
                "Events that produced parse_error records",
            )?,
            alarms_raised: IntCounter::new("alarms_raised_total", "New alarms created")?,
            alarms_deduplicated: IntCounter::new(
                "alarms_deduplicated_total",
                "Events folded into an existing alarm occurrence count",
            )?,
            alarms_suppressed: IntCounter::new(
                "alarms_suppressed_total",
                "Alarms created or transitioned into the suppressed state",
            )?,
            flows_ingested: IntCounter::new("flows_ingested_total", "Flow records accepted")?,
            flows_dropped: IntCounter::new(
                "flows_dropped_total",
                "Flow records evicted under memory pressure",
            )?,
            sla_violations_opened: IntCounter::new(
                "sla_violations_opened_total",
                "SLA violations opened",
            )?,
            active_probe_executions: IntGauge::new(
                "active_probe_executions",
                "Probe executions currently in flight",
            )?,
        };

        registry.register(metrics.probes_executed.clone())?;
        registry.register(metrics.probe_failures.clone())?;
        registry.register(metrics.missed_runs.clone())?;
        registry.register(metrics.events_processed.clone())?;
        registry.register(metrics.parse_errors.clone())?;
        registry.register(metrics.alarms_raised.clone())?;
        registry.register(metrics.alarms_deduplicated.clone())?;
        registry.register(metrics.alarms_suppressed.clone())?;
        registry.register(metrics.flows_ingested.clone())?;
        registry.register(metrics.flows_dropped.clone())?;
        registry.register(metrics.sla_violations_opened.clone())?;
        registry.register(metrics.active_probe_executions.clone())?;

        Ok(metrics)
    }

    /// Registry-free instance for tests and embedded use.
    pub fn unregistered() -> Self {
        let registry = MetricsRegistry::new("assurance_test");
        Self::new(&registry).expect("fresh registry cannot have duplicate collectors")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_register_and_render() {
        let registry = MetricsRegistry::new("assurance");
        let metrics = EngineMetrics::new(&registry).unwrap();

        metrics.probes_executed.inc();
        metrics.flows_ingested.inc_by(3);

        let text = registry.metrics_text();
        assert!(text.contains("assurance_probes_executed_total"));
        assert!(text.contains("assurance_flows_ingested_total 3"));
    }
}
