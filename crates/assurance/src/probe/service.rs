use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use assurance_core::{EngineMetrics, ProbeSettings, TenantId};

use crate::error::{AssuranceError, Result};
use crate::metrics;
use crate::probe::executor::ProbeExecutor;
use crate::probe::model::{
    CreateProbeRequest, Probe, ProbeFilter, ProbeResult, ProbeStatistics, UpdateProbeRequest,
};
use crate::probe::store::ProbeStore;
use crate::sla::store::SlaStore;
use crate::types::ProbeStatus;

/// Probe definition lifecycle plus on-demand execution and statistics.
#[async_trait]
pub trait ProbeService: Send + Sync {
    async fn create_probe(&self, request: CreateProbeRequest) -> Result<Probe>;
    async fn get_probe(&self, probe_id: Uuid) -> Result<Probe>;
    async fn list_probes(&self, filter: ProbeFilter) -> Result<Vec<Probe>>;
    async fn update_probe(&self, probe_id: Uuid, request: UpdateProbeRequest) -> Result<Probe>;
    async fn delete_probe(&self, probe_id: Uuid) -> Result<()>;

    /// Execute the probe immediately, persist and return the result.
    async fn execute_probe(&self, probe_id: Uuid) -> Result<ProbeResult>;
    async fn get_probe_statistics(&self, probe_id: Uuid, hours: i64) -> Result<ProbeStatistics>;
}

pub struct DefaultProbeService {
    tenant_id: TenantId,
    store: Arc<ProbeStore>,
    policies: Arc<SlaStore>,
    executor: Arc<dyn ProbeExecutor>,
    metrics: EngineMetrics,
    settings: ProbeSettings,
}

impl DefaultProbeService {
    pub fn new(
        tenant_id: TenantId,
        store: Arc<ProbeStore>,
        policies: Arc<SlaStore>,
        executor: Arc<dyn ProbeExecutor>,
        metrics: EngineMetrics,
        settings: ProbeSettings,
    ) -> Self {
        Self {
            tenant_id,
            store,
            policies,
            executor,
            metrics,
            settings,
        }
    }

    pub fn store(&self) -> Arc<ProbeStore> {
        Arc::clone(&self.store)
    }

    pub fn executor(&self) -> Arc<dyn ProbeExecutor> {
        Arc::clone(&self.executor)
    }

    fn check_policy_reference(&self, sla_policy_id: Option<Uuid>) -> Result<()> {
        if let Some(policy_id) = sla_policy_id {
            if !self.policies.contains(policy_id) {
                return Err(AssuranceError::PolicyNotFound { id: policy_id });
            }
        }
        Ok(())
    }

    /// Run the executor for one probe and record the outcome, updating the
    /// probe's runtime counters. Shared by manual execution and the
    /// scheduler tick.
    pub(crate) async fn run_and_record(&self, probe: &Probe) -> Result<ProbeResult> {
        let started_at = Utc::now();
        self.metrics.active_probe_executions.inc();
        let outcome = self.executor.execute(probe).await;
        self.metrics.active_probe_executions.dec();

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                // Internal executor fault: quarantine the probe
                warn!(probe_id = %probe.probe_id, error = %e, "executor internal fault");
                let _ = self.store.update_with(probe.probe_id, |p| {
                    p.status = ProbeStatus::Error;
                });
                return Err(e);
            }
        };

        self.metrics.probes_executed.inc();
        if !outcome.success {
            self.metrics.probe_failures.inc();
        }

        self.store.update_with(probe.probe_id, |p| {
            p.last_run = Some(started_at);
            if outcome.success {
                p.last_success = Some(started_at);
                p.consecutive_failures = 0;
            } else {
                p.consecutive_failures += 1;
            }
        })?;

        let result = ProbeResult {
            result_id: Uuid::new_v4(),
            probe_id: probe.probe_id,
            timestamp: started_at,
            success: outcome.success,
            response_time_ms: outcome.response_time_ms,
            status_code: outcome.status_code,
            error_message: outcome.error_message,
            metrics: outcome.metrics,
        };
        self.store.append_result(result.clone());
        Ok(result)
    }
}

#[async_trait]
impl ProbeService for DefaultProbeService {
    async fn create_probe(&self, request: CreateProbeRequest) -> Result<Probe> {
        request
            .validate()
            .map_err(|e| AssuranceError::validation("request", e.to_string()))?;
        request.validate_invariants()?;
        self.check_policy_reference(request.sla_policy_id)?;

        if self.store.name_taken(&request.name) {
            return Err(AssuranceError::Duplicate {
                entity: "probe",
                name: request.name,
            });
        }

        let now = Utc::now();
        let probe = Probe {
            probe_id: Uuid::new_v4(),
            tenant_id: self.tenant_id.clone(),
            name: request.name,
            description: request.description,
            probe_type: request.probe_type,
            target: request.target,
            interval_seconds: request.interval_seconds,
            timeout_seconds: request.timeout_seconds,
            parameters: request.parameters,
            sla_policy_id: request.sla_policy_id,
            status: if request.enabled {
                ProbeStatus::Enabled
            } else {
                ProbeStatus::Disabled
            },
            last_run: None,
            last_success: None,
            consecutive_failures: 0,
            created_at: now,
            updated_at: now,
        };

        info!(probe_id = %probe.probe_id, name = %probe.name, probe_type = ?probe.probe_type,
              "Probe created");
        self.store.insert(probe.clone());
        Ok(probe)
    }

    async fn get_probe(&self, probe_id: Uuid) -> Result<Probe> {
        self.store.get(probe_id)
    }

    async fn list_probes(&self, filter: ProbeFilter) -> Result<Vec<Probe>> {
        Ok(self.store.list(&filter))
    }

    async fn update_probe(&self, probe_id: Uuid, request: UpdateProbeRequest) -> Result<Probe> {
        request
            .validate()
            .map_err(|e| AssuranceError::validation("request", e.to_string()))?;
        if let Some(Some(policy_id)) = request.sla_policy_id {
            self.check_policy_reference(Some(policy_id))?;
        }

        let existing = self.store.get(probe_id)?;
        if let Some(ref name) = request.name {
            if name != &existing.name && self.store.name_taken(name) {
                return Err(AssuranceError::Duplicate {
                    entity: "probe",
                    name: name.clone(),
                });
            }
        }

        let interval = request.interval_seconds.unwrap_or(existing.interval_seconds);
        let timeout = request.timeout_seconds.unwrap_or(existing.timeout_seconds);
        if timeout > interval {
            return Err(AssuranceError::validation(
                "timeout_seconds",
                format!("timeout ({}) must not exceed interval ({})", timeout, interval),
            ));
        }

        self.store.update_with(probe_id, |p| {
            if let Some(name) = request.name {
                p.name = name;
            }
            if let Some(target) = request.target {
                p.target = target;
            }
            p.interval_seconds = interval;
            p.timeout_seconds = timeout;
            if let Some(parameters) = request.parameters {
                p.parameters = parameters;
            }
            if let Some(sla_policy_id) = request.sla_policy_id {
                p.sla_policy_id = sla_policy_id;
            }
            if let Some(description) = request.description {
                p.description = Some(description);
            }
            if let Some(status) = request.status {
                p.status = status;
            }
        })
    }

    async fn delete_probe(&self, probe_id: Uuid) -> Result<()> {
        let probe = self.store.remove(probe_id)?;
        info!(probe_id = %probe_id, name = %probe.name, "Probe deleted");
        Ok(())
    }

    async fn execute_probe(&self, probe_id: Uuid) -> Result<ProbeResult> {
        let probe = self.store.get(probe_id)?;
        self.run_and_record(&probe).await
    }

    async fn get_probe_statistics(&self, probe_id: Uuid, hours: i64) -> Result<ProbeStatistics> {
        // Ensure the probe exists before computing over its results
        self.store.get(probe_id)?;

        let cutoff = Utc::now() - Duration::hours(hours);
        let measurements: Vec<metrics::Measurement> = self
            .store
            .results_since(probe_id, cutoff)
            .into_iter()
            .map(|r| metrics::Measurement {
                timestamp: r.timestamp,
                success: r.success,
                response_time_ms: r.response_time_ms,
            })
            .collect();

        Ok(ProbeStatistics {
            probe_id,
            hours,
            availability: metrics::availability(&measurements),
            latency_stats: metrics::latency_statistics(&measurements),
            error_rate: metrics::error_rate(&measurements, 15),
        })
    }
}

impl DefaultProbeService {
    /// Default cadence from settings, used by the convenience constructors
    /// on the registry surface.
    pub fn default_cadence(&self) -> (u32, u32) {
        (
            self.settings.default_interval_s,
            self.settings.default_timeout_s,
        )
    }
}
