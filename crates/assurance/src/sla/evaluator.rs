use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use assurance_core::{EngineMetrics, SlaSettings, TenantId};

use crate::error::{AssuranceError, Result};
use crate::metrics::performance::round3;
use crate::metrics::{self, latency_statistics, sla_credit, Measurement, SlaCredit};
use crate::probe::store::ProbeStore;
use crate::sla::model::{
    CreateSlaPolicyRequest, SlaCompliance, SlaPolicy, SlaViolation, ThresholdCheck,
};
use crate::sla::store::SlaStore;
use crate::types::SlaComplianceStatus;

/// Joins probe results to policies over the policy window and maintains
/// the violation lifecycle.
pub struct SlaEvaluator {
    tenant_id: TenantId,
    store: Arc<SlaStore>,
    probes: Arc<ProbeStore>,
    metrics: EngineMetrics,
    settings: SlaSettings,
}

impl SlaEvaluator {
    pub fn new(
        tenant_id: TenantId,
        store: Arc<SlaStore>,
        probes: Arc<ProbeStore>,
        metrics: EngineMetrics,
        settings: SlaSettings,
    ) -> Self {
        Self {
            tenant_id,
            store,
            probes,
            metrics,
            settings,
        }
    }

    pub fn store(&self) -> Arc<SlaStore> {
        Arc::clone(&self.store)
    }

    pub async fn create_policy(&self, request: CreateSlaPolicyRequest) -> Result<SlaPolicy> {
        request
            .validate()
            .map_err(|e| AssuranceError::validation("request", e.to_string()))?;
        if self.store.policy_name_taken(&request.name) {
            return Err(AssuranceError::Duplicate {
                entity: "SLA policy",
                name: request.name,
            });
        }

        let now = Utc::now();
        let policy = SlaPolicy {
            policy_id: Uuid::new_v4(),
            tenant_id: self.tenant_id.clone(),
            name: request.name,
            description: request.description,
            availability_threshold: request.availability_threshold,
            latency_threshold_ms: request.latency_threshold_ms,
            measurement_window_hours: request.measurement_window_hours,
            violation_threshold: request.violation_threshold,
            notification_enabled: request.notification_enabled,
            violations_count: 0,
            last_violation: None,
            created_at: now,
            updated_at: now,
        };

        info!(policy_id = %policy.policy_id, name = %policy.name, "SLA policy created");
        self.store.insert_policy(policy.clone());
        Ok(policy)
    }

    pub async fn list_policies(&self) -> Result<Vec<SlaPolicy>> {
        Ok(self.store.list_policies())
    }

    /// Evaluate a probe against its linked policy, opening or resolving a
    /// violation as the verdict dictates.
    pub async fn check_compliance(&self, probe_id: Uuid) -> Result<SlaCompliance> {
        let probe = self.probes.get(probe_id)?;
        let Some(policy_id) = probe.sla_policy_id else {
            return Ok(SlaCompliance::without_data(
                probe_id,
                None,
                SlaComplianceStatus::NoPolicy,
                0,
            ));
        };
        let policy = self.store.get_policy(policy_id)?;

        let cutoff = Utc::now() - Duration::hours(i64::from(policy.measurement_window_hours));
        let measurements: Vec<Measurement> = self
            .probes
            .results_since(probe_id, cutoff)
            .into_iter()
            .map(|r| Measurement {
                timestamp: r.timestamp,
                success: r.success,
                response_time_ms: r.response_time_ms,
            })
            .collect();

        if measurements.len() < self.settings.minimum_sample_count {
            return Ok(SlaCompliance::without_data(
                probe_id,
                Some(policy_id),
                SlaComplianceStatus::InsufficientData,
                policy.measurement_window_hours,
            ));
        }

        let availability = metrics::availability(&measurements);
        let latency = latency_statistics(&measurements);

        let availability_compliant =
            availability.availability_percent >= policy.availability_threshold;
        let latency_compliant = latency.average_ms <= f64::from(policy.latency_threshold_ms);
        let overall_compliant = availability_compliant && latency_compliant;

        let now = Utc::now();
        if overall_compliant {
            if let Some(resolved) = self.store.resolve_violation(probe_id, policy_id, now) {
                info!(violation_id = %resolved.violation_id, probe_id = %probe_id,
                      "SLA violation resolved");
            }
        } else if self.store.open_violation_for(probe_id, policy_id).is_none() {
            let violation = SlaViolation {
                violation_id: Uuid::new_v4(),
                tenant_id: self.tenant_id.clone(),
                probe_id,
                policy_id,
                availability_actual: availability.availability_percent,
                availability_threshold: policy.availability_threshold,
                latency_actual_ms: latency.average_ms,
                latency_threshold_ms: policy.latency_threshold_ms,
                measurement_window_hours: policy.measurement_window_hours,
                detected_at: now,
                resolved_at: None,
                total_measurements: availability.total_measurements,
                successful_measurements: availability.successful_measurements,
            };
            match self.store.open_violation(violation.clone()) {
                Ok(()) => {
                    self.metrics.sla_violations_opened.inc();
                    let _ = self.store.update_policy_with(policy_id, |p| {
                        p.violations_count += 1;
                        p.last_violation = Some(now);
                    });
                    warn!(violation_id = %violation.violation_id, probe_id = %probe_id,
                          availability = violation.availability_actual,
                          latency_ms = violation.latency_actual_ms,
                          "SLA violation detected");
                }
                Err(e) => warn!(probe_id = %probe_id, error = %e, "violation open race lost"),
            }
        }

        Ok(SlaCompliance {
            probe_id,
            policy_id: Some(policy_id),
            compliance_status: if overall_compliant {
                SlaComplianceStatus::Compliant
            } else {
                SlaComplianceStatus::Violation
            },
            overall_compliant,
            availability: Some(ThresholdCheck {
                actual: availability.availability_percent,
                threshold: policy.availability_threshold,
                compliant: availability_compliant,
                margin: round3(availability.availability_percent - policy.availability_threshold),
            }),
            latency: Some(ThresholdCheck {
                actual: latency.average_ms,
                threshold: f64::from(policy.latency_threshold_ms),
                compliant: latency_compliant,
                margin: round3(f64::from(policy.latency_threshold_ms) - latency.average_ms),
            }),
            latency_stats: Some(latency),
            measurements_count: measurements.len(),
            measurement_window_hours: policy.measurement_window_hours,
            evaluated_at: now,
        })
    }

    pub async fn list_violations(
        &self,
        hours: i64,
        probe_id: Option<Uuid>,
    ) -> Result<Vec<SlaViolation>> {
        Ok(self
            .store
            .violations_since(Utc::now() - Duration::hours(hours), probe_id))
    }

    /// Credit tier for a delivered availability figure. Computed on
    /// demand, never persisted on the violation.
    pub fn credits_for(&self, availability_percent: f64) -> SlaCredit {
        sla_credit(availability_percent)
    }
}
