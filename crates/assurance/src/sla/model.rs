use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use assurance_core::TenantId;

use crate::metrics::LatencyStatistics;
use crate::types::SlaComplianceStatus;

/// Compliance contract referenced by probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaPolicy {
    pub policy_id: Uuid,
    pub tenant_id: TenantId,
    pub name: String,
    pub description: Option<String>,
    pub availability_threshold: f64,
    pub latency_threshold_ms: u32,
    pub measurement_window_hours: u32,
    pub violation_threshold: u32,
    pub notification_enabled: bool,

    pub violations_count: u64,
    pub last_violation: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSlaPolicyRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(range(min = 0.0, max = 100.0))]
    pub availability_threshold: f64,
    #[validate(range(min = 1))]
    pub latency_threshold_ms: u32,
    #[validate(range(min = 1, max = 8760))]
    pub measurement_window_hours: u32,
    #[validate(range(min = 1))]
    #[serde(default = "default_violation_threshold")]
    pub violation_threshold: u32,
    #[serde(default = "default_notification_enabled")]
    pub notification_enabled: bool,
    pub description: Option<String>,
}

fn default_violation_threshold() -> u32 {
    3
}

fn default_notification_enabled() -> bool {
    true
}

impl CreateSlaPolicyRequest {
    pub fn new(
        name: impl Into<String>,
        availability_threshold: f64,
        latency_threshold_ms: u32,
        measurement_window_hours: u32,
    ) -> Self {
        Self {
            name: name.into(),
            availability_threshold,
            latency_threshold_ms,
            measurement_window_hours,
            violation_threshold: default_violation_threshold(),
            notification_enabled: default_notification_enabled(),
            description: None,
        }
    }
}

/// Durable record of a compliance breach, open until resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaViolation {
    pub violation_id: Uuid,
    pub tenant_id: TenantId,
    pub probe_id: Uuid,
    pub policy_id: Uuid,

    pub availability_actual: f64,
    pub availability_threshold: f64,
    pub latency_actual_ms: f64,
    pub latency_threshold_ms: u32,
    pub measurement_window_hours: u32,

    pub detected_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub total_measurements: usize,
    pub successful_measurements: usize,
}

impl SlaViolation {
    pub fn is_open(&self) -> bool {
        self.resolved_at.is_none()
    }
}

/// One side of the compliance verdict.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ThresholdCheck {
    pub actual: f64,
    pub threshold: f64,
    pub compliant: bool,
    pub margin: f64,
}

/// Result of `check_sla_compliance` for one probe.
#[derive(Debug, Clone, Serialize)]
pub struct SlaCompliance {
    pub probe_id: Uuid,
    pub policy_id: Option<Uuid>,
    pub compliance_status: SlaComplianceStatus,
    pub overall_compliant: bool,
    pub availability: Option<ThresholdCheck>,
    pub latency: Option<ThresholdCheck>,
    pub latency_stats: Option<LatencyStatistics>,
    pub measurements_count: usize,
    pub measurement_window_hours: u32,
    pub evaluated_at: DateTime<Utc>,
}

impl SlaCompliance {
    pub(crate) fn without_data(
        probe_id: Uuid,
        policy_id: Option<Uuid>,
        status: SlaComplianceStatus,
        window_hours: u32,
    ) -> Self {
        Self {
            probe_id,
            policy_id,
            compliance_status: status,
            overall_compliant: false,
            availability: None,
            latency: None,
            latency_stats: None,
            measurements_count: 0,
            measurement_window_hours: window_hours,
            evaluated_at: Utc::now(),
        }
    }
}
