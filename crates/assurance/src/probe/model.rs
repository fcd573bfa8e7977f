use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

use assurance_core::TenantId;

use crate::error::{AssuranceError, Result};
use crate::types::{ProbeStatus, ProbeType};

/// Type-specific probe configuration.
///
/// Each probe type reads only its own variant; `None` is valid for types
/// without parameters (ICMP).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeParameters {
    #[default]
    None,
    Dns {
        dns_server: String,
        record_type: String,
    },
    Http {
        method: String,
        expected_status: u16,
        #[serde(default)]
        accept_statuses: Vec<u16>,
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
    Tcp {
        port: u16,
    },
}

impl ProbeParameters {
    pub fn dns(dns_server: impl Into<String>, record_type: impl Into<String>) -> Self {
        Self::Dns {
            dns_server: dns_server.into(),
            record_type: record_type.into(),
        }
    }

    pub fn http(method: impl Into<String>, expected_status: u16) -> Self {
        Self::Http {
            method: method.into(),
            expected_status,
            accept_statuses: Vec::new(),
            headers: BTreeMap::new(),
        }
    }

    pub fn tcp(port: u16) -> Self {
        Self::Tcp { port }
    }
}

/// Durable definition of an active measurement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Probe {
    pub probe_id: Uuid,
    pub tenant_id: TenantId,
    pub name: String,
    pub description: Option<String>,
    pub probe_type: ProbeType,
    pub target: String,
    pub interval_seconds: u32,
    pub timeout_seconds: u32,
    pub parameters: ProbeParameters,
    pub sla_policy_id: Option<Uuid>,
    pub status: ProbeStatus,

    // Runtime counters, mutated by the scheduler only
    pub last_run: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable outcome of one probe execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub result_id: Uuid,
    pub probe_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub response_time_ms: Option<f64>,
    pub status_code: Option<u16>,
    pub error_message: Option<String>,
    pub metrics: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProbeRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub probe_type: ProbeType,
    #[validate(length(min = 1, max = 500))]
    pub target: String,
    #[validate(range(min = 1, max = 86400))]
    pub interval_seconds: u32,
    #[validate(range(min = 1, max = 300))]
    pub timeout_seconds: u32,
    #[serde(default)]
    pub parameters: ProbeParameters,
    pub sla_policy_id: Option<Uuid>,
    pub description: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl CreateProbeRequest {
    pub fn new(name: impl Into<String>, probe_type: ProbeType, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            probe_type,
            target: target.into(),
            interval_seconds: 30,
            timeout_seconds: 10,
            parameters: ProbeParameters::None,
            sla_policy_id: None,
            description: None,
            enabled: true,
        }
    }

    pub fn with_cadence(mut self, interval_seconds: u32, timeout_seconds: u32) -> Self {
        self.interval_seconds = interval_seconds;
        self.timeout_seconds = timeout_seconds;
        self
    }

    pub fn with_parameters(mut self, parameters: ProbeParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_sla_policy(mut self, policy_id: Uuid) -> Self {
        self.sla_policy_id = Some(policy_id);
        self
    }

    /// Cross-field checks the derive cannot express.
    pub fn validate_invariants(&self) -> Result<()> {
        if self.timeout_seconds > self.interval_seconds {
            return Err(AssuranceError::validation(
                "timeout_seconds",
                format!(
                    "timeout ({}) must not exceed interval ({})",
                    self.timeout_seconds, self.interval_seconds
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProbeRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub target: Option<String>,
    #[validate(range(min = 1, max = 86400))]
    pub interval_seconds: Option<u32>,
    #[validate(range(min = 1, max = 300))]
    pub timeout_seconds: Option<u32>,
    pub parameters: Option<ProbeParameters>,
    pub sla_policy_id: Option<Option<Uuid>>,
    pub description: Option<String>,
    pub status: Option<ProbeStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct ProbeFilter {
    pub probe_type: Option<ProbeType>,
    pub enabled_only: bool,
}

/// Windowed performance view of one probe, per `get_probe_statistics`.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeStatistics {
    pub probe_id: Uuid,
    pub hours: i64,
    pub availability: crate::metrics::AvailabilityMetrics,
    pub latency_stats: crate::metrics::LatencyStatistics,
    pub error_rate: crate::metrics::ErrorRateMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_must_not_exceed_interval() {
        let request = CreateProbeRequest::new("gw", ProbeType::Icmp, "192.0.2.1")
            .with_cadence(5, 10);
        assert!(request.validate_invariants().is_err());

        let request = CreateProbeRequest::new("gw", ProbeType::Icmp, "192.0.2.1")
            .with_cadence(30, 10);
        assert!(request.validate_invariants().is_ok());
    }

    #[test]
    fn derive_validation_rejects_out_of_range_interval() {
        let mut request = CreateProbeRequest::new("gw", ProbeType::Icmp, "192.0.2.1");
        request.interval_seconds = 100_000;
        assert!(request.validate().is_err());
    }
}
