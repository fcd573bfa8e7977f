use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use assurance_core::TenantId;

use crate::types::{CollectorStatus, FlowType};

/// Configuration for one flow source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowCollector {
    pub collector_id: Uuid,
    pub tenant_id: TenantId,
    pub name: String,
    pub description: Option<String>,
    pub flow_type: FlowType,
    pub listen_port: u16,
    pub listen_address: String,
    pub version: String,
    pub sampling_rate: u32,
    pub active_timeout_s: u32,
    pub inactive_timeout_s: u32,
    pub status: CollectorStatus,

    // Counters, updated on every accepted flow
    pub flows_received: u64,
    pub bytes_received: u64,
    pub last_flow: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sampled counters as reported by the exporter, before scaling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawCounters {
    pub packets: u64,
    pub bytes: u64,
}

/// Immutable five-tuple traffic sample.
///
/// `packets`/`bytes` are the sampling-scaled estimates; the values as
/// exported live in `raw`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowRecord {
    pub flow_id: Uuid,
    pub collector_id: Uuid,
    pub exporter_ip: String,
    pub src_addr: String,
    pub dst_addr: String,
    pub src_port: u16,
    pub dst_port: u16,
    pub protocol: u8,
    pub tos: u8,
    pub tcp_flags: u8,
    pub packets: u64,
    pub bytes: u64,
    pub raw: RawCounters,
    pub flow_start: Option<DateTime<Utc>>,
    pub flow_end: Option<DateTime<Utc>>,
    pub ingested_at: DateTime<Utc>,
    pub input_snmp: u32,
    pub output_snmp: u32,
    pub next_hop: Option<String>,
    pub src_as: u32,
    pub dst_as: u32,
    pub src_mask: u8,
    pub dst_mask: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateFlowCollectorRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub flow_type: FlowType,
    #[validate(range(min = 1, max = 65535))]
    pub listen_port: u16,
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[validate(range(min = 1))]
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: u32,
    #[validate(range(min = 1))]
    #[serde(default = "default_active_timeout")]
    pub active_timeout_s: u32,
    #[validate(range(min = 1))]
    #[serde(default = "default_inactive_timeout")]
    pub inactive_timeout_s: u32,
    pub description: Option<String>,
}

fn default_listen_address() -> String {
    "127.0.0.1".to_string()
}

fn default_version() -> String {
    "9".to_string()
}

fn default_sampling_rate() -> u32 {
    1
}

fn default_active_timeout() -> u32 {
    1800
}

fn default_inactive_timeout() -> u32 {
    15
}

impl CreateFlowCollectorRequest {
    pub fn new(name: impl Into<String>, flow_type: FlowType, listen_port: u16) -> Self {
        Self {
            name: name.into(),
            flow_type,
            listen_port,
            listen_address: default_listen_address(),
            version: default_version(),
            sampling_rate: default_sampling_rate(),
            active_timeout_s: default_active_timeout(),
            inactive_timeout_s: default_inactive_timeout(),
            description: None,
        }
    }

    pub fn with_sampling_rate(mut self, sampling_rate: u32) -> Self {
        self.sampling_rate = sampling_rate;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

/// One flow sample as handed to `ingest_flow_record`. Counters are the
/// raw sampled values; scaling happens at ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestFlowRequest {
    pub collector_id: Uuid,
    pub exporter_ip: String,
    pub src_addr: String,
    pub dst_addr: String,
    pub src_port: u16,
    pub dst_port: u16,
    pub protocol: u8,
    #[serde(default)]
    pub tos: u8,
    #[serde(default)]
    pub tcp_flags: u8,
    pub packets: u64,
    pub bytes: u64,
    pub flow_start: Option<DateTime<Utc>>,
    pub flow_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub input_snmp: u32,
    #[serde(default)]
    pub output_snmp: u32,
    pub next_hop: Option<String>,
    #[serde(default)]
    pub src_as: u32,
    #[serde(default)]
    pub dst_as: u32,
    #[serde(default)]
    pub src_mask: u8,
    #[serde(default)]
    pub dst_mask: u8,
}

impl IngestFlowRequest {
    pub fn new(
        collector_id: Uuid,
        src_addr: impl Into<String>,
        dst_addr: impl Into<String>,
        protocol: u8,
        packets: u64,
        bytes: u64,
    ) -> Self {
        Self {
            collector_id,
            exporter_ip: "0.0.0.0".to_string(),
            src_addr: src_addr.into(),
            dst_addr: dst_addr.into(),
            src_port: 0,
            dst_port: 0,
            protocol,
            tos: 0,
            tcp_flags: 0,
            packets,
            bytes,
            flow_start: None,
            flow_end: None,
            input_snmp: 0,
            output_snmp: 0,
            next_hop: None,
            src_as: 0,
            dst_as: 0,
            src_mask: 0,
            dst_mask: 0,
        }
    }

    pub fn with_ports(mut self, src_port: u16, dst_port: u16) -> Self {
        self.src_port = src_port;
        self.dst_port = dst_port;
        self
    }

    pub fn with_exporter(mut self, exporter_ip: impl Into<String>) -> Self {
        self.exporter_ip = exporter_ip.into();
        self
    }
}

/// Well-known IP protocol numbers for display.
pub fn protocol_name(protocol: u8) -> String {
    match protocol {
        1 => "icmp".to_string(),
        2 => "igmp".to_string(),
        6 => "tcp".to_string(),
        17 => "udp".to_string(),
        47 => "gre".to_string(),
        50 => "esp".to_string(),
        89 => "ospf".to_string(),
        other => format!("proto_{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_names() {
        assert_eq!(protocol_name(6), "tcp");
        assert_eq!(protocol_name(17), "udp");
        assert_eq!(protocol_name(1), "icmp");
        assert_eq!(protocol_name(123), "proto_123");
    }

    #[test]
    fn collector_request_defaults() {
        let request = CreateFlowCollectorRequest::new("edge", FlowType::Netflow, 2055);
        assert_eq!(request.version, "9");
        assert_eq!(request.sampling_rate, 1);
        assert_eq!(request.listen_address, "127.0.0.1");
        assert!(request.validate().is_ok());
    }
}
