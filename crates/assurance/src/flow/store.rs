use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::{AssuranceError, Result};
use crate::flow::model::{FlowCollector, FlowRecord};
use crate::types::CollectorStatus;

/// In-memory flow store with a bounded record ring.
///
/// Exceeding the memory bound evicts the oldest records instead of
/// failing ingest; the eviction count is observable. Collector counter
/// updates serialize through the map entry per collector.
pub struct FlowStore {
    collectors: DashMap<Uuid, FlowCollector>,
    flows: RwLock<VecDeque<FlowRecord>>,
    max_memory_flows: usize,
    dropped_flows: AtomicU64,
}

impl FlowStore {
    pub fn new(max_memory_flows: usize) -> Self {
        Self {
            collectors: DashMap::new(),
            flows: RwLock::new(VecDeque::new()),
            max_memory_flows: max_memory_flows.max(1),
            dropped_flows: AtomicU64::new(0),
        }
    }

    // === Collectors ===

    pub fn insert_collector(&self, collector: FlowCollector) {
        self.collectors.insert(collector.collector_id, collector);
    }

    pub fn get_collector(&self, collector_id: Uuid) -> Result<FlowCollector> {
        self.collectors
            .get(&collector_id)
            .map(|c| c.clone())
            .ok_or(AssuranceError::CollectorNotFound { id: collector_id })
    }

    pub fn collector_name_taken(&self, name: &str) -> bool {
        self.collectors.iter().any(|c| c.name == name)
    }

    pub fn list_collectors(&self, status: Option<CollectorStatus>) -> Vec<FlowCollector> {
        let mut collectors: Vec<FlowCollector> = self
            .collectors
            .iter()
            .filter(|c| status.map(|s| c.status == s).unwrap_or(true))
            .map(|c| c.clone())
            .collect();
        collectors.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        collectors
    }

    /// Bump receive counters under the collector's entry lock.
    pub fn record_receipt(&self, collector_id: Uuid, bytes: u64, at: DateTime<Utc>) -> Result<()> {
        let mut entry = self
            .collectors
            .get_mut(&collector_id)
            .ok_or(AssuranceError::CollectorNotFound { id: collector_id })?;
        entry.flows_received += 1;
        entry.bytes_received += bytes;
        entry.last_flow = Some(at);
        Ok(())
    }

    // === Flow records ===

    /// Append one record, evicting the oldest when over the memory bound.
    /// Returns the number of evicted records.
    pub fn append(&self, record: FlowRecord) -> usize {
        let mut flows = self.flows.write().unwrap_or_else(|e| e.into_inner());
        flows.push_back(record);
        let mut evicted = 0;
        while flows.len() > self.max_memory_flows {
            flows.pop_front();
            evicted += 1;
        }
        if evicted > 0 {
            self.dropped_flows.fetch_add(evicted as u64, Ordering::Relaxed);
        }
        evicted
    }

    /// Snapshot of records ingested at or after `cutoff`, optionally
    /// restricted to one collector.
    pub fn flows_since(&self, cutoff: DateTime<Utc>, collector_id: Option<Uuid>) -> Vec<FlowRecord> {
        let flows = self.flows.read().unwrap_or_else(|e| e.into_inner());
        flows
            .iter()
            .filter(|f| {
                f.ingested_at >= cutoff
                    && collector_id.map(|c| f.collector_id == c).unwrap_or(true)
            })
            .cloned()
            .collect()
    }

    /// Snapshot of records with `ingested_at` inside `[start, end]`.
    pub fn flows_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        collector_id: Option<Uuid>,
    ) -> Vec<FlowRecord> {
        let flows = self.flows.read().unwrap_or_else(|e| e.into_inner());
        flows
            .iter()
            .filter(|f| {
                f.ingested_at >= start
                    && f.ingested_at <= end
                    && collector_id.map(|c| f.collector_id == c).unwrap_or(true)
            })
            .cloned()
            .collect()
    }

    pub fn flow_count(&self) -> usize {
        self.flows.read().map(|f| f.len()).unwrap_or(0)
    }

    pub fn dropped_flows(&self) -> u64 {
        self.dropped_flows.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::model::RawCounters;
    use crate::types::FlowType;
    use assurance_core::TenantId;

    fn collector() -> FlowCollector {
        FlowCollector {
            collector_id: Uuid::new_v4(),
            tenant_id: TenantId::new("t1"),
            name: "edge".to_string(),
            description: None,
            flow_type: FlowType::Netflow,
            listen_port: 2055,
            listen_address: "127.0.0.1".to_string(),
            version: "9".to_string(),
            sampling_rate: 1,
            active_timeout_s: 1800,
            inactive_timeout_s: 15,
            status: CollectorStatus::Active,
            flows_received: 0,
            bytes_received: 0,
            last_flow: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn record(collector_id: Uuid, bytes: u64) -> FlowRecord {
        FlowRecord {
            flow_id: Uuid::new_v4(),
            collector_id,
            exporter_ip: "10.0.0.1".to_string(),
            src_addr: "192.0.2.1".to_string(),
            dst_addr: "192.0.2.2".to_string(),
            src_port: 1234,
            dst_port: 443,
            protocol: 6,
            tos: 0,
            tcp_flags: 0,
            packets: 1,
            bytes,
            raw: RawCounters { packets: 1, bytes },
            flow_start: None,
            flow_end: None,
            ingested_at: Utc::now(),
            input_snmp: 0,
            output_snmp: 0,
            next_hop: None,
            src_as: 0,
            dst_as: 0,
            src_mask: 0,
            dst_mask: 0,
        }
    }

    #[test]
    fn ring_evicts_oldest_and_counts_drops() {
        let store = FlowStore::new(3);
        let c = collector();
        let id = c.collector_id;
        store.insert_collector(c);

        for i in 0..5 {
            store.append(record(id, i));
        }
        assert_eq!(store.flow_count(), 3);
        assert_eq!(store.dropped_flows(), 2);

        let remaining = store.flows_since(Utc::now() - chrono::Duration::hours(1), None);
        let bytes: Vec<u64> = remaining.iter().map(|f| f.bytes).collect();
        assert_eq!(bytes, vec![2, 3, 4]);
    }

    #[test]
    fn receipt_counters_accumulate() {
        let store = FlowStore::new(100);
        let c = collector();
        let id = c.collector_id;
        store.insert_collector(c);

        store.record_receipt(id, 1000, Utc::now()).unwrap();
        store.record_receipt(id, 500, Utc::now()).unwrap();

        let stored = store.get_collector(id).unwrap();
        assert_eq!(stored.flows_received, 2);
        assert_eq!(stored.bytes_received, 1500);
        assert!(stored.last_flow.is_some());
    }
}
