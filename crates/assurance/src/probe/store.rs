use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;
use uuid::Uuid;

use crate::error::{AssuranceError, Result};
use crate::probe::model::{Probe, ProbeFilter, ProbeResult};
use crate::types::ProbeStatus;

/// In-memory probe and result store.
///
/// Probes live in a keyed map; results in a bounded per-probe ring.
/// Mutations go through the map entry, which serializes them per probe.
pub struct ProbeStore {
    probes: DashMap<Uuid, Probe>,
    results: DashMap<Uuid, VecDeque<ProbeResult>>,
    max_results_per_probe: usize,
}

impl ProbeStore {
    pub fn new(max_results_per_probe: usize) -> Self {
        Self {
            probes: DashMap::new(),
            results: DashMap::new(),
            max_results_per_probe: max_results_per_probe.max(1),
        }
    }

    pub fn insert(&self, probe: Probe) {
        self.results.entry(probe.probe_id).or_default();
        self.probes.insert(probe.probe_id, probe);
    }

    pub fn get(&self, probe_id: Uuid) -> Result<Probe> {
        self.probes
            .get(&probe_id)
            .map(|p| p.clone())
            .ok_or(AssuranceError::ProbeNotFound { id: probe_id })
    }

    pub fn contains(&self, probe_id: Uuid) -> bool {
        self.probes.contains_key(&probe_id)
    }

    pub fn name_taken(&self, name: &str) -> bool {
        self.probes.iter().any(|p| p.name == name)
    }

    /// Apply a closure to the stored probe under its entry lock.
    pub fn update_with<F>(&self, probe_id: Uuid, mutate: F) -> Result<Probe>
    where
        F: FnOnce(&mut Probe),
    {
        let mut entry = self
            .probes
            .get_mut(&probe_id)
            .ok_or(AssuranceError::ProbeNotFound { id: probe_id })?;
        mutate(&mut entry);
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    /// Delete the probe definition. Results are retained.
    pub fn remove(&self, probe_id: Uuid) -> Result<Probe> {
        self.probes
            .remove(&probe_id)
            .map(|(_, p)| p)
            .ok_or(AssuranceError::ProbeNotFound { id: probe_id })
    }

    pub fn list(&self, filter: &ProbeFilter) -> Vec<Probe> {
        let mut probes: Vec<Probe> = self
            .probes
            .iter()
            .filter(|p| {
                filter
                    .probe_type
                    .map(|t| p.probe_type == t)
                    .unwrap_or(true)
                    && (!filter.enabled_only || p.status == ProbeStatus::Enabled)
            })
            .map(|p| p.clone())
            .collect();
        probes.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        probes
    }

    pub fn enabled_probes(&self) -> Vec<Probe> {
        self.list(&ProbeFilter {
            probe_type: None,
            enabled_only: true,
        })
    }

    /// Append a result, evicting the oldest past the per-probe cap.
    pub fn append_result(&self, result: ProbeResult) {
        let mut ring = self.results.entry(result.probe_id).or_default();
        ring.push_back(result);
        while ring.len() > self.max_results_per_probe {
            ring.pop_front();
        }
    }

    /// Results at or after `cutoff`, oldest first.
    pub fn results_since(&self, probe_id: Uuid, cutoff: DateTime<Utc>) -> Vec<ProbeResult> {
        self.results
            .get(&probe_id)
            .map(|ring| {
                ring.iter()
                    .filter(|r| r.timestamp >= cutoff)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn result_count(&self, probe_id: Uuid) -> usize {
        self.results.get(&probe_id).map(|r| r.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProbeType;
    use assurance_core::TenantId;
    use chrono::Duration;
    use std::collections::BTreeMap;

    fn probe(name: &str) -> Probe {
        Probe {
            probe_id: Uuid::new_v4(),
            tenant_id: TenantId::new("t1"),
            name: name.to_string(),
            description: None,
            probe_type: ProbeType::Icmp,
            target: "192.0.2.1".to_string(),
            interval_seconds: 30,
            timeout_seconds: 10,
            parameters: Default::default(),
            sla_policy_id: None,
            status: ProbeStatus::Enabled,
            last_run: None,
            last_success: None,
            consecutive_failures: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn result(probe_id: Uuid, offset_s: i64) -> ProbeResult {
        ProbeResult {
            result_id: Uuid::new_v4(),
            probe_id,
            timestamp: Utc::now() + Duration::seconds(offset_s),
            success: true,
            response_time_ms: Some(10.0),
            status_code: None,
            error_message: None,
            metrics: BTreeMap::new(),
        }
    }

    #[test]
    fn result_ring_is_bounded() {
        let store = ProbeStore::new(3);
        let p = probe("gw");
        let id = p.probe_id;
        store.insert(p);

        for i in 0..5 {
            store.append_result(result(id, i));
        }
        assert_eq!(store.result_count(id), 3);

        // oldest were evicted: remaining timestamps are the 3 newest
        let all = store.results_since(id, Utc::now() - Duration::hours(1));
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn delete_retains_results() {
        let store = ProbeStore::new(10);
        let p = probe("gw");
        let id = p.probe_id;
        store.insert(p);
        store.append_result(result(id, 0));

        store.remove(id).unwrap();
        assert!(store.get(id).is_err());
        assert_eq!(store.result_count(id), 1);
    }

    #[test]
    fn enabled_filter_skips_disabled() {
        let store = ProbeStore::new(10);
        let enabled = probe("a");
        let mut disabled = probe("b");
        disabled.status = ProbeStatus::Disabled;
        store.insert(enabled);
        store.insert(disabled);

        assert_eq!(store.enabled_probes().len(), 1);
        assert_eq!(store.list(&ProbeFilter::default()).len(), 2);
    }
}
