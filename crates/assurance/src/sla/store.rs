use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::{AssuranceError, Result};
use crate::sla::model::{SlaPolicy, SlaViolation};

/// Policy and violation store. The open index enforces at most one
/// unresolved violation per (probe, policy).
pub struct SlaStore {
    policies: DashMap<Uuid, SlaPolicy>,
    violations: DashMap<Uuid, SlaViolation>,
    open_index: DashMap<(Uuid, Uuid), Uuid>,
}

impl Default for SlaStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SlaStore {
    pub fn new() -> Self {
        Self {
            policies: DashMap::new(),
            violations: DashMap::new(),
            open_index: DashMap::new(),
        }
    }

    // === Policies ===

    pub fn insert_policy(&self, policy: SlaPolicy) {
        self.policies.insert(policy.policy_id, policy);
    }

    pub fn get_policy(&self, policy_id: Uuid) -> Result<SlaPolicy> {
        self.policies
            .get(&policy_id)
            .map(|p| p.clone())
            .ok_or(AssuranceError::PolicyNotFound { id: policy_id })
    }

    pub fn contains(&self, policy_id: Uuid) -> bool {
        self.policies.contains_key(&policy_id)
    }

    pub fn policy_name_taken(&self, name: &str) -> bool {
        self.policies.iter().any(|p| p.name == name)
    }

    pub fn list_policies(&self) -> Vec<SlaPolicy> {
        let mut policies: Vec<SlaPolicy> = self.policies.iter().map(|p| p.clone()).collect();
        policies.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        policies
    }

    pub fn update_policy_with<F>(&self, policy_id: Uuid, mutate: F) -> Result<SlaPolicy>
    where
        F: FnOnce(&mut SlaPolicy),
    {
        let mut entry = self
            .policies
            .get_mut(&policy_id)
            .ok_or(AssuranceError::PolicyNotFound { id: policy_id })?;
        mutate(&mut entry);
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    // === Violations ===

    /// Record a new open violation. Refuses a second open violation for
    /// the same (probe, policy).
    pub fn open_violation(&self, violation: SlaViolation) -> Result<()> {
        let key = (violation.probe_id, violation.policy_id);
        if self.open_index.contains_key(&key) {
            return Err(AssuranceError::invalid_state(format!(
                "open violation already exists for probe {} under policy {}",
                violation.probe_id, violation.policy_id
            )));
        }
        self.open_index.insert(key, violation.violation_id);
        self.violations.insert(violation.violation_id, violation);
        Ok(())
    }

    pub fn open_violation_for(&self, probe_id: Uuid, policy_id: Uuid) -> Option<SlaViolation> {
        self.open_index
            .get(&(probe_id, policy_id))
            .and_then(|id| self.violations.get(&id).map(|v| v.clone()))
    }

    /// Resolve the open violation for (probe, policy), if one exists.
    pub fn resolve_violation(
        &self,
        probe_id: Uuid,
        policy_id: Uuid,
        at: DateTime<Utc>,
    ) -> Option<SlaViolation> {
        let (_, violation_id) = self.open_index.remove(&(probe_id, policy_id))?;
        let mut entry = self.violations.get_mut(&violation_id)?;
        entry.resolved_at = Some(at);
        Some(entry.clone())
    }

    pub fn violations_since(
        &self,
        cutoff: DateTime<Utc>,
        probe_id: Option<Uuid>,
    ) -> Vec<SlaViolation> {
        let mut violations: Vec<SlaViolation> = self
            .violations
            .iter()
            .filter(|v| {
                v.detected_at >= cutoff && probe_id.map(|p| v.probe_id == p).unwrap_or(true)
            })
            .map(|v| v.clone())
            .collect();
        violations.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));
        violations
    }

    pub fn open_violation_count(&self) -> usize {
        self.open_index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assurance_core::TenantId;

    fn violation(probe_id: Uuid, policy_id: Uuid) -> SlaViolation {
        SlaViolation {
            violation_id: Uuid::new_v4(),
            tenant_id: TenantId::new("t1"),
            probe_id,
            policy_id,
            availability_actual: 80.0,
            availability_threshold: 99.9,
            latency_actual_ms: 120.0,
            latency_threshold_ms: 100,
            measurement_window_hours: 1,
            detected_at: Utc::now(),
            resolved_at: None,
            total_measurements: 100,
            successful_measurements: 80,
        }
    }

    #[test]
    fn single_open_violation_invariant() {
        let store = SlaStore::new();
        let probe_id = Uuid::new_v4();
        let policy_id = Uuid::new_v4();

        store.open_violation(violation(probe_id, policy_id)).unwrap();
        let err = store.open_violation(violation(probe_id, policy_id)).unwrap_err();
        assert!(matches!(err, AssuranceError::InvalidState { .. }));
        assert_eq!(store.open_violation_count(), 1);

        store.resolve_violation(probe_id, policy_id, Utc::now()).unwrap();
        assert_eq!(store.open_violation_count(), 0);
        // a fresh violation may now open
        store.open_violation(violation(probe_id, policy_id)).unwrap();
    }

    #[test]
    fn resolve_without_open_is_none() {
        let store = SlaStore::new();
        assert!(store
            .resolve_violation(Uuid::new_v4(), Uuid::new_v4(), Utc::now())
            .is_none());
    }
}
