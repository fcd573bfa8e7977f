use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::alarm::model::{Alarm, AlarmFilter, AlarmRule, AlarmSuppression};
use crate::error::{AssuranceError, Result};
use crate::types::{AlarmStatus, EventType, SuppressionStatus};

/// In-memory alarm state: rules, alarms, the dedupe index, and
/// suppressions. The dedupe index maps each key to its single non-cleared
/// alarm; mutations per key are serialized through the map entry.
pub struct AlarmStore {
    rules: DashMap<Uuid, AlarmRule>,
    alarms: DashMap<Uuid, Alarm>,
    dedupe: DashMap<String, Uuid>,
    suppressions: DashMap<Uuid, AlarmSuppression>,
    max_memory_alarms: usize,
}

impl AlarmStore {
    pub fn new(max_memory_alarms: usize) -> Self {
        Self {
            rules: DashMap::new(),
            alarms: DashMap::new(),
            dedupe: DashMap::new(),
            suppressions: DashMap::new(),
            max_memory_alarms: max_memory_alarms.max(1),
        }
    }

    // === Rules ===

    pub fn insert_rule(&self, rule: AlarmRule) {
        self.rules.insert(rule.rule_id, rule);
    }

    pub fn get_rule(&self, rule_id: Uuid) -> Result<AlarmRule> {
        self.rules
            .get(&rule_id)
            .map(|r| r.clone())
            .ok_or(AssuranceError::RuleNotFound { id: rule_id })
    }

    pub fn rule_name_taken(&self, name: &str) -> bool {
        self.rules.iter().any(|r| r.name == name)
    }

    pub fn update_rule_with<F>(&self, rule_id: Uuid, mutate: F) -> Result<AlarmRule>
    where
        F: FnOnce(&mut AlarmRule),
    {
        let mut entry = self
            .rules
            .get_mut(&rule_id)
            .ok_or(AssuranceError::RuleNotFound { id: rule_id })?;
        mutate(&mut entry);
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    pub fn remove_rule(&self, rule_id: Uuid) -> Result<AlarmRule> {
        self.rules
            .remove(&rule_id)
            .map(|(_, r)| r)
            .ok_or(AssuranceError::RuleNotFound { id: rule_id })
    }

    pub fn list_rules(&self) -> Vec<AlarmRule> {
        let mut rules: Vec<AlarmRule> = self.rules.iter().map(|r| r.clone()).collect();
        rules.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        rules
    }

    /// Enabled rules for an event type, highest priority first, ties broken
    /// by rule id.
    pub fn rules_for_event(&self, event_type: EventType) -> Vec<AlarmRule> {
        let mut rules: Vec<AlarmRule> = self
            .rules
            .iter()
            .filter(|r| r.enabled && r.event_type == event_type)
            .map(|r| r.clone())
            .collect();
        rules.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.rule_id.cmp(&b.rule_id)));
        rules
    }

    // === Alarms ===

    pub fn insert_alarm(&self, alarm: Alarm) {
        if self.alarms.len() >= self.max_memory_alarms {
            self.evict_one();
        }
        if !alarm.is_cleared() {
            self.dedupe.insert(alarm.dedupe_key.clone(), alarm.alarm_id);
        }
        self.alarms.insert(alarm.alarm_id, alarm);
    }

    pub fn get_alarm(&self, alarm_id: Uuid) -> Result<Alarm> {
        self.alarms
            .get(&alarm_id)
            .map(|a| a.clone())
            .ok_or(AssuranceError::AlarmNotFound { id: alarm_id })
    }

    pub fn update_alarm_with<F>(&self, alarm_id: Uuid, mutate: F) -> Result<Alarm>
    where
        F: FnOnce(&mut Alarm),
    {
        let updated = {
            let mut entry = self
                .alarms
                .get_mut(&alarm_id)
                .ok_or(AssuranceError::AlarmNotFound { id: alarm_id })?;
            mutate(&mut entry);
            entry.clone()
        };
        if updated.is_cleared() {
            self.dedupe
                .remove_if(&updated.dedupe_key, |_, id| *id == alarm_id);
        }
        Ok(updated)
    }

    /// The non-cleared alarm currently holding a dedupe key, if any.
    pub fn alarm_for_dedupe_key(&self, key: &str) -> Option<Uuid> {
        self.dedupe.get(key).map(|id| *id)
    }

    pub fn list_alarms(&self, filter: &AlarmFilter) -> Vec<Alarm> {
        let mut alarms: Vec<Alarm> = self
            .alarms
            .iter()
            .filter(|a| {
                filter
                    .device_id
                    .as_deref()
                    .map(|d| a.device_id.as_deref() == Some(d))
                    .unwrap_or(true)
                    && filter.severity.map(|s| a.severity == s).unwrap_or(true)
                    && filter.alarm_type.map(|t| a.alarm_type == t).unwrap_or(true)
            })
            .map(|a| a.clone())
            .collect();
        alarms.sort_by(|a, b| b.raised_at.cmp(&a.raised_at));
        if let Some(limit) = filter.limit {
            alarms.truncate(limit);
        }
        alarms
    }

    pub fn alarms_raised_since(&self, cutoff: DateTime<Utc>) -> Vec<Alarm> {
        self.alarms
            .iter()
            .filter(|a| a.raised_at >= cutoff)
            .map(|a| a.clone())
            .collect()
    }

    /// Non-cleared alarms attributed to a rule, optionally restricted to a
    /// device. Used by auto-clear.
    pub fn open_alarms_for_rule(&self, rule_id: Uuid, device: Option<&str>) -> Vec<Alarm> {
        self.alarms
            .iter()
            .filter(|a| {
                !a.is_cleared()
                    && a.rule_id == Some(rule_id)
                    && device
                        .map(|d| a.device_id.as_deref() == Some(d))
                        .unwrap_or(true)
            })
            .map(|a| a.clone())
            .collect()
    }

    pub fn open_alarms(&self) -> Vec<Alarm> {
        self.alarms
            .iter()
            .filter(|a| !a.is_cleared())
            .map(|a| a.clone())
            .collect()
    }

    fn evict_one(&self) {
        // Prefer the oldest cleared alarm; fall back to the oldest overall.
        let victim = self
            .alarms
            .iter()
            .filter(|a| a.is_cleared())
            .min_by_key(|a| a.cleared_at.unwrap_or(a.raised_at))
            .map(|a| a.alarm_id)
            .or_else(|| self.alarms.iter().min_by_key(|a| a.raised_at).map(|a| a.alarm_id));

        if let Some(alarm_id) = victim {
            if let Some((_, alarm)) = self.alarms.remove(&alarm_id) {
                self.dedupe.remove_if(&alarm.dedupe_key, |_, id| *id == alarm_id);
            }
        }
    }

    // === Suppressions ===

    pub fn insert_suppression(&self, suppression: AlarmSuppression) {
        self.suppressions
            .insert(suppression.suppression_id, suppression);
    }

    pub fn active_suppressions(&self, now: DateTime<Utc>) -> Vec<AlarmSuppression> {
        self.suppressions
            .iter()
            .filter(|s| s.is_active(now))
            .map(|s| s.clone())
            .collect()
    }

    /// Mark active suppressions past their expiry and return them.
    pub fn expire_suppressions(&self, now: DateTime<Utc>) -> Vec<AlarmSuppression> {
        let mut expired = Vec::new();
        for mut entry in self.suppressions.iter_mut() {
            if entry.status == SuppressionStatus::Active && entry.expires_at <= now {
                entry.status = SuppressionStatus::Expired;
                expired.push(entry.clone());
            }
        }
        expired
    }

    pub fn suppressed_alarms(&self) -> Vec<Alarm> {
        self.alarms
            .iter()
            .filter(|a| a.status == AlarmStatus::Suppressed)
            .map(|a| a.clone())
            .collect()
    }

    pub fn alarm_count(&self) -> usize {
        self.alarms.len()
    }
}
