use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

use assurance_core::TenantId;

use crate::types::{AlarmSeverity, AlarmStatus, AlarmType, EventType, SuppressionStatus};

/// Declarative matcher converting normalized events to alarms.
///
/// Criteria values are matched literally unless prefixed with `~`, which
/// marks a regular expression applied to the stringified event field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmRule {
    pub rule_id: Uuid,
    pub tenant_id: TenantId,
    pub name: String,
    pub description: Option<String>,
    pub event_type: EventType,
    pub match_criteria: BTreeMap<String, String>,
    pub severity: AlarmSeverity,
    pub alarm_type: AlarmType,
    pub auto_clear: bool,
    pub clear_conditions: Option<BTreeMap<String, String>>,
    pub description_template: Option<String>,
    pub enabled: bool,
    pub priority: i32,
    /// When false, evaluation continues past this rule after it fires.
    pub terminal: bool,

    // Counters
    pub alarms_generated: u64,
    pub last_triggered: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stateful fault instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alarm {
    pub alarm_id: Uuid,
    pub tenant_id: TenantId,
    pub device_id: Option<String>,
    pub rule_id: Option<Uuid>,
    pub alarm_type: AlarmType,
    pub severity: AlarmSeverity,
    pub title: String,
    pub description: String,
    pub status: AlarmStatus,

    pub acknowledged: bool,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub ack_comments: Option<String>,

    pub raised_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub occurrence_count: u64,

    pub cleared_at: Option<DateTime<Utc>>,
    pub cleared_by: Option<String>,
    pub clear_comments: Option<String>,

    pub auto_clear: bool,
    pub tags: Vec<String>,

    /// Key repeated events collapse on while the alarm is non-cleared.
    pub dedupe_key: String,
}

impl Alarm {
    pub fn is_cleared(&self) -> bool {
        self.status.is_cleared()
    }
}

/// Time-bounded mute for alarms matching a (device, type) pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmSuppression {
    pub suppression_id: Uuid,
    pub tenant_id: TenantId,
    /// Device id or `*` for all devices.
    pub device_id: String,
    /// Alarm type name, `*`, or a `prefix*` pattern.
    pub alarm_type_pattern: String,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub suppressed_by: Option<String>,
    pub status: SuppressionStatus,
}

impl AlarmSuppression {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == SuppressionStatus::Active && self.starts_at <= now && now < self.expires_at
    }

    pub fn matches(&self, device: Option<&str>, alarm_type: AlarmType) -> bool {
        let device_matches = self.device_id == "*"
            || device.map(|d| d == self.device_id).unwrap_or(false);
        device_matches && pattern_matches(&self.alarm_type_pattern, alarm_type.as_str())
    }
}

/// `*` matches anything; a trailing `*` matches by prefix; otherwise exact.
pub fn pattern_matches(pattern: &str, value: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match pattern.strip_suffix('*') {
        Some(prefix) => value.starts_with(prefix),
        None => pattern == value,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAlarmRuleRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub event_type: EventType,
    pub match_criteria: BTreeMap<String, String>,
    pub severity: AlarmSeverity,
    pub alarm_type: AlarmType,
    #[serde(default)]
    pub auto_clear: bool,
    pub clear_conditions: Option<BTreeMap<String, String>>,
    pub description_template: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub terminal: bool,
    pub description: Option<String>,
}

fn default_true() -> bool {
    true
}

impl CreateAlarmRuleRequest {
    pub fn new(
        name: impl Into<String>,
        event_type: EventType,
        match_criteria: BTreeMap<String, String>,
        severity: AlarmSeverity,
    ) -> Self {
        Self {
            name: name.into(),
            event_type,
            match_criteria,
            severity,
            alarm_type: AlarmType::System,
            auto_clear: false,
            clear_conditions: None,
            description_template: None,
            enabled: true,
            priority: 0,
            terminal: true,
            description: None,
        }
    }

    pub fn with_alarm_type(mut self, alarm_type: AlarmType) -> Self {
        self.alarm_type = alarm_type;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_auto_clear(mut self, clear_conditions: BTreeMap<String, String>) -> Self {
        self.auto_clear = true;
        self.clear_conditions = Some(clear_conditions);
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.description_template = Some(template.into());
        self
    }

    pub fn non_terminal(mut self) -> Self {
        self.terminal = false;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateAlarmRuleRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub match_criteria: Option<BTreeMap<String, String>>,
    pub severity: Option<AlarmSeverity>,
    pub alarm_type: Option<AlarmType>,
    pub auto_clear: Option<bool>,
    pub clear_conditions: Option<Option<BTreeMap<String, String>>>,
    pub description_template: Option<String>,
    pub enabled: Option<bool>,
    pub priority: Option<i32>,
    pub terminal: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct AlarmFilter {
    pub device_id: Option<String>,
    pub severity: Option<AlarmSeverity>,
    pub alarm_type: Option<AlarmType>,
    pub limit: Option<usize>,
}

/// Dashboard block for `get_alarm_statistics`.
#[derive(Debug, Clone, Serialize)]
pub struct AlarmStatistics {
    pub hours: i64,
    pub total_alarms: usize,
    pub active_alarms: usize,
    pub acknowledged_alarms: usize,
    pub suppressed_alarms: usize,
    pub cleared_alarms: usize,
    pub severity_distribution: BTreeMap<String, usize>,
    pub type_distribution: BTreeMap<String, usize>,
    pub top_devices: Vec<(String, usize)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_matching_variants() {
        assert!(pattern_matches("*", "equipment"));
        assert!(pattern_matches("equipment", "equipment"));
        assert!(!pattern_matches("equipment", "system"));
        assert!(pattern_matches("equip*", "equipment"));
        assert!(!pattern_matches("equip*", "system"));
    }

    #[test]
    fn suppression_matching_honors_window_and_device() {
        let now = Utc::now();
        let suppression = AlarmSuppression {
            suppression_id: Uuid::new_v4(),
            tenant_id: TenantId::new("t1"),
            device_id: "sw-01".to_string(),
            alarm_type_pattern: "*".to_string(),
            starts_at: now - chrono::Duration::minutes(1),
            expires_at: now + chrono::Duration::minutes(10),
            reason: None,
            suppressed_by: None,
            status: SuppressionStatus::Active,
        };

        assert!(suppression.is_active(now));
        assert!(suppression.matches(Some("sw-01"), AlarmType::Equipment));
        assert!(!suppression.matches(Some("sw-02"), AlarmType::Equipment));
        assert!(!suppression.matches(None, AlarmType::Equipment));
        assert!(!suppression.is_active(now + chrono::Duration::minutes(11)));
    }
}
