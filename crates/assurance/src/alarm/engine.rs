use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use assurance_core::{AlarmSettings, EngineMetrics, TenantId};

use crate::alarm::model::{Alarm, AlarmRule, AlarmStatistics, AlarmSuppression};
use crate::alarm::notify::{AlarmNotification, NotificationSink};
use crate::alarm::store::AlarmStore;
use crate::error::{AssuranceError, Result};
use crate::event::NormalizedEvent;
use crate::types::{AlarmSeverity, AlarmStatus, AlarmType, SuppressionStatus};

static TEMPLATE_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{(\w+)\}").unwrap());

/// What happened to one firing rule for one event.
#[derive(Debug, Clone)]
pub enum AlarmOutcome {
    Raised { alarm_id: Uuid },
    RaisedSuppressed { alarm_id: Uuid },
    Deduplicated { alarm_id: Uuid, occurrence_count: u64 },
    StormCoalesced { meta_alarm_id: Uuid },
}

/// Full account of one event passing through the engine.
#[derive(Debug, Clone, Default)]
pub struct ProcessReport {
    pub outcomes: Vec<AlarmOutcome>,
    pub auto_cleared: Vec<Uuid>,
}

/// Rule-based event correlation: matching, dedup, auto-clear, storm
/// protection, and suppression policy.
///
/// Mutations for one dedupe key are serialized through a per-key lock
/// table; different keys proceed concurrently.
pub struct AlarmEngine {
    tenant_id: TenantId,
    store: Arc<AlarmStore>,
    sink: Arc<dyn NotificationSink>,
    metrics: EngineMetrics,
    settings: AlarmSettings,
    key_locks: DashMap<String, Arc<Mutex<()>>>,
    regex_cache: DashMap<String, Regex>,
    storm_windows: DashMap<(String, AlarmType), VecDeque<DateTime<Utc>>>,
}

impl AlarmEngine {
    pub fn new(
        tenant_id: TenantId,
        store: Arc<AlarmStore>,
        sink: Arc<dyn NotificationSink>,
        metrics: EngineMetrics,
        settings: AlarmSettings,
    ) -> Self {
        Self {
            tenant_id,
            store,
            sink,
            metrics,
            settings,
            key_locks: DashMap::new(),
            regex_cache: DashMap::new(),
            storm_windows: DashMap::new(),
        }
    }

    pub fn store(&self) -> Arc<AlarmStore> {
        Arc::clone(&self.store)
    }

    /// Run one normalized event through the rule set.
    ///
    /// Never fails outward: rule evaluation problems are logged and the
    /// event simply does not fire that rule.
    pub async fn process_event(&self, event: &NormalizedEvent) -> ProcessReport {
        self.metrics.events_processed.inc();
        if !event.parsing_errors.is_empty() {
            self.metrics.parse_errors.inc();
        }

        let now = Utc::now();
        self.run_suppression_expiry(now).await;

        let mut report = ProcessReport::default();

        // Clear pass before the raise pass: a recovery event both clears
        // the fault alarm and may fire its own rules.
        report.auto_cleared = self.apply_auto_clear(event, now).await;

        for rule in self.store.rules_for_event(event.event_type) {
            let Some(matched_values) = self.criteria_match(&rule.match_criteria, event) else {
                continue;
            };

            let outcome = self.fire_rule(&rule, event, &matched_values, now).await;
            report.outcomes.push(outcome);

            if rule.terminal {
                break;
            }
        }

        report
    }

    /// Clear all open alarms whose rule declares this event as its clear
    /// condition.
    async fn apply_auto_clear(&self, event: &NormalizedEvent, now: DateTime<Utc>) -> Vec<Uuid> {
        let mut cleared = Vec::new();

        for rule in self.store.rules_for_event(event.event_type) {
            if !rule.auto_clear {
                continue;
            }
            let Some(conditions) = &rule.clear_conditions else {
                continue;
            };
            if self.criteria_match(conditions, event).is_none() {
                continue;
            }

            let device = event.source.device.as_str();
            for alarm in self.store.open_alarms_for_rule(rule.rule_id, Some(device)) {
                match self.store.update_alarm_with(alarm.alarm_id, |a| {
                    a.status = AlarmStatus::Cleared;
                    a.cleared_at = Some(now);
                    a.cleared_by = Some("auto".to_string());
                }) {
                    Ok(_) => {
                        info!(alarm_id = %alarm.alarm_id, rule = %rule.name, "Alarm auto-cleared");
                        self.sink
                            .deliver(AlarmNotification::Cleared {
                                alarm_id: alarm.alarm_id,
                                cleared_by: "auto".to_string(),
                            })
                            .await;
                        cleared.push(alarm.alarm_id);
                    }
                    Err(e) => warn!(alarm_id = %alarm.alarm_id, error = %e, "auto-clear failed"),
                }
            }
        }

        cleared
    }

    async fn fire_rule(
        &self,
        rule: &AlarmRule,
        event: &NormalizedEvent,
        matched_values: &BTreeMap<String, String>,
        now: DateTime<Utc>,
    ) -> AlarmOutcome {
        let _ = self.store.update_rule_with(rule.rule_id, |r| {
            r.alarms_generated += 1;
            r.last_triggered = Some(now);
        });

        let device = event.source.device.clone();
        let dedupe_key = dedupe_key(&self.tenant_id, rule.rule_id, &device, matched_values);

        // Serialize the whole decide-then-mutate sequence per dedupe key.
        let lock = self
            .key_locks
            .entry(dedupe_key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let (outcome, notification) = {
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

            if let Some(alarm_id) = self.store.alarm_for_dedupe_key(&dedupe_key) {
                match self.store.update_alarm_with(alarm_id, |a| {
                    a.occurrence_count += 1;
                    a.last_seen = now;
                }) {
                    Ok(alarm) => {
                        self.metrics.alarms_deduplicated.inc();
                        debug!(alarm_id = %alarm_id, count = alarm.occurrence_count,
                               "Event folded into existing alarm");
                        (
                            AlarmOutcome::Deduplicated {
                                alarm_id,
                                occurrence_count: alarm.occurrence_count,
                            },
                            None,
                        )
                    }
                    // Key holder vanished under eviction; fall through to raise
                    Err(_) => self.raise_alarm(rule, event, &device, &dedupe_key, now),
                }
            } else {
                self.raise_alarm(rule, event, &device, &dedupe_key, now)
            }
        };

        if let Some(notification) = notification {
            self.sink.deliver(notification).await;
        }
        outcome
    }

    /// Create a new alarm (or fold into the storm meta-alarm), returning
    /// the notification to deliver after the key lock is released.
    fn raise_alarm(
        &self,
        rule: &AlarmRule,
        event: &NormalizedEvent,
        device: &str,
        dedupe_key: &str,
        now: DateTime<Utc>,
    ) -> (AlarmOutcome, Option<AlarmNotification>) {
        if let Some(meta_alarm_id) = self.storm_check(device, rule.alarm_type, now) {
            self.metrics.alarms_deduplicated.inc();
            return (AlarmOutcome::StormCoalesced { meta_alarm_id }, None);
        }

        let suppressed = self
            .store
            .active_suppressions(now)
            .iter()
            .any(|s| s.matches(Some(device), rule.alarm_type));

        let alarm = Alarm {
            alarm_id: Uuid::new_v4(),
            tenant_id: self.tenant_id.clone(),
            device_id: Some(device.to_string()),
            rule_id: Some(rule.rule_id),
            alarm_type: rule.alarm_type,
            severity: rule.severity,
            title: format!("{}: {}", rule.name, device),
            description: rule
                .description_template
                .as_deref()
                .map(|t| render_template(t, event))
                .unwrap_or_else(|| event.description.clone()),
            status: if suppressed {
                AlarmStatus::Suppressed
            } else {
                AlarmStatus::Active
            },
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
            ack_comments: None,
            raised_at: now,
            last_seen: now,
            occurrence_count: 1,
            cleared_at: None,
            cleared_by: None,
            clear_comments: None,
            auto_clear: rule.auto_clear,
            tags: Vec::new(),
            dedupe_key: dedupe_key.to_string(),
        };

        let alarm_id = alarm.alarm_id;
        self.record_raise_for_storm(device, rule.alarm_type, now);
        self.store.insert_alarm(alarm.clone());

        if suppressed {
            self.metrics.alarms_suppressed.inc();
            info!(alarm_id = %alarm_id, device = device, "Alarm raised suppressed");
            (AlarmOutcome::RaisedSuppressed { alarm_id }, None)
        } else {
            self.metrics.alarms_raised.inc();
            info!(alarm_id = %alarm_id, device = device, severity = rule.severity.as_str(),
                  "Alarm raised");
            (
                AlarmOutcome::Raised { alarm_id },
                Some(AlarmNotification::Raised { alarm }),
            )
        }
    }

    /// Once `storm_threshold` alarms from one (device, type) land inside
    /// the window, further raises coalesce into a meta-alarm whose
    /// occurrence count tracks the suppressed raises.
    fn storm_check(
        &self,
        device: &str,
        alarm_type: AlarmType,
        now: DateTime<Utc>,
    ) -> Option<Uuid> {
        let window = Duration::minutes(self.settings.storm_window_minutes);
        let key = (device.to_string(), alarm_type);

        let in_window = {
            let mut timestamps = self.storm_windows.entry(key).or_default();
            while let Some(front) = timestamps.front() {
                if now - *front > window {
                    timestamps.pop_front();
                } else {
                    break;
                }
            }
            timestamps.len()
        };

        if in_window < self.settings.storm_threshold {
            return None;
        }

        let meta_key = format!("storm|{}|{}|{}", self.tenant_id, device, alarm_type.as_str());
        if let Some(meta_id) = self.store.alarm_for_dedupe_key(&meta_key) {
            if let Ok(meta) = self.store.update_alarm_with(meta_id, |a| {
                a.occurrence_count += 1;
                a.last_seen = now;
            }) {
                return Some(meta.alarm_id);
            }
        }

        let meta = Alarm {
            alarm_id: Uuid::new_v4(),
            tenant_id: self.tenant_id.clone(),
            device_id: Some(device.to_string()),
            rule_id: None,
            alarm_type,
            severity: AlarmSeverity::Major,
            title: format!("Alarm storm: {} on {}", alarm_type.as_str(), device),
            description: format!(
                "More than {} {} alarms from {} within {} minutes; further alarms are coalesced",
                self.settings.storm_threshold,
                alarm_type.as_str(),
                device,
                self.settings.storm_window_minutes
            ),
            status: AlarmStatus::Active,
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
            ack_comments: None,
            raised_at: now,
            last_seen: now,
            occurrence_count: 1,
            cleared_at: None,
            cleared_by: None,
            clear_comments: None,
            auto_clear: false,
            tags: vec!["storm".to_string()],
            dedupe_key: meta_key,
        };
        let meta_id = meta.alarm_id;
        warn!(device = device, alarm_type = alarm_type.as_str(), "Alarm storm detected");
        self.store.insert_alarm(meta);
        self.metrics.alarms_raised.inc();
        Some(meta_id)
    }

    fn record_raise_for_storm(&self, device: &str, alarm_type: AlarmType, now: DateTime<Utc>) {
        self.storm_windows
            .entry((device.to_string(), alarm_type))
            .or_default()
            .push_back(now);
    }

    /// Every criteria key must resolve on the event and match its pattern.
    /// Returns the matched event values for dedupe-key canonicalization.
    fn criteria_match(
        &self,
        criteria: &BTreeMap<String, String>,
        event: &NormalizedEvent,
    ) -> Option<BTreeMap<String, String>> {
        let mut matched = BTreeMap::new();

        for (key, pattern) in criteria {
            let value = event.field(key)?;

            let matches = if let Some(expr) = pattern.strip_prefix('~') {
                match self.compiled_regex(expr) {
                    Some(re) => re.is_match(&value),
                    None => false,
                }
            } else {
                &value == pattern
            };

            if !matches {
                return None;
            }
            matched.insert(key.clone(), value);
        }

        Some(matched)
    }

    fn compiled_regex(&self, expr: &str) -> Option<Regex> {
        if let Some(re) = self.regex_cache.get(expr) {
            return Some(re.clone());
        }
        match Regex::new(expr) {
            Ok(re) => {
                self.regex_cache.insert(expr.to_string(), re.clone());
                Some(re)
            }
            Err(e) => {
                warn!(pattern = expr, error = %e, "Invalid rule regex");
                None
            }
        }
    }

    // === Manual lifecycle ===

    pub async fn acknowledge(
        &self,
        alarm_id: Uuid,
        acknowledged_by: &str,
        comments: Option<String>,
    ) -> Result<Alarm> {
        let alarm = self.store.get_alarm(alarm_id)?;
        if alarm.is_cleared() {
            return Err(AssuranceError::invalid_state(format!(
                "alarm {} is already cleared",
                alarm_id
            )));
        }
        if alarm.acknowledged && alarm.acknowledged_by.as_deref() == Some(acknowledged_by) {
            return Ok(alarm);
        }

        self.store.update_alarm_with(alarm_id, |a| {
            a.status = AlarmStatus::Acknowledged;
            a.acknowledged = true;
            a.acknowledged_by = Some(acknowledged_by.to_string());
            a.acknowledged_at = Some(Utc::now());
            a.ack_comments = comments;
        })
    }

    pub async fn clear(
        &self,
        alarm_id: Uuid,
        cleared_by: &str,
        comments: Option<String>,
    ) -> Result<Alarm> {
        let alarm = self.store.get_alarm(alarm_id)?;
        if alarm.is_cleared() {
            return Err(AssuranceError::invalid_state(format!(
                "alarm {} is already cleared",
                alarm_id
            )));
        }

        let cleared = self.store.update_alarm_with(alarm_id, |a| {
            a.status = AlarmStatus::Cleared;
            a.cleared_at = Some(Utc::now());
            a.cleared_by = Some(cleared_by.to_string());
            a.clear_comments = comments;
        })?;

        self.sink
            .deliver(AlarmNotification::Cleared {
                alarm_id,
                cleared_by: cleared_by.to_string(),
            })
            .await;
        Ok(cleared)
    }

    /// Create a suppression and mute matching active alarms.
    pub async fn suppress(
        &self,
        device_id: &str,
        alarm_type_pattern: &str,
        duration_minutes: i64,
        reason: Option<String>,
        suppressed_by: Option<String>,
    ) -> Result<AlarmSuppression> {
        if duration_minutes < 1 {
            return Err(AssuranceError::validation(
                "duration_minutes",
                "suppression duration must be at least one minute",
            ));
        }

        let now = Utc::now();
        let suppression = AlarmSuppression {
            suppression_id: Uuid::new_v4(),
            tenant_id: self.tenant_id.clone(),
            device_id: device_id.to_string(),
            alarm_type_pattern: alarm_type_pattern.to_string(),
            starts_at: now,
            expires_at: now + Duration::minutes(duration_minutes),
            reason,
            suppressed_by,
            status: SuppressionStatus::Active,
        };

        for alarm in self.store.open_alarms() {
            if alarm.status == AlarmStatus::Suppressed {
                continue;
            }
            if suppression.matches(alarm.device_id.as_deref(), alarm.alarm_type) {
                let _ = self.store.update_alarm_with(alarm.alarm_id, |a| {
                    a.status = AlarmStatus::Suppressed;
                });
                self.metrics.alarms_suppressed.inc();
            }
        }

        info!(device = device_id, pattern = alarm_type_pattern, minutes = duration_minutes,
              "Alarm suppression created");
        self.store.insert_suppression(suppression.clone());
        Ok(suppression)
    }

    /// Expire overdue suppressions: suppressed-but-not-cleared alarms they
    /// covered return to ACTIVE with one deferred notification each.
    pub async fn run_suppression_expiry(&self, now: DateTime<Utc>) {
        let expired = self.store.expire_suppressions(now);
        if expired.is_empty() {
            return;
        }

        let still_active = self.store.active_suppressions(now);
        for alarm in self.store.suppressed_alarms() {
            let was_covered = expired
                .iter()
                .any(|s| s.matches(alarm.device_id.as_deref(), alarm.alarm_type));
            let still_covered = still_active
                .iter()
                .any(|s| s.matches(alarm.device_id.as_deref(), alarm.alarm_type));
            if !was_covered || still_covered {
                continue;
            }

            if let Ok(reactivated) = self.store.update_alarm_with(alarm.alarm_id, |a| {
                a.status = AlarmStatus::Active;
            }) {
                self.sink
                    .deliver(AlarmNotification::Deferred { alarm: reactivated })
                    .await;
            }
        }
    }

    pub fn statistics(&self, device_id: Option<&str>, hours: i64) -> AlarmStatistics {
        let cutoff = Utc::now() - Duration::hours(hours);
        let alarms: Vec<Alarm> = self
            .store
            .alarms_raised_since(cutoff)
            .into_iter()
            .filter(|a| device_id.map(|d| a.device_id.as_deref() == Some(d)).unwrap_or(true))
            .collect();

        let mut severity_distribution: BTreeMap<String, usize> = BTreeMap::new();
        let mut type_distribution: BTreeMap<String, usize> = BTreeMap::new();
        let mut devices: BTreeMap<String, usize> = BTreeMap::new();
        let mut active = 0;
        let mut acknowledged = 0;
        let mut suppressed = 0;
        let mut cleared = 0;

        for alarm in &alarms {
            *severity_distribution
                .entry(alarm.severity.as_str().to_string())
                .or_default() += 1;
            *type_distribution
                .entry(alarm.alarm_type.as_str().to_string())
                .or_default() += 1;
            if let Some(device) = &alarm.device_id {
                *devices.entry(device.clone()).or_default() += 1;
            }
            match alarm.status {
                AlarmStatus::Active => active += 1,
                AlarmStatus::Acknowledged => acknowledged += 1,
                AlarmStatus::Suppressed => suppressed += 1,
                AlarmStatus::Cleared => cleared += 1,
            }
        }

        let mut top_devices: Vec<(String, usize)> = devices.into_iter().collect();
        top_devices.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_devices.truncate(10);

        AlarmStatistics {
            hours,
            total_alarms: alarms.len(),
            active_alarms: active,
            acknowledged_alarms: acknowledged,
            suppressed_alarms: suppressed,
            cleared_alarms: cleared,
            severity_distribution,
            type_distribution,
            top_devices,
        }
    }
}

/// Canonical dedupe key: tenant, rule, device, then the matched criteria
/// values in key order.
fn dedupe_key(
    tenant_id: &TenantId,
    rule_id: Uuid,
    device: &str,
    matched_values: &BTreeMap<String, String>,
) -> String {
    let mut key = format!("{}|{}|{}", tenant_id, rule_id, device);
    for (k, v) in matched_values {
        key.push('|');
        key.push_str(k);
        key.push('=');
        key.push_str(v);
    }
    key
}

/// Replace `{field}` tokens with event field values; unknown tokens stay.
fn render_template(template: &str, event: &NormalizedEvent) -> String {
    TEMPLATE_TOKEN_RE
        .replace_all(template, |caps: &regex::Captures<'_>| {
            event.field(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
