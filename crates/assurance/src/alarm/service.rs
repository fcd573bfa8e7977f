use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use assurance_core::TenantId;

use crate::alarm::engine::{AlarmEngine, ProcessReport};
use crate::alarm::model::{
    Alarm, AlarmFilter, AlarmRule, AlarmStatistics, AlarmSuppression, CreateAlarmRuleRequest,
    UpdateAlarmRuleRequest,
};
use crate::alarm::store::AlarmStore;
use crate::error::{AssuranceError, Result};
use crate::event::EventNormalizer;

/// Rule administration plus the event ingest and alarm lifecycle surface.
///
/// The ingest methods never fail: parse problems land on the produced
/// records and the report, per the fault-ingestion contract.
#[async_trait]
pub trait AlarmService: Send + Sync {
    async fn create_alarm_rule(&self, request: CreateAlarmRuleRequest) -> Result<AlarmRule>;
    async fn list_alarm_rules(&self) -> Result<Vec<AlarmRule>>;
    async fn update_alarm_rule(
        &self,
        rule_id: Uuid,
        request: UpdateAlarmRuleRequest,
    ) -> Result<AlarmRule>;
    async fn delete_alarm_rule(&self, rule_id: Uuid) -> Result<()>;

    async fn process_snmp_trap(
        &self,
        source_device: &str,
        source_ip: &str,
        trap_oid: &str,
        varbinds: &HashMap<String, String>,
        raw_data: Option<String>,
    ) -> ProcessReport;
    async fn process_syslog(
        &self,
        source_device: &str,
        source_ip: &str,
        message: &str,
        facility: u8,
        severity: u8,
        raw_data: Option<String>,
    ) -> ProcessReport;

    async fn acknowledge_alarm(
        &self,
        alarm_id: Uuid,
        acknowledged_by: &str,
        comments: Option<String>,
    ) -> Result<Alarm>;
    async fn clear_alarm(
        &self,
        alarm_id: Uuid,
        cleared_by: &str,
        comments: Option<String>,
    ) -> Result<Alarm>;
    async fn suppress_alarms(
        &self,
        device_id: &str,
        alarm_type_pattern: &str,
        duration_minutes: i64,
        reason: Option<String>,
        suppressed_by: Option<String>,
    ) -> Result<AlarmSuppression>;

    async fn list_active_alarms(&self, filter: AlarmFilter) -> Result<Vec<Alarm>>;
    async fn get_alarm_statistics(
        &self,
        device_id: Option<&str>,
        hours: i64,
    ) -> Result<AlarmStatistics>;
}

pub struct DefaultAlarmService {
    tenant_id: TenantId,
    engine: Arc<AlarmEngine>,
    store: Arc<AlarmStore>,
    normalizer: EventNormalizer,
}

impl DefaultAlarmService {
    pub fn new(tenant_id: TenantId, engine: Arc<AlarmEngine>) -> Self {
        let store = engine.store();
        Self {
            tenant_id,
            engine,
            store,
            normalizer: EventNormalizer::new(),
        }
    }

    pub fn engine(&self) -> Arc<AlarmEngine> {
        Arc::clone(&self.engine)
    }
}

#[async_trait]
impl AlarmService for DefaultAlarmService {
    async fn create_alarm_rule(&self, request: CreateAlarmRuleRequest) -> Result<AlarmRule> {
        request
            .validate()
            .map_err(|e| AssuranceError::validation("request", e.to_string()))?;
        if request.match_criteria.is_empty() {
            return Err(AssuranceError::validation(
                "match_criteria",
                "at least one criterion is required",
            ));
        }
        if self.store.rule_name_taken(&request.name) {
            return Err(AssuranceError::Duplicate {
                entity: "alarm rule",
                name: request.name,
            });
        }

        let now = Utc::now();
        let rule = AlarmRule {
            rule_id: Uuid::new_v4(),
            tenant_id: self.tenant_id.clone(),
            name: request.name,
            description: request.description,
            event_type: request.event_type,
            match_criteria: request.match_criteria,
            severity: request.severity,
            alarm_type: request.alarm_type,
            auto_clear: request.auto_clear,
            clear_conditions: request.clear_conditions,
            description_template: request.description_template,
            enabled: request.enabled,
            priority: request.priority,
            terminal: request.terminal,
            alarms_generated: 0,
            last_triggered: None,
            created_at: now,
            updated_at: now,
        };

        info!(rule_id = %rule.rule_id, name = %rule.name, event_type = ?rule.event_type,
              "Alarm rule created");
        self.store.insert_rule(rule.clone());
        Ok(rule)
    }

    async fn list_alarm_rules(&self) -> Result<Vec<AlarmRule>> {
        Ok(self.store.list_rules())
    }

    async fn update_alarm_rule(
        &self,
        rule_id: Uuid,
        request: UpdateAlarmRuleRequest,
    ) -> Result<AlarmRule> {
        request
            .validate()
            .map_err(|e| AssuranceError::validation("request", e.to_string()))?;
        if let Some(ref criteria) = request.match_criteria {
            if criteria.is_empty() {
                return Err(AssuranceError::validation(
                    "match_criteria",
                    "at least one criterion is required",
                ));
            }
        }

        let existing = self.store.get_rule(rule_id)?;
        if let Some(ref name) = request.name {
            if name != &existing.name && self.store.rule_name_taken(name) {
                return Err(AssuranceError::Duplicate {
                    entity: "alarm rule",
                    name: name.clone(),
                });
            }
        }

        self.store.update_rule_with(rule_id, |r| {
            if let Some(name) = request.name {
                r.name = name;
            }
            if let Some(criteria) = request.match_criteria {
                r.match_criteria = criteria;
            }
            if let Some(severity) = request.severity {
                r.severity = severity;
            }
            if let Some(alarm_type) = request.alarm_type {
                r.alarm_type = alarm_type;
            }
            if let Some(auto_clear) = request.auto_clear {
                r.auto_clear = auto_clear;
            }
            if let Some(clear_conditions) = request.clear_conditions {
                r.clear_conditions = clear_conditions;
            }
            if let Some(template) = request.description_template {
                r.description_template = Some(template);
            }
            if let Some(enabled) = request.enabled {
                r.enabled = enabled;
            }
            if let Some(priority) = request.priority {
                r.priority = priority;
            }
            if let Some(terminal) = request.terminal {
                r.terminal = terminal;
            }
        })
    }

    async fn delete_alarm_rule(&self, rule_id: Uuid) -> Result<()> {
        let rule = self.store.remove_rule(rule_id)?;
        info!(rule_id = %rule_id, name = %rule.name, "Alarm rule deleted");
        Ok(())
    }

    async fn process_snmp_trap(
        &self,
        source_device: &str,
        source_ip: &str,
        trap_oid: &str,
        varbinds: &HashMap<String, String>,
        raw_data: Option<String>,
    ) -> ProcessReport {
        let event = match raw_data.as_deref() {
            // A raw blob carries more than the pre-decoded fields; prefer it
            Some(raw) if !raw.trim().is_empty() => {
                self.normalizer
                    .snmp_trap_from_raw(raw, source_ip, Some(source_device))
            }
            _ => self.normalizer.snmp_trap_from_fields(
                source_device,
                source_ip,
                trap_oid,
                varbinds,
                raw_data.clone(),
            ),
        };
        self.engine.process_event(&event).await
    }

    async fn process_syslog(
        &self,
        source_device: &str,
        source_ip: &str,
        message: &str,
        facility: u8,
        severity: u8,
        raw_data: Option<String>,
    ) -> ProcessReport {
        let event = self.normalizer.syslog_from_fields(
            source_device,
            source_ip,
            message,
            facility,
            severity,
            raw_data,
        );
        self.engine.process_event(&event).await
    }

    async fn acknowledge_alarm(
        &self,
        alarm_id: Uuid,
        acknowledged_by: &str,
        comments: Option<String>,
    ) -> Result<Alarm> {
        self.engine
            .acknowledge(alarm_id, acknowledged_by, comments)
            .await
    }

    async fn clear_alarm(
        &self,
        alarm_id: Uuid,
        cleared_by: &str,
        comments: Option<String>,
    ) -> Result<Alarm> {
        self.engine.clear(alarm_id, cleared_by, comments).await
    }

    async fn suppress_alarms(
        &self,
        device_id: &str,
        alarm_type_pattern: &str,
        duration_minutes: i64,
        reason: Option<String>,
        suppressed_by: Option<String>,
    ) -> Result<AlarmSuppression> {
        self.engine
            .suppress(
                device_id,
                alarm_type_pattern,
                duration_minutes,
                reason,
                suppressed_by,
            )
            .await
    }

    async fn list_active_alarms(&self, filter: AlarmFilter) -> Result<Vec<Alarm>> {
        self.engine.run_suppression_expiry(Utc::now()).await;
        Ok(self
            .store
            .list_alarms(&filter)
            .into_iter()
            .filter(|a| !a.is_cleared())
            .collect())
    }

    async fn get_alarm_statistics(
        &self,
        device_id: Option<&str>,
        hours: i64,
    ) -> Result<AlarmStatistics> {
        Ok(self.engine.statistics(device_id, hours))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::notify::{MemoryNotificationSink, NotificationSink};
    use crate::types::{AlarmSeverity, AlarmType, EventType};
    use assurance_core::{AlarmSettings, EngineMetrics};
    use std::collections::BTreeMap;

    fn service() -> DefaultAlarmService {
        let sink: Arc<dyn NotificationSink> = Arc::new(MemoryNotificationSink::new());
        let engine = Arc::new(AlarmEngine::new(
            TenantId::new("t1"),
            Arc::new(AlarmStore::new(5000)),
            sink,
            EngineMetrics::unregistered(),
            AlarmSettings::default(),
        ));
        DefaultAlarmService::new(TenantId::new("t1"), engine)
    }

    fn link_down_request() -> CreateAlarmRuleRequest {
        let mut criteria = BTreeMap::new();
        criteria.insert("trap_oid".to_string(), "1.3.6.1.6.3.1.1.5.3".to_string());
        CreateAlarmRuleRequest::new(
            "link-down",
            EventType::SnmpTrap,
            criteria,
            AlarmSeverity::Major,
        )
        .with_alarm_type(AlarmType::Equipment)
    }

    #[tokio::test]
    async fn trap_ingest_raises_and_counts_on_rule() {
        let service = service();
        let rule = service.create_alarm_rule(link_down_request()).await.unwrap();

        let mut varbinds = HashMap::new();
        varbinds.insert("ifIndex".to_string(), "2".to_string());
        for _ in 0..3 {
            service
                .process_snmp_trap("sw-01", "10.0.0.1", "1.3.6.1.6.3.1.1.5.3", &varbinds, None)
                .await;
        }

        let alarms = service.list_active_alarms(AlarmFilter::default()).await.unwrap();
        assert_eq!(alarms.len(), 1);
        assert_eq!(alarms[0].occurrence_count, 3);
        assert_eq!(alarms[0].severity, AlarmSeverity::Major);

        let rules = service.list_alarm_rules().await.unwrap();
        assert_eq!(rules[0].rule_id, rule.rule_id);
        assert_eq!(rules[0].alarms_generated, 3);
        assert!(rules[0].last_triggered.is_some());
    }

    #[tokio::test]
    async fn rule_without_criteria_is_rejected() {
        let service = service();
        let request = CreateAlarmRuleRequest::new(
            "empty",
            EventType::Syslog,
            BTreeMap::new(),
            AlarmSeverity::Warning,
        );
        let err = service.create_alarm_rule(request).await.unwrap_err();
        assert!(matches!(err, AssuranceError::Validation { .. }));
    }

    #[tokio::test]
    async fn rule_update_can_disable_matching() {
        let service = service();
        let rule = service.create_alarm_rule(link_down_request()).await.unwrap();

        service
            .update_alarm_rule(
                rule.rule_id,
                UpdateAlarmRuleRequest {
                    enabled: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let report = service
            .process_snmp_trap(
                "sw-01",
                "10.0.0.1",
                "1.3.6.1.6.3.1.1.5.3",
                &HashMap::new(),
                None,
            )
            .await;
        assert!(report.outcomes.is_empty());
    }

    #[tokio::test]
    async fn syslog_ingest_matches_message_rules() {
        let service = service();
        let mut criteria = BTreeMap::new();
        criteria.insert("message".to_string(), "~(?i)fan.*fail".to_string());
        service
            .create_alarm_rule(CreateAlarmRuleRequest::new(
                "fan-failure",
                EventType::Syslog,
                criteria,
                AlarmSeverity::Critical,
            ))
            .await
            .unwrap();

        let report = service
            .process_syslog(
                "core-01",
                "10.0.0.7",
                "<10>chassisd: Fan tray 1 FAILED",
                16,
                6,
                None,
            )
            .await;
        assert_eq!(report.outcomes.len(), 1);

        let alarms = service.list_active_alarms(AlarmFilter::default()).await.unwrap();
        assert_eq!(alarms[0].severity, AlarmSeverity::Critical);
        assert_eq!(alarms[0].device_id.as_deref(), Some("core-01"));
    }

    #[tokio::test]
    async fn unknown_alarm_operations_return_not_found() {
        let service = service();
        let missing = Uuid::new_v4();
        assert!(matches!(
            service.acknowledge_alarm(missing, "op", None).await.unwrap_err(),
            AssuranceError::AlarmNotFound { .. }
        ));
        assert!(matches!(
            service.clear_alarm(missing, "op", None).await.unwrap_err(),
            AssuranceError::AlarmNotFound { .. }
        ));
        assert!(matches!(
            service.delete_alarm_rule(missing).await.unwrap_err(),
            AssuranceError::RuleNotFound { .. }
        ));
    }
}
