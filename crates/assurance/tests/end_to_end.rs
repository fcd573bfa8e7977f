//! End-to-end scenarios driven through the public `ServiceAssurance`
//! surface with the simulated probe executor.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use assurance_core::{AssuranceConfig, TenantId};
use assurance_engine::alarm::AlarmFilter;
use assurance_engine::flow::IngestFlowRequest;
use assurance_engine::{
    AlarmSeverity, AlarmType, CreateAlarmRuleRequest, CreateProbeRequest, CreateSlaPolicyRequest,
    EventType, MemoryNotificationSink, NotificationSink, ProbeType, ServiceAssurance,
    SlaComplianceStatus, TalkerMetric,
};

fn simulated_config(success_rate: f64, latency_median_ms: f64) -> AssuranceConfig {
    let mut config = AssuranceConfig::default();
    config.probes.simulation_mode = true;
    config.probes.simulation_success_rate = success_rate;
    config.probes.simulation_latency_median_ms = latency_median_ms;
    config.probes.simulation_latency_sigma = 0.2;
    config
}

fn core(success_rate: f64, latency_median_ms: f64) -> ServiceAssurance {
    ServiceAssurance::new(
        TenantId::new("tenant-e2e"),
        simulated_config(success_rate, latency_median_ms),
    )
    .expect("core construction")
}

#[tokio::test]
async fn icmp_probe_happy_path() {
    let core = core(1.0, 10.0);
    let probe = core
        .create_probe(
            CreateProbeRequest::new("gw", ProbeType::Icmp, "192.0.2.1").with_cadence(1, 1),
        )
        .await
        .unwrap();

    core.start_scheduler().await;
    tokio::time::sleep(Duration::from_millis(3500)).await;
    core.shutdown().await.unwrap();

    let stats = core.get_probe_statistics(probe.probe_id, 1).await.unwrap();
    assert!(
        stats.availability.total_measurements >= 3,
        "expected at least 3 results, got {}",
        stats.availability.total_measurements
    );
    assert_eq!(stats.availability.availability_percent, 100.0);
    assert!(
        (stats.latency_stats.average_ms - 10.0).abs() < 3.0,
        "average latency {} outside 10±3",
        stats.latency_stats.average_ms
    );
}

#[tokio::test]
async fn sla_violation_detection() {
    let core = core(0.8, 10.0);
    let policy = core
        .create_sla_policy(CreateSlaPolicyRequest::new("tight", 99.9, 50, 1))
        .await
        .unwrap();
    let probe = core
        .create_probe(
            CreateProbeRequest::new("gw", ProbeType::Icmp, "192.0.2.1")
                .with_cadence(5, 2)
                .with_sla_policy(policy.policy_id),
        )
        .await
        .unwrap();

    for _ in 0..100 {
        core.execute_probe(probe.probe_id).await.unwrap();
    }

    let compliance = core.check_sla_compliance(probe.probe_id).await.unwrap();
    assert_eq!(compliance.compliance_status, SlaComplianceStatus::Violation);
    let availability = compliance.availability.unwrap();
    assert!(
        (availability.actual - 80.0).abs() < 15.0,
        "availability {} not near the simulated 80%",
        availability.actual
    );

    // repeated checks do not open additional violations
    core.check_sla_compliance(probe.probe_id).await.unwrap();
    let violations = core.list_sla_violations(1, Some(probe.probe_id)).await.unwrap();
    let open: Vec<_> = violations.iter().filter(|v| v.is_open()).collect();
    assert_eq!(open.len(), 1);
}

#[tokio::test]
async fn snmp_link_down_raises_deduplicated_alarm() {
    let core = core(1.0, 10.0);
    let mut criteria = BTreeMap::new();
    criteria.insert("trap_oid".to_string(), "1.3.6.1.6.3.1.1.5.3".to_string());
    core.create_alarm_rule(
        CreateAlarmRuleRequest::new(
            "link-down",
            EventType::SnmpTrap,
            criteria,
            AlarmSeverity::Major,
        )
        .with_alarm_type(AlarmType::Equipment),
    )
    .await
    .unwrap();

    let mut varbinds = HashMap::new();
    varbinds.insert("ifIndex".to_string(), "2".to_string());
    for _ in 0..3 {
        core.process_snmp_trap("sw-01", "10.0.0.1", "1.3.6.1.6.3.1.1.5.3", &varbinds, None)
            .await;
    }

    let alarms = core.list_active_alarms(AlarmFilter::default()).await.unwrap();
    assert_eq!(alarms.len(), 1);
    assert_eq!(alarms[0].severity, AlarmSeverity::Major);
    assert_eq!(alarms[0].occurrence_count, 3);
    assert_eq!(alarms[0].device_id.as_deref(), Some("sw-01"));
}

#[tokio::test]
async fn link_up_auto_clears_link_down_alarm() {
    let core = core(1.0, 10.0);
    let mut criteria = BTreeMap::new();
    criteria.insert("trap_oid".to_string(), "1.3.6.1.6.3.1.1.5.3".to_string());
    let mut clear_conditions = BTreeMap::new();
    clear_conditions.insert("trap_oid".to_string(), "1.3.6.1.6.3.1.1.5.4".to_string());

    core.create_alarm_rule(
        CreateAlarmRuleRequest::new(
            "link-down",
            EventType::SnmpTrap,
            criteria,
            AlarmSeverity::Major,
        )
        .with_alarm_type(AlarmType::Equipment)
        .with_auto_clear(clear_conditions),
    )
    .await
    .unwrap();

    core.process_snmp_trap(
        "sw-01",
        "10.0.0.1",
        "1.3.6.1.6.3.1.1.5.3",
        &HashMap::new(),
        None,
    )
    .await;
    assert_eq!(
        core.list_active_alarms(AlarmFilter::default())
            .await
            .unwrap()
            .len(),
        1
    );

    let report = core
        .process_snmp_trap(
            "sw-01",
            "10.0.0.1",
            "1.3.6.1.6.3.1.1.5.4",
            &HashMap::new(),
            None,
        )
        .await;
    assert_eq!(report.auto_cleared.len(), 1);
    assert!(core
        .list_active_alarms(AlarmFilter::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn flow_top_talkers_with_sampling() {
    let core = core(1.0, 10.0);
    let collector = core.create_netflow_collector("edge", 2055, 10).await.unwrap();
    let id = collector.collector_id;

    for (src, bytes) in [
        ("10.0.0.65", 100u64),
        ("10.0.0.66", 50),
        ("10.0.0.65", 100),
        ("10.0.0.67", 30),
        ("10.0.0.65", 100),
    ] {
        core.ingest_flow_record(IngestFlowRequest::new(id, src, "10.1.0.1", 6, 1, bytes))
            .await
            .unwrap();
    }

    let talkers = core
        .top_talkers(1, 2, TalkerMetric::Bytes, None)
        .await
        .unwrap();
    assert_eq!(talkers.len(), 2);
    assert_eq!(talkers[0].rank, 1);
    assert_eq!(talkers[0].src_addr, "10.0.0.65");
    assert_eq!(talkers[0].bytes, 3000);
    assert_eq!(talkers[1].rank, 2);
    assert_eq!(talkers[1].src_addr, "10.0.0.66");
    assert_eq!(talkers[1].bytes, 500);

    // collector counters track scaled bytes
    let stats = core.get_collector_statistics(id).await.unwrap();
    assert_eq!(stats.flows_received, 5);
    assert_eq!(stats.bytes_received, 3800);
}

#[tokio::test]
async fn anomaly_detection_with_insufficient_baseline() {
    let core = core(1.0, 10.0);
    let collector = core.create_netflow_collector("edge", 2055, 1).await.unwrap();

    // all flows land in the current window; far fewer than 10 baseline windows
    for _ in 0..30 {
        core.ingest_flow_record(IngestFlowRequest::new(
            collector.collector_id,
            "10.0.0.1",
            "10.1.0.1",
            6,
            1,
            1000,
        ))
        .await
        .unwrap();
    }

    let report = core.detect_traffic_anomalies(24, 45, 2.0).await.unwrap();
    assert!(!report.anomalies_detected);
    assert!(report.baseline_insufficient);
    assert!(report.anomalies.is_empty());
}

#[tokio::test]
async fn suppression_keeps_notifications_from_the_sink() {
    let sink = Arc::new(MemoryNotificationSink::new());
    let core = ServiceAssurance::with_sink(
        TenantId::new("tenant-e2e"),
        simulated_config(1.0, 10.0),
        Arc::clone(&sink) as Arc<dyn NotificationSink>,
    )
    .unwrap();

    let mut criteria = BTreeMap::new();
    criteria.insert("trap_oid".to_string(), "1.3.6.1.6.3.1.1.5.3".to_string());
    core.create_alarm_rule(
        CreateAlarmRuleRequest::new(
            "link-down",
            EventType::SnmpTrap,
            criteria,
            AlarmSeverity::Major,
        )
        .with_alarm_type(AlarmType::Equipment),
    )
    .await
    .unwrap();

    core.suppress_alarms("sw-01", "*", 60, Some("maintenance".into()), Some("noc".into()))
        .await
        .unwrap();
    core.process_snmp_trap(
        "sw-01",
        "10.0.0.1",
        "1.3.6.1.6.3.1.1.5.3",
        &HashMap::new(),
        None,
    )
    .await;

    // raised suppressed: nothing reaches the sink
    assert_eq!(sink.raised_count(), 0);
    let alarms = core.list_active_alarms(AlarmFilter::default()).await.unwrap();
    assert_eq!(alarms.len(), 1);
}

#[tokio::test]
async fn dashboard_and_health_check_compose() {
    let core = core(1.0, 10.0);
    let probe = core
        .create_probe(CreateProbeRequest::new("gw", ProbeType::Icmp, "192.0.2.1"))
        .await
        .unwrap();
    for _ in 0..5 {
        core.execute_probe(probe.probe_id).await.unwrap();
    }
    core.create_netflow_collector("edge", 2055, 1).await.unwrap();

    let dashboard = core.service_health_dashboard(1).await.unwrap();
    assert_eq!(dashboard.overall_health.total_probes, 1);
    assert_eq!(dashboard.overall_health.healthy_probes, 1);
    assert_eq!(dashboard.overall_health.status, "healthy");
    assert!(dashboard.traffic_analytics.is_some());

    let report = core.network_performance_report(1).await.unwrap();
    assert_eq!(report.connectivity_analysis.probe_count, 1);

    let health = core.health_check().await.unwrap();
    assert_eq!(health.total_probes, 1);
    assert_eq!(health.total_collectors, 1);
    assert!(!health.scheduler_running);
}

#[tokio::test]
async fn rule_helpers_use_configured_default_severity() {
    let core = core(1.0, 10.0);
    let rule = core
        .create_snmp_alarm_rule("auth-failure", "1.3.6.1.6.3.1.1.5.5", None, None)
        .await
        .unwrap();
    assert_eq!(rule.severity, AlarmSeverity::Warning);

    let rule = core
        .create_syslog_alarm_rule(
            "bgp-down",
            "(?i)bgp.*down",
            Some(AlarmSeverity::Critical),
            None,
        )
        .await
        .unwrap();
    assert_eq!(rule.severity, AlarmSeverity::Critical);

    core.process_syslog(
        "rtr-01",
        "10.0.0.5",
        "<11>bgpd: BGP neighbor 10.1.1.1 Down",
        16,
        6,
        None,
    )
    .await;
    let alarms = core.list_active_alarms(AlarmFilter::default()).await.unwrap();
    assert_eq!(alarms.len(), 1);
    assert_eq!(alarms[0].severity, AlarmSeverity::Critical);
}

#[tokio::test]
async fn dynamic_threshold_confidence_levels() {
    let core = core(1.0, 10.0);
    let history: Vec<f64> = (0..30).map(|i| 100.0 + (i % 7) as f64).collect();
    let thresholds = core.calculate_dynamic_thresholds(&history).unwrap();
    assert!(!thresholds.insufficient_data);
    assert!(thresholds.critical_upper > thresholds.warning_upper);
}
