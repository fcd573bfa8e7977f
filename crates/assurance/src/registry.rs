use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use assurance_core::{AssuranceConfig, EngineMetrics, MetricsRegistry, TenantId};

use crate::alarm::{
    Alarm, AlarmEngine, AlarmFilter, AlarmRule, AlarmService, AlarmStatistics, AlarmStore,
    AlarmSuppression, CreateAlarmRuleRequest, DefaultAlarmService, NotificationSink, ProcessReport,
    TracingNotificationSink, UpdateAlarmRuleRequest,
};
use crate::error::Result;
use crate::flow::{
    AnomalyReport, CreateFlowCollectorRequest, DefaultFlowService, FlowAggregate, FlowCollector,
    FlowRecord, FlowService, FlowStore, GroupBy, IngestFlowRequest, ProtocolStats, SubnetTraffic,
    TalkerMetric, TopTalker, TrafficSummary,
};
use crate::metrics::{dynamic_thresholds, DynamicThresholds, SlaCredit};
use crate::probe::{
    CreateProbeRequest, DefaultProbeService, NetworkProbeExecutor, Probe, ProbeExecutor,
    ProbeFilter, ProbeParameters, ProbeResult, ProbeScheduler, ProbeService, ProbeStatistics,
    ProbeStore, SimulatedProbeExecutor, UpdateProbeRequest,
};
use crate::sla::{
    CreateSlaPolicyRequest, SlaCompliance, SlaEvaluator, SlaPolicy, SlaStore, SlaViolation,
};
use crate::types::{AlarmSeverity, AlarmType, CollectorStatus, EventType, FlowType, ProbeType};

/// The service assurance core for one tenant.
///
/// Owns the four engines and exposes the full command/query surface.
/// Engines hold their own stores; cross-engine references travel as ids.
pub struct ServiceAssurance {
    tenant_id: TenantId,
    config: AssuranceConfig,
    metrics_registry: MetricsRegistry,
    probes: Arc<DefaultProbeService>,
    alarms: Arc<DefaultAlarmService>,
    flows: Arc<DefaultFlowService>,
    sla: Arc<SlaEvaluator>,
    scheduler: Mutex<ProbeScheduler>,
    scheduler_running: std::sync::atomic::AtomicBool,
}

impl ServiceAssurance {
    /// Build a core with the default (tracing) notification sink.
    pub fn new(tenant_id: TenantId, config: AssuranceConfig) -> Result<Self> {
        Self::with_sink(tenant_id, config, Arc::new(TracingNotificationSink))
    }

    /// Build a core delivering alarm notifications to a custom sink.
    pub fn with_sink(
        tenant_id: TenantId,
        config: AssuranceConfig,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        let metrics_registry = MetricsRegistry::new("assurance");
        let metrics = EngineMetrics::new(&metrics_registry).map_err(assurance_core::Error::from)?;

        let sla_store = Arc::new(SlaStore::new());
        let probe_store = Arc::new(ProbeStore::new(config.probes.max_results_per_probe));

        let executor: Arc<dyn ProbeExecutor> = if config.probes.simulation_mode {
            Arc::new(SimulatedProbeExecutor::new(
                config.probes.simulation_success_rate,
                config.probes.simulation_latency_median_ms,
                config.probes.simulation_latency_sigma,
            ))
        } else {
            Arc::new(NetworkProbeExecutor::new()?)
        };

        let probes = Arc::new(DefaultProbeService::new(
            tenant_id.clone(),
            Arc::clone(&probe_store),
            Arc::clone(&sla_store),
            executor,
            metrics.clone(),
            config.probes.clone(),
        ));

        let alarm_engine = Arc::new(AlarmEngine::new(
            tenant_id.clone(),
            Arc::new(AlarmStore::new(config.alarms.max_memory_alarms)),
            sink,
            metrics.clone(),
            config.alarms.clone(),
        ));
        let alarms = Arc::new(DefaultAlarmService::new(tenant_id.clone(), alarm_engine));

        let flows = Arc::new(DefaultFlowService::new(
            tenant_id.clone(),
            Arc::new(FlowStore::new(config.flows.max_memory_flows)),
            metrics.clone(),
            config.flows.clone(),
        ));

        let sla = Arc::new(SlaEvaluator::new(
            tenant_id.clone(),
            sla_store,
            probe_store,
            metrics.clone(),
            config.sla.clone(),
        ));

        let scheduler = Mutex::new(ProbeScheduler::new(
            Arc::clone(&probes),
            metrics,
            config.scheduler.clone(),
        ));

        info!(tenant_id = %tenant_id, "Service assurance core initialized");
        Ok(Self {
            tenant_id,
            config,
            metrics_registry,
            probes,
            alarms,
            flows,
            sla,
            scheduler,
            scheduler_running: std::sync::atomic::AtomicBool::new(false),
        })
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn metrics_text(&self) -> String {
        self.metrics_registry.metrics_text()
    }

    // === Lifecycle ===

    pub async fn start_scheduler(&self) {
        self.scheduler.lock().await.start();
        self.scheduler_running
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    /// Stop scheduling and drain in-flight probe executions.
    pub async fn shutdown(&self) -> Result<()> {
        let result = self.scheduler.lock().await.stop().await;
        self.scheduler_running
            .store(false, std::sync::atomic::Ordering::SeqCst);
        result
    }

    // === Probes ===

    pub async fn create_probe(&self, request: CreateProbeRequest) -> Result<Probe> {
        self.probes.create_probe(request).await
    }

    pub async fn create_icmp_probe(
        &self,
        name: &str,
        target: &str,
        sla_policy_id: Option<Uuid>,
    ) -> Result<Probe> {
        let (interval, timeout) = self.probes.default_cadence();
        let mut request =
            CreateProbeRequest::new(name, ProbeType::Icmp, target).with_cadence(interval, timeout);
        request.sla_policy_id = sla_policy_id;
        self.probes.create_probe(request).await
    }

    pub async fn create_dns_probe(
        &self,
        name: &str,
        target: &str,
        dns_server: &str,
        record_type: &str,
    ) -> Result<Probe> {
        let (_, timeout) = self.probes.default_cadence();
        let request = CreateProbeRequest::new(name, ProbeType::Dns, target)
            .with_cadence(60, timeout)
            .with_parameters(ProbeParameters::dns(dns_server, record_type));
        self.probes.create_probe(request).await
    }

    pub async fn create_http_probe(
        &self,
        name: &str,
        target: &str,
        method: &str,
        expected_status: u16,
    ) -> Result<Probe> {
        let probe_type = if target.starts_with("https://") {
            ProbeType::Https
        } else {
            ProbeType::Http
        };
        let (_, timeout) = self.probes.default_cadence();
        let request = CreateProbeRequest::new(name, probe_type, target)
            .with_cadence(60, timeout)
            .with_parameters(ProbeParameters::http(method, expected_status));
        self.probes.create_probe(request).await
    }

    pub async fn create_tcp_probe(&self, name: &str, target: &str, port: u16) -> Result<Probe> {
        let target = if target.contains(':') {
            target.to_string()
        } else {
            format!("{}:{}", target, port)
        };
        let (interval, timeout) = self.probes.default_cadence();
        let request = CreateProbeRequest::new(name, ProbeType::Tcp, target)
            .with_cadence(interval, timeout)
            .with_parameters(ProbeParameters::tcp(port));
        self.probes.create_probe(request).await
    }

    pub async fn get_probe(&self, probe_id: Uuid) -> Result<Probe> {
        self.probes.get_probe(probe_id).await
    }

    pub async fn list_probes(&self, filter: ProbeFilter) -> Result<Vec<Probe>> {
        self.probes.list_probes(filter).await
    }

    pub async fn update_probe(&self, probe_id: Uuid, request: UpdateProbeRequest) -> Result<Probe> {
        self.probes.update_probe(probe_id, request).await
    }

    pub async fn delete_probe(&self, probe_id: Uuid) -> Result<()> {
        self.probes.delete_probe(probe_id).await
    }

    pub async fn execute_probe(&self, probe_id: Uuid) -> Result<ProbeResult> {
        self.probes.execute_probe(probe_id).await
    }

    pub async fn get_probe_statistics(
        &self,
        probe_id: Uuid,
        hours: i64,
    ) -> Result<ProbeStatistics> {
        self.probes.get_probe_statistics(probe_id, hours).await
    }

    // === SLA ===

    pub async fn create_sla_policy(&self, request: CreateSlaPolicyRequest) -> Result<SlaPolicy> {
        self.sla.create_policy(request).await
    }

    pub async fn check_sla_compliance(&self, probe_id: Uuid) -> Result<SlaCompliance> {
        self.sla.check_compliance(probe_id).await
    }

    pub async fn list_sla_violations(
        &self,
        hours: i64,
        probe_id: Option<Uuid>,
    ) -> Result<Vec<SlaViolation>> {
        self.sla.list_violations(hours, probe_id).await
    }

    pub fn sla_credits(&self, availability_percent: f64) -> SlaCredit {
        self.sla.credits_for(availability_percent)
    }

    /// Statistical alerting bounds from a historical series, at the
    /// configured confidence level.
    pub fn calculate_dynamic_thresholds(&self, historical: &[f64]) -> Result<DynamicThresholds> {
        dynamic_thresholds(historical, self.config.analytics.confidence_level)
    }

    // === Alarm rules ===

    pub async fn create_alarm_rule(&self, request: CreateAlarmRuleRequest) -> Result<AlarmRule> {
        self.alarms.create_alarm_rule(request).await
    }

    pub async fn list_alarm_rules(&self) -> Result<Vec<AlarmRule>> {
        self.alarms.list_alarm_rules().await
    }

    pub async fn update_alarm_rule(
        &self,
        rule_id: Uuid,
        request: UpdateAlarmRuleRequest,
    ) -> Result<AlarmRule> {
        self.alarms.update_alarm_rule(rule_id, request).await
    }

    pub async fn delete_alarm_rule(&self, rule_id: Uuid) -> Result<()> {
        self.alarms.delete_alarm_rule(rule_id).await
    }

    /// Rule matching one SNMP trap OID. Severity falls back to the
    /// configured default.
    pub async fn create_snmp_alarm_rule(
        &self,
        rule_name: &str,
        trap_oid: &str,
        severity: Option<AlarmSeverity>,
        description_template: Option<String>,
    ) -> Result<AlarmRule> {
        let mut criteria = BTreeMap::new();
        criteria.insert("trap_oid".to_string(), trap_oid.to_string());

        let request = CreateAlarmRuleRequest::new(
            rule_name,
            EventType::SnmpTrap,
            criteria,
            severity.unwrap_or_else(|| self.default_severity()),
        )
        .with_alarm_type(AlarmType::Equipment)
        .with_template(
            description_template.unwrap_or_else(|| format!("SNMP alarm: {}", rule_name)),
        );
        self.alarms.create_alarm_rule(request).await
    }

    /// Rule matching syslog message content by regular expression.
    pub async fn create_syslog_alarm_rule(
        &self,
        rule_name: &str,
        message_pattern: &str,
        severity: Option<AlarmSeverity>,
        description_template: Option<String>,
    ) -> Result<AlarmRule> {
        let mut criteria = BTreeMap::new();
        criteria.insert("message".to_string(), format!("~{}", message_pattern));

        let request = CreateAlarmRuleRequest::new(
            rule_name,
            EventType::Syslog,
            criteria,
            severity.unwrap_or_else(|| self.default_severity()),
        )
        .with_alarm_type(AlarmType::System)
        .with_template(
            description_template.unwrap_or_else(|| format!("Syslog alarm: {}", rule_name)),
        );
        self.alarms.create_alarm_rule(request).await
    }

    fn default_severity(&self) -> AlarmSeverity {
        AlarmSeverity::parse(&self.config.alarms.default_severity)
            .unwrap_or(AlarmSeverity::Warning)
    }

    // === Event ingest ===

    pub async fn process_snmp_trap(
        &self,
        source_device: &str,
        source_ip: &str,
        trap_oid: &str,
        varbinds: &HashMap<String, String>,
        raw_data: Option<String>,
    ) -> ProcessReport {
        self.alarms
            .process_snmp_trap(source_device, source_ip, trap_oid, varbinds, raw_data)
            .await
    }

    pub async fn process_syslog(
        &self,
        source_device: &str,
        source_ip: &str,
        message: &str,
        facility: u8,
        severity: u8,
        raw_data: Option<String>,
    ) -> ProcessReport {
        self.alarms
            .process_syslog(source_device, source_ip, message, facility, severity, raw_data)
            .await
    }

    // === Alarms ===

    pub async fn acknowledge_alarm(
        &self,
        alarm_id: Uuid,
        acknowledged_by: &str,
        comments: Option<String>,
    ) -> Result<Alarm> {
        self.alarms
            .acknowledge_alarm(alarm_id, acknowledged_by, comments)
            .await
    }

    pub async fn clear_alarm(
        &self,
        alarm_id: Uuid,
        cleared_by: &str,
        comments: Option<String>,
    ) -> Result<Alarm> {
        self.alarms.clear_alarm(alarm_id, cleared_by, comments).await
    }

    pub async fn suppress_alarms(
        &self,
        device_id: &str,
        alarm_type_pattern: &str,
        duration_minutes: i64,
        reason: Option<String>,
        suppressed_by: Option<String>,
    ) -> Result<AlarmSuppression> {
        self.alarms
            .suppress_alarms(
                device_id,
                alarm_type_pattern,
                duration_minutes,
                reason,
                suppressed_by,
            )
            .await
    }

    pub async fn list_active_alarms(&self, filter: AlarmFilter) -> Result<Vec<Alarm>> {
        self.alarms.list_active_alarms(filter).await
    }

    pub async fn get_alarm_statistics(
        &self,
        device_id: Option<&str>,
        hours: i64,
    ) -> Result<AlarmStatistics> {
        self.alarms.get_alarm_statistics(device_id, hours).await
    }

    // === Flows ===

    pub async fn create_flow_collector(
        &self,
        request: CreateFlowCollectorRequest,
    ) -> Result<FlowCollector> {
        self.flows.create_flow_collector(request).await
    }

    pub async fn create_netflow_collector(
        &self,
        name: &str,
        listen_port: u16,
        sampling_rate: u32,
    ) -> Result<FlowCollector> {
        self.flows
            .create_flow_collector(
                CreateFlowCollectorRequest::new(name, FlowType::Netflow, listen_port)
                    .with_version("9")
                    .with_sampling_rate(sampling_rate),
            )
            .await
    }

    pub async fn create_sflow_collector(
        &self,
        name: &str,
        listen_port: u16,
    ) -> Result<FlowCollector> {
        self.flows
            .create_flow_collector(
                CreateFlowCollectorRequest::new(name, FlowType::Sflow, listen_port)
                    .with_sampling_rate(1024),
            )
            .await
    }

    pub async fn list_collectors(
        &self,
        status: Option<CollectorStatus>,
    ) -> Result<Vec<FlowCollector>> {
        self.flows.list_collectors(status).await
    }

    pub async fn get_collector_statistics(&self, collector_id: Uuid) -> Result<FlowCollector> {
        self.flows.get_collector_statistics(collector_id).await
    }

    pub async fn ingest_flow_record(&self, request: IngestFlowRequest) -> Result<FlowRecord> {
        self.flows.ingest_flow_record(request).await
    }

    pub async fn aggregate_flows(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        group_by: &[GroupBy],
        collector_id: Option<Uuid>,
    ) -> Result<Vec<FlowAggregate>> {
        self.flows
            .aggregate_flows(start, end, group_by, collector_id)
            .await
    }

    pub async fn traffic_summary(
        &self,
        hours: i64,
        collector_id: Option<Uuid>,
    ) -> Result<TrafficSummary> {
        self.flows.traffic_summary(hours, collector_id).await
    }

    pub async fn top_talkers(
        &self,
        hours: i64,
        limit: usize,
        metric: TalkerMetric,
        collector_id: Option<Uuid>,
    ) -> Result<Vec<TopTalker>> {
        self.flows.top_talkers(hours, limit, metric, collector_id).await
    }

    pub async fn protocol_statistics(
        &self,
        hours: i64,
        collector_id: Option<Uuid>,
    ) -> Result<Vec<ProtocolStats>> {
        self.flows.protocol_statistics(hours, collector_id).await
    }

    pub async fn traffic_by_subnet(
        &self,
        mask: u8,
        hours: i64,
        collector_id: Option<Uuid>,
    ) -> Result<Vec<SubnetTraffic>> {
        self.flows.traffic_by_subnet(mask, hours, collector_id).await
    }

    pub async fn detect_traffic_anomalies(
        &self,
        baseline_hours: i64,
        detection_minutes: i64,
        threshold: f64,
    ) -> Result<AnomalyReport> {
        self.flows
            .detect_traffic_anomalies(baseline_hours, detection_minutes, threshold)
            .await
    }

    // === Composite views ===

    /// Unified probe/alarm/SLA/traffic view for dashboards.
    pub async fn service_health_dashboard(&self, hours: i64) -> Result<ServiceHealthDashboard> {
        let probes = self.probes.list_probes(ProbeFilter::default()).await?;

        let mut probe_details = Vec::new();
        let mut availability_sum = 0.0;
        for probe in &probes {
            let stats = self
                .probes
                .get_probe_statistics(probe.probe_id, hours)
                .await?;
            availability_sum += stats.availability.availability_percent;
            probe_details.push(ProbeHealth {
                probe_id: probe.probe_id,
                name: probe.name.clone(),
                probe_type: probe.probe_type,
                target: probe.target.clone(),
                availability_percent: stats.availability.availability_percent,
                avg_latency_ms: stats.latency_stats.average_ms,
                status: if stats.availability.availability_percent >= 95.0 {
                    "healthy"
                } else {
                    "degraded"
                },
            });
        }

        let total_probes = probe_details.len();
        let healthy_probes = probe_details.iter().filter(|p| p.status == "healthy").count();
        let health_score = if total_probes > 0 {
            100.0 * healthy_probes as f64 / total_probes as f64
        } else {
            100.0
        };

        let alarm_stats = self.alarms.get_alarm_statistics(None, hours).await?;
        let collectors = self.flows.list_collectors(None).await?;
        let traffic_analytics = if collectors.is_empty() {
            None
        } else {
            Some(self.flows.traffic_summary(hours, None).await?)
        };
        let violations = self.sla.list_violations(hours, None).await?;

        let avg_availability = if total_probes > 0 {
            availability_sum / total_probes as f64
        } else {
            100.0
        };
        probe_details.truncate(10);

        Ok(ServiceHealthDashboard {
            tenant_id: self.tenant_id.clone(),
            generated_at: Utc::now(),
            time_period_hours: hours,
            overall_health: OverallHealth {
                score: (health_score * 10.0).round() / 10.0,
                status: if health_score >= 95.0 {
                    "healthy"
                } else if health_score >= 80.0 {
                    "degraded"
                } else {
                    "critical"
                },
                total_probes,
                healthy_probes,
            },
            probes: ProbesBlock {
                total_probes,
                probe_details,
                avg_availability_percent: avg_availability,
            },
            alarms: AlarmsBlock {
                total_alarms: alarm_stats.total_alarms,
                active_alarms: alarm_stats.active_alarms,
                critical_alarms: alarm_stats
                    .severity_distribution
                    .get("critical")
                    .copied()
                    .unwrap_or(0),
                major_alarms: alarm_stats
                    .severity_distribution
                    .get("major")
                    .copied()
                    .unwrap_or(0),
            },
            sla: SlaBlock {
                total_violations: violations.len(),
                recent_violations: violations.into_iter().take(5).collect(),
            },
            traffic_analytics,
        })
    }

    /// Traffic-centric report with per-probe connectivity detail.
    pub async fn network_performance_report(&self, hours: i64) -> Result<NetworkPerformanceReport> {
        let summary = self.flows.traffic_summary(hours, None).await?;
        let top_talkers = self.flows.top_talkers(hours, 10, TalkerMetric::Bytes, None).await?;
        let protocol_breakdown: Vec<ProtocolStats> = self
            .flows
            .protocol_statistics(hours, None)
            .await?
            .into_iter()
            .take(10)
            .collect();
        let subnet_analysis: Vec<SubnetTraffic> = self
            .flows
            .traffic_by_subnet(24, hours, None)
            .await?
            .into_iter()
            .take(15)
            .collect();

        let probes = self.probes.list_probes(ProbeFilter::default()).await?;
        let mut connectivity = Vec::new();
        for probe in probes.iter().take(20) {
            let stats = self
                .probes
                .get_probe_statistics(probe.probe_id, hours)
                .await?;
            connectivity.push(ConnectivityStats {
                name: probe.name.clone(),
                target: probe.target.clone(),
                probe_type: probe.probe_type,
                availability_percent: stats.availability.availability_percent,
                avg_latency_ms: stats.latency_stats.average_ms,
                max_latency_ms: stats.latency_stats.max_ms,
                p95_latency_ms: stats.latency_stats.p95_ms,
            });
        }
        let avg_availability = if connectivity.is_empty() {
            0.0
        } else {
            connectivity.iter().map(|c| c.availability_percent).sum::<f64>()
                / connectivity.len() as f64
        };

        Ok(NetworkPerformanceReport {
            tenant_id: self.tenant_id.clone(),
            generated_at: Utc::now(),
            time_period_hours: hours,
            performance_insights: PerformanceInsights {
                busiest_hour_flows: summary.rates.flows_per_second * 3600.0,
                peak_bandwidth_bps: summary.rates.bits_per_second,
                protocol_diversity: protocol_breakdown.len(),
                network_segments: subnet_analysis.len(),
            },
            traffic_analysis: TrafficAnalysis {
                summary,
                top_talkers,
                protocol_breakdown,
                subnet_analysis,
            },
            connectivity_analysis: ConnectivityAnalysis {
                probe_count: connectivity.len(),
                avg_availability_percent: avg_availability,
                probe_details: connectivity,
            },
        })
    }

    /// Liveness/shape summary of the core and its engines.
    pub async fn health_check(&self) -> Result<HealthCheck> {
        let probes = self.probes.list_probes(ProbeFilter::default()).await?;
        let collectors = self.flows.list_collectors(None).await?;
        let alarm_stats = self.alarms.get_alarm_statistics(None, 1).await?;

        Ok(HealthCheck {
            tenant_id: self.tenant_id.clone(),
            timestamp: Utc::now(),
            scheduler_running: self
                .scheduler_running
                .load(std::sync::atomic::Ordering::SeqCst),
            total_probes: probes.len(),
            total_collectors: collectors.len(),
            recent_alarms: alarm_stats.total_alarms,
            overall_status: "healthy",
        })
    }
}

// === Composite view types ===

#[derive(Debug, Clone, Serialize)]
pub struct ProbeHealth {
    pub probe_id: Uuid,
    pub name: String,
    pub probe_type: ProbeType,
    pub target: String,
    pub availability_percent: f64,
    pub avg_latency_ms: f64,
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverallHealth {
    pub score: f64,
    pub status: &'static str,
    pub total_probes: usize,
    pub healthy_probes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbesBlock {
    pub total_probes: usize,
    pub probe_details: Vec<ProbeHealth>,
    pub avg_availability_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlarmsBlock {
    pub total_alarms: usize,
    pub active_alarms: usize,
    pub critical_alarms: usize,
    pub major_alarms: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlaBlock {
    pub total_violations: usize,
    pub recent_violations: Vec<SlaViolation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealthDashboard {
    pub tenant_id: TenantId,
    pub generated_at: DateTime<Utc>,
    pub time_period_hours: i64,
    pub overall_health: OverallHealth,
    pub probes: ProbesBlock,
    pub alarms: AlarmsBlock,
    pub sla: SlaBlock,
    pub traffic_analytics: Option<TrafficSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrafficAnalysis {
    pub summary: TrafficSummary,
    pub top_talkers: Vec<TopTalker>,
    pub protocol_breakdown: Vec<ProtocolStats>,
    pub subnet_analysis: Vec<SubnetTraffic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectivityStats {
    pub name: String,
    pub target: String,
    pub probe_type: ProbeType,
    pub availability_percent: f64,
    pub avg_latency_ms: f64,
    pub max_latency_ms: f64,
    pub p95_latency_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectivityAnalysis {
    pub probe_count: usize,
    pub avg_availability_percent: f64,
    pub probe_details: Vec<ConnectivityStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceInsights {
    pub busiest_hour_flows: f64,
    pub peak_bandwidth_bps: f64,
    pub protocol_diversity: usize,
    pub network_segments: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkPerformanceReport {
    pub tenant_id: TenantId,
    pub generated_at: DateTime<Utc>,
    pub time_period_hours: i64,
    pub traffic_analysis: TrafficAnalysis,
    pub connectivity_analysis: ConnectivityAnalysis,
    pub performance_insights: PerformanceInsights,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    pub tenant_id: TenantId,
    pub timestamp: DateTime<Utc>,
    pub scheduler_running: bool,
    pub total_probes: usize,
    pub total_collectors: usize,
    pub recent_alarms: usize,
    pub overall_status: &'static str,
}
