// Service assurance engines: active probing, event correlation, flow
// analytics, and SLA evaluation behind a single per-tenant surface.

pub mod alarm;
pub mod error;
pub mod event;
pub mod flow;
pub mod metrics;
pub mod probe;
pub mod registry;
pub mod sla;
pub mod types;

// Re-exports for easy access
pub use alarm::{
    Alarm, AlarmEngine, AlarmFilter, AlarmNotification, AlarmRule, AlarmService, AlarmStatistics,
    AlarmSuppression, CreateAlarmRuleRequest, DefaultAlarmService, MemoryNotificationSink,
    NotificationSink, TracingNotificationSink, UpdateAlarmRuleRequest,
};
pub use error::{AssuranceError, Result};
pub use event::{EventNormalizer, NormalizedEvent, SnmpTrapParser, SyslogParser};
pub use flow::{
    AnomalyReport, CreateFlowCollectorRequest, DefaultFlowService, FlowCollector, FlowRecord,
    FlowService, GroupBy, IngestFlowRequest, TalkerMetric, TopTalker, TrafficSummary,
};
pub use probe::{
    CreateProbeRequest, DefaultProbeService, NetworkProbeExecutor, Probe, ProbeExecutor,
    ProbeFilter, ProbeParameters, ProbeResult, ProbeScheduler, ProbeService, ProbeStatistics,
    SimulatedProbeExecutor, UpdateProbeRequest,
};
pub use registry::{
    HealthCheck, NetworkPerformanceReport, ServiceAssurance, ServiceHealthDashboard,
};
pub use sla::{
    CreateSlaPolicyRequest, SlaCompliance, SlaEvaluator, SlaPolicy, SlaViolation,
};
pub use types::*;
