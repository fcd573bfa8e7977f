//! Flow analytics: collector configuration, record ingest, windowed
//! aggregation, and statistical anomaly detection.

pub mod aggregator;
pub mod model;
pub mod service;
pub mod store;

pub use aggregator::{
    Anomaly, AnomalyReport, BaselineStats, FlowAggregate, FlowSizeStats, GroupBy, PortStats,
    ProtocolStats, SubnetTraffic, TalkerMetric, TopTalker, TrafficRates, TrafficSummary,
    WindowStats,
};
pub use model::{
    protocol_name, CreateFlowCollectorRequest, FlowCollector, FlowRecord, IngestFlowRequest,
    RawCounters,
};
pub use service::{DefaultFlowService, FlowService};
pub use store::FlowStore;
