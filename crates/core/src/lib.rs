pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;
pub mod types;

pub use config::{
    AlarmSettings, AnalyticsSettings, AssuranceConfig, FlowSettings, ProbeSettings,
    SchedulerSettings, SlaSettings,
};
pub use error::{Error, ErrorCode, Result};
pub use metrics::{EngineMetrics, MetricsRegistry};
pub use types::{TenantContext, TenantId};

// Re-export commonly used types from dependencies
pub use chrono::{DateTime, Utc};
pub use uuid::Uuid;
