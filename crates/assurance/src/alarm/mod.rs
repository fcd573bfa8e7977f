//! Event correlation: rules, deduplicated alarms, suppression, and the
//! notification seam.

pub mod engine;
pub mod model;
pub mod notify;
pub mod service;
pub mod store;

pub use engine::{AlarmEngine, AlarmOutcome, ProcessReport};
pub use model::{
    pattern_matches, Alarm, AlarmFilter, AlarmRule, AlarmStatistics, AlarmSuppression,
    CreateAlarmRuleRequest, UpdateAlarmRuleRequest,
};
pub use notify::{
    AlarmNotification, MemoryNotificationSink, NotificationSink, TracingNotificationSink,
};
pub use service::{AlarmService, DefaultAlarmService};
pub use store::AlarmStore;
