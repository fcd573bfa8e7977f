use async_trait::async_trait;
use serde::Serialize;
use std::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::alarm::model::Alarm;

/// Lifecycle events delivered to the notification sink.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlarmNotification {
    Raised { alarm: Alarm },
    Cleared { alarm_id: Uuid, cleared_by: String },
    /// Emitted once per alarm when a suppression covering it expires.
    Deferred { alarm: Alarm },
}

/// Fire-and-forget delivery seam. Implementations must not fail into the
/// alarm engine; drop or queue internally instead.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: AlarmNotification);
}

/// Default sink: structured log lines only.
#[derive(Debug, Default)]
pub struct TracingNotificationSink;

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn deliver(&self, notification: AlarmNotification) {
        match &notification {
            AlarmNotification::Raised { alarm } => info!(
                alarm_id = %alarm.alarm_id,
                severity = alarm.severity.as_str(),
                device = alarm.device_id.as_deref().unwrap_or("-"),
                "Alarm raised"
            ),
            AlarmNotification::Cleared { alarm_id, cleared_by } => info!(
                alarm_id = %alarm_id,
                cleared_by = %cleared_by,
                "Alarm cleared"
            ),
            AlarmNotification::Deferred { alarm } => info!(
                alarm_id = %alarm.alarm_id,
                "Deferred alarm notification after suppression expiry"
            ),
        }
    }
}

/// Sink that records every delivery; used by tests asserting on
/// notification behavior.
#[derive(Debug, Default)]
pub struct MemoryNotificationSink {
    deliveries: Mutex<Vec<AlarmNotification>>,
}

impl MemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<AlarmNotification> {
        self.deliveries.lock().map(|d| d.clone()).unwrap_or_default()
    }

    pub fn raised_count(&self) -> usize {
        self.deliveries()
            .iter()
            .filter(|n| matches!(n, AlarmNotification::Raised { .. }))
            .count()
    }

    pub fn deferred_count(&self) -> usize {
        self.deliveries()
            .iter()
            .filter(|n| matches!(n, AlarmNotification::Deferred { .. }))
            .count()
    }
}

#[async_trait]
impl NotificationSink for MemoryNotificationSink {
    async fn deliver(&self, notification: AlarmNotification) {
        if let Ok(mut deliveries) = self.deliveries.lock() {
            deliveries.push(notification);
        }
    }
}
