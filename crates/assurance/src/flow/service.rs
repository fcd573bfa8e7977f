use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use assurance_core::{EngineMetrics, FlowSettings, TenantId};

use crate::error::{AssuranceError, Result};
use crate::flow::aggregator::{
    self, AnomalyReport, FlowAggregate, GroupBy, ProtocolStats, SubnetTraffic, TalkerMetric,
    TopTalker, TrafficSummary,
};
use crate::flow::model::{
    CreateFlowCollectorRequest, FlowCollector, FlowRecord, IngestFlowRequest, RawCounters,
};
use crate::flow::store::FlowStore;
use crate::types::CollectorStatus;

/// Flow collector lifecycle, record ingest, and the analytics queries.
#[async_trait]
pub trait FlowService: Send + Sync {
    async fn create_flow_collector(
        &self,
        request: CreateFlowCollectorRequest,
    ) -> Result<FlowCollector>;
    async fn list_collectors(&self, status: Option<CollectorStatus>) -> Result<Vec<FlowCollector>>;
    async fn get_collector_statistics(&self, collector_id: Uuid) -> Result<FlowCollector>;

    /// Scale by the collector's sampling rate and append. Ingest does not
    /// fail on memory pressure; the oldest records are evicted instead.
    async fn ingest_flow_record(&self, request: IngestFlowRequest) -> Result<FlowRecord>;

    async fn aggregate_flows(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        group_by: &[GroupBy],
        collector_id: Option<Uuid>,
    ) -> Result<Vec<FlowAggregate>>;
    async fn traffic_summary(&self, hours: i64, collector_id: Option<Uuid>)
        -> Result<TrafficSummary>;
    async fn top_talkers(
        &self,
        hours: i64,
        limit: usize,
        metric: TalkerMetric,
        collector_id: Option<Uuid>,
    ) -> Result<Vec<TopTalker>>;
    async fn protocol_statistics(
        &self,
        hours: i64,
        collector_id: Option<Uuid>,
    ) -> Result<Vec<ProtocolStats>>;
    async fn traffic_by_subnet(
        &self,
        mask: u8,
        hours: i64,
        collector_id: Option<Uuid>,
    ) -> Result<Vec<SubnetTraffic>>;
    async fn detect_traffic_anomalies(
        &self,
        baseline_hours: i64,
        detection_minutes: i64,
        threshold: f64,
    ) -> Result<AnomalyReport>;
}

pub struct DefaultFlowService {
    tenant_id: TenantId,
    store: Arc<FlowStore>,
    metrics: EngineMetrics,
    settings: FlowSettings,
}

impl DefaultFlowService {
    pub fn new(
        tenant_id: TenantId,
        store: Arc<FlowStore>,
        metrics: EngineMetrics,
        settings: FlowSettings,
    ) -> Self {
        Self {
            tenant_id,
            store,
            metrics,
            settings,
        }
    }

    pub fn store(&self) -> Arc<FlowStore> {
        Arc::clone(&self.store)
    }

    fn window(&self, hours: i64, collector_id: Option<Uuid>) -> Vec<FlowRecord> {
        self.store
            .flows_since(Utc::now() - Duration::hours(hours.max(1)), collector_id)
    }
}

#[async_trait]
impl FlowService for DefaultFlowService {
    async fn create_flow_collector(
        &self,
        request: CreateFlowCollectorRequest,
    ) -> Result<FlowCollector> {
        request
            .validate()
            .map_err(|e| AssuranceError::validation("request", e.to_string()))?;
        if self.store.collector_name_taken(&request.name) {
            return Err(AssuranceError::Duplicate {
                entity: "flow collector",
                name: request.name,
            });
        }

        let now = Utc::now();
        let collector = FlowCollector {
            collector_id: Uuid::new_v4(),
            tenant_id: self.tenant_id.clone(),
            name: request.name,
            description: request.description,
            flow_type: request.flow_type,
            listen_port: request.listen_port,
            listen_address: request.listen_address,
            version: request.version,
            sampling_rate: request.sampling_rate.max(1),
            active_timeout_s: request.active_timeout_s,
            inactive_timeout_s: request.inactive_timeout_s,
            status: CollectorStatus::Active,
            flows_received: 0,
            bytes_received: 0,
            last_flow: None,
            created_at: now,
            updated_at: now,
        };

        info!(collector_id = %collector.collector_id, name = %collector.name,
              flow_type = ?collector.flow_type, "Flow collector created");
        self.store.insert_collector(collector.clone());
        Ok(collector)
    }

    async fn list_collectors(&self, status: Option<CollectorStatus>) -> Result<Vec<FlowCollector>> {
        Ok(self.store.list_collectors(status))
    }

    async fn get_collector_statistics(&self, collector_id: Uuid) -> Result<FlowCollector> {
        self.store.get_collector(collector_id)
    }

    async fn ingest_flow_record(&self, request: IngestFlowRequest) -> Result<FlowRecord> {
        let collector = self.store.get_collector(request.collector_id)?;
        let rate = u64::from(collector.sampling_rate.max(1));
        let now = Utc::now();

        let record = FlowRecord {
            flow_id: Uuid::new_v4(),
            collector_id: request.collector_id,
            exporter_ip: request.exporter_ip,
            src_addr: request.src_addr,
            dst_addr: request.dst_addr,
            src_port: request.src_port,
            dst_port: request.dst_port,
            protocol: request.protocol,
            tos: request.tos,
            tcp_flags: request.tcp_flags,
            packets: request.packets.saturating_mul(rate),
            bytes: request.bytes.saturating_mul(rate),
            raw: RawCounters {
                packets: request.packets,
                bytes: request.bytes,
            },
            flow_start: request.flow_start,
            flow_end: request.flow_end,
            ingested_at: now,
            input_snmp: request.input_snmp,
            output_snmp: request.output_snmp,
            next_hop: request.next_hop,
            src_as: request.src_as,
            dst_as: request.dst_as,
            src_mask: request.src_mask,
            dst_mask: request.dst_mask,
        };

        self.store
            .record_receipt(request.collector_id, record.bytes, now)?;
        let evicted = self.store.append(record.clone());
        self.metrics.flows_ingested.inc();
        if evicted > 0 {
            self.metrics.flows_dropped.inc_by(evicted as u64);
        }

        Ok(record)
    }

    async fn aggregate_flows(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        group_by: &[GroupBy],
        collector_id: Option<Uuid>,
    ) -> Result<Vec<FlowAggregate>> {
        let end = end.unwrap_or_else(Utc::now);
        let start = start.unwrap_or(end - Duration::hours(1));
        if start > end {
            return Err(AssuranceError::validation(
                "start",
                "start must not be after end",
            ));
        }

        let group_by = if group_by.is_empty() {
            &[GroupBy::SrcAddr][..]
        } else {
            group_by
        };

        let flows = self.store.flows_between(start, end, collector_id);
        Ok(aggregator::aggregate_flows(
            &flows,
            group_by,
            self.settings.aggregation_window_minutes,
        ))
    }

    async fn traffic_summary(
        &self,
        hours: i64,
        collector_id: Option<Uuid>,
    ) -> Result<TrafficSummary> {
        let flows = self.window(hours, collector_id);
        Ok(aggregator::traffic_summary(&flows, hours))
    }

    async fn top_talkers(
        &self,
        hours: i64,
        limit: usize,
        metric: TalkerMetric,
        collector_id: Option<Uuid>,
    ) -> Result<Vec<TopTalker>> {
        let flows = self.window(hours, collector_id);
        Ok(aggregator::top_talkers(&flows, limit, metric))
    }

    async fn protocol_statistics(
        &self,
        hours: i64,
        collector_id: Option<Uuid>,
    ) -> Result<Vec<ProtocolStats>> {
        let flows = self.window(hours, collector_id);
        Ok(aggregator::protocol_statistics(&flows))
    }

    async fn traffic_by_subnet(
        &self,
        mask: u8,
        hours: i64,
        collector_id: Option<Uuid>,
    ) -> Result<Vec<SubnetTraffic>> {
        if mask > 32 {
            return Err(AssuranceError::validation(
                "mask",
                "subnet mask must be between 0 and 32",
            ));
        }
        let flows = self.window(hours, collector_id);
        Ok(aggregator::traffic_by_subnet(&flows, mask))
    }

    async fn detect_traffic_anomalies(
        &self,
        baseline_hours: i64,
        detection_minutes: i64,
        threshold: f64,
    ) -> Result<AnomalyReport> {
        if threshold <= 0.0 {
            return Err(AssuranceError::validation(
                "threshold",
                "anomaly threshold must be positive",
            ));
        }
        let flows = self.window(baseline_hours, None);
        Ok(aggregator::detect_anomalies(
            &flows,
            Utc::now(),
            baseline_hours,
            detection_minutes,
            threshold,
            self.settings.aggregation_window_minutes,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FlowType;

    fn service() -> DefaultFlowService {
        DefaultFlowService::new(
            TenantId::new("t1"),
            Arc::new(FlowStore::new(10_000)),
            EngineMetrics::unregistered(),
            FlowSettings::default(),
        )
    }

    async fn collector_with_rate(service: &DefaultFlowService, rate: u32) -> FlowCollector {
        service
            .create_flow_collector(
                CreateFlowCollectorRequest::new("edge", FlowType::Netflow, 2055)
                    .with_sampling_rate(rate),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn ingest_scales_by_sampling_rate_and_keeps_raw() {
        let service = service();
        let collector = collector_with_rate(&service, 10).await;

        let record = service
            .ingest_flow_record(IngestFlowRequest::new(
                collector.collector_id,
                "10.0.0.1",
                "10.1.0.1",
                6,
                5,
                100,
            ))
            .await
            .unwrap();

        assert_eq!(record.bytes, 1000);
        assert_eq!(record.packets, 50);
        assert_eq!(record.raw, RawCounters { packets: 5, bytes: 100 });

        let stats = service
            .get_collector_statistics(collector.collector_id)
            .await
            .unwrap();
        assert_eq!(stats.flows_received, 1);
        assert_eq!(stats.bytes_received, 1000);
    }

    #[tokio::test]
    async fn ingest_rejects_unknown_collector() {
        let service = service();
        let err = service
            .ingest_flow_record(IngestFlowRequest::new(
                Uuid::new_v4(),
                "10.0.0.1",
                "10.1.0.1",
                6,
                1,
                100,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, AssuranceError::CollectorNotFound { .. }));
    }

    #[tokio::test]
    async fn top_talkers_scenario_with_sampling() {
        let service = service();
        let collector = collector_with_rate(&service, 10).await;
        let id = collector.collector_id;

        for (src, bytes) in [
            ("10.0.0.65", 100),
            ("10.0.0.66", 50),
            ("10.0.0.65", 100),
            ("10.0.0.67", 30),
            ("10.0.0.65", 100),
        ] {
            service
                .ingest_flow_record(IngestFlowRequest::new(id, src, "10.1.0.1", 6, 1, bytes))
                .await
                .unwrap();
        }

        let talkers = service
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
    }

    #[tokio::test]
    async fn aggregate_rejects_inverted_range() {
        let service = service();
        let now = Utc::now();
        let err = service
            .aggregate_flows(Some(now), Some(now - Duration::hours(1)), &[], None)
            .await
            .unwrap_err();
        assert!(matches!(err, AssuranceError::Validation { .. }));
    }

    #[tokio::test]
    async fn anomalies_insufficient_without_history() {
        let service = service();
        let collector = collector_with_rate(&service, 1).await;
        for _ in 0..3 {
            service
                .ingest_flow_record(IngestFlowRequest::new(
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

        let report = service.detect_traffic_anomalies(24, 45, 2.0).await.unwrap();
        assert!(report.baseline_insufficient);
        assert!(!report.anomalies_detected);
        assert!(report.anomalies.is_empty());
    }
}
