use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::Ipv4Addr;

use crate::error::{AssuranceError, Result};
use crate::flow::model::{protocol_name, FlowRecord};
use crate::metrics::performance::{mean, round2, round3, std_dev, window_start};
use crate::metrics::remove_outliers_iqr;

/// Dimensions flows can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    SrcAddr,
    DstAddr,
    SrcPort,
    DstPort,
    Protocol,
    ExporterIp,
    CollectorId,
}

impl GroupBy {
    pub fn parse(s: &str) -> Result<GroupBy> {
        match s {
            "src_addr" => Ok(GroupBy::SrcAddr),
            "dst_addr" => Ok(GroupBy::DstAddr),
            "src_port" => Ok(GroupBy::SrcPort),
            "dst_port" => Ok(GroupBy::DstPort),
            "protocol" => Ok(GroupBy::Protocol),
            "exporter_ip" => Ok(GroupBy::ExporterIp),
            "collector_id" => Ok(GroupBy::CollectorId),
            other => Err(AssuranceError::validation(
                "group_by",
                format!("unknown dimension: {}", other),
            )),
        }
    }

    pub fn field_name(self) -> &'static str {
        match self {
            GroupBy::SrcAddr => "src_addr",
            GroupBy::DstAddr => "dst_addr",
            GroupBy::SrcPort => "src_port",
            GroupBy::DstPort => "dst_port",
            GroupBy::Protocol => "protocol",
            GroupBy::ExporterIp => "exporter_ip",
            GroupBy::CollectorId => "collector_id",
        }
    }

    fn key_of(self, flow: &FlowRecord) -> String {
        match self {
            GroupBy::SrcAddr => flow.src_addr.clone(),
            GroupBy::DstAddr => flow.dst_addr.clone(),
            GroupBy::SrcPort => flow.src_port.to_string(),
            GroupBy::DstPort => flow.dst_port.to_string(),
            GroupBy::Protocol => flow.protocol.to_string(),
            GroupBy::ExporterIp => flow.exporter_ip.clone(),
            GroupBy::CollectorId => flow.collector_id.to_string(),
        }
    }
}

/// Ranking metric for top talkers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TalkerMetric {
    Bytes,
    Packets,
    Flows,
}

impl TalkerMetric {
    pub fn parse(s: &str) -> Result<TalkerMetric> {
        match s {
            "bytes" => Ok(TalkerMetric::Bytes),
            "packets" => Ok(TalkerMetric::Packets),
            "flows" => Ok(TalkerMetric::Flows),
            other => Err(AssuranceError::validation(
                "metric",
                format!("unknown talker metric: {}", other),
            )),
        }
    }
}

/// Per-window totals used by time series and anomaly baselines.
#[derive(Debug, Clone, Serialize)]
pub struct WindowStats {
    pub window_start: DateTime<Utc>,
    pub total_flows: u64,
    pub total_bytes: u64,
    pub total_packets: u64,
    pub unique_sources: usize,
    pub unique_destinations: usize,
}

/// One group's rollup from `aggregate_flows`.
#[derive(Debug, Clone, Serialize)]
pub struct FlowAggregate {
    pub group: BTreeMap<&'static str, String>,
    pub flows: u64,
    pub bytes: u64,
    pub packets: u64,
    pub unique_sources: usize,
    pub unique_destinations: usize,
    pub series: Vec<WindowStats>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TopTalker {
    pub rank: usize,
    pub src_addr: String,
    pub bytes: u64,
    pub packets: u64,
    pub flows: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubnetTraffic {
    pub subnet: String,
    pub flows: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub packets_sent: u64,
    pub packets_received: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProtocolStats {
    pub protocol: u8,
    pub name: String,
    pub flows: u64,
    pub bytes: u64,
    pub packets: u64,
    pub bytes_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortStats {
    pub port: u16,
    pub flows: u64,
    pub bytes: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FlowSizeStats {
    pub count: usize,
    pub average_bytes: f64,
    pub median_bytes: f64,
    pub min_bytes: u64,
    pub max_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrafficRates {
    pub flows_per_second: f64,
    pub bits_per_second: f64,
    pub packets_per_second: f64,
    pub mbps: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrafficSummary {
    pub hours: i64,
    pub total_flows: u64,
    pub total_bytes: u64,
    pub total_packets: u64,
    pub rates: TrafficRates,
    pub protocol_distribution: Vec<ProtocolStats>,
    pub top_ports: Vec<PortStats>,
    pub top_talkers: Vec<TopTalker>,
    pub flow_size_stats: FlowSizeStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct Anomaly {
    pub kind: &'static str,
    pub metric: &'static str,
    pub timestamp: DateTime<Utc>,
    pub value: u64,
    pub baseline_mean: f64,
    pub z_score: f64,
    pub severity: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct BaselineStats {
    pub window_count: usize,
    pub bytes_mean: f64,
    pub bytes_stdev: f64,
    pub flows_mean: f64,
    pub flows_stdev: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnomalyReport {
    pub anomalies_detected: bool,
    pub anomalies: Vec<Anomaly>,
    pub baseline_insufficient: bool,
    pub baseline_stats: Option<BaselineStats>,
    pub baseline_window_hours: i64,
    pub detection_window_minutes: i64,
    pub anomaly_threshold: f64,
}

/// Bucket flows into time windows, oldest first.
pub fn group_by_windows(flows: &[FlowRecord], window_minutes: i64) -> Vec<WindowStats> {
    struct Acc {
        flows: u64,
        bytes: u64,
        packets: u64,
        sources: HashSet<String>,
        destinations: HashSet<String>,
    }

    let mut windows: BTreeMap<DateTime<Utc>, Acc> = BTreeMap::new();
    for flow in flows {
        let bucket = window_start(flow.ingested_at, window_minutes);
        let acc = windows.entry(bucket).or_insert_with(|| Acc {
            flows: 0,
            bytes: 0,
            packets: 0,
            sources: HashSet::new(),
            destinations: HashSet::new(),
        });
        acc.flows += 1;
        acc.bytes += flow.bytes;
        acc.packets += flow.packets;
        acc.sources.insert(flow.src_addr.clone());
        acc.destinations.insert(flow.dst_addr.clone());
    }

    windows
        .into_iter()
        .map(|(window_start, acc)| WindowStats {
            window_start,
            total_flows: acc.flows,
            total_bytes: acc.bytes,
            total_packets: acc.packets,
            unique_sources: acc.sources.len(),
            unique_destinations: acc.destinations.len(),
        })
        .collect()
}

/// Roll flows up along the requested dimensions, with a per-group time
/// series at the given window width. Largest groups by bytes first.
pub fn aggregate_flows(
    flows: &[FlowRecord],
    group_by: &[GroupBy],
    window_minutes: i64,
) -> Vec<FlowAggregate> {
    let mut groups: HashMap<Vec<String>, Vec<&FlowRecord>> = HashMap::new();
    for flow in flows {
        let key: Vec<String> = group_by.iter().map(|g| g.key_of(flow)).collect();
        groups.entry(key).or_default().push(flow);
    }

    let mut aggregates: Vec<FlowAggregate> = groups
        .into_iter()
        .map(|(key, members)| {
            let group: BTreeMap<&'static str, String> = group_by
                .iter()
                .zip(key)
                .map(|(g, v)| (g.field_name(), v))
                .collect();
            let owned: Vec<FlowRecord> = members.iter().map(|f| (*f).clone()).collect();
            let sources: HashSet<&str> = members.iter().map(|f| f.src_addr.as_str()).collect();
            let destinations: HashSet<&str> =
                members.iter().map(|f| f.dst_addr.as_str()).collect();

            FlowAggregate {
                group,
                flows: members.len() as u64,
                bytes: members.iter().map(|f| f.bytes).sum(),
                packets: members.iter().map(|f| f.packets).sum(),
                unique_sources: sources.len(),
                unique_destinations: destinations.len(),
                series: group_by_windows(&owned, window_minutes),
            }
        })
        .collect();

    aggregates.sort_by(|a, b| b.bytes.cmp(&a.bytes));
    aggregates
}

/// Rank source addresses by the chosen metric, rank 1 first.
pub fn top_talkers(flows: &[FlowRecord], limit: usize, metric: TalkerMetric) -> Vec<TopTalker> {
    let mut talkers: HashMap<String, (u64, u64, u64)> = HashMap::new();
    for flow in flows {
        let entry = talkers.entry(flow.src_addr.clone()).or_default();
        entry.0 += flow.bytes;
        entry.1 += flow.packets;
        entry.2 += 1;
    }

    let mut ranked: Vec<TopTalker> = talkers
        .into_iter()
        .map(|(src_addr, (bytes, packets, flows))| TopTalker {
            rank: 0,
            src_addr,
            bytes,
            packets,
            flows,
        })
        .collect();

    ranked.sort_by(|a, b| {
        let ka = match metric {
            TalkerMetric::Bytes => a.bytes,
            TalkerMetric::Packets => a.packets,
            TalkerMetric::Flows => a.flows,
        };
        let kb = match metric {
            TalkerMetric::Bytes => b.bytes,
            TalkerMetric::Packets => b.packets,
            TalkerMetric::Flows => b.flows,
        };
        kb.cmp(&ka).then_with(|| a.src_addr.cmp(&b.src_addr))
    });

    ranked.truncate(limit);
    for (index, talker) in ranked.iter_mut().enumerate() {
        talker.rank = index + 1;
    }
    ranked
}

/// Reduce addresses to their /mask prefix and aggregate over the prefix
/// space. A flow counts as sent for its source subnet and received for
/// its destination subnet. Non-IPv4 addresses group under "other".
pub fn traffic_by_subnet(flows: &[FlowRecord], mask: u8) -> Vec<SubnetTraffic> {
    #[derive(Default)]
    struct Acc {
        flows: u64,
        bytes_sent: u64,
        bytes_received: u64,
        packets_sent: u64,
        packets_received: u64,
    }

    let mut subnets: HashMap<String, Acc> = HashMap::new();
    for flow in flows {
        let src_subnet = subnet_of(&flow.src_addr, mask);
        let entry = subnets.entry(src_subnet).or_default();
        entry.flows += 1;
        entry.bytes_sent += flow.bytes;
        entry.packets_sent += flow.packets;

        let dst_subnet = subnet_of(&flow.dst_addr, mask);
        let entry = subnets.entry(dst_subnet).or_default();
        entry.bytes_received += flow.bytes;
        entry.packets_received += flow.packets;
    }

    let mut rollup: Vec<SubnetTraffic> = subnets
        .into_iter()
        .map(|(subnet, acc)| SubnetTraffic {
            subnet,
            flows: acc.flows,
            bytes_sent: acc.bytes_sent,
            bytes_received: acc.bytes_received,
            packets_sent: acc.packets_sent,
            packets_received: acc.packets_received,
        })
        .collect();
    rollup.sort_by(|a, b| {
        (b.bytes_sent + b.bytes_received)
            .cmp(&(a.bytes_sent + a.bytes_received))
            .then_with(|| a.subnet.cmp(&b.subnet))
    });
    rollup
}

fn subnet_of(addr: &str, mask: u8) -> String {
    let mask = mask.min(32);
    match addr.parse::<Ipv4Addr>() {
        Ok(ip) => {
            let bits = u32::from(ip);
            let prefix = if mask == 0 { 0 } else { bits & (u32::MAX << (32 - mask)) };
            format!("{}/{}", Ipv4Addr::from(prefix), mask)
        }
        Err(_) => "other".to_string(),
    }
}

/// Per-protocol totals with display names, largest by bytes first.
pub fn protocol_statistics(flows: &[FlowRecord]) -> Vec<ProtocolStats> {
    let mut protocols: HashMap<u8, (u64, u64, u64)> = HashMap::new();
    for flow in flows {
        let entry = protocols.entry(flow.protocol).or_default();
        entry.0 += 1;
        entry.1 += flow.bytes;
        entry.2 += flow.packets;
    }

    let total_bytes: u64 = protocols.values().map(|(_, b, _)| *b).sum();
    let mut stats: Vec<ProtocolStats> = protocols
        .into_iter()
        .map(|(protocol, (flows, bytes, packets))| ProtocolStats {
            protocol,
            name: protocol_name(protocol),
            flows,
            bytes,
            packets,
            bytes_percent: if total_bytes > 0 {
                round2(100.0 * bytes as f64 / total_bytes as f64)
            } else {
                0.0
            },
        })
        .collect();
    stats.sort_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.protocol.cmp(&b.protocol)));
    stats
}

/// Whole-window traffic picture: totals, rates, and top-10 breakdowns.
pub fn traffic_summary(flows: &[FlowRecord], hours: i64) -> TrafficSummary {
    let total_bytes: u64 = flows.iter().map(|f| f.bytes).sum();
    let total_packets: u64 = flows.iter().map(|f| f.packets).sum();
    let window_seconds = (hours.max(1) * 3600) as f64;

    let mut ports: HashMap<u16, (u64, u64)> = HashMap::new();
    for flow in flows {
        if flow.dst_port > 0 {
            let entry = ports.entry(flow.dst_port).or_default();
            entry.0 += 1;
            entry.1 += flow.bytes;
        }
    }
    let mut top_ports: Vec<PortStats> = ports
        .into_iter()
        .map(|(port, (flows, bytes))| PortStats { port, flows, bytes })
        .collect();
    top_ports.sort_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.port.cmp(&b.port)));
    top_ports.truncate(10);

    let bits_per_second = total_bytes as f64 * 8.0 / window_seconds;

    TrafficSummary {
        hours,
        total_flows: flows.len() as u64,
        total_bytes,
        total_packets,
        rates: TrafficRates {
            flows_per_second: round2(flows.len() as f64 / window_seconds),
            bits_per_second: round2(bits_per_second),
            packets_per_second: round2(total_packets as f64 / window_seconds),
            mbps: round3(bits_per_second / 1_000_000.0),
        },
        protocol_distribution: protocol_statistics(flows).into_iter().take(10).collect(),
        top_ports,
        top_talkers: top_talkers(flows, 10, TalkerMetric::Bytes),
        flow_size_stats: flow_size_stats(flows),
    }
}

fn flow_size_stats(flows: &[FlowRecord]) -> FlowSizeStats {
    let mut sizes: Vec<u64> = flows.iter().map(|f| f.bytes).filter(|b| *b > 0).collect();
    if sizes.is_empty() {
        return FlowSizeStats::default();
    }
    sizes.sort_unstable();

    let as_f64: Vec<f64> = sizes.iter().map(|b| *b as f64).collect();
    let n = sizes.len();
    let median = if n % 2 == 1 {
        as_f64[n / 2]
    } else {
        (as_f64[n / 2 - 1] + as_f64[n / 2]) / 2.0
    };

    FlowSizeStats {
        count: n,
        average_bytes: round2(mean(&as_f64)),
        median_bytes: round2(median),
        min_bytes: sizes[0],
        max_bytes: sizes[n - 1],
    }
}

/// Statistical anomaly detection over windowed traffic totals.
///
/// Baseline windows are IQR-cleaned before the mean/stdev are computed;
/// fewer than 10 cleaned windows is an insufficient baseline. A window in
/// the detection span is anomalous when `|value - mean| / stdev` exceeds
/// the threshold; past 3.0 the severity is high.
pub fn detect_anomalies(
    flows: &[FlowRecord],
    now: DateTime<Utc>,
    baseline_window_hours: i64,
    detection_window_minutes: i64,
    anomaly_threshold: f64,
    bucket_minutes: i64,
) -> AnomalyReport {
    let insufficient = |baseline_stats: Option<BaselineStats>| AnomalyReport {
        anomalies_detected: false,
        anomalies: Vec::new(),
        baseline_insufficient: true,
        baseline_stats,
        baseline_window_hours,
        detection_window_minutes,
        anomaly_threshold,
    };

    let baseline_cutoff = now - Duration::hours(baseline_window_hours);
    let baseline_flows: Vec<FlowRecord> = flows
        .iter()
        .filter(|f| f.ingested_at >= baseline_cutoff)
        .cloned()
        .collect();

    let windows = group_by_windows(&baseline_flows, bucket_minutes);
    if windows.len() < 10 {
        return insufficient(None);
    }

    let bytes_values: Vec<f64> = windows.iter().map(|w| w.total_bytes as f64).collect();
    let flows_values: Vec<f64> = windows.iter().map(|w| w.total_flows as f64).collect();
    let bytes_clean = remove_outliers_iqr(&bytes_values);
    let flows_clean = remove_outliers_iqr(&flows_values);
    if bytes_clean.len() < 10 || flows_clean.len() < 10 {
        return insufficient(None);
    }

    let bytes_mean = mean(&bytes_clean);
    let bytes_stdev = std_dev(&bytes_clean);
    let flows_mean = mean(&flows_clean);
    let flows_stdev = std_dev(&flows_clean);

    let detection_cutoff = now - Duration::minutes(detection_window_minutes);
    let recent: Vec<&WindowStats> = windows
        .iter()
        .filter(|w| w.window_start >= detection_cutoff)
        .collect();

    let mut anomalies = Vec::new();
    for window in recent {
        if bytes_stdev > 0.0 {
            let z = (window.total_bytes as f64 - bytes_mean).abs() / bytes_stdev;
            if z > anomaly_threshold {
                anomalies.push(Anomaly {
                    kind: "traffic_volume",
                    metric: "bytes",
                    timestamp: window.window_start,
                    value: window.total_bytes,
                    baseline_mean: round2(bytes_mean),
                    z_score: round2(z),
                    severity: if z > 3.0 { "high" } else { "medium" },
                });
            }
        }
        if flows_stdev > 0.0 {
            let z = (window.total_flows as f64 - flows_mean).abs() / flows_stdev;
            if z > anomaly_threshold {
                anomalies.push(Anomaly {
                    kind: "flow_count",
                    metric: "flows",
                    timestamp: window.window_start,
                    value: window.total_flows,
                    baseline_mean: round2(flows_mean),
                    z_score: round2(z),
                    severity: if z > 3.0 { "high" } else { "medium" },
                });
            }
        }
    }

    AnomalyReport {
        anomalies_detected: !anomalies.is_empty(),
        anomalies,
        baseline_insufficient: false,
        baseline_stats: Some(BaselineStats {
            window_count: windows.len(),
            bytes_mean: round2(bytes_mean),
            bytes_stdev: round2(bytes_stdev),
            flows_mean: round2(flows_mean),
            flows_stdev: round2(flows_stdev),
        }),
        baseline_window_hours,
        detection_window_minutes,
        anomaly_threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::model::RawCounters;
    use uuid::Uuid;

    fn flow(src: &str, dst: &str, bytes: u64, protocol: u8, age_minutes: i64) -> FlowRecord {
        FlowRecord {
            flow_id: Uuid::new_v4(),
            collector_id: Uuid::nil(),
            exporter_ip: "10.0.0.1".to_string(),
            src_addr: src.to_string(),
            dst_addr: dst.to_string(),
            src_port: 40000,
            dst_port: 443,
            protocol,
            tos: 0,
            tcp_flags: 0,
            packets: bytes / 100 + 1,
            bytes,
            raw: RawCounters {
                packets: bytes / 100 + 1,
                bytes,
            },
            flow_start: None,
            flow_end: None,
            ingested_at: Utc::now() - Duration::minutes(age_minutes),
            input_snmp: 0,
            output_snmp: 0,
            next_hop: None,
            src_as: 0,
            dst_as: 0,
            src_mask: 0,
            dst_mask: 0,
        }
    }

    #[test]
    fn top_talkers_rank_by_bytes() {
        let flows = vec![
            flow("10.0.0.1", "10.1.0.1", 1000, 6, 1),
            flow("10.0.0.2", "10.1.0.1", 500, 6, 1),
            flow("10.0.0.1", "10.1.0.2", 2000, 6, 1),
            flow("10.0.0.3", "10.1.0.1", 300, 6, 1),
        ];

        let talkers = top_talkers(&flows, 2, TalkerMetric::Bytes);
        assert_eq!(talkers.len(), 2);
        assert_eq!(talkers[0].rank, 1);
        assert_eq!(talkers[0].src_addr, "10.0.0.1");
        assert_eq!(talkers[0].bytes, 3000);
        assert_eq!(talkers[0].flows, 2);
        assert_eq!(talkers[1].rank, 2);
        assert_eq!(talkers[1].src_addr, "10.0.0.2");
    }

    #[test]
    fn top_talkers_by_flow_count() {
        let flows = vec![
            flow("10.0.0.1", "10.1.0.1", 10, 6, 1),
            flow("10.0.0.1", "10.1.0.1", 10, 6, 1),
            flow("10.0.0.1", "10.1.0.1", 10, 6, 1),
            flow("10.0.0.2", "10.1.0.1", 9999, 6, 1),
        ];
        let talkers = top_talkers(&flows, 1, TalkerMetric::Flows);
        assert_eq!(talkers[0].src_addr, "10.0.0.1");
        assert_eq!(talkers[0].flows, 3);
    }

    #[test]
    fn subnet_rollup_groups_prefixes() {
        let flows = vec![
            flow("10.0.0.1", "192.168.1.5", 100, 6, 1),
            flow("10.0.0.200", "192.168.1.9", 200, 6, 1),
            flow("10.0.1.1", "192.168.1.5", 400, 6, 1),
        ];

        let rollup = traffic_by_subnet(&flows, 24);
        let sent: BTreeMap<&str, u64> = rollup
            .iter()
            .map(|s| (s.subnet.as_str(), s.bytes_sent))
            .collect();
        assert_eq!(sent.get("10.0.0.0/24"), Some(&300));
        assert_eq!(sent.get("10.0.1.0/24"), Some(&400));

        let received: BTreeMap<&str, u64> = rollup
            .iter()
            .map(|s| (s.subnet.as_str(), s.bytes_received))
            .collect();
        assert_eq!(received.get("192.168.1.0/24"), Some(&700));
    }

    #[test]
    fn protocol_stats_name_and_share() {
        let flows = vec![
            flow("10.0.0.1", "10.1.0.1", 750, 6, 1),
            flow("10.0.0.1", "10.1.0.1", 250, 17, 1),
        ];
        let stats = protocol_statistics(&flows);
        assert_eq!(stats[0].name, "tcp");
        assert_eq!(stats[0].bytes_percent, 75.0);
        assert_eq!(stats[1].name, "udp");
        assert_eq!(stats[1].bytes_percent, 25.0);
    }

    #[test]
    fn aggregate_by_src_and_protocol() {
        let flows = vec![
            flow("10.0.0.1", "10.1.0.1", 100, 6, 1),
            flow("10.0.0.1", "10.1.0.2", 300, 6, 1),
            flow("10.0.0.2", "10.1.0.1", 50, 17, 1),
        ];
        let aggregates = aggregate_flows(&flows, &[GroupBy::SrcAddr, GroupBy::Protocol], 15);
        assert_eq!(aggregates.len(), 2);
        assert_eq!(aggregates[0].group.get("src_addr").map(String::as_str), Some("10.0.0.1"));
        assert_eq!(aggregates[0].bytes, 400);
        assert_eq!(aggregates[0].unique_destinations, 2);
        assert!(!aggregates[0].series.is_empty());
    }

    #[test]
    fn anomaly_baseline_insufficient_below_ten_windows() {
        // 3 windows of traffic only
        let flows: Vec<FlowRecord> = (0..3)
            .flat_map(|w| {
                (0..5).map(move |_| flow("10.0.0.1", "10.1.0.1", 1000, 6, w * 15))
            })
            .collect();

        let report = detect_anomalies(&flows, Utc::now(), 24, 45, 2.0, 15);
        assert!(!report.anomalies_detected);
        assert!(report.baseline_insufficient);
        assert!(report.anomalies.is_empty());
    }

    #[test]
    fn anomaly_detects_volume_spike() {
        let mut flows = Vec::new();
        // 20 quiet windows of ~1000 bytes with slight variation
        for w in 4..24 {
            flows.push(flow("10.0.0.1", "10.1.0.1", 1000 + (w % 3) as u64 * 10, 6, w * 15));
        }
        // recent spike window
        flows.push(flow("10.0.0.9", "10.1.0.1", 1_000_000, 6, 5));

        let report = detect_anomalies(&flows, Utc::now(), 24, 45, 2.0, 15);
        assert!(!report.baseline_insufficient);
        assert!(report.anomalies_detected);
        let spike = report
            .anomalies
            .iter()
            .find(|a| a.kind == "traffic_volume")
            .expect("volume anomaly");
        assert_eq!(spike.severity, "high");
        assert!(spike.z_score > 3.0);

        // reported anomaly satisfies |v - mean| / stdev > threshold
        let stats = report.baseline_stats.unwrap();
        assert!((spike.value as f64 - stats.bytes_mean).abs() / stats.bytes_stdev > 2.0);
    }
}
