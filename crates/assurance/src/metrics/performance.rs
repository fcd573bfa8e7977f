use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// One measurement sample, as extracted from a probe result.
#[derive(Debug, Clone)]
pub struct Measurement {
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub response_time_ms: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct AvailabilityMetrics {
    pub availability_percent: f64,
    pub uptime_ratio: f64,
    pub total_measurements: usize,
    pub successful_measurements: usize,
    pub failed_measurements: usize,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct LatencyStatistics {
    pub count: usize,
    pub average_ms: f64,
    pub median_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub std_dev_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorRateWindow {
    pub timestamp: DateTime<Utc>,
    pub error_rate: f64,
    pub total: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorRateMetrics {
    pub overall_error_rate: f64,
    pub error_rate_trend: Vec<ErrorRateWindow>,
    pub window_minutes: i64,
    pub total_measurements: usize,
    pub total_errors: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThroughputMetrics {
    pub total_count: u64,
    pub average_per_minute: f64,
    pub peak_per_minute: f64,
    pub window_minutes: i64,
    pub total_windows: usize,
}

/// `100 * successful / total`, exact; zero measurements yield zeros.
pub fn availability(measurements: &[Measurement]) -> AvailabilityMetrics {
    if measurements.is_empty() {
        return AvailabilityMetrics::default();
    }

    let total = measurements.len();
    let successful = measurements.iter().filter(|m| m.success).count();

    AvailabilityMetrics {
        availability_percent: round3(100.0 * successful as f64 / total as f64),
        uptime_ratio: round4(successful as f64 / total as f64),
        total_measurements: total,
        successful_measurements: successful,
        failed_measurements: total - successful,
    }
}

/// Latency statistics over successful measurements only.
pub fn latency_statistics(measurements: &[Measurement]) -> LatencyStatistics {
    let mut values: Vec<f64> = measurements
        .iter()
        .filter(|m| m.success)
        .filter_map(|m| m.response_time_ms)
        .collect();

    if values.is_empty() {
        return LatencyStatistics::default();
    }

    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    LatencyStatistics {
        count: values.len(),
        average_ms: round3(mean(&values)),
        median_ms: round3(median(&values)),
        min_ms: round3(values[0]),
        max_ms: round3(values[values.len() - 1]),
        std_dev_ms: round3(std_dev(&values)),
        p50_ms: round3(percentile(&values, 50.0)),
        p90_ms: round3(percentile(&values, 90.0)),
        p95_ms: round3(percentile(&values, 95.0)),
        p99_ms: round3(percentile(&values, 99.0)),
    }
}

/// Error rate over the whole slice plus a per-window trend vector.
pub fn error_rate(measurements: &[Measurement], window_minutes: i64) -> ErrorRateMetrics {
    let mut windows: BTreeMap<DateTime<Utc>, (usize, usize)> = BTreeMap::new();

    for m in measurements {
        let bucket = window_start(m.timestamp, window_minutes);
        let entry = windows.entry(bucket).or_default();
        entry.0 += 1;
        if !m.success {
            entry.1 += 1;
        }
    }

    let total: usize = windows.values().map(|(t, _)| t).sum();
    let errors: usize = windows.values().map(|(_, e)| e).sum();
    let overall = if total > 0 {
        100.0 * errors as f64 / total as f64
    } else {
        0.0
    };

    let trend = windows
        .into_iter()
        .map(|(timestamp, (total, errors))| ErrorRateWindow {
            timestamp,
            error_rate: round2(if total > 0 {
                100.0 * errors as f64 / total as f64
            } else {
                0.0
            }),
            total,
            errors,
        })
        .collect();

    ErrorRateMetrics {
        overall_error_rate: round3(overall),
        error_rate_trend: trend,
        window_minutes,
        total_measurements: total,
        total_errors: errors,
    }
}

/// Per-window counting throughput: average and peak per minute.
pub fn throughput(timestamps: &[DateTime<Utc>], window_minutes: i64) -> ThroughputMetrics {
    let mut windows: BTreeMap<DateTime<Utc>, u64> = BTreeMap::new();
    for ts in timestamps {
        *windows.entry(window_start(*ts, window_minutes)).or_default() += 1;
    }

    let total_count: u64 = windows.values().sum();
    let total_windows = windows.len();
    if total_windows == 0 {
        return ThroughputMetrics {
            total_count: 0,
            average_per_minute: 0.0,
            peak_per_minute: 0.0,
            window_minutes,
            total_windows: 0,
        };
    }

    let average_per_window = total_count as f64 / total_windows as f64;
    let peak_per_window = windows.values().copied().max().unwrap_or(0) as f64;

    ThroughputMetrics {
        total_count,
        average_per_minute: round3(average_per_window / window_minutes as f64),
        peak_per_minute: round3(peak_per_window / window_minutes as f64),
        window_minutes,
        total_windows,
    }
}

/// Truncate a timestamp down to its window boundary.
pub fn window_start(ts: DateTime<Utc>, window_minutes: i64) -> DateTime<Utc> {
    let window_secs = window_minutes.max(1) * 60;
    let secs = ts.timestamp();
    let truncated = secs - secs.rem_euclid(window_secs);
    Utc.timestamp_opt(truncated, 0).single().unwrap_or(ts)
}

/// Percentile by index into the sorted vector:
/// `clamp(ceil(n * p / 100) - 1, 0, n - 1)`.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let n = sorted.len();
    let index = ((n as f64 * p / 100.0).ceil() as isize - 1).clamp(0, n as isize - 1);
    sorted[index as usize]
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Sample standard deviation (n - 1 denominator); 0 for fewer than 2 points.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

fn round4(v: f64) -> f64 {
    (v * 10000.0).round() / 10000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(success: bool, latency: Option<f64>, offset_min: i64) -> Measurement {
        Measurement {
            timestamp: Utc.with_ymd_and_hms(2026, 7, 1, 10, 0, 0).unwrap()
                + Duration::minutes(offset_min),
            success,
            response_time_ms: latency,
        }
    }

    #[test]
    fn availability_is_exact() {
        let measurements: Vec<_> = (0..10)
            .map(|i| sample(i < 8, Some(10.0), i))
            .collect();
        let metrics = availability(&measurements);
        assert_eq!(metrics.availability_percent, 80.0);
        assert_eq!(metrics.successful_measurements, 8);
        assert_eq!(metrics.failed_measurements, 2);
        assert_eq!(metrics.uptime_ratio, 0.8);
    }

    #[test]
    fn availability_empty_slice() {
        let metrics = availability(&[]);
        assert_eq!(metrics.availability_percent, 0.0);
        assert_eq!(metrics.total_measurements, 0);
    }

    #[test]
    fn latency_ignores_failures() {
        let measurements = vec![
            sample(true, Some(10.0), 0),
            sample(true, Some(20.0), 1),
            sample(false, Some(900.0), 2),
            sample(false, None, 3),
        ];
        let stats = latency_statistics(&measurements);
        assert_eq!(stats.count, 2);
        assert_eq!(stats.average_ms, 15.0);
        assert_eq!(stats.min_ms, 10.0);
        assert_eq!(stats.max_ms, 20.0);
    }

    #[test]
    fn percentile_indexing_matches_formula() {
        let sorted: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        // ceil(10 * 50 / 100) - 1 = 4
        assert_eq!(percentile(&sorted, 50.0), 5.0);
        // ceil(10 * 90 / 100) - 1 = 8
        assert_eq!(percentile(&sorted, 90.0), 9.0);
        // ceil(10 * 99 / 100) - 1 = 9
        assert_eq!(percentile(&sorted, 99.0), 10.0);
        // single element: always that element
        assert_eq!(percentile(&[42.0], 1.0), 42.0);
        assert_eq!(percentile(&[42.0], 99.0), 42.0);
    }

    #[test]
    fn error_rate_windows_and_overall() {
        let mut measurements = Vec::new();
        // first window: 3 ok, 1 error; second window: 1 ok, 1 error
        for i in 0..4 {
            measurements.push(sample(i != 3, Some(5.0), 0));
        }
        measurements.push(sample(true, Some(5.0), 15));
        measurements.push(sample(false, None, 15));

        let metrics = error_rate(&measurements, 15);
        assert_eq!(metrics.total_measurements, 6);
        assert_eq!(metrics.total_errors, 2);
        assert_eq!(metrics.overall_error_rate, round3(100.0 * 2.0 / 6.0));
        assert_eq!(metrics.error_rate_trend.len(), 2);
        assert_eq!(metrics.error_rate_trend[0].errors, 1);
        assert_eq!(metrics.error_rate_trend[1].error_rate, 50.0);
    }

    #[test]
    fn std_dev_matches_sample_formula() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        // sample stdev of this classic set is ~2.138
        assert!((std_dev(&values) - 2.138).abs() < 0.001);
    }

    #[test]
    fn window_start_truncates_to_boundary() {
        let ts = Utc.with_ymd_and_hms(2026, 7, 1, 10, 37, 42).unwrap();
        let bucket = window_start(ts, 15);
        assert_eq!(bucket, Utc.with_ymd_and_hms(2026, 7, 1, 10, 30, 0).unwrap());
    }
}
