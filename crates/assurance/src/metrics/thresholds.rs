use serde::Serialize;

use super::performance::{mean, round3, std_dev};
use crate::error::{AssuranceError, Result};

/// Alerting bounds derived from recent history rather than configured.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DynamicThresholds {
    pub warning_upper: f64,
    pub critical_upper: f64,
    pub warning_lower: f64,
    pub critical_lower: f64,
    pub mean: f64,
    pub standard_deviation: f64,
    pub confidence_level: f64,
    pub data_points: usize,
    pub insufficient_data: bool,
}

impl DynamicThresholds {
    fn insufficient(confidence_level: f64) -> Self {
        Self {
            warning_upper: 0.0,
            critical_upper: 0.0,
            warning_lower: 0.0,
            critical_lower: 0.0,
            mean: 0.0,
            standard_deviation: 0.0,
            confidence_level,
            data_points: 0,
            insufficient_data: true,
        }
    }
}

/// Compute `mean ± z·stdev` bounds after IQR outlier removal.
///
/// Only the 0.95 and 0.99 confidence levels are supported; anything else
/// is a validation error rather than a silent fallback.
pub fn dynamic_thresholds(historical_values: &[f64], confidence_level: f64) -> Result<DynamicThresholds> {
    let (z_warning, z_critical) = match confidence_level {
        c if (c - 0.95).abs() < f64::EPSILON => (1.96, 2.58),
        c if (c - 0.99).abs() < f64::EPSILON => (2.58, 3.29),
        _ => {
            return Err(AssuranceError::validation(
                "confidence_level",
                format!(
                    "unsupported confidence level {}; use 0.95 or 0.99",
                    confidence_level
                ),
            ))
        }
    };

    if historical_values.len() < 10 {
        return Ok(DynamicThresholds::insufficient(confidence_level));
    }

    let cleaned = remove_outliers_iqr(historical_values);
    if cleaned.len() < 5 {
        return Ok(DynamicThresholds::insufficient(confidence_level));
    }

    let mean_val = mean(&cleaned);
    let stdev_val = std_dev(&cleaned);

    Ok(DynamicThresholds {
        warning_upper: round3(mean_val + z_warning * stdev_val),
        critical_upper: round3(mean_val + z_critical * stdev_val),
        warning_lower: round3((mean_val - z_warning * stdev_val).max(0.0)),
        critical_lower: round3((mean_val - z_critical * stdev_val).max(0.0)),
        mean: round3(mean_val),
        standard_deviation: round3(stdev_val),
        confidence_level,
        data_points: cleaned.len(),
        insufficient_data: false,
    })
}

/// Drop values outside `[Q1 - 1.5·IQR, Q3 + 1.5·IQR]`.
/// Slices shorter than 4 are returned unchanged.
pub fn remove_outliers_iqr(values: &[f64]) -> Vec<f64> {
    if values.len() < 4 {
        return values.to_vec();
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    let q1 = sorted[n / 4];
    let q3 = sorted[3 * n / 4];
    let iqr = q3 - q1;

    let lower = q1 - 1.5 * iqr;
    let upper = q3 + 1.5 * iqr;

    values
        .iter()
        .copied()
        .filter(|v| *v >= lower && *v <= upper)
        .collect()
}

/// Credit tier applied for a given delivered availability.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SlaCredit {
    pub actual_availability: f64,
    pub credit_percentage: u8,
    pub threshold_met: f64,
    pub downtime_percentage: f64,
}

const CREDIT_TIERS: &[(f64, u8)] = &[
    (99.95, 0),
    (99.9, 10),
    (99.0, 25),
    (95.0, 50),
    (0.0, 100),
];

/// Map availability onto the monotone credit tier table.
pub fn sla_credit(actual_availability: f64) -> SlaCredit {
    let (threshold_met, credit_percentage) = CREDIT_TIERS
        .iter()
        .copied()
        .find(|(threshold, _)| actual_availability >= *threshold)
        .unwrap_or(*CREDIT_TIERS.last().expect("tier table is non-empty"));

    SlaCredit {
        actual_availability,
        credit_percentage,
        threshold_met,
        downtime_percentage: round3(100.0 - actual_availability),
    }
}
