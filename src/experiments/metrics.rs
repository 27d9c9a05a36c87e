//! Metric value extraction.
//!
//! Reported rates arrive as optional fields. They are normalized here, once per
//! ad, so that every later stage works with plain finite numbers: a missing or
//! non-finite value reads as `0.0`.

use serde::Serialize;

use super::config::Metric;
use crate::types::AdMetrics;

/// The three comparable values of one ad, with missing values zeroed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricVector {
    pub ctr: f64,
    pub cpc: f64,
    pub conversion_rate: f64,
}

impl MetricVector {
    pub fn from_ad(ad: &AdMetrics) -> Self {
        Self {
            ctr: or_zero(ad.ctr),
            cpc: or_zero(ad.avg_cpc),
            conversion_rate: or_zero(ad.conversion_rate),
        }
    }

    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Ctr => self.ctr,
            Metric::Cpc => self.cpc,
            Metric::Conversions => self.conversion_rate,
        }
    }
}

/// Reads one metric from an ad.
///
/// `Conversions` compares the reported conversion rate field, not
/// conversions divided by clicks.
pub fn metric_value(ad: &AdMetrics, metric: Metric) -> f64 {
    MetricVector::from_ad(ad).get(metric)
}

fn or_zero(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}
