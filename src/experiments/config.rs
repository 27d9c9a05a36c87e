use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{AdVerdictError, Result};
use crate::types::AdMetrics;

/// Tolerance used when checking that the configured weights sum to one.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

fn default_significance_threshold() -> f64 {
    0.05
}

fn default_min_impressions() -> u64 {
    100
}

fn default_exact_count_limit() -> u64 {
    1_000_000
}

// ── Metrics ─────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(try_from = "String")]
pub enum Metric {
    #[serde(rename = "CTR")]
    Ctr,
    #[serde(rename = "CPC")]
    Cpc,
    #[serde(rename = "Conversions")]
    Conversions,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Ctr, Metric::Cpc, Metric::Conversions];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Ctr => "CTR",
            Metric::Cpc => "CPC",
            Metric::Conversions => "Conversions",
        }
    }

    /// Rate metrics are stored as fractions and reported in percentage points.
    pub fn is_rate(self) -> bool {
        matches!(self, Metric::Ctr | Metric::Conversions)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = AdVerdictError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "CTR" => Ok(Metric::Ctr),
            "CPC" => Ok(Metric::Cpc),
            "Conversions" => Ok(Metric::Conversions),
            other => Err(AdVerdictError::UnknownMetric(other.to_string())),
        }
    }
}

impl TryFrom<String> for Metric {
    type Error = AdVerdictError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Weight per metric. Must cover every metric and sum to 1.0.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(transparent)]
pub struct MetricWeights(pub IndexMap<Metric, f64>);

impl Default for MetricWeights {
    fn default() -> Self {
        Self(IndexMap::from([
            (Metric::Ctr, 0.4),
            (Metric::Cpc, 0.3),
            (Metric::Conversions, 0.3),
        ]))
    }
}

impl MetricWeights {
    pub fn get(&self, metric: Metric) -> f64 {
        self.0.get(&metric).copied().unwrap_or(0.0)
    }

    pub fn sum(&self) -> f64 {
        self.0.values().sum()
    }
}

/// `true` means higher values are better for that metric.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(transparent)]
pub struct MetricDirections(pub IndexMap<Metric, bool>);

impl Default for MetricDirections {
    fn default() -> Self {
        Self(IndexMap::from([
            (Metric::Ctr, true),
            (Metric::Cpc, false),
            (Metric::Conversions, true),
        ]))
    }
}

impl MetricDirections {
    pub fn higher_is_better(&self, metric: Metric) -> bool {
        self.0.get(&metric).copied().unwrap_or(true)
    }
}

// ── Control matcher ─────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum AdAttribute {
    #[default]
    FinalUrl,
    Headline,
}

/// Identifies the control ad by a case-sensitive substring of one attribute.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControlMatcher {
    #[serde(default)]
    pub attribute: AdAttribute,
    pub pattern: String,
}

impl ControlMatcher {
    pub fn final_url(pattern: impl Into<String>) -> Self {
        Self {
            attribute: AdAttribute::FinalUrl,
            pattern: pattern.into(),
        }
    }

    pub fn matches(&self, ad: &AdMetrics) -> bool {
        let value = match self.attribute {
            AdAttribute::FinalUrl => ad.final_url.as_deref(),
            AdAttribute::Headline => ad.headline.as_deref(),
        };
        value.is_some_and(|v| v.contains(self.pattern.as_str()))
    }
}

// ── Comparison config ───────────────────────────────────────────────

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonConfig {
    #[serde(default = "default_significance_threshold")]
    pub significance_threshold: f64,
    /// Applied by whoever prepares the ad groups; the engine only logs it.
    #[serde(default = "default_min_impressions")]
    pub min_impressions: u64,
    #[serde(default = "default_primary_metric")]
    pub primary_metric: Metric,
    #[serde(default)]
    pub weights: MetricWeights,
    #[serde(default)]
    pub directions: MetricDirections,
    #[serde(default)]
    pub control_matcher: Option<ControlMatcher>,
    /// Contingency tables with more observations than this are evaluated with
    /// log-gamma and flagged with a precision warning.
    #[serde(default = "default_exact_count_limit")]
    pub exact_count_limit: u64,
}

fn default_primary_metric() -> Metric {
    Metric::Ctr
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            significance_threshold: default_significance_threshold(),
            min_impressions: default_min_impressions(),
            primary_metric: default_primary_metric(),
            weights: MetricWeights::default(),
            directions: MetricDirections::default(),
            control_matcher: None,
            exact_count_limit: default_exact_count_limit(),
        }
    }
}

impl ComparisonConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ComparisonConfig = serde_json::from_str(json).map_err(|e| {
            // serde surfaces our own UnknownMetric message inside its error.
            if e.is_data() {
                AdVerdictError::Config(e.to_string())
            } else {
                AdVerdictError::from(e)
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.significance_threshold > 0.0 && self.significance_threshold < 1.0) {
            return Err(AdVerdictError::InvalidThreshold(self.significance_threshold));
        }
        for metric in Metric::ALL {
            let weight = *self
                .weights
                .0
                .get(&metric)
                .ok_or_else(|| AdVerdictError::MissingWeight(metric.to_string()))?;
            if !(0.0..=1.0).contains(&weight) {
                return Err(AdVerdictError::WeightOutOfRange {
                    metric: metric.to_string(),
                    weight,
                });
            }
            if !self.directions.0.contains_key(&metric) {
                return Err(AdVerdictError::MissingDirection(metric.to_string()));
            }
        }
        let sum = self.weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(AdVerdictError::WeightSum { sum });
        }
        if let Some(matcher) = &self.control_matcher {
            if matcher.pattern.is_empty() {
                return Err(AdVerdictError::Config(
                    "controlMatcher.pattern must not be empty".to_string(),
                ));
            }
        }
        if self.exact_count_limit == 0 {
            return Err(AdVerdictError::Config(
                "exactCountLimit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
