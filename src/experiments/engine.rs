//! Significance and comparison engine.
//!
//! Runs once per (control, test ad) pair: Fisher's exact test on the click
//! split, per-metric differences and the weighted composite score. Nothing in
//! here performs I/O or fails at runtime; configuration problems are rejected
//! when the engine is built.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;

use super::assignment::{assign_control, ControlSelection};
use super::config::{ComparisonConfig, Metric};
use super::metrics::MetricVector;
use super::scoring::composite_score;
use super::stats::fisher_exact_test_bounded;
use crate::error::Result;
use crate::types::{AdGroup, AdMetrics};

// ── Result Structs ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricComparisonResult {
    pub control_value: f64,
    pub test_value: f64,
    /// Percent change of test over control.
    pub relative_difference: f64,
    /// `test - control`, in percentage points for rate metrics.
    pub absolute_difference: f64,
    pub better: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    TestWins,
    ControlWins,
    Inconclusive,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonVerdict {
    pub control_id: String,
    pub test_id: String,
    pub p_value: f64,
    pub confidence: f64,
    pub is_significant: bool,
    pub composite_score: f64,
    pub is_better_overall: bool,
    pub outcome: Outcome,
    pub primary_metric: Metric,
    pub metrics: IndexMap<Metric, MetricComparisonResult>,
    pub sub_scores: IndexMap<Metric, f64>,
    pub precision_warning: bool,
}

impl ComparisonVerdict {
    /// Result for the configured primary metric.
    pub fn primary(&self) -> Option<&MetricComparisonResult> {
        self.metrics.get(&self.primary_metric)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdGroupReport {
    pub ad_group_id: String,
    pub ad_group_name: String,
    pub control: AdMetrics,
    pub control_selection: ControlSelection,
    /// One verdict per test ad, in assignment order.
    pub verdicts: Vec<ComparisonVerdict>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SkipReason {
    InsufficientAds { qualifying: usize },
    TaskFailed { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedGroup {
    pub ad_group_id: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub generated_at: DateTime<Utc>,
    pub reports: Vec<AdGroupReport>,
    pub skipped: Vec<SkippedGroup>,
}

impl BatchOutcome {
    fn new() -> Self {
        Self {
            generated_at: Utc::now(),
            reports: Vec::new(),
            skipped: Vec::new(),
        }
    }

    fn push(&mut self, result: std::result::Result<AdGroupReport, SkippedGroup>) {
        match result {
            Ok(report) => self.reports.push(report),
            Err(skipped) => self.skipped.push(skipped),
        }
    }
}

// ── Per-metric differences ──────────────────────────────────────────

/// Percent change from `control` to `test`.
///
/// A zero control with a non-zero test counts as a full move: +100 when higher
/// is better, -100 when lower is better. Both zero is no change.
pub fn relative_difference(control: f64, test: f64, higher_is_better: bool) -> f64 {
    if control != 0.0 {
        (test - control) / control * 100.0
    } else if test != 0.0 {
        if higher_is_better {
            100.0
        } else {
            -100.0
        }
    } else {
        0.0
    }
}

pub fn compare_metric(
    metric: Metric,
    control: f64,
    test: f64,
    higher_is_better: bool,
) -> MetricComparisonResult {
    let scale = if metric.is_rate() { 100.0 } else { 1.0 };
    MetricComparisonResult {
        control_value: control,
        test_value: test,
        relative_difference: relative_difference(control, test, higher_is_better),
        absolute_difference: (test - control) * scale,
        better: if higher_is_better {
            test > control
        } else {
            test < control
        },
    }
}

// ── Engine ──────────────────────────────────────────────────────────

/// Holds a validated, immutable [`ComparisonConfig`]. Cheap to share across
/// threads behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ComparisonEngine {
    config: ComparisonConfig,
}

impl ComparisonEngine {
    pub fn new(config: ComparisonConfig) -> Result<Self> {
        config.validate()?;
        tracing::debug!(
            significance_threshold = config.significance_threshold,
            min_impressions = config.min_impressions,
            primary_metric = %config.primary_metric,
            exact_count_limit = config.exact_count_limit,
            "comparison engine configured"
        );
        Ok(Self { config })
    }

    pub fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    /// Compares one test ad against its control.
    pub fn compare(&self, control: &AdMetrics, test: &AdMetrics) -> ComparisonVerdict {
        for ad in [control, test] {
            if !ad.has_consistent_counts() {
                tracing::warn!(
                    ad_id = %ad.id,
                    clicks = ad.clicks,
                    impressions = ad.impressions,
                    "clicks exceed impressions; treating non-clicks as zero"
                );
            }
        }

        let fisher = fisher_exact_test_bounded(
            control.clicks,
            control.non_clicks(),
            test.clicks,
            test.non_clicks(),
            self.config.exact_count_limit,
        );
        if fisher.precision_warning {
            tracing::warn!(
                control_id = %control.id,
                test_id = %test.id,
                total = fisher.total,
                limit = self.config.exact_count_limit,
                "contingency table above exact summation limit; using log-gamma"
            );
        }

        let cv = MetricVector::from_ad(control);
        let tv = MetricVector::from_ad(test);
        let directions = &self.config.directions;

        let metrics: IndexMap<Metric, MetricComparisonResult> = Metric::ALL
            .iter()
            .map(|&m| {
                (
                    m,
                    compare_metric(m, cv.get(m), tv.get(m), directions.higher_is_better(m)),
                )
            })
            .collect();

        let composite = composite_score(&cv, &tv, &self.config.weights, directions);

        let is_significant = fisher.p_value < self.config.significance_threshold;
        let is_better_overall = composite.score > 0.5;
        let outcome = match (is_significant, is_better_overall) {
            (true, true) => Outcome::TestWins,
            (true, false) => Outcome::ControlWins,
            (false, _) => Outcome::Inconclusive,
        };

        tracing::debug!(
            control_id = %control.id,
            test_id = %test.id,
            p_value = fisher.p_value,
            composite_score = composite.score,
            ?outcome,
            "compared ad pair"
        );

        ComparisonVerdict {
            control_id: control.id.clone(),
            test_id: test.id.clone(),
            p_value: fisher.p_value,
            confidence: 1.0 - fisher.p_value,
            is_significant,
            composite_score: composite.score,
            is_better_overall,
            outcome,
            primary_metric: self.config.primary_metric,
            metrics,
            sub_scores: composite.sub_scores,
            precision_warning: fisher.precision_warning,
        }
    }

    /// Assigns control/test ads for one group and compares every test ad.
    /// Returns `None` for groups with fewer than two ads.
    pub fn compare_group(&self, group: &AdGroup) -> Option<AdGroupReport> {
        self.evaluate_group(group).ok()
    }

    /// Compares every group in order. Groups that cannot be compared are
    /// listed in [`BatchOutcome::skipped`] and never abort the batch.
    pub fn compare_groups(&self, groups: &[AdGroup]) -> BatchOutcome {
        let mut outcome = BatchOutcome::new();
        for group in groups {
            outcome.push(self.evaluate_group(group));
        }
        log_batch(&outcome);
        outcome
    }

    /// Same as [`compare_groups`](Self::compare_groups), with each group
    /// evaluated on tokio's blocking pool. Output order matches input order.
    pub async fn compare_groups_concurrently(self: Arc<Self>, groups: Vec<AdGroup>) -> BatchOutcome {
        let handles: Vec<_> = groups
            .into_iter()
            .map(|group| {
                let engine = Arc::clone(&self);
                let id = group.id.clone();
                let handle = tokio::task::spawn_blocking(move || engine.evaluate_group(&group));
                (id, handle)
            })
            .collect();

        let mut outcome = BatchOutcome::new();
        for (id, handle) in handles {
            match handle.await {
                Ok(result) => outcome.push(result),
                Err(e) => {
                    tracing::error!(ad_group = %id, error = %e, "ad group comparison task failed");
                    outcome.skipped.push(SkippedGroup {
                        ad_group_id: id,
                        reason: SkipReason::TaskFailed {
                            message: e.to_string(),
                        },
                    });
                }
            }
        }
        log_batch(&outcome);
        outcome
    }

    fn evaluate_group(&self, group: &AdGroup) -> std::result::Result<AdGroupReport, SkippedGroup> {
        let Some(assignment) = assign_control(&group.ads, self.config.control_matcher.as_ref())
        else {
            tracing::debug!(
                ad_group = %group.id,
                qualifying = group.ads.len(),
                "skipping ad group with fewer than two qualifying ads"
            );
            return Err(SkippedGroup {
                ad_group_id: group.id.clone(),
                reason: SkipReason::InsufficientAds {
                    qualifying: group.ads.len(),
                },
            });
        };

        if assignment.selection == ControlSelection::HighestImpressions {
            tracing::info!(
                ad_group = %group.id,
                control_id = %assignment.control.id,
                impressions = assignment.control.impressions,
                "no ad matched the control matcher; using highest-impressions ad as control"
            );
        }

        let verdicts = assignment
            .tests
            .iter()
            .map(|test| self.compare(assignment.control, test))
            .collect();

        Ok(AdGroupReport {
            ad_group_id: group.id.clone(),
            ad_group_name: group.name.clone(),
            control: assignment.control.clone(),
            control_selection: assignment.selection,
            verdicts,
        })
    }
}

fn log_batch(outcome: &BatchOutcome) {
    tracing::info!(
        compared = outcome.reports.len(),
        skipped = outcome.skipped.len(),
        verdicts = outcome.reports.iter().map(|r| r.verdicts.len()).sum::<usize>(),
        "ad group comparison finished"
    );
}
