//! Weighted composite score for one control/test pair.
//!
//! Each metric is min-max normalized across the two ads only, so a score says
//! nothing about how the test ad ranks against the rest of its ad group.

use indexmap::IndexMap;

use super::config::{Metric, MetricDirections, MetricWeights};
use super::metrics::MetricVector;

/// Sub-score given to a metric on which both ads are equal.
pub const TIE_SCORE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeScore {
    /// Weighted sum of the sub-scores, in [0, 1].
    pub score: f64,
    pub sub_scores: IndexMap<Metric, f64>,
}

/// Normalizes `test` against the pair `(control, test)` so that the value
/// favored by the metric's direction maps to 1.
pub fn sub_score(control: f64, test: f64, higher_is_better: bool) -> f64 {
    let hi = control.max(test);
    let lo = control.min(test);
    if hi == lo {
        return TIE_SCORE;
    }
    let range = (hi - lo).max(f64::MIN_POSITIVE);
    let score = ((test - lo) / range).clamp(0.0, 1.0);
    if higher_is_better {
        score
    } else {
        1.0 - score
    }
}

pub fn composite_score(
    control: &MetricVector,
    test: &MetricVector,
    weights: &MetricWeights,
    directions: &MetricDirections,
) -> CompositeScore {
    let mut sub_scores = IndexMap::with_capacity(Metric::ALL.len());
    let mut score = 0.0;
    let mut total_weight = 0.0;
    let mut decided = false;
    for metric in Metric::ALL {
        let s = sub_score(
            control.get(metric),
            test.get(metric),
            directions.higher_is_better(metric),
        );
        let weight = weights.get(metric);
        score += weight * s;
        total_weight += weight;
        decided |= weight > 0.0 && s != TIE_SCORE;
        sub_scores.insert(metric, s);
    }

    // Weights only sum to 1 within tolerance, and float sums drift, so a pair
    // tied on every weighted metric is pinned to the neutral score.
    let score = if !decided {
        TIE_SCORE
    } else if total_weight > 0.0 {
        score / total_weight
    } else {
        score
    };
    CompositeScore {
        score: score.clamp(0.0, 1.0),
        sub_scores,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    fn vector(ctr: f64, cpc: f64, conversion_rate: f64) -> MetricVector {
        MetricVector {
            ctr,
            cpc,
            conversion_rate,
        }
    }

    #[test]
    fn tie_on_every_metric_scores_exactly_half() {
        let v = vector(0.05, 1.0, 0.02);
        let result = composite_score(
            &v,
            &v,
            &MetricWeights::default(),
            &MetricDirections::default(),
        );
        assert_eq!(result.score, 0.5);
        assert!(result.sub_scores.values().all(|&s| s == TIE_SCORE));
    }

    fn weights(ctr: f64, cpc: f64, conversions: f64) -> MetricWeights {
        MetricWeights(IndexMap::from([
            (Metric::Ctr, ctr),
            (Metric::Cpc, cpc),
            (Metric::Conversions, conversions),
        ]))
    }

    #[test]
    fn tie_scores_exactly_half_under_any_accepted_weights() {
        let v = vector(0.05, 1.0, 0.02);
        for w in [
            weights(0.7, 0.2, 0.1),
            weights(0.1, 0.2, 0.7),
            weights(0.33, 0.33, 0.34),
            weights(0.4000005, 0.3, 0.3),
            weights(0.3999995, 0.3, 0.3),
            weights(1.0, 0.0, 0.0),
            weights(0.0, 0.0, 1.0),
            weights(0.6, 0.0, 0.4),
        ] {
            let result = composite_score(&v, &v, &w, &MetricDirections::default());
            assert_eq!(result.score, TIE_SCORE, "weights={:?}", w);
        }
    }

    #[test]
    fn tie_on_weighted_metrics_ignores_zero_weight_differences() {
        let control = vector(0.05, 1.0, 0.02);
        let test = vector(0.05, 3.0, 0.02);
        let result = composite_score(
            &control,
            &test,
            &weights(0.7, 0.0, 0.3),
            &MetricDirections::default(),
        );
        assert_eq!(result.score, TIE_SCORE);
    }

    #[test]
    fn score_is_normalized_by_weight_total() {
        let control = vector(0.05, 1.0, 0.02);
        let test = vector(0.08, 0.9, 0.03);
        let result = composite_score(
            &control,
            &test,
            &weights(0.4000005, 0.3, 0.3),
            &MetricDirections::default(),
        );
        assert_eq!(result.score, 1.0);

        let test = vector(0.08, 1.0, 0.02);
        let result = composite_score(
            &control,
            &test,
            &weights(0.7, 0.2, 0.1),
            &MetricDirections::default(),
        );
        assert!((result.score - 0.85).abs() < 1e-12, "score={}", result.score);
    }

    #[test]
    fn test_dominating_every_metric_scores_one() {
        let control = vector(0.05, 1.0, 0.02);
        let test = vector(0.08, 0.9, 0.03);
        let result = composite_score(
            &control,
            &test,
            &MetricWeights::default(),
            &MetricDirections::default(),
        );
        assert!((result.score - 1.0).abs() < 1e-12, "score={}", result.score);
    }

    #[test]
    fn lower_is_better_inverts_sub_score() {
        assert_eq!(sub_score(1.0, 0.9, false), 1.0);
        assert_eq!(sub_score(1.0, 0.9, true), 0.0);
        assert_eq!(sub_score(0.9, 1.0, false), 0.0);
    }

    #[test]
    fn flipping_direction_and_swapping_values_keeps_sub_score() {
        for (c, t) in [(0.05, 0.08), (1.0, 0.9), (0.0, 3.0), (2.0, 2.0)] {
            for dir in [true, false] {
                assert_eq!(sub_score(c, t, dir), sub_score(t, c, !dir), "c={c} t={t}");
            }
        }
    }

    #[test]
    fn zero_weight_metric_does_not_move_score() {
        let weights = MetricWeights(IndexMap::from([
            (Metric::Ctr, 1.0),
            (Metric::Cpc, 0.0),
            (Metric::Conversions, 0.0),
        ]));
        let control = vector(0.05, 1.0, 0.02);
        let test = vector(0.05, 5.0, 0.0);
        let result = composite_score(&control, &test, &weights, &MetricDirections::default());
        assert_eq!(result.score, 0.5);
        assert_eq!(result.sub_scores[&Metric::Cpc], 0.0);
    }

    #[test]
    fn tiny_differences_do_not_divide_by_zero() {
        let s = sub_score(1e-300, 2e-300, true);
        assert!(s.is_finite());
        assert_eq!(s, 1.0);
    }

    #[test]
    fn composite_score_stays_in_unit_interval_for_random_inputs() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let weights = MetricWeights::default();
        let directions = MetricDirections::default();
        for _ in 0..10_000 {
            let control = vector(rng.gen(), rng.gen_range(0.0..20.0), rng.gen());
            let test = vector(rng.gen(), rng.gen_range(0.0..20.0), rng.gen());
            let result = composite_score(&control, &test, &weights, &directions);
            assert!((0.0..=1.0).contains(&result.score), "score={}", result.score);
        }
    }
}
