//! Fleet-wide combination of worker results.
//!
//! Every field is reduced once, over the complete set of successful
//! workers:
//!
//! - counters and bytes are summed, saturating at `u64::MAX`,
//! - `timeTakenSeconds` is summed (compute-seconds spent by the fleet),
//! - means and percentiles use a mean weighted by each worker's completed
//!   request count, which is the plain arithmetic mean when volumes match,
//! - maxima take the maximum,
//! - standard deviations are pooled from each worker's (mean, stddev, count).
//!
//! Floating-point terms are sorted before they are added, so the result
//! does not depend on the order of the input. Combined floats never
//! overflow to infinity.

use crate::models::{
    AggregateResult, Latency, Percentiles, Throughput, WorkerOutcome, WorkerResult,
};
use tracing::debug;

/// One worker's contribution to a weighted statistic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub weight: f64,
    pub mean: f64,
    pub stddev: f64,
}

/// Combine the settled outcomes of a run.
///
/// With no successful worker the combined result is all zeros and
/// `success_count` is 0; whether that fails the run is up to the caller.
pub fn aggregate(outcomes: &[WorkerOutcome]) -> AggregateResult {
    let successes: Vec<&WorkerResult> = outcomes
        .iter()
        .filter_map(|o| o.status.as_ref().ok())
        .collect();
    let failure_count = outcomes.len() - successes.len();

    if successes.is_empty() {
        debug!("No successful workers among {}", outcomes.len());
        return AggregateResult {
            combined: WorkerResult::default(),
            success_count: 0,
            failure_count,
        };
    }

    let weights = request_weights(&successes);
    let weighted = |field: fn(&WorkerResult) -> f64| -> Vec<Sample> {
        successes
            .iter()
            .zip(&weights)
            .map(|(result, &weight)| Sample {
                weight,
                mean: field(result),
                stddev: 0.0,
            })
            .collect()
    };

    let latency_samples: Vec<Sample> = successes
        .iter()
        .zip(&weights)
        .map(|(r, &weight)| Sample {
            weight,
            mean: r.latency.mean,
            stddev: r.latency.stddev,
        })
        .collect();
    let rps_samples: Vec<Sample> = successes
        .iter()
        .zip(&weights)
        .map(|(r, &weight)| Sample {
            weight,
            mean: r.rps.mean,
            stddev: r.rps.stddev,
        })
        .collect();

    let combined = WorkerResult {
        bytes_read: saturating_sum(successes.iter().map(|r| r.bytes_read)),
        bytes_written: saturating_sum(successes.iter().map(|r| r.bytes_written)),
        time_taken_seconds: ordered_sum(successes.iter().map(|r| r.time_taken_seconds)),
        req_1xx: saturating_sum(successes.iter().map(|r| r.req_1xx)),
        req_2xx: saturating_sum(successes.iter().map(|r| r.req_2xx)),
        req_3xx: saturating_sum(successes.iter().map(|r| r.req_3xx)),
        req_4xx: saturating_sum(successes.iter().map(|r| r.req_4xx)),
        req_5xx: saturating_sum(successes.iter().map(|r| r.req_5xx)),
        others: saturating_sum(successes.iter().map(|r| r.others)),
        latency: Latency {
            mean: weighted_mean(&latency_samples),
            stddev: pooled_stddev(&latency_samples),
            max: maximum(successes.iter().map(|r| r.latency.max)),
        },
        rps: Throughput {
            mean: weighted_mean(&rps_samples),
            stddev: pooled_stddev(&rps_samples),
            max: maximum(successes.iter().map(|r| r.rps.max)),
            percentiles: Percentiles {
                p50: weighted_mean(&weighted(|r| r.rps.percentiles.p50)),
                p75: weighted_mean(&weighted(|r| r.rps.percentiles.p75)),
                p90: weighted_mean(&weighted(|r| r.rps.percentiles.p90)),
                p95: weighted_mean(&weighted(|r| r.rps.percentiles.p95)),
                p99: weighted_mean(&weighted(|r| r.rps.percentiles.p99)),
            },
        },
    };

    AggregateResult {
        combined,
        success_count: successes.len(),
        failure_count,
    }
}

/// Per-worker weights: completed request counts, or equal weights when
/// no worker reported any request.
fn request_weights(results: &[&WorkerResult]) -> Vec<f64> {
    let weights: Vec<f64> = results.iter().map(|r| r.request_count() as f64).collect();

    if weights.iter().all(|&w| w == 0.0) {
        vec![1.0; results.len()]
    } else {
        weights
    }
}

/// Sum of worker counters, pinned at `u64::MAX` instead of wrapping.
pub fn saturating_sum(values: impl IntoIterator<Item = u64>) -> u64 {
    values.into_iter().fold(0, u64::saturating_add)
}

/// Sum in a fixed order so that permuted inputs give identical bits.
pub fn ordered_sum(terms: impl IntoIterator<Item = f64>) -> f64 {
    let mut terms: Vec<f64> = terms.into_iter().collect();
    terms.sort_by(f64::total_cmp);
    finite(terms.into_iter().sum())
}

/// Keep a combined value representable in JSON: overflow is pinned to
/// the largest finite float, NaN becomes 0.
fn finite(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(f64::MIN, f64::MAX)
    }
}

/// Largest value, or 0 for an empty input.
pub fn maximum(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().reduce(f64::max).unwrap_or(0.0)
}

/// Mean of the sample means, weighted by sample weight.
pub fn weighted_mean(samples: &[Sample]) -> f64 {
    let total_weight = ordered_sum(samples.iter().map(|s| s.weight));
    if total_weight <= 0.0 {
        return 0.0;
    }

    ordered_sum(samples.iter().map(|s| (s.weight / total_weight) * s.mean))
}

/// Pooled standard deviation of several groups.
///
/// `sqrt(Σ wᵢ·(σᵢ² + (μᵢ − μ)²) / Σ wᵢ)`, where μ is the weighted mean.
/// Each group contributes its own spread plus its distance from the
/// combined mean.
pub fn pooled_stddev(samples: &[Sample]) -> f64 {
    let total_weight = ordered_sum(samples.iter().map(|s| s.weight));
    if total_weight <= 0.0 {
        return 0.0;
    }

    let mean = weighted_mean(samples);
    let variance = ordered_sum(samples.iter().map(|s| {
        let distance = s.mean - mean;
        (s.weight / total_weight) * (s.stddev * s.stddev + distance * distance)
    }));

    finite(variance.max(0.0).sqrt())
}
