//! Presentation-ready report assembly.
//!
//! This module rounds the combined statistics for display and serializes
//! the result for whatever renders it. Rounding happens here and nowhere
//! else.

use crate::models::{
    AggregateResult, Latency, Percentiles, PresentationReport, ReportMetadata, Throughput,
    WorkerOutcome, WorkerResult,
};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    let scaled = value * 100.0;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / 100.0
}

/// Build the presentation report for a combined result.
///
/// Float fields are rounded to two decimals, integer fields pass through.
/// Calling this twice on the same input gives the same output.
pub fn finalize(aggregate: &AggregateResult, metadata: ReportMetadata) -> PresentationReport {
    PresentationReport {
        metadata: ReportMetadata {
            wall_clock_seconds: round2(metadata.wall_clock_seconds),
            ..metadata
        },
        success_count: aggregate.success_count,
        failure_count: aggregate.failure_count,
        result: round_result(&aggregate.combined),
        failures: Vec::new(),
    }
}

impl PresentationReport {
    /// Attach the list of failed workers.
    pub fn with_failures(mut self, outcomes: &[WorkerOutcome]) -> Self {
        self.failures = outcomes.iter().filter_map(|o| o.failure_entry()).collect();
        self
    }
}

fn round_result(result: &WorkerResult) -> WorkerResult {
    let rps = &result.rps;

    WorkerResult {
        time_taken_seconds: round2(result.time_taken_seconds),
        latency: Latency {
            mean: round2(result.latency.mean),
            stddev: round2(result.latency.stddev),
            max: round2(result.latency.max),
        },
        rps: Throughput {
            mean: round2(rps.mean),
            stddev: round2(rps.stddev),
            max: round2(rps.max),
            percentiles: Percentiles {
                p50: round2(rps.percentiles.p50),
                p75: round2(rps.percentiles.p75),
                p90: round2(rps.percentiles.p90),
                p95: round2(rps.percentiles.p95),
                p99: round2(rps.percentiles.p99),
            },
        },
        ..*result
    }
}

/// Generate a JSON report.
pub fn generate_json_report(report: &PresentationReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write a JSON report to a file.
pub fn write_json_report(report: &PresentationReport, path: &Path) -> Result<()> {
    let content = generate_json_report(report)?;

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create report file {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    Ok(())
}

/// Generate a short text summary for the terminal.
pub fn generate_summary_text(report: &PresentationReport) -> String {
    let r = &report.result;
    let mut lines = Vec::new();

    lines.push(format!(
        "Workers: {} succeeded, {} failed",
        report.success_count, report.failure_count
    ));
    lines.push(format!(
        "Requests: 1xx {} | 2xx {} | 3xx {} | 4xx {} | 5xx {} | others {}",
        r.req_1xx, r.req_2xx, r.req_3xx, r.req_4xx, r.req_5xx, r.others
    ));
    lines.push(format!(
        "Bytes: read {} | written {}",
        r.bytes_read, r.bytes_written
    ));
    lines.push(format!(
        "Latency (ms): mean {:.2} | stddev {:.2} | max {:.2}",
        r.latency.mean, r.latency.stddev, r.latency.max
    ));
    lines.push(format!(
        "Req/sec: mean {:.2} | stddev {:.2} | max {:.2}",
        r.rps.mean, r.rps.stddev, r.rps.max
    ));
    lines.push(format!(
        "Req/sec percentiles: p50 {:.2} | p75 {:.2} | p90 {:.2} | p95 {:.2} | p99 {:.2}",
        r.rps.percentiles.p50,
        r.rps.percentiles.p75,
        r.rps.percentiles.p90,
        r.rps.percentiles.p95,
        r.rps.percentiles.p99
    ));
    lines.push(format!(
        "Time: {:.2}s across workers, {:.2}s wall clock",
        r.time_taken_seconds, report.metadata.wall_clock_seconds
    ));

    for failure in &report.failures {
        lines.push(format!("Worker {}: {}", failure.worker, failure.reason));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregate;
    use crate::models::FailureReason;
    use chrono::Utc;

    fn create_test_metadata() -> ReportMetadata {
        ReportMetadata {
            target_url: "https://target.example/".to_string(),
            endpoint: "http://localhost:3000/".to_string(),
            workers: 3,
            concurrency: 10,
            requests_per_worker: 1000,
            started_at: Utc::now(),
            wall_clock_seconds: 4.56789,
        }
    }

    fn create_test_aggregate() -> AggregateResult {
        AggregateResult {
            combined: WorkerResult {
                bytes_read: 12345,
                bytes_written: 678,
                time_taken_seconds: 7.004999,
                req_2xx: 2000,
                req_5xx: 3,
                latency: Latency {
                    mean: 12.3456,
                    stddev: 1.111,
                    max: 99.999,
                },
                rps: Throughput {
                    mean: 150.0,
                    stddev: 20.126,
                    max: 310.4449,
                    percentiles: Percentiles {
                        p50: 148.005,
                        p75: 160.1,
                        p90: 170.129,
                        p95: 180.0,
                        p99: 199.994,
                    },
                },
                ..Default::default()
            },
            success_count: 2,
            failure_count: 1,
        }
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(150.0), 150.0);
        assert_eq!(round2(12.3456), 12.35);
        assert_eq!(round2(1.111), 1.11);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn test_finalize_rounds_floats_only() {
        let report = finalize(&create_test_aggregate(), create_test_metadata());

        assert_eq!(report.result.latency.mean, 12.35);
        assert_eq!(report.result.latency.max, 100.0);
        assert_eq!(report.result.rps.mean, 150.0);
        assert_eq!(report.result.rps.stddev, 20.13);
        assert_eq!(report.result.rps.percentiles.p99, 199.99);
        assert_eq!(report.result.time_taken_seconds, 7.0);
        assert_eq!(report.metadata.wall_clock_seconds, 4.57);

        assert_eq!(report.result.bytes_read, 12345);
        assert_eq!(report.result.req_2xx, 2000);
        assert_eq!(report.result.req_5xx, 3);
        assert_eq!(report.success_count, 2);
        assert_eq!(report.failure_count, 1);
    }

    #[test]
    fn test_aggregate_then_finalize_rounds_once() {
        let outcomes: Vec<WorkerOutcome> = [100.0, 200.0]
            .into_iter()
            .enumerate()
            .map(|(i, mean)| {
                let mut result = WorkerResult {
                    req_2xx: 1000,
                    ..Default::default()
                };
                result.rps.mean = mean;
                result.latency.mean = mean / 3.0;
                WorkerOutcome::success(i, result)
            })
            .collect();

        let report = finalize(&aggregate(&outcomes), create_test_metadata());

        assert_eq!(report.result.rps.mean, 150.0);
        assert_eq!(report.result.latency.mean, 50.0);
        assert_eq!(report.result.req_2xx, 2000);
        assert_eq!(report.success_count, 2);
    }

    #[test]
    fn test_huge_values_survive_json() {
        let outcomes: Vec<WorkerOutcome> = [1e300, -1e300]
            .into_iter()
            .enumerate()
            .map(|(i, mean)| {
                let mut result = WorkerResult {
                    req_2xx: 10,
                    ..Default::default()
                };
                result.latency.mean = mean;
                result.latency.stddev = 1e200;
                WorkerOutcome::success(i, result)
            })
            .collect();

        let report = finalize(&aggregate(&outcomes), create_test_metadata());
        assert!(report.result.latency.stddev.is_finite());
        assert_eq!(round2(f64::MAX), f64::MAX);

        let json = generate_json_report(&report).unwrap();
        assert!(!json.contains("null"));
        let parsed: PresentationReport = serde_json::from_str(&json).unwrap();
        assert!(parsed.result.latency.stddev.is_finite());
        assert_eq!(parsed.result.latency.mean, 0.0);
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let aggregate = create_test_aggregate();
        let metadata = create_test_metadata();

        let first = finalize(&aggregate, metadata.clone());
        let second = finalize(&aggregate, metadata);
        assert_eq!(first.result, second.result);

        // Rounding an already rounded result changes nothing.
        assert_eq!(round_result(&first.result), first.result);
    }

    #[test]
    fn test_with_failures() {
        let outcomes = vec![
            WorkerOutcome::success(0, WorkerResult::default()),
            WorkerOutcome::failure(1, FailureReason::UnexpectedStatus(502)),
            WorkerOutcome::failure(2, FailureReason::Timeout),
        ];

        let report =
            finalize(&create_test_aggregate(), create_test_metadata()).with_failures(&outcomes);

        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].worker, 1);
        assert_eq!(report.failures[0].reason, "unexpected status 502");
        assert_eq!(report.failures[1].worker, 2);
    }

    #[test]
    fn test_generate_json_report() {
        let report = finalize(&create_test_aggregate(), create_test_metadata());
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"successCount\": 2"));
        assert!(json.contains("\"bytesRead\": 12345"));
        assert!(json.contains("\"req2xx\": 2000"));
        assert!(json.contains("\"99\": 199.99"));
        assert!(json.contains("\"wallClockSeconds\""));
    }

    #[test]
    fn test_write_json_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = finalize(&create_test_aggregate(), create_test_metadata());

        write_json_report(&report, &path).unwrap();

        let written: PresentationReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.result, report.result);
    }

    #[test]
    fn test_generate_summary_text() {
        let outcomes = vec![WorkerOutcome::failure(4, FailureReason::Timeout)];
        let report =
            finalize(&create_test_aggregate(), create_test_metadata()).with_failures(&outcomes);
        let text = generate_summary_text(&report);

        assert!(text.contains("Workers: 2 succeeded, 1 failed"));
        assert!(text.contains("mean 12.35"));
        assert!(text.contains("p99 199.99"));
        assert!(text.contains("Worker 4: timed out"));
    }
}
