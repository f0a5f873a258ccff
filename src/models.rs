//! Data models for the fleet coordinator.
//!
//! This module contains the structures exchanged with workers, the
//! per-worker outcomes produced by the dispatcher, and the combined
//! results handed to the report layer.

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Latency summary reported by a worker (milliseconds).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Latency {
    #[serde(default)]
    pub mean: f64,
    #[serde(default)]
    pub stddev: f64,
    #[serde(default)]
    pub max: f64,
}

/// Throughput percentiles (requests/sec).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    #[serde(rename = "50", default)]
    pub p50: f64,
    #[serde(rename = "75", default)]
    pub p75: f64,
    #[serde(rename = "90", default)]
    pub p90: f64,
    #[serde(rename = "95", default)]
    pub p95: f64,
    #[serde(rename = "99", default)]
    pub p99: f64,
}

/// Throughput summary reported by a worker (requests/sec).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Throughput {
    #[serde(default)]
    pub mean: f64,
    #[serde(default)]
    pub stddev: f64,
    #[serde(default)]
    pub max: f64,
    #[serde(default)]
    pub percentiles: Percentiles,
}

/// Performance summary computed by one worker.
///
/// The coordinator treats this as opaque input and never recomputes any
/// part of it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerResult {
    #[serde(default)]
    pub bytes_read: u64,
    #[serde(default)]
    pub bytes_written: u64,
    #[serde(default)]
    pub time_taken_seconds: f64,
    #[serde(rename = "req1xx", default)]
    pub req_1xx: u64,
    #[serde(rename = "req2xx", default)]
    pub req_2xx: u64,
    #[serde(rename = "req3xx", default)]
    pub req_3xx: u64,
    #[serde(rename = "req4xx", default)]
    pub req_4xx: u64,
    #[serde(rename = "req5xx", default)]
    pub req_5xx: u64,
    #[serde(default)]
    pub others: u64,
    #[serde(default)]
    pub latency: Latency,
    #[serde(default)]
    pub rps: Throughput,
}

impl WorkerResult {
    /// Number of requests this worker completed, across all response classes.
    pub fn request_count(&self) -> u64 {
        [
            self.req_1xx,
            self.req_2xx,
            self.req_3xx,
            self.req_4xx,
            self.req_5xx,
            self.others,
        ]
        .into_iter()
        .fold(0, u64::saturating_add)
    }
}

/// Echo of the load tool's own run parameters, as relayed by a worker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkerSpec {
    pub number_of_connections: u64,
    pub test_type: String,
    pub number_of_requests: u64,
    pub method: String,
    pub url: String,
    pub body: String,
    pub stream: bool,
    pub timeout_seconds: u64,
    pub client: String,
}

/// Response body returned by a worker endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerReport {
    #[serde(default)]
    pub spec: Option<WorkerSpec>,
    pub result: WorkerResult,
}

/// Immutable configuration for one fleet run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Target the workers load-test.
    pub target_url: Url,
    /// Worker endpoint, without query parameters.
    pub endpoint: Url,
    /// Concurrent connections per worker.
    pub concurrency: u64,
    /// Total requests per worker.
    pub request_count: u64,
    /// Fleet size.
    pub worker_count: usize,
    /// Per-worker timeout.
    pub timeout: Duration,
    /// Bearer token sent to every worker.
    pub token: Option<String>,
    /// Whether the workers run locally.
    pub local: bool,
}

/// Why a single worker did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status {0}")]
    UnexpectedStatus(u16),
    #[error("malformed body: {0}")]
    MalformedBody(String),
}

/// Settled outcome of one worker invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerOutcome {
    pub worker: usize,
    pub status: Result<WorkerResult, FailureReason>,
}

impl WorkerOutcome {
    pub fn success(worker: usize, result: WorkerResult) -> Self {
        Self {
            worker,
            status: Ok(result),
        }
    }

    pub fn failure(worker: usize, reason: FailureReason) -> Self {
        Self {
            worker,
            status: Err(reason),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_ok()
    }

    /// The report entry for this worker, if it failed.
    pub fn failure_entry(&self) -> Option<WorkerFailure> {
        self.status.as_ref().err().map(|reason| WorkerFailure {
            worker: self.worker,
            reason: reason.to_string(),
        })
    }
}

/// Fleet-wide combination of every successful worker result.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AggregateResult {
    pub combined: WorkerResult,
    pub success_count: usize,
    pub failure_count: usize,
}

impl AggregateResult {
    pub fn worker_count(&self) -> usize {
        self.success_count + self.failure_count
    }

    /// A run with no successful worker has nothing to report.
    pub fn is_failed_run(&self) -> bool {
        self.success_count == 0
    }
}

/// Context about the run, carried alongside the numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub target_url: String,
    pub endpoint: String,
    pub workers: usize,
    pub concurrency: u64,
    pub requests_per_worker: u64,
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the whole dispatch, measured by the coordinator.
    pub wall_clock_seconds: f64,
}

/// One failed worker, as listed in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerFailure {
    pub worker: usize,
    pub reason: String,
}

/// Rounded structure consumed by the external renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationReport {
    pub metadata: ReportMetadata,
    pub success_count: usize,
    pub failure_count: usize,
    pub result: WorkerResult,
    pub failures: Vec<WorkerFailure>,
}
