//! Worker endpoint client.
//!
//! A worker is invoked with a GET request carrying the load parameters as
//! query pairs and a bearer token. It answers `200 OK` with the load tool's
//! JSON report, or any other status on failure.

use crate::models::{FailureReason, RunRequest, WorkerReport};
use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use std::future::Future;
use tracing::debug;

/// Request template shared by every worker of a run.
#[derive(Debug, Clone)]
pub struct WorkerRequest {
    /// Endpoint URL including the `concurrency`, `number` and `url` query pairs.
    pub url: Url,
    pub token: Option<String>,
}

impl WorkerRequest {
    /// Build the template from a run request.
    pub fn new(run: &RunRequest) -> Self {
        let mut url = run.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("concurrency", &run.concurrency.to_string())
                .append_pair("number", &run.request_count.to_string())
                .append_pair("url", run.target_url.as_str());
            // The local worker uses this to pick its bundled load tool.
            if run.local {
                pairs.append_pair("local", "1");
            }
        }

        Self {
            url,
            token: run.token.clone(),
        }
    }
}

/// Anything that can invoke one worker and return its report.
///
/// Implementations map every failure onto a [`FailureReason`]; they never
/// panic or abort the fleet. Timeouts are applied by the dispatcher.
pub trait WorkerClient {
    fn invoke(
        &self,
        worker: usize,
        request: &WorkerRequest,
    ) -> impl Future<Output = Result<WorkerReport, FailureReason>> + Send;
}

/// Worker client backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpWorkerClient {
    http: reqwest::Client,
}

impl HttpWorkerClient {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("hivefleet/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { http })
    }
}

impl WorkerClient for HttpWorkerClient {
    async fn invoke(
        &self,
        worker: usize,
        request: &WorkerRequest,
    ) -> Result<WorkerReport, FailureReason> {
        let mut builder = self
            .http
            .get(request.url.clone())
            .header(CONTENT_TYPE, "application/json");

        if let Some(ref token) = request.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                FailureReason::Timeout
            } else {
                FailureReason::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        debug!("Worker {} answered {}", worker, status);

        if status != StatusCode::OK {
            return Err(FailureReason::UnexpectedStatus(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FailureReason::Transport(e.to_string()))?;

        serde_json::from_slice(&body).map_err(|e| FailureReason::MalformedBody(e.to_string()))
    }
}
