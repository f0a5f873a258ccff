//! Concurrent fan-out of one run across the fleet.

use crate::fleet::client::{WorkerClient, WorkerRequest};
use crate::models::{FailureReason, RunRequest, WorkerOutcome};
use futures::future::join_all;
use indicatif::ProgressBar;
use tracing::{debug, info, warn};

/// Invoke every worker of the fleet concurrently and wait for all of them.
///
/// Returns exactly `run.worker_count` outcomes, where `outcomes[i].worker == i`.
/// Each invocation is bounded by `run.timeout`; an expired call is dropped
/// (which cancels the in-flight request) and recorded as
/// [`FailureReason::Timeout`]. The function only returns once every worker
/// has settled.
pub async fn dispatch<C: WorkerClient>(
    run: &RunRequest,
    client: &C,
    progress: &ProgressBar,
) -> Vec<WorkerOutcome> {
    let request = WorkerRequest::new(run);
    info!(
        "Dispatching {} workers to {} (timeout {:?})",
        run.worker_count, run.endpoint, run.timeout
    );

    // Each future owns its worker index and yields into its own slot of the
    // joined vector, so nothing is shared while workers are in flight.
    let invocations = (0..run.worker_count).map(|worker| {
        let request = &request;
        async move {
            let outcome = match tokio::time::timeout(run.timeout, client.invoke(worker, request))
                .await
            {
                Ok(Ok(report)) => {
                    if let Some(spec) = report.spec {
                        debug!("Worker {} ran {:?}", worker, spec);
                    }
                    WorkerOutcome::success(worker, report.result)
                }
                Ok(Err(reason)) => WorkerOutcome::failure(worker, reason),
                Err(_) => WorkerOutcome::failure(worker, FailureReason::Timeout),
            };

            match outcome.status {
                Ok(ref result) => debug!("Worker {} succeeded: {:?}", worker, result),
                Err(ref reason) => warn!("Worker {} failed: {}", worker, reason),
            }
            progress.inc(1);

            outcome
        }
    });

    let outcomes = join_all(invocations).await;

    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    info!(
        "All {} workers settled ({} succeeded, {} failed)",
        outcomes.len(),
        succeeded,
        outcomes.len() - succeeded
    );

    outcomes
}
