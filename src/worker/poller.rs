use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{mpsc, watch};

use crate::errors::ZeebeError;
use crate::grpc_internals::{ActivateJobsParams, ZeebeAdapter};
use crate::task::Task;
use crate::worker::supervisor::ShutdownSignal;

const INITIAL_BACKOFF_MS: u64 = 100;
const MAX_BACKOFF_MS: u64 = 30_000;

/// One long-poll loop per task type (§4.3). State machine: `Idle -> Polling
/// -> Delivering -> Idle` with a self-loop on an empty batch, and an error
/// sink `Error -> Backoff -> Polling` with exponential backoff and jitter.
///
/// Long-poll shutdown mirrors `bpmn_integration/worker.rs`'s
/// `watch::Receiver<bool>` + `tokio::select!` pattern, generalized from one
/// worker-wide loop to one loop per task.
pub struct JobPoller {
    task: Arc<Task>,
    adapter: Arc<ZeebeAdapter>,
    sender: mpsc::Sender<crate::job::Job>,
    worker_name: String,
    request_timeout_ms: i64,
    tenant_ids: Vec<String>,
}

/// Outcome of [`JobPoller::run`]: either a clean shutdown, or the
/// non-retryable error that terminated the poller, surfaced to the
/// supervisor (§4.5 "observes health").
pub type PollerResult = Result<(), ZeebeError>;

impl JobPoller {
    pub fn new(
        task: Arc<Task>,
        adapter: Arc<ZeebeAdapter>,
        sender: mpsc::Sender<crate::job::Job>,
        worker_name: String,
        request_timeout_ms: i64,
        tenant_ids: Vec<String>,
    ) -> Self {
        Self {
            task,
            adapter,
            sender,
            worker_name,
            request_timeout_ms,
            tenant_ids,
        }
    }

    pub async fn run(&self, mut shutdown_rx: watch::Receiver<ShutdownSignal>) -> PollerResult {
        let task_type = self.task.task_type().to_string();
        tracing::info!(task_type = %task_type, "poller started");

        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            if *shutdown_rx.borrow() != ShutdownSignal::Running {
                break;
            }

            let params = ActivateJobsParams {
                task_type: task_type.clone(),
                worker: self.worker_name.clone(),
                timeout_ms: self.task.config.timeout_ms as i64,
                max_jobs_to_activate: self.task.config.max_jobs_to_activate as i32,
                variables_to_fetch: self.task.config.variables_to_fetch.clone(),
                request_timeout_ms: self.request_timeout_ms,
                tenant_ids: self.tenant_ids.clone(),
            };

            let poll = tokio::select! {
                biased;
                _ = shutdown_rx.changed() => break,
                result = self.adapter.activate_jobs(params) => result,
            };

            match poll {
                Ok(jobs) => {
                    backoff_ms = INITIAL_BACKOFF_MS;
                    if jobs.is_empty() {
                        continue;
                    }
                    tracing::debug!(task_type = %task_type, count = jobs.len(), "activated jobs");
                    for job in jobs {
                        tokio::select! {
                            biased;
                            _ = shutdown_rx.changed() => return Ok(()),
                            result = self.sender.send(job) => {
                                if result.is_err() {
                                    // Executor side dropped; nothing more to deliver.
                                    return Ok(());
                                }
                            }
                        }
                    }
                }
                Err(error) if error.is_retryable() => {
                    tracing::warn!(task_type = %task_type, %error, backoff_ms, "poll failed, backing off");
                    let jitter_ms = rand::thread_rng().gen_range(0..=backoff_ms / 4 + 1);
                    tokio::select! {
                        biased;
                        _ = shutdown_rx.changed() => break,
                        _ = tokio::time::sleep(Duration::from_millis(backoff_ms + jitter_ms)) => {}
                    }
                    backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
                }
                Err(error) => {
                    tracing::error!(task_type = %task_type, %error, "poller terminated by non-retryable error");
                    return Err(error);
                }
            }
        }

        tracing::info!(task_type = %task_type, "poller stopped");
        Ok(())
    }
}

/// `max_jobs_to_activate` must not exceed `max_running_jobs`, or the poller
/// could activate more jobs than the channel can ever drain (§4.3).
pub fn validate_poll_bounds(task: &Task) -> Result<(), String> {
    if task.config.max_jobs_to_activate > task.config.max_running_jobs {
        Err(format!(
            "task {:?}: max_jobs_to_activate ({}) must not exceed max_running_jobs ({})",
            task.task_type(),
            task.config.max_jobs_to_activate,
            task.config.max_running_jobs
        ))
    } else {
        Ok(())
    }
}
