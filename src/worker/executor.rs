use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};

use crate::job::{Job, JobController, JobReporter};
use crate::task::Task;

/// Consumes one task's job channel, running at most `task.config.max_running_jobs`
/// handler invocations concurrently (I3, P4) — grounded on the
/// `watch`-driven, `tokio::spawn`-per-unit-of-work shape in
/// `bpmn_integration/worker.rs`, generalized from one loop per worker to a
/// bounded fan-out via `Semaphore`.
pub struct JobExecutor {
    task: Arc<Task>,
    reporter: Arc<dyn JobReporter>,
    semaphore: Arc<Semaphore>,
}

impl JobExecutor {
    pub fn new(task: Arc<Task>, reporter: Arc<dyn JobReporter>) -> Self {
        let semaphore = Arc::new(Semaphore::new(task.config.max_running_jobs as usize));
        Self {
            task,
            reporter,
            semaphore,
        }
    }

    /// Drain `receiver` until the channel closes, spawning one job at a time
    /// but never running more than `max_running_jobs` concurrently.
    pub async fn run(&self, mut receiver: mpsc::Receiver<Job>) {
        let mut in_flight = tokio::task::JoinSet::new();

        loop {
            tokio::select! {
                biased;
                Some(result) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "executor task panicked");
                    }
                }
                job = receiver.recv() => {
                    match job {
                        Some(job) => self.spawn_job(job, &mut in_flight).await,
                        None => break,
                    }
                }
            }
        }

        while in_flight.join_next().await.is_some() {}
    }

    async fn spawn_job(&self, job: Job, in_flight: &mut tokio::task::JoinSet<()>) {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("executor semaphore is never closed while the executor runs");

        let task = self.task.clone();
        let reporter = self.reporter.clone();
        let job_key = job.key;

        in_flight.spawn(async move {
            let _permit = permit;
            let controller = JobController::new(reporter, job_key);
            let now_ms = now_epoch_ms();
            let deadline_ms = job.remaining_lease_ms(now_ms).min(task.config.timeout_ms as i64);
            let deadline = Duration::from_millis(deadline_ms.max(0) as u64);

            task.job_handler_with_deadline(job, controller, Some(deadline))
                .await;
        });
    }
}

fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
