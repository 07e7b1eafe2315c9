use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::{AlreadyTerminated, ZeebeError};

use super::reporter::JobReporter;

/// Mutable collaborator tied to one [`super::Job`] (§3).
///
/// Carries the gateway reporter and the job key. Exactly one of the four
/// terminal operations may succeed per job (I2); subsequent calls fail with
/// [`AlreadyTerminated`] rather than issuing a second RPC.
#[derive(Debug, Clone)]
pub struct JobController {
    reporter: Arc<dyn JobReporter>,
    job_key: i64,
    terminated: Arc<AtomicBool>,
}

impl JobController {
    pub fn new(reporter: Arc<dyn JobReporter>, job_key: i64) -> Self {
        Self {
            reporter,
            job_key,
            terminated: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn job_key(&self) -> i64 {
        self.job_key
    }

    /// `true` once a terminal operation has already succeeded for this job.
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Atomically claim the terminal slot. Returns `Err` if already claimed.
    fn claim(&self) -> Result<(), AlreadyTerminated> {
        self.terminated
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| AlreadyTerminated)
    }

    /// Report success with the given output variables.
    pub async fn set_success_status(
        &self,
        variables: serde_json::Value,
    ) -> Result<(), ControllerError> {
        self.claim()?;
        let reporter = self.reporter.clone();
        let job_key = self.job_key;
        shielded(async move { reporter.complete_job(job_key, variables).await }).await?;
        Ok(())
    }

    /// Report failure. Does not decrement `retries` — per spec, the gateway's
    /// own policy decides whether/when to decrement.
    pub async fn set_failure_status(
        &self,
        message: impl Into<String>,
        retries: i32,
        retry_backoff_ms: u64,
    ) -> Result<(), ControllerError> {
        self.claim()?;
        let reporter = self.reporter.clone();
        let job_key = self.job_key;
        let message = message.into();
        shielded(async move {
            reporter
                .fail_job(job_key, retries, message, retry_backoff_ms, None)
                .await
        })
        .await?;
        Ok(())
    }

    /// Report a business error (throw_error), carrying a process-visible
    /// error code.
    pub async fn set_error_status(
        &self,
        message: impl Into<String>,
        error_code: impl Into<String>,
    ) -> Result<(), ControllerError> {
        self.claim()?;
        let reporter = self.reporter.clone();
        let job_key = self.job_key;
        let message = message.into();
        let error_code = error_code.into();
        shielded(async move {
            reporter
                .throw_error(job_key, error_code, Some(message), None)
                .await
        })
        .await?;
        Ok(())
    }

    /// Cancel the job: `fail_job` with `retries = 0`, so the gateway does not
    /// redeliver it. Rarely used directly by handlers.
    pub async fn set_cancel_status(&self) -> Result<(), ControllerError> {
        self.claim()?;
        let reporter = self.reporter.clone();
        let job_key = self.job_key;
        shielded(async move {
            reporter
                .fail_job(job_key, 0, "cancelled by handler".to_string(), 0, None)
                .await
        })
        .await?;
        Ok(())
    }
}

/// Run a terminal-status RPC on its own detached task so that aborting the
/// caller (e.g. `JobExecutor`'s `in_flight` set on a forced shutdown) can
/// never cancel the RPC mid-flight — only the spawning task's `.await` is
/// abandoned, the gateway call itself runs to completion.
async fn shielded<Fut>(fut: Fut) -> Result<(), ZeebeError>
where
    Fut: std::future::Future<Output = Result<(), ZeebeError>> + Send + 'static,
{
    match tokio::spawn(fut).await {
        Ok(result) => result,
        Err(join_error) => Err(ZeebeError::Internal(format!(
            "terminal status task panicked: {join_error}"
        ))),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    AlreadyTerminated(#[from] AlreadyTerminated),
    #[error(transparent)]
    Zeebe(#[from] ZeebeError),
}
