use async_trait::async_trait;

use crate::errors::HandlerError;
use crate::job::{Job, JobController};

/// Resolves a handler failure to a terminal job status (§4.4, §7.2).
///
/// Resolution order at dispatch time is task -> router -> worker -> default
/// (I4), implemented by [`crate::task::Task::effective_exception_handler`]
/// picking the closest non-`None` handler and storing it on the frozen task.
#[async_trait]
pub trait ExceptionHandler: Send + Sync {
    async fn handle(&self, error: HandlerError, job: &Job, controller: &JobController);
}

/// The handler used when no task/router/worker handler is registered.
///
/// `BusinessError` still maps to `throw_error`; anything else logs a warning
/// and calls `set_failure_status`, per §4.4 step 5 and §7.2.
#[derive(Debug, Default)]
pub struct DefaultExceptionHandler;

#[async_trait]
impl ExceptionHandler for DefaultExceptionHandler {
    async fn handle(&self, error: HandlerError, job: &Job, controller: &JobController) {
        match error {
            HandlerError::Business { code, message } => {
                tracing::warn!(job_key = job.key, error_code = %code, "handler raised BusinessError");
                if let Err(e) = controller
                    .set_error_status(message.unwrap_or_default(), code)
                    .await
                {
                    tracing::error!(job_key = job.key, error = %e, "failed to report business error");
                }
            }
            HandlerError::Other(err) => {
                tracing::warn!(job_key = job.key, error = %err, "handler failed, failing job");
                if let Err(e) = controller.set_failure_status(err.to_string(), job.retries, 0).await
                {
                    tracing::error!(job_key = job.key, error = %e, "failed to report job failure");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::errors::ZeebeError;
    use crate::job::JobReporter;

    #[derive(Debug, Default)]
    struct RecordingReporter {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl JobReporter for RecordingReporter {
        async fn complete_job(&self, key: i64, _v: serde_json::Value) -> Result<(), ZeebeError> {
            self.calls.lock().unwrap().push(format!("complete:{key}"));
            Ok(())
        }
        async fn fail_job(
            &self,
            key: i64,
            retries: i32,
            message: String,
            _b: u64,
            _v: Option<serde_json::Value>,
        ) -> Result<(), ZeebeError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("fail:{key}:{retries}:{message}"));
            Ok(())
        }
        async fn throw_error(
            &self,
            key: i64,
            error_code: String,
            _m: Option<String>,
            _v: Option<serde_json::Value>,
        ) -> Result<(), ZeebeError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("throw:{key}:{error_code}"));
            Ok(())
        }
    }

    fn sample_job(retries: i32) -> Job {
        Job {
            key: 5,
            job_type: "t".into(),
            process_instance_key: 1,
            bpmn_process_id: "p".into(),
            process_definition_version: 1,
            process_definition_key: 1,
            element_id: "e".into(),
            element_instance_key: 1,
            worker: "w".into(),
            retries,
            deadline: 0,
            variables: serde_json::json!({}),
            custom_headers: Default::default(),
        }
    }

    #[tokio::test]
    async fn default_handler_completes_business_error_as_throw_error() {
        let reporter = Arc::new(RecordingReporter::default());
        let job = sample_job(3);
        let controller = JobController::new(reporter.clone(), job.key);

        DefaultExceptionHandler
            .handle(
                HandlerError::business("E_NEG", Some("bad".into())),
                &job,
                &controller,
            )
            .await;

        assert_eq!(reporter.calls.lock().unwrap().as_slice(), ["throw:5:E_NEG"]);
    }

    #[tokio::test]
    async fn default_handler_fails_job_with_unchanged_retries() {
        let reporter = Arc::new(RecordingReporter::default());
        let job = sample_job(3);
        let controller = JobController::new(reporter.clone(), job.key);

        DefaultExceptionHandler
            .handle(
                HandlerError::Other(anyhow::anyhow!("boom")),
                &job,
                &controller,
            )
            .await;

        let calls = reporter.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("fail:5:3:"));
        assert!(calls[0].contains("boom"));
    }
}
