use std::sync::Arc;

use crate::errors::HandlerError;
use crate::job::{Job, JobController};
use crate::task::decorator::{run_chain, TaskDecorator};
use crate::task::exception_handler::{DefaultExceptionHandler, ExceptionHandler};
use crate::task::handler::JobHandler;
use crate::task::TaskConfig;
use crate::variables::decode;

/// An immutable binding of (job type, handler, parameter schema, per-task
/// config, decorator chain, exception handler) — §3.
///
/// `job_handler` is the single entry point the dispatcher calls per job
/// (§4.4 steps 1, 2, 4, 5, 6 — step 3, the deadline guard, is applied by the
/// caller, see [`crate::worker::JobExecutor`]).
pub struct Task {
    pub config: TaskConfig,
    pub handler: Arc<dyn JobHandler>,
    pub before: Vec<Arc<dyn TaskDecorator>>,
    pub after: Vec<Arc<dyn TaskDecorator>>,
}

impl Task {
    pub fn task_type(&self) -> &str {
        &self.config.task_type
    }

    fn effective_exception_handler(&self) -> Arc<dyn ExceptionHandler> {
        self.config
            .exception_handler
            .clone()
            .unwrap_or_else(|| Arc::new(DefaultExceptionHandler))
    }

    /// Run the full per-job pipeline with no deadline guard on the handler
    /// invocation: decode -> before-chain -> handler -> outcome routing ->
    /// after-chain. Used directly by tests and by callers that manage
    /// timeouts themselves.
    pub async fn job_handler(&self, job: Job, controller: JobController) {
        self.job_handler_with_deadline(job, controller, None).await;
    }

    /// Same pipeline, but the handler invocation (step 4, §4.4) is wrapped in
    /// `tokio::time::timeout(deadline)` when `deadline` is `Some`. On expiry
    /// the job is left unterminated — no terminal RPC is issued, since the
    /// gateway will redeliver once the activation lease lapses — and the
    /// after-chain still runs (§4.4 step 3).
    pub async fn job_handler_with_deadline(
        &self,
        job: Job,
        controller: JobController,
        deadline: Option<std::time::Duration>,
    ) {
        let job = run_chain(&self.before, job).await;

        let variables = match decode(&job, &self.config) {
            Ok(variables) => variables,
            Err(error) => {
                self.effective_exception_handler()
                    .handle(HandlerError::Other(error.into()), &job, &controller)
                    .await;
                run_chain(&self.after, job).await;
                return;
            }
        };

        let outcome = match deadline {
            Some(deadline) => {
                match tokio::time::timeout(deadline, self.handler.call(variables, &job, &controller))
                    .await
                {
                    Ok(outcome) => Some(outcome),
                    Err(_) => {
                        tracing::warn!(
                            job_key = job.key,
                            task_type = self.task_type(),
                            "handler exceeded deadline, leaving job for gateway redelivery"
                        );
                        None
                    }
                }
            }
            None => Some(self.handler.call(variables, &job, &controller).await),
        };

        if let Some(outcome) = outcome {
            match outcome {
                Ok(output) => {
                    if !controller.is_terminated() {
                        let output = output.unwrap_or_else(|| serde_json::json!({}));
                        if let Err(e) = controller.set_success_status(output).await {
                            tracing::error!(job_key = job.key, error = %e, "failed to complete job");
                        }
                    }
                }
                Err(error) => {
                    if !controller.is_terminated() {
                        self.effective_exception_handler()
                            .handle(error, &job, &controller)
                            .await;
                    }
                }
            }
        }

        run_chain(&self.after, job).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::errors::ZeebeError;
    use crate::job::JobReporter;
    use crate::task::TaskConfigBuilder;

    #[derive(Debug, Default)]
    struct RecordingReporter {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl JobReporter for RecordingReporter {
        async fn complete_job(&self, key: i64, variables: serde_json::Value) -> Result<(), ZeebeError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("complete:{key}:{variables}"));
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

    struct AddHandler;

    #[async_trait]
    impl JobHandler for AddHandler {
        async fn call(
            &self,
            variables: crate::variables::DecodedVariables,
            _job: &Job,
            _controller: &JobController,
        ) -> Result<Option<serde_json::Value>, HandlerError> {
            let variables = variables.into_map();
            let x = variables["x"].as_i64().unwrap();
            let y = variables["y"].as_i64().unwrap();
            Ok(Some(serde_json::json!({"sum": x + y})))
        }
    }

    struct BusinessErrorHandler;

    #[async_trait]
    impl JobHandler for BusinessErrorHandler {
        async fn call(
            &self,
            _variables: crate::variables::DecodedVariables,
            _job: &Job,
            _controller: &JobController,
        ) -> Result<Option<serde_json::Value>, HandlerError> {
            Err(HandlerError::business("E_NEG", None))
        }
    }

    struct PanickingHandler;

    #[async_trait]
    impl JobHandler for PanickingHandler {
        async fn call(
            &self,
            _variables: crate::variables::DecodedVariables,
            _job: &Job,
            _controller: &JobController,
        ) -> Result<Option<serde_json::Value>, HandlerError> {
            Err(HandlerError::Other(anyhow::anyhow!("boom")))
        }
    }

    fn sample_job(retries: i32) -> Job {
        Job {
            key: 1,
            job_type: "add".into(),
            process_instance_key: 1,
            bpmn_process_id: "p".into(),
            process_definition_version: 1,
            process_definition_key: 1,
            element_id: "e".into(),
            element_instance_key: 1,
            worker: "w".into(),
            retries,
            deadline: 0,
            variables: serde_json::json!({"x": 2, "y": 3}),
            custom_headers: Default::default(),
        }
    }

    // S1
    #[tokio::test]
    async fn successful_job_completes_with_handler_output() {
        let reporter = Arc::new(RecordingReporter::default());
        let task = TaskConfigBuilder::new("add").fetch(["x", "y"]).build().unwrap();
        let task = Task {
            config: task,
            handler: Arc::new(AddHandler),
            before: vec![],
            after: vec![],
        };
        let job = sample_job(3);
        let controller = JobController::new(reporter.clone(), job.key);

        task.job_handler(job, controller).await;

        let calls = reporter.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("complete:1:"));
        assert!(calls[0].contains("\"sum\":5"));
    }

    // S2
    #[tokio::test]
    async fn business_error_maps_to_throw_error_only() {
        let reporter = Arc::new(RecordingReporter::default());
        let config = TaskConfigBuilder::new("t").build().unwrap();
        let task = Task {
            config,
            handler: Arc::new(BusinessErrorHandler),
            before: vec![],
            after: vec![],
        };
        let job = sample_job(3);
        let controller = JobController::new(reporter.clone(), job.key);

        task.job_handler(job, controller).await;

        assert_eq!(reporter.calls.lock().unwrap().as_slice(), ["throw:1:E_NEG"]);
    }

    // S3
    #[tokio::test]
    async fn other_error_fails_job_with_unchanged_retries() {
        let reporter = Arc::new(RecordingReporter::default());
        let config = TaskConfigBuilder::new("t").build().unwrap();
        let task = Task {
            config,
            handler: Arc::new(PanickingHandler),
            before: vec![],
            after: vec![],
        };
        let job = sample_job(3);
        let controller = JobController::new(reporter.clone(), job.key);

        task.job_handler(job, controller).await;

        let calls = reporter.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("fail:1:3:"));
        assert!(calls[0].contains("boom"));
    }

    struct SlowHandler;

    #[async_trait]
    impl JobHandler for SlowHandler {
        async fn call(
            &self,
            _variables: crate::variables::DecodedVariables,
            _job: &Job,
            _controller: &JobController,
        ) -> Result<Option<serde_json::Value>, HandlerError> {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            Ok(None)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn handler_timeout_skips_reporting_but_runs_after_chain() {
        let reporter = Arc::new(RecordingReporter::default());
        let config = TaskConfigBuilder::new("t").build().unwrap();
        let after_ran = Arc::new(Mutex::new(false));
        struct MarkAfter(Arc<Mutex<bool>>);
        #[async_trait]
        impl TaskDecorator for MarkAfter {
            async fn apply(&self, job: Job) -> anyhow::Result<Job> {
                *self.0.lock().unwrap() = true;
                Ok(job)
            }
        }
        let task = Task {
            config,
            handler: Arc::new(SlowHandler),
            before: vec![],
            after: vec![Arc::new(MarkAfter(after_ran.clone()))],
        };
        let job = sample_job(3);
        let controller = JobController::new(reporter.clone(), job.key);

        task.job_handler_with_deadline(job, controller.clone(), Some(std::time::Duration::from_millis(10)))
            .await;

        assert!(reporter.calls.lock().unwrap().is_empty());
        assert!(!controller.is_terminated());
        assert!(*after_ran.lock().unwrap());
    }
}
