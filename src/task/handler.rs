use std::future::Future;

use async_trait::async_trait;

use crate::errors::HandlerError;
use crate::job::{Job, JobController};
use crate::variables::DecodedVariables;

/// The user-registered callable for a task type (§3 `Task.handler_fn`).
///
/// Receives the decoded variables (per `variables_to_fetch`/`single_value`,
/// see [`crate::task::TaskConfig`]) plus the `Job` and `JobController`
/// context parameters — in the source these are reserved parameter names the
/// handler may optionally declare; in Rust they are just always passed.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn call(
        &self,
        variables: DecodedVariables,
        job: &Job,
        controller: &JobController,
    ) -> Result<Option<serde_json::Value>, HandlerError>;
}

/// Adapts a plain async closure into a [`JobHandler`], the way axum adapts
/// closures into its `Handler` trait.
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F, Fut> JobHandler for FnHandler<F>
where
    F: Fn(DecodedVariables, Job, JobController) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<serde_json::Value>, HandlerError>> + Send,
{
    async fn call(
        &self,
        variables: DecodedVariables,
        job: &Job,
        controller: &JobController,
    ) -> Result<Option<serde_json::Value>, HandlerError> {
        (self.0)(variables, job.clone(), controller.clone()).await
    }
}
