use async_trait::async_trait;

use crate::errors::ZeebeError;

/// What a [`crate::job::JobController`] needs from the gateway adapter to
/// terminate a job. `ZeebeAdapter` implements this; tests use a fake.
///
/// Split out from `ZeebeAdapter` itself so `JobController` (and therefore the
/// executor and its tests) don't need a live gRPC channel, mirroring the
/// service-trait-over-a-concrete-client shape used for the limit/auth clients
/// in the wider example corpus.
#[async_trait]
pub trait JobReporter: Send + Sync + std::fmt::Debug {
    async fn complete_job(&self, key: i64, variables: serde_json::Value) -> Result<(), ZeebeError>;

    async fn fail_job(
        &self,
        key: i64,
        retries: i32,
        message: String,
        retry_backoff_ms: u64,
        variables: Option<serde_json::Value>,
    ) -> Result<(), ZeebeError>;

    async fn throw_error(
        &self,
        key: i64,
        error_code: String,
        message: Option<String>,
        variables: Option<serde_json::Value>,
    ) -> Result<(), ZeebeError>;
}
