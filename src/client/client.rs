use std::sync::Arc;

use crate::errors::{ClientError, ZeebeError};
use crate::grpc_internals::ZeebeAdapter;

/// Thin collaborator over [`ZeebeAdapter`] exposing the process-control
/// surface hosts use outside the worker runtime (§6), matching
/// `run_process`/`run_process_with_result`/`cancel_process_instance`/
/// `deploy_process`/`publish_message` from `pyzeebe`'s `ZeebeClient`.
#[derive(Clone)]
pub struct ZeebeClient {
    adapter: Arc<ZeebeAdapter>,
}

impl ZeebeClient {
    pub fn new(adapter: Arc<ZeebeAdapter>) -> Self {
        Self { adapter }
    }

    /// Start a process instance. `version = -1` means "latest".
    pub async fn run_process(
        &self,
        bpmn_process_id: impl Into<String>,
        variables: serde_json::Value,
        version: i32,
    ) -> Result<i64, ClientError> {
        self.adapter
            .create_process_instance(bpmn_process_id.into(), version, variables)
            .await
            .map_err(Into::into)
    }

    /// Start a process instance and wait for it to finish (S6).
    ///
    /// A `Deadline` transport error here specifically means the process did
    /// not finish in time, not a generic RPC timeout, so it is mapped to
    /// [`ClientError::ProcessTimeout`] rather than the taxonomy's default.
    pub async fn run_process_with_result(
        &self,
        bpmn_process_id: impl Into<String>,
        variables: serde_json::Value,
        version: i32,
        timeout_ms: i64,
        variables_to_fetch: Vec<String>,
    ) -> Result<(i64, serde_json::Value), ClientError> {
        self.adapter
            .create_process_instance_with_result(
                bpmn_process_id.into(),
                version,
                variables,
                timeout_ms,
                variables_to_fetch,
            )
            .await
            .map_err(|error| match error {
                ZeebeError::Deadline => ClientError::ProcessTimeout,
                other => other.into(),
            })
    }

    /// Cancel a running process instance. `NotFound` here means the instance
    /// itself is gone, not a missing process definition, so it is mapped to
    /// [`ClientError::ProcessInstanceNotFound`] rather than the taxonomy's
    /// default (`pyzeebe`'s `client.py` raises `ProcessInstanceNotFoundError`
    /// from this same call for the same reason).
    pub async fn cancel_process_instance(&self, process_instance_key: i64) -> Result<i64, ClientError> {
        self.adapter
            .cancel_process_instance(process_instance_key)
            .await
            .map_err(|error| match error {
                ZeebeError::NotFound(_) => ClientError::ProcessInstanceNotFound(process_instance_key),
                other => other.into(),
            })?;
        Ok(process_instance_key)
    }

    /// Deploy one or more process definition files, read from disk.
    pub async fn deploy_process(&self, process_file_paths: &[&str]) -> Result<String, ClientError> {
        let mut resources = Vec::with_capacity(process_file_paths.len());
        for path in process_file_paths {
            let content = tokio::fs::read(path)
                .await
                .map_err(|e| ClientError::ProcessInvalid(format!("{path}: {e}")))?;
            resources.push((path.to_string(), content));
        }
        self.adapter.deploy_resource(resources).await.map_err(Into::into)
    }

    pub async fn publish_message(
        &self,
        name: impl Into<String>,
        correlation_key: impl Into<String>,
        variables: serde_json::Value,
        time_to_live_ms: i64,
        message_id: Option<String>,
    ) -> Result<(), ClientError> {
        self.adapter
            .publish_message(name.into(), correlation_key.into(), time_to_live_ms, variables, message_id)
            .await
            .map_err(Into::into)
    }
}
