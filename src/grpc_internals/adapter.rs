use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_stream::StreamExt;

use crate::errors::ZeebeError;
use crate::job::{Job, JobReporter};

use super::proto;
use super::transport::{GatewayTransport, TonicGatewayTransport};

/// Parameters for one `ActivateJobs` poll round (§4.1, §4.3).
#[derive(Debug, Clone)]
pub struct ActivateJobsParams {
    pub task_type: String,
    pub worker: String,
    pub timeout_ms: i64,
    pub max_jobs_to_activate: i32,
    pub variables_to_fetch: Vec<String>,
    pub request_timeout_ms: i64,
    pub tenant_ids: Vec<String>,
}

/// Typed wrapper over the gateway's RPCs (§4.1). Holds the transport-retry
/// state machine: a bounded or infinite (`-1`) retry budget for connection
/// establishment, terminating in a `Closed` state once exhausted.
///
/// `-1` closed sentinel and the `AtomicI64` attempt counter are grounded on
/// the same lock-free retry bookkeeping shape `cloud-common`'s `GrpcClient`
/// uses around its inner service calls.
pub struct ZeebeAdapter {
    transport: Arc<dyn GatewayTransport>,
    max_connection_retries: i64,
    attempts: AtomicI64,
    closed: std::sync::atomic::AtomicBool,
}

impl ZeebeAdapter {
    pub(crate) fn new(transport: Arc<dyn GatewayTransport>, max_connection_retries: i64) -> Self {
        Self {
            transport,
            max_connection_retries,
            attempts: AtomicI64::new(0),
            closed: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Connect to a live gateway over gRPC. The sole public entry point for
    /// building an adapter; the [`GatewayTransport`] seam underneath stays
    /// internal, so hosts never need to name it.
    pub async fn connect(
        endpoint: impl Into<String>,
        max_connection_retries: i64,
    ) -> Result<Self, ZeebeError> {
        let transport = TonicGatewayTransport::connect(endpoint).await?;
        Ok(Self::new(Arc::new(transport), max_connection_retries))
    }

    /// Same as [`Self::connect`], but doesn't wait for the channel to come up
    /// before returning (tonic lazily connects on first RPC).
    pub fn connect_lazy(
        endpoint: impl Into<String>,
        max_connection_retries: i64,
    ) -> Result<Self, ZeebeError> {
        let transport = TonicGatewayTransport::connect_lazy(endpoint)?;
        Ok(Self::new(Arc::new(transport), max_connection_retries))
    }

    /// Once `true`, every operation fails immediately with `Unavailable`
    /// without attempting the RPC (§4.1 "terminal Closed state").
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn record_success(&self) {
        self.attempts.store(0, Ordering::Release);
    }

    fn record_failure(&self, error: ZeebeError) -> ZeebeError {
        if error.is_retryable() {
            let attempts = self.attempts.fetch_add(1, Ordering::AcqRel) + 1;
            if self.max_connection_retries >= 0 && attempts > self.max_connection_retries {
                self.closed.store(true, Ordering::Release);
                tracing::error!(
                    attempts,
                    max_connection_retries = self.max_connection_retries,
                    "adapter exhausted connection retries, entering Closed state"
                );
            }
        }
        error
    }

    async fn call<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, tonic::Status>>,
    ) -> Result<T, ZeebeError> {
        if self.is_closed() {
            return Err(ZeebeError::Unavailable(
                "adapter closed: max_connection_retries exceeded".to_string(),
            ));
        }
        match fut.await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(status) => Err(self.record_failure(status.into())),
        }
    }

    /// Poll for jobs. Drains the whole server-stream batch before returning,
    /// so the poller sees a plain `Vec<Job>` per round (§4.3).
    pub async fn activate_jobs(&self, params: ActivateJobsParams) -> Result<Vec<Job>, ZeebeError> {
        if self.is_closed() {
            return Err(ZeebeError::Unavailable(
                "adapter closed: max_connection_retries exceeded".to_string(),
            ));
        }

        let request = proto::ActivateJobsRequest {
            r#type: params.task_type,
            worker: params.worker,
            timeout: params.timeout_ms,
            max_jobs_to_activate: params.max_jobs_to_activate,
            fetch_variable: params.variables_to_fetch,
            request_timeout: params.request_timeout_ms,
            tenant_ids: params.tenant_ids,
        };

        let mut stream = match self.transport.activate_jobs(request).await {
            Ok(stream) => stream,
            Err(status) => return Err(self.record_failure(status.into())),
        };

        let mut jobs = Vec::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(activated) => jobs.push(decode_activated_job(activated)?),
                Err(status) => return Err(self.record_failure(status.into())),
            }
        }
        self.record_success();
        Ok(jobs)
    }

    pub async fn create_process_instance(
        &self,
        bpmn_process_id: String,
        version: i32,
        variables: serde_json::Value,
    ) -> Result<i64, ZeebeError> {
        let request = proto::CreateProcessInstanceRequest {
            bpmn_process_id,
            version,
            variables: encode_variables(&variables)?,
        };
        let response = self.call(self.transport.create_process_instance(request)).await?;
        Ok(response.process_instance_key)
    }

    pub async fn create_process_instance_with_result(
        &self,
        bpmn_process_id: String,
        version: i32,
        variables: serde_json::Value,
        timeout_ms: i64,
        fetch_variables: Vec<String>,
    ) -> Result<(i64, serde_json::Value), ZeebeError> {
        let request = proto::CreateProcessInstanceWithResultRequest {
            bpmn_process_id,
            version,
            variables: encode_variables(&variables)?,
            request_timeout: timeout_ms,
            fetch_variables,
        };
        let response = self
            .call(self.transport.create_process_instance_with_result(request))
            .await?;
        let variables = decode_variables(&response.variables)?;
        Ok((response.process_instance_key, variables))
    }

    pub async fn cancel_process_instance(&self, process_instance_key: i64) -> Result<(), ZeebeError> {
        let request = proto::CancelProcessInstanceRequest { process_instance_key };
        self.call(self.transport.cancel_process_instance(request)).await?;
        Ok(())
    }

    pub async fn publish_message(
        &self,
        name: String,
        correlation_key: String,
        time_to_live_ms: i64,
        variables: serde_json::Value,
        message_id: Option<String>,
    ) -> Result<(), ZeebeError> {
        let request = proto::PublishMessageRequest {
            name,
            correlation_key,
            time_to_live: time_to_live_ms,
            variables: encode_variables(&variables)?,
            message_id: message_id.unwrap_or_default(),
        };
        self.call(self.transport.publish_message(request)).await?;
        Ok(())
    }

    pub async fn deploy_resource(
        &self,
        resources: Vec<(String, Vec<u8>)>,
    ) -> Result<String, ZeebeError> {
        let request = proto::DeployResourceRequest {
            resources: resources
                .into_iter()
                .map(|(name, content)| proto::gen::deploy_resource_request::Resource { name, content })
                .collect(),
        };
        let response = self.call(self.transport.deploy_resource(request)).await?;
        Ok(response.key)
    }

    pub async fn topology(&self) -> Result<Vec<String>, ZeebeError> {
        let response = self
            .call(self.transport.topology(proto::TopologyRequest {}))
            .await?;
        Ok(response.brokers)
    }
}

#[async_trait]
impl JobReporter for ZeebeAdapter {
    async fn complete_job(&self, key: i64, variables: serde_json::Value) -> Result<(), ZeebeError> {
        let request = proto::CompleteJobRequest {
            job_key: key,
            variables: encode_variables(&variables)?,
        };
        self.call(self.transport.complete_job(request)).await?;
        Ok(())
    }

    async fn fail_job(
        &self,
        key: i64,
        retries: i32,
        message: String,
        retry_backoff_ms: u64,
        variables: Option<serde_json::Value>,
    ) -> Result<(), ZeebeError> {
        let variables = variables.unwrap_or_else(|| serde_json::json!({}));
        let request = proto::FailJobRequest {
            job_key: key,
            retries,
            error_message: message,
            retry_back_off: retry_backoff_ms as i64,
            variables: encode_variables(&variables)?,
        };
        self.call(self.transport.fail_job(request)).await?;
        Ok(())
    }

    async fn throw_error(
        &self,
        key: i64,
        error_code: String,
        message: Option<String>,
        variables: Option<serde_json::Value>,
    ) -> Result<(), ZeebeError> {
        let variables = variables.unwrap_or_else(|| serde_json::json!({}));
        let request = proto::ThrowErrorRequest {
            job_key: key,
            error_code,
            error_message: message.unwrap_or_default(),
            variables: encode_variables(&variables)?,
        };
        self.call(self.transport.throw_error(request)).await?;
        Ok(())
    }
}

impl std::fmt::Debug for ZeebeAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZeebeAdapter")
            .field("max_connection_retries", &self.max_connection_retries)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn encode_variables(variables: &serde_json::Value) -> Result<String, ZeebeError> {
    if !variables.is_object() && !variables.is_null() {
        return Err(ZeebeError::InvalidPayload(
            "variables must be a JSON object".to_string(),
        ));
    }
    serde_json::to_string(variables).map_err(|e| ZeebeError::InvalidPayload(e.to_string()))
}

fn decode_variables(raw: &str) -> Result<serde_json::Value, ZeebeError> {
    if raw.is_empty() {
        return Ok(serde_json::json!({}));
    }
    serde_json::from_str(raw).map_err(|e| ZeebeError::InvalidPayload(e.to_string()))
}

fn decode_activated_job(activated: proto::ActivatedJob) -> Result<Job, ZeebeError> {
    Ok(Job {
        key: activated.key,
        job_type: activated.r#type,
        process_instance_key: activated.process_instance_key,
        bpmn_process_id: activated.bpmn_process_id,
        process_definition_version: activated.process_definition_version,
        process_definition_key: activated.process_definition_key,
        element_id: activated.element_id,
        element_instance_key: activated.element_instance_key,
        worker: activated.worker,
        retries: activated.retries,
        deadline: activated.deadline,
        variables: decode_variables(&activated.variables)?,
        custom_headers: activated.custom_headers,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures::stream::{self, BoxStream};

    use super::*;

    #[derive(Default)]
    struct FakeTransport {
        activate_responses: Mutex<Vec<Result<Vec<proto::ActivatedJob>, tonic::Status>>>,
        complete_calls: Mutex<Vec<i64>>,
        create_with_result_responses:
            Mutex<Vec<Result<proto::CreateProcessInstanceWithResultResponse, tonic::Status>>>,
        publish_responses: Mutex<Vec<Result<proto::PublishMessageResponse, tonic::Status>>>,
    }

    #[async_trait]
    impl GatewayTransport for FakeTransport {
        async fn activate_jobs(
            &self,
            _request: proto::ActivateJobsRequest,
        ) -> Result<BoxStream<'static, Result<proto::ActivatedJob, tonic::Status>>, tonic::Status>
        {
            let next = self.activate_responses.lock().unwrap().remove(0);
            match next {
                Ok(jobs) => Ok(Box::pin(stream::iter(jobs.into_iter().map(Ok)))),
                Err(status) => Err(status),
            }
        }

        async fn complete_job(
            &self,
            request: proto::CompleteJobRequest,
        ) -> Result<proto::CompleteJobResponse, tonic::Status> {
            self.complete_calls.lock().unwrap().push(request.job_key);
            Ok(proto::CompleteJobResponse {})
        }

        async fn fail_job(
            &self,
            _request: proto::FailJobRequest,
        ) -> Result<proto::FailJobResponse, tonic::Status> {
            Ok(proto::FailJobResponse {})
        }

        async fn throw_error(
            &self,
            _request: proto::ThrowErrorRequest,
        ) -> Result<proto::ThrowErrorResponse, tonic::Status> {
            Ok(proto::ThrowErrorResponse {})
        }

        async fn publish_message(
            &self,
            _request: proto::PublishMessageRequest,
        ) -> Result<proto::PublishMessageResponse, tonic::Status> {
            let mut queued = self.publish_responses.lock().unwrap();
            if queued.is_empty() {
                Ok(proto::PublishMessageResponse {})
            } else {
                queued.remove(0)
            }
        }

        async fn create_process_instance(
            &self,
            _request: proto::CreateProcessInstanceRequest,
        ) -> Result<proto::CreateProcessInstanceResponse, tonic::Status> {
            Ok(proto::CreateProcessInstanceResponse {
                process_instance_key: 1,
            })
        }

        async fn create_process_instance_with_result(
            &self,
            _request: proto::CreateProcessInstanceWithResultRequest,
        ) -> Result<proto::CreateProcessInstanceWithResultResponse, tonic::Status> {
            let mut queued = self.create_with_result_responses.lock().unwrap();
            if queued.is_empty() {
                Ok(proto::CreateProcessInstanceWithResultResponse {
                    process_instance_key: 1,
                    variables: "{}".to_string(),
                })
            } else {
                queued.remove(0)
            }
        }

        async fn cancel_process_instance(
            &self,
            _request: proto::CancelProcessInstanceRequest,
        ) -> Result<proto::CancelProcessInstanceResponse, tonic::Status> {
            Ok(proto::CancelProcessInstanceResponse {})
        }

        async fn deploy_resource(
            &self,
            _request: proto::DeployResourceRequest,
        ) -> Result<proto::DeployResourceResponse, tonic::Status> {
            Ok(proto::DeployResourceResponse { key: "1".to_string() })
        }

        async fn topology(
            &self,
            _request: proto::TopologyRequest,
        ) -> Result<proto::TopologyResponse, tonic::Status> {
            Ok(proto::TopologyResponse { brokers: vec![] })
        }
    }

    fn activated_job(key: i64) -> proto::ActivatedJob {
        proto::ActivatedJob {
            key,
            r#type: "t".to_string(),
            process_instance_key: 1,
            bpmn_process_id: "p".to_string(),
            process_definition_version: 1,
            process_definition_key: 1,
            element_id: "e".to_string(),
            element_instance_key: 1,
            worker: "w".to_string(),
            retries: 3,
            deadline: 0,
            variables: "{}".to_string(),
            custom_headers: Default::default(),
            tenant_id: String::new(),
        }
    }

    fn sample_params() -> ActivateJobsParams {
        ActivateJobsParams {
            task_type: "t".to_string(),
            worker: "w".to_string(),
            timeout_ms: 1000,
            max_jobs_to_activate: 5,
            variables_to_fetch: vec![],
            request_timeout_ms: 1000,
            tenant_ids: vec![],
        }
    }

    // S4
    #[tokio::test]
    async fn retry_counter_resets_after_success_below_limit() {
        let transport = Arc::new(FakeTransport::default());
        *transport.activate_responses.lock().unwrap() = vec![
            Err(tonic::Status::unavailable("down")),
            Err(tonic::Status::unavailable("down")),
            Err(tonic::Status::unavailable("down")),
            Ok(vec![activated_job(1)]),
        ];
        let adapter = ZeebeAdapter::new(transport, 5);

        for _ in 0..3 {
            assert!(adapter.activate_jobs(sample_params()).await.is_err());
        }
        let jobs = adapter.activate_jobs(sample_params()).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(!adapter.is_closed());
    }

    // S4
    #[tokio::test]
    async fn adapter_closes_after_exceeding_retry_budget() {
        let transport = Arc::new(FakeTransport::default());
        *transport.activate_responses.lock().unwrap() = vec![
            Err(tonic::Status::unavailable("down")),
            Err(tonic::Status::unavailable("down")),
            Err(tonic::Status::unavailable("down")),
        ];
        let adapter = ZeebeAdapter::new(transport, 2);

        for _ in 0..3 {
            let _ = adapter.activate_jobs(sample_params()).await;
        }
        assert!(adapter.is_closed());

        let result = adapter.activate_jobs(sample_params()).await;
        assert!(matches!(result, Err(ZeebeError::Unavailable(_))));
    }

    #[tokio::test]
    async fn decode_error_in_variables_is_invalid_payload() {
        let transport = Arc::new(FakeTransport::default());
        let mut job = activated_job(1);
        job.variables = "not json".to_string();
        *transport.activate_responses.lock().unwrap() = vec![Ok(vec![job])];
        let adapter = ZeebeAdapter::new(transport, -1);

        let result = adapter.activate_jobs(sample_params()).await;
        assert!(matches!(result, Err(ZeebeError::InvalidPayload(_))));
    }

    #[tokio::test]
    async fn complete_job_forwards_to_transport() {
        let transport = Arc::new(FakeTransport::default());
        let adapter = ZeebeAdapter::new(transport.clone(), -1);
        adapter.complete_job(42, serde_json::json!({"a": 1})).await.unwrap();
        assert_eq!(transport.complete_calls.lock().unwrap().as_slice(), [42]);
    }

    // S6: a DeadlineExceeded status on create_process_instance_with_result
    // surfaces as ZeebeError::Deadline; ZeebeClient maps this further to
    // ClientError::ProcessTimeout.
    #[tokio::test]
    async fn create_process_instance_with_result_deadline_is_not_retried_as_success() {
        let transport = Arc::new(FakeTransport::default());
        transport
            .create_with_result_responses
            .lock()
            .unwrap()
            .push(Err(tonic::Status::deadline_exceeded("timed out waiting for result")));
        let adapter = ZeebeAdapter::new(transport, -1);

        let result = adapter
            .create_process_instance_with_result(
                "p".to_string(),
                -1,
                serde_json::json!({}),
                1000,
                vec![],
            )
            .await;
        assert!(matches!(result, Err(ZeebeError::Deadline)));
    }

    // S7: an AlreadyExists status on publish_message (duplicate message id)
    // surfaces as ZeebeError::AlreadyExists; ZeebeClient maps this further to
    // ClientError::MessageAlreadyExists.
    #[tokio::test]
    async fn publish_message_duplicate_id_is_already_exists() {
        let transport = Arc::new(FakeTransport::default());
        transport
            .publish_responses
            .lock()
            .unwrap()
            .push(Err(tonic::Status::already_exists("message id already exists")));
        let adapter = ZeebeAdapter::new(transport, -1);

        let result = adapter
            .publish_message(
                "order-created".to_string(),
                "order-1".to_string(),
                60_000,
                serde_json::json!({}),
                Some("dup-id".to_string()),
            )
            .await;
        assert!(matches!(result, Err(ZeebeError::AlreadyExists(_))));
    }
}
