use async_trait::async_trait;
use futures::stream::BoxStream;

use super::proto;

/// The gateway's RPC surface, behind a trait so [`super::adapter::ZeebeAdapter`]
/// can be driven by a fake in tests without a live gRPC channel (§4.1).
///
/// Mirrors the `trait AuthService` / `GrpcClient<T>`-wrapper shape used for
/// the limit and auth clients in the wider example corpus: the production
/// impl wraps a concrete tonic client, tests supply an in-memory fake.
#[async_trait]
pub(crate) trait GatewayTransport: Send + Sync {
    async fn activate_jobs(
        &self,
        request: proto::ActivateJobsRequest,
    ) -> Result<BoxStream<'static, Result<proto::ActivatedJob, tonic::Status>>, tonic::Status>;

    async fn complete_job(
        &self,
        request: proto::CompleteJobRequest,
    ) -> Result<proto::CompleteJobResponse, tonic::Status>;

    async fn fail_job(
        &self,
        request: proto::FailJobRequest,
    ) -> Result<proto::FailJobResponse, tonic::Status>;

    async fn throw_error(
        &self,
        request: proto::ThrowErrorRequest,
    ) -> Result<proto::ThrowErrorResponse, tonic::Status>;

    async fn publish_message(
        &self,
        request: proto::PublishMessageRequest,
    ) -> Result<proto::PublishMessageResponse, tonic::Status>;

    async fn create_process_instance(
        &self,
        request: proto::CreateProcessInstanceRequest,
    ) -> Result<proto::CreateProcessInstanceResponse, tonic::Status>;

    async fn create_process_instance_with_result(
        &self,
        request: proto::CreateProcessInstanceWithResultRequest,
    ) -> Result<proto::CreateProcessInstanceWithResultResponse, tonic::Status>;

    async fn cancel_process_instance(
        &self,
        request: proto::CancelProcessInstanceRequest,
    ) -> Result<proto::CancelProcessInstanceResponse, tonic::Status>;

    async fn deploy_resource(
        &self,
        request: proto::DeployResourceRequest,
    ) -> Result<proto::DeployResourceResponse, tonic::Status>;

    async fn topology(
        &self,
        request: proto::TopologyRequest,
    ) -> Result<proto::TopologyResponse, tonic::Status>;
}

/// Production [`GatewayTransport`]: a thin wrapper over the generated tonic
/// client, cloneable the way `BpmnLiteConnection` wraps its channel.
#[derive(Clone)]
pub(crate) struct TonicGatewayTransport {
    client: proto::GatewayClient<tonic::transport::Channel>,
}

impl TonicGatewayTransport {
    pub async fn connect(endpoint: impl Into<String>) -> Result<Self, tonic::transport::Error> {
        let channel = tonic::transport::Channel::from_shared(endpoint.into())
            .expect("invalid gateway endpoint")
            .connect()
            .await?;
        Ok(Self {
            client: proto::GatewayClient::new(channel),
        })
    }

    pub fn connect_lazy(endpoint: impl Into<String>) -> Result<Self, tonic::transport::Error> {
        let channel = tonic::transport::Channel::from_shared(endpoint.into())
            .expect("invalid gateway endpoint")
            .connect_lazy();
        Ok(Self {
            client: proto::GatewayClient::new(channel),
        })
    }
}

#[async_trait]
impl GatewayTransport for TonicGatewayTransport {
    async fn activate_jobs(
        &self,
        request: proto::ActivateJobsRequest,
    ) -> Result<BoxStream<'static, Result<proto::ActivatedJob, tonic::Status>>, tonic::Status> {
        let mut client = self.client.clone();
        let stream = client.activate_jobs(request).await?.into_inner();
        Ok(Box::pin(stream))
    }

    async fn complete_job(
        &self,
        request: proto::CompleteJobRequest,
    ) -> Result<proto::CompleteJobResponse, tonic::Status> {
        let mut client = self.client.clone();
        Ok(client.complete_job(request).await?.into_inner())
    }

    async fn fail_job(
        &self,
        request: proto::FailJobRequest,
    ) -> Result<proto::FailJobResponse, tonic::Status> {
        let mut client = self.client.clone();
        Ok(client.fail_job(request).await?.into_inner())
    }

    async fn throw_error(
        &self,
        request: proto::ThrowErrorRequest,
    ) -> Result<proto::ThrowErrorResponse, tonic::Status> {
        let mut client = self.client.clone();
        Ok(client.throw_error(request).await?.into_inner())
    }

    async fn publish_message(
        &self,
        request: proto::PublishMessageRequest,
    ) -> Result<proto::PublishMessageResponse, tonic::Status> {
        let mut client = self.client.clone();
        Ok(client.publish_message(request).await?.into_inner())
    }

    async fn create_process_instance(
        &self,
        request: proto::CreateProcessInstanceRequest,
    ) -> Result<proto::CreateProcessInstanceResponse, tonic::Status> {
        let mut client = self.client.clone();
        Ok(client.create_process_instance(request).await?.into_inner())
    }

    async fn create_process_instance_with_result(
        &self,
        request: proto::CreateProcessInstanceWithResultRequest,
    ) -> Result<proto::CreateProcessInstanceWithResultResponse, tonic::Status> {
        let mut client = self.client.clone();
        Ok(client
            .create_process_instance_with_result(request)
            .await?
            .into_inner())
    }

    async fn cancel_process_instance(
        &self,
        request: proto::CancelProcessInstanceRequest,
    ) -> Result<proto::CancelProcessInstanceResponse, tonic::Status> {
        let mut client = self.client.clone();
        Ok(client.cancel_process_instance(request).await?.into_inner())
    }

    async fn deploy_resource(
        &self,
        request: proto::DeployResourceRequest,
    ) -> Result<proto::DeployResourceResponse, tonic::Status> {
        let mut client = self.client.clone();
        Ok(client.deploy_resource(request).await?.into_inner())
    }

    async fn topology(
        &self,
        request: proto::TopologyRequest,
    ) -> Result<proto::TopologyResponse, tonic::Status> {
        let mut client = self.client.clone();
        Ok(client.topology(request).await?.into_inner())
    }
}
