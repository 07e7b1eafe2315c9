//! Generated gateway client code, re-exported under a short path.

#[allow(clippy::enum_variant_names)]
pub(crate) mod gen {
    tonic::include_proto!("zeebe.v1");
}

pub(crate) use gen::gateway_client::GatewayClient;
pub(crate) use gen::{
    ActivateJobsRequest, ActivatedJob, CancelProcessInstanceRequest, CancelProcessInstanceResponse,
    CompleteJobRequest, CompleteJobResponse, CreateProcessInstanceRequest,
    CreateProcessInstanceResponse, CreateProcessInstanceWithResultRequest,
    CreateProcessInstanceWithResultResponse, DeployResourceRequest, DeployResourceResponse,
    FailJobRequest, FailJobResponse, PublishMessageRequest, PublishMessageResponse,
    ThrowErrorRequest, ThrowErrorResponse, TopologyRequest, TopologyResponse,
};
