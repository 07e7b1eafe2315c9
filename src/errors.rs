//! Error taxonomy for the gateway adapter, the router/worker, and the
//! user-facing client façade.

use thiserror::Error;

/// Errors returned by every `ZeebeAdapter` operation.
///
/// Non-retryable: [`ZeebeError::NotFound`], [`ZeebeError::InvalidState`],
/// [`ZeebeError::AlreadyExists`], [`ZeebeError::InvalidPayload`].
/// Retryable: [`ZeebeError::BackPressure`], [`ZeebeError::Unavailable`],
/// [`ZeebeError::Internal`], [`ZeebeError::Deadline`].
#[derive(Debug, Error, Clone)]
pub enum ZeebeError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("gateway back pressure")]
    BackPressure,
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
    #[error("internal gateway error: {0}")]
    Internal(String),
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("deadline exceeded")]
    Deadline,
    #[error("cancelled")]
    Cancelled,
}

impl ZeebeError {
    /// Whether a caller may retry the same request after backing off.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ZeebeError::BackPressure
                | ZeebeError::Unavailable(_)
                | ZeebeError::Internal(_)
                | ZeebeError::Deadline
        )
    }
}

impl From<tonic::Status> for ZeebeError {
    fn from(status: tonic::Status) -> Self {
        use tonic::Code;
        let message = status.message().to_string();
        match status.code() {
            Code::NotFound => ZeebeError::NotFound(message),
            Code::FailedPrecondition | Code::InvalidArgument => ZeebeError::InvalidState(message),
            Code::AlreadyExists => ZeebeError::AlreadyExists(message),
            Code::ResourceExhausted => ZeebeError::BackPressure,
            Code::Unavailable => ZeebeError::Unavailable(message),
            Code::DeadlineExceeded => ZeebeError::Deadline,
            Code::Cancelled => ZeebeError::Cancelled,
            _ => ZeebeError::Internal(message),
        }
    }
}

impl From<tonic::transport::Error> for ZeebeError {
    fn from(error: tonic::transport::Error) -> Self {
        ZeebeError::Unavailable(error.to_string())
    }
}

/// User-visible errors surfaced from the `ZeebeClient` façade (§6/§7).
#[derive(Debug, Error, Clone)]
pub enum ClientError {
    #[error("process definition not found: {0}")]
    ProcessDefinitionNotFound(String),
    #[error("process instance not found: {0}")]
    ProcessInstanceNotFound(i64),
    #[error("process has no start event: {0}")]
    ProcessDefinitionHasNoStartEvent(String),
    #[error("invalid JSON variables: {0}")]
    InvalidJson(String),
    #[error("process did not finish within the requested timeout")]
    ProcessTimeout,
    #[error("a message with this id already exists: {0}")]
    MessageAlreadyExists(String),
    #[error("one or more deployment resources were invalid: {0}")]
    ProcessInvalid(String),
    #[error("gateway is in back pressure, retry after backoff")]
    ZeebeBackPressure,
    #[error("gateway unavailable: {0}")]
    ZeebeGatewayUnavailable(String),
    #[error("internal gateway error: {0}")]
    ZeebeInternal(String),
}

impl From<ZeebeError> for ClientError {
    fn from(error: ZeebeError) -> Self {
        match error {
            ZeebeError::NotFound(m) => ClientError::ProcessDefinitionNotFound(m),
            ZeebeError::InvalidState(m) => ClientError::ProcessDefinitionHasNoStartEvent(m),
            ZeebeError::AlreadyExists(m) => ClientError::MessageAlreadyExists(m),
            ZeebeError::InvalidPayload(m) => ClientError::InvalidJson(m),
            ZeebeError::BackPressure => ClientError::ZeebeBackPressure,
            ZeebeError::Unavailable(m) => ClientError::ZeebeGatewayUnavailable(m),
            ZeebeError::Internal(m) => ClientError::ZeebeInternal(m),
            ZeebeError::Deadline => ClientError::ZeebeInternal("deadline exceeded".into()),
            ZeebeError::Cancelled => ClientError::ZeebeInternal("cancelled".into()),
        }
    }
}

/// Errors from router/registry mutation (§4.2).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("task type already registered: {0}")]
    DuplicateTaskType(String),
    #[error("task type not found: {0}")]
    TaskNotFound(String),
    #[error("invalid task config: {0}")]
    InvalidTaskConfig(String),
}

/// A handler-raised error, routed per §4.4/§7.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A domain-level failure: maps to `throw_error`, not a transport failure.
    #[error("business error {code}: {message:?}")]
    Business { code: String, message: Option<String> },
    /// Any other handler failure: routed to the nearest exception handler.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn business(code: impl Into<String>, message: Option<String>) -> Self {
        HandlerError::Business {
            code: code.into(),
            message,
        }
    }
}

/// Returned by [`crate::job::JobController`] terminal operations once a job
/// has already been terminated (I2, §4.4 controller contract).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("job already terminated")]
pub struct AlreadyTerminated;
