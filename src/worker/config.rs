use std::sync::Arc;
use std::time::Duration;

use crate::task::{ExceptionHandler, TaskDecorator};

const DEFAULT_REQUEST_TIMEOUT_MS: i64 = 10_000;
const DEFAULT_GRACE_PERIOD_MS: u64 = 30_000;

/// Defaults for a [`super::ZeebeWorker`] (§2 component I), a plain
/// struct-plus-builder in the same shape as `bpmn_integration/config.rs`'s
/// `WorkflowConfig`, adapted for worker construction rather than YAML
/// routing.
pub struct WorkerConfig {
    pub(crate) worker_name: String,
    pub(crate) request_timeout_ms: i64,
    pub(crate) tenant_ids: Vec<String>,
    pub(crate) before: Vec<Arc<dyn TaskDecorator>>,
    pub(crate) after: Vec<Arc<dyn TaskDecorator>>,
    pub(crate) exception_handler: Option<Arc<dyn ExceptionHandler>>,
    pub(crate) grace_period: Duration,
}

impl WorkerConfig {
    pub fn new(worker_name: impl Into<String>) -> Self {
        Self {
            worker_name: worker_name.into(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            tenant_ids: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
            exception_handler: None,
            grace_period: Duration::from_millis(DEFAULT_GRACE_PERIOD_MS),
        }
    }

    pub fn request_timeout_ms(mut self, request_timeout_ms: i64) -> Self {
        self.request_timeout_ms = request_timeout_ms;
        self
    }

    pub fn tenant_ids(mut self, tenant_ids: Vec<String>) -> Self {
        self.tenant_ids = tenant_ids;
        self
    }

    /// Worker-level `before` chain, run ahead of every task's own chain.
    pub fn before(mut self, before: Vec<Arc<dyn TaskDecorator>>) -> Self {
        self.before = before;
        self
    }

    /// Worker-level `after` chain, run behind every task's own chain.
    pub fn after(mut self, after: Vec<Arc<dyn TaskDecorator>>) -> Self {
        self.after = after;
        self
    }

    pub fn exception_handler(mut self, handler: Arc<dyn ExceptionHandler>) -> Self {
        self.exception_handler = Some(handler);
        self
    }

    /// How long `work()` waits for in-flight executors to drain after a
    /// graceful `stop()` before aborting them (§4.5).
    pub fn grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }
}
