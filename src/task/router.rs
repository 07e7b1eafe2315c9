use std::sync::Arc;

use crate::errors::RouterError;
use crate::task::config::TaskConfigBuilder;
use crate::task::decorator::TaskDecorator;
use crate::task::exception_handler::ExceptionHandler;
use crate::task::handler::JobHandler;
use crate::task::task::Task;

/// An ordered collection of [`Task`], with registry-level `before`/`after`
/// decorators and a default exception handler — §3, §4.2.
///
/// Registries are value-like: [`ZeebeTaskRouter::include_router`] copies the
/// child's tasks into the parent, prepending the parent's chains onto each
/// child task's chains at inclusion time (so a router decorator added
/// *between* two `task()` registrations still applies to both once included
/// — I4, P5).
#[derive(Default)]
pub struct ZeebeTaskRouter {
    pub(crate) tasks: Vec<Task>,
    pub(crate) before: Vec<Arc<dyn TaskDecorator>>,
    pub(crate) after: Vec<Arc<dyn TaskDecorator>>,
    pub(crate) exception_handler: Option<Arc<dyn ExceptionHandler>>,
}

impl ZeebeTaskRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_before(mut self, before: Vec<Arc<dyn TaskDecorator>>) -> Self {
        self.before = before;
        self
    }

    pub fn with_after(mut self, after: Vec<Arc<dyn TaskDecorator>>) -> Self {
        self.after = after;
        self
    }

    pub fn with_exception_handler(mut self, handler: Arc<dyn ExceptionHandler>) -> Self {
        self.exception_handler = Some(handler);
        self
    }

    fn is_task_duplicate(&self, task_type: &str) -> Result<(), RouterError> {
        if self.tasks.iter().any(|t| t.task_type() == task_type) {
            Err(RouterError::DuplicateTaskType(task_type.to_string()))
        } else {
            Ok(())
        }
    }

    /// Register a handler for `task_type`, configured via the builder
    /// (§4.2). Fails with [`RouterError::DuplicateTaskType`] if already
    /// registered in this router.
    ///
    /// A task defined on a router inherits that router's `exception_handler`
    /// at registration time if the task config did not set its own.
    pub fn task(
        &mut self,
        task_type: impl Into<String>,
        handler: Arc<dyn JobHandler>,
        configure: impl FnOnce(TaskConfigBuilder) -> TaskConfigBuilder,
    ) -> Result<(), RouterError> {
        let task_type = task_type.into();
        self.is_task_duplicate(&task_type)?;

        let mut builder = configure(TaskConfigBuilder::new(task_type.clone()));
        if builder_exception_handler_unset(&builder) {
            if let Some(router_handler) = &self.exception_handler {
                builder = builder.exception_handler(router_handler.clone());
            }
        }
        let config = builder.build().map_err(RouterError::InvalidTaskConfig)?;

        self.tasks.push(Task {
            config,
            handler,
            before: Vec::new(),
            after: Vec::new(),
        });
        Ok(())
    }

    pub fn before(&mut self, decorator: Arc<dyn TaskDecorator>) {
        self.before.push(decorator);
    }

    pub fn after(&mut self, decorator: Arc<dyn TaskDecorator>) {
        self.after.push(decorator);
    }

    pub fn exception_handler(&mut self, handler: Arc<dyn ExceptionHandler>) {
        self.exception_handler = Some(handler);
    }

    pub fn get_task(&self, task_type: &str) -> Result<&Task, RouterError> {
        self.tasks
            .iter()
            .find(|t| t.task_type() == task_type)
            .ok_or_else(|| RouterError::TaskNotFound(task_type.to_string()))
    }

    pub fn remove_task(&mut self, task_type: &str) -> Result<Task, RouterError> {
        let index = self
            .tasks
            .iter()
            .position(|t| t.task_type() == task_type)
            .ok_or_else(|| RouterError::TaskNotFound(task_type.to_string()))?;
        Ok(self.tasks.remove(index))
    }

    /// Merge `other`'s tasks into `self`, prepending `self`'s decorator
    /// chains onto each of `other`'s task chains (I4, P5). Consumes `other`.
    pub fn include_router(&mut self, other: ZeebeTaskRouter) -> Result<(), RouterError> {
        for task_type in other.tasks.iter().map(Task::task_type) {
            self.is_task_duplicate(task_type)?;
        }

        for mut task in other.tasks {
            let mut before = self.before.clone();
            before.extend(task.before.drain(..));
            let mut after = task.after.drain(..).collect::<Vec<_>>();
            after.extend(self.after.clone());

            task.before = before;
            task.after = after;
            self.tasks.push(task);
        }
        Ok(())
    }
}

/// Builders don't expose their private fields; this checks by constructing a
/// throwaway config to see whether `exception_handler` was ever set, without
/// requiring `TaskConfigBuilder` to expose a getter solely for this purpose.
fn builder_exception_handler_unset(builder: &TaskConfigBuilder) -> bool {
    builder.exception_handler_is_unset()
}
