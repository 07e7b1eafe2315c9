use std::sync::Arc;

use crate::task::ExceptionHandler;

/// Immutable per-task configuration (§3).
#[derive(Clone)]
pub struct TaskConfig {
    /// Non-empty, unique within a worker (I1).
    pub task_type: String,
    pub exception_handler: Option<Arc<dyn ExceptionHandler>>,
    /// Per-activation lease requested from the gateway; must be > 0.
    pub timeout_ms: u64,
    /// Upper bound per poll round, >= 1.
    pub max_jobs_to_activate: u32,
    /// Back-pressure ceiling for in-flight activations, >= 1.
    pub max_running_jobs: u32,
    /// Subset of the job's variables the gateway must attach.
    pub variables_to_fetch: Vec<String>,
    /// When true, `variables_to_fetch` has exactly one element and the
    /// handler receives the bare value under `variable_name`.
    pub single_value: bool,
    pub variable_name: Option<String>,
}

impl std::fmt::Debug for TaskConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskConfig")
            .field("task_type", &self.task_type)
            .field("timeout_ms", &self.timeout_ms)
            .field("max_jobs_to_activate", &self.max_jobs_to_activate)
            .field("max_running_jobs", &self.max_running_jobs)
            .field("variables_to_fetch", &self.variables_to_fetch)
            .field("single_value", &self.single_value)
            .field("variable_name", &self.variable_name)
            .finish()
    }
}

/// Builder used by [`crate::task::ZeebeTaskRouter::task`] (§4.2).
pub struct TaskConfigBuilder {
    task_type: String,
    exception_handler: Option<Arc<dyn ExceptionHandler>>,
    timeout_ms: u64,
    max_jobs_to_activate: u32,
    max_running_jobs: u32,
    variables_to_fetch: Vec<String>,
    single_value: bool,
    variable_name: Option<String>,
}

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_JOBS_TO_ACTIVATE: u32 = 32;
pub const DEFAULT_MAX_RUNNING_JOBS: u32 = 32;

impl TaskConfigBuilder {
    pub fn new(task_type: impl Into<String>) -> Self {
        Self {
            task_type: task_type.into(),
            exception_handler: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_jobs_to_activate: DEFAULT_MAX_JOBS_TO_ACTIVATE,
            max_running_jobs: DEFAULT_MAX_RUNNING_JOBS,
            variables_to_fetch: Vec::new(),
            single_value: false,
            variable_name: None,
        }
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn max_jobs_to_activate(mut self, max_jobs: u32) -> Self {
        self.max_jobs_to_activate = max_jobs;
        self
    }

    pub fn max_running_jobs(mut self, max_running: u32) -> Self {
        self.max_running_jobs = max_running;
        self
    }

    /// Declare which variables the gateway should attach, in handler-argument
    /// order (P2). Stands in for the source's parameter-name introspection.
    pub fn fetch(mut self, variables: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.variables_to_fetch = variables.into_iter().map(Into::into).collect();
        self
    }

    /// Fetch exactly one variable and pass its bare value to the handler
    /// instead of a single-entry map.
    pub fn single_value(mut self, variable_name: impl Into<String>) -> Self {
        let name = variable_name.into();
        self.variables_to_fetch = vec![name.clone()];
        self.single_value = true;
        self.variable_name = Some(name);
        self
    }

    pub fn exception_handler(mut self, handler: Arc<dyn ExceptionHandler>) -> Self {
        self.exception_handler = Some(handler);
        self
    }

    /// Used by [`crate::task::ZeebeTaskRouter::task`] to decide whether to
    /// fall back to the router's own default handler.
    pub fn exception_handler_is_unset(&self) -> bool {
        self.exception_handler.is_none()
    }

    pub fn build(self) -> Result<TaskConfig, String> {
        if self.task_type.is_empty() {
            return Err("task type must not be empty".to_string());
        }
        if self.timeout_ms == 0 {
            return Err("timeout_ms must be > 0".to_string());
        }
        if self.max_jobs_to_activate == 0 {
            return Err("max_jobs_to_activate must be >= 1".to_string());
        }
        if self.max_running_jobs == 0 {
            return Err("max_running_jobs must be >= 1".to_string());
        }
        if self.single_value && self.variables_to_fetch.len() != 1 {
            return Err("single_value requires exactly one variable to fetch".to_string());
        }
        Ok(TaskConfig {
            task_type: self.task_type,
            exception_handler: self.exception_handler,
            timeout_ms: self.timeout_ms,
            max_jobs_to_activate: self.max_jobs_to_activate,
            max_running_jobs: self.max_running_jobs,
            variables_to_fetch: self.variables_to_fetch,
            single_value: self.single_value,
            variable_name: self.variable_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_timeout() {
        let result = TaskConfigBuilder::new("t").timeout_ms(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn rejects_single_value_without_exactly_one_fetch() {
        let result = TaskConfigBuilder::new("t")
            .fetch(["a", "b"])
            .single_value("a")
            .build();
        // single_value() always sets exactly one, so this succeeds — verify
        // the final state reflects single_value's own fetch list, not the
        // earlier `fetch(["a","b"])` call.
        let config = result.unwrap();
        assert_eq!(config.variables_to_fetch, vec!["a".to_string()]);
    }

    #[test]
    fn default_config_has_no_fetch_list() {
        let config = TaskConfigBuilder::new("t").build().unwrap();
        assert!(config.variables_to_fetch.is_empty());
        assert!(!config.single_value);
    }
}
