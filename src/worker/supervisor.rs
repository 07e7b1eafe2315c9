use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::errors::{RouterError, ZeebeError};
use crate::grpc_internals::ZeebeAdapter;
use crate::job::JobReporter;
use crate::task::{ExceptionHandler, Task, TaskDecorator, ZeebeTaskRouter};
use crate::worker::config::WorkerConfig;
use crate::worker::executor::JobExecutor;
use crate::worker::poller::{validate_poll_bounds, JobPoller};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Carried on the worker-wide `watch` channel pollers and the grace-period
/// wait both observe (§5 "a single cancellation signal ... reaches every
/// task").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownSignal {
    #[default]
    Running,
    /// Pollers stop fetching; executors get the grace period to drain.
    Graceful,
    /// Pollers stop fetching; in-flight executors are aborted immediately.
    Forced,
}

/// Owns the task registry and the per-task poller/executor pools (§4.5).
///
/// `work()` freezes the registry's decorator/exception-handler chains into
/// each task (merging the worker-level chains passed at construction) the
/// first time it runs; subsequent `work()` calls after a clean `stop()`
/// respawn pollers and executors against that same frozen task set (see
/// `DESIGN.md` for why re-entry is allowed rather than rejected — an open
/// question left unresolved in the source material).
#[derive(Clone)]
pub struct ZeebeWorker {
    inner: Arc<Inner>,
}

struct Inner {
    adapter: Arc<ZeebeAdapter>,
    worker_name: String,
    request_timeout_ms: i64,
    tenant_ids: Vec<String>,
    before: Mutex<Vec<Arc<dyn TaskDecorator>>>,
    after: Mutex<Vec<Arc<dyn TaskDecorator>>>,
    exception_handler: Option<Arc<dyn ExceptionHandler>>,
    grace_period: Duration,
    router: Mutex<Option<ZeebeTaskRouter>>,
    frozen_tasks: Mutex<Option<Vec<Arc<Task>>>>,
    state: Mutex<WorkerState>,
    shutdown: Mutex<Option<watch::Sender<ShutdownSignal>>>,
}

impl ZeebeWorker {
    /// Build a worker against a gateway adapter, with defaults (worker name,
    /// request timeout, decorator chains, grace period) supplied by a
    /// [`WorkerConfig`] rather than a long positional argument list.
    pub fn new(adapter: Arc<ZeebeAdapter>, config: WorkerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                adapter,
                worker_name: config.worker_name,
                request_timeout_ms: config.request_timeout_ms,
                tenant_ids: config.tenant_ids,
                before: Mutex::new(config.before),
                after: Mutex::new(config.after),
                exception_handler: config.exception_handler,
                grace_period: config.grace_period,
                router: Mutex::new(Some(ZeebeTaskRouter::new())),
                frozen_tasks: Mutex::new(None),
                state: Mutex::new(WorkerState::Idle),
                shutdown: Mutex::new(None),
            }),
        }
    }

    pub fn with_grace_period(self, grace_period: Duration) -> Self {
        // Safe: only called before `work()`, and `Inner` is not yet shared.
        let inner = Arc::try_unwrap(self.inner).unwrap_or_else(|arc| {
            panic!("with_grace_period must be called before the worker is cloned/shared: {:?}", Arc::strong_count(&arc))
        });
        Self {
            inner: Arc::new(Inner { grace_period, ..inner }),
        }
    }

    fn with_router<R>(&self, f: impl FnOnce(&mut ZeebeTaskRouter) -> R) -> Result<R, RouterError> {
        let mut guard = self.inner.router.lock().unwrap();
        match guard.as_mut() {
            Some(router) => Ok(f(router)),
            None => panic!("registry mutated after work() took ownership of it"),
        }
    }

    pub fn task(
        &self,
        task_type: impl Into<String>,
        handler: Arc<dyn crate::task::JobHandler>,
        configure: impl FnOnce(crate::task::TaskConfigBuilder) -> crate::task::TaskConfigBuilder,
    ) -> Result<(), RouterError> {
        self.with_router(|r| r.task(task_type, handler, configure))?
    }

    /// Add a worker-level `before` decorator, applied ahead of every task's
    /// own chain (including tasks registered earlier). Distinct from
    /// [`ZeebeTaskRouter::before`], which only affects `include_router`
    /// composition of that specific router.
    pub fn before(&self, decorator: Arc<dyn TaskDecorator>) {
        self.inner.before.lock().unwrap().push(decorator);
    }

    /// Add a worker-level `after` decorator, applied behind every task's own
    /// chain. See [`Self::before`].
    pub fn after(&self, decorator: Arc<dyn TaskDecorator>) {
        self.inner.after.lock().unwrap().push(decorator);
    }

    pub fn include_router(&self, other: ZeebeTaskRouter) -> Result<(), RouterError> {
        self.with_router(|r| r.include_router(other))?
    }

    fn frozen_tasks(&self) -> Vec<Arc<Task>> {
        let mut frozen = self.inner.frozen_tasks.lock().unwrap();
        if let Some(tasks) = frozen.as_ref() {
            return tasks.clone();
        }

        let router = self
            .inner
            .router
            .lock()
            .unwrap()
            .take()
            .expect("frozen_tasks called more than once without a router");

        let worker_before = self.inner.before.lock().unwrap().clone();
        let worker_after = self.inner.after.lock().unwrap().clone();
        let tasks: Vec<Arc<Task>> = router
            .tasks
            .into_iter()
            .map(|mut task| {
                let mut before = worker_before.clone();
                before.append(&mut task.before);
                let mut after = std::mem::take(&mut task.after);
                after.extend(worker_after.clone());
                task.before = before;
                task.after = after;
                if task.config.exception_handler.is_none() {
                    task.config.exception_handler = self.inner.exception_handler.clone();
                }
                Arc::new(task)
            })
            .collect();

        *frozen = Some(tasks.clone());
        tasks
    }

    /// Validate the frozen registry (I1, I3) and spawn one poller + one
    /// executor pool per task. Resolves once every poller/executor has
    /// stopped, either due to a clean `stop()` or a non-retryable poller
    /// error (§4.5 "observes health").
    pub async fn work(&self) -> Result<(), ZeebeError> {
        {
            let mut state = self.inner.state.lock().unwrap();
            match *state {
                WorkerState::Running => {
                    return Err(ZeebeError::InvalidState("worker is already running".to_string()))
                }
                WorkerState::Stopping => {
                    return Err(ZeebeError::InvalidState("worker is stopping".to_string()))
                }
                WorkerState::Idle | WorkerState::Stopped => *state = WorkerState::Running,
            }
        }

        let tasks = self.frozen_tasks();
        for task in &tasks {
            validate_poll_bounds(task).map_err(ZeebeError::InvalidState)?;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(ShutdownSignal::Running);
        *self.inner.shutdown.lock().unwrap() = Some(shutdown_tx);

        let mut poller_set = tokio::task::JoinSet::new();
        let mut executor_set = tokio::task::JoinSet::new();

        for task in tasks {
            let (sender, receiver) = mpsc::channel(task.config.max_running_jobs as usize);
            let poller = JobPoller::new(
                task.clone(),
                self.inner.adapter.clone(),
                sender,
                self.inner.worker_name.clone(),
                self.inner.request_timeout_ms,
                self.inner.tenant_ids.clone(),
            );
            let reporter: Arc<dyn JobReporter> = self.inner.adapter.clone();
            let executor = JobExecutor::new(task.clone(), reporter);

            let poller_shutdown = shutdown_rx.clone();
            poller_set.spawn(async move { poller.run(poller_shutdown).await });
            executor_set.spawn(async move { executor.run(receiver).await });
        }

        let mut first_error = None;
        while let Some(joined) = poller_set.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    tracing::error!(%error, "a poller terminated with a non-retryable error, stopping worker");
                    first_error.get_or_insert(error);
                    self.signal(ShutdownSignal::Graceful);
                }
                Err(join_error) => tracing::error!(error = %join_error, "poller task panicked"),
            }
        }

        let mut force_rx = shutdown_rx.clone();
        let grace = self.inner.grace_period;
        let drained = tokio::select! {
            _ = async { while executor_set.join_next().await.is_some() {} } => true,
            _ = tokio::time::sleep(grace) => false,
            _ = async {
                loop {
                    if *force_rx.borrow() == ShutdownSignal::Forced { return; }
                    if force_rx.changed().await.is_err() { return; }
                }
            } => false,
        };
        if !drained {
            tracing::warn!("executors did not drain (grace period elapsed or force-stop requested), abandoning remaining jobs");
            executor_set.abort_all();
        }

        *self.inner.state.lock().unwrap() = WorkerState::Stopped;

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn signal(&self, signal: ShutdownSignal) {
        if let Some(tx) = self.inner.shutdown.lock().unwrap().as_ref() {
            let _ = tx.send(signal);
        }
    }

    /// Graceful stop: idempotent. Pollers stop fetching immediately;
    /// in-flight executors get up to the configured grace period to finish
    /// before being aborted.
    pub fn stop(&self) {
        let mut state = self.inner.state.lock().unwrap();
        if *state == WorkerState::Running {
            *state = WorkerState::Stopping;
        }
        drop(state);
        self.signal(ShutdownSignal::Graceful);
    }

    /// Hard stop: pollers stop fetching and in-flight executors are aborted
    /// without waiting for the grace period (§4.5 `stop(force=true)`).
    pub fn stop_force(&self) {
        let mut state = self.inner.state.lock().unwrap();
        if *state == WorkerState::Running {
            *state = WorkerState::Stopping;
        }
        drop(state);
        self.signal(ShutdownSignal::Forced);
    }
}
