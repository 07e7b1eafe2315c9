//! Async client and worker runtime for a Zeebe-style workflow-orchestration
//! gateway: start/cancel/message processes via [`client::ZeebeClient`], and
//! run a long-lived job-worker via [`worker::ZeebeWorker`] against handlers
//! registered on a [`task::ZeebeTaskRouter`].

pub mod client;
pub mod errors;
pub mod grpc_internals;
pub mod job;
pub mod task;
pub mod variables;
pub mod worker;

pub use client::ZeebeClient;
pub use errors::{ClientError, HandlerError, RouterError, ZeebeError};
pub use job::{Job, JobController};
pub use task::{FnHandler, JobHandler, Task, TaskConfig, TaskConfigBuilder, ZeebeTaskRouter};
pub use worker::{WorkerConfig, ZeebeWorker};
