//! A [`Task`] binds a job type to a handler, its decode/activation config,
//! and its decorator/exception-handler chains. [`ZeebeTaskRouter`] is the
//! registry that groups tasks before a worker adopts them (§3, §4.2).

mod config;
mod decorator;
mod exception_handler;
mod handler;
mod router;
#[allow(clippy::module_inception)]
mod task;

pub use config::{TaskConfig, TaskConfigBuilder};
pub use decorator::TaskDecorator;
pub use exception_handler::{DefaultExceptionHandler, ExceptionHandler};
pub use handler::{FnHandler, JobHandler};
pub use router::ZeebeTaskRouter;
pub use task::Task;
