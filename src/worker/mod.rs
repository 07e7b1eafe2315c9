//! The worker runtime: one [`poller::JobPoller`] + [`executor::JobExecutor`]
//! pool per task, owned and supervised by [`supervisor::ZeebeWorker`] (§4.3,
//! §4.4, §4.5).

mod config;
mod executor;
mod poller;
mod supervisor;

pub use config::WorkerConfig;
pub use executor::JobExecutor;
pub use poller::JobPoller;
pub use supervisor::{ShutdownSignal, ZeebeWorker};
