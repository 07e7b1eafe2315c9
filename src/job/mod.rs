//! The per-activation [`Job`] record and its mutable [`JobController`]
//! collaborator (§3, §4.4).

mod controller;
#[allow(clippy::module_inception)]
mod job;
mod reporter;

pub use controller::JobController;
pub use job::Job;
pub use reporter::JobReporter;
