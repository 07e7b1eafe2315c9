//! The `ZeebeClient` façade: the collaborator hosts use to start/cancel
//! process instances and publish messages, ported from
//! `original_source/pyzeebe/client/client.py` (§6).

mod client;

pub use client::ZeebeClient;
