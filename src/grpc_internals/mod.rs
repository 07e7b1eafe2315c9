//! The gateway RPC surface: generated client code, the [`GatewayTransport`]
//! seam, and [`ZeebeAdapter`]'s retry/taxonomy logic on top of it (§4.1).

mod adapter;
mod proto;
mod transport;

pub use adapter::{ActivateJobsParams, ZeebeAdapter};
pub(crate) use transport::{GatewayTransport, TonicGatewayTransport};
