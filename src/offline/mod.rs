//! Client-side support for using the API without a connection.
//!
//! Write requests that cannot be delivered are kept in an [OfflineStore] and sent again in
//! order by [replay] once the API is reachable. Every queued request carries a request ID
//! that the server uses as an idempotency key, so a request is applied at most once even if
//! it is delivered several times.

mod client;
mod queue;
mod replay;
mod transport;

#[cfg(test)]
mod fake_transport;

pub use client::{OfflineClient, OfflineError, RequestOutcome};
pub use queue::{Method, OfflineStore, QueuedRequest};
pub use replay::{ReplayReport, replay};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport, TransportError};
