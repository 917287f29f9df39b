//! Sending the queued requests once the API is reachable again.

use crate::{
    Error,
    offline::{
        queue::OfflineStore,
        transport::{ApiRequest, Transport},
    },
};

/// The outcome of one pass over the queue.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayReport {
    /// The requests the API accepted, these were removed from the queue.
    pub replayed: usize,
    /// The requests that could not be sent or were rejected.
    pub failed: usize,
    /// The requests still queued after the pass.
    pub remaining: usize,
}

/// Send every queued request to the API, oldest first.
///
/// Requests are sent one at a time. A request that gets a 2xx response is removed from the
/// queue. Any other status or a transport error leaves the request queued for the next pass
/// and the replay moves on to the next request. There is no backoff, call this again later
/// to retry.
///
/// Each request carries its request ID as the idempotency key, so a request that reached the
/// server on an earlier pass but whose response was lost is not applied twice.
///
/// # Errors
/// Returns an error if the queue cannot be read or updated.
pub async fn replay(
    store: &OfflineStore,
    transport: &impl Transport,
) -> Result<ReplayReport, Error> {
    let mut report = ReplayReport::default();

    for queued in store.pending()? {
        let request = ApiRequest::from(&queued);

        match transport.send(&request).await {
            Ok(response) if response.is_success() => {
                store.remove(queued.id)?;
                report.replayed += 1;
                tracing::info!(
                    "replayed {} {} ({})",
                    queued.method.as_str(),
                    queued.endpoint,
                    queued.request_id
                );
            }
            Ok(response) => {
                report.failed += 1;
                tracing::warn!(
                    "API rejected queued request {} {} with status {}: {}",
                    queued.method.as_str(),
                    queued.endpoint,
                    response.status,
                    response.body
                );
            }
            Err(error) => {
                report.failed += 1;
                tracing::warn!(
                    "could not replay {} {}: {error}",
                    queued.method.as_str(),
                    queued.endpoint
                );
            }
        }
    }

    report.remaining = store.count()?;

    Ok(report)
}
