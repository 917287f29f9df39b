//! An API client that keeps working while the API is unreachable.

use serde_json::Value;
use uuid::Uuid;

use crate::{
    Error,
    offline::{
        queue::{Method, OfflineStore, QueuedRequest},
        replay::{ReplayReport, replay},
        transport::{ApiRequest, ApiResponse, Transport, TransportError},
    },
};

/// The errors that may occur when making a request with [OfflineClient].
#[derive(Debug, thiserror::Error)]
pub enum OfflineError {
    /// The local queue or cache could not be read or written.
    #[error("offline storage failed: {0}")]
    Storage(#[from] Error),

    /// The request could not be exchanged with the API for a reason other
    /// than the API being unreachable.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// What happened to a request made with [OfflineClient::request].
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    /// The API answered.
    Online(ApiResponse),

    /// The API could not be reached.
    Offline {
        /// The queue entry for a write request, `None` for reads.
        queued: Option<QueuedRequest>,
        /// The last successful response to a `GET` of the same endpoint, if any.
        cached: Option<Value>,
    },
}

/// Sends requests through a [Transport], falling back to an [OfflineStore]
/// when the API cannot be reached.
#[derive(Debug)]
pub struct OfflineClient<T> {
    store: OfflineStore,
    transport: T,
}

impl<T: Transport> OfflineClient<T> {
    /// Create a client that sends requests with `transport` and queues them in `store`.
    pub fn new(store: OfflineStore, transport: T) -> Self {
        Self { store, transport }
    }

    /// The queue and cache used by the client.
    pub fn store(&self) -> &OfflineStore {
        &self.store
    }

    /// Send a request to the API.
    ///
    /// Successful `GET` responses are cached by endpoint. If the API is unreachable, write
    /// requests are queued under the request ID they were first sent with, and the cached
    /// response for the endpoint is returned alongside.
    ///
    /// # Errors
    /// Returns an error if the store fails or the API response cannot be read.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<Value>,
    ) -> Result<RequestOutcome, OfflineError> {
        let request = ApiRequest {
            request_id: method.is_write().then(Uuid::new_v4),
            method,
            endpoint: endpoint.to_owned(),
            payload,
        };

        match self.transport.send(&request).await {
            Ok(response) => {
                if method == Method::Get && response.is_success() {
                    self.store.cache_response(endpoint, &response.body)?;
                }

                Ok(RequestOutcome::Online(response))
            }
            Err(TransportError::Unreachable(reason)) => {
                tracing::warn!("API unreachable, working offline: {reason}");

                let queued = match request.request_id {
                    Some(request_id) => Some(self.store.enqueue_with_request_id(
                        method,
                        endpoint,
                        request.payload,
                        request_id,
                    )?),
                    None => None,
                };

                Ok(RequestOutcome::Offline {
                    queued,
                    cached: self.store.cached_response(endpoint)?,
                })
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Replay the queued requests, see [replay].
    ///
    /// # Errors
    /// Returns an error if the queue cannot be read or updated.
    pub async fn sync(&self) -> Result<ReplayReport, Error> {
        replay(&self.store, &self.transport).await
    }
}
