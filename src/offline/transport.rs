//! Sending requests to the API.

use std::future::Future;

use serde_json::Value;
use uuid::Uuid;

use crate::{
    IDEMPOTENCY_KEY_HEADER,
    offline::queue::{Method, QueuedRequest},
};

/// A request to the API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// Sent as the idempotency key, only set for write requests.
    pub request_id: Option<Uuid>,
    /// The HTTP method.
    pub method: Method,
    /// The API path, e.g. `/api/accounts`.
    pub endpoint: String,
    /// The JSON body, if any.
    pub payload: Option<Value>,
}

impl From<&QueuedRequest> for ApiRequest {
    fn from(queued: &QueuedRequest) -> Self {
        Self {
            request_id: Some(queued.request_id),
            method: queued.method,
            endpoint: queued.endpoint.clone(),
            payload: queued.payload.clone(),
        }
    }
}

/// The status and JSON body the API answered with.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// The HTTP status code.
    pub status: u16,
    /// The response body, [Value::Null] if it was empty or a string if it was not JSON.
    pub body: Value,
}

impl ApiResponse {
    /// Whether the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The errors that may occur when sending a request.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TransportError {
    /// The connection to the API failed, the request should be tried again later.
    #[error("the API could not be reached: {0}")]
    Unreachable(String),

    /// The API answered with something that could not be read.
    #[error("could not read the API response: {0}")]
    Protocol(String),
}

/// Something that can deliver an [ApiRequest] to the API.
pub trait Transport {
    /// Send `request` and wait for the response.
    ///
    /// A non-2xx response is still `Ok`, only failures to exchange a request
    /// and response are errors.
    fn send(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;
}

/// Sends requests over HTTP with [reqwest].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTransport {
    /// Create a transport for the API served at `base_url`, e.g. `https://localhost:3000`.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            token: None,
        }
    }

    /// Authenticate every request with `token`.
    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.as_http(), self.url(&request.endpoint));

        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        if let Some(request_id) = request.request_id {
            builder = builder.header(IDEMPOTENCY_KEY_HEADER, request_id.to_string());
        }

        if let Some(payload) = &request.payload {
            builder = builder.json(payload);
        }

        let response = builder.send().await.map_err(|error| {
            tracing::debug!(
                "could not send {} {}: {error}",
                request.method.as_str(),
                request.endpoint
            );
            TransportError::Unreachable(error.to_string())
        })?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|error| TransportError::Protocol(error.to_string()))?;

        // Framework rejections are plain text, keep them readable.
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use crate::offline::queue::Method;

    use super::{ApiRequest, ApiResponse, HttpTransport, Transport, TransportError};

    #[test]
    fn success_is_2xx() {
        let response = |status| ApiResponse {
            status,
            body: serde_json::Value::Null,
        };

        assert!(response(200).is_success());
        assert!(response(201).is_success());
        assert!(!response(304).is_success());
        assert!(!response(422).is_success());
    }

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let transport = HttpTransport::new("http://localhost:3000/");

        assert_eq!(
            transport.url("/api/accounts"),
            "http://localhost:3000/api/accounts"
        );
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        let transport = HttpTransport::new("http://127.0.0.1:1");
        let request = ApiRequest {
            request_id: None,
            method: Method::Get,
            endpoint: "/api/accounts".to_owned(),
            payload: None,
        };

        let result = transport.send(&request).await;

        assert!(
            matches!(result, Err(TransportError::Unreachable(_))),
            "got {result:?}"
        );
    }
}
