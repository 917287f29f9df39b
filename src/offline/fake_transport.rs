use std::{collections::VecDeque, future::Future, sync::Mutex};

use serde_json::Value;

use crate::offline::transport::{ApiRequest, ApiResponse, Transport, TransportError};

/// Answers requests with scripted results and records what was sent.
///
/// Once the script runs out every request gets a `200 OK` with an empty body.
#[derive(Debug, Default)]
pub(crate) struct FakeTransport {
    script: Mutex<VecDeque<Result<ApiResponse, TransportError>>>,
    sent: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub(crate) fn with_statuses(statuses: &[u16]) -> Self {
        Self::with_results(
            statuses
                .iter()
                .map(|&status| {
                    Ok(ApiResponse {
                        status,
                        body: Value::Null,
                    })
                })
                .collect(),
        )
    }

    pub(crate) fn with_results(results: Vec<Result<ApiResponse, TransportError>>) -> Self {
        Self {
            script: Mutex::new(results.into()),
            sent: Mutex::default(),
        }
    }

    pub(crate) fn sent(&self) -> Vec<ApiRequest> {
        self.sent.lock().unwrap().clone()
    }
}

impl Transport for FakeTransport {
    fn send(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send {
        self.sent.lock().unwrap().push(request.clone());

        let result = self.script.lock().unwrap().pop_front().unwrap_or(Ok(ApiResponse {
            status: 200,
            body: Value::Null,
        }));

        std::future::ready(result)
    }
}
