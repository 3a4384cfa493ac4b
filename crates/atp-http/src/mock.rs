// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{HttpExecutor, HttpRequest, HttpResponse};
use async_trait::async_trait;
use atp_error::{Error, Result};
use std::collections::VecDeque;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// MockExecutor
// ---------------------------------------------------------------------------

/// A scripted [`HttpExecutor`] for tests.
///
/// Responses are served in FIFO order; every executed request is captured
/// for later inspection. Running past the end of the script is an
/// [`Error::Internal`].
#[derive(Debug, Default)]
pub struct MockExecutor {
    responses: Mutex<VecDeque<Result<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockExecutor {
    /// An executor with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a response to the script.
    pub fn enqueue(&self, response: HttpResponse) {
        self.responses
            .lock()
            .expect("mock script lock poisoned")
            .push_back(Ok(response));
    }

    /// Append a JSON response with the given status.
    pub fn enqueue_json(&self, status: u16, body: &str) {
        self.enqueue(
            HttpResponse::new(status, body.as_bytes().to_vec())
                .with_header("Content-Type", "application/json"),
        );
    }

    /// Append an error outcome to the script.
    pub fn enqueue_error(&self, error: Error) {
        self.responses
            .lock()
            .expect("mock script lock poisoned")
            .push_back(Err(error));
    }

    /// Snapshot of all captured requests, in execution order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .expect("mock capture lock poisoned")
            .clone()
    }

    /// Number of executed requests.
    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("mock capture lock poisoned").len()
    }
}

#[async_trait]
impl HttpExecutor for MockExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests
            .lock()
            .expect("mock capture lock poisoned")
            .push(request);
        self.responses
            .lock()
            .expect("mock script lock poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(Error::Internal("mock executor script exhausted".into())))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
