//! Scripted model client for tests
//!
//! Replies are taken from a queue; when the queue is empty the configured
//! default reply is repeated. Individual models can be made to fail
//! permanently to exercise fallback paths. Streamed replies are delivered
//! one word at a time.

use crate::client::ModelClient;
use crate::completion::{ModelRequest, ModelResponse};
use crate::error::{Error, Result};

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Failure kinds the mock can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// 429
    RateLimit,
    /// Timeout
    Timeout,
    /// 5xx
    Server,
    /// 401
    Auth,
    /// 400
    InvalidRequest,
}

impl MockFailure {
    fn to_error(self) -> Error {
        match self {
            Self::RateLimit => Error::RateLimit,
            Self::Timeout => Error::Timeout(1),
            Self::Server => Error::Server("HTTP 503".to_string()),
            Self::Auth => Error::Auth("HTTP 401".to_string()),
            Self::InvalidRequest => Error::InvalidRequest("HTTP 400".to_string()),
        }
    }
}

enum Scripted {
    Reply(ModelResponse),
    Fail(MockFailure),
}

/// A mock model client that returns queued replies
pub struct MockModelClient {
    name: String,
    queue: Mutex<VecDeque<Scripted>>,
    default_reply: Mutex<ModelResponse>,
    failing_models: Mutex<HashMap<String, MockFailure>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl Default for MockModelClient {
    fn default() -> Self {
        Self::named("mock")
    }
}

impl MockModelClient {
    /// Create a mock with a name
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queue: Mutex::new(VecDeque::new()),
            default_reply: Mutex::new(ModelResponse::text("mock response")),
            failing_models: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a reply
    pub fn push_response(&self, response: ModelResponse) {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Scripted::Reply(response));
    }

    /// Queue a one-off failure
    pub fn push_failure(&self, failure: MockFailure) {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Scripted::Fail(failure));
    }

    /// Reply used once the queue is drained
    pub fn set_default_response(&self, response: ModelResponse) {
        *self.default_reply.lock().unwrap_or_else(|e| e.into_inner()) = response;
    }

    /// Make every call for `model` fail with `failure`
    pub fn fail_model(&self, model: impl Into<String>, failure: MockFailure) {
        self.failing_models
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(model.into(), failure);
    }

    /// All requests received, in order
    #[must_use]
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of calls received
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Number of calls received for one model id
    #[must_use]
    pub fn calls_for(&self, model: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| r.model == model)
            .count()
    }
}

#[async_trait::async_trait]
impl ModelClient for MockModelClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, request: ModelRequest) -> Result<ModelResponse> {
        let model = request.model.clone();
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        if let Some(failure) = self
            .failing_models
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&model)
            .copied()
        {
            return Err(failure.to_error());
        }

        let next = self
            .queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match next {
            Some(Scripted::Reply(response)) => Ok(response),
            Some(Scripted::Fail(failure)) => Err(failure.to_error()),
            None => Ok(self
                .default_reply
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone()),
        }
    }

    async fn call_stream(
        &self,
        request: ModelRequest,
        on_delta: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> Result<ModelResponse> {
        let response = self.call(request).await?;
        if let Some(text) = response.content.as_deref() {
            for fragment in text.split_inclusive(' ') {
                on_delta(fragment);
            }
        }
        Ok(response)
    }
}
