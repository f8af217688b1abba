//! Transport trait and implementations.
//!
//! The lifecycle code talks to the API through the [`Transport`] trait. The
//! real implementation is [`http::HttpTransport`].
//!
//! # Testing
//!
//! Use [`MockTransport`] to script responses without network access:
//!
//! ```
//! use compute::backend::{Method, MockResponse, MockTransport, Transport};
//!
//! let mock = MockTransport::new();
//! mock.push(Method::Get, "/storage/attachment/Compute-a/u/att", MockResponse::json(r#"{"state":"attaching"}"#));
//! mock.push(Method::Get, "/storage/attachment/Compute-a/u/att", MockResponse::NotFound);
//!
//! assert!(mock.send(Method::Get, "/storage/attachment/Compute-a/u/att", None).is_ok());
//! assert!(mock.send(Method::Get, "/storage/attachment/Compute-a/u/att", None).is_err());
//! assert_eq!(mock.count(Method::Get), 2);
//! ```

pub mod http;

use crate::error::TransportError;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Method name as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sends one request to the API.
///
/// Implementations are shared between concurrent calls and must not hold
/// per-call state.
pub trait Transport: Send + Sync {
    /// Send a request and return the raw response body.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::NotFound` when the server has no object at
    /// `path`, and other variants for every other failure.
    fn send(&self, method: Method, path: &str, body: Option<&[u8]>) -> Result<Vec<u8>, TransportError>;
}

/// A scripted response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// Successful response with this body.
    Body(Vec<u8>),
    /// The distinguished "not found" failure.
    NotFound,
    /// A non-success HTTP status.
    Status(u16),
}

impl MockResponse {
    /// Successful response with a JSON body.
    pub fn json(body: impl Into<String>) -> Self {
        Self::Body(body.into().into_bytes())
    }
}

/// A request seen by a [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub body: Option<Vec<u8>>,
}

/// In-memory transport with per-route response queues.
///
/// Each `(method, path)` route pops its queued responses in order; the last
/// one is repeated for every later request. Requests to unscripted routes
/// fail with `NotFound`. Clones share their routes and call log.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    routes: Arc<Mutex<HashMap<(Method, String), VecDeque<MockResponse>>>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl MockTransport {
    /// Create a transport with no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for a route.
    pub fn push(&self, method: Method, path: impl Into<String>, response: MockResponse) {
        let mut routes = self.routes.lock().unwrap();
        routes
            .entry((method, path.into()))
            .or_default()
            .push_back(response);
    }

    /// Queue several responses for a route, in order.
    pub fn push_all(
        &self,
        method: Method,
        path: impl Into<String>,
        responses: impl IntoIterator<Item = MockResponse>,
    ) {
        let path = path.into();
        for response in responses {
            self.push(method, path.clone(), response);
        }
    }

    /// Every request seen so far, oldest first.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of requests made with `method`.
    pub fn count(&self, method: Method) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Number of requests made to one route.
    pub fn count_to(&self, method: Method, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }
}

impl Transport for MockTransport {
    fn send(&self, method: Method, path: &str, body: Option<&[u8]>) -> Result<Vec<u8>, TransportError> {
        self.calls.lock().unwrap().push(Call {
            method,
            path: path.to_string(),
            body: body.map(<[u8]>::to_vec),
        });

        let mut routes = self.routes.lock().unwrap();
        let response = match routes.get_mut(&(method, path.to_string())) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        match response {
            Some(MockResponse::Body(bytes)) => Ok(bytes),
            Some(MockResponse::Status(status)) => Err(TransportError::Status {
                method,
                path: path.to_string(),
                status,
                message: format!("HTTP {}", status),
            }),
            Some(MockResponse::NotFound) | None => Err(TransportError::NotFound {
                path: path.to_string(),
            }),
        }
    }
}
