//! HTTP transport over `ureq`.
//!
//! Requests carry the compute API media type and, when configured, the
//! session cookie. The cookie value is never logged.

use crate::backend::{Method, Transport};
use crate::error::TransportError;

/// Media type of compute API payloads.
pub const MEDIA_TYPE: &str = "application/oracle-compute-v3+json";

/// Maximum response size (orchestrations with many objects are large).
const MAX_BODY_SIZE: u64 = 16 * 1024 * 1024;

/// Transport speaking HTTP to a compute endpoint.
///
/// # Example
///
/// ```no_run
/// use compute::backend::http::HttpTransport;
/// use compute::backend::{Method, Transport};
///
/// let transport = HttpTransport::new("https://api.compute.example.com")
///     .with_cookie("nimbula=...");
/// let body = transport.send(Method::Get, "/storage/attachment/Compute-acme/jane/", None).unwrap();
/// println!("{}", String::from_utf8_lossy(&body));
/// ```
pub struct HttpTransport {
    agent: ureq::Agent,
    endpoint: String,
    cookie: Option<String>,
}

impl HttpTransport {
    /// Create a transport for an endpoint such as `https://api.compute.example.com`.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        // Non-2xx responses are mapped below, not turned into ureq errors
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build();
        Self {
            agent: config.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            cookie: None,
        }
    }

    /// Send this session cookie with every request.
    #[must_use]
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    /// Get the endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build the URL for a request path.
    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.endpoint, path)
        } else {
            format!("{}/{}", self.endpoint, path)
        }
    }

    fn connection_error(method: Method, path: &str, err: &ureq::Error) -> TransportError {
        TransportError::Connection {
            method,
            path: path.to_string(),
            message: err.to_string(),
        }
    }
}

impl Transport for HttpTransport {
    fn send(&self, method: Method, path: &str, body: Option<&[u8]>) -> Result<Vec<u8>, TransportError> {
        let url = self.url(path);
        log::debug!("{} {}", method, url);

        let cookie = self.cookie.as_deref().unwrap_or_default();
        let result = match method {
            Method::Get | Method::Delete => {
                let request = if method == Method::Get {
                    self.agent.get(&url)
                } else {
                    self.agent.delete(&url)
                };
                let request = request.header("Accept", MEDIA_TYPE);
                if self.cookie.is_some() {
                    request.header("Cookie", cookie).call()
                } else {
                    request.call()
                }
            }
            Method::Post | Method::Put => {
                let request = if method == Method::Post {
                    self.agent.post(&url)
                } else {
                    self.agent.put(&url)
                };
                let request = request
                    .header("Accept", MEDIA_TYPE)
                    .header("Content-Type", MEDIA_TYPE);
                let payload = body.unwrap_or_default();
                if self.cookie.is_some() {
                    request.header("Cookie", cookie).send(payload)
                } else {
                    request.send(payload)
                }
            }
        };

        let mut response = result.map_err(|e| Self::connection_error(method, path, &e))?;
        let status = response.status().as_u16();
        log::debug!("{} {} -> {}", method, url, status);

        if status == 404 {
            return Err(TransportError::NotFound {
                path: path.to_string(),
            });
        }

        let bytes = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_SIZE)
            .read_to_vec()
            .map_err(|e| Self::connection_error(method, path, &e))?;

        if !(200..300).contains(&status) {
            let message = String::from_utf8_lossy(&bytes).trim().to_string();
            return Err(TransportError::Status {
                method,
                path: path.to_string(),
                status,
                message: if message.is_empty() {
                    format!("HTTP {}", status)
                } else {
                    message
                },
            });
        }

        Ok(bytes)
    }
}
