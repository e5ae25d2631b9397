//! The HTTP capability the connector runs on.
//!
//! [`Transport`] is the only seam between the connector and the network:
//! one method that sends a fully prepared [`HttpRequest`] and returns the
//! raw [`HttpResponse`]. [`ReqwestTransport`] is the default implementation.

use crate::{Error, HttpRequest, HttpResponse, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Sends HTTP requests.
///
/// Implementations return any response the server produced, whatever its
/// status; only failures to obtain a response at all are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// [`Transport`] backed by a `reqwest::Client`.
///
/// Cookies are managed by the connector, so the underlying client keeps no
/// cookie store and does not follow redirects.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
    timeout: Option<Duration>,
}

impl ReqwestTransport {
    /// Creates a transport without a request timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(None)
    }

    /// Creates a transport that aborts requests after `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| {
                Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            timeout,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .http_client
            .request(request.method, request.url.as_str())
            .headers(request.headers);

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        Ok(HttpResponse::new(status, headers, body.to_vec()))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout
    } else {
        Error::Network(e)
    }
}
