//! Outgoing request description handed to a [`Transport`](crate::Transport).

use http::{HeaderMap, HeaderName, HeaderValue, Method};

/// A single HTTP request with an absolute URL.
///
/// The URL is sent as given, so callers are responsible for encoding the
/// query string.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method (GET, POST, etc.).
    pub method: Method,

    /// The absolute request URL, including any query string.
    pub url: String,

    /// Headers for this request.
    pub headers: HeaderMap,

    /// The raw request body.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Creates a new request with the given method and URL.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, crate::Error> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| crate::Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| crate::Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Adds all headers from `headers`, replacing existing ones of the same name.
    pub fn with_headers(mut self, headers: &HeaderMap) -> Self {
        for (name, value) in headers {
            self.headers.insert(name.clone(), value.clone());
        }
        self
    }

    /// Appends an already encoded query string.
    pub fn with_query(mut self, query: &str) -> Self {
        if !query.is_empty() {
            self.url.push(if self.url.contains('?') { '&' } else { '?' });
            self.url.push_str(query);
        }
        self
    }

    /// Sets the request body.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}
