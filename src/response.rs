//! Raw HTTP response returned by a [`Transport`](crate::Transport).
//!
//! The connector never interprets status codes itself; [`HttpResponse`]
//! keeps status, headers and body bytes untouched for the session layer.

use http::{HeaderMap, StatusCode};

/// A complete HTTP response.
///
/// # Examples
///
/// ```
/// use alm_connector::HttpResponse;
/// use http::{HeaderMap, HeaderValue, StatusCode};
///
/// let mut headers = HeaderMap::new();
/// headers.append("set-cookie", HeaderValue::from_static("a=1"));
/// headers.append("set-cookie", HeaderValue::from_static("b=2"));
///
/// let response = HttpResponse::new(StatusCode::OK, headers, b"{}".to_vec());
/// assert_eq!(response.header_values("set-cookie").count(), 2);
/// assert_eq!(response.text(), "{}");
/// ```
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// The raw response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Returns the first value of a header by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Returns every value of a header, skipping values that are not valid text.
    pub fn header_values<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
    }

    /// The body decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
