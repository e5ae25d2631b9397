//! Cookie-aware request plumbing on top of a [`Transport`].
//!
//! The [`Connector`] knows the server base URL, domain and project, builds
//! absolute URLs from them, and attaches every stored cookie to every
//! request. It does not look at status codes; that is the session's job.

use crate::{HttpRequest, HttpResponse, Result, Transport};
use http::header::COOKIE;
use http::{HeaderMap, HeaderValue, Method};
use std::sync::Mutex;
use url::Url;

/// Cookies stored by name, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: Vec<(String, String)>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a cookie, replacing the value of an existing one with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.cookies.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.cookies.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    /// Renders the jar as a `Cookie` header value, or `None` when empty.
    pub fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let rendered = self
            .cookies
            .iter()
            .map(|(n, v)| format!("{}={}", n, v))
            .collect::<Vec<_>>()
            .join("; ");
        Some(rendered)
    }
}

/// Extracts the value of cookie `name` from a response's `Set-Cookie` headers.
///
/// Attributes after the first `;` are ignored; entries without `=` are skipped.
pub fn find_set_cookie(response: &HttpResponse, name: &str) -> Option<String> {
    response.header_values("set-cookie").find_map(|raw| {
        let pair = raw.trim().split(';').next()?.trim();
        let (key, value) = pair.split_once('=')?;
        (key.trim() == name).then(|| value.trim().to_string())
    })
}

/// Sends requests through a [`Transport`] with base-URL resolution and
/// cookie injection.
pub struct Connector {
    transport: Box<dyn Transport>,
    server_url: Url,
    domain: String,
    project: String,
    cookies: Mutex<CookieJar>,
}

impl Connector {
    /// Creates a connector for the given server, domain and project.
    ///
    /// A trailing slash is added to `server_url` if missing, so relative
    /// paths resolve below it.
    pub fn new(
        transport: Box<dyn Transport>,
        server_url: &Url,
        domain: impl Into<String>,
        project: impl Into<String>,
    ) -> Self {
        let mut server_url = server_url.clone();
        if !server_url.path().ends_with('/') {
            let path = format!("{}/", server_url.path());
            server_url.set_path(&path);
        }

        Self {
            transport,
            server_url,
            domain: domain.into(),
            project: project.into(),
            cookies: Mutex::new(CookieJar::new()),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Resolves `path` against the server base URL.
    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url, path.trim_start_matches('/'))
    }

    /// The collection endpoint for entities of `entity_type`.
    pub fn build_entity_collection_url(&self, entity_type: &str) -> String {
        self.build_url(&format!(
            "rest/domains/{}/projects/{}/{}s",
            self.domain, self.project, entity_type
        ))
    }

    /// Stores a cookie that will be sent with every subsequent request.
    pub fn store_cookie(&self, name: impl Into<String>, value: impl Into<String>) {
        self.jar().insert(name, value);
    }

    /// The stored value of cookie `name`.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.jar().get(name).map(str::to_string)
    }

    pub fn clear_cookies(&self) {
        self.jar().clear();
    }

    fn jar(&self) -> std::sync::MutexGuard<'_, CookieJar> {
        // A poisoned jar still holds consistent name/value pairs.
        self.cookies.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Issues a GET with an optional, already encoded query string.
    pub async fn get(
        &self,
        url: &str,
        query: Option<&str>,
        headers: &HeaderMap,
    ) -> Result<HttpResponse> {
        let request = HttpRequest::new(Method::GET, url)
            .with_query(query.unwrap_or_default())
            .with_headers(headers);
        self.execute(request).await
    }

    pub async fn post(&self, url: &str, body: Vec<u8>, headers: &HeaderMap) -> Result<HttpResponse> {
        let request = HttpRequest::new(Method::POST, url)
            .with_headers(headers)
            .with_body(body);
        self.execute(request).await
    }

    pub async fn put(&self, url: &str, body: Vec<u8>, headers: &HeaderMap) -> Result<HttpResponse> {
        let request = HttpRequest::new(Method::PUT, url)
            .with_headers(headers)
            .with_body(body);
        self.execute(request).await
    }

    pub async fn delete(&self, url: &str, headers: &HeaderMap) -> Result<HttpResponse> {
        let request = HttpRequest::new(Method::DELETE, url).with_headers(headers);
        self.execute(request).await
    }

    async fn execute(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        let cookie_header = self.jar().header_value();
        if let Some(cookie_header) = cookie_header {
            let value = HeaderValue::try_from(cookie_header).map_err(|e| {
                crate::Error::ConfigurationError(format!("Invalid cookie value: {}", e))
            })?;
            request.headers.insert(COOKIE, value);
        }

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            "Executing HTTP request"
        );

        let response = self.transport.send(request).await?;

        tracing::info!(
            status = response.status.as_u16(),
            body_size = response.body.len(),
            "Received HTTP response"
        );

        Ok(response)
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("server_url", &self.server_url.as_str())
            .field("domain", &self.domain)
            .field("project", &self.project)
            .finish_non_exhaustive()
    }
}
