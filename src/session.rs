//! Authenticated sessions and entity operations.
//!
//! A [`Session`] can only be obtained through [`SessionBuilder::connect`],
//! which runs the complete single-sign-on handshake:
//!
//! 1. `GET rest/is-authenticated` must answer `401` with a
//!    `WWW-Authenticate: LWSSO realm="<url>"` challenge.
//! 2. The credentials are posted to `<realm>/alm-authenticate`; the response
//!    must set the single-sign-on cookie.
//! 3. A short-lived site session is requested from `rest/site-session`; the
//!    response must set the session cookie.
//!
//! Any deviation aborts construction, so holding a `Session` means both
//! cookies are in the jar.

use crate::collection::PagedEntityCollection;
use crate::connector::{find_set_cookie, Connector};
use crate::entity::Entity;
use crate::format::{configure_formatting, format_integer, format_offset};
use crate::transport::{ReqwestTransport, Transport};
use crate::wire::{self, ResultSet, ServerTime};
use crate::{Error, HttpResponse, Result};
use chrono::{FixedOffset, NaiveDateTime};
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const LWSSO_COOKIE: &str = "LWSSO_COOKIE_KEY";
const QC_SESSION_COOKIE: &str = "QCSession";
const SESSION_TIMEOUT_MINUTES: u32 = 5;
const SERVER_DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Everything except ASCII alphanumerics and `-._*` is percent-encoded.
const QUERY_TOKEN: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'*');

fn json_accept_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

fn json_post_headers() -> HeaderMap {
    let mut headers = json_accept_headers();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

fn xml_post_headers() -> HeaderMap {
    let mut headers = json_accept_headers();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/xml"));
    headers
}

fn attachment_headers(file_name: &str) -> Result<HeaderMap> {
    let mut headers = json_accept_headers();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    let slug = HeaderValue::try_from(file_name)
        .map_err(|e| Error::ConfigurationError(format!("Invalid attachment file name: {}", e)))?;
    headers.insert("slug", slug);
    Ok(headers)
}

/// Percent-encodes a query token for the `query={...}` parameter.
///
/// Spaces become `%20`; the surrounding braces are added by the caller and
/// stay unencoded.
pub fn encode_query(query: &str) -> String {
    utf8_percent_encode(query, QUERY_TOKEN).to_string()
}

/// Extracts the authentication base URL from a `WWW-Authenticate` value of
/// the form `LWSSO realm="http(s)://..."`.
fn parse_realm(challenge: &str) -> Option<&str> {
    let realm = challenge
        .trim()
        .strip_prefix("LWSSO realm=\"")?
        .strip_suffix('"')?;
    let host = realm
        .strip_prefix("https://")
        .or_else(|| realm.strip_prefix("http://"))?;
    (!host.is_empty() && !realm.contains('"')).then_some(realm)
}

/// Maps a non-success response to an [`Error`].
///
/// A structured error body yields [`Error::Server`] with whatever of title
/// and code it carries. Empty or unparseable bodies yield
/// [`Error::HttpError`] with the raw status; a parsing problem is never
/// reported in place of the original failure.
pub fn error_for_response(response: &HttpResponse) -> Error {
    let status = response.status;
    match wire::decode_server_error(&response.body) {
        Some(server_error) => {
            tracing::warn!(
                status = status.as_u16(),
                title = server_error.title.as_deref().unwrap_or(""),
                code = server_error.code.as_deref().unwrap_or(""),
                "Server reported an error"
            );
            Error::Server {
                status,
                title: server_error.title,
                code: server_error.code,
            }
        }
        None => {
            let raw_response = response.text();
            if status.is_client_error() {
                tracing::error!(status = status.as_u16(), response = %raw_response, "Client error (4xx)");
            } else {
                tracing::warn!(status = status.as_u16(), response = %raw_response, "Unexpected status");
            }
            Error::HttpError {
                status,
                raw_response,
            }
        }
    }
}

fn expect_status(response: HttpResponse, expected: StatusCode) -> Result<HttpResponse> {
    if response.status == expected {
        Ok(response)
    } else {
        Err(error_for_response(&response))
    }
}

/// Computes the server's UTC offset from its reported wall-clock time.
///
/// The wall-clock string is read as if it were GMT; the difference to the
/// epoch milliseconds, rounded to the nearest minute, is the offset.
pub fn server_time_zone(time: &ServerTime) -> Result<FixedOffset> {
    let millis: i64 = time
        .time_in_millis
        .trim()
        .parse()
        .map_err(|_| Error::InvalidServerTime(time.time_in_millis.clone()))?;
    let wall_clock = NaiveDateTime::parse_from_str(time.date_time.trim(), SERVER_DATE_TIME_FORMAT)
        .map_err(|_| Error::InvalidServerTime(time.date_time.clone()))?
        .and_utc()
        .timestamp_millis();

    let diff = wall_clock
        .checked_sub(millis)
        .ok_or_else(|| Error::InvalidServerTime(time.time_in_millis.clone()))?;
    let minutes = (diff as f64 / 60_000.0).round() as i64;
    i32::try_from(minutes * 60)
        .ok()
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| Error::InvalidServerTime(time.date_time.clone()))
}

/// Connection settings, typically deserialized from the caller's own
/// configuration source.
///
/// # Examples
///
/// ```
/// use alm_connector::SessionConfig;
///
/// let config: SessionConfig = serde_json::from_str(r#"{
///     "server_url": "http://alm.example.com/qcbin",
///     "project": "Demo",
///     "user_name": "tester",
///     "password": "secret"
/// }"#).unwrap();
///
/// assert_eq!(config.domain, "DEFAULT");
/// ```
#[derive(Clone, Deserialize)]
pub struct SessionConfig {
    pub server_url: String,
    #[serde(default = "default_domain")]
    pub domain: String,
    pub project: String,
    pub user_name: String,
    pub password: String,
    /// Transport timeout per request, in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Page size requested for queries; the server default applies when absent.
    #[serde(default)]
    pub page_size: Option<u32>,
    /// Offset east of UTC, in minutes, for date and time field formatting.
    #[serde(default)]
    pub format_utc_offset_minutes: Option<i32>,
}

fn default_domain() -> String {
    "DEFAULT".to_string()
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("server_url", &self.server_url)
            .field("domain", &self.domain)
            .field("project", &self.project)
            .field("user_name", &self.user_name)
            .field("password", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .field("page_size", &self.page_size)
            .field("format_utc_offset_minutes", &self.format_utc_offset_minutes)
            .finish()
    }
}

/// An authenticated connection to one project on the server.
///
/// A session is meant for one logical caller at a time. Sharing it between
/// tasks needs external coordination, and cursors over its query results
/// borrow it.
///
/// # Examples
///
/// ```no_run
/// use alm_connector::{Session, TestRunBuilder};
///
/// # async fn example() -> Result<(), alm_connector::Error> {
/// let session = Session::builder()
///     .server_url("http://alm.example.com/qcbin")?
///     .project("Demo")
///     .credentials("tester", "secret")
///     .connect()
///     .await?;
///
/// let run = TestRunBuilder::new().name("nightly").test_instance_id(17).create();
/// let created = session.create_entity(&run).await?;
/// println!("Created run {}", created.id()?);
///
/// let tests = session.query_entities("test", Some("name['Login*']")).await?;
/// let mut cursor = tests.cursor();
/// while let Some(test) = cursor.try_next().await? {
///     println!("{}", test.string_value("name")?);
/// }
///
/// session.logout().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Session {
    connector: Connector,
    user: String,
    page_size: Option<u32>,
}

impl Session {
    /// Creates a new `SessionBuilder`.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    async fn authenticate(
        connector: Connector,
        user: String,
        password: &str,
        page_size: Option<u32>,
    ) -> Result<Self> {
        let response = connector
            .get(
                &connector.build_url("rest/is-authenticated"),
                None,
                &json_accept_headers(),
            )
            .await?;
        if response.status != StatusCode::UNAUTHORIZED {
            return Err(Error::UnexpectedAuthStatus(response.status));
        }

        let challenge = response
            .header("www-authenticate")
            .ok_or(Error::MissingAuthChallenge)?;
        let realm = parse_realm(challenge)
            .ok_or_else(|| Error::UnsupportedRealm(challenge.trim().to_string()))?;
        let auth_url = format!("{}/alm-authenticate", realm);

        tracing::debug!(auth_url = %auth_url, user = %user, "Sending credentials");
        let response = connector
            .post(
                &auth_url,
                wire::authentication_document(&user, password),
                &xml_post_headers(),
            )
            .await?;
        if response.status == StatusCode::UNAUTHORIZED {
            return Err(Error::InvalidCredentials);
        }
        let sso_cookie =
            find_set_cookie(&response, LWSSO_COOKIE).ok_or(Error::MissingCookie(LWSSO_COOKIE))?;
        connector.store_cookie(LWSSO_COOKIE, sso_cookie);

        let response = connector
            .post(
                &connector.build_url("rest/site-session"),
                wire::session_parameters_document(SESSION_TIMEOUT_MINUTES),
                &xml_post_headers(),
            )
            .await?;
        if response.status != StatusCode::OK {
            return Err(Error::SessionRejected {
                user,
                status: response.status,
            });
        }
        let session_cookie = find_set_cookie(&response, QC_SESSION_COOKIE)
            .ok_or(Error::MissingCookie(QC_SESSION_COOKIE))?;
        connector.store_cookie(QC_SESSION_COOKIE, session_cookie);

        tracing::info!(
            user = %user,
            domain = %connector.domain(),
            project = %connector.project(),
            "Session established"
        );

        Ok(Self {
            connector,
            user,
            page_size,
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn domain(&self) -> &str {
        self.connector.domain()
    }

    pub fn project(&self) -> &str {
        self.connector.project()
    }

    /// The underlying connector, for requests this type has no method for.
    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    /// Keeps the server-side session alive. Long-running callers should
    /// call this periodically.
    pub async fn extend_timeout(&self) -> Result<()> {
        let response = self
            .connector
            .get(
                &self.connector.build_url("rest/site-session"),
                None,
                &json_accept_headers(),
            )
            .await?;
        if !response.is_success() {
            return Err(error_for_response(&response));
        }
        Ok(())
    }

    /// Ends the session.
    ///
    /// The logout request is best-effort: its status is not checked, and
    /// only a transport failure is reported.
    pub async fn logout(self) -> Result<()> {
        let response = self
            .connector
            .get(
                &self.connector.build_url("authentication-point/logout"),
                None,
                &json_accept_headers(),
            )
            .await?;
        tracing::info!(
            user = %self.user,
            status = response.status.as_u16(),
            "Logged out"
        );
        self.connector.clear_cookies();
        Ok(())
    }

    /// Fetches the server's wall-clock time.
    pub async fn server_time(&self) -> Result<ServerTime> {
        let response = self
            .connector
            .get(
                &self.connector.build_url("rest/server/time"),
                None,
                &json_accept_headers(),
            )
            .await?;
        let response = expect_status(response, StatusCode::OK)?;
        wire::decode_server_time(response.status, &response.body)
    }

    /// Determines the server's UTC offset with minute precision.
    pub async fn determine_server_time_zone(&self) -> Result<FixedOffset> {
        let time = self.server_time().await?;
        let zone = server_time_zone(&time)?;
        tracing::debug!(zone = %format_offset(&zone), "Determined server time zone");
        Ok(zone)
    }

    /// Creates `entity` on the server and returns the stored version,
    /// including the assigned `id` and server-computed fields.
    pub async fn create_entity(&self, entity: &Entity) -> Result<Entity> {
        tracing::debug!(
            entity_type = %entity.entity_type(),
            name = entity.first_value("name").unwrap_or(""),
            "Creating entity"
        );
        let body = wire::encode_entity(entity)?;
        let response = self
            .connector
            .post(
                &self.connector.build_entity_collection_url(entity.entity_type()),
                body,
                &json_post_headers(),
            )
            .await?;
        let response = expect_status(response, StatusCode::CREATED)?;
        let created = wire::decode_entity(response.status, &response.body)?;
        tracing::debug!(id = created.first_value("id").unwrap_or(""), "Created entity");
        Ok(created)
    }

    /// Updates entity `id` with the fields of `values` and returns the
    /// server's resulting entity. The type is taken from `values`.
    pub async fn update_entity(&self, id: i64, values: &Entity) -> Result<Entity> {
        tracing::debug!(entity_type = %values.entity_type(), id = id, "Updating entity");
        let body = wire::encode_entity(values)?;
        let response = self
            .connector
            .put(&self.entity_url(values.entity_type(), id), body, &json_post_headers())
            .await?;
        let response = expect_status(response, StatusCode::OK)?;
        wire::decode_entity(response.status, &response.body)
    }

    pub async fn delete_entity(&self, entity_type: &str, id: i64) -> Result<()> {
        tracing::debug!(entity_type = %entity_type, id = id, "Deleting entity");
        let response = self
            .connector
            .delete(&self.entity_url(entity_type, id), &json_accept_headers())
            .await?;
        expect_status(response, StatusCode::OK)?;
        Ok(())
    }

    /// Deletes `entity`, identified by its type and `id` field.
    pub async fn delete(&self, entity: &Entity) -> Result<()> {
        self.delete_entity(entity.entity_type(), entity.id()?).await
    }

    /// Uploads `data` as an attachment of `entity` named `file_name`.
    pub async fn create_attachment(
        &self,
        entity: &Entity,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<Entity> {
        let url = format!(
            "{}/attachments",
            self.entity_url(entity.entity_type(), entity.id()?)
        );
        tracing::debug!(url = %url, file_name = %file_name, size = data.len(), "Uploading attachment");
        let response = self
            .connector
            .post(&url, data, &attachment_headers(file_name)?)
            .await?;
        let response = expect_status(response, StatusCode::CREATED)?;
        wire::decode_entity(response.status, &response.body)
    }

    pub async fn get_entity(&self, entity_type: &str, id: i64) -> Result<Entity> {
        let response = self
            .connector
            .get(&self.entity_url(entity_type, id), None, &json_accept_headers())
            .await?;
        let response = expect_status(response, StatusCode::OK)?;
        wire::decode_entity(response.status, &response.body)
    }

    /// Queries entities of `entity_type`.
    ///
    /// `query` is the server's filter expression, e.g. `name['Login*']; id[>10]`.
    /// It is passed through opaquely; `None` lists all entities.
    pub async fn query_entities(
        &self,
        entity_type: &str,
        query: Option<&str>,
    ) -> Result<PagedEntityCollection<'_>> {
        self.query_entities_with_page_size(entity_type, query, self.page_size)
            .await
    }

    /// Like [`query_entities`](Self::query_entities) with an explicit page size.
    pub async fn query_entities_with_page_size(
        &self,
        entity_type: &str,
        query: Option<&str>,
        page_size: Option<u32>,
    ) -> Result<PagedEntityCollection<'_>> {
        let mut url = self.connector.build_entity_collection_url(entity_type);
        let mut params = Vec::new();
        if let Some(query) = query {
            params.push(format!("query={{{}}}", encode_query(query)));
        }
        if let Some(page_size) = page_size {
            params.push(format!("page-size={}", page_size));
        }
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }
        self.collection(url).await
    }

    /// Entities related to `entity` through asset relations.
    pub async fn asset_relations(&self, entity: &Entity) -> Result<PagedEntityCollection<'_>> {
        let url = format!(
            "{}/asset-relations",
            self.entity_url(entity.entity_type(), entity.id()?)
        );
        self.collection(url).await
    }

    pub async fn tests(&self) -> Result<PagedEntityCollection<'_>> {
        self.query_entities("test", None).await
    }

    pub async fn test_runs(&self) -> Result<PagedEntityCollection<'_>> {
        self.query_entities("run", None).await
    }

    pub async fn test_sets(&self) -> Result<PagedEntityCollection<'_>> {
        self.query_entities("test-set", None).await
    }

    pub async fn test_folders(&self) -> Result<PagedEntityCollection<'_>> {
        self.query_entities("test-folder", None).await
    }

    pub async fn test_set_folders(&self) -> Result<PagedEntityCollection<'_>> {
        self.query_entities("test-set-folder", None).await
    }

    pub async fn test(&self, id: i64) -> Result<Entity> {
        self.get_entity("test", id).await
    }

    pub async fn test_set(&self, id: i64) -> Result<Entity> {
        self.get_entity("test-set", id).await
    }

    pub async fn test_folder(&self, id: i64) -> Result<Entity> {
        self.get_entity("test-folder", id).await
    }

    pub async fn test_set_folder(&self, id: i64) -> Result<Entity> {
        self.get_entity("test-set-folder", id).await
    }

    async fn collection(&self, url: String) -> Result<PagedEntityCollection<'_>> {
        let first_page = self.fetch_page(&url).await?;
        Ok(PagedEntityCollection::new(self, url, first_page))
    }

    /// Fetches one page of a collection URL.
    pub(crate) async fn fetch_page(&self, url: &str) -> Result<ResultSet> {
        let response = self
            .connector
            .get(url, None, &json_accept_headers())
            .await?;
        let response = expect_status(response, StatusCode::OK)?;
        wire::decode_result_set(response.status, &response.body)
    }

    fn entity_url(&self, entity_type: &str, id: i64) -> String {
        format!(
            "{}/{}",
            self.connector.build_entity_collection_url(entity_type),
            format_integer(id)
        )
    }
}

/// Builder for configuring and connecting a [`Session`].
///
/// # Examples
///
/// ```no_run
/// use alm_connector::Session;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), alm_connector::Error> {
/// let session = Session::builder()
///     .server_url("https://alm.example.com/qcbin")?
///     .domain("QA")
///     .project("Checkout")
///     .credentials("tester", "secret")
///     .timeout(Duration::from_secs(30))
///     .page_size(250)
///     .connect()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    server_url: Option<Url>,
    domain: String,
    project: Option<String>,
    user: Option<String>,
    password: Option<String>,
    timeout: Option<Duration>,
    page_size: Option<u32>,
    format_time_zone: Option<FixedOffset>,
    transport: Option<Box<dyn Transport>>,
}

impl SessionBuilder {
    /// Creates a new `SessionBuilder` with the `DEFAULT` domain.
    pub fn new() -> Self {
        Self {
            server_url: None,
            domain: default_domain(),
            project: None,
            user: None,
            password: None,
            timeout: None,
            page_size: None,
            format_time_zone: None,
            transport: None,
        }
    }

    /// Applies every setting from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL or the formatting offset is invalid.
    pub fn config(self, config: SessionConfig) -> Result<Self> {
        let mut builder = self
            .server_url(&config.server_url)?
            .domain(config.domain)
            .project(config.project)
            .credentials(config.user_name, config.password);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(page_size) = config.page_size {
            builder = builder.page_size(page_size);
        }
        if let Some(minutes) = config.format_utc_offset_minutes {
            let zone = FixedOffset::east_opt(minutes * 60).ok_or_else(|| {
                Error::ConfigurationError(format!("Invalid UTC offset: {} minutes", minutes))
            })?;
            builder = builder.format_time_zone(zone);
        }
        Ok(builder)
    }

    /// Sets the server base URL, e.g. `http://alm.example.com/qcbin`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn server_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.server_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    /// Sets the per-request timeout of the default transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the page size requested for queries.
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Sets the process-wide zone for date and time formatting on connect.
    pub fn format_time_zone(mut self, zone: FixedOffset) -> Self {
        self.format_time_zone = Some(zone);
        self
    }

    /// Uses a custom transport instead of the default `reqwest` one.
    pub fn transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Runs the authentication handshake and returns the ready session.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a required setting is missing, a
    /// transport error if the server is unreachable, and an authentication
    /// error if any handshake step fails.
    pub async fn connect(self) -> Result<Session> {
        let server_url = self
            .server_url
            .ok_or_else(|| Error::ConfigurationError("Server URL is required".to_string()))?;
        let project = self
            .project
            .ok_or_else(|| Error::ConfigurationError("Project is required".to_string()))?;
        let user = self
            .user
            .ok_or_else(|| Error::ConfigurationError("User name is required".to_string()))?;
        let password = self
            .password
            .ok_or_else(|| Error::ConfigurationError("Password is required".to_string()))?;

        if let Some(zone) = self.format_time_zone {
            configure_formatting(zone);
        }

        let transport = match self.transport {
            Some(transport) => transport,
            None => Box::new(ReqwestTransport::with_timeout(self.timeout)?),
        };

        let connector = Connector::new(transport, &server_url, self.domain, project);
        Session::authenticate(connector, user, &password, self.page_size).await
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
