//! Error types for connector operations.
//!
//! Every failure the connector can produce is a variant of [`Error`]. The
//! variants fall into a handful of families: transport problems, failures
//! during the authentication handshake, business errors reported by the
//! server, protocol violations, and typed-access errors on entity fields.
//! Nothing is logged and suppressed inside the crate; every error reaches
//! the direct caller.

use http::StatusCode;

/// The main error type for connector operations.
///
/// # Examples
///
/// ```no_run
/// use alm_connector::{Error, Session};
///
/// # async fn example(session: &Session) -> Result<(), Error> {
/// match session.get_entity("test", 42).await {
///     Ok(test) => println!("Found test {}", test.string_value("name")?),
///     Err(Error::Server { title, code, .. }) => {
///         eprintln!("Server refused: {:?} ({:?})", title, code);
///     }
///     Err(Error::HttpError { status, .. }) => eprintln!("HTTP error {}", status),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level error occurred (connection failed, DNS lookup failed, etc.).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The request timed out at the transport layer.
    #[error("Request timed out")]
    Timeout,

    /// A custom [`Transport`](crate::Transport) implementation failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Invalid configuration was provided.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An invalid URL was provided or built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The `is-authenticated` probe did not answer with `401 Unauthorized`.
    #[error("Unexpected HTTP status code during authentication: {0}")]
    UnexpectedAuthStatus(StatusCode),

    /// The `401` probe response carried no `WWW-Authenticate` header.
    #[error("Server did not return authentication method information")]
    MissingAuthChallenge,

    /// The `WWW-Authenticate` header did not describe a single-sign-on realm.
    #[error("Server returned unsupported authentication realm: {0}")]
    UnsupportedRealm(String),

    /// The server rejected the user name or password.
    #[error("Invalid user name or password")]
    InvalidCredentials,

    /// A handshake response did not set a cookie that the session requires.
    #[error("Response did not contain required cookie {0}")]
    MissingCookie(&'static str),

    /// The server refused to open a site session.
    #[error("Could not start session for user {user}: status {status}")]
    SessionRejected {
        /// The user the session was requested for
        user: String,
        /// The HTTP status code of the site-session response
        status: StatusCode,
    },

    /// The server reported a business failure with a structured error body.
    ///
    /// At least one of `title` and `code` is present.
    #[error("{}", describe_server_error(title.as_deref(), code.as_deref()))]
    Server {
        /// The HTTP status code
        status: StatusCode,
        /// Human-readable error title
        title: Option<String>,
        /// Machine error code, e.g. `qccore.entity-not-found`
        code: Option<String>,
    },

    /// The server returned a non-success status without a usable error body.
    #[error("Unexpected HTTP status code, no further information: {status}")]
    HttpError {
        /// The HTTP status code
        status: StatusCode,
        /// The raw response body
        raw_response: String,
    },

    /// Failed to deserialize a response body.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// Failed to serialize a request body.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// An entity cursor was advanced past the declared total.
    #[error("No more elements available (position {position} of {total})")]
    PageExhausted {
        /// The 1-based position that was requested
        position: usize,
        /// The total count declared by the server
        total: usize,
    },

    /// The server returned an empty page although more results were declared.
    #[error("No more elements returned by server at start index {start_index}, although {total} were declared")]
    UnexpectedEmptyPage {
        /// The 1-based start index of the failed page request
        start_index: usize,
        /// The total count declared by the server
        total: usize,
    },

    /// The server time could not be interpreted.
    #[error("Server returned unparseable time: {0}")]
    InvalidServerTime(String),

    /// A folder path argument was empty or malformed.
    #[error("Invalid path {0:?}: must be non-empty, without leading, trailing or double slashes")]
    InvalidPath(String),

    /// A lookup query matched an unexpected number of entities.
    #[error("Query {query:?} on {entity_type} matched {count} entities")]
    UnexpectedMatchCount {
        /// The entity type that was queried
        entity_type: String,
        /// The query token
        query: String,
        /// The number of matches reported by the server
        count: usize,
    },

    /// An entity has no field with the requested name.
    #[error("Entity has no value for field {0}")]
    MissingField(String),

    /// A field value could not be parsed into the requested type.
    #[error("Field {field} has invalid value {value:?}: {reason}")]
    InvalidFieldValue {
        /// The field name
        field: String,
        /// The raw string value
        value: String,
        /// Why parsing failed
        reason: String,
    },
}

fn describe_server_error(title: Option<&str>, code: Option<&str>) -> String {
    match (title, code) {
        (Some(title), Some(code)) => format!("{} ({})", title, code),
        (Some(title), None) => title.to_string(),
        (None, Some(code)) => code.to_string(),
        (None, None) => "Server error".to_string(),
    }
}

impl Error {
    /// Returns `true` if this error aborted the authentication handshake.
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            Error::UnexpectedAuthStatus(_)
                | Error::MissingAuthChallenge
                | Error::UnsupportedRealm(_)
                | Error::InvalidCredentials
                | Error::MissingCookie(_)
                | Error::SessionRejected { .. }
        )
    }

    /// Returns `true` for network and timeout failures.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::Timeout | Error::Transport(_)
        )
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::UnexpectedAuthStatus(status) => Some(*status),
            Error::SessionRejected { status, .. } => Some(*status),
            Error::Server { status, .. } => Some(*status),
            Error::HttpError { status, .. } => Some(*status),
            Error::DeserializationFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::HttpError { raw_response, .. } => Some(raw_response),
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }

    /// Returns the server's machine error code, if it reported one.
    pub fn server_code(&self) -> Option<&str> {
        match self {
            Error::Server { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Returns the server's error title, if it reported one.
    pub fn server_title(&self) -> Option<&str> {
        match self {
            Error::Server { title, .. } => title.as_deref(),
            _ => None,
        }
    }
}

/// A specialized `Result` type for connector operations.
pub type Result<T> = std::result::Result<T, Error>;
