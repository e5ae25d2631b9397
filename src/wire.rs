//! JSON wire format of the server and the XML handshake documents.
//!
//! The serde types here mirror the server's JSON shapes and are converted
//! to and from the public model at the edges, so nothing outside this
//! module depends on field spellings like `TotalResults`.

use crate::entity::{Entity, Field, Fields};
use crate::{Error, Result};
use http::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct WireEntity {
    #[serde(rename = "Type", default)]
    entity_type: String,
    #[serde(rename = "Fields", default)]
    fields: Vec<WireField>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireField {
    #[serde(rename = "Name")]
    name: String,
    #[serde(default)]
    values: Vec<WireValue>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireResultSet {
    #[serde(default)]
    entities: Option<Vec<WireEntity>>,
    #[serde(rename = "TotalResults", alias = "totalResults", default)]
    total_results: usize,
}

#[derive(Debug, Deserialize)]
struct WireServerError {
    #[serde(rename = "Id", alias = "id", default)]
    id: Option<String>,
    #[serde(rename = "Title", alias = "title", default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireServerTime {
    #[serde(rename = "TimeInMillis")]
    time_in_millis: String,
    #[serde(rename = "DateTime")]
    date_time: String,
}

impl From<&Entity> for WireEntity {
    fn from(entity: &Entity) -> Self {
        WireEntity {
            entity_type: entity.entity_type().to_string(),
            fields: entity
                .fields()
                .iter()
                .map(|f| WireField {
                    name: f.name().to_string(),
                    values: f
                        .values()
                        .iter()
                        .map(|v| WireValue {
                            value: Some(v.clone()),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

impl From<WireEntity> for Entity {
    fn from(wire: WireEntity) -> Self {
        let fields: Fields = wire
            .fields
            .into_iter()
            .map(|f| Field::with_values(f.name, f.values.into_iter().filter_map(|v| v.value)))
            .collect();
        Entity::with_fields(wire.entity_type, fields)
    }
}

/// One page of a query result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    /// The entities on this page, in server order.
    pub entities: Vec<Entity>,
    /// The server's total match count for the whole query.
    pub total_results: usize,
}

/// Server wall-clock time as reported by the server time endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerTime {
    /// Milliseconds since the epoch, as a decimal string.
    pub time_in_millis: String,
    /// Wall-clock time formatted as `yyyy-MM-dd HH:mm:ss`.
    pub date_time: String,
}

/// Structured error body reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerError {
    pub title: Option<String>,
    pub code: Option<String>,
}

pub fn encode_entity(entity: &Entity) -> Result<Vec<u8>> {
    serde_json::to_vec(&WireEntity::from(entity)).map_err(|e| Error::SerializationFailed(e.to_string()))
}

pub fn decode_entity(status: StatusCode, body: &[u8]) -> Result<Entity> {
    decode::<WireEntity>(status, body).map(Entity::from)
}

pub fn decode_result_set(status: StatusCode, body: &[u8]) -> Result<ResultSet> {
    let wire = decode::<WireResultSet>(status, body)?;
    Ok(ResultSet {
        entities: wire
            .entities
            .unwrap_or_default()
            .into_iter()
            .map(Entity::from)
            .collect(),
        total_results: wire.total_results,
    })
}

pub fn decode_server_time(status: StatusCode, body: &[u8]) -> Result<ServerTime> {
    let wire = decode::<WireServerTime>(status, body)?;
    Ok(ServerTime {
        time_in_millis: wire.time_in_millis,
        date_time: wire.date_time,
    })
}

/// Parses an error body. Returns `None` for anything unusable, including
/// bodies that parse but carry neither title nor code.
pub fn decode_server_error(body: &[u8]) -> Option<ServerError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    let wire: WireServerError = serde_json::from_slice(body).ok()?;
    if wire.title.is_none() && wire.id.is_none() {
        return None;
    }
    Some(ServerError {
        title: wire.title,
        code: wire.id,
    })
}

fn decode<T: serde::de::DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| {
        let raw_response = String::from_utf8_lossy(body).into_owned();
        tracing::error!(
            error = %e,
            raw_response = %raw_response,
            "Failed to deserialize response"
        );
        Error::DeserializationFailed {
            raw_response,
            serde_error: e.to_string(),
            status,
        }
    })
}

/// Credentials document for the single-sign-on endpoint.
pub fn authentication_document(user: &str, password: &str) -> Vec<u8> {
    format!(
        "<alm-authentication><user>{}</user><password>{}</password></alm-authentication>",
        escape_xml(user),
        escape_xml(password)
    )
    .into_bytes()
}

/// Site-session request with a timeout in minutes.
pub fn session_parameters_document(timeout_minutes: u32) -> Vec<u8> {
    format!(
        "<session-parameters><time-out>{}</time-out></session-parameters>",
        timeout_minutes
    )
    .into_bytes()
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
