//! Request parsing: raw HTTP request parts -> `InboundEvent`.
//!
//! Two body encodings are accepted, selected by the declared content type:
//!
//! - `application/vnd.github-services+json`: a single JSON document with
//!   `data` and `payload` fields.
//! - anything else: url-encoded parameters `data` and `payload`, each a
//!   JSON-encoded string. Parameters are read from the body first and the
//!   query string second, and both are required.
//!
//! The event name always comes from the route.

use http::header::CONTENT_TYPE;
use http::HeaderMap;
use hookshot_core::{HookError, InboundEvent, Mapping};
use serde::Deserialize;
use serde_json::Value;

/// Content type of the structured JSON encoding.
pub const JSON_CONTENT_TYPE: &str = "application/vnd.github-services+json";

/// Malformed request body or parameters.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed JSON request body: {0}")]
    Body(#[source] serde_json::Error),
    #[error("malformed form request body: {0}")]
    Form(#[source] serde_urlencoded::de::Error),
    #[error("malformed JSON in `{field}` parameter: {source}")]
    Field {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("`{field}` must be a JSON object")]
    NotAnObject { field: &'static str },
    #[error("missing `{field}` parameter")]
    MissingField { field: &'static str },
}

impl From<ParseError> for HookError {
    fn from(err: ParseError) -> Self {
        HookError::Unclassified(anyhow::Error::new(err))
    }
}

#[derive(Deserialize)]
struct JsonBody {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    payload: Option<Value>,
}

#[derive(Deserialize, Default)]
struct FormParams {
    data: Option<String>,
    payload: Option<String>,
}

/// Returns `true` when the `Content-Type` header selects the JSON encoding.
/// Media type parameters (e.g. `charset`) are ignored.
#[must_use]
pub fn is_json_request(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|media| media.trim().eq_ignore_ascii_case(JSON_CONTENT_TYPE))
}

/// Parse a webhook request into an [`InboundEvent`].
///
/// In the JSON encoding a missing or `null` `data`/`payload` becomes an
/// empty mapping. In the form encoding both parameters must be present.
///
/// # Errors
///
/// Returns [`ParseError`] for malformed JSON, a malformed form body, a
/// missing form parameter, or a `data`/`payload` value that is not a JSON
/// object.
pub fn parse_request(
    event_name: &str,
    headers: &HeaderMap,
    query: Option<&str>,
    body: &[u8],
) -> Result<InboundEvent, ParseError> {
    if is_json_request(headers) {
        parse_json_request(event_name, body)
    } else {
        parse_form_request(event_name, query, body)
    }
}

fn parse_json_request(event_name: &str, body: &[u8]) -> Result<InboundEvent, ParseError> {
    let req: JsonBody = serde_json::from_slice(body).map_err(ParseError::Body)?;
    Ok(InboundEvent::new(
        event_name,
        into_mapping("data", req.data)?,
        into_mapping("payload", req.payload)?,
    ))
}

fn parse_form_request(
    event_name: &str,
    query: Option<&str>,
    body: &[u8],
) -> Result<InboundEvent, ParseError> {
    let from_body: FormParams = serde_urlencoded::from_bytes(body).map_err(ParseError::Form)?;
    let from_query: FormParams = match query {
        Some(q) => serde_urlencoded::from_str(q).map_err(ParseError::Form)?,
        None => FormParams::default(),
    };

    let data = from_body.data.or(from_query.data);
    let payload = from_body.payload.or(from_query.payload);

    Ok(InboundEvent::new(
        event_name,
        decode_field("data", data.as_deref())?,
        decode_field("payload", payload.as_deref())?,
    ))
}

fn decode_field(field: &'static str, raw: Option<&str>) -> Result<Mapping, ParseError> {
    let raw = raw.ok_or(ParseError::MissingField { field })?;
    let value = serde_json::from_str(raw).map_err(|source| ParseError::Field { field, source })?;
    into_mapping(field, Some(value))
}

fn into_mapping(field: &'static str, value: Option<Value>) -> Result<Mapping, ParseError> {
    match value {
        None | Some(Value::Null) => Ok(Mapping::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(ParseError::NotAnObject { field }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
