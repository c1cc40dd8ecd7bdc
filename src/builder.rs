//! Turns editor input into a resolved [`RequestDescriptor`].
//!
//! Building never touches the network. The only failures are input problems
//! the user has to fix before anything is sent.

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

use crate::constants::{FORM_URLENCODED_CONTENT_TYPE, JSON_CONTENT_TYPE};
use crate::models::{
    remove_header, set_header, BodyEncoding, Environment, Headers, HttpMethod, RawBody,
    RequestBody, RequestDescriptor, RequestDraft,
};
use crate::template::{resolve, resolve_headers};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("Please enter a URL")]
    EmptyUrl,

    #[error("Invalid JSON in request body: {0}")]
    InvalidJson(String),

    #[error("{encoding} body expects {expected}")]
    BodyShapeMismatch {
        encoding: &'static str,
        expected: &'static str,
    },

    #[error("Failed to encode request body: {0}")]
    Encoding(String),
}

/// Assemble a descriptor from raw input and an environment snapshot.
pub fn build(
    method: HttpMethod,
    raw_url: &str,
    raw_headers: &Headers,
    encoding: BodyEncoding,
    raw_body: Option<&RawBody>,
    env: &Environment,
) -> Result<RequestDescriptor, BuildError> {
    let url = resolve(raw_url.trim(), env);
    if url.is_empty() {
        return Err(BuildError::EmptyUrl);
    }

    let mut headers = resolve_headers(raw_headers, env);

    let body = match raw_body {
        Some(raw) if method.accepts_body() => encode_body(encoding, raw, &mut headers)?,
        _ => RequestBody::Empty,
    };

    Ok(RequestDescriptor {
        method,
        url,
        headers,
        body_encoding: encoding,
        body,
    })
}

impl RequestDraft {
    /// Resolve this draft against `env`
    pub fn build(&self, env: &Environment) -> Result<RequestDescriptor, BuildError> {
        build(
            self.method,
            &self.url,
            &self.headers,
            self.body_encoding,
            self.body.as_ref(),
            env,
        )
    }
}

fn encode_body(
    encoding: BodyEncoding,
    raw: &RawBody,
    headers: &mut Headers,
) -> Result<RequestBody, BuildError> {
    let body = match (encoding, raw) {
        (BodyEncoding::None, _) => return Ok(RequestBody::Empty),

        (BodyEncoding::Json, RawBody::Text(text)) if text.trim().is_empty() => {
            return Ok(RequestBody::Empty)
        }
        (BodyEncoding::Json, RawBody::Text(text)) => {
            let value: Value = serde_json::from_str(text)
                .map_err(|e| BuildError::InvalidJson(e.to_string()))?;
            RequestBody::Json(value)
        }
        (BodyEncoding::Json, RawBody::Json(value)) => RequestBody::Json(value.clone()),

        (BodyEncoding::FormData, RawBody::Fields(fields)) => {
            // the transport sets the multipart boundary
            remove_header(headers, "Content-Type");
            return Ok(RequestBody::Fields(fields.clone()));
        }

        (BodyEncoding::UrlEncoded, RawBody::Fields(fields)) => {
            set_header(headers, "Content-Type", FORM_URLENCODED_CONTENT_TYPE);
            return Ok(RequestBody::Fields(fields.clone()));
        }

        (BodyEncoding::Raw, RawBody::Text(text)) if text.is_empty() => {
            return Ok(RequestBody::Empty)
        }
        (BodyEncoding::Raw, RawBody::Text(text)) => return Ok(RequestBody::Raw(text.clone())),
        (BodyEncoding::Raw, RawBody::Json(value)) => {
            return Ok(RequestBody::Raw(value.to_string()))
        }

        (BodyEncoding::Json, RawBody::Fields(_)) => {
            return Err(mismatch(encoding, "JSON text"));
        }
        (BodyEncoding::FormData | BodyEncoding::UrlEncoded, _) => {
            return Err(mismatch(encoding, "key/value fields"));
        }
        (BodyEncoding::Raw, RawBody::Fields(_)) => {
            return Err(mismatch(encoding, "text"));
        }
    };

    set_header(headers, "Content-Type", JSON_CONTENT_TYPE);
    Ok(body)
}

fn mismatch(encoding: BodyEncoding, expected: &'static str) -> BuildError {
    BuildError::BodyShapeMismatch {
        encoding: encoding.as_str(),
        expected,
    }
}

/// Body bytes (or multipart fields) exactly as they go on the wire
#[derive(Debug, Clone, PartialEq)]
pub enum WireBody {
    Empty,
    Text(String),
    Multipart(IndexMap<String, String>),
}

impl RequestDescriptor {
    /// Serialize the body according to `body_encoding`
    pub fn wire_body(&self) -> Result<WireBody, BuildError> {
        match (&self.body, self.body_encoding) {
            (RequestBody::Empty, _) => Ok(WireBody::Empty),
            (RequestBody::Json(value), _) => serde_json::to_string(value)
                .map(WireBody::Text)
                .map_err(|e| BuildError::Encoding(e.to_string())),
            (RequestBody::Fields(fields), BodyEncoding::FormData) => {
                Ok(WireBody::Multipart(fields.clone()))
            }
            (RequestBody::Fields(fields), _) => encode_urlencoded(fields).map(WireBody::Text),
            (RequestBody::Raw(text), _) => Ok(WireBody::Text(text.clone())),
        }
    }
}

/// `key=value` pairs joined by `&`, percent-encoded
pub fn encode_urlencoded(fields: &IndexMap<String, String>) -> Result<String, BuildError> {
    let pairs: Vec<(&str, &str)> = fields
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    serde_urlencoded::to_string(pairs).map_err(|e| BuildError::Encoding(e.to_string()))
}
