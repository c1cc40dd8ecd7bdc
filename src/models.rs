use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered header (or form field) mapping; insertion order is kept for display
pub type Headers = IndexMap<String, String>;

/// HTTP Method enum
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum HttpMethod {
    #[default]
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
    HEAD,
    OPTIONS,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::OPTIONS => "OPTIONS",
        }
    }

    pub fn next(&self) -> HttpMethod {
        match self {
            HttpMethod::GET => HttpMethod::POST,
            HttpMethod::POST => HttpMethod::PUT,
            HttpMethod::PUT => HttpMethod::PATCH,
            HttpMethod::PATCH => HttpMethod::DELETE,
            HttpMethod::DELETE => HttpMethod::HEAD,
            HttpMethod::HEAD => HttpMethod::OPTIONS,
            HttpMethod::OPTIONS => HttpMethod::GET,
        }
    }

    /// Only these methods ever carry a request body
    pub fn accepts_body(&self) -> bool {
        matches!(
            self,
            HttpMethod::POST | HttpMethod::PUT | HttpMethod::PATCH | HttpMethod::DELETE
        )
    }

    pub fn parse(s: &str) -> Option<HttpMethod> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::GET),
            "POST" => Some(HttpMethod::POST),
            "PUT" => Some(HttpMethod::PUT),
            "PATCH" => Some(HttpMethod::PATCH),
            "DELETE" => Some(HttpMethod::DELETE),
            "HEAD" => Some(HttpMethod::HEAD),
            "OPTIONS" => Some(HttpMethod::OPTIONS),
            _ => None,
        }
    }
}

/// How a request body is serialized on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BodyEncoding {
    #[serde(rename = "none")]
    None,
    #[default]
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "form-data")]
    FormData,
    #[serde(rename = "x-www-form-urlencoded", alias = "url-encoded")]
    UrlEncoded,
    #[serde(rename = "raw")]
    Raw,
}

impl BodyEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyEncoding::None => "none",
            BodyEncoding::Json => "json",
            BodyEncoding::FormData => "form-data",
            BodyEncoding::UrlEncoded => "x-www-form-urlencoded",
            BodyEncoding::Raw => "raw",
        }
    }

    pub fn next(&self) -> BodyEncoding {
        match self {
            BodyEncoding::None => BodyEncoding::Json,
            BodyEncoding::Json => BodyEncoding::FormData,
            BodyEncoding::FormData => BodyEncoding::UrlEncoded,
            BodyEncoding::UrlEncoded => BodyEncoding::Raw,
            BodyEncoding::Raw => BodyEncoding::None,
        }
    }

    /// Form encodings are edited as key/value fields rather than free text
    pub fn uses_fields(&self) -> bool {
        matches!(self, BodyEncoding::FormData | BodyEncoding::UrlEncoded)
    }
}

/// Body as the user authored it, before any encoding.
///
/// Text is JSON or raw editor content, fields come from form editors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawBody {
    Text(String),
    Fields(IndexMap<String, String>),
    Json(Value),
}

impl RawBody {
    /// Reshape a stored body to fit `encoding`.
    ///
    /// Untagged storage reads a string-valued JSON object as fields, and form
    /// fields written by hand may carry non-string JSON values.
    pub fn conform_to(self, encoding: BodyEncoding) -> RawBody {
        match (encoding, self) {
            (BodyEncoding::Json | BodyEncoding::Raw, RawBody::Fields(fields)) => RawBody::Json(
                Value::Object(fields.into_iter().map(|(k, v)| (k, Value::String(v))).collect()),
            ),
            (BodyEncoding::FormData | BodyEncoding::UrlEncoded, RawBody::Json(Value::Object(map))) => {
                RawBody::Fields(
                    map.into_iter()
                        .map(|(k, v)| match v {
                            Value::String(s) => (k, s),
                            other => (k, other.to_string()),
                        })
                        .collect(),
                )
            }
            (_, body) => body,
        }
    }
}

/// Body of a resolved request, ready to be encoded by the transport
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Fields(IndexMap<String, String>),
    Raw(String),
}

impl RequestBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }
}

/// Fully-resolved, transport-ready request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub body_encoding: BodyEncoding,
    pub body: RequestBody,
}

/// Unresolved request as held by the editor and stored in collections
#[derive(Clone, Debug, PartialEq, Default)]
pub struct RequestDraft {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub body_encoding: BodyEncoding,
    pub body: Option<RawBody>,
}

/// Case-insensitive header lookup
pub fn get_header<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Insert a header, replacing any existing header with the same name in any case
pub fn set_header(headers: &mut Headers, name: &str, value: impl Into<String>) {
    remove_header(headers, name);
    headers.insert(name.to_string(), value.into());
}

pub fn remove_header(headers: &mut Headers, name: &str) {
    headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
}

/// Response body decoded for display and storage
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum DecodedBody {
    Structured(Value),
    Text(String),
    /// `data:<mime>;base64,...`
    ImageDataUri(String),
    /// Best-effort text, or an octet-stream data URI
    Binary(String),
}

/// An HTTP response was obtained (any status code)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseData {
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub body: DecodedBody,
    pub response_time_ms: u64,
    pub content_type: String,
    pub size_bytes: usize,
}

/// No complete response was obtained
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureData {
    pub message: String,
    pub code: Option<String>,
    pub status: Option<u16>,
    pub status_text: Option<String>,
    pub headers: Option<Headers>,
    pub response_time_ms: u64,
    pub raw_body_text: Option<String>,
}

/// Outcome of executing a descriptor
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ExecutionResult {
    Success(ResponseData),
    Failure(FailureData),
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ExecutionResult::Success(data) => Some(data.status),
            ExecutionResult::Failure(data) => data.status,
        }
    }

    pub fn response_time_ms(&self) -> u64 {
        match self {
            ExecutionResult::Success(data) => data.response_time_ms,
            ExecutionResult::Failure(data) => data.response_time_ms,
        }
    }
}

/// A request stored in a collection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredRequest")]
pub struct SavedRequest {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub method: HttpMethod,
    pub url: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub body_type: BodyEncoding,
    #[serde(default)]
    pub body: Option<RawBody>,
    #[serde(default)]
    pub timestamp: String,
}

/// On-disk shape of a [`SavedRequest`], before the body is matched to `bodyType`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRequest {
    #[serde(default)]
    id: String,
    name: String,
    method: HttpMethod,
    url: String,
    #[serde(default)]
    headers: Headers,
    #[serde(default)]
    body_type: BodyEncoding,
    #[serde(default)]
    body: Option<RawBody>,
    #[serde(default)]
    timestamp: String,
}

impl From<StoredRequest> for SavedRequest {
    fn from(stored: StoredRequest) -> Self {
        SavedRequest {
            id: stored.id,
            name: stored.name,
            method: stored.method,
            url: stored.url,
            headers: stored.headers,
            body_type: stored.body_type,
            body: stored.body.map(|body| body.conform_to(stored.body_type)),
            timestamp: stored.timestamp,
        }
    }
}

impl SavedRequest {
    pub fn from_draft(
        id: impl Into<String>,
        name: impl Into<String>,
        draft: &RequestDraft,
        timestamp: impl Into<String>,
    ) -> Self {
        SavedRequest {
            id: id.into(),
            name: name.into(),
            method: draft.method,
            url: draft.url.clone(),
            headers: draft.headers.clone(),
            body_type: draft.body_encoding,
            body: draft.body.clone(),
            timestamp: timestamp.into(),
        }
    }

    pub fn draft(&self) -> RequestDraft {
        RequestDraft {
            method: self.method,
            url: self.url.clone(),
            headers: self.headers.clone(),
            body_encoding: self.body_type,
            body: self.body.clone(),
        }
    }
}

/// A named group of saved requests
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub requests: Vec<SavedRequest>,
    #[serde(default)]
    pub expanded: bool,
}

impl Collection {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Collection {
            id: id.into(),
            name: name.into(),
            requests: Vec::new(),
            expanded: true,
        }
    }
}

/// Collections keyed by id, in creation order
pub type Collections = IndexMap<String, Collection>;

/// Environment variables used for `{{name}}` substitution
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment {
    variables: IndexMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.variables.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.variables.shift_remove(key)
    }

    /// Incoming keys overwrite existing ones
    pub fn merge(&mut self, other: &Environment) {
        for (key, value) in other.iter() {
            self.variables.insert(key.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.variables.iter()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut env = Environment::new();
        for (key, value) in iter {
            env.set(key, value);
        }
        env
    }
}

/// One sent request and what came back
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// ISO-8601, unique within the history
    pub timestamp: String,
    pub request: RequestDescriptor,
    pub response: ExecutionResult,
}
