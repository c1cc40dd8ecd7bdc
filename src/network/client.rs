//! HTTP transport - executes descriptors and captures raw responses
//!
//! Every HTTP status is a successful outcome here. Only faults that leave us
//! without a complete response (DNS, connect, TLS, timeout, broken body)
//! become [`ExecutionResult::Failure`].

use std::error::Error as _;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::redirect::Policy;

use crate::builder::WireBody;
use crate::classify::classify;
use crate::config::Config;
use crate::models::{
    ExecutionResult, FailureData, Headers, HttpMethod, RequestDescriptor, ResponseData,
};

pub const CODE_TIMEOUT: &str = "TIMEOUT";

/// Executes one descriptor at a time against the network
#[derive(Clone, Debug)]
pub struct Transport {
    client: reqwest::Client,
    timeout: Duration,
}

impl Transport {
    pub fn new(config: &Config) -> Self {
        Self::with_limits(config.timeout(), config.max_redirects)
    }

    pub fn with_limits(timeout: Duration, max_redirects: usize) -> Self {
        Transport {
            client: create_client(max_redirects),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute with the configured timeout
    pub async fn execute(&self, descriptor: &RequestDescriptor) -> ExecutionResult {
        self.execute_with_timeout(descriptor, self.timeout).await
    }

    pub async fn execute_with_timeout(
        &self,
        descriptor: &RequestDescriptor,
        timeout: Duration,
    ) -> ExecutionResult {
        let request = match self.prepare(descriptor) {
            Ok(request) => request,
            Err(failure) => return ExecutionResult::Failure(failure),
        };

        let start = Instant::now();
        match tokio::time::timeout(timeout, dispatch(request, start)).await {
            Ok(result) => result,
            Err(_) => ExecutionResult::Failure(FailureData {
                message: format!("Request timed out after {}ms", timeout.as_millis()),
                code: Some(CODE_TIMEOUT.to_string()),
                status: None,
                status_text: None,
                headers: None,
                response_time_ms: elapsed_ms(start),
                raw_body_text: None,
            }),
        }
    }

    fn prepare(&self, descriptor: &RequestDescriptor) -> Result<reqwest::RequestBuilder, FailureData> {
        let mut builder = self
            .client
            .request(to_reqwest_method(descriptor.method), &descriptor.url);

        for (key, value) in &descriptor.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        let wire = descriptor.wire_body().map_err(|e| FailureData {
            message: e.to_string(),
            code: Some("ENCODING".to_string()),
            status: None,
            status_text: None,
            headers: None,
            response_time_ms: 0,
            raw_body_text: None,
        })?;

        builder = match wire {
            WireBody::Empty => builder,
            WireBody::Text(text) => builder.body(text),
            WireBody::Multipart(fields) => {
                let form = fields
                    .into_iter()
                    .fold(reqwest::multipart::Form::new(), |form, (k, v)| form.text(k, v));
                builder.multipart(form)
            }
        };

        Ok(builder)
    }
}

async fn dispatch(request: reqwest::RequestBuilder, start: Instant) -> ExecutionResult {
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => return ExecutionResult::Failure(failure_from_error(&e, start)),
    };

    let status = response.status();
    let status_text = status.canonical_reason().unwrap_or_default().to_string();
    let headers = flatten_headers(response.headers());
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    match response.bytes().await {
        Ok(bytes) => ExecutionResult::Success(ResponseData {
            status: status.as_u16(),
            status_text,
            headers,
            body: classify(&bytes, &content_type),
            response_time_ms: elapsed_ms(start),
            content_type,
            size_bytes: bytes.len(),
        }),
        Err(e) => {
            let mut failure = failure_from_error(&e, start);
            failure.message = format!("Error reading body: {}", failure.message);
            failure.status = Some(status.as_u16());
            failure.status_text = Some(status_text);
            failure.headers = Some(headers);
            ExecutionResult::Failure(failure)
        }
    }
}

fn failure_from_error(error: &reqwest::Error, start: Instant) -> FailureData {
    let detail = error_chain(error);
    let (code, message) = if error.is_timeout() {
        (CODE_TIMEOUT, format!("Request timed out: {detail}"))
    } else if error.is_connect() {
        let lowered = detail.to_lowercase();
        let code = if lowered.contains("dns") || lowered.contains("resolve") {
            "DNS"
        } else if lowered.contains("refused") {
            "CONNECTION_REFUSED"
        } else if lowered.contains("certificate") || lowered.contains("tls") {
            "TLS"
        } else {
            "CONNECT"
        };
        (code, format!("Connection failed: {detail}"))
    } else if error.is_redirect() {
        ("REDIRECT", format!("Too many redirects: {detail}"))
    } else if error.is_builder() {
        ("INVALID_REQUEST", format!("Invalid request: {detail}"))
    } else if error.is_body() || error.is_decode() {
        ("BODY", detail)
    } else {
        ("REQUEST", format!("Request failed: {detail}"))
    };

    FailureData {
        message,
        code: Some(code.to_string()),
        status: error.status().map(|s| s.as_u16()),
        status_text: None,
        headers: None,
        response_time_ms: elapsed_ms(start),
        raw_body_text: None,
    }
}

/// `outer: inner: root` so the useful cause is not hidden behind reqwest's summary
fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Repeated headers are joined with `, `
fn flatten_headers(map: &HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in map {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    headers
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::GET => reqwest::Method::GET,
        HttpMethod::POST => reqwest::Method::POST,
        HttpMethod::PUT => reqwest::Method::PUT,
        HttpMethod::PATCH => reqwest::Method::PATCH,
        HttpMethod::DELETE => reqwest::Method::DELETE,
        HttpMethod::HEAD => reqwest::Method::HEAD,
        HttpMethod::OPTIONS => reqwest::Method::OPTIONS,
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Create an HTTP client that follows at most `max_redirects` redirects
pub fn create_client(max_redirects: usize) -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(Policy::limited(max_redirects))
        .user_agent(concat!("courier/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_flatten_headers_joins_duplicates() {
        let mut map = HeaderMap::new();
        map.append("set-cookie", HeaderValue::from_static("a=1"));
        map.append("set-cookie", HeaderValue::from_static("b=2"));
        map.insert("content-type", HeaderValue::from_static("text/plain"));

        let headers = flatten_headers(&map);
        assert_eq!(headers["set-cookie"], "a=1, b=2");
        assert_eq!(headers["content-type"], "text/plain");
    }

    #[tokio::test]
    async fn test_unparseable_url_is_a_failure_not_a_panic() {
        let transport = Transport::with_limits(Duration::from_secs(1), 5);
        let descriptor = RequestDescriptor {
            method: HttpMethod::GET,
            url: "not a url".to_string(),
            headers: Headers::new(),
            body_encoding: crate::models::BodyEncoding::None,
            body: crate::models::RequestBody::Empty,
        };
        match transport.execute(&descriptor).await {
            ExecutionResult::Failure(failure) => {
                assert!(!failure.message.is_empty());
                assert_eq!(failure.status, None);
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
