//! Response body classification by declared content type.
//!
//! Dispatch order (case-insensitive substring match, first match wins):
//! `application/json`, then `text/` or `application/xml`, then `image/`,
//! then a best-effort fallback. Every byte sequence maps to exactly one
//! [`DecodedBody`].

use base64::Engine;
use serde_json::Value;

use crate::constants::OCTET_STREAM_CONTENT_TYPE;
use crate::models::DecodedBody;

/// Decode `bytes` for display according to `content_type`.
pub fn classify(bytes: &[u8], content_type: &str) -> DecodedBody {
    let lowered = content_type.to_ascii_lowercase();

    if lowered.contains("application/json") {
        return match parse_structured(bytes) {
            Some(value) => DecodedBody::Structured(value),
            None => DecodedBody::Text(lossy_text(bytes)),
        };
    }

    if lowered.contains("text/") || lowered.contains("application/xml") {
        return DecodedBody::Text(lossy_text(bytes));
    }

    if lowered.contains("image/") {
        return DecodedBody::ImageDataUri(data_uri(content_type, bytes));
    }

    match strict_text(bytes) {
        Some(text) => DecodedBody::Binary(text),
        None => DecodedBody::Binary(data_uri(OCTET_STREAM_CONTENT_TYPE, bytes)),
    }
}

fn parse_structured(bytes: &[u8]) -> Option<Value> {
    let text = std::str::from_utf8(bytes).ok()?;
    serde_json::from_str(text).ok()
}

fn lossy_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Text only if the bytes are non-empty UTF-8 without control characters
/// other than common whitespace.
fn strict_text(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    let text = std::str::from_utf8(bytes).ok()?;
    let printable = text
        .chars()
        .all(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'));
    printable.then(|| text.to_string())
}

/// `data:<mime>;base64,<payload>`
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_json_is_structured() {
        let body = br#"{"users": [{"id": 1}], "ok": true}"#;
        assert_eq!(
            classify(body, "application/json; charset=utf-8"),
            DecodedBody::Structured(json!({"users": [{"id": 1}], "ok": true}))
        );
    }

    #[test]
    fn test_structured_reclassifies_to_equal_value() {
        let body = br#"{ "b": [1, 2.5, null], "a": {"nested": "x"} }"#;
        let DecodedBody::Structured(first) = classify(body, "application/json") else {
            panic!("expected structured body");
        };
        let reserialized = serde_json::to_vec(&first).unwrap();
        assert_eq!(
            classify(&reserialized, "application/json"),
            DecodedBody::Structured(first)
        );
    }

    #[test]
    fn test_invalid_json_falls_back_to_text() {
        assert_eq!(
            classify(b"{oops", "application/json"),
            DecodedBody::Text("{oops".to_string())
        );
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        assert_eq!(
            classify(b"[1]", "Application/JSON"),
            DecodedBody::Structured(json!([1]))
        );
        assert_eq!(
            classify(b"<a/>", "APPLICATION/XML"),
            DecodedBody::Text("<a/>".to_string())
        );
    }

    #[test]
    fn test_text_types() {
        assert_eq!(
            classify(b"not found", "text/plain"),
            DecodedBody::Text("not found".to_string())
        );
        assert_eq!(
            classify(b"<html></html>", "text/html; charset=utf-8"),
            DecodedBody::Text("<html></html>".to_string())
        );
    }

    #[test]
    fn test_image_always_data_uri() {
        for bytes in [&b""[..], &[0x89, b'P', b'N', b'G', 0, 0xff][..], b"text"] {
            match classify(bytes, "image/png") {
                DecodedBody::ImageDataUri(uri) => {
                    assert!(uri.starts_with("data:image/png;base64,"))
                }
                other => panic!("expected image, got {other:?}"),
            }
        }
        assert_eq!(
            classify(&[1, 2, 3], "image/gif"),
            DecodedBody::ImageDataUri("data:image/gif;base64,AQID".to_string())
        );
    }

    #[test]
    fn test_empty_without_content_type_is_octet_stream() {
        assert_eq!(
            classify(b"", ""),
            DecodedBody::Binary("data:application/octet-stream;base64,".to_string())
        );
    }

    #[test]
    fn test_unknown_type_prefers_text() {
        assert_eq!(
            classify(b"id,name\n1,x\n", "application/csv"),
            DecodedBody::Binary("id,name\n1,x\n".to_string())
        );
        assert_eq!(
            classify(&[0xde, 0xad, 0xbe, 0xef], "application/octet-stream"),
            DecodedBody::Binary("data:application/octet-stream;base64,3q2+7w==".to_string())
        );
        assert_eq!(
            classify(&[0, 1, 2], ""),
            DecodedBody::Binary("data:application/octet-stream;base64,AAEC".to_string())
        );
    }
}
