//! `{{name}}` placeholder substitution.

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::OnceLock;

use crate::models::{Environment, Headers};

const TOKEN_PATTERN: &str = r"\{\{([^}]+)\}\}";

/// Compiled token pattern; `None` only if the pattern fails to compile.
fn token_pattern() -> Option<&'static Regex> {
    static TOKEN: OnceLock<Option<Regex>> = OnceLock::new();
    TOKEN
        .get_or_init(|| match Regex::new(TOKEN_PATTERN) {
            Ok(regex) => Some(regex),
            Err(error) => {
                tracing::error!(%error, "Template pattern failed to compile");
                None
            }
        })
        .as_ref()
}

/// Replace every `{{key}}` whose trimmed key exists in `env`.
///
/// Unknown keys are left exactly as written, so resolution never fails.
pub fn resolve(text: &str, env: &Environment) -> String {
    let Some(pattern) = token_pattern() else {
        return text.to_string();
    };
    let resolved: Cow<'_, str> = pattern.replace_all(text, |caps: &Captures| {
        match env.get(caps[1].trim()) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        }
    });
    resolved.into_owned()
}

/// Resolve header values. Keys are never templated.
pub fn resolve_headers(headers: &Headers, env: &Environment) -> Headers {
    headers
        .iter()
        .map(|(key, value)| (key.clone(), resolve(value, env)))
        .collect()
}

/// Keys referenced by `text`, trimmed, in order of appearance
pub fn referenced_keys(text: &str) -> Vec<String> {
    let Some(pattern) = token_pattern() else {
        return Vec::new();
    };
    pattern
        .captures_iter(text)
        .map(|caps| caps[1].trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_pattern_compiles() {
        assert!(token_pattern().is_some());
    }

    fn env() -> Environment {
        [("base", "http://h"), ("token", "abc"), ("empty", "")]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_text_without_tokens_is_unchanged() {
        for s in ["", "plain", "{single}", "{{", "}}", "{{}}", "a { {b} }"] {
            assert_eq!(resolve(s, &env()), s);
        }
    }

    #[test]
    fn test_known_key_is_replaced() {
        assert_eq!(resolve("{{base}}", &env()), "http://h");
        assert_eq!(resolve("{{base}}/x?t={{token}}", &env()), "http://h/x?t=abc");
        assert_eq!(resolve("{{ token }}", &env()), "abc");
    }

    #[test]
    fn test_empty_value_still_replaces() {
        assert_eq!(resolve("a{{empty}}b", &env()), "ab");
    }

    #[test]
    fn test_missing_key_is_left_alone() {
        assert_eq!(resolve("{{missing}}", &env()), "{{missing}}");
        assert_eq!(resolve("{{ missing }}/{{base}}", &env()), "{{ missing }}/http://h");
    }

    #[test]
    fn test_headers_resolve_values_only() {
        let mut headers = Headers::new();
        headers.insert("X-{{token}}".into(), "Bearer {{token}}".into());
        let resolved = resolve_headers(&headers, &env());
        assert_eq!(resolved["X-{{token}}"], "Bearer abc");
    }

    #[test]
    fn test_referenced_keys() {
        assert_eq!(
            referenced_keys("{{ a }}/{{b}}/{c}"),
            vec!["a".to_string(), "b".to_string()]
        );
    }
}
