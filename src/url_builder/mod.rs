//! Resolves the final request URL from a base URL, a path and query params.

use regex::Regex;
use serde_json::{Map, Value};

use crate::config::QueryParams;
use crate::errors::{codes, ClassifiedError, ErrorKind, HttpResult};

/// Schemes a resolved URL may carry.
const ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];

const ABSOLUTE_URL_PATTERN: &str = r"^([a-zA-Z][a-zA-Z\d+\-.]*:)?//";

const SCHEME_PATTERN: &str = r"^([a-zA-Z][a-zA-Z\d+\-.]*):";

/// Returns true if `url` has a scheme or is protocol-relative (`//host`).
pub fn is_absolute_url(url: &str) -> bool {
    if let Ok(re) = Regex::new(ABSOLUTE_URL_PATTERN) {
        return re.is_match(url);
    }
    url.starts_with("//")
}

/// Joins a base URL and a relative path with exactly one slash.
pub fn combine_urls(base_url: &str, relative: &str) -> String {
    if relative.is_empty() {
        return base_url.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        relative.trim_start_matches('/')
    )
}

/// Builds the URL a request is sent to.
///
/// Relative URLs are joined onto `base_url`. The result must be a path
/// starting with `/` or carry an `http`/`https` scheme. Any fragment is
/// dropped and serialized `params` are appended to the query string.
///
/// # Example
///
/// ```rust
/// use integrations_http_client::url_builder::build_url;
/// use integrations_http_client::QueryParams;
/// use serde_json::json;
///
/// let params = QueryParams::Map(json!({"q": ["a", "b"]}).as_object().cloned().unwrap());
/// let url = build_url(Some("https://h/api/"), "/search", Some(&params)).unwrap();
/// assert_eq!(url, "https://h/api/search?q[]=a&q[]=b");
/// ```
pub fn build_url(
    base_url: Option<&str>,
    url: &str,
    params: Option<&QueryParams>,
) -> HttpResult<String> {
    let full_url = match base_url {
        Some(base) if !is_absolute_url(url) => combine_urls(base, url),
        _ => url.to_string(),
    };

    check_scheme(&full_url)?;

    let query = params.map(serialize_params).unwrap_or_default();
    if query.is_empty() {
        return Ok(full_url);
    }

    let mut resolved = match full_url.find('#') {
        Some(index) => full_url[..index].to_string(),
        None => full_url,
    };
    resolved.push(if resolved.contains('?') { '&' } else { '?' });
    resolved.push_str(&query);
    Ok(resolved)
}

fn check_scheme(url: &str) -> HttpResult<()> {
    if url.starts_with('/') {
        return Ok(());
    }

    let mut scheme = None;
    if let Ok(re) = Regex::new(SCHEME_PATTERN) {
        scheme = re
            .captures(url)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str());
    }

    match scheme {
        Some(scheme) if !ALLOWED_SCHEMES.iter().any(|s| s.eq_ignore_ascii_case(scheme)) => {
            Err(ClassifiedError::new(
                ErrorKind::InvalidUrl,
                format!("Unsupported protocol {scheme}:"),
            )
            .with_code(codes::ERR_INVALID_URL)
            .with_request(url)
            .into())
        }
        _ => Ok(()),
    }
}

/// Serializes query params.
///
/// Null values are skipped, arrays repeat as `key[]=value` and nested
/// objects are sent as JSON text.
pub fn serialize_params(params: &QueryParams) -> String {
    match params {
        QueryParams::Encoded(encoded) => encoded.to_string(),
        QueryParams::Map(map) => serialize_map(map),
    }
}

fn serialize_map(map: &Map<String, Value>) -> String {
    let mut pairs = Vec::new();

    for (key, value) in map {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                let key = format!("{key}[]");
                for item in items.iter().filter(|item| !item.is_null()) {
                    pairs.push(format!("{}={}", encode(&key), encode(&stringify(item))));
                }
            }
            other => pairs.push(format!("{}={}", encode(key), encode(&stringify(other)))),
        }
    }

    pairs.join("&")
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Form-encodes `text`, keeping `[ ] : $ ,` literal.
fn encode(text: &str) -> String {
    url::form_urlencoded::byte_serialize(text.as_bytes())
        .collect::<String>()
        .replace("%3A", ":")
        .replace("%24", "$")
        .replace("%2C", ",")
        .replace("%5B", "[")
        .replace("%5D", "]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::SearchParams;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;

    fn map(value: Value) -> QueryParams {
        QueryParams::Map(value.as_object().cloned().unwrap_or_default())
    }

    #[test_case("https://a.b/c", true ; "scheme")]
    #[test_case("//a.b/c", true ; "protocol relative")]
    #[test_case("/c", false ; "path")]
    #[test_case("c/d", false ; "relative")]
    fn test_is_absolute_url(url: &str, expected: bool) {
        assert_eq!(is_absolute_url(url), expected);
    }

    #[test_case("https://h/", "/x", "https://h/x" ; "both slashes")]
    #[test_case("https://h", "x", "https://h/x" ; "no slashes")]
    #[test_case("https://h//", "//x", "https://h/x" ; "repeated slashes")]
    #[test_case("https://h/api", "", "https://h/api" ; "empty path")]
    fn test_combine_urls(base: &str, path: &str, expected: &str) {
        assert_eq!(combine_urls(base, path), expected);
    }

    #[test]
    fn test_array_params_repeat_with_brackets() {
        let url = build_url(None, "/search", Some(&map(json!({"q": ["a", null, "b"]})))).unwrap();
        assert_eq!(url, "/search?q[]=a&q[]=b");
    }

    #[test]
    fn test_params_encoding_rules() {
        let params = map(json!({
            "a": "x y",
            "b": null,
            "c": "1:2,$",
            "d": {"k": 1},
            "e": true
        }));
        let url = build_url(Some("https://h"), "/p", Some(&params)).unwrap();
        assert_eq!(url, "https://h/p?a=x+y&c=1:2,$&d=%7B%22k%22:1%7D&e=true");
    }

    #[test]
    fn test_existing_query_and_fragment() {
        let url = build_url(None, "https://h/p?x=1#top", Some(&map(json!({"y": 2})))).unwrap();
        assert_eq!(url, "https://h/p?x=1&y=2");
    }

    #[test]
    fn test_empty_params_append_nothing() {
        let url = build_url(None, "https://h/p#frag", Some(&map(json!({})))).unwrap();
        assert_eq!(url, "https://h/p#frag");
    }

    #[test]
    fn test_search_params_used_verbatim() {
        let params = QueryParams::Encoded(SearchParams::new().with("a", "1").with("a", "2"));
        assert_eq!(build_url(None, "/p", Some(&params)).unwrap(), "/p?a=1&a=2");
    }

    #[test]
    fn test_absolute_url_ignores_base() {
        let url = build_url(Some("https://base"), "http://other/x", None).unwrap();
        assert_eq!(url, "http://other/x");
    }

    #[test_case("javascript:alert(1)" ; "javascript")]
    #[test_case("file:///etc/passwd" ; "file")]
    #[test_case("data:text/html,hi" ; "data")]
    fn test_rejects_disallowed_schemes(url: &str) {
        let err = build_url(None, url, None).unwrap_err();
        let classified = err.classified().unwrap();
        assert_eq!(classified.kind(), ErrorKind::InvalidUrl);
        assert_eq!(classified.code(), Some(codes::ERR_INVALID_URL));
    }

    #[test]
    fn test_scheme_check_is_case_insensitive() {
        assert!(build_url(None, "HTTPS://h/x", None).is_ok());
    }
}
