//! Layered request headers.

use std::collections::HashMap;

use serde::Serialize;

use super::merge::is_denylisted;
use super::HttpMethod;

/// A flat header map.
pub type Headers = HashMap<String, String>;

/// Returns the stored spelling of `name`, matched case-insensitively.
pub fn find_header_key<'a>(headers: &'a Headers, name: &str) -> Option<&'a String> {
    headers.keys().find(|key| key.eq_ignore_ascii_case(name))
}

/// Looks up a header case-insensitively.
pub fn get_header<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Returns true if the header is present under any casing.
pub fn has_header(headers: &Headers, name: &str) -> bool {
    find_header_key(headers, name).is_some()
}

/// Removes every casing of a header.
pub fn remove_header(headers: &mut Headers, name: &str) -> Option<String> {
    let mut removed = None;
    headers.retain(|key, value| {
        if key.eq_ignore_ascii_case(name) {
            removed = Some(std::mem::take(value));
            false
        } else {
            true
        }
    });
    removed
}

/// Sets a header, replacing any existing casing of the same name.
pub fn set_header(headers: &mut Headers, name: impl Into<String>, value: impl Into<String>) {
    let name = name.into();
    remove_header(headers, &name);
    headers.insert(name, value.into());
}

/// Merges header maps case-insensitively, dropping denylisted names.
pub fn merge_header_maps(base: &Headers, over: &Headers) -> Headers {
    let mut merged: Headers = base
        .iter()
        .filter(|(key, _)| !is_denylisted(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    for (key, value) in over {
        if !is_denylisted(key) {
            set_header(&mut merged, key.clone(), value.clone());
        }
    }
    merged
}

/// Headers organised the way client defaults declare them: a `common` map
/// sent with every request, per-method maps, and per-request entries.
///
/// Flattening applies the layers in that order, later layers winning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeaderConfig {
    /// Headers sent with every method.
    pub common: Headers,
    /// Headers sent only with a given method.
    pub per_method: HashMap<HttpMethod, Headers>,
    /// Headers set directly on the request.
    pub entries: Headers,
}

impl HeaderConfig {
    /// Creates an empty header configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a per-request header.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        set_header(&mut self.entries, name, value);
        self
    }

    /// Looks up a per-request header case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        get_header(&self.entries, name)
    }

    /// Removes a header from every layer.
    pub fn remove(&mut self, name: &str) {
        remove_header(&mut self.entries, name);
        remove_header(&mut self.common, name);
        for headers in self.per_method.values_mut() {
            remove_header(headers, name);
        }
    }

    /// Sets a header sent with every method.
    pub fn set_common(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        set_header(&mut self.common, name, value);
        self
    }

    /// Sets a header sent only with `method`.
    pub fn set_for_method(
        &mut self,
        method: HttpMethod,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        set_header(self.per_method.entry(method).or_default(), name, value);
        self
    }

    /// Returns true if no layer holds a header.
    pub fn is_empty(&self) -> bool {
        self.common.is_empty()
            && self.entries.is_empty()
            && self.per_method.values().all(HashMap::is_empty)
    }

    /// Merges two header configurations layer by layer; `over` wins per key.
    pub fn merge(&self, over: &HeaderConfig) -> HeaderConfig {
        let mut per_method = HashMap::new();
        for method in HttpMethod::ALL {
            let base = self.per_method.get(&method);
            let incoming = over.per_method.get(&method);
            let merged = match (base, incoming) {
                (None, None) => continue,
                (Some(base), None) => merge_header_maps(base, &Headers::new()),
                (None, Some(incoming)) => merge_header_maps(&Headers::new(), incoming),
                (Some(base), Some(incoming)) => merge_header_maps(base, incoming),
            };
            per_method.insert(method, merged);
        }

        HeaderConfig {
            common: merge_header_maps(&self.common, &over.common),
            per_method,
            entries: merge_header_maps(&self.entries, &over.entries),
        }
    }

    /// Collapses the layers into the headers sent for `method`.
    pub fn flatten(&self, method: HttpMethod) -> Headers {
        let mut flat = merge_header_maps(&Headers::new(), &self.common);
        if let Some(method_headers) = self.per_method.get(&method) {
            flat = merge_header_maps(&flat, method_headers);
        }
        merge_header_maps(&flat, &self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_replaces_other_casing() {
        let mut headers = Headers::new();
        set_header(&mut headers, "content-type", "text/plain");
        set_header(&mut headers, "Content-Type", "application/json");

        assert_eq!(headers.len(), 1);
        assert_eq!(get_header(&headers, "CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn test_flatten_layers_in_order() {
        let mut config = HeaderConfig::new();
        config.set_common("Accept", "*/*");
        config.set_common("X-Layer", "common");
        config.set_for_method(HttpMethod::Post, "x-layer", "post");
        config.set("X-Request", "1");

        let post = config.flatten(HttpMethod::Post);
        assert_eq!(get_header(&post, "x-layer"), Some("post"));
        assert_eq!(get_header(&post, "accept"), Some("*/*"));
        assert_eq!(post.len(), 3);

        let get = config.flatten(HttpMethod::Get);
        assert_eq!(get_header(&get, "x-layer"), Some("common"));
    }

    #[test]
    fn test_merge_is_per_key() {
        let mut base = HeaderConfig::new();
        base.set("a", "1");
        base.set_for_method(HttpMethod::Get, "g", "1");
        let mut over = HeaderConfig::new();
        over.set("b", "2");
        over.set("__proto__", "x");

        let merged = base.merge(&over);
        assert_eq!(merged.get("a"), Some("1"));
        assert_eq!(merged.get("b"), Some("2"));
        assert_eq!(merged.get("__proto__"), None);
        assert_eq!(merged.per_method[&HttpMethod::Get]["g"], "1");
    }

    #[test]
    fn test_merge_header_maps_override_wins_across_casing() {
        let base: Headers = [
            ("Content-Type".to_string(), "text/plain".to_string()),
            ("constructor".to_string(), "x".to_string()),
        ]
        .into_iter()
        .collect();
        let over: Headers = [("content-type".to_string(), "application/json".to_string())]
            .into_iter()
            .collect();

        let merged = merge_header_maps(&base, &over);
        assert_eq!(merged.len(), 1);
        assert_eq!(get_header(&merged, "Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_remove_clears_all_layers() {
        let mut config = HeaderConfig::new();
        config.set_common("Authorization", "a");
        config.set_for_method(HttpMethod::Put, "authorization", "b");
        config.set("AUTHORIZATION", "c");

        config.remove("Authorization");
        assert!(config.is_empty());
    }
}
