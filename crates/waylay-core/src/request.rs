//! Captured request representation.
//!
//! The transport intercepts a real outgoing request and hands the core a
//! `CapturedRequest`. The core never mutates it; match parameters extracted
//! by a handler travel alongside the request in the resolution output.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use once_cell::sync::OnceCell;
use std::borrow::Cow;
use url::Url;
use uuid::Uuid;

/// An intercepted outgoing request.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    id: Uuid,
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
    parsed_body: OnceCell<Option<serde_json::Value>>,
}

impl CapturedRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            parsed_body: OnceCell::new(),
        }
    }

    /// Append a header. Invalid names or values are ignored, matching how the
    /// transport drops malformed header lines.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self.parsed_body = OnceCell::new();
        self
    }

    /// Set a JSON body along with its content type.
    pub fn with_json(self, value: &serde_json::Value) -> Self {
        self.with_header("content-type", "application/json")
            .with_body(serde_json::to_vec(value).unwrap_or_default())
    }

    /// Opaque identifier correlating the lifecycle events of this request.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// The body parsed as JSON, computed once on first access.
    pub fn body_json(&self) -> Option<&serde_json::Value> {
        self.parsed_body
            .get_or_init(|| serde_json::from_slice(&self.body).ok())
            .as_ref()
    }

    /// First query-string value for `name`, percent-decoded.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// Request line used in diagnostics, e.g. `GET https://example.com/users`.
    pub fn request_line(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str) -> CapturedRequest {
        CapturedRequest::new(Method::GET, Url::parse(url).unwrap())
    }

    #[test]
    fn test_body_json_is_lazy_and_cached() {
        let req = request("https://example.com/api")
            .with_body(r#"{"query": "{ user }"}"#.as_bytes().to_vec());

        let first = req.body_json().unwrap();
        assert_eq!(first["query"], "{ user }");
        // Second access returns the same cached value
        assert!(std::ptr::eq(first, req.body_json().unwrap()));
    }

    #[test]
    fn test_body_json_none_for_invalid_json() {
        let req = request("https://example.com/api").with_body("not json".as_bytes().to_vec());
        assert!(req.body_json().is_none());
    }

    #[test]
    fn test_query_param_decoding() {
        let req = request("https://example.com/api?query=%7B%20user%20%7D&x=1");
        assert_eq!(req.query_param("query").as_deref(), Some("{ user }"));
        assert_eq!(req.query_param("missing"), None);
    }

    #[test]
    fn test_headers_are_a_multi_map() {
        let req = request("https://example.com/")
            .with_header("set-cookie", "a=1")
            .with_header("set-cookie", "b=2");
        let values: Vec<_> = req.headers().get_all("set-cookie").iter().collect();
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(request("https://a.test/").id(), request("https://a.test/").id());
    }
}
