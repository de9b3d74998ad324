//! Mock response records.
//!
//! A `MockResponse` is built fresh per dispatch by the composition pipeline
//! in [`compose`] and is never shared across requests. The transport applies
//! `delay` and delivers the record; the core only assembles it.

pub mod compose;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use std::borrow::Cow;
use std::time::Duration;

/// Reserved status value marking an explicit pass-through response: the
/// resolver matched but opted out of mocking this particular request.
pub const PASSTHROUGH_STATUS: u16 = 0;

/// A synthesized response record handed back to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Delay the transport applies before delivering the response.
    pub delay: Option<Duration>,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self::new(200)
    }
}

impl MockResponse {
    /// A response with the given status and its standard reason phrase.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            status_text: reason_phrase(status).to_string(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            delay: None,
        }
    }

    /// The explicit pass-through marker.
    pub fn passthrough() -> Self {
        Self {
            status: PASSTHROUGH_STATUS,
            status_text: String::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            delay: None,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.status == PASSTHROUGH_STATUS
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn body_json(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

/// Standard reason phrase for a status code, empty when the code has none.
pub fn reason_phrase(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_phrase_defaults() {
        assert_eq!(reason_phrase(200), "OK");
        assert_eq!(reason_phrase(404), "Not Found");
        assert_eq!(reason_phrase(599), "");
    }

    #[test]
    fn test_passthrough_marker() {
        let marker = MockResponse::passthrough();
        assert!(marker.is_passthrough());
        assert!(!MockResponse::new(200).is_passthrough());
    }
}
