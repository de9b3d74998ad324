//! Response composition pipeline.
//!
//! A response record is produced by folding an ordered list of transformer
//! functions over a default response. Later transformers win on conflicting
//! fields; headers accumulate via append semantics unless a transformer
//! explicitly replaces one.

use super::{reason_phrase, MockResponse};
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE, SET_COOKIE};
use std::time::Duration;

/// A single step of the composition pipeline.
pub type ResponseTransformer = Box<dyn FnOnce(MockResponse) -> MockResponse + Send>;

/// Fold `transformers` left-to-right over the default response.
pub fn compose(transformers: Vec<ResponseTransformer>) -> MockResponse {
    compose_from(MockResponse::default(), transformers)
}

/// Fold `transformers` left-to-right over `initial`.
pub fn compose_from(
    initial: MockResponse,
    transformers: Vec<ResponseTransformer>,
) -> MockResponse {
    transformers
        .into_iter()
        .fold(initial, |response, transformer| transformer(response))
}

/// Set the status code; the reason phrase follows from the standard table.
pub fn status(code: u16) -> ResponseTransformer {
    Box::new(move |mut response| {
        response.status = code;
        response.status_text = reason_phrase(code).to_string();
        response
    })
}

/// Override the reason phrase independently of the status code.
pub fn status_text(text: impl Into<String>) -> ResponseTransformer {
    let text = text.into();
    Box::new(move |mut response| {
        response.status_text = text;
        response
    })
}

/// Replace all values of a header.
pub fn set_header(name: &str, value: &str) -> ResponseTransformer {
    let parsed = parse_header(name, value);
    Box::new(move |mut response| {
        if let Some((name, value)) = parsed {
            response.headers.insert(name, value);
        }
        response
    })
}

/// Append a header value, keeping any existing ones.
pub fn append_header(name: &str, value: &str) -> ResponseTransformer {
    let parsed = parse_header(name, value);
    Box::new(move |mut response| {
        if let Some((name, value)) = parsed {
            response.headers.append(name, value);
        }
        response
    })
}

/// Append a `Set-Cookie` header; committing the cookie to a store is the
/// transport's responsibility.
pub fn set_cookie(name: &str, value: &str) -> ResponseTransformer {
    let cookie = HeaderValue::from_str(&format!("{name}={value}")).ok();
    Box::new(move |mut response| {
        if let Some(cookie) = cookie {
            response.headers.append(SET_COOKIE, cookie);
        }
        response
    })
}

/// Set a raw body without touching the content type.
pub fn body(bytes: impl Into<Bytes>) -> ResponseTransformer {
    let bytes = bytes.into();
    Box::new(move |mut response| {
        response.body = bytes;
        response
    })
}

/// Set a plain-text body and its content type.
pub fn text(value: impl Into<String>) -> ResponseTransformer {
    let value = value.into();
    Box::new(move |mut response| {
        response.body = Bytes::from(value);
        response
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        response
    })
}

/// Set an XML body and its content type.
pub fn xml(value: impl Into<String>) -> ResponseTransformer {
    let value = value.into();
    Box::new(move |mut response| {
        response.body = Bytes::from(value);
        response
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/xml"));
        response
    })
}

/// Set a JSON body, replacing whatever body came before.
pub fn json(value: serde_json::Value) -> ResponseTransformer {
    Box::new(move |mut response| {
        response.body = Bytes::from(serde_json::to_vec(&value).unwrap_or_default());
        response
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    })
}

/// Deep-merge a JSON value into an already-JSON-shaped body; falls back to
/// replacing the body when it is not valid JSON.
pub fn merge_json(value: serde_json::Value) -> ResponseTransformer {
    Box::new(move |mut response| {
        let merged = match serde_json::from_slice::<serde_json::Value>(&response.body) {
            Ok(mut existing) => {
                deep_merge(&mut existing, value);
                existing
            }
            Err(_) => value,
        };
        response.body = Bytes::from(serde_json::to_vec(&merged).unwrap_or_default());
        response
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    })
}

/// Record a fixed delay for the transport to apply before delivery.
pub fn delay(ms: u64) -> ResponseTransformer {
    Box::new(move |mut response| {
        response.delay = Some(Duration::from_millis(ms));
        response
    })
}

/// Record a delay sampled uniformly from `min_ms..=max_ms`.
pub fn delay_between(min_ms: u64, max_ms: u64) -> ResponseTransformer {
    Box::new(move |mut response| {
        use rand::Rng;
        let (low, high) = if min_ms <= max_ms {
            (min_ms, max_ms)
        } else {
            (max_ms, min_ms)
        };
        let sampled = rand::thread_rng().gen_range(low..=high);
        response.delay = Some(Duration::from_millis(sampled));
        response
    })
}

fn parse_header(name: &str, value: &str) -> Option<(HeaderName, HeaderValue)> {
    match (
        HeaderName::from_bytes(name.as_bytes()),
        HeaderValue::from_str(value),
    ) {
        (Ok(name), Ok(value)) => Some((name, value)),
        _ => None,
    }
}

/// Recursively merge `patch` into `base`: objects merge key-by-key, anything
/// else is replaced.
fn deep_merge(base: &mut serde_json::Value, patch: serde_json::Value) {
    match (base, patch) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                match base_map.get_mut(&key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compose_status_and_json_body() {
        let response = compose(vec![status(404), json(json!({"ok": false}))]);

        assert_eq!(response.status, 404);
        assert_eq!(response.status_text, "Not Found");
        assert_eq!(
            response.headers.get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(response.body_text(), r#"{"ok":false}"#);
    }

    #[test]
    fn test_later_transformers_win() {
        let response = compose(vec![status(500), status(201)]);
        assert_eq!(response.status, 201);
        assert_eq!(response.status_text, "Created");

        let response = compose(vec![text("first"), text("second")]);
        assert_eq!(response.body_text(), "second");
    }

    #[test]
    fn test_headers_accumulate_unless_set() {
        let response = compose(vec![
            append_header("x-tag", "a"),
            append_header("x-tag", "b"),
        ]);
        let values: Vec<_> = response.headers.get_all("x-tag").iter().collect();
        assert_eq!(values.len(), 2);

        let response = compose(vec![
            append_header("x-tag", "a"),
            set_header("x-tag", "only"),
        ]);
        let values: Vec<_> = response.headers.get_all("x-tag").iter().collect();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0], "only");
    }

    #[test]
    fn test_text_sets_content_type() {
        let response = compose(vec![text("hello")]);
        assert_eq!(response.headers.get(CONTENT_TYPE).unwrap(), "text/plain");

        let response = compose(vec![xml("<ok/>")]);
        assert_eq!(response.headers.get(CONTENT_TYPE).unwrap(), "text/xml");
    }

    #[test]
    fn test_merge_json_deep_merges_existing_json_body() {
        let response = compose(vec![
            json(json!({"user": {"id": 1, "name": "a"}, "ok": true})),
            merge_json(json!({"user": {"name": "b"}})),
        ]);

        assert_json_diff::assert_json_eq!(
            response.body_json().unwrap(),
            json!({"user": {"id": 1, "name": "b"}, "ok": true})
        );
    }

    #[test]
    fn test_merge_json_replaces_non_json_body() {
        let response = compose(vec![text("plain"), merge_json(json!({"ok": true}))]);
        assert_eq!(response.body_text(), r#"{"ok":true}"#);
    }

    #[test]
    fn test_delay_is_recorded_not_applied() {
        let response = compose(vec![delay(250)]);
        assert_eq!(response.delay, Some(Duration::from_millis(250)));

        let response = compose(vec![delay_between(10, 20)]);
        let sampled = response.delay.unwrap().as_millis();
        assert!((10..=20).contains(&sampled));
    }

    #[test]
    fn test_set_cookie_appends() {
        let response = compose(vec![set_cookie("sid", "abc"), set_cookie("theme", "dark")]);
        let cookies: Vec<_> = response
            .headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies, vec!["sid=abc", "theme=dark"]);
    }
}
