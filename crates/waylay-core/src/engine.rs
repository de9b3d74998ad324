//! Resolution engine: first-match scan over a registry snapshot.

use crate::error::DispatchError;
use crate::handler::{ExecutionResult, MockHandler};
use crate::request::CapturedRequest;
use std::sync::Arc;
use tracing::debug;

/// Find and execute the first applicable handler.
///
/// Handlers are tried in the snapshot's order (index 0 is the most recently
/// registered). A match stops the scan even when the resolver produced no
/// response. Handler failures are not caught here; they are bugs in user
/// mocking code.
pub async fn resolve_request(
    request: &Arc<CapturedRequest>,
    handlers: &[Arc<MockHandler>],
) -> Result<Option<ExecutionResult>, DispatchError> {
    for handler in handlers {
        if let Some(result) = handler.run(request).await? {
            debug!(
                request = %request.request_line(),
                handler = %result.handler,
                "request matched handler"
            );
            return Ok(Some(result));
        }
    }
    debug!(request = %request.request_line(), "no handler matched request");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{respond_with, Responder, ResolverReply};
    use crate::response::{compose, MockResponse};
    use http::Method;
    use url::Url;

    fn request(url: &str) -> Arc<CapturedRequest> {
        Arc::new(CapturedRequest::new(Method::GET, Url::parse(url).unwrap()))
    }

    fn handler(path: &str, status: u16) -> Arc<MockHandler> {
        Arc::new(
            MockHandler::http(
                "GET",
                path,
                Responder::direct(respond_with(move |_| async move {
                    Ok(ResolverReply::Response(compose::compose(vec![
                        compose::status(status),
                    ])))
                })),
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_first_matching_handler_wins() {
        let handlers = vec![
            handler("/other", 500),
            handler("/user/:id", 201),
            handler("/user/:id", 202),
        ];

        let result = resolve_request(&request("https://example.com/user/1"), &handlers)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.response.unwrap().status, 201);
    }

    #[tokio::test]
    async fn test_reordering_changes_result_only_with_overlap() {
        let a = handler("/a", 201);
        let b = handler("/b", 202);

        let forward = resolve_request(
            &request("https://example.com/b"),
            &[Arc::clone(&a), Arc::clone(&b)],
        )
        .await
        .unwrap()
        .unwrap();
        let reversed = resolve_request(&request("https://example.com/b"), &[b, a])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            forward.response.unwrap().status,
            reversed.response.unwrap().status
        );
    }

    #[tokio::test]
    async fn test_no_match_returns_none() {
        let handlers = vec![handler("/a", 200)];
        let result = resolve_request(&request("https://example.com/zzz"), &handlers)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_empty_resolver_result_still_stops_the_scan() {
        let silent = Arc::new(
            MockHandler::http(
                "GET",
                "/a",
                Responder::direct(respond_with(|_| async { Ok(ResolverReply::Empty) })),
            )
            .unwrap(),
        );
        let handlers = vec![silent, handler("/a", 200)];

        let result = resolve_request(&request("https://example.com/a"), &handlers)
            .await
            .unwrap()
            .unwrap();
        assert!(result.response.is_none());
    }

    #[tokio::test]
    async fn test_used_once_handler_is_skipped_and_scan_continues() {
        let once = Arc::new(
            MockHandler::http(
                "GET",
                "/a",
                Responder::direct(respond_with(|_| async {
                    Ok(ResolverReply::Response(MockResponse::new(201)))
                })),
            )
            .unwrap()
            .once(),
        );
        let fallback = handler("/a", 202);
        let handlers = vec![once, fallback];

        let first = resolve_request(&request("https://example.com/a"), &handlers)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.response.unwrap().status, 201);

        let second = resolve_request(&request("https://example.com/a"), &handlers)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.response.unwrap().status, 202);
    }
}
