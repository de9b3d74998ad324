//! Ordered handler registry.
//!
//! The registry exclusively owns the handler list. The base set declared at
//! session setup is preserved verbatim; runtime handlers are prepended so the
//! most recently added handler has the highest match priority.

use crate::handler::MockHandler;
use parking_lot::RwLock;
use std::sync::Arc;

pub struct HandlerRegistry {
    base: Vec<Arc<MockHandler>>,
    current: RwLock<Vec<Arc<MockHandler>>>,
}

impl HandlerRegistry {
    pub fn new(base: Vec<Arc<MockHandler>>) -> Self {
        let current = base.clone();
        Self {
            base,
            current: RwLock::new(current),
        }
    }

    /// Prepend runtime handlers; within one call the first handler ends up
    /// with the highest priority, and a later call outranks an earlier one.
    pub fn use_handlers(&self, handlers: Vec<Arc<MockHandler>>) {
        let mut current = self.current.write();
        let mut next = handlers;
        next.extend(current.drain(..));
        *current = next;
    }

    /// Replace the working set with `next`, or revert to the originally
    /// declared base set when `next` is empty.
    pub fn reset_handlers(&self, next: Vec<Arc<MockHandler>>) {
        let mut current = self.current.write();
        *current = if next.is_empty() {
            self.base.clone()
        } else {
            next
        };
    }

    /// Clear the used flag on every current handler without changing the set.
    /// Sequence cursors are left where they are.
    pub fn restore_handlers(&self) {
        for handler in self.current.read().iter() {
            handler.mark_unused();
        }
    }

    /// Read-only snapshot of the current set; mutating the returned list has
    /// no effect on the registry.
    pub fn list_handlers(&self) -> Vec<Arc<MockHandler>> {
        self.current.read().clone()
    }

    /// Snapshot used by a resolution in progress; a concurrent registry
    /// mutation does not affect an iteration that already started.
    pub(crate) fn snapshot(&self) -> Vec<Arc<MockHandler>> {
        self.current.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{respond_with, Responder, ResolverReply};
    use crate::response::MockResponse;

    fn handler(path: &str) -> Arc<MockHandler> {
        Arc::new(
            MockHandler::http(
                "GET",
                path,
                Responder::direct(respond_with(|_| async {
                    Ok(ResolverReply::Response(MockResponse::new(200)))
                })),
            )
            .unwrap(),
        )
    }

    fn paths(handlers: &[Arc<MockHandler>]) -> Vec<String> {
        handlers.iter().map(|h| h.info().to_string()).collect()
    }

    #[test]
    fn test_use_prepends_with_last_registered_wins() {
        let registry = HandlerRegistry::new(vec![handler("/base")]);
        registry.use_handlers(vec![handler("/a"), handler("/b")]);
        registry.use_handlers(vec![handler("/c")]);

        assert_eq!(
            paths(&registry.list_handlers()),
            vec!["GET /c", "GET /a", "GET /b", "GET /base"]
        );
    }

    #[test]
    fn test_reset_with_handlers_replaces_working_set() {
        let registry = HandlerRegistry::new(vec![handler("/base")]);
        registry.use_handlers(vec![handler("/runtime")]);

        registry.reset_handlers(vec![handler("/a"), handler("/b")]);
        assert_eq!(paths(&registry.list_handlers()), vec!["GET /a", "GET /b"]);
    }

    #[test]
    fn test_reset_without_handlers_reverts_to_base() {
        let registry = HandlerRegistry::new(vec![handler("/base")]);
        registry.use_handlers(vec![handler("/one")]);
        registry.use_handlers(vec![handler("/two")]);

        registry.reset_handlers(Vec::new());
        assert_eq!(paths(&registry.list_handlers()), vec!["GET /base"]);
    }

    #[test]
    fn test_restore_clears_used_flags() {
        let base = handler("/base");
        let registry = HandlerRegistry::new(vec![Arc::clone(&base)]);

        // Simulate an executed handler.
        let runtime = handler("/runtime");
        registry.use_handlers(vec![Arc::clone(&runtime)]);
        tokio_test::block_on(async {
            let request = Arc::new(crate::request::CapturedRequest::new(
                http::Method::GET,
                url::Url::parse("https://example.com/runtime").unwrap(),
            ));
            runtime.run(&request).await.unwrap();
        });
        assert!(runtime.is_used());

        registry.restore_handlers();
        assert!(!runtime.is_used());
        assert!(!base.is_used());
    }

    #[test]
    fn test_snapshot_mutation_does_not_affect_registry() {
        let registry = HandlerRegistry::new(vec![handler("/base")]);
        let mut snapshot = registry.list_handlers();
        snapshot.clear();

        assert_eq!(registry.list_handlers().len(), 1);
    }
}
