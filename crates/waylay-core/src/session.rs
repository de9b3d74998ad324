//! Mocking session: the dispatch entry point.
//!
//! A session owns its handler registry and lifecycle emitter so multiple
//! independent sessions can coexist in one process (parallel test execution);
//! nothing lives in module-scope state. The transport hands each captured
//! request to [`MockSession::dispatch`] and applies whatever comes back.

use crate::engine;
use crate::error::DispatchError;
use crate::events::{LifecycleEmitter, LifecycleEvent};
use crate::handler::MockHandler;
use crate::registry::HandlerRegistry;
use crate::request::CapturedRequest;
use crate::response::MockResponse;
use crate::unhandled::{apply_strategy, UnhandledDecision, UnhandledRequestStrategy};
use std::sync::Arc;
use tracing::{debug, warn};

/// Session configuration; the unhandled-request strategy mirrors the
/// `bypass | warn | error | callback` surface.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub on_unhandled_request: UnhandledRequestStrategy,
}

/// One mocking session: registry, emitter, and policy.
pub struct MockSession {
    registry: HandlerRegistry,
    emitter: Arc<LifecycleEmitter>,
    config: SessionConfig,
}

impl MockSession {
    /// A session with the default configuration (`warn` strategy).
    pub fn new(handlers: Vec<Arc<MockHandler>>) -> Self {
        Self::with_config(handlers, SessionConfig::default())
    }

    pub fn with_config(handlers: Vec<Arc<MockHandler>>, config: SessionConfig) -> Self {
        Self {
            registry: HandlerRegistry::new(handlers),
            emitter: Arc::new(LifecycleEmitter::new()),
            config,
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// The session's event publisher; see [`LifecycleEmitter::on`].
    pub fn events(&self) -> &LifecycleEmitter {
        &self.emitter
    }

    /// Prepend runtime handlers (most recently added wins).
    pub fn use_handlers(&self, handlers: Vec<Arc<MockHandler>>) {
        self.registry.use_handlers(handlers);
    }

    /// Replace the working set, or revert to the base set when empty.
    pub fn reset_handlers(&self, next: Vec<Arc<MockHandler>>) {
        self.registry.reset_handlers(next);
    }

    /// Clear every handler's used flag.
    pub fn restore_handlers(&self) {
        self.registry.restore_handlers();
    }

    pub fn list_handlers(&self) -> Vec<Arc<MockHandler>> {
        self.registry.list_handlers()
    }

    /// Stop the session: detach every lifecycle listener.
    pub fn close(&self) {
        self.emitter.remove_all_listeners();
    }

    /// Decide whether a declared handler answers `request`, execute it, and
    /// report the journey through lifecycle events.
    ///
    /// `Ok(Some(response))` is a mocked response for the transport to apply
    /// (honoring `response.delay`); `Ok(None)` means "let the request pass
    /// through unmodified".
    pub async fn dispatch(
        &self,
        request: CapturedRequest,
    ) -> Result<Option<MockResponse>, DispatchError> {
        let request = Arc::new(request);
        debug!(request = %request.request_line(), "dispatching request");

        self.emitter.emit(&LifecycleEvent::RequestStart {
            request: Arc::clone(&request),
        });

        // A resolution in progress keeps the snapshot it started with even if
        // the registry is mutated concurrently.
        let snapshot = self.registry.snapshot();

        let resolved = match engine::resolve_request(&request, &snapshot).await {
            Ok(resolved) => resolved,
            Err(error) => {
                // Propagate to the caller, but publish a distinguishable
                // notification first so test tooling can assert on it.
                self.emitter.emit(&LifecycleEvent::HandlerException {
                    request_id: request.id(),
                    error: error.to_string(),
                });
                return Err(error);
            }
        };

        if let Some(result) = resolved {
            self.emitter.emit(&LifecycleEvent::RequestMatch {
                request: Arc::clone(&request),
                handler: result.handler.clone(),
            });

            return match result.response {
                Some(response) if response.is_passthrough() => {
                    // The resolver explicitly opted out of mocking this one.
                    self.finish_bypassed(&request);
                    Ok(None)
                }
                Some(response) => {
                    self.emitter.emit(&LifecycleEvent::RequestEnd {
                        request: Arc::clone(&request),
                    });
                    self.emitter.emit(&LifecycleEvent::ResponseMocked {
                        request_id: request.id(),
                        response: response.clone(),
                    });
                    Ok(Some(response))
                }
                None => {
                    warn!(
                        handler = %result.handler,
                        request = %request.request_line(),
                        "handler matched but its resolver produced no response; passing the request through"
                    );
                    self.finish_bypassed(&request);
                    Ok(None)
                }
            };
        }

        self.emitter.emit(&LifecycleEvent::RequestUnhandled {
            request: Arc::clone(&request),
        });

        let decision = apply_strategy(&self.config.on_unhandled_request, &request, &snapshot);
        match decision {
            UnhandledDecision::Passthrough => {
                // Pass-through is forbidden while the error strategy is
                // active; only a contract-breaking policy can reach this.
                if matches!(
                    self.config.on_unhandled_request,
                    UnhandledRequestStrategy::Error
                ) {
                    self.emitter.emit(&LifecycleEvent::RequestEnd {
                        request: Arc::clone(&request),
                    });
                    return Err(DispatchError::PolicyViolation {
                        request_line: request.request_line(),
                    });
                }
                self.finish_bypassed(&request);
                Ok(None)
            }
            UnhandledDecision::Fail => {
                self.emitter.emit(&LifecycleEvent::RequestEnd {
                    request: Arc::clone(&request),
                });
                Err(DispatchError::UnhandledRequest {
                    request_line: request.request_line(),
                })
            }
        }
    }

    fn finish_bypassed(&self, request: &Arc<CapturedRequest>) {
        self.emitter.emit(&LifecycleEvent::RequestEnd {
            request: Arc::clone(request),
        });
        self.emitter.emit(&LifecycleEvent::ResponseBypass {
            request_id: request.id(),
        });
    }
}
