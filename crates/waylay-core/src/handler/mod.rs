//! Mock handlers and their match/execute state machine.
//!
//! A handler is the unit of mock declaration: a match condition, a resolver
//! producing the response, and mutable execution state (used flag, sequence
//! cursor). The handler kinds form a closed set of variants sharing one
//! interface; each supplies its own matcher strategy.

mod graphql;
mod http;
mod sequence;

pub use graphql::GraphqlHandler;
pub use http::HttpHandler;
pub use sequence::{Responder, SequenceCursor};

use crate::error::{DispatchError, PatternError};
use crate::matcher::graphql::GraphQLOperation;
use crate::matcher::{MethodSelector, NameSelector, OperationSelector, ParamValue, PathSelector};
use crate::request::CapturedRequest;
use crate::response::MockResponse;
use futures::future::BoxFuture;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

/// What a handler's matcher extracted from a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Parsed {
    #[default]
    Miss,
    Rest {
        params: HashMap<String, ParamValue>,
    },
    Graphql(GraphQLOperation),
}

impl Parsed {
    pub fn matches(&self) -> bool {
        !matches!(self, Parsed::Miss)
    }

    /// Path parameters of a REST match.
    pub fn path_params(&self) -> Option<&HashMap<String, ParamValue>> {
        match self {
            Parsed::Rest { params } => Some(params),
            _ => None,
        }
    }

    /// The operation of a GraphQL match.
    pub fn operation(&self) -> Option<&GraphQLOperation> {
        match self {
            Parsed::Graphql(operation) => Some(operation),
            _ => None,
        }
    }
}

/// Everything a resolver receives: the request plus matcher-derived extras
/// (path parameters or the GraphQL operation with its variables).
#[derive(Debug, Clone)]
pub struct ResolverArgs {
    pub request: Arc<CapturedRequest>,
    pub parsed: Parsed,
}

/// What a resolver produced.
#[derive(Debug)]
pub enum ResolverReply {
    /// A response record (possibly the reserved pass-through marker).
    Response(MockResponse),
    /// Simulate a transport-level failure instead of responding.
    NetworkError(String),
    /// Nothing: the handler matched but stays silent; dispatch warns and
    /// passes the request through.
    Empty,
}

pub type ResolverFuture = BoxFuture<'static, anyhow::Result<ResolverReply>>;

/// User-supplied function producing a response for a matched request.
pub type ResolverFn = Arc<dyn Fn(ResolverArgs) -> ResolverFuture + Send + Sync>;

/// Wrap an async closure as a [`ResolverFn`].
pub fn respond_with<F, Fut>(resolver: F) -> ResolverFn
where
    F: Fn(ResolverArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<ResolverReply>> + Send + 'static,
{
    Arc::new(move |args| Box::pin(resolver(args)))
}

/// Declaration info of a handler, used by listings, suggestions, and
/// lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerInfo {
    Http { method: String, path: String },
    Graphql {
        operation_type: String,
        operation_name: String,
    },
}

impl fmt::Display for HandlerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerInfo::Http { method, path } => write!(f, "{method} {path}"),
            HandlerInfo::Graphql {
                operation_type,
                operation_name,
            } => write!(f, "{operation_type} {operation_name}"),
        }
    }
}

/// Returned by the resolution engine for observability: which handler
/// matched, what it extracted, and what it produced. An absent response means
/// "matched but produced nothing".
#[derive(Debug)]
pub struct ExecutionResult {
    pub handler: HandlerInfo,
    pub request_id: Uuid,
    pub parsed: Parsed,
    pub response: Option<MockResponse>,
}

/// The closed set of handler kinds.
#[derive(Debug)]
enum HandlerKind {
    Http(HttpHandler),
    Graphql(GraphqlHandler),
}

impl HandlerKind {
    fn parse(&self, request: &CapturedRequest) -> Parsed {
        match self {
            HandlerKind::Http(handler) => handler.parse(request),
            HandlerKind::Graphql(handler) => handler.parse(request),
        }
    }

    fn predicate(&self, request: &CapturedRequest, parsed: &Parsed) -> bool {
        match self {
            HandlerKind::Http(handler) => handler.predicate(request, parsed),
            HandlerKind::Graphql(handler) => handler.predicate(request, parsed),
        }
    }
}

/// A declared mock handler.
#[derive(Debug)]
pub struct MockHandler {
    id: Uuid,
    info: HandlerInfo,
    kind: HandlerKind,
    responder: Responder,
    once: bool,
    used: AtomicBool,
}

impl MockHandler {
    /// Declare a REST handler with a string path pattern.
    pub fn http(
        method: impl Into<MethodSelector>,
        pattern: &str,
        responder: Responder,
    ) -> Result<Self, PatternError> {
        Self::http_with_base(method, pattern, None, responder)
    }

    /// Declare a REST handler whose relative pattern is rebased against
    /// `base_url`.
    pub fn http_with_base(
        method: impl Into<MethodSelector>,
        pattern: &str,
        base_url: Option<&Url>,
        responder: Responder,
    ) -> Result<Self, PatternError> {
        let method = method.into();
        let path = PathSelector::template(pattern, base_url)?;
        Ok(Self::from_http(method, path, responder))
    }

    /// Declare a REST handler with a regular-expression path, used as
    /// authored.
    pub fn http_regex(
        method: impl Into<MethodSelector>,
        pattern: Regex,
        responder: Responder,
    ) -> Self {
        Self::from_http(method.into(), PathSelector::regex(pattern), responder)
    }

    fn from_http(method: MethodSelector, path: PathSelector, responder: Responder) -> Self {
        let info = HandlerInfo::Http {
            method: method.label(),
            path: path.label().to_string(),
        };
        Self {
            id: Uuid::new_v4(),
            info,
            kind: HandlerKind::Http(HttpHandler::new(method, path)),
            responder,
            once: false,
            used: AtomicBool::new(false),
        }
    }

    /// Declare a GraphQL handler for an operation type and name.
    pub fn graphql(
        operation_type: OperationSelector,
        operation_name: impl Into<NameSelector>,
        responder: Responder,
    ) -> Self {
        let operation_name = operation_name.into();
        let info = HandlerInfo::Graphql {
            operation_type: operation_type.label().to_string(),
            operation_name: operation_name.label(),
        };
        Self {
            id: Uuid::new_v4(),
            info,
            kind: HandlerKind::Graphql(GraphqlHandler::new(operation_type, operation_name)),
            responder,
            once: false,
            used: AtomicBool::new(false),
        }
    }

    /// Mark this handler as one-shot: it matches at most one request until
    /// the registry restores it.
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn info(&self) -> &HandlerInfo {
        &self.info
    }

    pub fn is_used(&self) -> bool {
        self.used.load(Ordering::SeqCst)
    }

    /// Clear the used flag. Only the registry's restore operation calls this;
    /// an in-progress sequence keeps its cursor.
    pub(crate) fn mark_unused(&self) {
        self.used.store(false, Ordering::SeqCst);
    }

    /// Non-committal check: parse and predicate without touching execution
    /// state. Used for suggestion ranking and listings.
    pub fn test(&self, request: &CapturedRequest) -> Parsed {
        let parsed = self.kind.parse(request);
        if parsed.matches() && self.kind.predicate(request, &parsed) {
            parsed
        } else {
            Parsed::Miss
        }
    }

    /// Match and, on success, execute this handler against a request.
    ///
    /// `Ok(None)` means the handler does not apply and the scan continues.
    /// `Ok(Some(..))` commits the match even when the resolver produced no
    /// response.
    pub async fn run(
        &self,
        request: &Arc<CapturedRequest>,
    ) -> Result<Option<ExecutionResult>, DispatchError> {
        // Exhausted one-shot handlers short-circuit without re-parsing.
        if self.once && self.used.load(Ordering::SeqCst) {
            return Ok(None);
        }

        let parsed = self.test(request);
        if !parsed.matches() {
            return Ok(None);
        }

        // Commit intent before the resolver's first suspension point: of two
        // dispatches racing a one-shot handler, exactly one may claim it.
        if self.once {
            if self.used.swap(true, Ordering::SeqCst) {
                return Ok(None);
            }
        } else {
            self.used.store(true, Ordering::SeqCst);
        }

        let reply = match &self.responder {
            Responder::Direct(resolver) => {
                let args = ResolverArgs {
                    request: Arc::clone(request),
                    parsed: parsed.clone(),
                };
                resolver(args).await.map_err(DispatchError::Handler)?
            }
            Responder::Sequence { steps, cursor } => {
                let step = {
                    let mut state = cursor.lock();
                    if state.exhausted {
                        // The final state of a sequence sticks: replay a copy
                        // of the last produced response.
                        return Ok(Some(ExecutionResult {
                            handler: self.info.clone(),
                            request_id: request.id(),
                            parsed,
                            response: state.last.clone(),
                        }));
                    }
                    let index = state.next;
                    state.next += 1;
                    steps.get(index).cloned()
                };

                let reply = match step {
                    Some(step) => {
                        let args = ResolverArgs {
                            request: Arc::clone(request),
                            parsed: parsed.clone(),
                        };
                        step(args).await.map_err(DispatchError::Handler)?
                    }
                    None => ResolverReply::Empty,
                };

                let mut state = cursor.lock();
                if let ResolverReply::Response(response) = &reply {
                    state.last = Some(response.clone());
                }
                if state.next >= steps.len() {
                    state.exhausted = true;
                } else {
                    // Steps remain: release the handler so the next dispatch
                    // continues the sequence.
                    self.used.store(false, Ordering::SeqCst);
                }
                reply
            }
        };

        let response = match reply {
            ResolverReply::Response(response) => Some(response),
            ResolverReply::Empty => None,
            ResolverReply::NetworkError(reason) => {
                return Err(DispatchError::NetworkError { reason });
            }
        };

        Ok(Some(ExecutionResult {
            handler: self.info.clone(),
            request_id: request.id(),
            parsed,
            response,
        }))
    }
}
