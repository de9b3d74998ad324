//! Waylay core: request-handler dispatch for API mocking.
//!
//! Given a captured outgoing request (intercepted by an external transport),
//! the core decides whether a declared mock handler should answer it, runs
//! that handler to produce a response record, and reports the outcome through
//! an observable lifecycle. Delivering the response back to the original
//! caller, or letting it pass through unmocked, is the transport's job.

// ===== Dispatch pipeline =====
pub mod engine;
pub mod handler;
pub mod registry;
pub mod session;

// ===== Matching =====
pub mod matcher;

// ===== Requests, responses, observability =====
pub mod error;
pub mod events;
pub mod request;
pub mod response;
pub mod unhandled;


pub use error::{DispatchError, PatternError};
pub use events::{EventKind, LifecycleEmitter, LifecycleEvent, Listener, ListenerId};
pub use handler::{
    respond_with, ExecutionResult, HandlerInfo, MockHandler, Parsed, Responder, ResolverArgs,
    ResolverFn, ResolverReply,
};
pub use matcher::{
    match_path, GraphQLOperation, MethodSelector, NameSelector, OperationSelector, OperationType,
    ParamValue, PathMatch, PathSelector,
};
pub use registry::HandlerRegistry;
pub use request::CapturedRequest;
pub use response::{MockResponse, PASSTHROUGH_STATUS};
pub use session::{MockSession, SessionConfig};
pub use unhandled::{
    UnhandledCallback, UnhandledDecision, UnhandledDiagnostics, UnhandledRequestStrategy,
};
