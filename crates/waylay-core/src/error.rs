//! Error types for the dispatch core.

use thiserror::Error;

/// Errors surfaced by [`crate::session::MockSession::dispatch`].
///
/// "No handler matched" is not an error; it is routed to the configured
/// unhandled-request strategy and only becomes `UnhandledRequest` when that
/// strategy fails the dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No handler matched and the `error` strategy failed the dispatch.
    #[error("no request handler matched {request_line} and the \"error\" strategy is active")]
    UnhandledRequest { request_line: String },

    /// A pass-through was attempted while the `error` strategy is active.
    ///
    /// Explicit pass-through from a resolver is always legitimate; only the
    /// implicit unhandled path is forbidden under the `error` strategy.
    #[error("cannot pass {request_line} through while the \"error\" strategy is active")]
    PolicyViolation { request_line: String },

    /// A resolver requested a simulated transport-level failure.
    ///
    /// Kept distinct from `Handler` so the transport can emulate a network
    /// error instead of reporting a bug in mocking code.
    #[error("network error emulated by request handler: {reason}")]
    NetworkError { reason: String },

    /// A resolver failed; this is a bug in user mocking code and is never
    /// swallowed.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

/// A path pattern that could not be compiled at handler construction time.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid path pattern {pattern:?}: {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
