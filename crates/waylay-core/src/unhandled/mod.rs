//! Unhandled-request policy.
//!
//! Decides what happens when no handler matched: silently pass through, warn,
//! fail the dispatch, or defer to a custom callback. Diagnostics are
//! presentation-only and never change control flow.

pub mod suggest;

pub use suggest::rank_suggestions;

use crate::handler::{HandlerInfo, MockHandler};
use crate::request::CapturedRequest;
use std::fmt;
use std::sync::Arc;
use tracing::{error, warn};

/// Custom strategy callback. Receives the request and diagnostics helpers
/// that print the default warn/error message; the pass-through/fail decision
/// is entirely the callback's.
pub type UnhandledCallback =
    Arc<dyn Fn(&CapturedRequest, &UnhandledDiagnostics<'_>) -> UnhandledDecision + Send + Sync>;

/// Configured strategy for requests no handler matched.
#[derive(Clone, Default)]
pub enum UnhandledRequestStrategy {
    /// Silent pass-through.
    Bypass,
    /// Diagnostic message, then pass-through.
    #[default]
    Warn,
    /// Diagnostic message, then fail the dispatch; passing through is
    /// forbidden while this strategy is active.
    Error,
    /// Defer to a callback.
    Custom(UnhandledCallback),
}

impl fmt::Debug for UnhandledRequestStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnhandledRequestStrategy::Bypass => f.write_str("Bypass"),
            UnhandledRequestStrategy::Warn => f.write_str("Warn"),
            UnhandledRequestStrategy::Error => f.write_str("Error"),
            UnhandledRequestStrategy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// The callback's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnhandledDecision {
    Passthrough,
    Fail,
}

/// Diagnostics for one unhandled request: the rendered message plus helper
/// actions handed to custom callbacks.
pub struct UnhandledDiagnostics<'a> {
    request: &'a CapturedRequest,
    suggestions: Vec<HandlerInfo>,
}

impl<'a> UnhandledDiagnostics<'a> {
    pub(crate) fn new(request: &'a CapturedRequest, handlers: &[Arc<MockHandler>]) -> Self {
        Self {
            request,
            suggestions: rank_suggestions(request, handlers),
        }
    }

    /// The default diagnostic: the request line plus ranked suggestions of
    /// similar handlers, when any qualify.
    pub fn message(&self) -> String {
        let mut message = format!(
            "captured a request without a matching request handler:\n\n  \u{2022} {}",
            self.request.request_line()
        );
        match self.suggestions.as_slice() {
            [] => {}
            [only] => {
                message.push_str(&format!(
                    "\n\nDid you mean to declare \"{only}\" instead?"
                ));
            }
            many => {
                message.push_str("\n\nSimilar request handlers are declared:\n");
                for info in many {
                    message.push_str(&format!("\n  \u{2022} {info}"));
                }
            }
        }
        message
    }

    /// Print the default warn-level message.
    pub fn print_warning(&self) {
        warn!("{}", self.message());
    }

    /// Print the default error-level message.
    pub fn print_error(&self) {
        error!("{}", self.message());
    }

    pub fn suggestions(&self) -> &[HandlerInfo] {
        &self.suggestions
    }
}

/// Apply the configured strategy to an unmatched request.
pub(crate) fn apply_strategy(
    strategy: &UnhandledRequestStrategy,
    request: &CapturedRequest,
    handlers: &[Arc<MockHandler>],
) -> UnhandledDecision {
    match strategy {
        UnhandledRequestStrategy::Bypass => UnhandledDecision::Passthrough,
        UnhandledRequestStrategy::Warn => {
            UnhandledDiagnostics::new(request, handlers).print_warning();
            UnhandledDecision::Passthrough
        }
        UnhandledRequestStrategy::Error => {
            UnhandledDiagnostics::new(request, handlers).print_error();
            UnhandledDecision::Fail
        }
        UnhandledRequestStrategy::Custom(callback) => {
            let diagnostics = UnhandledDiagnostics::new(request, handlers);
            callback(request, &diagnostics)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{respond_with, Responder, ResolverReply};
    use crate::response::MockResponse;
    use http::Method;
    use url::Url;

    fn handlers(paths: &[&str]) -> Vec<Arc<MockHandler>> {
        paths
            .iter()
            .map(|path| {
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
            })
            .collect()
    }

    fn request(url: &str) -> CapturedRequest {
        CapturedRequest::new(Method::GET, Url::parse(url).unwrap())
    }

    #[test]
    fn test_message_with_single_suggestion() {
        let request = request("https://example.com/users");
        let diagnostics = UnhandledDiagnostics::new(&request, &handlers(&["/user"]));

        let message = diagnostics.message();
        assert!(message.contains("GET https://example.com/users"));
        assert!(message.contains("Did you mean to declare \"GET /user\" instead?"));
    }

    #[test]
    fn test_message_with_multiple_suggestions_is_a_list() {
        let request = request("https://example.com/user");
        let diagnostics =
            UnhandledDiagnostics::new(&request, &handlers(&["/usera", "/userb"]));

        let message = diagnostics.message();
        assert!(message.contains("Similar request handlers are declared:"));
        assert!(message.contains("GET /usera"));
        assert!(message.contains("GET /userb"));
    }

    #[test]
    fn test_message_without_suggestions_omits_the_section() {
        let request = request("https://example.com/zzz");
        let diagnostics = UnhandledDiagnostics::new(&request, &handlers(&[]));

        let message = diagnostics.message();
        assert!(!message.contains("Did you mean"));
        assert!(!message.contains("Similar request handlers"));
    }

    #[test]
    fn test_bypass_passes_through() {
        let request = request("https://example.com/zzz");
        let decision =
            apply_strategy(&UnhandledRequestStrategy::Bypass, &request, &handlers(&[]));
        assert_eq!(decision, UnhandledDecision::Passthrough);
    }

    #[test]
    fn test_error_fails_the_dispatch() {
        let request = request("https://example.com/zzz");
        let decision =
            apply_strategy(&UnhandledRequestStrategy::Error, &request, &handlers(&[]));
        assert_eq!(decision, UnhandledDecision::Fail);
    }

    #[test]
    fn test_custom_callback_owns_the_decision() {
        let request = request("https://example.com/zzz");
        let strategy = UnhandledRequestStrategy::Custom(Arc::new(|_, diagnostics| {
            diagnostics.print_warning();
            UnhandledDecision::Fail
        }));
        let decision = apply_strategy(&strategy, &request, &handlers(&[]));
        assert_eq!(decision, UnhandledDecision::Fail);
    }
}
