//! Near-miss suggestion ranking for unhandled requests.
//!
//! Scoring favors path closeness first and a matching method (or GraphQL
//! operation type) as a secondary boost: exact equality 3.0, containment
//! either way 2.0, otherwise a char-level similarity ratio qualifying at
//! 0.5 or better; agreement on method/type adds 1.0. The ranking is a
//! best-effort ordering by relevance, not a bit-exact algorithm.

use crate::handler::{HandlerInfo, MockHandler};
use crate::matcher::graphql::{self, GraphQLOperation};
use crate::request::CapturedRequest;
use similar::TextDiff;
use std::cmp::Ordering;
use std::sync::Arc;

const MAX_SUGGESTIONS: usize = 4;
const MIN_SIMILARITY: f64 = 0.5;

/// Rank declared handlers by similarity to an unmatched request, best first.
/// At most four suggestions are returned; ties keep registry order.
pub fn rank_suggestions(
    request: &CapturedRequest,
    handlers: &[Arc<MockHandler>],
) -> Vec<HandlerInfo> {
    let operation = graphql::extract_operation(request);

    let mut scored: Vec<(f64, usize, HandlerInfo)> = handlers
        .iter()
        .enumerate()
        .filter_map(|(index, handler)| {
            score(request, operation.as_ref(), handler.info())
                .map(|score| (score, index, handler.info().clone()))
        })
        .collect();

    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then(a.1.cmp(&b.1))
    });
    scored.truncate(MAX_SUGGESTIONS);
    scored.into_iter().map(|(_, _, info)| info).collect()
}

fn score(
    request: &CapturedRequest,
    operation: Option<&GraphQLOperation>,
    info: &HandlerInfo,
) -> Option<f64> {
    match (operation, info) {
        // REST requests are compared against REST declarations only.
        (None, HandlerInfo::Http { method, path }) => {
            let base = closeness(request.path(), declared_path(path))?;
            let bonus = if method.eq_ignore_ascii_case(request.method().as_str()) {
                1.0
            } else {
                0.0
            };
            Some(base + bonus)
        }
        // GraphQL requests are compared by operation name and type.
        (Some(operation), HandlerInfo::Graphql { operation_type, operation_name }) => {
            let requested = operation.operation_name.as_deref().unwrap_or("");
            let base = closeness(requested, operation_name)?;
            let same_type = operation_type == "operation"
                || operation_type == operation.operation_type.as_str();
            Some(base + if same_type { 1.0 } else { 0.0 })
        }
        _ => None,
    }
}

fn closeness(requested: &str, declared: &str) -> Option<f64> {
    if requested == declared {
        return Some(3.0);
    }
    if !requested.is_empty()
        && !declared.is_empty()
        && (requested.contains(declared) || declared.contains(requested))
    {
        return Some(2.0);
    }
    let ratio = f64::from(TextDiff::from_chars(requested, declared).ratio());
    (ratio >= MIN_SIMILARITY).then_some(ratio)
}

/// Path component of a declared pattern; absolute patterns lose their origin
/// so they compare against the request path.
fn declared_path(pattern: &str) -> &str {
    match pattern.find("://") {
        Some(scheme_end) => {
            let rest = &pattern[scheme_end + 3..];
            match rest.find('/') {
                Some(slash) => &rest[slash..],
                None => "/",
            }
        }
        None => pattern,
    }
}
