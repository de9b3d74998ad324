//! GraphQL operation extraction and matching.
//!
//! The query document comes from a GET request's `query` search parameter or
//! a POST JSON body's `query` field. The document is scanned only far enough
//! to find the first operation definition; a document that cannot be scanned
//! yields no match, never an error.

use crate::request::CapturedRequest;
use http::Method;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// GraphQL operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    Query,
    Mutation,
    Subscription,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Query => "query",
            OperationType::Mutation => "mutation",
            OperationType::Subscription => "subscription",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared operation type of a handler; `Any` matches every kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationSelector {
    Any,
    Only(OperationType),
}

impl OperationSelector {
    pub fn matches(&self, operation_type: OperationType) -> bool {
        match self {
            OperationSelector::Any => true,
            OperationSelector::Only(expected) => *expected == operation_type,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OperationSelector::Any => "operation",
            OperationSelector::Only(expected) => expected.as_str(),
        }
    }
}

/// Declared operation name: exact string or regular expression.
#[derive(Debug, Clone)]
pub enum NameSelector {
    Exact(String),
    Pattern(Arc<Regex>),
}

impl NameSelector {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NameSelector::Exact(expected) => expected == name,
            NameSelector::Pattern(regex) => regex.is_match(name),
        }
    }

    pub fn label(&self) -> String {
        match self {
            NameSelector::Exact(expected) => expected.clone(),
            NameSelector::Pattern(regex) => format!("/{}/", regex.as_str()),
        }
    }
}

impl From<&str> for NameSelector {
    fn from(name: &str) -> Self {
        NameSelector::Exact(name.to_string())
    }
}

impl From<String> for NameSelector {
    fn from(name: String) -> Self {
        NameSelector::Exact(name)
    }
}

impl From<Regex> for NameSelector {
    fn from(regex: Regex) -> Self {
        NameSelector::Pattern(Arc::new(regex))
    }
}

/// The first operation definition of a request's query document.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphQLOperation {
    pub operation_type: OperationType,
    pub operation_name: Option<String>,
    pub variables: Option<serde_json::Value>,
}

/// Extract the GraphQL operation a request carries, if any.
pub fn extract_operation(request: &CapturedRequest) -> Option<GraphQLOperation> {
    let (document, variables) = if request.method() == Method::GET {
        let document = request.query_param("query")?;
        let variables = request
            .query_param("variables")
            .and_then(|raw| serde_json::from_str(&raw).ok());
        (document, variables)
    } else {
        let body = request.body_json()?;
        let document = body.get("query")?.as_str()?.to_string();
        let variables = body.get("variables").filter(|v| !v.is_null()).cloned();
        (document, variables)
    };

    let (operation_type, operation_name) = scan_document(&document)?;
    Some(GraphQLOperation {
        operation_type,
        operation_name,
        variables,
    })
}

/// Match a request against a declared operation type and name.
///
/// Anonymous operations are a diagnosed non-match: without a name there is
/// nothing to disambiguate a handler against.
pub fn match_operation(
    request: &CapturedRequest,
    expected_type: OperationSelector,
    expected_name: &NameSelector,
) -> Option<GraphQLOperation> {
    let operation = extract_operation(request)?;

    let Some(name) = operation.operation_name.as_deref() else {
        warn!(
            request = %request.request_line(),
            "anonymous GraphQL operation cannot be matched against a named handler; give the operation a name"
        );
        return None;
    };

    if !expected_type.matches(operation.operation_type) {
        return None;
    }
    if !expected_name.matches(name) {
        return None;
    }
    Some(operation)
}

/// Scan a query document for its first operation definition, skipping leading
/// fragment definitions. Returns the operation type and optional name.
fn scan_document(document: &str) -> Option<(OperationType, Option<String>)> {
    let bytes = document.as_bytes();
    let mut pos = 0;

    loop {
        skip_ignored(bytes, &mut pos);
        match *bytes.get(pos)? {
            // Shorthand selection set: an anonymous query.
            b'{' => return Some((OperationType::Query, None)),
            _ => {
                let keyword = read_name(bytes, &mut pos)?;
                let operation_type = match keyword {
                    "query" => OperationType::Query,
                    "mutation" => OperationType::Mutation,
                    "subscription" => OperationType::Subscription,
                    "fragment" => {
                        skip_braced_block(bytes, &mut pos)?;
                        continue;
                    }
                    _ => return None,
                };
                skip_ignored(bytes, &mut pos);
                let name = match bytes.get(pos) {
                    Some(&b) if is_name_start(b) => read_name(bytes, &mut pos).map(str::to_string),
                    _ => None,
                };
                return Some((operation_type, name));
            }
        }
    }
}

fn is_name_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_'
}

fn is_name_continue(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

fn skip_ignored(bytes: &[u8], pos: &mut usize) {
    while let Some(&byte) = bytes.get(*pos) {
        match byte {
            b' ' | b'\t' | b'\r' | b'\n' | b',' => *pos += 1,
            b'#' => {
                while let Some(&b) = bytes.get(*pos) {
                    *pos += 1;
                    if b == b'\n' {
                        break;
                    }
                }
            }
            _ => break,
        }
    }
}

fn read_name<'a>(bytes: &'a [u8], pos: &mut usize) -> Option<&'a str> {
    let start = *pos;
    if !bytes.get(*pos).copied().map(is_name_start).unwrap_or(false) {
        return None;
    }
    while bytes.get(*pos).copied().map(is_name_continue).unwrap_or(false) {
        *pos += 1;
    }
    std::str::from_utf8(&bytes[start..*pos]).ok()
}

/// Advance past the next `{ ... }` block, honoring string literals so braces
/// inside them do not count.
fn skip_braced_block(bytes: &[u8], pos: &mut usize) -> Option<()> {
    while let Some(&byte) = bytes.get(*pos) {
        match byte {
            b'"' => skip_string(bytes, pos)?,
            b'#' => skip_ignored(bytes, pos),
            b'{' => break,
            _ => *pos += 1,
        }
    }
    if bytes.get(*pos) != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    while let Some(&byte) = bytes.get(*pos) {
        match byte {
            b'"' => {
                skip_string(bytes, pos)?;
                continue;
            }
            b'#' => {
                skip_ignored(bytes, pos);
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    *pos += 1;
                    return Some(());
                }
            }
            _ => {}
        }
        *pos += 1;
    }
    None
}

/// Advance past a string or block-string literal starting at `pos`.
fn skip_string(bytes: &[u8], pos: &mut usize) -> Option<()> {
    if bytes[*pos..].starts_with(b"\"\"\"") {
        *pos += 3;
        while *pos < bytes.len() {
            if bytes[*pos..].starts_with(b"\"\"\"") {
                *pos += 3;
                return Some(());
            }
            *pos += 1;
        }
        return None;
    }

    *pos += 1;
    while let Some(&byte) = bytes.get(*pos) {
        match byte {
            b'\\' => *pos += 2,
            b'"' => {
                *pos += 1;
                return Some(());
            }
            _ => *pos += 1,
        }
    }
    None
}
