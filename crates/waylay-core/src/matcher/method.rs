//! HTTP method matching.

use http::Method;
use regex::Regex;
use std::sync::Arc;

/// Declared method of a handler: an exact string compared case-insensitively,
/// or a regular expression tested against the request's method verbatim.
#[derive(Debug, Clone)]
pub enum MethodSelector {
    Exact(String),
    Pattern(Arc<Regex>),
}

impl MethodSelector {
    pub fn matches(&self, method: &Method) -> bool {
        match self {
            MethodSelector::Exact(declared) => declared.eq_ignore_ascii_case(method.as_str()),
            MethodSelector::Pattern(regex) => regex.is_match(method.as_str()),
        }
    }

    /// Display form used in handler listings and diagnostics.
    pub fn label(&self) -> String {
        match self {
            MethodSelector::Exact(declared) => declared.to_ascii_uppercase(),
            MethodSelector::Pattern(regex) => format!("/{}/", regex.as_str()),
        }
    }
}

impl From<Method> for MethodSelector {
    fn from(method: Method) -> Self {
        MethodSelector::Exact(method.as_str().to_string())
    }
}

impl From<&str> for MethodSelector {
    fn from(method: &str) -> Self {
        MethodSelector::Exact(method.to_string())
    }
}

impl From<Regex> for MethodSelector {
    fn from(regex: Regex) -> Self {
        MethodSelector::Pattern(Arc::new(regex))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_method_is_case_insensitive() {
        let selector = MethodSelector::from("get");
        assert!(selector.matches(&Method::GET));
        assert!(!selector.matches(&Method::POST));
    }

    #[test]
    fn test_regex_method() {
        let selector = MethodSelector::from(Regex::new("^(PUT|PATCH)$").unwrap());
        assert!(selector.matches(&Method::PUT));
        assert!(selector.matches(&Method::PATCH));
        assert!(!selector.matches(&Method::POST));
    }

    #[test]
    fn test_label() {
        assert_eq!(MethodSelector::from("get").label(), "GET");
        assert_eq!(
            MethodSelector::from(Regex::new("^P").unwrap()).label(),
            "/^P/"
        );
    }
}
