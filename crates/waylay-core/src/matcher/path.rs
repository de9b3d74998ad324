//! Path pattern compilation and matching.
//!
//! String patterns are normalized at handler construction time and compiled
//! to a regular expression:
//!
//! - `:name` captures one path segment; `:name+` one or more segments;
//!   `:name*` zero or more segments
//! - `*` and `**` compile to unnamed capturing groups keyed by position
//! - a colon before a port number or a `://` scheme boundary stays literal
//! - relative patterns starting with `/` are rebased against a base URL when
//!   one is given, and otherwise match the request path only
//!
//! The incoming URL is stripped of its query string and fragment before
//! comparison; patterns never match query parameters. Captured values are
//! percent-decoded, and repeated occurrences of one name collapse into an
//! array value. Regular-expression patterns are used as authored and tested
//! against the stripped absolute URL.

use crate::error::PatternError;
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use url::{Position, Url};

/// A captured path parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    Multi(Vec<String>),
}

impl ParamValue {
    /// The single value, or the first of a collapsed repetition.
    pub fn as_str(&self) -> &str {
        match self {
            ParamValue::Single(value) => value,
            ParamValue::Multi(values) => values.first().map(String::as_str).unwrap_or(""),
        }
    }
}

/// Outcome of testing a URL against a path pattern.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathMatch {
    pub matches: bool,
    pub params: HashMap<String, ParamValue>,
}

impl PathMatch {
    pub fn miss() -> Self {
        Self::default()
    }

    pub fn hit(params: HashMap<String, ParamValue>) -> Self {
        Self {
            matches: true,
            params,
        }
    }
}

/// What part of the request URL a compiled template is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchTarget {
    /// The absolute URL with query and fragment stripped.
    FullUrl,
    /// The path component only (relative pattern without a base URL).
    PathOnly,
}

/// Segment repetition modifier on a named parameter.
enum Repeat {
    One,
    OneOrMore,
    ZeroOrMore,
}

/// A normalized, compiled string pattern.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    declared: String,
    regex: Arc<Regex>,
    /// Public name per capture group in group order; `None` marks a wildcard
    /// group keyed by position.
    names: Vec<Option<String>>,
    target: MatchTarget,
}

impl CompiledTemplate {
    pub fn compile(pattern: &str, base_url: Option<&Url>) -> Result<Self, PatternError> {
        let mut template = pattern.to_string();
        if let Some(pos) = template.find('#') {
            template.truncate(pos);
        }
        if let Some(pos) = template.find('?') {
            warn!(
                pattern = %pattern,
                "path pattern contains a query string; queries never participate in matching, so everything after \"?\" is ignored"
            );
            template.truncate(pos);
        }

        let rebased = match base_url {
            Some(base) if template.starts_with('/') => {
                format!("{}{}", base.origin().ascii_serialization(), template)
            }
            _ => template,
        };

        let target = if rebased.contains("://") {
            MatchTarget::FullUrl
        } else if rebased.starts_with('/') {
            MatchTarget::PathOnly
        } else {
            // Wildcard-led and other non-rooted patterns compare against the
            // whole stripped URL.
            MatchTarget::FullUrl
        };

        let (source, names) = build_regex(&rebased);
        let regex = Regex::new(&source).map_err(|source| PatternError::Regex {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self {
            declared: pattern.to_string(),
            regex: Arc::new(regex),
            names,
            target,
        })
    }

    pub fn matches(&self, url: &Url) -> PathMatch {
        let stripped = &url[..Position::AfterPath];
        let target = match self.target {
            MatchTarget::FullUrl => stripped,
            MatchTarget::PathOnly => url.path(),
        };

        let Some(captures) = self.regex.captures(target) else {
            return PathMatch::miss();
        };

        let mut params = HashMap::new();
        let mut position = 0usize;
        for (index, name) in self.names.iter().enumerate() {
            let raw = captures
                .get(index + 1)
                .map(|group| group.as_str())
                .unwrap_or("");
            match name {
                Some(name) => insert_param(&mut params, name, decode(raw)),
                None => {
                    params.insert(position.to_string(), ParamValue::Single(decode(raw)));
                    position += 1;
                }
            }
        }
        PathMatch::hit(params)
    }

    pub fn declared(&self) -> &str {
        &self.declared
    }
}

/// Declared path of a handler: a normalized string template or a regular
/// expression used as authored.
#[derive(Debug, Clone)]
pub enum PathSelector {
    Template(CompiledTemplate),
    Pattern(Arc<Regex>),
}

impl PathSelector {
    pub fn template(pattern: &str, base_url: Option<&Url>) -> Result<Self, PatternError> {
        Ok(PathSelector::Template(CompiledTemplate::compile(
            pattern, base_url,
        )?))
    }

    pub fn regex(regex: Regex) -> Self {
        PathSelector::Pattern(Arc::new(regex))
    }

    pub fn matches(&self, url: &Url) -> PathMatch {
        match self {
            PathSelector::Template(template) => template.matches(url),
            PathSelector::Pattern(regex) => {
                let stripped = &url[..Position::AfterPath];
                match regex.captures(stripped) {
                    Some(captures) => {
                        PathMatch::hit(extract_regex_params(regex, &captures))
                    }
                    None => PathMatch::miss(),
                }
            }
        }
    }

    /// Display form used in handler listings and diagnostics.
    pub fn label(&self) -> &str {
        match self {
            PathSelector::Template(template) => template.declared(),
            PathSelector::Pattern(regex) => regex.as_str(),
        }
    }
}

/// Test `url` against a string pattern, compiling it on the fly.
///
/// Handlers precompile their pattern once at declaration; this entry point
/// exists for one-off checks.
pub fn match_path(
    url: &Url,
    pattern: &str,
    base_url: Option<&Url>,
) -> Result<PathMatch, PatternError> {
    Ok(CompiledTemplate::compile(pattern, base_url)?.matches(url))
}

fn build_regex(template: &str) -> (String, Vec<Option<String>>) {
    let mut source = String::from("^");
    let mut names: Vec<Option<String>> = Vec::new();
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            ':' => match chars.peek() {
                Some(&next) if next.is_ascii_alphabetic() || next == '_' => {
                    let mut name = String::new();
                    while let Some(&c) = chars.peek() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            name.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    let repeat = match chars.peek() {
                        Some(&'+') => {
                            chars.next();
                            Repeat::OneOrMore
                        }
                        Some(&'*') => {
                            chars.next();
                            Repeat::ZeroOrMore
                        }
                        _ => Repeat::One,
                    };
                    // Group names must be unique in one expression, so each
                    // occurrence gets its own id; extraction collapses them
                    // back onto the declared name.
                    let group = format!("p{}", names.len());
                    names.push(Some(name));
                    match repeat {
                        Repeat::One => {
                            source.push_str(&format!("(?P<{group}>[^/]+)"));
                        }
                        Repeat::OneOrMore => {
                            source.push_str(&format!("(?P<{group}>[^/]+(?:/[^/]+)*)"));
                        }
                        Repeat::ZeroOrMore => {
                            if source.ends_with('/') {
                                // "/files/:rest*" also matches "/files"
                                source.pop();
                                source.push_str(&format!(
                                    "(?:/(?P<{group}>[^/]+(?:/[^/]+)*))?"
                                ));
                            } else {
                                source.push_str(&format!("(?P<{group}>[^/]*(?:/[^/]+)*)"));
                            }
                        }
                    }
                }
                // A colon before a port number or a scheme boundary is not a
                // parameter.
                _ => source.push_str(&regex::escape(":")),
            },
            '*' => {
                while chars.peek() == Some(&'*') {
                    chars.next();
                }
                names.push(None);
                source.push_str("(.*)");
            }
            other => source.push_str(&regex::escape(&other.to_string())),
        }
    }

    source.push_str("/?$");
    (source, names)
}

fn extract_regex_params(regex: &Regex, captures: &regex::Captures) -> HashMap<String, ParamValue> {
    let mut params = HashMap::new();
    let mut position = 0usize;
    for (index, name) in regex.capture_names().enumerate().skip(1) {
        let raw = captures
            .get(index)
            .map(|group| group.as_str())
            .unwrap_or("");
        match name {
            Some(name) => insert_param(&mut params, name, decode(raw)),
            None => {
                params.insert(position.to_string(), ParamValue::Single(decode(raw)));
                position += 1;
            }
        }
    }
    params
}

fn insert_param(params: &mut HashMap<String, ParamValue>, name: &str, value: String) {
    let collapsed = match params.remove(name) {
        None => ParamValue::Single(value),
        Some(ParamValue::Single(first)) => ParamValue::Multi(vec![first, value]),
        Some(ParamValue::Multi(mut values)) => {
            values.push(value);
            ParamValue::Multi(values)
        }
    };
    params.insert(name.to_string(), collapsed);
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw.to_string())
}
