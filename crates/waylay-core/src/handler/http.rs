//! REST handler declaration: method plus path pattern.

use super::Parsed;
use crate::matcher::{MethodSelector, PathSelector};
use crate::request::CapturedRequest;

#[derive(Debug)]
pub struct HttpHandler {
    method: MethodSelector,
    path: PathSelector,
}

impl HttpHandler {
    pub(crate) fn new(method: MethodSelector, path: PathSelector) -> Self {
        Self { method, path }
    }

    /// Pure match step: test the request URL against the declared path.
    pub(crate) fn parse(&self, request: &CapturedRequest) -> Parsed {
        let result = self.path.matches(request.url());
        if result.matches {
            Parsed::Rest {
                params: result.params,
            }
        } else {
            Parsed::Miss
        }
    }

    /// A handler applies when the path matched and the method agrees.
    pub(crate) fn predicate(&self, request: &CapturedRequest, parsed: &Parsed) -> bool {
        parsed.matches() && self.method.matches(request.method())
    }

    pub(crate) fn method(&self) -> &MethodSelector {
        &self.method
    }

    pub(crate) fn path(&self) -> &PathSelector {
        &self.path
    }
}
