//! GraphQL handler declaration: operation type plus name selector.

use super::Parsed;
use crate::matcher::graphql::{match_operation, NameSelector, OperationSelector};
use crate::request::CapturedRequest;

#[derive(Debug)]
pub struct GraphqlHandler {
    operation_type: OperationSelector,
    operation_name: NameSelector,
}

impl GraphqlHandler {
    pub(crate) fn new(operation_type: OperationSelector, operation_name: NameSelector) -> Self {
        Self {
            operation_type,
            operation_name,
        }
    }

    /// Pure match step: extract and match the request's operation.
    pub(crate) fn parse(&self, request: &CapturedRequest) -> Parsed {
        match match_operation(request, self.operation_type, &self.operation_name) {
            Some(operation) => Parsed::Graphql(operation),
            None => Parsed::Miss,
        }
    }

    /// The parse step already folds in type and name matching.
    pub(crate) fn predicate(&self, _request: &CapturedRequest, parsed: &Parsed) -> bool {
        parsed.matches()
    }

    pub(crate) fn operation_type(&self) -> OperationSelector {
        self.operation_type
    }

    pub(crate) fn operation_name(&self) -> &NameSelector {
        &self.operation_name
    }
}
