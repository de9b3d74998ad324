//! Request matching.
//!
//! Pure functions and compiled selectors that test a captured request against
//! a declared pattern:
//!
//! - `path`: path templates, wildcards, and regular expressions with named
//!   parameter extraction
//! - `method`: exact (case-insensitive) or regex method matching
//! - `graphql`: operation type/name extraction from a query document

pub mod graphql;
pub mod method;
pub mod path;

pub use graphql::{GraphQLOperation, NameSelector, OperationSelector, OperationType};
pub use method::MethodSelector;
pub use path::{match_path, ParamValue, PathMatch, PathSelector};
