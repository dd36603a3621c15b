//! List Query Filters
//!
//! Compiles string-encoded list parameters (`name=contains:prod`,
//! `created=gte:24-01-01 00:00:00`, `page=2`) into typed, backend-agnostic
//! predicates with validated sort and pagination settings.
//!
//! - [`compiler`] - parameter parsing and type dispatch
//! - [`field_types`] - per-resource field-type registry
//! - [`operators`] - operators and the allowed-operator sets per filter kind
//! - [`predicate`] - the compiled [`QueryFilter`]
//! - [`pagination`] - [`Pagination`] and [`Page`]

pub mod compiler;
mod error;
pub mod field_types;
pub mod operators;
pub mod pagination;
pub mod params;
pub mod predicate;

pub use compiler::{compile, ListQuery, DATETIME_FORMAT, DEFAULT_SORT_FIELD, RESERVED_KEYS};
pub use error::FilterError;
pub use field_types::{FieldRegistry, FieldType};
pub use operators::{FilterKind, FilterOperator};
pub use pagination::{Page, Pagination, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use params::{ParamValue, QueryParams};
pub use predicate::{compare_field_values, QueryFilter};
