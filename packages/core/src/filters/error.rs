//! Filter Compiler Error Types
//!
//! Every variant names the offending field or value so that list requests can
//! be corrected by the caller. None of these are retried internally.

use super::compiler::DATETIME_FORMAT;
use super::operators::{FilterKind, FilterOperator};
use super::pagination::MAX_PAGE_SIZE;
use thiserror::Error;

/// Errors raised while compiling list query parameters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// Parameter does not correspond to a declared field of the resource
    #[error("Unknown filter field '{field}'")]
    UnknownField { field: String },

    /// Operator is outside the allowed set for the field's filter kind
    #[error("Operator '{operator}' is not supported on {kind} field '{field}'")]
    UnsupportedOperator {
        field: String,
        operator: FilterOperator,
        kind: FilterKind,
    },

    /// Datetime value does not match the single supported format
    #[error(
        "Invalid datetime '{value}' for field '{field}': the datetime filter only works with values in the format `{}`",
        DATETIME_FORMAT
    )]
    InvalidDatetime { field: String, value: String },

    /// Equality filter on a UUID field with a value that is not a UUID
    #[error("Invalid value '{value}' passed as UUID for field '{field}'")]
    InvalidUuid { field: String, value: String },

    #[error("Invalid integer '{value}' for field '{field}'")]
    InvalidInteger { field: String, value: String },

    #[error("Invalid boolean '{value}' for field '{field}'")]
    InvalidBoolean { field: String, value: String },

    /// Sort field is not a declared field of the resource
    #[error("You can only sort by valid fields of this resource, got '{field}'")]
    InvalidSortField { field: String },

    /// Sort field is one of the reserved query keys
    #[error("This resource can not be sorted by this field: '{field}'")]
    ReservedSortField { field: String },

    #[error("Page number must be at least 1, got {page}")]
    PageOutOfRange { page: i64 },

    #[error("Page size must be between 1 and {}, got {size}", MAX_PAGE_SIZE)]
    SizeOutOfRange { size: i64 },
}

impl FilterError {
    pub fn unknown_field(field: impl Into<String>) -> Self {
        Self::UnknownField {
            field: field.into(),
        }
    }

    pub fn unsupported_operator(
        field: impl Into<String>,
        operator: FilterOperator,
        kind: FilterKind,
    ) -> Self {
        Self::UnsupportedOperator {
            field: field.into(),
            operator,
            kind,
        }
    }

    pub fn invalid_datetime(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidDatetime {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn invalid_uuid(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidUuid {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn invalid_integer(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidInteger {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn invalid_boolean(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidBoolean {
            field: field.into(),
            value: value.into(),
        }
    }
}
