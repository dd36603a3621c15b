//! Client Error Types
//!
//! This module defines the errors surfaced by the client facade, the entity
//! resolver and the stack validator.

use super::configuration::ConfigError;
use crate::filters::FilterError;
use crate::models::{ComponentType, ResourceKind};
use thiserror::Error;
use uuid::Uuid;

/// Client operation errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// Nothing matched by id, name or id prefix
    #[error("No {kind} found with name, ID or prefix '{token}'.")]
    NotFound { kind: ResourceKind, token: String },

    /// More than one entity carries the given name
    #[error(
        "Multiple {kind}s have been found for name '{token}': {}. Please use the ID to uniquely identify one of the {kind}s.",
        candidates.join(", ")
    )]
    AmbiguousName {
        kind: ResourceKind,
        token: String,
        candidates: Vec<String>,
    },

    /// More than one entity id starts with the given prefix
    #[error(
        "{count} {kind}s have been found that have an ID that matches the provided string '{token}':\n{}\nPlease use the full ID to uniquely identify one of the {kind}s.",
        candidates.join("\n")
    )]
    AmbiguousPrefix {
        kind: ResourceKind,
        token: String,
        count: usize,
        candidates: Vec<String>,
    },

    /// A stack references a component that does not exist
    #[error("Stack component '{id}' of type '{component_type}' does not exist.")]
    StackComponentMissing {
        component_type: ComponentType,
        id: Uuid,
    },

    /// A component configuration does not fit its flavor
    #[error("Invalid configuration for stack component '{component}': {reason}")]
    InvalidConfiguration { component: String, reason: String },

    /// A stack lacks a mandatory component type
    #[error("{0}")]
    InvalidStack(String),

    /// No active project or stack is configured
    #[error("{0}")]
    NoActiveContext(String),

    /// Request payload failed a precondition
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The requested operation is not allowed in the current state
    #[error("Illegal operation: {0}")]
    IllegalOperation(String),

    /// An entity with the same identity already exists
    #[error("{0}")]
    AlreadyExists(String),

    /// Filter parameters could not be compiled
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Reading or writing the client configuration failed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The backing store failed
    #[error("Store operation failed: {0}")]
    Store(#[from] anyhow::Error),
}

impl ClientError {
    /// Create a not found error
    pub fn not_found(kind: ResourceKind, token: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            token: token.into(),
        }
    }

    /// Create an ambiguous name error
    pub fn ambiguous_name(
        kind: ResourceKind,
        token: impl Into<String>,
        candidates: Vec<String>,
    ) -> Self {
        Self::AmbiguousName {
            kind,
            token: token.into(),
            candidates,
        }
    }

    /// Create an ambiguous prefix error
    pub fn ambiguous_prefix(
        kind: ResourceKind,
        token: impl Into<String>,
        count: usize,
        candidates: Vec<String>,
    ) -> Self {
        Self::AmbiguousPrefix {
            kind,
            token: token.into(),
            count,
            candidates,
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_configuration(component: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            component: component.into(),
            reason: reason.into(),
        }
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an illegal operation error
    pub fn illegal_operation(msg: impl Into<String>) -> Self {
        Self::IllegalOperation(msg.into())
    }

    /// Create an already exists error
    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = ClientError::not_found(ResourceKind::Stack, "prod");
        assert_eq!(
            err.to_string(),
            "No stack found with name, ID or prefix 'prod'."
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_ambiguous_prefix_lists_candidates() {
        let err = ClientError::ambiguous_prefix(
            ResourceKind::Component,
            "ab",
            2,
            vec!["a (ab01)".to_string(), "b (ab02)".to_string()],
        );
        let message = err.to_string();
        assert!(message.starts_with("2 components"));
        assert!(message.contains("a (ab01)\nb (ab02)"));
    }
}
