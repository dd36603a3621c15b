//! Resource Abstraction
//!
//! Every managed entity (stack, component, flavor, user, team, role, project,
//! pipeline, run) implements [`Resource`]. The trait gives the filter
//! compiler, the entity resolver and the in-memory store a uniform view:
//!
//! - identity (`id`, `name`) for name-or-id-or-prefix resolution
//! - an optional project scope for scoped name lookups
//! - a static field-type registry for compiling list queries
//! - scalar field access so compiled predicates can be evaluated
//!
//! Request and update payloads are associated types so that the store
//! interface stays generic over the resource kind.

use crate::filters::FieldRegistry;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The managed entity types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Stack,
    Component,
    Flavor,
    User,
    Team,
    Role,
    RoleAssignment,
    Project,
    Pipeline,
    PipelineRun,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stack => "stack",
            Self::Component => "component",
            Self::Flavor => "flavor",
            Self::User => "user",
            Self::Team => "team",
            Self::Role => "role",
            Self::RoleAssignment => "role assignment",
            Self::Project => "project",
            Self::Pipeline => "pipeline",
            Self::PipelineRun => "pipeline run",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed scalar, used both for entity field values and filter operands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    Str(String),
    Uuid(Uuid),
    Int(i64),
    Bool(bool),
    Datetime(NaiveDateTime),
    Null,
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Render the value the way a stringified column would look
    pub fn to_column_string(&self) -> Option<String> {
        match self {
            FieldValue::Str(s) => Some(s.clone()),
            FieldValue::Uuid(id) => Some(id.hyphenated().to_string()),
            FieldValue::Int(i) => Some(i.to_string()),
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Datetime(dt) => Some(dt.to_string()),
            FieldValue::Null => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_column_string() {
            Some(s) => f.write_str(&s),
            None => f.write_str("null"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        FieldValue::Uuid(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Datetime(value.naive_utc())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// Common behaviour of every managed entity
pub trait Resource: Clone + fmt::Debug + Send + Sync + 'static {
    /// Payload used to create a new entity
    type Request: Clone + fmt::Debug + Send + Sync + 'static;
    /// Sparse update payload
    type Update: Clone + fmt::Debug + Default + Send + Sync + 'static;

    const KIND: ResourceKind;

    /// Whether names are only unique within a project
    const PROJECT_SCOPED: bool;

    fn id(&self) -> Uuid;

    fn name(&self) -> &str;

    /// Project the entity belongs to, for scoped resources
    fn project(&self) -> Option<Uuid> {
        None
    }

    /// Declared filterable fields and their semantic types
    fn field_types() -> &'static FieldRegistry;

    /// Value of a declared field, `None` if the field is not declared
    fn field_value(&self, field: &str) -> Option<FieldValue>;

    /// Build the entity from a create request
    fn from_request(id: Uuid, request: Self::Request, now: DateTime<Utc>) -> Self;

    /// Apply a sparse update in place
    fn apply_update(&mut self, update: Self::Update, now: DateTime<Utc>);

    /// `name (id)` label used in ambiguity messages
    fn label(&self) -> String {
        format!("{} ({})", self.name(), self.id())
    }
}

/// Value of one of the base fields (`id`, `created`, `updated`)
pub(crate) fn base_field_value(
    field: &str,
    id: Uuid,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
) -> Option<FieldValue> {
    match field {
        "id" => Some(id.into()),
        "created" => Some(created.into()),
        "updated" => Some(updated.into()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_string_for_uuid_is_hyphenated_lowercase() {
        let id = Uuid::parse_str("7F3A1111-0000-4000-8000-000000000000").unwrap();
        let value = FieldValue::Uuid(id);
        assert_eq!(
            value.to_column_string().as_deref(),
            Some("7f3a1111-0000-4000-8000-000000000000")
        );
    }

    #[test]
    fn test_optional_into_field_value() {
        let none: Option<Uuid> = None;
        assert!(FieldValue::from(none).is_null());
        assert_eq!(FieldValue::from(Some(3_i64)), FieldValue::Int(3));
    }
}
