//! Per-resource field-type registry
//!
//! Each resource kind declares its filterable fields once, as a mapping from
//! field name to a semantic [`FieldType`]. The compiler dispatches on this
//! table instead of inspecting the resource type at runtime.

use std::fmt;

/// Semantic type of a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Str,
    Uuid,
    Int,
    Bool,
    Datetime,
    /// A type the compiler has no dedicated filter for (e.g. `json`).
    /// Filters on such fields fall back to string comparison.
    Unsupported(&'static str),
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str => f.write_str("str"),
            Self::Uuid => f.write_str("UUID"),
            Self::Int => f.write_str("int"),
            Self::Bool => f.write_str("bool"),
            Self::Datetime => f.write_str("datetime"),
            Self::Unsupported(name) => f.write_str(name),
        }
    }
}

/// Fields every resource carries
pub const BASE_FIELDS: [(&str, FieldType); 3] = [
    ("id", FieldType::Uuid),
    ("created", FieldType::Datetime),
    ("updated", FieldType::Datetime),
];

/// Ordered field-name → type table for one resource kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRegistry {
    fields: Vec<(&'static str, FieldType)>,
}

impl FieldRegistry {
    /// Registry with the base fields followed by `fields`
    ///
    /// A later declaration of the same name replaces the earlier one.
    pub fn with_base(fields: &[(&'static str, FieldType)]) -> Self {
        let mut registry = Self {
            fields: BASE_FIELDS.to_vec(),
        };
        for (name, field_type) in fields {
            registry.declare(name, *field_type);
        }
        registry
    }

    fn declare(&mut self, name: &'static str, field_type: FieldType) {
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = field_type,
            None => self.fields.push((name, field_type)),
        }
    }

    pub fn get(&self, field: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, field_type)| *field_type)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(name, _)| *name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_fields_always_present() {
        let registry = FieldRegistry::with_base(&[("name", FieldType::Str)]);
        assert_eq!(registry.get("id"), Some(FieldType::Uuid));
        assert_eq!(registry.get("created"), Some(FieldType::Datetime));
        assert_eq!(registry.get("name"), Some(FieldType::Str));
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_redeclaration_replaces_type() {
        let registry = FieldRegistry::with_base(&[("id", FieldType::Str)]);
        assert_eq!(registry.get("id"), Some(FieldType::Str));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_unknown_field() {
        let registry = FieldRegistry::with_base(&[]);
        assert!(!registry.contains("name"));
        assert_eq!(registry.names().collect::<Vec<_>>(), ["id", "created", "updated"]);
    }
}
