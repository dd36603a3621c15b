//! Compiled, backend-agnostic predicates

use super::error::FilterError;
use super::operators::{FilterKind, FilterOperator};
use crate::models::FieldValue;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A single typed predicate on one resource field
///
/// Construction validates the operator against the filter kind, so an
/// existing `QueryFilter` is always executable by a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFilter {
    field: String,
    operator: FilterOperator,
    kind: FilterKind,
    value: FieldValue,
}

impl QueryFilter {
    pub fn new(
        kind: FilterKind,
        field: impl Into<String>,
        operator: FilterOperator,
        value: FieldValue,
    ) -> Result<Self, FilterError> {
        let field = field.into();
        if !kind.allows(operator) {
            return Err(FilterError::unsupported_operator(field, operator, kind));
        }
        Ok(Self {
            field,
            operator,
            kind,
            value,
        })
    }

    /// Equality filter on a string field
    pub fn str_equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator: FilterOperator::Equals,
            kind: FilterKind::Str,
            value: FieldValue::Str(value.into()),
        }
    }

    /// Equality filter on a UUID field
    pub fn uuid_equals(field: impl Into<String>, value: uuid::Uuid) -> Self {
        Self {
            field: field.into(),
            operator: FilterOperator::Equals,
            kind: FilterKind::Uuid,
            value: FieldValue::Uuid(value),
        }
    }

    /// Prefix filter on the stringified form of a UUID field
    pub fn uuid_prefix(field: impl Into<String>, prefix: &str) -> Self {
        Self {
            field: field.into(),
            operator: FilterOperator::StartsWith,
            kind: FilterKind::Uuid,
            value: FieldValue::Str(prefix.to_lowercase()),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    /// Evaluate the predicate against a field value
    ///
    /// A null candidate never matches, mirroring SQL `NULL` semantics.
    pub fn matches(&self, candidate: &FieldValue) -> bool {
        if candidate.is_null() {
            return false;
        }
        match self.kind {
            FilterKind::Bool => candidate == &self.value,
            FilterKind::Str => match (candidate.to_column_string(), &self.value) {
                (Some(column), FieldValue::Str(operand)) => {
                    text_matches(self.operator, &column, operand)
                }
                _ => false,
            },
            FilterKind::Uuid => match (&self.value, candidate) {
                (FieldValue::Uuid(expected), FieldValue::Uuid(actual)) => expected == actual,
                (FieldValue::Str(operand), _) => candidate
                    .to_column_string()
                    .map(|column| {
                        text_matches(self.operator, &column.to_lowercase(), &operand.to_lowercase())
                    })
                    .unwrap_or(false),
                _ => false,
            },
            FilterKind::Numeric => match compare_scalars(candidate, &self.value) {
                Some(ordering) => match self.operator {
                    FilterOperator::Equals => ordering == Ordering::Equal,
                    FilterOperator::Gt => ordering == Ordering::Greater,
                    FilterOperator::Gte => ordering != Ordering::Less,
                    FilterOperator::Lt => ordering == Ordering::Less,
                    FilterOperator::Lte => ordering != Ordering::Greater,
                    _ => false,
                },
                None => false,
            },
        }
    }
}

fn text_matches(operator: FilterOperator, column: &str, operand: &str) -> bool {
    match operator {
        FilterOperator::Equals => column == operand,
        FilterOperator::Contains => column.contains(operand),
        FilterOperator::StartsWith => column.starts_with(operand),
        FilterOperator::EndsWith => column.ends_with(operand),
        _ => false,
    }
}

fn compare_scalars(a: &FieldValue, b: &FieldValue) -> Option<Ordering> {
    match (a, b) {
        (FieldValue::Int(x), FieldValue::Int(y)) => Some(x.cmp(y)),
        (FieldValue::Datetime(x), FieldValue::Datetime(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Total ordering used to sort entities by a field
///
/// Nulls sort first; mismatched types fall back to their string form.
pub fn compare_field_values(a: &FieldValue, b: &FieldValue) -> Ordering {
    match (a, b) {
        (FieldValue::Null, FieldValue::Null) => Ordering::Equal,
        (FieldValue::Null, _) => Ordering::Less,
        (_, FieldValue::Null) => Ordering::Greater,
        (FieldValue::Bool(x), FieldValue::Bool(y)) => x.cmp(y),
        (FieldValue::Uuid(x), FieldValue::Uuid(y)) => x.cmp(y),
        (FieldValue::Str(x), FieldValue::Str(y)) => x.cmp(y),
        _ => compare_scalars(a, b).unwrap_or_else(|| a.to_string().cmp(&b.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    #[test]
    fn test_construction_rejects_disallowed_operator() {
        let err = QueryFilter::new(
            FilterKind::Bool,
            "is_shared",
            FilterOperator::Contains,
            FieldValue::Bool(true),
        )
        .unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedOperator { .. }));
    }

    #[test]
    fn test_string_operators() {
        let filter = QueryFilter::new(
            FilterKind::Str,
            "name",
            FilterOperator::Contains,
            FieldValue::from("ault"),
        )
        .unwrap();
        assert!(filter.matches(&FieldValue::from("default")));
        assert!(!filter.matches(&FieldValue::from("prod")));

        let filter = QueryFilter::new(
            FilterKind::Str,
            "name",
            FilterOperator::EndsWith,
            FieldValue::from("-dev"),
        )
        .unwrap();
        assert!(filter.matches(&FieldValue::from("stack-dev")));
        assert!(!filter.matches(&FieldValue::from("dev-stack")));
    }

    #[test]
    fn test_uuid_prefix_matches_stringified_id() {
        let id = Uuid::parse_str("7f3a1111-0000-4000-8000-000000000000").unwrap();
        let filter = QueryFilter::uuid_prefix("id", "7F3A");
        assert!(filter.matches(&FieldValue::Uuid(id)));
        let other = Uuid::parse_str("0a3a1111-0000-4000-8000-000000000000").unwrap();
        assert!(!filter.matches(&FieldValue::Uuid(other)));
    }

    #[test]
    fn test_numeric_datetime_ordering() {
        let cutoff = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let later = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let filter = QueryFilter::new(
            FilterKind::Numeric,
            "created",
            FilterOperator::Gte,
            FieldValue::Datetime(cutoff),
        )
        .unwrap();
        assert!(filter.matches(&FieldValue::Datetime(later)));
        assert!(filter.matches(&FieldValue::Datetime(cutoff)));

        let filter = QueryFilter::new(
            FilterKind::Numeric,
            "num_steps",
            FilterOperator::Lt,
            FieldValue::Int(5),
        )
        .unwrap();
        assert!(filter.matches(&FieldValue::Int(4)));
        assert!(!filter.matches(&FieldValue::Int(5)));
    }

    #[test]
    fn test_null_never_matches() {
        let filter = QueryFilter::uuid_equals("pipeline", Uuid::new_v4());
        assert!(!filter.matches(&FieldValue::Null));
    }
}
