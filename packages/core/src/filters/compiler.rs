//! Filter Compiler
//!
//! Turns loosely-typed [`QueryParams`] into a [`ListQuery`]: an ordered list of
//! typed [`QueryFilter`]s plus a validated sort field and [`Pagination`].
//!
//! # Algorithm
//!
//! 1. `sort_by`, `page` and `size` are consumed into the sort/pagination
//!    outputs and never become filters.
//! 2. Every other non-empty value is split into `"<op>:<rest>"` when `<op>`
//!    is a recognized operator, otherwise the operator is `equals`.
//! 3. The operand is coerced according to the field's declared type:
//!    - datetime: parsed with [`DATETIME_FORMAT`]
//!    - UUID: parsed for `equals`, kept as a string for prefix/substring ops
//!    - int / bool: coerced, failures are reported per field
//!    - str and unsupported types: kept as the raw string
//! 4. The operator is checked against the filter kind when the filter is
//!    constructed.
//! 5. The sort field must be declared and must not be a reserved key.
//!
//! # Examples
//!
//! ```rust
//! use stackhub_core::filters::{FieldRegistry, FieldType, FilterOperator, ListQuery, QueryParams};
//!
//! let fields = FieldRegistry::with_base(&[("name", FieldType::Str)]);
//! let params = QueryParams::new()
//!     .with("name", "contains:foo")
//!     .with("page", 2)
//!     .with("size", 10);
//!
//! let query = ListQuery::compile(&params, &fields).unwrap();
//! assert_eq!(query.filters().len(), 1);
//! assert_eq!(query.filters()[0].operator(), FilterOperator::Contains);
//! assert_eq!(query.pagination().limit(), 10);
//! assert_eq!(query.pagination().offset(), 10);
//! ```

use super::error::FilterError;
use super::field_types::{FieldRegistry, FieldType};
use super::operators::{FilterKind, FilterOperator};
use super::pagination::{Pagination, DEFAULT_PAGE, DEFAULT_PAGE_SIZE};
use super::params::{ParamValue, QueryParams};
use super::predicate::QueryFilter;
use crate::models::{FieldValue, Resource};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The only accepted datetime format for filter values (`YY-MM-DD HH:MM:SS`)
pub const DATETIME_FORMAT: &str = "%y-%m-%d %H:%M:%S";

pub const SORT_BY_KEY: &str = "sort_by";
pub const PAGE_KEY: &str = "page";
pub const SIZE_KEY: &str = "size";

/// Keys that never name a filterable or sortable field
pub const RESERVED_KEYS: [&str; 4] = [SORT_BY_KEY, PAGE_KEY, SIZE_KEY, "list_of_filters"];

pub const DEFAULT_SORT_FIELD: &str = "created";

/// A compiled list request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListQuery {
    filters: Vec<QueryFilter>,
    sort_by: String,
    pagination: Pagination,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            sort_by: DEFAULT_SORT_FIELD.to_string(),
            pagination: Pagination::default(),
        }
    }
}

impl ListQuery {
    /// Compile raw parameters against a field registry
    pub fn compile(params: &QueryParams, fields: &FieldRegistry) -> Result<Self, FilterError> {
        let mut filters = Vec::new();
        let mut sort_by = DEFAULT_SORT_FIELD.to_string();
        let mut page = i64::from(DEFAULT_PAGE);
        let mut size = i64::from(DEFAULT_PAGE_SIZE);

        for (key, value) in params.iter() {
            // Empty values are absent, reserved keys included
            if value.is_empty() {
                continue;
            }
            match key {
                SORT_BY_KEY => sort_by = value.to_string(),
                PAGE_KEY => page = reserved_int(key, value)?,
                SIZE_KEY => size = reserved_int(key, value)?,
                _ => {
                    let field_type = fields
                        .get(key)
                        .ok_or_else(|| FilterError::unknown_field(key))?;
                    filters.push(compile_filter(key, field_type, value)?);
                }
            }
        }

        validate_sort_field(&sort_by, fields)?;
        let pagination = Pagination::new(page, size)?;

        tracing::debug!(
            filters = filters.len(),
            sort_by = %sort_by,
            page = pagination.page(),
            size = pagination.size(),
            "Compiled list query"
        );

        Ok(Self {
            filters,
            sort_by,
            pagination,
        })
    }

    /// Compile against the field registry of resource `R`
    pub fn for_resource<R: Resource>(params: &QueryParams) -> Result<Self, FilterError> {
        Self::compile(params, R::field_types())
    }

    /// Append an already-typed filter (scoping filters added by the client)
    pub fn with_filter(mut self, filter: QueryFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn filters(&self) -> &[QueryFilter] {
        &self.filters
    }

    pub fn sort_by(&self) -> &str {
        &self.sort_by
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn into_parts(self) -> (Vec<QueryFilter>, String, Pagination) {
        (self.filters, self.sort_by, self.pagination)
    }

    /// Whether every filter accepts the values produced by `lookup`
    ///
    /// Filters on fields `lookup` does not know never match.
    pub fn matches_all(&self, lookup: impl Fn(&str) -> Option<FieldValue>) -> bool {
        self.filters.iter().all(|filter| {
            lookup(filter.field())
                .map(|value| filter.matches(&value))
                .unwrap_or(false)
        })
    }
}

/// Free-function form of [`ListQuery::compile`]
pub fn compile(params: &QueryParams, fields: &FieldRegistry) -> Result<ListQuery, FilterError> {
    ListQuery::compile(params, fields)
}

fn reserved_int(key: &str, value: &ParamValue) -> Result<i64, FilterError> {
    match value {
        ParamValue::Int(i) => Ok(*i),
        other => {
            let text = other.to_string();
            text.trim()
                .parse::<i64>()
                .map_err(|_| FilterError::invalid_integer(key, text))
        }
    }
}

fn validate_sort_field(sort_by: &str, fields: &FieldRegistry) -> Result<(), FilterError> {
    if RESERVED_KEYS.contains(&sort_by) {
        return Err(FilterError::ReservedSortField {
            field: sort_by.to_string(),
        });
    }
    if !fields.contains(sort_by) {
        return Err(FilterError::InvalidSortField {
            field: sort_by.to_string(),
        });
    }
    Ok(())
}

fn compile_filter(
    field: &str,
    field_type: FieldType,
    value: &ParamValue,
) -> Result<QueryFilter, FilterError> {
    let (operator, operand) = match value {
        ParamValue::Str(raw) => {
            let (operator, rest) = FilterOperator::split(raw);
            (operator, ParamValue::Str(rest.to_string()))
        }
        typed => (FilterOperator::Equals, typed.clone()),
    };

    match field_type {
        FieldType::Datetime => {
            let datetime = match operand {
                ParamValue::Datetime(dt) => dt,
                other => parse_datetime(field, &other.to_string())?,
            };
            QueryFilter::new(
                FilterKind::Numeric,
                field,
                operator,
                FieldValue::Datetime(datetime),
            )
        }
        FieldType::Uuid => {
            let value = if operator == FilterOperator::Equals {
                match operand {
                    ParamValue::Uuid(id) => FieldValue::Uuid(id),
                    other => {
                        let text = other.to_string();
                        let id = Uuid::parse_str(text.trim())
                            .map_err(|_| FilterError::invalid_uuid(field, text))?;
                        FieldValue::Uuid(id)
                    }
                }
            } else {
                FieldValue::Str(operand.to_string().to_lowercase())
            };
            QueryFilter::new(FilterKind::Uuid, field, operator, value)
        }
        FieldType::Int => {
            let number = match operand {
                ParamValue::Int(i) => i,
                other => {
                    let text = other.to_string();
                    text.trim()
                        .parse::<i64>()
                        .map_err(|_| FilterError::invalid_integer(field, text))?
                }
            };
            QueryFilter::new(FilterKind::Numeric, field, operator, FieldValue::Int(number))
        }
        FieldType::Bool => {
            let flag = match operand {
                ParamValue::Bool(b) => b,
                other => parse_bool(field, &other.to_string())?,
            };
            QueryFilter::new(FilterKind::Bool, field, operator, FieldValue::Bool(flag))
        }
        FieldType::Str => QueryFilter::new(
            FilterKind::Str,
            field,
            operator,
            FieldValue::Str(operand.to_string()),
        ),
        FieldType::Unsupported(type_name) => {
            tracing::warn!(
                "The datatype '{}' of field '{}' might not be supported for filtering; comparing as string",
                type_name,
                field
            );
            QueryFilter::new(
                FilterKind::Str,
                field,
                operator,
                FieldValue::Str(operand.to_string()),
            )
        }
    }
}

fn parse_datetime(field: &str, text: &str) -> Result<NaiveDateTime, FilterError> {
    NaiveDateTime::parse_from_str(text.trim(), DATETIME_FORMAT)
        .map_err(|_| FilterError::invalid_datetime(field, text))
}

fn parse_bool(field: &str, text: &str) -> Result<bool, FilterError> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(FilterError::invalid_boolean(field, text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fields() -> FieldRegistry {
        FieldRegistry::with_base(&[
            ("name", FieldType::Str),
            ("project", FieldType::Uuid),
            ("num_steps", FieldType::Int),
            ("is_shared", FieldType::Bool),
            ("configuration", FieldType::Unsupported("json")),
        ])
    }

    #[test]
    fn test_contains_filter_and_pagination() {
        let params = QueryParams::new()
            .with("name", "contains:foo")
            .with("page", 2)
            .with("size", 10);
        let query = ListQuery::compile(&params, &fields()).unwrap();

        assert_eq!(query.filters().len(), 1);
        let filter = &query.filters()[0];
        assert_eq!(filter.kind(), FilterKind::Str);
        assert_eq!(filter.operator(), FilterOperator::Contains);
        assert_eq!(filter.value(), &FieldValue::from("foo"));
        assert_eq!(query.pagination().limit(), 10);
        assert_eq!(query.pagination().offset(), 10);
    }

    #[test]
    fn test_defaults_when_omitted() {
        let query = ListQuery::compile(&QueryParams::new(), &fields()).unwrap();
        assert!(query.filters().is_empty());
        assert_eq!(query.sort_by(), "created");
        assert_eq!(query.pagination(), Pagination::default());
        assert_eq!(query.pagination().page(), 1);
        assert_eq!(query.pagination().size(), 50);
    }

    #[test]
    fn test_pagination_bounds_rejected() {
        for (page, size) in [(1, 101), (1, 0), (0, 50)] {
            let params = QueryParams::new().with("page", page).with("size", size);
            assert!(ListQuery::compile(&params, &fields()).is_err());
        }
    }

    #[test]
    fn test_string_page_and_size_are_accepted() {
        let params = QueryParams::new().with("page", "3").with("size", "25");
        let query = ListQuery::compile(&params, &fields()).unwrap();
        assert_eq!(query.pagination().offset(), 50);

        let params = QueryParams::new().with("page", "three");
        assert!(matches!(
            ListQuery::compile(&params, &fields()),
            Err(FilterError::InvalidInteger { .. })
        ));
    }

    #[test]
    fn test_empty_reserved_keys_use_defaults() {
        let params = QueryParams::new()
            .with("page", "")
            .with("size", "")
            .with("sort_by", "");
        let query = ListQuery::compile(&params, &fields()).unwrap();
        assert_eq!(query.sort_by(), DEFAULT_SORT_FIELD);
        assert_eq!(query.pagination(), Pagination::default());
    }

    #[test]
    fn test_datetime_filter() {
        let params = QueryParams::new().with("created", "gte:24-01-31 13:45:00");
        let query = ListQuery::compile(&params, &fields()).unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(13, 45, 0)
            .unwrap();
        let filter = &query.filters()[0];
        assert_eq!(filter.kind(), FilterKind::Numeric);
        assert_eq!(filter.operator(), FilterOperator::Gte);
        assert_eq!(filter.value(), &FieldValue::Datetime(expected));
    }

    #[test]
    fn test_invalid_datetime_names_expected_format() {
        let params = QueryParams::new().with("created", "2024-13-40 00:00:00");
        let err = ListQuery::compile(&params, &fields()).unwrap_err();
        assert!(matches!(err, FilterError::InvalidDatetime { .. }));
        let message = err.to_string();
        assert!(message.contains(DATETIME_FORMAT), "{}", message);
        assert!(message.contains("created"));
    }

    #[test]
    fn test_uuid_equality_requires_valid_uuid() {
        let id = Uuid::new_v4();
        let params = QueryParams::new().with("project", id.to_string());
        let query = ListQuery::compile(&params, &fields()).unwrap();
        assert_eq!(query.filters()[0].value(), &FieldValue::Uuid(id));

        let params = QueryParams::new().with("project", "not-a-uuid");
        assert!(matches!(
            ListQuery::compile(&params, &fields()),
            Err(FilterError::InvalidUuid { .. })
        ));
    }

    #[test]
    fn test_uuid_prefix_keeps_raw_string() {
        let params = QueryParams::new().with("id", "startswith:7F3A");
        let query = ListQuery::compile(&params, &fields()).unwrap();
        let filter = &query.filters()[0];
        assert_eq!(filter.kind(), FilterKind::Uuid);
        assert_eq!(filter.value(), &FieldValue::from("7f3a"));
    }

    #[test]
    fn test_operator_outside_kind_is_rejected() {
        let params = QueryParams::new().with("is_shared", "contains:tr");
        assert!(matches!(
            ListQuery::compile(&params, &fields()),
            Err(FilterError::UnsupportedOperator { .. })
        ));

        let params = QueryParams::new().with("name", "gt:abc");
        assert!(matches!(
            ListQuery::compile(&params, &fields()),
            Err(FilterError::UnsupportedOperator { .. })
        ));
    }

    #[test]
    fn test_int_and_bool_coercion() {
        let params = QueryParams::new()
            .with("num_steps", "lt:5")
            .with("is_shared", "true");
        let query = ListQuery::compile(&params, &fields()).unwrap();
        assert_eq!(query.filters()[0].value(), &FieldValue::Int(5));
        assert_eq!(query.filters()[1].value(), &FieldValue::Bool(true));

        let params = QueryParams::new().with("num_steps", "many");
        assert!(matches!(
            ListQuery::compile(&params, &fields()),
            Err(FilterError::InvalidInteger { .. })
        ));
    }

    #[test]
    fn test_typed_false_is_a_filter_but_empty_string_is_skipped() {
        let params = QueryParams::new().with("is_shared", false).with("name", "");
        let query = ListQuery::compile(&params, &fields()).unwrap();
        assert_eq!(query.filters().len(), 1);
        assert_eq!(query.filters()[0].field(), "is_shared");
    }

    #[test]
    fn test_unsupported_type_falls_back_to_string() {
        let params = QueryParams::new().with("configuration", "contains:path");
        let query = ListQuery::compile(&params, &fields()).unwrap();
        assert_eq!(query.filters()[0].kind(), FilterKind::Str);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let params = QueryParams::new().with("colour", "blue");
        assert_eq!(
            ListQuery::compile(&params, &fields()).unwrap_err(),
            FilterError::unknown_field("colour")
        );
    }

    #[test]
    fn test_sort_validation() {
        let params = QueryParams::new().with("sort_by", "name");
        assert_eq!(
            ListQuery::compile(&params, &fields()).unwrap().sort_by(),
            "name"
        );

        let params = QueryParams::new().with("sort_by", "page");
        assert!(matches!(
            ListQuery::compile(&params, &fields()),
            Err(FilterError::ReservedSortField { .. })
        ));

        let params = QueryParams::new().with("sort_by", "colour");
        assert!(matches!(
            ListQuery::compile(&params, &fields()),
            Err(FilterError::InvalidSortField { .. })
        ));
    }

    #[test]
    fn test_filters_keep_insertion_order() {
        let params = QueryParams::new()
            .with("num_steps", "gte:1")
            .with("name", "startswith:a");
        let query = ListQuery::compile(&params, &fields()).unwrap();
        let names: Vec<_> = query.filters().iter().map(|f| f.field()).collect();
        assert_eq!(names, ["num_steps", "name"]);
    }
}
