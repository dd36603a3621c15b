//! Filter operators and filter kinds
//!
//! Operators arrive as the `<op>` part of `"<op>:<value>"` query values. Each
//! filter kind accepts a fixed subset of them:
//!
//! | kind    | operators                                   |
//! |---------|---------------------------------------------|
//! | Bool    | equals                                      |
//! | Str     | equals, contains, startswith, endswith      |
//! | UUID    | equals, contains, startswith, endswith      |
//! | Numeric | equals, gt, gte, lt, lte                    |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Comparison operator for list filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Equals,
    Contains,
    #[serde(rename = "startswith")]
    StartsWith,
    #[serde(rename = "endswith")]
    EndsWith,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 8] = [
        FilterOperator::Equals,
        FilterOperator::Contains,
        FilterOperator::StartsWith,
        FilterOperator::EndsWith,
        FilterOperator::Gt,
        FilterOperator::Gte,
        FilterOperator::Lt,
        FilterOperator::Lte,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::Contains => "contains",
            Self::StartsWith => "startswith",
            Self::EndsWith => "endswith",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
        }
    }

    /// Recognize an operator token, `None` for anything else
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == token)
    }

    /// Split `"<op>:<rest>"` into operator and operand
    ///
    /// Only the first `:` is significant, and only when the prefix is a
    /// recognized operator, so values such as `s3://bucket` stay intact
    /// as an equality operand.
    pub fn split(raw: &str) -> (Self, &str) {
        if let Some((token, rest)) = raw.split_once(':') {
            if let Some(op) = Self::from_token(token) {
                return (op, rest);
            }
        }
        (Self::Equals, raw)
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s).ok_or_else(|| format!("Unknown filter operator: {}", s))
    }
}

/// Predicate family a compiled filter belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Bool,
    Str,
    Uuid,
    Numeric,
}

impl FilterKind {
    pub fn allowed_operators(&self) -> &'static [FilterOperator] {
        use FilterOperator::*;
        match self {
            Self::Bool => &[Equals],
            Self::Str | Self::Uuid => &[Equals, StartsWith, Contains, EndsWith],
            Self::Numeric => &[Equals, Gt, Gte, Lt, Lte],
        }
    }

    pub fn allows(&self, operator: FilterOperator) -> bool {
        self.allowed_operators().contains(&operator)
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "boolean",
            Self::Str => "string",
            Self::Uuid => "UUID",
            Self::Numeric => "numeric",
        };
        f.write_str(name)
    }
}
