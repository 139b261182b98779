//! Dynamic conference filter builder.
//!
//! Turns caller-supplied `(field, operator, value)` clauses into a store
//! [`Query`] with a sort order the store can serve:
//!
//! ```text
//! clauses ──parse──▶ (property, op, typed value)
//!         ──check──▶ at most one property with an inequality
//!         ──sort───▶ [inequality property ↑, name ↑]  or  [name ↑]
//! ```
//!
//! # Examples
//!
//! ```
//! use conference_central::filters::{FilterClause, build_conference_query};
//! use conference_core::{FilterOp, SortOrder};
//!
//! let query = build_conference_query(&[
//!     FilterClause::new("month", "EQ", "6"),
//!     FilterClause::new("maxAttendees", "GT", "50"),
//! ])
//! .unwrap();
//!
//! assert_eq!(
//!     query.orders,
//!     vec![SortOrder::ascending("maxAttendees"), SortOrder::ascending("name")]
//! );
//! assert_eq!(query.filters[1].op, FilterOp::Gt);
//! ```

use crate::error::{Result, ServiceError};
use crate::types::CONFERENCE;
use conference_core::{FilterOp, PropertyFilter, Query, SortOrder, Value};
use serde::{Deserialize, Serialize};

/// One raw filter clause as sent by a caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterClause {
    /// Field name: `city`, `topic`, `month` or `maxAttendees`
    pub field: String,
    /// Operator name: `EQ`, `GT`, `GTEQ`, `LT`, `LTEQ` or `NE`
    pub operator: String,
    /// Value as text
    pub value: String,
}

impl FilterClause {
    /// Create a clause.
    #[must_use]
    pub fn new(field: impl Into<String>, operator: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }
}

/// Filterable conference fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterField {
    /// `city`
    City,
    /// `topics` (multi-valued)
    Topic,
    /// `month`
    Month,
    /// `maxAttendees`
    MaxAttendees,
}

impl FilterField {
    /// Every field.
    pub const ALL: [Self; 4] = [Self::City, Self::Topic, Self::Month, Self::MaxAttendees];

    /// Parse a field name. Accepts the property spelling (`city`, `topic`,
    /// `month`, `maxAttendees`) or its upper-case alias (`CITY`, `TOPIC`,
    /// `MONTH`, `MAX_ATTENDEES`); anything else is rejected.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "city" | "CITY" => Some(Self::City),
            "topic" | "TOPIC" => Some(Self::Topic),
            "month" | "MONTH" => Some(Self::Month),
            "maxAttendees" | "MAX_ATTENDEES" => Some(Self::MaxAttendees),
            _ => None,
        }
    }

    /// Stored property the field filters on.
    #[must_use]
    pub const fn property(self) -> &'static str {
        match self {
            Self::City => "city",
            Self::Topic => "topics",
            Self::Month => "month",
            Self::MaxAttendees => "maxAttendees",
        }
    }

    const fn is_numeric(self) -> bool {
        matches!(self, Self::Month | Self::MaxAttendees)
    }
}

/// Parse an operator name: exactly one of `EQ`, `GT`, `GTEQ`, `LT`, `LTEQ`, `NE`.
#[must_use]
pub fn parse_operator(name: &str) -> Option<FilterOp> {
    match name {
        "EQ" => Some(FilterOp::Eq),
        "GT" => Some(FilterOp::Gt),
        "GTEQ" => Some(FilterOp::GtEq),
        "LT" => Some(FilterOp::Lt),
        "LTEQ" => Some(FilterOp::LtEq),
        "NE" => Some(FilterOp::Ne),
        _ => None,
    }
}

fn parse_clause(clause: &FilterClause) -> Result<(FilterField, PropertyFilter)> {
    let field = FilterField::parse(&clause.field).ok_or_else(|| {
        ServiceError::InvalidQuery(format!("Filter contains invalid field '{}'", clause.field))
    })?;
    let op = parse_operator(&clause.operator).ok_or_else(|| {
        ServiceError::InvalidQuery(format!(
            "Filter contains invalid operator '{}' for field '{}'",
            clause.operator, clause.field
        ))
    })?;
    let value = if field.is_numeric() {
        let number: i64 = clause.value.trim().parse().map_err(|_| {
            ServiceError::InvalidQuery(format!(
                "Field '{}' expects an integer, got '{}'",
                clause.field, clause.value
            ))
        })?;
        Value::Int(number)
    } else {
        Value::Str(clause.value.clone())
    };
    Ok((field, PropertyFilter::new(field.property(), op, value)))
}

/// Build the conference query for `clauses`.
///
/// # Errors
///
/// - [`ServiceError::InvalidQuery`]: unknown field or operator, or a
///   non-integer value for `month` / `maxAttendees`
/// - [`ServiceError::UnsupportedQuery`]: inequality operators on two
///   different fields
pub fn build_conference_query(clauses: &[FilterClause]) -> Result<Query> {
    let mut query = Query::kind(CONFERENCE);
    let mut inequality_field: Option<FilterField> = None;

    for clause in clauses {
        let (field, filter) = parse_clause(clause)?;
        if filter.op.is_inequality() {
            match inequality_field {
                Some(existing) if existing != field => {
                    return Err(ServiceError::UnsupportedQuery(
                        "inequality filter allowed on only one field".to_string(),
                    ));
                },
                _ => inequality_field = Some(field),
            }
        }
        query = query.filter(filter);
    }

    if let Some(field) = inequality_field {
        query = query.order(SortOrder::ascending(field.property()));
    }
    Ok(query.order(SortOrder::ascending("name")))
}
