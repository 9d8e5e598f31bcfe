//! Query directives
//!
//! A [`Query`] is a declarative accumulation of directives. It is built with
//! the chainable [`QueryBuilder`] and then handed to a materializing call
//! (see `pipeline`), which applies the directives in a fixed order no matter
//! in which order they were chained.
//!
//! # Example
//!
//! ```rust,ignore
//! let query = Query::filter(Conditions::new().verb("completed"))
//!     .since("2025-01-01T00:00:00Z")
//!     .group("actor.name")
//!     .order("count", Direction::Desc)
//!     .limit(3)
//!     .verbs(Arc::new(AdlVerbs))
//!     .build();
//! ```

use super::error::QueryError;
use super::path::{FieldPath, FieldValue};
use super::verbs::{IdentityVerbs, VerbResolver};
use crate::model::{parse_instant, Timestamp};
use chrono::{DateTime, Datelike, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// A built query, ready to be materialized
#[derive(Debug, Clone)]
pub struct Query {
    /// Condition sets, ANDed together
    pub filters: Vec<Conditions>,
    /// Optional grouping clause
    pub group_by: Option<Grouping>,
    /// Optional sort key; only one is active
    pub order: Option<Order>,
    /// Optional cap on rows (ungrouped) or groups (grouped)
    pub limit: Option<usize>,
    /// Optional projection path
    pub select: Option<FieldPath>,
    /// Deduplicate rows or projected values
    pub distinct: bool,
    pub(crate) verbs: Arc<dyn VerbResolver>,
}

impl Query {
    /// A query over every statement
    pub fn all() -> QueryBuilder {
        QueryBuilder::new()
    }

    /// Start with one condition set
    pub fn filter(conditions: Conditions) -> QueryBuilder {
        QueryBuilder::new().filter(conditions)
    }

    /// Start with a lower timestamp bound
    pub fn since(instant: impl IntoInstant) -> QueryBuilder {
        QueryBuilder::new().since(instant)
    }

    /// Start with a grouping path
    pub fn group(path: impl Into<FieldPath>) -> QueryBuilder {
        QueryBuilder::new().group(path)
    }

    /// Start with a projection
    pub fn select(path: impl Into<FieldPath>) -> QueryBuilder {
        QueryBuilder::new().select(path)
    }

    /// Start with a sort key
    pub fn order(key: impl Into<SortKey>, direction: Direction) -> QueryBuilder {
        QueryBuilder::new().order(key, direction)
    }

    /// The resolver used for verb shorthands
    pub fn verb_resolver(&self) -> &dyn VerbResolver {
        self.verbs.as_ref()
    }
}

/// One filter condition
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The value at `path` must match `expected`
    Equals { path: FieldPath, expected: FieldValue },
    /// `verb.id` must equal the resolved shorthand
    Verb(String),
    /// Timestamp at or after the instant; `None` never matches
    Since(Option<DateTime<Utc>>),
}

/// A set of conditions that must all hold
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    conditions: Vec<Condition>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the value at `path` to match `value`
    pub fn eq(mut self, path: impl Into<FieldPath>, value: impl Into<FieldValue>) -> Self {
        self.conditions.push(Condition::Equals {
            path: path.into(),
            expected: value.into(),
        });
        self
    }

    /// Require the value at `path` to be absent or null
    pub fn absent(self, path: impl Into<FieldPath>) -> Self {
        self.eq(path, FieldValue::Null)
    }

    /// Require a verb, given as an IRI or as a shorthand the query's
    /// [`VerbResolver`] understands
    pub fn verb(mut self, verb: impl Into<String>) -> Self {
        self.conditions.push(Condition::Verb(verb.into()));
        self
    }

    /// Require a timestamp at or after `instant`
    pub fn since(mut self, instant: impl IntoInstant) -> Self {
        let bound = match instant.into_instant() {
            Ok(instant) => Some(instant),
            Err(raw) => {
                tracing::warn!(since = %raw, "Unparsable since timestamp, condition matches nothing");
                None
            }
        };
        self.conditions.push(Condition::Since(bound));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.iter()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Replace verb shorthands with `verb.id` equality on the resolved IRI
    pub(crate) fn resolve_verbs(self, resolver: &dyn VerbResolver) -> Self {
        let conditions = self
            .conditions
            .into_iter()
            .map(|condition| match condition {
                Condition::Verb(short) => Condition::Equals {
                    path: FieldPath::parse("verb.id"),
                    expected: FieldValue::Text(resolver.resolve(&short)),
                },
                other => other,
            })
            .collect();
        Self { conditions }
    }
}

impl<P: Into<FieldPath>, V: Into<FieldValue>> FromIterator<(P, V)> for Conditions {
    fn from_iter<I: IntoIterator<Item = (P, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Conditions::new(), |conditions, (path, value)| conditions.eq(path, value))
    }
}

/// Anything `since` accepts: parsed instants or ISO-8601 strings.
///
/// Strings that do not parse come back as `Err` with the raw input.
pub trait IntoInstant {
    fn into_instant(self) -> Result<DateTime<Utc>, String>;
}

impl IntoInstant for DateTime<Utc> {
    fn into_instant(self) -> Result<DateTime<Utc>, String> {
        Ok(self)
    }
}

impl IntoInstant for DateTime<FixedOffset> {
    fn into_instant(self) -> Result<DateTime<Utc>, String> {
        Ok(self.with_timezone(&Utc))
    }
}

impl IntoInstant for &Timestamp {
    fn into_instant(self) -> Result<DateTime<Utc>, String> {
        Ok(self.instant())
    }
}

impl IntoInstant for &str {
    fn into_instant(self) -> Result<DateTime<Utc>, String> {
        parse_instant(self).ok_or_else(|| self.to_string())
    }
}

impl IntoInstant for String {
    fn into_instant(self) -> Result<DateTime<Utc>, String> {
        parse_instant(&self).ok_or(self)
    }
}

/// Calendar bucket for time-valued group keys (always UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    /// `YYYY-MM-DD`
    Day,
    /// ISO week, `GGGG-Www`
    Week,
    /// `YYYY-MM`
    Month,
}

impl Period {
    /// Parse `day`, `week` or `month`
    pub fn parse(s: &str) -> Result<Self, QueryError> {
        match s.to_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            _ => Err(QueryError::InvalidPeriod(s.to_string())),
        }
    }

    /// Bucket label for an instant
    pub fn bucket(&self, instant: &DateTime<Utc>) -> String {
        match self {
            Self::Day => instant.format("%Y-%m-%d").to_string(),
            Self::Week => {
                let week = instant.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            Self::Month => instant.format("%Y-%m").to_string(),
        }
    }
}

impl FromStr for Period {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::parse(s)
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Day => write!(f, "day"),
            Self::Week => write!(f, "week"),
            Self::Month => write!(f, "month"),
        }
    }
}

/// GROUP clause
#[derive(Debug, Clone, PartialEq)]
pub struct Grouping {
    pub path: FieldPath,
    pub period: Option<Period>,
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub(crate) fn apply(&self, ordering: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

impl FromStr for Direction {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(QueryError::InvalidOrder(s.to_string())),
        }
    }
}

/// What to sort by
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    /// The computed aggregate of each group (`count` / `average`)
    Aggregate,
    /// A dotted path (the group key, when grouped)
    Path(FieldPath),
}

impl From<&str> for SortKey {
    fn from(key: &str) -> Self {
        match key {
            "count" | "average" => SortKey::Aggregate,
            path => SortKey::Path(FieldPath::parse(path)),
        }
    }
}

impl From<String> for SortKey {
    fn from(key: String) -> Self {
        SortKey::from(key.as_str())
    }
}

impl From<FieldPath> for SortKey {
    fn from(path: FieldPath) -> Self {
        SortKey::Path(path)
    }
}

/// ORDER clause
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub key: SortKey,
    pub direction: Direction,
}

/// Arguments of the `count` terminal
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Count {
    pub(crate) field: Option<FieldPath>,
    pub(crate) matching: Option<Conditions>,
}

impl Count {
    /// Count rows
    pub fn rows() -> Self {
        Self::default()
    }

    /// Count rows where `path` is present and non-null
    pub fn field(path: impl Into<FieldPath>) -> Self {
        Self {
            field: Some(path.into()),
            matching: None,
        }
    }

    /// Extra conditions merged into the filter for this count only
    pub fn matching(mut self, conditions: Conditions) -> Self {
        self.matching = Some(conditions);
        self
    }
}

/// Builder for constructing queries
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    filters: Vec<Conditions>,
    group_by: Option<Grouping>,
    order: Option<Order>,
    limit: Option<usize>,
    select: Option<FieldPath>,
    distinct: bool,
    verbs: Arc<dyn VerbResolver>,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
            group_by: None,
            order: None,
            limit: None,
            select: None,
            distinct: false,
            verbs: Arc::new(IdentityVerbs),
        }
    }

    /// Add a condition set
    pub fn filter(mut self, conditions: Conditions) -> Self {
        self.filters.push(conditions);
        self
    }

    /// Add a single equality condition as its own set
    pub fn filter_eq(self, path: impl Into<FieldPath>, value: impl Into<FieldValue>) -> Self {
        self.filter(Conditions::new().eq(path, value))
    }

    /// Require a timestamp at or after `instant`
    pub fn since(self, instant: impl IntoInstant) -> Self {
        self.filter(Conditions::new().since(instant))
    }

    /// Set the sort key, replacing any earlier one
    pub fn order(mut self, key: impl Into<SortKey>, direction: Direction) -> Self {
        self.order = Some(Order {
            key: key.into(),
            direction,
        });
        self
    }

    /// Sort ascending by `key`
    pub fn order_by(self, key: impl Into<SortKey>) -> Self {
        self.order(key, Direction::Asc)
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Group by the value at `path`
    pub fn group(mut self, path: impl Into<FieldPath>) -> Self {
        self.group_by = Some(Grouping {
            path: path.into(),
            period: None,
        });
        self
    }

    /// Group by the calendar bucket of the time at `path`
    pub fn group_by_period(mut self, path: impl Into<FieldPath>, period: Period) -> Self {
        self.group_by = Some(Grouping {
            path: path.into(),
            period: Some(period),
        });
        self
    }

    /// Project each row to the value at `path`
    pub fn select(mut self, path: impl Into<FieldPath>) -> Self {
        self.select = Some(path.into());
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Resolver for verb shorthands in this query's conditions
    pub fn verbs(mut self, resolver: Arc<dyn VerbResolver>) -> Self {
        self.verbs = resolver;
        self
    }

    /// Build the query
    pub fn build(self) -> Query {
        let verbs = self.verbs;
        Query {
            filters: self
                .filters
                .into_iter()
                .map(|conditions| conditions.resolve_verbs(verbs.as_ref()))
                .collect(),
            group_by: self.group_by,
            order: self.order,
            limit: self.limit,
            select: self.select,
            distinct: self.distinct,
            verbs,
        }
    }
}
