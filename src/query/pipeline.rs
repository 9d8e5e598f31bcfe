//! Query materialization
//!
//! Directives are applied in a fixed order, independent of the order they
//! were chained in:
//!
//! 1. every condition set (AND across and within sets)
//! 2. ungrouped: sort, limit, then distinct/select projection
//! 3. grouped: partition into first-seen buckets, project each bucket,
//!    aggregate, sort the groups and limit the number of groups
//!
//! Everything here is synchronous and works on a borrowed slice, so the same
//! snapshot can serve any number of queries.

use super::ast::{Condition, Conditions, Count, Grouping, Period, Query, SortKey};
use super::error::{QueryError, QueryResult};
use super::path::{compare, matches, resolve, FieldPath, FieldValue};
use super::verbs::VerbResolver;
use crate::model::{parse_instant, Statement};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

/// Key of one group in a grouped result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    /// Rows whose group value was absent or null
    Missing,
    Value(String),
}

impl GroupKey {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            GroupKey::Missing => None,
            GroupKey::Value(value) => Some(value),
        }
    }
}

impl From<&str> for GroupKey {
    fn from(value: &str) -> Self {
        GroupKey::Value(value.to_string())
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupKey::Missing => write!(f, "(missing)"),
            GroupKey::Value(value) => f.write_str(value),
        }
    }
}

/// Result of a terminal aggregate. Not a builder: nothing can be chained on it.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregate<T> {
    /// Ungrouped scalar
    Total(T),
    /// Group key to aggregate, in result order
    Grouped(IndexMap<GroupKey, T>),
}

impl<T> Aggregate<T> {
    pub fn total(&self) -> Option<&T> {
        match self {
            Aggregate::Total(value) => Some(value),
            Aggregate::Grouped(_) => None,
        }
    }

    pub fn groups(&self) -> Option<&IndexMap<GroupKey, T>> {
        match self {
            Aggregate::Total(_) => None,
            Aggregate::Grouped(groups) => Some(groups),
        }
    }

    /// Aggregate of the group keyed `key`
    pub fn group(&self, key: &str) -> Option<&T> {
        self.groups()?.get(&GroupKey::from(key))
    }

    /// Aggregate of the missing-value group
    pub fn missing(&self) -> Option<&T> {
        self.groups()?.get(&GroupKey::Missing)
    }
}

impl<T: Serialize> Serialize for Aggregate<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Aggregate::Total(value) => value.serialize(serializer),
            Aggregate::Grouped(groups) => {
                serializer.collect_map(groups.iter().map(|(key, value)| (key.to_string(), value)))
            }
        }
    }
}

type Buckets<'a> = IndexMap<GroupKey, (Option<FieldValue>, Vec<&'a Statement>)>;

impl Query {
    /// Matching statements after filter, sort, limit and distinct
    pub fn statements<'a>(&self, statements: &'a [Statement]) -> Vec<&'a Statement> {
        self.members(self.rows(statements, None))
    }

    /// The projected `select` value of every matching statement; absent
    /// values are reported as `Null`
    pub fn values(&self, statements: &[Statement]) -> QueryResult<Vec<FieldValue>> {
        let path = self.select.as_ref().ok_or_else(|| {
            QueryError::InvalidSelection("values() requires a select path".to_string())
        })?;

        Ok(self
            .members(self.rows(statements, None))
            .into_iter()
            .map(|statement| project(statement, path))
            .collect())
    }

    /// Matching statements partitioned by the group path
    pub fn groups<'a>(
        &self,
        statements: &'a [Statement],
    ) -> QueryResult<IndexMap<GroupKey, Vec<&'a Statement>>> {
        let grouping = self.group_by.as_ref().ok_or_else(|| {
            QueryError::InvalidAggregation("groups() requires a group path".to_string())
        })?;

        Ok(self.aggregate_groups(
            self.filtered(statements, None),
            grouping,
            |rows| self.members(rows),
            |a: &Vec<&Statement>, b: &Vec<&Statement>| a.len().cmp(&b.len()),
        ))
    }

    /// Count rows, or rows with a present field
    pub fn count(&self, statements: &[Statement], count: &Count) -> Aggregate<usize> {
        let field = count.field.as_ref();
        match &self.group_by {
            None => {
                let rows = self.rows(statements, count.matching.as_ref());
                Aggregate::Total(self.tally(rows, field))
            }
            Some(grouping) => Aggregate::Grouped(self.aggregate_groups(
                self.filtered(statements, count.matching.as_ref()),
                grouping,
                |rows| self.tally(rows, field),
                |a: &usize, b: &usize| a.cmp(b),
            )),
        }
    }

    /// Mean of the numeric values of `field`, skipping absent and null values.
    ///
    /// Zero matching statements is an error; statements that all lack the
    /// field average to `0.0`.
    pub fn average(&self, statements: &[Statement], field: &str) -> QueryResult<Aggregate<f64>> {
        if field.trim().is_empty() {
            return Err(QueryError::InvalidAggregation(
                "average requires a field".to_string(),
            ));
        }
        let path = FieldPath::parse(field);

        match &self.group_by {
            None => {
                let rows = self.members(self.rows(statements, None));
                if rows.is_empty() {
                    return Err(QueryError::EmptyAverage(field.to_string()));
                }
                Ok(Aggregate::Total(mean(&rows, &path)))
            }
            Some(grouping) => Ok(Aggregate::Grouped(self.aggregate_groups(
                self.filtered(statements, None),
                grouping,
                |rows| mean(&self.members(rows), &path),
                |a: &f64, b: &f64| a.partial_cmp(b).unwrap_or(Ordering::Equal),
            ))),
        }
    }

    fn filtered<'a>(
        &self,
        statements: &'a [Statement],
        extra: Option<&Conditions>,
    ) -> Vec<&'a Statement> {
        let extra = extra.map(|conditions| conditions.clone().resolve_verbs(self.verbs.as_ref()));

        statements
            .iter()
            .filter(|statement| {
                self.filters
                    .iter()
                    .chain(extra.iter())
                    .all(|conditions| satisfies_all(statement, conditions, self.verbs.as_ref()))
            })
            .collect()
    }

    fn sorted<'a>(&self, rows: Vec<&'a Statement>) -> Vec<&'a Statement> {
        let Some(order) = &self.order else {
            return rows;
        };
        let path = match &order.key {
            SortKey::Path(path) => path,
            SortKey::Aggregate => {
                debug!("Aggregate sort key has no effect without grouping");
                return rows;
            }
        };

        let mut keyed: Vec<(Option<FieldValue>, &Statement)> = rows
            .into_iter()
            .map(|statement| (resolve(statement, path), statement))
            .collect();
        keyed.sort_by(|a, b| order.direction.apply(compare(a.0.as_ref(), b.0.as_ref())));
        keyed.into_iter().map(|(_, statement)| statement).collect()
    }

    /// filter, sort, limit
    fn rows<'a>(&self, statements: &'a [Statement], extra: Option<&Conditions>) -> Vec<&'a Statement> {
        let mut rows = self.sorted(self.filtered(statements, extra));
        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }
        debug!(rows = rows.len(), "Rows selected");
        rows
    }

    /// Apply distinct: by projected value with a select path, by id without
    fn members<'a>(&self, rows: Vec<&'a Statement>) -> Vec<&'a Statement> {
        if !self.distinct {
            return rows;
        }
        match &self.select {
            Some(path) => {
                let mut seen = HashSet::new();
                rows.into_iter()
                    .filter(|statement| seen.insert(project(statement, path).canonical()))
                    .collect()
            }
            None => {
                let mut seen = HashSet::new();
                rows.into_iter()
                    .filter(|statement| statement.id.map_or(true, |id| seen.insert(id)))
                    .collect()
            }
        }
    }

    fn tally(&self, rows: Vec<&Statement>, field: Option<&FieldPath>) -> usize {
        let members = self.members(rows);
        let Some(field) = field else {
            return members.len();
        };

        let present = members
            .iter()
            .filter_map(|statement| resolve(statement, field))
            .filter(|value| !value.is_null());
        if self.distinct {
            present.map(|value| value.canonical()).collect::<HashSet<_>>().len()
        } else {
            present.count()
        }
    }

    fn aggregate_groups<'a, T>(
        &self,
        rows: Vec<&'a Statement>,
        grouping: &Grouping,
        aggregate: impl Fn(Vec<&'a Statement>) -> T,
        by_value: impl Fn(&T, &T) -> Ordering,
    ) -> IndexMap<GroupKey, T> {
        let mut groups: Vec<(GroupKey, Option<FieldValue>, T)> = partition(rows, grouping)
            .into_iter()
            .map(|(key, (sample, members))| (key, sample, aggregate(members)))
            .collect();

        if let Some(order) = &self.order {
            groups.sort_by(|a, b| {
                let ordering = match order.key {
                    SortKey::Aggregate => by_value(&a.2, &b.2),
                    SortKey::Path(_) => compare(a.1.as_ref(), b.1.as_ref()),
                };
                order.direction.apply(ordering)
            });
        }
        if let Some(limit) = self.limit {
            groups.truncate(limit);
        }

        debug!(groups = groups.len(), path = %grouping.path, "Groups aggregated");
        groups.into_iter().map(|(key, _, value)| (key, value)).collect()
    }
}

fn satisfies(statement: &Statement, condition: &Condition, verbs: &dyn VerbResolver) -> bool {
    match condition {
        Condition::Equals { path, expected } => matches(resolve(statement, path).as_ref(), expected),
        Condition::Verb(verb) => statement.verb.id == verbs.resolve(verb),
        Condition::Since(Some(bound)) => statement
            .timestamp
            .as_ref()
            .is_some_and(|timestamp| timestamp.instant() >= *bound),
        Condition::Since(None) => false,
    }
}

fn satisfies_all(statement: &Statement, conditions: &Conditions, verbs: &dyn VerbResolver) -> bool {
    conditions
        .iter()
        .all(|condition| satisfies(statement, condition, verbs))
}

fn project(statement: &Statement, path: &FieldPath) -> FieldValue {
    resolve(statement, path).unwrap_or(FieldValue::Null)
}

fn mean(rows: &[&Statement], path: &FieldPath) -> f64 {
    let values: Vec<f64> = rows
        .iter()
        .filter_map(|statement| resolve(statement, path))
        .filter_map(|value| value.as_f64())
        .collect();

    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn partition<'a>(rows: Vec<&'a Statement>, grouping: &Grouping) -> Buckets<'a> {
    let mut buckets: Buckets<'a> = IndexMap::new();
    for row in rows {
        let (key, sample) = group_key(resolve(row, &grouping.path), grouping.period);
        buckets
            .entry(key)
            .or_insert_with(|| (sample, Vec::new()))
            .1
            .push(row);
    }
    buckets
}

fn as_instant(value: &FieldValue) -> Option<DateTime<Utc>> {
    match value {
        FieldValue::Time(instant) => Some(*instant),
        FieldValue::Text(text) => parse_instant(text),
        _ => None,
    }
}

/// Group key plus the value groups are sorted by
fn group_key(value: Option<FieldValue>, period: Option<Period>) -> (GroupKey, Option<FieldValue>) {
    let value = match value {
        None | Some(FieldValue::Null) => return (GroupKey::Missing, None),
        Some(value) => value,
    };

    if let Some(period) = period {
        if let Some(instant) = as_instant(&value) {
            let bucket = period.bucket(&instant);
            return (GroupKey::Value(bucket.clone()), Some(FieldValue::Text(bucket)));
        }
    }

    match value.key_text() {
        Some(text) => (GroupKey::Value(text), Some(value)),
        None => (GroupKey::Missing, None),
    }
}
