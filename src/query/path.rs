//! Dotted-path field access
//!
//! A path like `object.definition.name` is resolved by walking the statement
//! graph one segment at a time through an explicit accessor table per entity.
//! A missing segment yields `None` (absent), which is distinct from a JSON
//! `null` stored inside extensions (`Some(FieldValue::Null)`).
//!
//! # Path syntax
//!
//! ```text
//! actor.name
//! context.contextActivities.parent.0.id       camelCase or snake_case, list index
//! result.extensions[http://example.com/ext]   bracketed segment may contain dots
//! ```

use crate::locale::LocaleResolver;
use crate::model::*;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Number, Value};
use std::borrow::Cow;
use std::cmp::Ordering;

/// A parsed dotted path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dotted path; empty segments are ignored
    pub fn parse(path: &str) -> Self {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = path.chars();

        while let Some(c) = chars.next() {
            match c {
                '.' => {
                    if !current.is_empty() {
                        segments.push(std::mem::take(&mut current));
                    }
                }
                '[' => {
                    if !current.is_empty() {
                        segments.push(std::mem::take(&mut current));
                    }
                    let literal: String = chars.by_ref().take_while(|&c| c != ']').collect();
                    segments.push(literal);
                }
                _ => current.push(c),
            }
        }
        if !current.is_empty() {
            segments.push(current);
        }

        Self {
            raw: path.to_string(),
            segments,
        }
    }

    /// The path as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        FieldPath::parse(path)
    }
}

impl From<String> for FieldPath {
    fn from(path: String) -> Self {
        FieldPath::parse(&path)
    }
}

impl From<&FieldPath> for FieldPath {
    fn from(path: &FieldPath) -> Self {
        path.clone()
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A value found at the end of a path, or given as a filter operand
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Time(DateTime<Utc>),
    Duration(IsoDuration),
    Texts(LanguageMap),
    /// Composite nodes and raw extension objects/arrays
    Json(Value),
}

impl FieldValue {
    /// Convert a raw JSON value, keeping scalars typed
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(FieldValue::Json(value.clone()), FieldValue::Number),
            Value::String(s) => FieldValue::Text(s.clone()),
            other => FieldValue::Json(other.clone()),
        }
    }

    /// JSON form, as printed by the CLI
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Time(t) => Value::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            FieldValue::Duration(d) => Value::String(d.as_str().to_string()),
            FieldValue::Texts(map) => serde_json::to_value(map).unwrap_or(Value::Null),
            FieldValue::Json(v) => v.clone(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Numeric reading: numbers, numeric strings, and durations in seconds
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse().ok(),
            FieldValue::Duration(d) => d.as_seconds(),
            _ => None,
        }
    }

    /// Text used as a group key; `None` for null
    pub fn key_text(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Number(n) => Some(n.to_string()),
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Time(t) => Some(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            FieldValue::Duration(d) => Some(d.as_str().to_string()),
            FieldValue::Texts(map) => Some(LocaleResolver::global().resolve(Some(map), None)),
            FieldValue::Json(v) => Some(v.to_string()),
        }
    }

    /// Identity used for distinct-selection
    pub(crate) fn canonical(&self) -> String {
        let tag = match self {
            FieldValue::Time(_) => "t:",
            FieldValue::Duration(_) => "d:",
            FieldValue::Texts(_) => "m:",
            _ => "",
        };
        format!("{}{}", tag, self.to_json())
    }

    fn rank(&self) -> u8 {
        match self {
            FieldValue::Null => 1,
            FieldValue::Bool(_) => 2,
            FieldValue::Number(_) | FieldValue::Duration(_) => 3,
            FieldValue::Time(_) => 4,
            FieldValue::Text(_) | FieldValue::Texts(_) => 5,
            FieldValue::Json(_) => 6,
        }
    }

    fn loosely_equals(&self, expected: &FieldValue) -> bool {
        match (self, expected) {
            (FieldValue::Number(a), FieldValue::Number(b)) => (a - b).abs() < f64::EPSILON,
            (FieldValue::Time(a), FieldValue::Text(b)) => parse_instant(b).is_some_and(|b| *a == b),
            (FieldValue::Duration(a), FieldValue::Text(b)) => a.as_str() == b,
            (FieldValue::Duration(a), FieldValue::Number(b)) => {
                a.as_seconds().is_some_and(|s| (s - b).abs() < f64::EPSILON)
            }
            (FieldValue::Texts(map), FieldValue::Text(b)) => map.contains_text(b),
            (FieldValue::Json(a), b) => *a == b.to_json(),
            (a, b) => a == b,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n as f64)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        FieldValue::Number(n as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(t: DateTime<Utc>) -> Self {
        FieldValue::Time(t)
    }
}

impl From<LanguageMap> for FieldValue {
    fn from(map: LanguageMap) -> Self {
        FieldValue::Texts(map)
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::from_json(&value)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Whether a resolved value satisfies an expected one.
///
/// An expected `Null` matches absent and null values; anything else never
/// matches an absent value.
pub(crate) fn matches(actual: Option<&FieldValue>, expected: &FieldValue) -> bool {
    match (actual, expected) {
        (None, FieldValue::Null) | (Some(FieldValue::Null), FieldValue::Null) => true,
        (None, _) | (Some(FieldValue::Null), _) => false,
        (Some(actual), expected) => actual.loosely_equals(expected),
    }
}

/// Total order used for sorting: absent < null < bool < number < time < text < json
pub(crate) fn compare(a: Option<&FieldValue>, b: Option<&FieldValue>) -> Ordering {
    let (a, b) = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Less,
        (Some(_), None) => return Ordering::Greater,
        (Some(a), Some(b)) => (a, b),
    };

    match a.rank().cmp(&b.rank()) {
        Ordering::Equal => {}
        unequal => return unequal,
    }

    match (a, b) {
        (FieldValue::Bool(x), FieldValue::Bool(y)) => x.cmp(y),
        (FieldValue::Time(x), FieldValue::Time(y)) => x.cmp(y),
        (FieldValue::Json(x), FieldValue::Json(y)) => x.to_string().cmp(&y.to_string()),
        _ if a.rank() == 3 => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        _ => a.key_text().cmp(&b.key_text()),
    }
}

/// Resolve `path` against a statement
pub fn resolve(statement: &Statement, path: &FieldPath) -> Option<FieldValue> {
    let mut node = Node::Statement(statement);
    for segment in path.segments() {
        node = node.child(segment)?;
    }
    Some(node.into_value())
}

enum Node<'a> {
    Statement(&'a Statement),
    SubStatement(&'a SubStatement),
    Actor(&'a Actor),
    Agent(&'a Agent),
    Group(&'a Group),
    Account(&'a Account),
    Verb(&'a Verb),
    Object(&'a StatementObject),
    Activity(&'a Activity),
    Definition(&'a ActivityDefinition),
    Component(&'a InteractionComponent),
    StatementRef(&'a StatementRef),
    Outcome(&'a Outcome),
    Score(&'a Score),
    Context(&'a Context),
    ContextActivities(&'a ContextActivities),
    Attachment(&'a Attachment),
    Activities(&'a [Activity]),
    Agents(&'a [Agent]),
    Attachments(&'a [Attachment]),
    Components(&'a [InteractionComponent]),
    Extensions(&'a Extensions),
    Texts(&'a LanguageMap),
    Json(&'a Value),
    Leaf(FieldValue),
}

fn leaf<'a>(value: FieldValue) -> Node<'a> {
    Node::Leaf(value)
}

fn text(field: &Option<String>) -> Option<Node<'static>> {
    field.as_ref().map(|s| leaf(FieldValue::Text(s.clone())))
}

fn number(field: Option<f64>) -> Option<Node<'static>> {
    field.map(|n| leaf(FieldValue::Number(n)))
}

fn flag(field: Option<bool>) -> Option<Node<'static>> {
    field.map(|b| leaf(FieldValue::Bool(b)))
}

fn time(field: &Option<Timestamp>) -> Option<Node<'static>> {
    field.as_ref().map(|t| leaf(FieldValue::Time(t.instant())))
}

fn json_of<T: Serialize>(entity: &T) -> FieldValue {
    FieldValue::Json(serde_json::to_value(entity).unwrap_or(Value::Null))
}

/// `contextActivities` → `context_activities`
fn snake_case(segment: &str) -> Cow<'_, str> {
    if !segment.chars().any(|c| c.is_ascii_uppercase()) {
        return Cow::Borrowed(segment);
    }
    let mut out = String::with_capacity(segment.len() + 4);
    for c in segment.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

fn index<'a, T>(list: &'a [T], segment: &str) -> Option<&'a T> {
    segment.parse::<usize>().ok().and_then(|i| list.get(i))
}

impl<'a> Node<'a> {
    fn child(self, segment: &str) -> Option<Node<'a>> {
        let name = snake_case(segment);
        let name = name.as_ref();

        match self {
            Node::Statement(s) => match name {
                "id" => s.id.map(|id| leaf(FieldValue::Text(id.to_string()))),
                "actor" => Some(Node::Actor(&s.actor)),
                "verb" => Some(Node::Verb(&s.verb)),
                "object" => Some(Node::Object(&s.object)),
                "result" => s.result.as_ref().map(Node::Outcome),
                "context" => s.context.as_ref().map(Node::Context),
                "timestamp" => time(&s.timestamp),
                "stored" => time(&s.stored),
                "authority" => s.authority.as_ref().map(Node::Actor),
                "version" => text(&s.version),
                "voided" => flag(s.voided),
                "attachments" => s.attachments.as_deref().map(Node::Attachments),
                _ => None,
            },
            Node::SubStatement(s) => match name {
                "actor" => Some(Node::Actor(&s.actor)),
                "verb" => Some(Node::Verb(&s.verb)),
                "object" => Some(Node::Object(&s.object)),
                "result" => s.result.as_ref().map(Node::Outcome),
                "context" => s.context.as_ref().map(Node::Context),
                "timestamp" => time(&s.timestamp),
                "attachments" => s.attachments.as_deref().map(Node::Attachments),
                "object_type" => Some(leaf(FieldValue::Text("SubStatement".into()))),
                _ => None,
            },
            Node::Actor(actor) => match (name, actor) {
                ("object_type", _) => Some(leaf(FieldValue::Text(actor.object_type().into()))),
                (_, Actor::Agent(agent)) => Node::Agent(agent).child(name),
                (_, Actor::Group(group)) => Node::Group(group).child(name),
            },
            Node::Agent(agent) => match name {
                "name" => text(&agent.name),
                "mbox" => text(&agent.mbox),
                "mbox_sha1sum" => text(&agent.mbox_sha1sum),
                "openid" => text(&agent.openid),
                "account" => agent.account.as_ref().map(Node::Account),
                "object_type" => Some(leaf(FieldValue::Text("Agent".into()))),
                _ => None,
            },
            Node::Group(group) => match name {
                "name" => text(&group.name),
                "member" => Some(Node::Agents(&group.member)),
                "mbox" => text(&group.mbox),
                "mbox_sha1sum" => text(&group.mbox_sha1sum),
                "openid" => text(&group.openid),
                "account" => group.account.as_ref().map(Node::Account),
                "object_type" => Some(leaf(FieldValue::Text("Group".into()))),
                _ => None,
            },
            Node::Account(account) => match name {
                "home_page" => Some(leaf(FieldValue::Text(account.home_page.clone()))),
                "name" => Some(leaf(FieldValue::Text(account.name.clone()))),
                _ => None,
            },
            Node::Verb(verb) => match name {
                "id" => Some(leaf(FieldValue::Text(verb.id.clone()))),
                "display" => verb.display.as_ref().map(Node::Texts),
                _ => None,
            },
            Node::Object(object) => match (name, object) {
                ("object_type", _) => Some(leaf(FieldValue::Text(object.object_type().into()))),
                (_, StatementObject::Activity(activity)) => Node::Activity(activity).child(name),
                (_, StatementObject::Agent(agent)) => Node::Agent(agent).child(name),
                (_, StatementObject::Group(group)) => Node::Group(group).child(name),
                (_, StatementObject::StatementRef(r)) => Node::StatementRef(r).child(name),
                (_, StatementObject::SubStatement(sub)) => Node::SubStatement(sub).child(name),
            },
            Node::Activity(activity) => match name {
                "id" => Some(leaf(FieldValue::Text(activity.id.clone()))),
                "definition" => activity.definition.as_ref().map(Node::Definition),
                "object_type" => Some(leaf(FieldValue::Text("Activity".into()))),
                _ => None,
            },
            Node::Definition(def) => match name {
                "name" => def.name.as_ref().map(Node::Texts),
                "description" => def.description.as_ref().map(Node::Texts),
                "type" => text(&def.activity_type),
                "more_info" => text(&def.more_info),
                "interaction_type" => def
                    .interaction_type
                    .map(|kind| leaf(FieldValue::Text(kind.as_str().into()))),
                "correct_responses_pattern" => def
                    .correct_responses_pattern
                    .as_ref()
                    .map(|pattern| leaf(json_of(pattern))),
                "extensions" => def.extensions.as_ref().map(Node::Extensions),
                other => def.components(other).map(Node::Components),
            },
            Node::Component(component) => match name {
                "id" => Some(leaf(FieldValue::Text(component.id.clone()))),
                "description" => component.description.as_ref().map(Node::Texts),
                _ => None,
            },
            Node::StatementRef(r) => match name {
                "id" => Some(leaf(FieldValue::Text(r.id.to_string()))),
                "object_type" => Some(leaf(FieldValue::Text("StatementRef".into()))),
                _ => None,
            },
            Node::Outcome(outcome) => match name {
                "score" => outcome.score.as_ref().map(Node::Score),
                "success" => flag(outcome.success),
                "completion" => flag(outcome.completion),
                "response" => text(&outcome.response),
                "duration" => outcome
                    .duration
                    .as_ref()
                    .map(|d| leaf(FieldValue::Duration(d.clone()))),
                "extensions" => outcome.extensions.as_ref().map(Node::Extensions),
                _ => None,
            },
            Node::Score(score) => match name {
                "scaled" => number(score.scaled.as_ref().and_then(Number::as_f64)),
                "raw" => number(score.raw.as_ref().and_then(Number::as_f64)),
                "min" => number(score.min.as_ref().and_then(Number::as_f64)),
                "max" => number(score.max.as_ref().and_then(Number::as_f64)),
                _ => None,
            },
            Node::Context(context) => match name {
                "registration" => context
                    .registration
                    .map(|id| leaf(FieldValue::Text(id.to_string()))),
                "instructor" => context.instructor.as_ref().map(Node::Actor),
                "team" => context.team.as_ref().map(Node::Actor),
                "context_activities" => context.context_activities.as_ref().map(Node::ContextActivities),
                "revision" => text(&context.revision),
                "platform" => text(&context.platform),
                "language" => text(&context.language),
                "statement" => context.statement.as_ref().map(Node::StatementRef),
                "extensions" => context.extensions.as_ref().map(Node::Extensions),
                _ => None,
            },
            Node::ContextActivities(activities) => activities.list(name).map(Node::Activities),
            Node::Attachment(attachment) => match name {
                "usage_type" => Some(leaf(FieldValue::Text(attachment.usage_type.clone()))),
                "display" => Some(Node::Texts(&attachment.display)),
                "description" => attachment.description.as_ref().map(Node::Texts),
                "content_type" => Some(leaf(FieldValue::Text(attachment.content_type.clone()))),
                "length" => Some(leaf(FieldValue::Number(attachment.length as f64))),
                "sha2" => Some(leaf(FieldValue::Text(attachment.sha2.clone()))),
                "file_url" => text(&attachment.file_url),
                _ => None,
            },
            Node::Activities(list) => index(list, segment).map(Node::Activity),
            Node::Agents(list) => index(list, segment).map(Node::Agent),
            Node::Attachments(list) => index(list, segment).map(Node::Attachment),
            Node::Components(list) => index(list, segment).map(Node::Component),
            // Extension keys, locale tags and raw JSON keys are taken verbatim
            Node::Extensions(extensions) => extensions.get(segment).map(Node::Json),
            Node::Texts(map) => map.get(segment).map(|s| leaf(FieldValue::Text(s.to_string()))),
            Node::Json(value) => match value {
                Value::Object(object) => object.get(segment).map(Node::Json),
                Value::Array(list) => index(list, segment).map(Node::Json),
                _ => None,
            },
            Node::Leaf(_) => None,
        }
    }

    fn into_value(self) -> FieldValue {
        match self {
            Node::Leaf(value) => value,
            Node::Texts(map) => FieldValue::Texts(map.clone()),
            Node::Json(value) => FieldValue::from_json(value),
            Node::Statement(s) => json_of(s),
            Node::SubStatement(s) => json_of(s),
            Node::Actor(a) => json_of(a),
            Node::Agent(a) => json_of(a),
            Node::Group(g) => json_of(g),
            Node::Account(a) => json_of(a),
            Node::Verb(v) => json_of(v),
            Node::Object(o) => json_of(o),
            Node::Activity(a) => json_of(a),
            Node::Definition(d) => json_of(d),
            Node::Component(c) => json_of(c),
            Node::StatementRef(r) => json_of(r),
            Node::Outcome(o) => json_of(o),
            Node::Score(s) => json_of(s),
            Node::Context(c) => json_of(c),
            Node::ContextActivities(c) => json_of(c),
            Node::Attachment(a) => json_of(a),
            Node::Activities(list) => json_of(&list),
            Node::Agents(list) => json_of(&list),
            Node::Attachments(list) => json_of(&list),
            Node::Components(list) => json_of(&list),
            Node::Extensions(e) => json_of(e),
        }
    }
}
