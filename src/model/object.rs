//! Statement objects
//!
//! The `object` of a statement is one of five shapes, selected by the
//! `objectType` field:
//!
//! ```text
//! "Agent" | "Group"  → Agent or Group (by tag or `member` array)
//! "StatementRef"     → StatementRef
//! "SubStatement"     → SubStatement (no id/authority/stored allowed)
//! anything else      → Activity
//! ```
//!
//! The object itself is always written with its `objectType`. Activities
//! nested elsewhere (context activities) write it back only when their
//! source document had one; a statement reference always carries it.

use super::actor::{serialize_tagged, Actor, Agent, Group};
use super::context::{Attachment, Context};
use super::language::{Extensions, LanguageMap};
use super::result::Outcome;
use super::statement::Verb;
use super::time::Timestamp;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A learning activity, identified by IRI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// `objectType` as read from the source document
    #[serde(rename = "objectType", default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<ActivityDefinition>,
}

impl Activity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            object_type: None,
            id: id.into(),
            definition: None,
        }
    }

    /// Builder method: attach a definition
    pub fn definition(mut self, definition: ActivityDefinition) -> Self {
        self.definition = Some(definition);
        self
    }
}

/// Kinds of interaction an activity definition can describe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InteractionType {
    TrueFalse,
    Choice,
    FillIn,
    LongFillIn,
    Matching,
    Performance,
    Sequencing,
    Likert,
    Numeric,
    Other,
}

impl InteractionType {
    /// Component arrays that belong to this interaction type
    pub fn component_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Choice | Self::Sequencing => &["choices"],
            Self::Likert => &["scale"],
            Self::Matching => &["source", "target"],
            Self::Performance => &["steps"],
            _ => &[],
        }
    }

    /// Wire name, e.g. `long-fill-in`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TrueFalse => "true-false",
            Self::Choice => "choice",
            Self::FillIn => "fill-in",
            Self::LongFillIn => "long-fill-in",
            Self::Matching => "matching",
            Self::Performance => "performance",
            Self::Sequencing => "sequencing",
            Self::Likert => "likert",
            Self::Numeric => "numeric",
            Self::Other => "other",
        }
    }
}

/// One option of an interaction (a choice, a likert point, a step...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionComponent {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<LanguageMap>,
}

/// Metadata describing an activity
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDefinition {
    #[serde(default)]
    pub name: Option<LanguageMap>,
    #[serde(default)]
    pub description: Option<LanguageMap>,
    #[serde(default, rename = "type")]
    pub activity_type: Option<String>,
    #[serde(default)]
    pub more_info: Option<String>,
    #[serde(default)]
    pub interaction_type: Option<InteractionType>,
    #[serde(default)]
    pub correct_responses_pattern: Option<Vec<String>>,
    #[serde(default)]
    pub choices: Option<Vec<InteractionComponent>>,
    #[serde(default)]
    pub scale: Option<Vec<InteractionComponent>>,
    #[serde(default)]
    pub source: Option<Vec<InteractionComponent>>,
    #[serde(default)]
    pub target: Option<Vec<InteractionComponent>>,
    #[serde(default)]
    pub steps: Option<Vec<InteractionComponent>>,
    #[serde(default)]
    pub extensions: Option<Extensions>,
}

impl ActivityDefinition {
    /// Display name in the requested (or default) locale
    pub fn name_text(&self, locale: Option<&str>) -> String {
        crate::locale::LocaleResolver::global().resolve(self.name.as_ref(), locale)
    }

    /// Description in the requested (or default) locale
    pub fn description_text(&self, locale: Option<&str>) -> String {
        crate::locale::LocaleResolver::global().resolve(self.description.as_ref(), locale)
    }

    /// Component list by wire name, if populated
    pub fn components(&self, field: &str) -> Option<&[InteractionComponent]> {
        let list = match field {
            "choices" => &self.choices,
            "scale" => &self.scale,
            "source" => &self.source,
            "target" => &self.target,
            "steps" => &self.steps,
            _ => return None,
        };
        list.as_deref()
    }
}

impl Serialize for ActivityDefinition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;

        if let Some(name) = &self.name {
            map.serialize_entry("name", name)?;
        }
        if let Some(description) = &self.description {
            map.serialize_entry("description", description)?;
        }
        if let Some(activity_type) = &self.activity_type {
            map.serialize_entry("type", activity_type)?;
        }
        if let Some(more_info) = &self.more_info {
            map.serialize_entry("moreInfo", more_info)?;
        }
        if let Some(interaction_type) = &self.interaction_type {
            map.serialize_entry("interactionType", interaction_type)?;
        }
        if let Some(pattern) = &self.correct_responses_pattern {
            map.serialize_entry("correctResponsesPattern", pattern)?;
        }

        // Only the arrays that match the interaction type go on the wire
        let fields = self
            .interaction_type
            .map(|kind| kind.component_fields())
            .unwrap_or(&[]);
        for field in fields {
            if let Some(list) = self.components(field) {
                map.serialize_entry(field, list)?;
            }
        }

        if let Some(extensions) = &self.extensions {
            map.serialize_entry("extensions", extensions)?;
        }
        map.end()
    }
}

/// A pointer to another statement
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatementRef {
    pub id: Uuid,
}

impl StatementRef {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}

impl Serialize for StatementRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("objectType", "StatementRef")?;
        map.serialize_entry("id", &self.id)?;
        map.end()
    }
}

/// A statement nested as the object of another statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubStatement {
    pub actor: Actor,
    pub verb: Verb,
    pub object: StatementObject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Outcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
}

const SUB_STATEMENT_FORBIDDEN: [&str; 3] = ["id", "authority", "stored"];

/// The object of a statement
#[derive(Debug, Clone, PartialEq)]
pub enum StatementObject {
    Activity(Activity),
    Agent(Agent),
    Group(Group),
    StatementRef(StatementRef),
    SubStatement(Box<SubStatement>),
}

impl StatementObject {
    /// Build an object from a raw document by its `objectType`
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let kind = value
            .get("objectType")
            .and_then(Value::as_str)
            .unwrap_or("Activity");

        match kind {
            "Agent" | "Group" => Ok(match Actor::from_value(value)? {
                Actor::Agent(agent) => StatementObject::Agent(agent),
                Actor::Group(group) => StatementObject::Group(group),
            }),
            "StatementRef" => serde_json::from_value(value).map(StatementObject::StatementRef),
            "SubStatement" => {
                if let Some(field) = SUB_STATEMENT_FORBIDDEN
                    .iter()
                    .find(|field| value.get(**field).is_some())
                {
                    return Err(de::Error::custom(format!(
                        "sub-statement must not contain `{}`",
                        field
                    )));
                }
                serde_json::from_value(value)
                    .map(|sub| StatementObject::SubStatement(Box::new(sub)))
            }
            _ => serde_json::from_value(value).map(StatementObject::Activity),
        }
    }

    /// Wire name of this variant
    pub fn object_type(&self) -> &'static str {
        match self {
            Self::Activity(_) => "Activity",
            Self::Agent(_) => "Agent",
            Self::Group(_) => "Group",
            Self::StatementRef(_) => "StatementRef",
            Self::SubStatement(_) => "SubStatement",
        }
    }

    pub fn as_activity(&self) -> Option<&Activity> {
        match self {
            Self::Activity(activity) => Some(activity),
            _ => None,
        }
    }
}

impl Serialize for StatementObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let object_type = self.object_type();
        match self {
            Self::Activity(activity) => serialize_tagged(serializer, object_type, activity),
            Self::Agent(agent) => serialize_tagged(serializer, object_type, agent),
            Self::Group(group) => serialize_tagged(serializer, object_type, group),
            Self::StatementRef(reference) => reference.serialize(serializer),
            Self::SubStatement(sub) => serialize_tagged(serializer, object_type, sub.as_ref()),
        }
    }
}

impl<'de> Deserialize<'de> for StatementObject {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        StatementObject::from_value(value).map_err(de::Error::custom)
    }
}

impl From<Activity> for StatementObject {
    fn from(activity: Activity) -> Self {
        StatementObject::Activity(activity)
    }
}
