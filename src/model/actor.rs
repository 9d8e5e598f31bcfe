//! Agents and groups
//!
//! An actor is a `Group` when its document carries a `member` array or says
//! `"objectType": "Group"`, and an `Agent` otherwise. Serialized actors
//! always carry `objectType`; a bare agent (a group member) carries it only
//! when its source document did.

use serde::de::{self, Deserializer};
use serde::ser::{self, SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An account on some system, used as an inverse functional identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub home_page: String,
    pub name: String,
}

/// The inverse functional identifier of an agent or identified group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ifi<'a> {
    Mbox(&'a str),
    MboxSha1Sum(&'a str),
    OpenId(&'a str),
    Account(&'a Account),
}

/// A single person or system
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// `objectType` as read from the source document
    #[serde(rename = "objectType", default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mbox: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mbox_sha1sum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<Account>,
}

impl Agent {
    /// Create an agent identified by a `mailto:` mailbox
    pub fn with_mbox(name: impl Into<String>, mbox: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            mbox: Some(mbox.into()),
            ..Default::default()
        }
    }

    /// The identifying field, checked in mbox, mbox_sha1sum, openid, account order
    pub fn ifi(&self) -> Option<Ifi<'_>> {
        ifi_of(&self.mbox, &self.mbox_sha1sum, &self.openid, &self.account)
    }
}

/// A collection of agents; anonymous when it has no identifier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub member: Vec<Agent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mbox: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mbox_sha1sum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<Account>,
}

impl Group {
    pub fn ifi(&self) -> Option<Ifi<'_>> {
        ifi_of(&self.mbox, &self.mbox_sha1sum, &self.openid, &self.account)
    }

    /// Whether this group has no identifier of its own
    pub fn is_anonymous(&self) -> bool {
        self.ifi().is_none()
    }
}

fn ifi_of<'a>(
    mbox: &'a Option<String>,
    sha1: &'a Option<String>,
    openid: &'a Option<String>,
    account: &'a Option<Account>,
) -> Option<Ifi<'a>> {
    mbox.as_deref()
        .map(Ifi::Mbox)
        .or_else(|| sha1.as_deref().map(Ifi::MboxSha1Sum))
        .or_else(|| openid.as_deref().map(Ifi::OpenId))
        .or_else(|| account.as_ref().map(Ifi::Account))
}

/// Who performed (or is referenced by) a statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Agent(Agent),
    Group(Group),
}

impl Actor {
    /// Build an actor from a raw document, choosing `Group` when a `member`
    /// array is present or the document is tagged `Group`
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let is_group = value.get("member").is_some_and(Value::is_array)
            || value.get("objectType").and_then(Value::as_str) == Some("Group");

        if is_group {
            serde_json::from_value(value).map(Actor::Group)
        } else {
            serde_json::from_value(value).map(Actor::Agent)
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Actor::Agent(agent) => agent.name.as_deref(),
            Actor::Group(group) => group.name.as_deref(),
        }
    }

    pub fn ifi(&self) -> Option<Ifi<'_>> {
        match self {
            Actor::Agent(agent) => agent.ifi(),
            Actor::Group(group) => group.ifi(),
        }
    }

    /// Wire name of this variant
    pub fn object_type(&self) -> &'static str {
        match self {
            Actor::Agent(_) => "Agent",
            Actor::Group(_) => "Group",
        }
    }
}

impl Serialize for Actor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Actor::Agent(agent) => serialize_tagged(serializer, self.object_type(), agent),
            Actor::Group(group) => serialize_tagged(serializer, self.object_type(), group),
        }
    }
}

impl<'de> Deserialize<'de> for Actor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Actor::from_value(value).map_err(de::Error::custom)
    }
}

/// Write `inner` as a map whose first entry is `objectType: object_type`,
/// replacing any `objectType` the inner value carries
pub(crate) fn serialize_tagged<S: Serializer, T: Serialize>(
    serializer: S,
    object_type: &str,
    inner: &T,
) -> Result<S::Ok, S::Error> {
    let fields = match serde_json::to_value(inner).map_err(<S::Error as ser::Error>::custom)? {
        Value::Object(fields) => fields,
        other => {
            return Err(ser::Error::custom(format!(
                "{} must serialize to an object, got {}",
                object_type, other
            )))
        }
    };

    let mut map = serializer.serialize_map(None)?;
    map.serialize_entry("objectType", object_type)?;
    for (key, value) in fields.iter().filter(|(key, _)| key.as_str() != "objectType") {
        map.serialize_entry(key, value)?;
    }
    map.end()
}

impl From<Agent> for Actor {
    fn from(agent: Agent) -> Self {
        Actor::Agent(agent)
    }
}

impl From<Group> for Actor {
    fn from(group: Group) -> Self {
        Actor::Group(group)
    }
}
