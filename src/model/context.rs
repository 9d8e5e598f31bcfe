//! Statement context and attachments

use super::actor::Actor;
use super::language::{Extensions, LanguageMap};
use super::object::{Activity, StatementRef};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Circumstances under which a statement was recorded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor: Option<Actor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<Actor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_activities: Option<ContextActivities>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<StatementRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Extensions>,
}

/// Activities related to the statement's object.
///
/// A single activity on the wire is accepted and kept as a one-element list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextActivities {
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent: Option<Vec<Activity>>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Option::is_none"
    )]
    pub grouping: Option<Vec<Activity>>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<Vec<Activity>>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Option::is_none"
    )]
    pub other: Option<Vec<Activity>>,
}

impl ContextActivities {
    /// Activity list by wire name
    pub fn list(&self, kind: &str) -> Option<&[Activity]> {
        let list = match kind {
            "parent" => &self.parent,
            "grouping" => &self.grouping,
            "category" => &self.category,
            "other" => &self.other,
            _ => return None,
        };
        list.as_deref()
    }
}

fn one_or_many<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<Activity>>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<Activity>),
        One(Activity),
    }

    Ok(Option::<OneOrMany>::deserialize(deserializer)?.map(|found| match found {
        OneOrMany::Many(list) => list,
        OneOrMany::One(activity) => vec![activity],
    }))
}

/// A file attached to a statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub usage_type: String,
    pub display: LanguageMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<LanguageMap>,
    pub content_type: String,
    pub length: u64,
    pub sha2: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

impl Attachment {
    /// Display title in the requested (or default) locale
    pub fn display_text(&self, locale: Option<&str>) -> String {
        crate::locale::LocaleResolver::global().resolve(Some(&self.display), locale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_round_trip() {
        let doc = json!({
            "registration": "ec531277-b57b-4c15-8d91-d292c5b2b8f7",
            "instructor": {"objectType": "Agent", "name": "Andrew Downes", "mbox": "mailto:andrew@example.com"},
            "team": {"objectType": "Group", "name": "Team PB", "member": [{"name": "Aaron"}]},
            "contextActivities": {
                "parent": [{"id": "http://www.example.com/meetings/series/267"}],
                "category": [{"id": "http://www.example.com/meetings/categories/teammeeting",
                              "definition": {"name": {"en": "team meeting"}}}]
            },
            "revision": "r1",
            "platform": "Example virtual meeting software",
            "language": "tlh",
            "statement": {"id": "6690e6c9-3ef0-4ed3-8b37-7f3964730bee"},
            "extensions": {"http://example.com/profiles/meetings/contextextensions/topic": "Example"}
        });

        let context: Context = serde_json::from_value(doc.clone()).unwrap();
        assert!(matches!(context.team, Some(Actor::Group(_))));
        assert_eq!(serde_json::to_value(&context).unwrap(), doc);
    }

    #[test]
    fn test_single_context_activity_becomes_list() {
        let activities: ContextActivities = serde_json::from_value(json!({
            "parent": {"id": "http://example.com/course"}
        }))
        .unwrap();

        assert_eq!(activities.list("parent").map(|l| l.len()), Some(1));
        assert_eq!(
            serde_json::to_value(&activities).unwrap(),
            json!({"parent": [{"id": "http://example.com/course"}]})
        );
    }

    #[test]
    fn test_attachment_round_trip() {
        let doc = json!({
            "usageType": "http://adlnet.gov/expapi/attachments/signature",
            "display": {"en-US": "Signature"},
            "description": {"en-US": "A test signature"},
            "contentType": "application/octet-stream",
            "length": 4235,
            "sha2": "dc9589e454ff375dd5dfd6f556d2583e231e8cafe55ef40102ddd988b79f86f0",
            "fileUrl": "https://example.com/signature.bin"
        });

        let attachment: Attachment = serde_json::from_value(doc.clone()).unwrap();
        assert_eq!(attachment.display_text(Some("en-US")), "Signature");
        assert_eq!(serde_json::to_value(&attachment).unwrap(), doc);
    }
}
