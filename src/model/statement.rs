//! Statements and verbs

use super::actor::Actor;
use super::context::{Attachment, Context};
use super::error::{StatementError, StatementResult};
use super::language::LanguageMap;
use super::object::StatementObject;
use super::result::Outcome;
use super::time::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The action of a statement, identified by IRI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verb {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<LanguageMap>,
}

impl Verb {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display: None,
        }
    }

    /// Builder method: add a display entry
    pub fn display(mut self, locale: impl Into<String>, text: impl Into<String>) -> Self {
        self.display
            .get_or_insert_with(LanguageMap::new)
            .insert(locale, text);
        self
    }

    /// Display text in the requested (or default) locale
    pub fn display_text(&self, locale: Option<&str>) -> String {
        crate::locale::LocaleResolver::global().resolve(self.display.as_ref(), locale)
    }
}

/// One xAPI statement: actor, verb, object and optional metadata.
///
/// Read-only once built. `timestamp` and `stored` keep the exact strings
/// they were parsed from, so `to_value` reproduces the source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
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
    pub stored: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<Actor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voided: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
}

impl Statement {
    /// Create a statement with only the required parts
    pub fn new(actor: impl Into<Actor>, verb: Verb, object: impl Into<StatementObject>) -> Self {
        Self {
            id: None,
            actor: actor.into(),
            verb,
            object: object.into(),
            result: None,
            context: None,
            timestamp: None,
            stored: None,
            authority: None,
            version: None,
            voided: None,
            attachments: None,
        }
    }

    /// Builder method: set the id
    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Builder method: set the timestamp
    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Builder method: set the result block
    pub fn result(mut self, result: Outcome) -> Self {
        self.result = Some(result);
        self
    }

    /// Builder method: set the context block
    pub fn context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    /// Build a statement from a raw parsed document
    pub fn from_value(value: Value) -> StatementResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Build every statement of a fetched batch, failing on the first
    /// malformed document
    pub fn parse_many(documents: Vec<Value>) -> StatementResult<Vec<Self>> {
        documents
            .into_iter()
            .enumerate()
            .map(|(index, doc)| {
                serde_json::from_value(doc).map_err(|e| StatementError::MalformedAt {
                    index,
                    message: e.to_string(),
                })
            })
            .collect()
    }

    /// Serialize back to the xAPI wire format
    pub fn to_value(&self) -> StatementResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Activity, Agent};
    use serde_json::json;

    fn full_statement() -> Value {
        json!({
            "id": "6690e6c9-3ef0-4ed3-8b37-7f3964730bee",
            "actor": {
                "objectType": "Group",
                "name": "Team PB",
                "mbox": "mailto:teampb@example.com",
                "member": [
                    {"name": "Andrew Downes", "account": {"homePage": "http://www.example.com", "name": "13936749"}},
                    {"name": "Toby Nichols", "openid": "http://toby.openid.example.org/"}
                ]
            },
            "verb": {
                "id": "http://adlnet.gov/expapi/verbs/attended",
                "display": {"en-GB": "attended", "en-US": "attended"}
            },
            "result": {
                "success": true,
                "completion": true,
                "response": "We agreed on some example actions.",
                "duration": "PT1H0M0S"
            },
            "context": {
                "registration": "ec531277-b57b-4c15-8d91-d292c5b2b8f7",
                "contextActivities": {
                    "parent": [{"id": "http://www.example.com/meetings/series/267"}]
                },
                "language": "en"
            },
            "timestamp": "2013-05-18T05:32:34.804+00:00",
            "stored": "2013-05-18T05:32:34.804Z",
            "authority": {
                "objectType": "Agent",
                "account": {"homePage": "http://cloud.scorm.com/", "name": "anonymous"}
            },
            "version": "1.0.0",
            "object": {
                "objectType": "Activity",
                "id": "http://www.example.com/meetings/occurances/34534",
                "definition": {
                    "extensions": {"http://example.com/profiles/meetings/activitydefinitionextensions/room": {"name": "Kilby"}},
                    "name": {"en-GB": "example meeting", "en-US": "example meeting"},
                    "description": {"en-GB": "An example meeting."},
                    "type": "http://adlnet.gov/expapi/activities/meeting",
                    "moreInfo": "http://virtualmeeting.example.com/345256"
                }
            },
            "attachments": [{
                "usageType": "http://adlnet.gov/expapi/attachments/signature",
                "display": {"en-US": "Signature"},
                "contentType": "application/octet-stream",
                "length": 4235,
                "sha2": "672fa5fa658017f1b72d65036f13379c6ab05d4ab3b6664908d8acf0b6a0c634"
            }]
        })
    }

    #[test]
    fn test_full_statement_round_trip() {
        let doc = full_statement();
        let statement = Statement::from_value(doc.clone()).unwrap();

        assert!(matches!(statement.actor, Actor::Group(_)));
        assert_eq!(statement.verb.id, "http://adlnet.gov/expapi/verbs/attended");
        assert_eq!(statement.to_value().unwrap(), doc);
    }

    #[test]
    fn test_nested_object_types_round_trip() {
        let cases = vec![
            // statement reference in context
            json!({
                "actor": {"objectType": "Agent", "mbox": "mailto:alice@example.com"},
                "verb": {"id": "http://adlnet.gov/expapi/verbs/commented"},
                "object": {"objectType": "Activity", "id": "http://example.com/a"},
                "context": {
                    "statement": {"objectType": "StatementRef", "id": "8f87ccde-bb56-4c2e-ab83-44982ef22df0"}
                }
            }),
            // tagged and untagged context activities side by side
            json!({
                "actor": {"objectType": "Agent", "mbox": "mailto:alice@example.com"},
                "verb": {"id": "http://adlnet.gov/expapi/verbs/completed"},
                "object": {"objectType": "Activity", "id": "http://example.com/a"},
                "context": {
                    "contextActivities": {
                        "parent": [{"objectType": "Activity", "id": "http://example.com/c"}],
                        "grouping": [{"id": "http://example.com/g"}]
                    }
                }
            }),
            // tagged group members
            json!({
                "actor": {
                    "objectType": "Group",
                    "member": [{"objectType": "Agent", "mbox": "mailto:bob@example.com"}]
                },
                "verb": {"id": "http://adlnet.gov/expapi/verbs/attended"},
                "object": {"objectType": "Activity", "id": "http://example.com/a"}
            }),
            // identified group object without members
            json!({
                "actor": {"objectType": "Agent", "mbox": "mailto:alice@example.com"},
                "verb": {"id": "http://adlnet.gov/expapi/verbs/joined"},
                "object": {"objectType": "Group", "mbox": "mailto:team@example.com"}
            }),
            // statement reference as the object
            json!({
                "actor": {"objectType": "Agent", "mbox": "mailto:alice@example.com"},
                "verb": {"id": "http://adlnet.gov/expapi/verbs/voided"},
                "object": {"objectType": "StatementRef", "id": "8f87ccde-bb56-4c2e-ab83-44982ef22df0"}
            }),
        ];

        for doc in cases {
            let statement = Statement::from_value(doc.clone()).unwrap();
            assert_eq!(statement.to_value().unwrap(), doc);
        }
    }

    #[test]
    fn test_non_canonical_timestamp_survives_round_trip() {
        let mut doc = full_statement();
        doc["timestamp"] = json!("2013-05-18T07:32:34+0200");

        let statement = Statement::from_value(doc.clone()).unwrap();
        let ts = statement.timestamp.as_ref().unwrap();
        assert_eq!(ts.as_str(), "2013-05-18T07:32:34+0200");
        assert_eq!(ts.instant().to_rfc3339(), "2013-05-18T05:32:34+00:00");
        assert_eq!(statement.to_value().unwrap()["timestamp"], doc["timestamp"]);
    }

    #[test]
    fn test_invalid_timestamp_is_hard_error() {
        let mut doc = full_statement();
        doc["timestamp"] = json!("the day before yesterday");
        let err = Statement::from_value(doc).unwrap_err();
        assert!(matches!(err, StatementError::Malformed(_)));
        assert!(err.to_string().contains("Invalid timestamp"));
    }

    #[test]
    fn test_parse_many_reports_index() {
        let good = full_statement();
        let bad = json!({"actor": {"name": "no verb"}});

        let err = Statement::parse_many(vec![good.clone(), good, bad]).unwrap_err();
        assert!(matches!(err, StatementError::MalformedAt { index: 2, .. }));
    }

    #[test]
    fn test_minimal_statement_emits_only_present_fields() {
        let statement = Statement::new(
            Agent::with_mbox("Alice", "mailto:alice@example.com"),
            Verb::new("http://adlnet.gov/expapi/verbs/completed").display("en-US", "completed"),
            Activity::new("http://example.com/course/1"),
        );

        assert_eq!(
            statement.to_value().unwrap(),
            json!({
                "actor": {"objectType": "Agent", "name": "Alice", "mbox": "mailto:alice@example.com"},
                "verb": {"id": "http://adlnet.gov/expapi/verbs/completed", "display": {"en-US": "completed"}},
                "object": {"objectType": "Activity", "id": "http://example.com/course/1"}
            })
        );
    }

    #[test]
    fn test_verb_display_text() {
        let verb = Verb::new("http://adlnet.gov/expapi/verbs/completed")
            .display("en-US", "completed")
            .display("fr-FR", "terminé");
        assert_eq!(verb.display_text(Some("fr-FR")), "terminé");
        assert_eq!(Verb::new("x").display_text(Some("en-US")), "undefined");
    }
}
