//! xAPI Statement Model
//!
//! Typed representation of xAPI statements, built from raw JSON documents:
//!
//! - **statement**: `Statement` and `Verb`
//! - **actor**: `Agent`, `Group` and the `Actor` union
//! - **object**: `Activity`, `StatementRef`, `SubStatement` and the `StatementObject` union
//! - **result**: `Outcome` (the `result` block) and `Score`
//! - **context**: `Context`, `ContextActivities` and `Attachment`
//! - **time**: `Timestamp` (keeps its source string) and `IsoDuration`
//! - **language**: `LanguageMap` and extensions
//!
//! Wire keys follow the xAPI JSON schema exactly (`objectType`, `moreInfo`,
//! `contextActivities`, ...); field names in Rust are snake_case.
//!
//! # Example
//!
//! ```rust
//! use xapi_lens::model::Statement;
//!
//! let statement = Statement::from_value(serde_json::json!({
//!     "actor": {"name": "Alice", "mbox": "mailto:alice@example.com"},
//!     "verb": {"id": "http://adlnet.gov/expapi/verbs/completed"},
//!     "object": {"id": "http://example.com/course/1"},
//!     "timestamp": "2025-01-01T08:00:00Z"
//! }))
//! .unwrap();
//!
//! assert_eq!(statement.actor.name(), Some("Alice"));
//! ```

mod actor;
mod context;
mod error;
mod language;
mod object;
mod result;
mod statement;
mod time;

pub use actor::{Account, Actor, Agent, Group, Ifi};
pub use context::{Attachment, Context, ContextActivities};
pub use error::{StatementError, StatementResult};
pub use language::{Extensions, LanguageMap};
pub use object::{
    Activity, ActivityDefinition, InteractionComponent, InteractionType, StatementObject,
    StatementRef, SubStatement,
};
pub use result::{Outcome, Score};
pub use statement::{Statement, Verb};
pub use time::{parse_instant, IsoDuration, Timestamp};
