//! # xapi-lens
//!
//! In-memory query and aggregation engine for xAPI learning-record
//! statements.
//!
//! ## Features
//!
//! - **Typed statements**: actors, verbs, polymorphic objects, results and
//!   context, round-tripping to the exact xAPI wire format
//! - **Chainable queries**: filtering, calendar-bucketed grouping, sorting,
//!   limiting, distinct selection, counting and averaging
//! - **Locale-aware text**: language maps resolved with regional fallbacks
//! - **Record stores**: paginated LRS fetches, merged across stores and
//!   cached until refreshed
//!
//! ## Modules
//!
//! - [`model`]: statement object model
//! - [`locale`]: language-map resolution
//! - [`query`]: query builder, pipeline and executor
//! - [`source`]: statement sources and the cached store
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use xapi_lens::query::{Count, Direction, Query, QueryExecutor};
//! use xapi_lens::source::{LrsClient, LrsConfig, StatementStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = LrsClient::new(LrsConfig {
//!         endpoint: "https://lrs.example.com/xapi".to_string(),
//!         key: Some("key".to_string()),
//!         secret: Some("secret".to_string()),
//!         ..LrsConfig::default()
//!     })?;
//!     let executor = QueryExecutor::new(Arc::new(StatementStore::new(client)));
//!
//!     // Most active learner
//!     let query = Query::group("actor.name")
//!         .order("count", Direction::Desc)
//!         .limit(1)
//!         .build();
//!     let top = executor.count(&query, &Count::rows()).await?;
//!
//!     println!("{}", serde_json::to_string(&top)?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod locale;
pub mod model;
pub mod query;
pub mod source;

// Re-export top-level types for convenience
pub use model::{Actor, LanguageMap, Statement, StatementError, StatementObject, Verb};

pub use locale::{set_default_locale, LocaleResolver};

pub use query::{
    Aggregate, Conditions, Count, Direction, FieldValue, GroupKey, Period, Query, QueryError,
    QueryExecutor,
};

pub use source::{
    LrsClient, LrsConfig, MemorySource, MultiSource, SourceError, StatementSource,
    StatementStore, StoreError,
};

pub use config::{Config, ConfigError, LocaleConfig, LoggingConfig, StoreConfig};
