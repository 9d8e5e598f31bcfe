//! Statement Query Engine
//!
//! A chainable query over xAPI statements:
//!
//! - **AST**: query directives and the builder
//! - **Path**: dotted-path access into the statement graph
//! - **Pipeline**: filter, group, sort, limit, project and aggregate
//! - **Executor**: run queries against a cached statement store
//!
//! # Directives
//!
//! ```text
//! filter(conditions)   AND across calls and within a set
//! since(instant)       timestamp >= instant
//! group(path[, period])
//! order(key, asc|desc) key is a path, or count/average for grouped results
//! limit(n)
//! select(path) / distinct()
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use xapi_lens::query::{Conditions, Count, Direction, Query, QueryExecutor};
//!
//! // Who completed the most activities?
//! let query = Query::filter(Conditions::new().verb("completed"))
//!     .verbs(Arc::new(AdlVerbs))
//!     .group("actor.name")
//!     .order("count", Direction::Desc)
//!     .limit(1)
//!     .build();
//!
//! let top = executor.count(&query, &Count::rows()).await?;
//!
//! // Weekly average score
//! let query = Query::all().group_by_period("timestamp", Period::Week).build();
//! let weekly = executor.average(&query, "result.score.scaled").await?;
//! ```

mod ast;
mod error;
mod executor;
mod path;
mod pipeline;
mod verbs;

pub use ast::{
    Condition, Conditions, Count, Direction, Grouping, IntoInstant, Order, Period, Query,
    QueryBuilder, SortKey,
};
pub use error::{QueryError, QueryResult};
pub use executor::QueryExecutor;
pub use path::{resolve, FieldPath, FieldValue};
pub use pipeline::{Aggregate, GroupKey};
pub use verbs::{AdlVerbs, IdentityVerbs, ProfileVerbs, VerbResolver};
