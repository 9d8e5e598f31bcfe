//! xapi-lens CLI
//!
//! Command-line interface for querying xAPI statements:
//! - List matching statements or selected values
//! - Count and average, optionally grouped
//! - Resolve display texts for a locale
//! - Print a default config file

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use xapi_lens::config::{generate_default_config, Config, LoggingConfig};
use xapi_lens::locale::set_default_locale;
use xapi_lens::query::{
    AdlVerbs, Conditions, Count, Direction, FieldValue, Period, Query, QueryBuilder,
    QueryExecutor,
};
use xapi_lens::source::{self, MemorySource, StatementStore};

#[derive(Parser)]
#[command(name = "xapi-lens")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query and aggregate xAPI learning-record statements")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Read statements from a local JSON dump instead of the configured stores
    #[arg(long, global = true)]
    pub file: Option<PathBuf>,

    /// Config file (default: standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Locale for display texts (e.g. en-US)
    #[arg(long, global = true)]
    pub locale: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct QueryArgs {
    /// Conditions in path=value format, all of which must hold
    #[arg(short = 'w', long = "where")]
    pub filters: Vec<String>,

    /// Verb IRI or ADL shorthand (e.g. completed)
    #[arg(long)]
    pub verb: Option<String>,

    /// Only statements with a timestamp at or after this instant
    #[arg(long)]
    pub since: Option<String>,

    /// Sort key: a path, or count/average for grouped results
    #[arg(long)]
    pub order: Option<String>,

    /// Sort descending
    #[arg(long)]
    pub desc: bool,

    /// Maximum number of rows (or groups)
    #[arg(short, long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug, Default)]
pub struct GroupArgs {
    /// Group by the value at this path
    #[arg(short, long)]
    pub group: Option<String>,

    /// Calendar bucket for time values (day, week, month)
    #[arg(short, long)]
    pub period: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List matching statements, or the selected value of each
    List {
        #[command(flatten)]
        query: QueryArgs,
        /// Path to project each statement to
        #[arg(long)]
        select: Option<String>,
        /// Drop repeated values (or repeated statement ids)
        #[arg(long)]
        distinct: bool,
    },

    /// Count matching statements
    Count {
        /// Count only statements where this path is present
        field: Option<String>,
        #[command(flatten)]
        query: QueryArgs,
        #[command(flatten)]
        group: GroupArgs,
        /// Path to project each statement to before counting
        #[arg(long)]
        select: Option<String>,
        /// Count distinct values
        #[arg(long)]
        distinct: bool,
    },

    /// Average a numeric field
    Average {
        /// Path of the field to average
        field: String,
        #[command(flatten)]
        query: QueryArgs,
        #[command(flatten)]
        group: GroupArgs,
    },

    /// Print the display text at a path for each matching statement
    Text {
        /// Path of a language map (e.g. object.definition.name)
        path: String,
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        let content = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, content)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("Config written to {}", path.display());
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging);

    if let Some(locale) = cli.locale.as_ref().or(config.locale.default.as_ref()) {
        set_default_locale(locale.clone());
    }

    let store = match &cli.file {
        Some(path) => StatementStore::new(MemorySource::from_json_file(path)?),
        None => StatementStore::from_boxed(
            source::from_config(&config.stores)
                .context("configure a [[stores]] entry or pass --file")?,
        ),
    };
    let executor = QueryExecutor::new(Arc::new(store));

    match cli.command {
        Commands::List {
            query,
            select,
            distinct,
        } => {
            let mut builder = query_builder(&query)?;
            if distinct {
                builder = builder.distinct();
            }
            match select {
                Some(path) => {
                    let values = executor.values(&builder.select(path).build()).await?;
                    print_json(&values)?;
                }
                None => {
                    let statements = executor.statements(&builder.build()).await?;
                    let documents = statements
                        .iter()
                        .map(|statement| statement.to_value())
                        .collect::<Result<Vec<Value>, _>>()?;
                    print_json(&documents)?;
                }
            }
        }

        Commands::Count {
            field,
            query,
            group,
            select,
            distinct,
        } => {
            let mut builder = grouped(query_builder(&query)?, &group)?;
            if let Some(path) = select {
                builder = builder.select(path);
            }
            if distinct {
                builder = builder.distinct();
            }
            let count = match field {
                Some(field) => Count::field(field),
                None => Count::rows(),
            };
            print_json(&executor.count(&builder.build(), &count).await?)?;
        }

        Commands::Average {
            field,
            query,
            group,
        } => {
            let builder = grouped(query_builder(&query)?, &group)?;
            print_json(&executor.average(&builder.build(), &field).await?)?;
        }

        Commands::Text { path, query } => {
            let query = query_builder(&query)?.build();
            for text in executor.texts(&query, &path, cli.locale.as_deref()).await? {
                println!("{}", text);
            }
        }

        Commands::Config { .. } => unreachable!("handled before loading config"),
    }

    Ok(())
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("xapi_lens={}", config.level)));
    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn query_builder(args: &QueryArgs) -> anyhow::Result<QueryBuilder> {
    let mut builder = Query::all().verbs(Arc::new(AdlVerbs));

    let mut conditions = Conditions::new();
    for raw in &args.filters {
        let (path, value) = parse_condition(raw)?;
        conditions = conditions.eq(path, value);
    }
    if let Some(verb) = &args.verb {
        conditions = conditions.verb(verb.as_str());
    }
    if !conditions.is_empty() {
        builder = builder.filter(conditions);
    }

    if let Some(since) = &args.since {
        builder = builder.since(since.as_str());
    }
    if let Some(order) = &args.order {
        let direction = if args.desc {
            Direction::Desc
        } else {
            Direction::Asc
        };
        builder = builder.order(order.as_str(), direction);
    }
    if let Some(limit) = args.limit {
        builder = builder.limit(limit);
    }

    Ok(builder)
}

fn grouped(builder: QueryBuilder, args: &GroupArgs) -> anyhow::Result<QueryBuilder> {
    match (&args.group, &args.period) {
        (Some(path), Some(period)) => {
            Ok(builder.group_by_period(path.as_str(), Period::parse(period)?))
        }
        (Some(path), None) => Ok(builder.group(path.as_str())),
        (None, Some(_)) => bail!("--period requires --group"),
        (None, None) => Ok(builder),
    }
}

/// `path=value`; JSON scalars keep their type, anything else is text
fn parse_condition(raw: &str) -> anyhow::Result<(String, FieldValue)> {
    let Some((path, value)) = raw.split_once('=') else {
        bail!("invalid condition {:?}, expected path=value", raw);
    };

    let value = match serde_json::from_str::<Value>(value) {
        Ok(json @ (Value::Number(_) | Value::Bool(_) | Value::Null | Value::String(_))) => {
            FieldValue::from_json(&json)
        }
        _ => FieldValue::Text(value.to_string()),
    };
    Ok((path.trim().to_string(), value))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
