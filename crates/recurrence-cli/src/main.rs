//! `recur` CLI: validate recurrence rules, expand them, and preview calendar views
//! from a JSON snapshot of templates.
//!
//! ## Usage
//!
//! ```sh
//! # Check a rule before storing it
//! recur validate "FREQ=WEEKLY;BYDAY=MO,WE"
//!
//! # List occurrences inside a window
//! recur expand --rule "FREQ=WEEKLY;BYDAY=MO" --anchor 2024-01-01T09:00:00 \
//!     --from 2024-01-01 --to 2024-01-31T23:59:59
//!
//! # When does it happen next?
//! recur next --rule "FREQ=MONTHLY;BYDAY=3SA" --anchor 2024-01-20T10:00:00 \
//!     --after 2024-02-01T00:00:00
//!
//! # Month view for one owner, snapshot from a file, JSON to stdout
//! recur month -i templates.json --owner 1 --year 2024 --month 3
//!
//! # Limits from a TOML file, overridden by RECUR_* environment variables
//! RECUR_MONTHLY_MAX_INSTANCES=20 recur --config limits.toml month -i templates.json \
//!     --owner 1 --year 2024 --month 3
//! ```

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use recurrence_engine::{
    expand_occurrences, next_occurrence_with, CalendarAggregator, EngineConfig, InMemoryTemplates,
    OwnerId, RecurrenceRule,
};
use std::io::{self, Read};
use tracing_subscriber::EnvFilter;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Parser)]
#[command(
    name = "recur",
    version,
    about = "Recurring calendar event expansion CLI"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML file with expansion limits
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a rule against the supported grammar and print its canonical form
    Validate {
        /// Rule string, e.g. "FREQ=WEEKLY;BYDAY=MO"
        rule: String,
    },
    /// Print every occurrence of a rule inside a window, one per line
    Expand {
        #[arg(long)]
        rule: String,
        /// Template start the rule is anchored at
        #[arg(long)]
        anchor: String,
        /// Window start (inclusive)
        #[arg(long)]
        from: String,
        /// Window end (inclusive)
        #[arg(long)]
        to: String,
        /// Instance cap (defaults to the configured range cap)
        #[arg(long)]
        max: Option<usize>,
    },
    /// Print the first occurrence strictly after a point in time
    Next {
        #[arg(long)]
        rule: String,
        #[arg(long)]
        anchor: String,
        #[arg(long)]
        after: String,
    },
    /// Print one owner's month view as JSON
    Month {
        /// Snapshot file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        #[arg(long)]
        owner: i64,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Validate { rule } => {
            let parsed: RecurrenceRule = rule
                .parse()
                .with_context(|| format!("Invalid rule: '{}'", rule))?;
            println!("valid: {}", parsed);
        }
        Commands::Expand {
            rule,
            anchor,
            from,
            to,
            max,
        } => {
            let max = max.unwrap_or(config.range_max_instances);
            let expansion = expand_occurrences(
                &rule,
                parse_timestamp(&anchor)?,
                parse_timestamp(&from)?,
                parse_timestamp(&to)?,
                max,
            )
            .with_context(|| format!("Failed to expand rule: '{}'", rule))?;

            for start in &expansion.items {
                println!("{}", start.format(TIMESTAMP_FORMAT));
            }
            if expansion.truncated {
                eprintln!("warning: truncated at {} instances", max);
            }
        }
        Commands::Next {
            rule,
            anchor,
            after,
        } => {
            let next = next_occurrence_with(
                &rule,
                parse_timestamp(&anchor)?,
                parse_timestamp(&after)?,
                config.lookahead_months,
            );
            match next {
                Some(t) => println!("{}", t.format(TIMESTAMP_FORMAT)),
                None => println!("none"),
            }
        }
        Commands::Month {
            input,
            output,
            owner,
            year,
            month,
        } => {
            let json = read_input(input.as_deref())?;
            let snapshot =
                InMemoryTemplates::from_json(&json).context("Failed to parse template snapshot")?;
            let aggregator = CalendarAggregator::with_config(&snapshot, config);
            let view = aggregator
                .monthly_view(OwnerId(owner), year, month)
                .context("Failed to build month view")?;
            let pretty = serde_json::to_string_pretty(&view)?;
            write_output(output.as_deref(), &pretty)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Layer the optional TOML file under `RECUR_*` environment variables.
fn load_config(path: Option<&str>) -> Result<EngineConfig> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::new(path, config::FileFormat::Toml));
    }
    builder
        .add_source(config::Environment::with_prefix("RECUR").try_parsing(true))
        .build()
        .context("Failed to load configuration")?
        .try_deserialize()
        .context("Invalid configuration")
}

/// Accepts `2024-01-01T09:00:00`, `2024-01-01T09:00` or a bare date (midnight).
fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .or_else(|_| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").map(|d| d.and_time(Default::default()))
        })
        .with_context(|| format!("Invalid timestamp: '{}'", raw))
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
