//! Command-line interface: drive the engine against a skills directory.
//!
//! The CLI is a host-side driver around the library; everything it does
//! goes through the same public API a host agent loop would use.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde_json::json;

use crate::config::Config;
use crate::core::record::TaskQuery;
use crate::error::Result;
use crate::matcher::TriggerMatcher;
use crate::registry::source::Deadline;
use crate::registry::{DirectorySource, LoadReport, RegistrySnapshot, SkillRegistry};
use crate::session::{DisclosureSession, SessionOutcome, SessionReport};

/// Progressive skill disclosure: rank skills against a task and load
/// what fits the context budget.
#[derive(Parser, Debug)]
#[command(name = "skilldisc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Skills directory to load
    #[arg(
        long,
        global = true,
        env = "SKILLDISC_SKILLS_DIR",
        default_value = "skills"
    )]
    pub skills: PathBuf,

    /// Output format
    #[arg(long, short = 'O', global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: ~/.config/skilldisc/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the skill catalog (metadata only)
    List,
    /// Rank skills against a task description
    Match {
        /// Task description
        query: String,
    },
    /// Run a disclosure session and print the resulting bundle
    Disclose {
        /// Task description
        query: String,
        /// Budget capacity override in size units
        #[arg(long)]
        budget: Option<u64>,
    },
    /// Load the skills directory and report malformed records
    Check,
}

pub fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let source = Arc::new(DirectorySource::new(&cli.skills));
    let deadline = Deadline::after(config.scan_timeout());
    let (registry, report) = SkillRegistry::load(source, deadline)?;
    let snapshot = registry.snapshot();

    match &cli.command {
        Commands::List => list(cli, &snapshot),
        Commands::Match { query } => rank(cli, &config, &snapshot, query),
        Commands::Disclose { query, budget } => disclose(cli, &config, snapshot, query, *budget),
        Commands::Check => check(cli, &snapshot, &report),
    }
}

fn list(cli: &Cli, snapshot: &RegistrySnapshot) -> Result<()> {
    match cli.format {
        OutputFormat::Json => {
            let skills: Vec<_> = snapshot.list().collect();
            println!("{}", serde_json::to_string_pretty(&skills)?);
        }
        OutputFormat::Human => {
            if snapshot.is_empty() {
                println!("no skills loaded");
                return Ok(());
            }
            for record in snapshot.skills() {
                println!(
                    "{}  {} {}",
                    record.id().bold(),
                    record.metadata.description,
                    format!("({} body units)", record.body_units).dimmed()
                );
            }
        }
    }
    Ok(())
}

fn rank(cli: &Cli, config: &Config, snapshot: &RegistrySnapshot, query: &str) -> Result<()> {
    let matcher = TriggerMatcher::from_config(&config.matcher);
    let scores = matcher.rank(&TaskQuery::new(query), snapshot);
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&scores)?),
        OutputFormat::Human => {
            if scores.is_empty() {
                println!("no qualifying skills");
                return Ok(());
            }
            for score in &scores {
                println!(
                    "{:>6.3}  {}  {}",
                    score.relevance,
                    score.skill_id.bold(),
                    score.matched_terms.join(", ").dimmed()
                );
            }
        }
    }
    Ok(())
}

fn disclose(
    cli: &Cli,
    config: &Config,
    snapshot: Arc<RegistrySnapshot>,
    query: &str,
    budget: Option<u64>,
) -> Result<()> {
    let mut options = config.session_options();
    if let Some(capacity) = budget {
        options.capacity = capacity;
    }
    let session = DisclosureSession::new(
        snapshot,
        TriggerMatcher::from_config(&config.matcher),
        options,
    );
    let report = session.run(&TaskQuery::new(query))?;
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Human => print_report(&report),
    }
    Ok(())
}

fn print_report(report: &SessionReport) {
    println!("{}", report.bundle.render());
    println!();
    let summary = format!(
        "{} entries, {} units committed, {} remaining",
        report.bundle.len(),
        report.bundle.total_units(),
        report.remaining_units
    );
    println!("{}", summary.dimmed());
    if let SessionOutcome::TimedOut { stage } = report.outcome {
        eprintln!("{}", format!("timed out during {stage}; bundle is partial").yellow());
    }
    for skipped in &report.skipped {
        eprintln!(
            "{}",
            format!(
                "skipped {} {} ({} units over budget)",
                skipped.tier.label(),
                skipped.skill_id,
                skipped.units
            )
            .dimmed()
        );
    }
}

fn check(cli: &Cli, snapshot: &RegistrySnapshot, report: &LoadReport) -> Result<()> {
    match cli.format {
        OutputFormat::Json => {
            let errors: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "loaded": report.loaded,
                    "rejected": errors.len(),
                    "errors": errors,
                    "fingerprint": snapshot.fingerprint(),
                }))?
            );
        }
        OutputFormat::Human => {
            println!(
                "{} skills loaded, {} rejected (snapshot {})",
                report.loaded,
                report.errors.len(),
                snapshot.fingerprint()
            );
            for error in &report.errors {
                println!("  {} {error}", "rejected:".red());
            }
        }
    }
    Ok(())
}
