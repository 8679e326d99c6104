//! Command-line interface

mod run;

use crate::config::Config;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "signal-guardian", about = "Trading signal decision core", version)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the decision loop against a readings capture
    Run {
        /// JSONL file of captured signal readings to replay
        #[arg(long)]
        readings: PathBuf,

        /// Optional JSONL file of settled trade outcomes to replay
        #[arg(long)]
        outcomes: Option<PathBuf>,

        /// Audit log destination
        #[arg(long, default_value = "audit.jsonl")]
        audit_log: PathBuf,

        /// Instrument the replayed readings refer to
        #[arg(long, default_value = "NQ")]
        instrument: String,

        /// Fixed entry price for the replay session
        #[arg(long, default_value = "100")]
        entry: Decimal,

        /// Fixed ATR distance for the replay session
        #[arg(long, default_value = "2")]
        atr: Decimal,
    },

    /// Summarize an audit log
    Status {
        /// Audit log to read
        #[arg(long, default_value = "audit.jsonl")]
        audit_log: PathBuf,
    },

    /// Validate the configuration and print the effective values
    Config,
}

pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(&cli.config)?;

    match cli.command {
        Command::Run {
            readings,
            outcomes,
            audit_log,
            instrument,
            entry,
            atr,
        } => {
            run::run(
                config,
                run::RunArgs {
                    readings,
                    outcomes,
                    audit_log,
                    instrument,
                    entry,
                    atr,
                },
            )
            .await
        }
        Command::Status { audit_log } => status(&audit_log),
        Command::Config => {
            println!("{config:#?}");
            Ok(())
        }
    }
}

/// Print event counts and the most recent decision from an audit log
fn status(audit_log: &PathBuf) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(audit_log)?;
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    let mut last_decision: Option<serde_json::Value> = None;

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let value: serde_json::Value = serde_json::from_str(line)?;
        let kind = value["event"].as_str().unwrap_or("unknown").to_string();
        if kind == "decision_made" {
            last_decision = Some(value.clone());
        }
        *counts.entry(kind).or_default() += 1;
    }

    println!("audit log: {}", audit_log.display());
    for (kind, count) in &counts {
        println!("  {kind}: {count}");
    }
    if let Some(decision) = last_decision {
        let d = &decision["decision"];
        println!(
            "last decision: {} {} (confidence {})",
            d["action"].as_str().unwrap_or("?"),
            d["instrument"].as_str().unwrap_or("?"),
            d["confidence"].as_str().unwrap_or("?"),
        );
    }
    Ok(())
}
