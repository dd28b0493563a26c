use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tally_engine::{NormalizeOptions, StatementJob, StatementOutput, run_statements};
use tracing_subscriber::EnvFilter;

mod input;

#[derive(Parser, Debug)]
#[command(name = "tally", version, about = "Statement normalization and reconciliation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize extracted statement tables into a ledger + reconciliation report
    Normalize {
        /// Statement files (JSON table dumps, or a bare CSV per statement)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Built-in institution profile id (see `tally profiles list`)
        #[arg(long, conflicts_with = "profile")]
        institution: Option<String>,

        /// Path to a custom institution profile TOML
        #[arg(long)]
        profile: Option<PathBuf>,

        /// Declared opening balance, in the institution's own number format
        #[arg(long)]
        opening_balance: Option<String>,

        /// Currency code override
        #[arg(long)]
        currency: Option<String>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,

        /// Write output here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,

        /// Statements processed concurrently (default: 4)
        #[arg(long, default_value_t = 4)]
        max_workers: usize,
    },

    /// Inspect institution profiles
    Profiles {
        #[command(subcommand)]
        command: ProfilesCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ProfilesCommand {
    /// List built-in profile ids
    List,

    /// Print a built-in profile's TOML
    Show { id: String },
}

/// One statement's result in the batch output.
#[derive(Debug, Serialize)]
struct BatchEntry {
    statement: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<StatementOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Normalize {
            inputs,
            institution,
            profile,
            opening_balance,
            currency,
            pretty,
            out,
            max_workers,
        } => {
            let compiled = match (&institution, &profile) {
                (Some(id), None) => tally_profiles::builtin(id)?,
                (None, Some(path)) => tally_profiles::load_file(path)?,
                (None, None) => bail!("pass --institution <id> or --profile <path>"),
                (Some(_), Some(_)) => unreachable!("clap rejects the combination"),
            };
            let compiled = Arc::new(compiled);

            let options = NormalizeOptions { declared_opening: opening_balance, currency };
            let mut jobs = Vec::with_capacity(inputs.len());
            for path in &inputs {
                let tables = input::load_tables(path)?;
                jobs.push((
                    StatementJob {
                        id: path.display().to_string(),
                        tables,
                        options: options.clone(),
                    },
                    Arc::clone(&compiled),
                ));
            }

            let results = run_statements(jobs, max_workers).await;
            let failed = results.iter().filter(|(_, r)| r.is_err()).count();
            tracing::info!(statements = results.len(), failed, "normalization finished");

            let entries: Vec<BatchEntry> = results
                .into_iter()
                .map(|(id, result)| match result {
                    Ok(output) => BatchEntry { statement: id, output: Some(output), error: None },
                    Err(e) => BatchEntry { statement: id, output: None, error: Some(e.to_string()) },
                })
                .collect();

            // A single input reads better as a bare object than a one-element array.
            let json = if entries.len() == 1 {
                to_json(&entries[0], pretty)?
            } else {
                to_json(&entries, pretty)?
            };

            match out {
                Some(path) => std::fs::write(&path, json)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => println!("{json}"),
            }

            if failed > 0 {
                bail!("{failed} of {} statement(s) failed", inputs.len());
            }
        }

        Command::Profiles { command } => match command {
            ProfilesCommand::List => {
                for id in tally_profiles::builtin_ids() {
                    let p = tally_profiles::builtin(id)?;
                    println!("{id}\t{}", p.profile.name);
                }
            }
            ProfilesCommand::Show { id } => {
                print!("{}", tally_profiles::builtin_source(&id)?);
            }
        },
    }

    Ok(())
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}
