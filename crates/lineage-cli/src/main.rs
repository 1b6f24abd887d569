// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `lineage`: developer CLI for provenance histories.
//!
//! Diffs JSON documents, encodes and decodes embeddable state exports,
//! replays scripted sessions, and inspects exported graphs.
#![allow(clippy::print_stdout, clippy::print_stderr)]
// The CLI is expected to print to stdout/stderr.

mod config_fs;
mod script;
mod table;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use lineage_core::{codec, ConfigService, Provenance, ProvenanceConfig, ProvenanceGraph};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config_fs::FsConfigStore;

#[derive(Parser, Debug)]
#[command(
    name = "lineage",
    author,
    version,
    about = "Inspect and replay branching state histories"
)]
struct Args {
    /// Config file to use instead of the platform config directory.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the structural diff between two JSON documents.
    Diff {
        /// Document before.
        old: PathBuf,
        /// Document after.
        new: PathBuf,
        /// Print the diff list as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Encode a JSON state as a delimiter-wrapped export string.
    Encode {
        /// State to export.
        state: PathBuf,
        /// Initial state the export is relative to.
        #[arg(long, value_name = "FILE")]
        initial: Option<PathBuf>,
        /// Export only the top-level fields that differ from `--initial`.
        #[arg(long, requires = "initial")]
        partial: bool,
    },
    /// Decode an export string (delimiters optional) back to JSON.
    Decode {
        /// Export string, or any text embedding one.
        text: String,
    },
    /// Run a replay script and print the resulting graph.
    Replay {
        /// Script file.
        script: PathBuf,
        /// Write the exported graph here.
        #[arg(long, value_name = "FILE")]
        graph_out: Option<PathBuf>,
    },
    /// Validate an exported graph and print its nodes.
    Inspect {
        /// Exported graph file.
        graph: PathBuf,
    },
    /// Print the effective configuration.
    Config {
        /// Persist the effective configuration to the config store.
        #[arg(long)]
        save: bool,
    },
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let service = config_store(args.config).map(ConfigService::new);
    let config = match &service {
        Some(service) => service
            .load_provenance()
            .context("failed to load configuration")?,
        None => ProvenanceConfig::default(),
    };
    run(args.command, config, service.as_ref())
}

fn run(
    command: Command,
    config: ProvenanceConfig,
    service: Option<&ConfigService<FsConfigStore>>,
) -> Result<()> {
    match command {
        Command::Diff { old, new, json } => {
            let diffs = lineage_core::diff(&read_json(&old)?, &read_json(&new)?);
            if json {
                println!("{}", serde_json::to_string_pretty(&diffs)?);
            } else if diffs.is_empty() {
                println!("no differences");
            } else {
                println!("{}", table::diff_table(&diffs));
            }
        }
        Command::Encode {
            state,
            initial,
            partial,
        } => {
            let state = read_json(&state)?;
            let initial = match initial {
                Some(path) => read_json(&path)?,
                None => state.clone(),
            };
            println!("{}", encode(initial, state, partial, config)?);
        }
        Command::Decode { text } => {
            let codec = config.codec();
            let value = codec::decode_state(&codec, &text, config.delimiter())
                .context("could not decode export")?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Command::Replay { script, graph_out } => {
            let text = read_text(&script)?;
            let session = script::replay(script::parse(&text)?, config)?;
            info!(nodes = session.graph().len(), "replay finished");
            println!("{}", table::node_table(session.graph()));
            println!("current state: {}", session.current_state());
            if let Some(path) = graph_out {
                fs::write(&path, session.export_provenance_graph()?)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
        }
        Command::Inspect { graph } => {
            let text = read_text(&graph)?;
            let graph = ProvenanceGraph::<Value, Value>::from_json(&text)
                .with_context(|| format!("{} is not a valid provenance graph", graph.display()))?;
            println!("{}", table::node_table(&graph));
            println!("{} nodes, current {}", graph.len(), graph.current());
        }
        Command::Config { save } => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if save {
                let Some(service) = service else {
                    bail!("no config location available; pass --config <FILE>");
                };
                service
                    .save_provenance(&config)
                    .context("failed to save configuration")?;
            }
        }
    }
    Ok(())
}

// An explicit file wins; otherwise the platform directory, when one resolves.
fn config_store(explicit: Option<PathBuf>) -> Option<FsConfigStore> {
    if let Some(path) = explicit {
        return Some(FsConfigStore::file(path));
    }
    FsConfigStore::new()
        .inspect_err(|err| warn!(error = %err, "using default configuration"))
        .ok()
}

fn encode(
    initial: Value,
    state: Value,
    partial: bool,
    config: ProvenanceConfig,
) -> Result<String> {
    let codec = config.codec();
    let mut session = Provenance::<Value, Value>::builder(initial)
        .config(config)
        .codec(codec)
        .build();
    if *session.current_state() != state {
        session.apply("encode", move |_| state)?;
    }
    Ok(session.export_state(partial)?)
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_json(path: &Path) -> Result<Value> {
    serde_json::from_str(&read_text(path)?)
        .with_context(|| format!("{} is not valid JSON", path.display()))
}
