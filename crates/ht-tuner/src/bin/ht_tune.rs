use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ht_dist::LocalGroup;
use ht_engine::{CommandEngine, CommandSpec};
use ht_search::{HyperparameterSpec, SearcherRegistry};
use ht_tuner::{TuneSettings, TuningSession};

/// Tune the hyperparameters of a training command.
#[derive(Debug, Parser)]
#[command(name = "ht-tune", version, about)]
struct Cli {
    /// JSON tuning file: base_config, hparam_spec, tune and command.
    #[arg(short, long)]
    config: PathBuf,

    /// Write the trial history to this file as JSON.
    #[arg(long)]
    history: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Deserialize)]
struct TuneFile {
    base_config: serde_json::Value,
    hparam_spec: HyperparameterSpec,
    tune: TuneSettings,
    command: CommandSpec,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let raw = fs::read_to_string(&cli.config)
        .with_context(|| format!("reading {}", cli.config.display()))?;
    let file: TuneFile = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", cli.config.display()))?;

    info!(program = %file.command.program, "tuning training command");
    let mut session = TuningSession::new(
        file.base_config,
        file.hparam_spec,
        file.tune,
        Arc::new(CommandEngine::new(file.command)),
        &SearcherRegistry::with_builtins(),
        Arc::new(LocalGroup::new()),
    )?;
    let outcome = session.tune()?;

    if let Some(path) = &cli.history {
        let history = serde_json::to_vec_pretty(session.history())?;
        fs::write(path, history).with_context(|| format!("writing {}", path.display()))?;
    }

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
