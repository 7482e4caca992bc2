use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ferrite_sft::config::RunConfig;
use ferrite_sft::error::{Result, TrainError};
use ferrite_sft::run::run_from_config;

/// Supervised fine-tuning of a small dense network from a run file.
#[derive(Parser, Debug)]
#[command(name = "ferrite-sft", version, about)]
struct Args {
    /// Run configuration (TOML, or JSON by extension).
    #[arg(short, long)]
    config: PathBuf,

    /// Overrides `trainer.epochs`.
    #[arg(long)]
    epochs: Option<usize>,

    /// Overrides `project.project_dir`.
    #[arg(long)]
    project_dir: Option<PathBuf>,

    /// Hides the progress bar.
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut config = RunConfig::from_path(&args.config)?;
    if let Some(epochs) = args.epochs {
        config.trainer.epochs = epochs;
    }
    if let Some(dir) = args.project_dir {
        config.project.project_dir = dir;
    }
    if args.quiet {
        config.trainer.show_progress = false;
    }

    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    })
    .map_err(|e| TrainError::runtime(format!("failed to install Ctrl-C handler: {e}")))?;

    let summary = run_from_config(&config, Some(stop))?;
    if summary.stopped_early {
        warn!(epochs = summary.epochs_completed, "training stopped early");
    }
    info!(
        epochs = summary.epochs_completed,
        steps = summary.global_step,
        final_loss = ?summary.final_train_loss(),
        checkpoints = summary.checkpoints.len(),
        "training complete"
    );
    Ok(())
}
