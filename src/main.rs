use anyhow::{Context as _, Result};
use clap::Parser;
use humansize::{format_size, BINARY};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::EnvFilter;

use dirsize::fs::LocalDir;
use dirsize::{Context, DirSizer, SizerConfig};

/// Total size and file count of a directory tree.
#[derive(Parser, Debug)]
#[command(name = "dirsize", version)]
struct Args {
    /// Directory to measure
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Concurrent directory expansions (0 = unbounded)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Abort after this many seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Include entries whose name starts with '.'
    #[arg(long)]
    hidden: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Config file (defaults to <config_dir>/dirsize/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => SizerConfig::load(path)?,
        None => SizerConfig::load_default()?,
    };
    if let Some(workers) = args.workers {
        config.max_workers = workers;
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = Some(timeout);
    }
    if args.hidden {
        config.include_hidden = true;
    }

    let root = args
        .path
        .canonicalize()
        .with_context(|| format!("Directory not found: {}", args.path.display()))?;

    let base = Context::background();
    let ctx = match config.timeout() {
        Some(timeout) => base.with_timeout(timeout),
        None => base.child(),
    };

    // Ctrl-C cancels the walk instead of killing the process mid-way.
    let interrupt = {
        let base = base.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                base.cancel();
            }
        })
    };

    let sizer = DirSizer::from_config(&config);
    let dir = LocalDir::new(&root).with_hidden(config.include_hidden);
    let outcome = sizer.size_with_stats(&ctx, Arc::new(dir)).await;
    interrupt.abort();

    let report = outcome.with_context(|| format!("Failed to size {}", root.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{}\t{} ({} bytes)\t{} files\t{}",
            root.display(),
            format_size(report.result.size, BINARY),
            report.result.size,
            report.result.count,
            format_elapsed(report.elapsed),
        );
    }

    Ok(())
}

fn format_elapsed(elapsed: Duration) -> String {
    if elapsed.as_secs() >= 1 {
        format!("{:.2}s", elapsed.as_secs_f64())
    } else {
        format!("{}ms", elapsed.as_millis())
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("dirsize=debug,warn")
        } else {
            EnvFilter::new("dirsize=info,warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
