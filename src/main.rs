use anyhow::Context;
use clap::{Parser, Subcommand};
use distmatvec::config::{ConfigOverrides, MatvecConfig, OutputFormat};
use distmatvec::coordinator::{Coordinator, CoordinatorOptions};
use distmatvec::{io, partition};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, trace};

/// Multiply a matrix by a vector across a coordinator and worker tasks
#[derive(Parser)]
#[command(name = "distmatvec")]
#[command(about = "Distributed dense matrix-vector multiplication", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file (default: ./distmatvec.toml if present)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the inputs, multiply, and print the result vector (default command)
    Run {
        /// Vector file: one line of integers
        #[arg(long)]
        vector: Option<PathBuf>,

        /// Matrix file: row count, then one row per line
        #[arg(long)]
        matrix: Option<PathBuf>,

        /// Number of workers besides the coordinator
        #[arg(short = 'w', long)]
        workers: Option<usize>,

        /// Give up on a worker exchange after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Result rendering
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Print how rows would be split without reading any input
    Plan {
        /// Number of matrix rows
        #[arg(short = 'n', long)]
        rows: usize,

        /// Number of workers besides the coordinator
        #[arg(short = 'w', long)]
        workers: Option<usize>,

        /// Table rendering
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    };

    let log_level = match cli.verbose {
        0 => config.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(cli.verbose >= 2) // Show target module for -vv and above
        .with_thread_ids(cli.verbose >= 3) // Show thread IDs for -vvv
        .with_line_number(cli.verbose >= 3) // Show line numbers for -vvv
        .init();

    debug!("distmatvec started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    let result = match cli.command {
        Some(Commands::Run {
            vector,
            matrix,
            workers,
            timeout_secs,
            format,
        }) => {
            let overrides = ConfigOverrides {
                workers,
                vector_path: vector,
                matrix_path: matrix,
                timeout: timeout_secs.map(Duration::from_secs),
                output: format,
            };
            run_multiply(config, overrides).await
        }
        Some(Commands::Plan {
            rows,
            workers,
            format,
        }) => run_plan(&config, rows, workers, format),
        None => run_multiply(config, ConfigOverrides::default()).await,
    };

    if let Err(e) = result {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn load_config(cli: &Cli) -> anyhow::Result<MatvecConfig> {
    let working_dir = std::env::current_dir().context("Cannot determine working directory")?;
    MatvecConfig::load(cli.config.as_deref(), &working_dir).await
}

async fn run_multiply(mut config: MatvecConfig, overrides: ConfigOverrides) -> anyhow::Result<()> {
    config.apply_overrides(overrides);
    config.validate()?;

    let coordinator = Coordinator::new(CoordinatorOptions::from(&config));
    let result = coordinator
        .run_from_files(&config.vector_path, &config.matrix_path)
        .await
        .with_context(|| format!("Run with {} workers failed", config.workers))?;

    println!("{}", io::render(&result, config.output)?);
    Ok(())
}

fn run_plan(
    config: &MatvecConfig,
    rows: usize,
    workers: Option<usize>,
    format: Option<OutputFormat>,
) -> anyhow::Result<()> {
    let plan = partition(rows, workers.unwrap_or(config.workers));
    println!("{}", io::render_plan(&plan, format.unwrap_or(config.output))?);
    Ok(())
}
