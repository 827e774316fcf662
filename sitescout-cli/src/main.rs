use clap::Parser;
use colored::Colorize;
use sitescout::{
    config::{CliOverrides, ScoutConfig},
    metrics::RunSummary,
    run_with_config, ScoutError, ShutdownSignal,
};
use std::{num::NonZeroUsize, path::PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, ScoutError>;

/// Fetch every site listed in a CSV file and record the ones whose content matches a pattern
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// CSV input; the site is read from the second column and the first line is a header
    #[arg(short = 'i', long)]
    input: Option<PathBuf>,

    /// File that receives one matching URL per line (replaced if it exists)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Regular expression tested against each line of a page
    #[arg(short = 'p', long)]
    pattern: Option<String>,

    /// Match the pattern case-sensitively
    #[arg(long)]
    case_sensitive: bool,

    /// Number of worker threads
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// User-Agent header sent with each request
    #[arg(long)]
    user_agent: Option<String>,

    /// Configuration file (YAML)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Print run statistics when done
    #[arg(short, long)]
    stats: bool,
}

fn main() -> Result<()> {
    run()
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = ScoutConfig::load_from(cli.config.as_deref())?.merge_with_cli(CliOverrides {
        input_path: cli.input,
        output_path: cli.output,
        pattern: cli.pattern,
        case_sensitive: cli.case_sensitive,
        thread_count: cli.threads,
        log_level: cli.log_level,
        user_agent: cli.user_agent,
    });

    init_tracing(&config.log_level);
    debug!("Effective configuration: {:?}", config);

    let shutdown = ShutdownSignal::new();
    let handler_signal = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_signal.cancel()) {
        warn!("Could not install signal handler: {}", e);
    }

    let summary = run_with_config(&config, &shutdown)?;
    if shutdown.is_cancelled() {
        eprintln!("{}", "Interrupted; results written so far were kept".yellow());
    }
    if cli.stats {
        print_summary(&summary, &config);
    }
    Ok(())
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_summary(summary: &RunSummary, config: &ScoutConfig) {
    println!(
        "Scanned {} sites ({} records skipped)",
        summary.items_fetched + summary.fetch_failures,
        summary.records_skipped
    );
    if summary.fetch_failures > 0 {
        println!("{} sites could not be fetched", summary.fetch_failures.to_string().red());
    }
    println!(
        "Found {} matching sites, written to {}",
        summary.matches_written.to_string().green(),
        config.output_path.display().to_string().blue()
    );
}
