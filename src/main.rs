//! HiveFleet - distributed load testing coordinator
//!
//! A CLI tool that invokes a fleet of load-generation workers
//! concurrently against one target and combines their reports into a
//! single fleet-wide result.
//!
//! Exit codes:
//!   0 - Success (at least one worker succeeded)
//!   1 - Runtime error (configuration, report write, etc.)
//!   2 - No worker succeeded, or any worker failed with --fail-on-partial

mod analysis;
mod cli;
mod config;
mod fleet;
mod models;
mod report;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use models::{ReportMetadata, RunRequest};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("HiveFleet v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", redacted(&args));

    match run_fleet(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default hivefleet.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to set the target URL, fleet size and worker endpoint.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Copy of the arguments that is safe to log.
fn redacted(args: &Args) -> Args {
    let mut args = args.clone();
    if let Some(ref token) = args.token {
        args.token = Some(format!("<{} chars>", token.len()));
    }
    args
}

/// Run one fleet-wide load test. Returns the process exit code.
async fn run_fleet(args: Args) -> Result<i32> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let run = config
        .run_request()
        .context("Invalid run configuration")?;

    if args.dry_run {
        return handle_dry_run(&run);
    }

    if !run.local {
        export_credentials(&config);
    }

    if let Some(ref token) = run.token {
        debug!("Using identity token ({} chars)", token.len());
    }

    println!("🐝 Triggering {} workers", run.worker_count);
    println!("   Target: {}", run.target_url);
    println!("   Endpoint: {}", run.endpoint);
    println!(
        "   Load per worker: {} requests, {} connections",
        run.request_count, run.concurrency
    );
    println!("   Timeout: {}s\n", run.timeout.as_secs());

    let client = fleet::HttpWorkerClient::new()?;
    let progress = progress_bar(run.worker_count, args.quiet)?;

    let started_at = Utc::now();
    let start_time = Instant::now();
    let outcomes = fleet::dispatch(&run, &client, &progress).await;
    let wall_clock = start_time.elapsed().as_secs_f64();
    progress.finish_with_message("All workers settled");

    let aggregate = analysis::aggregate(&outcomes);

    let metadata = ReportMetadata {
        target_url: run.target_url.to_string(),
        endpoint: run.endpoint.to_string(),
        workers: run.worker_count,
        concurrency: run.concurrency,
        requests_per_worker: run.request_count,
        started_at,
        wall_clock_seconds: wall_clock,
    };
    let report = report::finalize(&aggregate, metadata).with_failures(&outcomes);

    report::write_json_report(&report, &config.report.output)?;

    println!("\n📊 Fleet Summary:");
    for line in report::generate_summary_text(&report).lines() {
        println!("   {}", line);
    }

    if aggregate.is_failed_run() {
        eprintln!(
            "\n⛔ None of the {} workers succeeded (exit code 2).",
            aggregate.worker_count()
        );
        return Ok(2);
    }

    println!(
        "\n✅ Run complete! Report saved to: {}",
        config.report.output.display()
    );

    if args.fail_on_partial && aggregate.failure_count > 0 {
        eprintln!(
            "\n⛔ {} of {} workers failed. Failing (exit code 2).",
            aggregate.failure_count,
            aggregate.worker_count()
        );
        return Ok(2);
    }

    Ok(0)
}

/// Handle --dry-run: print the fleet plan without invoking any worker.
fn handle_dry_run(run: &RunRequest) -> Result<i32> {
    let request = fleet::client::WorkerRequest::new(run);

    println!("\n🔍 Dry run: no worker will be invoked.\n");
    println!("   Workers: {}", run.worker_count);
    println!("   Request: GET {}", request.url);
    println!(
        "   Authorization: {}",
        if request.token.is_some() {
            "Bearer <token>"
        } else {
            "none"
        }
    );
    println!("   Timeout: {}s", run.timeout.as_secs());
    println!(
        "   Total load: {} requests",
        run.request_count.saturating_mul(run.worker_count as u64)
    );

    println!("\n✅ Dry run complete.");
    Ok(0)
}

/// Point cloud client libraries at the configured service-account key.
fn export_credentials(config: &Config) {
    if let Some(ref credentials) = config.fleet.credentials {
        info!("Exporting credentials from {}", credentials.display());
        std::env::set_var("GOOGLE_APPLICATION_CREDENTIALS", credentials);
    }
}

/// Build the per-worker progress bar.
fn progress_bar(workers: usize, quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }

    let pb = ProgressBar::new(workers as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} workers {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Err(e)
        }
    }
}
