//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation. Most flags are optional so that values from
//! `hivefleet.toml` are only overridden when a flag is actually given.

use clap::Parser;
use std::path::PathBuf;

/// HiveFleet - distributed load testing from a fleet of workers
///
/// Invokes N load-generation workers concurrently against one target and
/// combines their reports into a single fleet-wide result.
///
/// Examples:
///   hivefleet --config hivefleet.toml
///   hivefleet --url https://example.com --workers 20 --token "$(gcloud auth print-identity-token)"
///   hivefleet --local --url http://localhost:8080 --workers 2
///   hivefleet --dry-run
///   hivefleet --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for hivefleet.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Target URL to load-test
    #[arg(short, long, value_name = "URL", env = "HIVEFLEET_URL")]
    pub url: Option<String>,

    /// Number of workers in the fleet
    #[arg(short, long, value_name = "COUNT")]
    pub workers: Option<usize>,

    /// Concurrent connections per worker
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<u64>,

    /// Total requests per worker
    #[arg(short, long, value_name = "NUM")]
    pub number: Option<u64>,

    /// Per-worker timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Invoke a worker running on this machine
    #[arg(long)]
    pub local: bool,

    /// Worker endpoint URL
    ///
    /// Overrides the cloud functions URL built from region and project,
    /// or the local worker URL when used with --local.
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Identity token sent to workers as a bearer token
    #[arg(long, value_name = "TOKEN", env = "HIVEFLEET_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Output file path for the JSON report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Enable verbose logging output (per-worker results)
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Exit with code 2 if any worker failed, not only when all did
    #[arg(long)]
    pub fail_on_partial: bool,

    /// Dry run: resolve the configuration and print the fleet plan
    ///
    /// No worker is invoked.
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default hivefleet.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Target URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref endpoint) = self.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err("Endpoint URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.workers == Some(0) {
            return Err("Workers must be at least 1".to_string());
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.number == Some(0) {
            return Err("Number of requests must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref config) = self.config {
            if !config.is_file() {
                return Err(format!("Config file does not exist: {}", config.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
