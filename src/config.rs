//! Configuration file handling.
//!
//! This module handles loading `hivefleet.toml`, merging it with CLI
//! arguments, and turning the result into an immutable [`RunRequest`].

use crate::models::RunRequest;
use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "hivefleet.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Fleet settings.
    #[serde(default)]
    pub fleet: FleetConfig,

    /// Load parameters forwarded to every worker.
    #[serde(default)]
    pub load: LoadConfig,

    /// Where the workers live.
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Worker authorization.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Fleet settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Number of workers to invoke.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Per-worker timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Invoke a worker running on this machine instead of cloud functions.
    #[serde(default)]
    pub local: bool,

    /// Service-account key file, exported for remote runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<PathBuf>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            timeout_seconds: default_timeout(),
            local: false,
            credentials: None,
        }
    }
}

fn default_workers() -> usize {
    1
}

fn default_timeout() -> u64 {
    540 // cloud function maximum
}

/// Load parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Target URL to load-test.
    #[serde(default)]
    pub url: String,

    /// Concurrent connections per worker.
    #[serde(default = "default_concurrency")]
    pub concurrency: u64,

    /// Total requests per worker.
    #[serde(default = "default_number")]
    pub number: u64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            concurrency: default_concurrency(),
            number: default_number(),
        }
    }
}

fn default_concurrency() -> u64 {
    10
}

fn default_number() -> u64 {
    1000
}

/// Worker endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Worker URL used in local mode.
    #[serde(default = "default_local_url")]
    pub local_url: String,

    /// Cloud functions region, e.g. `europe-west1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Cloud project id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Deployed function name.
    #[serde(default = "default_function")]
    pub function: String,

    /// Explicit remote worker URL; takes precedence over region/project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            local_url: default_local_url(),
            region: None,
            project: None,
            function: default_function(),
            url: None,
        }
    }
}

fn default_local_url() -> String {
    "http://localhost:3000/".to_string()
}

fn default_function() -> String {
    "Commander".to_string()
}

/// Worker authorization settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Identity token sent as `Authorization: Bearer <token>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output file for the JSON report.
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
        }
    }
}

fn default_output() -> PathBuf {
    PathBuf::from("hivefleet_report.json")
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(workers) = args.workers {
            self.fleet.workers = workers;
        }
        if let Some(timeout) = args.timeout {
            self.fleet.timeout_seconds = timeout;
        }
        if args.local {
            self.fleet.local = true;
        }

        if let Some(ref url) = args.url {
            self.load.url = url.clone();
        }
        if let Some(concurrency) = args.concurrency {
            self.load.concurrency = concurrency;
        }
        if let Some(number) = args.number {
            self.load.number = number;
        }

        if let Some(ref endpoint) = args.endpoint {
            if self.fleet.local {
                self.endpoint.local_url = endpoint.clone();
            } else {
                self.endpoint.url = Some(endpoint.clone());
            }
        }

        if let Some(ref token) = args.token {
            self.auth.token = Some(token.clone());
        }

        if let Some(ref output) = args.output {
            self.report.output = output.clone();
        }
    }

    /// Resolve the worker endpoint URL (without query parameters).
    pub fn worker_endpoint(&self) -> Result<Url> {
        let raw = if self.fleet.local {
            self.endpoint.local_url.clone()
        } else if let Some(ref url) = self.endpoint.url {
            url.clone()
        } else {
            match (&self.endpoint.region, &self.endpoint.project) {
                (Some(region), Some(project)) => format!(
                    "https://{}-{}.cloudfunctions.net/{}",
                    region, project, self.endpoint.function
                ),
                _ => bail!(
                    "Remote workers need either endpoint.url or both endpoint.region and endpoint.project"
                ),
            }
        };

        parse_http_url(&raw).with_context(|| format!("Invalid worker endpoint: {}", raw))
    }

    /// Validate the configuration and build the request for one run.
    ///
    /// Every error here is fatal: no worker could succeed with it.
    pub fn run_request(&self) -> Result<RunRequest> {
        if self.load.url.is_empty() {
            bail!("No target URL configured (set load.url or pass --url)");
        }
        let target_url = parse_http_url(&self.load.url)
            .with_context(|| format!("Invalid target URL: {}", self.load.url))?;

        if self.fleet.workers == 0 {
            bail!("Fleet must have at least 1 worker");
        }
        if self.fleet.timeout_seconds == 0 {
            bail!("Worker timeout must be at least 1 second");
        }
        if self.load.concurrency == 0 {
            bail!("Concurrency must be at least 1");
        }
        if self.load.number == 0 {
            bail!("Request count must be at least 1");
        }

        let token = self.auth.token.clone().filter(|t| !t.trim().is_empty());
        if token.is_none() && !self.fleet.local {
            bail!("Remote workers need an identity token (set auth.token, --token or HIVEFLEET_TOKEN)");
        }

        Ok(RunRequest {
            target_url,
            endpoint: self.worker_endpoint()?,
            concurrency: self.load.concurrency,
            request_count: self.load.number,
            worker_count: self.fleet.workers,
            timeout: Duration::from_secs(self.fleet.timeout_seconds),
            token: token.map(|t| t.trim().to_string()),
            local: self.fleet.local,
        })
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let mut config = Config::default();
        config.load.url = "https://example.com/".to_string();
        config.endpoint.region = Some("europe-west1".to_string());
        config.endpoint.project = Some("my-project".to_string());
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

fn parse_http_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)?;
    if url.scheme() != "http" && url.scheme() != "https" {
        bail!("URL scheme must be http or https, got '{}'", url.scheme());
    }
    if url.host_str().is_none() {
        bail!("URL has no host");
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn remote_config() -> Config {
        let mut config = Config::default();
        config.load.url = "https://target.example/".to_string();
        config.endpoint.region = Some("europe-west1".to_string());
        config.endpoint.project = Some("demo".to_string());
        config.auth.token = Some("token".to_string());
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.fleet.workers, 1);
        assert_eq!(config.fleet.timeout_seconds, 540);
        assert!(!config.fleet.local);
        assert_eq!(config.load.concurrency, 10);
        assert_eq!(config.load.number, 1000);
        assert_eq!(config.endpoint.function, "Commander");
        assert_eq!(config.report.output, PathBuf::from("hivefleet_report.json"));
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[fleet]
workers = 20
timeout_seconds = 120
credentials = "/secrets/key.json"

[load]
url = "https://target.example/"
concurrency = 50
number = 10000

[endpoint]
region = "us-central1"
project = "load-lab"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.fleet.workers, 20);
        assert_eq!(config.fleet.timeout_seconds, 120);
        assert_eq!(
            config.fleet.credentials,
            Some(PathBuf::from("/secrets/key.json"))
        );
        assert_eq!(config.load.concurrency, 50);
        assert_eq!(config.load.number, 10000);
        assert_eq!(config.endpoint.region.as_deref(), Some("us-central1"));
        assert_eq!(config.endpoint.local_url, "http://localhost:3000/");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "[fleet]\nworkers = 3\nlocal = true\n").unwrap();

        let config = assert_ok!(Config::load(&path));
        assert_eq!(config.fleet.workers, 3);
        assert!(config.fleet.local);

        std::fs::write(&path, "[fleet]\nworkers = \"many\"\n").unwrap();
        assert_err!(Config::load(&path));
        assert_err!(Config::load(&dir.path().join("missing.toml")));
    }

    #[test]
    fn test_remote_endpoint_from_region_and_project() {
        let config = remote_config();
        let endpoint = config.worker_endpoint().unwrap();
        assert_eq!(
            endpoint.as_str(),
            "https://europe-west1-demo.cloudfunctions.net/Commander"
        );
    }

    #[test]
    fn test_explicit_endpoint_wins() {
        let mut config = remote_config();
        config.endpoint.url = Some("https://workers.example/run".to_string());
        assert_eq!(
            config.worker_endpoint().unwrap().as_str(),
            "https://workers.example/run"
        );
    }

    #[test]
    fn test_remote_endpoint_needs_project() {
        let mut config = remote_config();
        config.endpoint.project = None;
        assert!(config.worker_endpoint().is_err());
        assert!(config.run_request().is_err());
    }

    #[test]
    fn test_local_endpoint() {
        let mut config = remote_config();
        config.fleet.local = true;
        config.endpoint.region = None;
        assert_eq!(
            config.worker_endpoint().unwrap().as_str(),
            "http://localhost:3000/"
        );
    }

    #[test]
    fn test_run_request() {
        let mut config = remote_config();
        config.fleet.workers = 8;
        config.fleet.timeout_seconds = 60;

        let run = config.run_request().unwrap();
        assert_eq!(run.worker_count, 8);
        assert_eq!(run.timeout, Duration::from_secs(60));
        assert_eq!(run.concurrency, 10);
        assert_eq!(run.request_count, 1000);
        assert_eq!(run.target_url.as_str(), "https://target.example/");
        assert_eq!(run.token.as_deref(), Some("token"));
        assert!(!run.local);
    }

    #[test]
    fn test_run_request_rejects_bad_target() {
        let mut config = remote_config();
        config.load.url = "not a url".to_string();
        assert!(config.run_request().is_err());

        config.load.url = "ftp://target.example/".to_string();
        assert!(config.run_request().is_err());

        config.load.url = String::new();
        assert!(config.run_request().is_err());
    }

    #[test]
    fn test_run_request_rejects_zero_values() {
        let mut config = remote_config();
        config.fleet.workers = 0;
        assert!(config.run_request().is_err());

        let mut config = remote_config();
        config.load.number = 0;
        assert!(config.run_request().is_err());

        let mut config = remote_config();
        config.fleet.timeout_seconds = 0;
        assert!(config.run_request().is_err());
    }

    #[test]
    fn test_token_required_only_for_remote() {
        let mut config = remote_config();
        config.auth.token = Some("   ".to_string());
        assert!(config.run_request().is_err());

        config.fleet.local = true;
        let run = config.run_request().unwrap();
        assert!(run.token.is_none());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[fleet]"));
        assert!(toml_str.contains("[load]"));
        assert!(toml_str.contains("[endpoint]"));
        assert!(toml_str.contains("[report]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.load.url, "https://example.com/");
        assert_eq!(parsed.endpoint.project.as_deref(), Some("my-project"));
    }
}
