//! Command-line flags.
//!
//! Every tuning flag is optional so that `.pulsewatch.toml` can supply it;
//! `Config::merge_with_args` applies only the flags actually given.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Pulsewatch - multi-region website performance monitor
///
/// Samples one load time per region for a URL, refreshes on a timer and
/// reports average, min, max and p95 latency with a rolling trend.
///
/// Examples:
///   pulsewatch --url https://example.com
///   pulsewatch --url https://example.com --ticks 12 --interval 5
///   pulsewatch --url https://example.com --source pagespeed --once
///   pulsewatch --url https://example.com --seed 42 --format json -o run.json
///   pulsewatch --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Target URL to monitor
    #[arg(short, long, value_name = "URL", required_unless_present = "init_config")]
    pub url: Option<String>,

    /// Where load times come from (synthetic, pagespeed)
    #[arg(long, value_name = "SOURCE")]
    pub source: Option<SourceKind>,

    /// Run a single analysis pass instead of continuous monitoring
    #[arg(long)]
    pub once: bool,

    /// Stop after this many timer ticks (0 = until Ctrl-C)
    #[arg(long, value_name = "COUNT")]
    pub ticks: Option<u64>,

    /// Refresh interval in seconds
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Number of trend points to keep
    #[arg(long, value_name = "POINTS")]
    pub history: Option<usize>,

    /// Seed for the random generator (reproducible runs)
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Simulated probe time per region in milliseconds (synthetic source)
    #[arg(long, value_name = "MS")]
    pub probe_delay_ms: Option<u64>,

    /// Report request timeout in seconds (pagespeed source)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// PageSpeed Insights API key
    #[arg(long, env = "PAGESPEED_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// PageSpeed Insights endpoint
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Probability that a derived region is reported down (0.0 - 1.0)
    #[arg(long, value_name = "P")]
    pub failure_probability: Option<f64>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Exit with code 2 when the final p95 is at or above this many ms
    #[arg(long, value_name = "MS")]
    pub fail_above: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .pulsewatch.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .pulsewatch.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Sampling source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Simulated regional latency (default)
    #[default]
    Synthetic,
    /// Values derived from one PageSpeed Insights report
    Pagespeed,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Synthetic => write!(f, "synthetic"),
            SourceKind::Pagespeed => write!(f, "pagespeed"),
        }
    }
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the target URL (empty if not set; validate first).
    pub fn target_url(&self) -> &str {
        self.url.as_deref().unwrap_or("")
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        let url = self.target_url();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err("Target URL must start with 'http://' or 'https://'".to_string());
        }

        if let Some(ref api_url) = self.api_url {
            if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.interval == Some(0) {
            return Err("Interval must be at least 1 second".to_string());
        }

        if let Some(history) = self.history {
            if !(1..=1000).contains(&history) {
                return Err("History must be between 1 and 1000 points".to_string());
            }
        }

        if let Some(p) = self.failure_probability {
            if !(0.0..=1.0).contains(&p) {
                return Err("Failure probability must be between 0.0 and 1.0".to_string());
            }
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.once && self.ticks.is_some_and(|t| t > 0) {
            return Err("--ticks cannot be combined with --once".to_string());
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
