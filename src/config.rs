//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.pulsewatch.toml` files.

use crate::cli::{Args, OutputFormat, SourceKind};
use crate::sampler::derived::DEFAULT_FAILURE_PROBABILITY;
use crate::sampler::pagespeed::DEFAULT_API_URL;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".pulsewatch.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Refresh loop settings.
    #[serde(default)]
    pub monitor: MonitorSettings,

    /// Page-speed provider settings.
    #[serde(default)]
    pub pagespeed: PageSpeedConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Sampling source.
    #[serde(default)]
    pub source: SourceKind,

    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Report format.
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            output: default_output(),
            format: OutputFormat::default(),
        }
    }
}

fn default_output() -> String {
    "pulsewatch_report.md".to_string()
}

/// Refresh loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Seconds between two passes.
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,

    /// Number of trend points kept.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Timer ticks before stopping (0 = until interrupted).
    #[serde(default)]
    pub ticks: u64,

    /// Seed for reproducible runs.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Simulated probe time per region.
    #[serde(default = "default_probe_delay")]
    pub probe_delay_ms: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            history_capacity: default_history_capacity(),
            ticks: 0,
            seed: None,
            probe_delay_ms: default_probe_delay(),
        }
    }
}

fn default_interval() -> u64 {
    5
}

fn default_history_capacity() -> usize {
    crate::analysis::DEFAULT_HISTORY_CAPACITY
}

fn default_probe_delay() -> u64 {
    50
}

/// PageSpeed Insights settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSpeedConfig {
    /// Endpoint URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Optional API key.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Analysis strategy passed to the API.
    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Probability that a derived region is reported down.
    #[serde(default = "default_failure_probability")]
    pub failure_probability: f64,
}

impl Default for PageSpeedConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            strategy: default_strategy(),
            timeout_seconds: default_timeout(),
            failure_probability: default_failure_probability(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_strategy() -> String {
    "mobile".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_failure_probability() -> f64 {
    DEFAULT_FAILURE_PROBABILITY
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include the trend history table.
    #[serde(default = "default_true")]
    pub include_history: bool,

    /// Include optimisation tips.
    #[serde(default = "default_true")]
    pub include_tips: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_history: true,
            include_tips: true,
        }
    }
}

fn default_true() -> bool {
    true
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
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.pulsewatch.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(source) = args.source {
            self.general.source = source;
        }
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }

        if let Some(interval) = args.interval {
            self.monitor.interval_seconds = interval;
        }
        if let Some(history) = args.history {
            self.monitor.history_capacity = history;
        }
        if let Some(ticks) = args.ticks {
            self.monitor.ticks = ticks;
        }
        if args.seed.is_some() {
            self.monitor.seed = args.seed;
        }
        if let Some(delay) = args.probe_delay_ms {
            self.monitor.probe_delay_ms = delay;
        }

        if let Some(ref api_url) = args.api_url {
            self.pagespeed.api_url = api_url.clone();
        }
        if args.api_key.is_some() {
            self.pagespeed.api_key = args.api_key.clone();
        }
        if let Some(timeout) = args.timeout {
            self.pagespeed.timeout_seconds = timeout;
        }
        if let Some(p) = args.failure_probability {
            self.pagespeed.failure_probability = p;
        }
    }

    /// Check the merged settings.
    ///
    /// Applies the same ranges as the command-line flags, so values coming
    /// from the config file are held to them too.
    pub fn validate(&self) -> Result<()> {
        if self.monitor.interval_seconds == 0 {
            bail!("monitor.interval_seconds must be at least 1");
        }
        if !(1..=1000).contains(&self.monitor.history_capacity) {
            bail!("monitor.history_capacity must be between 1 and 1000");
        }
        if self.pagespeed.timeout_seconds == 0 {
            bail!("pagespeed.timeout_seconds must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.pagespeed.failure_probability) {
            bail!("pagespeed.failure_probability must be between 0.0 and 1.0");
        }
        if !self.pagespeed.api_url.starts_with("http://")
            && !self.pagespeed.api_url.starts_with("https://")
        {
            bail!("pagespeed.api_url must start with 'http://' or 'https://'");
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
