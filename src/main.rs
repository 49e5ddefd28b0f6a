//! Pulsewatch - multi-region website performance monitor
//!
//! A CLI tool that samples one load time per region for a URL,
//! refreshes on a fixed timer and writes a Markdown or JSON report.
//!
//! Exit codes:
//!   0 - Success (no --fail-above set, or final p95 below it)
//!   1 - Runtime error (config, first pass, report writing, etc.)
//!   2 - Final p95 at or above the --fail-above threshold

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod monitor;
mod report;
mod sampler;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat, SourceKind};
use config::{Config, CONFIG_FILE_NAME};
use indicatif::{ProgressBar, ProgressStyle};
use models::{RunMetadata, RunReport, Snapshot};
use monitor::{MonitorConfig, RefreshLoop};
use sampler::{PageSpeedClient, RandomLatency, ReportSampler, Sampler, SyntheticSampler};
use std::path::PathBuf;
use std::time::{Duration, Instant};
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

    init_logging(&args);

    info!("Pulsewatch v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .pulsewatch.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the source, interval, history and report.");
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
        eprintln!("Warning: failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete monitoring workflow. Returns the exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    let started = Instant::now();
    let started_at = Utc::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;

    let target = args.target_url().to_string();
    let sampler = build_sampler(&config)?;

    let regions: Vec<&str> = sampler.regions().iter().map(|r| r.id).collect();
    info!("Regions: {}", regions.join(", "));

    let monitor_config = MonitorConfig {
        interval: Duration::from_secs(config.monitor.interval_seconds),
        history_capacity: config.monitor.history_capacity,
    };
    let mut refresh = RefreshLoop::new(sampler, monitor_config);

    let snapshot = if args.once {
        run_single_pass(&mut refresh, &target, args.quiet).await?
    } else {
        run_monitoring(&mut refresh, &target, config.monitor.ticks, args.quiet).await?
    };

    let duration = started.elapsed().as_secs_f64();
    let report = build_report(&config, snapshot, started_at, refresh.passes(), duration);

    let output_path = output_path(&config);
    let output = match config.general.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    let stats = report.snapshot.stats;
    println!("\n📊 Run Summary:");
    println!("   Passes: {}", report.metadata.passes);
    println!(
        "   Avg {}ms | Min {}ms | Max {}ms | P95 {}ms",
        stats.mean, stats.min, stats.max, stats.p95
    );
    println!("   Duration: {:.1}s", duration);
    println!("\n✅ Report saved to: {}", output_path.display());

    if let Some(threshold) = args.fail_above {
        if stats.p95 >= threshold {
            eprintln!(
                "\n⛔ P95 {}ms is at or above {}ms. Failing (exit code 2).",
                stats.p95, threshold
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Build the sampler for the configured source.
fn build_sampler(config: &Config) -> Result<Box<dyn Sampler>> {
    match config.general.source {
        SourceKind::Synthetic => {
            let source = RandomLatency::from_seed(config.monitor.seed);
            let sampler = SyntheticSampler::new(source)
                .with_probe_delay(Duration::from_millis(config.monitor.probe_delay_ms));
            Ok(Box::new(sampler))
        }
        SourceKind::Pagespeed => {
            let ps = &config.pagespeed;
            if ps.api_key.is_none() {
                warn!("No PageSpeed API key set; requests may be rate limited");
            }
            let client = PageSpeedClient::new(
                ps.api_url.clone(),
                ps.api_key.clone(),
                ps.strategy.clone(),
                ps.timeout_seconds,
            )?;
            let sampler = ReportSampler::new(client, config.monitor.seed)
                .with_failure_probability(ps.failure_probability);
            Ok(Box::new(sampler))
        }
    }
}

/// One pass without monitoring, behind a spinner.
async fn run_single_pass(
    refresh: &mut RefreshLoop<Box<dyn Sampler>>,
    target: &str,
    quiet: bool,
) -> Result<Snapshot> {
    let snapshot = {
        let _spinner = Spinner::start(
            &format!("Sampling {} ({})", target, refresh.sampler_name()),
            quiet,
        );
        refresh.run_once(target).await
    }
    .context("Sampling pass failed")?;

    if !quiet {
        print!("{}", report::render_console(&snapshot));
    }
    Ok(snapshot)
}

/// Monitor until the tick budget is spent or Ctrl-C is pressed.
async fn run_monitoring(
    refresh: &mut RefreshLoop<Box<dyn Sampler>>,
    target: &str,
    ticks: u64,
    quiet: bool,
) -> Result<Snapshot> {
    println!("🔄 Monitoring {} (Ctrl-C to stop)", target);

    let first = refresh
        .start(target)
        .await
        .context("Initial sampling pass failed")?;
    if !quiet {
        print!("{}", report::render_console(&first));
    }

    let mut ticks_done = 0u64;
    while ticks == 0 || ticks_done < ticks {
        tokio::select! {
            result = refresh.tick() => {
                ticks_done += 1;
                match result {
                    Some(Ok(snapshot)) => {
                        if !quiet {
                            print!("{}", report::render_console(&snapshot));
                        }
                    }
                    // Already logged; keep the previous snapshot
                    Some(Err(_)) => {}
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    refresh.stop();
    refresh
        .snapshot()
        .context("No sampling pass has completed")
}

fn build_report(
    config: &Config,
    mut snapshot: Snapshot,
    started_at: chrono::DateTime<Utc>,
    passes: usize,
    duration_seconds: f64,
) -> RunReport {
    if !config.report.include_history {
        snapshot.history.clear();
    }
    let recommendations = report::recommendations(&snapshot, config.report.include_tips);

    RunReport {
        metadata: RunMetadata {
            target: snapshot.target.clone(),
            source: config.general.source.to_string(),
            started_at,
            passes,
            interval_seconds: config.monitor.interval_seconds,
            history_capacity: config.monitor.history_capacity,
            duration_seconds,
        },
        snapshot,
        recommendations,
    }
}

/// Report path; the default Markdown name switches extension for JSON.
fn output_path(config: &Config) -> PathBuf {
    let path = PathBuf::from(&config.general.output);
    if config.general.format == OutputFormat::Json
        && config.general.output == config::GeneralConfig::default().output
    {
        return path.with_extension("json");
    }
    path
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
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

/// Terminal spinner cleared when dropped.
struct Spinner(Option<ProgressBar>);

impl Spinner {
    fn start(message: &str, hidden: bool) -> Self {
        if hidden {
            return Self(None);
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Self(Some(pb))
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if let Some(pb) = self.0.take() {
            pb.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Measurement, MeasurementBatch, SummaryStats, SYNTHETIC_REGIONS};

    fn create_test_snapshot() -> Snapshot {
        let batch = MeasurementBatch::new(
            "https://example.com",
            vec![Measurement::sampled(&SYNTHETIC_REGIONS[0], 240)],
        );
        let stats = SummaryStats {
            mean: 240,
            min: 240,
            max: 240,
            p95: 240,
        };
        let point = crate::models::HistoryPoint::from_pass(&batch, &stats, 240);

        Snapshot {
            target: "https://example.com".to_string(),
            batch,
            stats,
            history: vec![point],
        }
    }

    #[test]
    fn test_output_path_switches_extension_for_json() {
        let mut config = Config::default();
        assert_eq!(output_path(&config), PathBuf::from("pulsewatch_report.md"));

        config.general.format = OutputFormat::Json;
        assert_eq!(output_path(&config), PathBuf::from("pulsewatch_report.json"));

        config.general.output = "custom.txt".to_string();
        assert_eq!(output_path(&config), PathBuf::from("custom.txt"));
    }

    #[test]
    fn test_build_report_respects_report_settings() {
        let mut config = Config::default();
        config.report.include_history = false;
        config.report.include_tips = false;

        let report = build_report(&config, create_test_snapshot(), Utc::now(), 4, 1.5);
        assert_eq!(report.metadata.source, "synthetic");
        assert_eq!(report.metadata.passes, 4);
        assert!(report.snapshot.history.is_empty());
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_build_sampler_per_source() {
        let mut config = Config::default();
        let sampler = build_sampler(&config).unwrap();
        assert_eq!(sampler.name(), "synthetic");
        assert_eq!(sampler.regions().len(), 5);

        config.general.source = SourceKind::Pagespeed;
        let sampler = build_sampler(&config).unwrap();
        assert_eq!(sampler.name(), "pagespeed");
        assert_eq!(sampler.regions().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitoring_stops_after_tick_budget() {
        let mut config = Config::default();
        config.monitor.seed = Some(3);
        config.monitor.probe_delay_ms = 0;

        let sampler = build_sampler(&config).unwrap();
        let mut refresh = RefreshLoop::new(sampler, MonitorConfig::default());
        let snapshot = run_monitoring(&mut refresh, "https://example.com", 2, true)
            .await
            .unwrap();

        assert!(!refresh.is_monitoring());
        assert_eq!(refresh.passes(), 3);
        assert_eq!(snapshot.history.len(), 3);
    }
}
