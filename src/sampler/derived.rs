//! Per-region load times derived from a single performance report.
//!
//! One report is fetched per pass. Its largest-contentful-paint duration is
//! scaled by a uniform factor in `[0.7, 1.2)` for each region, and each region
//! is independently flagged as down with a fixed probability.

use crate::error::SampleError;
use crate::models::{Measurement, MeasurementBatch, Region, REPORT_REGIONS};
use crate::sampler::{PerformanceReport, Sampler};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

/// Default probability that a region is reported as down.
pub const DEFAULT_FAILURE_PROBABILITY: f64 = 0.1;

/// Fetches one performance report for a target.
#[async_trait]
pub trait ReportProvider: Send + Sync {
    async fn fetch(&self, target: &str) -> Result<PerformanceReport, SampleError>;
}

/// Sampler that derives regional measurements from one fetched report.
pub struct ReportSampler<P, R = StdRng> {
    provider: P,
    rng: R,
    regions: Vec<Region>,
    failure_probability: f64,
}

impl<P: ReportProvider> ReportSampler<P, StdRng> {
    /// Create a sampler with a seeded generator when `seed` is given.
    pub fn new(provider: P, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(provider, rng)
    }
}

impl<P: ReportProvider, R: Rng + Send> ReportSampler<P, R> {
    pub fn with_rng(provider: P, rng: R) -> Self {
        Self {
            provider,
            rng,
            regions: REPORT_REGIONS.to_vec(),
            failure_probability: DEFAULT_FAILURE_PROBABILITY,
        }
    }

    /// Probability in `[0, 1]` that a region is flagged as down.
    pub fn with_failure_probability(mut self, probability: f64) -> Self {
        self.failure_probability = if probability.is_finite() {
            probability.clamp(0.0, 1.0)
        } else {
            DEFAULT_FAILURE_PROBABILITY
        };
        self
    }
}

#[async_trait]
impl<P: ReportProvider, R: Rng + Send> Sampler for ReportSampler<P, R> {
    async fn sample(&mut self, target: &str) -> Result<MeasurementBatch, SampleError> {
        let report = self.provider.fetch(target).await?;

        let base = report.largest_contentful_paint_ms().unwrap_or(0.0);
        info!(
            "Report for {}: score {:?}, LCP {:.0}ms",
            target,
            report.score_percent(),
            base
        );

        let mut measurements = Vec::with_capacity(self.regions.len());
        for region in &self.regions {
            let factor = self.rng.gen_range(0.7..1.2);
            let load_time_ms = (base * factor).round() as u64;
            let up = !self.rng.gen_bool(self.failure_probability);
            debug!("{}: {}ms (up: {})", region.id, load_time_ms, up);
            measurements.push(Measurement::derived(region, load_time_ms, up));
        }

        Ok(MeasurementBatch::new(target, measurements)
            .with_score(report.score_percent())
            .with_audits(report.headline_audits()))
    }

    fn regions(&self) -> &[Region] {
        &self.regions
    }

    fn name(&self) -> &'static str {
        "pagespeed"
    }
}
