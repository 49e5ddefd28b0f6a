//! Synthetic multi-region latency model.
//!
//! Each region draws `base * factor + jitter` where `base` is uniform in
//! `[100, 300)`, `jitter` is uniform in `[0, 50)` and `factor` is `1.0` for
//! US regions and `1.5` everywhere else.

use crate::error::SampleError;
use crate::models::{Measurement, MeasurementBatch, Region, SYNTHETIC_REGIONS};
use crate::sampler::Sampler;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tracing::{debug, warn};

/// Source of raw latency draws, in milliseconds.
pub trait LatencySource: Send {
    fn draw(&mut self, region: &Region) -> Result<f64, SampleError>;
}

/// Multiplier applied to the base latency of a region.
pub fn region_factor(region: &Region) -> f64 {
    if region.id.contains("us") {
        1.0
    } else {
        1.5
    }
}

/// Latency drawn from a random number generator.
pub struct RandomLatency<R> {
    rng: R,
}

impl<R: Rng + Send> RandomLatency<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomLatency<StdRng> {
    /// Seeded generator when `seed` is given, OS entropy otherwise.
    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::new(StdRng::seed_from_u64(seed)),
            None => Self::new(StdRng::from_entropy()),
        }
    }
}

impl<R: Rng + Send> LatencySource for RandomLatency<R> {
    fn draw(&mut self, region: &Region) -> Result<f64, SampleError> {
        let base = self.rng.gen_range(100.0..300.0);
        let jitter = self.rng.gen_range(0.0..50.0);
        Ok(base * region_factor(region) + jitter)
    }
}

/// Sampler backed by a [`LatencySource`].
pub struct SyntheticSampler<L> {
    source: L,
    regions: Vec<Region>,
    probe_delay: Duration,
}

impl<L: LatencySource> SyntheticSampler<L> {
    /// Create a sampler over the default synthetic regions.
    pub fn new(source: L) -> Self {
        Self {
            source,
            regions: SYNTHETIC_REGIONS.to_vec(),
            probe_delay: Duration::ZERO,
        }
    }

    /// Simulated time spent probing each region.
    pub fn with_probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay = delay;
        self
    }

    fn measure(&mut self, region: &Region) -> Measurement {
        let drawn = self.source.draw(region).and_then(|value| {
            if value.is_finite() && value >= 0.0 {
                Ok(value)
            } else {
                Err(SampleError::probe(
                    region.id,
                    format!("invalid latency {}", value),
                ))
            }
        });

        match drawn {
            Ok(value) => {
                let load_time_ms = value.round() as u64;
                debug!("{}: {}ms", region.id, load_time_ms);
                Measurement::sampled(region, load_time_ms)
            }
            Err(e) => {
                warn!("{}", e);
                Measurement::failed(region)
            }
        }
    }
}

#[async_trait]
impl<L: LatencySource> Sampler for SyntheticSampler<L> {
    async fn sample(&mut self, target: &str) -> Result<MeasurementBatch, SampleError> {
        let regions = self.regions.clone();
        let mut measurements = Vec::with_capacity(regions.len());

        for region in &regions {
            if !self.probe_delay.is_zero() {
                tokio::time::sleep(self.probe_delay).await;
            }
            measurements.push(self.measure(region));
        }

        Ok(MeasurementBatch::new(target, measurements))
    }

    fn regions(&self) -> &[Region] {
        &self.regions
    }

    fn name(&self) -> &'static str {
        "synthetic"
    }
}
