//! Measurement samplers.
//!
//! A sampler produces one [`MeasurementBatch`] per call, holding exactly one
//! measurement per configured region.

pub mod derived;
pub mod pagespeed;
pub mod synthetic;

use crate::error::SampleError;
use crate::models::{MeasurementBatch, Region};
use async_trait::async_trait;

pub use derived::{ReportProvider, ReportSampler};
pub use pagespeed::{PageSpeedClient, PerformanceReport};
pub use synthetic::{RandomLatency, SyntheticSampler};

/// Produces one measurement batch for a target.
#[async_trait]
pub trait Sampler: Send {
    /// Take one measurement per region for `target`.
    async fn sample(&mut self, target: &str) -> Result<MeasurementBatch, SampleError>;

    /// The fixed region set this sampler measures.
    fn regions(&self) -> &[Region];

    /// Short name of the sampling source.
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<S: Sampler + ?Sized> Sampler for Box<S> {
    async fn sample(&mut self, target: &str) -> Result<MeasurementBatch, SampleError> {
        (**self).sample(target).await
    }

    fn regions(&self) -> &[Region] {
        (**self).regions()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
