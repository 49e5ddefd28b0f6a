//! Error types for the sampling layer.

use thiserror::Error;

/// Errors produced while taking measurements.
///
/// Probe errors are caught per region and never abort a batch; the other
/// variants fail the whole sampling pass.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("latency probe failed for region {region}: {reason}")]
    Probe { region: String, reason: String },

    #[error("report request timed out after {0}s")]
    Timeout(u64),

    #[error("cannot connect to report provider at {0}")]
    Connect(String),

    #[error("report request failed: {0}")]
    Request(String),

    #[error("report provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("report provider error: {0}")]
    Provider(String),

    #[error("response does not contain a lighthouse report")]
    MissingReport,

    #[error("failed to decode report: {0}")]
    Decode(String),
}

impl SampleError {
    pub fn probe(region: &str, reason: impl Into<String>) -> Self {
        SampleError::Probe {
            region: region.to_string(),
            reason: reason.into(),
        }
    }
}
