//! Data models for the performance monitor.
//!
//! This module contains the core data structures shared by the sampler,
//! the aggregator, the refresh loop and the report generator.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Load time below which a measurement is considered good.
pub const GOOD_THRESHOLD_MS: u64 = 300;

/// Load time below which a measurement is considered a warning.
pub const WARNING_THRESHOLD_MS: u64 = 500;

/// Geographic hint attached to a region (used for display only).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoHint {
    pub lat: f64,
    pub lng: f64,
}

/// A static region descriptor.
///
/// Regions are simulated locally; nothing is probed from the listed location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Region {
    /// Stable identifier, e.g. `us-east`.
    pub id: &'static str,
    /// Human-readable name.
    pub display_name: &'static str,
    /// Approximate location of the region.
    pub geo_hint: GeoHint,
}

impl Region {
    const fn new(id: &'static str, display_name: &'static str, lat: f64, lng: f64) -> Self {
        Self {
            id,
            display_name,
            geo_hint: GeoHint { lat, lng },
        }
    }
}

/// Regions used by the synthetic latency model.
pub const SYNTHETIC_REGIONS: [Region; 5] = [
    Region::new("us-east", "US East", 40.7128, -74.0060),
    Region::new("us-west", "US West", 37.7749, -122.4194),
    Region::new("eu-west", "EU West", 51.5074, -0.1278),
    Region::new("ap-south", "AP South", 1.3521, 103.8198),
    Region::new("ap-northeast", "AP Northeast", 35.6762, 139.6503),
];

/// Regions used when load times are derived from a page-speed report.
pub const REPORT_REGIONS: [Region; 4] = [
    Region::new("us-east", "US East", 38.9072, -77.0369),
    Region::new("eu-west", "EU West", 51.5074, -0.1278),
    Region::new("ap-southeast", "AP Southeast", 1.3521, 103.8198),
    Region::new("sa-east", "SA East", -23.5505, -46.6333),
];

/// Status of a single measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementStatus {
    Good,
    Warning,
    Poor,
    /// The probe failed; load time is recorded as zero.
    Error,
    /// Region reachable (report-derived measurements).
    Up,
    /// Region unreachable (report-derived measurements).
    Down,
}

impl MeasurementStatus {
    /// Classify a load time by the fixed latency thresholds.
    pub fn classify(load_time_ms: u64) -> Self {
        if load_time_ms < GOOD_THRESHOLD_MS {
            MeasurementStatus::Good
        } else if load_time_ms < WARNING_THRESHOLD_MS {
            MeasurementStatus::Warning
        } else {
            MeasurementStatus::Poor
        }
    }

    /// Returns an emoji representation of the status.
    pub fn emoji(&self) -> &'static str {
        match self {
            MeasurementStatus::Good | MeasurementStatus::Up => "🟢",
            MeasurementStatus::Warning => "🟡",
            MeasurementStatus::Poor | MeasurementStatus::Down => "🔴",
            MeasurementStatus::Error => "⚪",
        }
    }

    /// Whether the measurement counts as a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, MeasurementStatus::Error | MeasurementStatus::Down)
    }
}

impl fmt::Display for MeasurementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementStatus::Good => write!(f, "good"),
            MeasurementStatus::Warning => write!(f, "warning"),
            MeasurementStatus::Poor => write!(f, "poor"),
            MeasurementStatus::Error => write!(f, "error"),
            MeasurementStatus::Up => write!(f, "up"),
            MeasurementStatus::Down => write!(f, "down"),
        }
    }
}

/// One load-time measurement for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub region_id: String,
    pub region_name: String,
    /// Load time in milliseconds; zero when the probe failed.
    pub load_time_ms: u64,
    pub status: MeasurementStatus,
    pub taken_at: DateTime<Utc>,
}

impl Measurement {
    /// A successful latency sample, classified by threshold.
    pub fn sampled(region: &Region, load_time_ms: u64) -> Self {
        Self {
            region_id: region.id.to_string(),
            region_name: region.display_name.to_string(),
            load_time_ms,
            status: MeasurementStatus::classify(load_time_ms),
            taken_at: Utc::now(),
        }
    }

    /// A failed sample.
    pub fn failed(region: &Region) -> Self {
        Self {
            region_id: region.id.to_string(),
            region_name: region.display_name.to_string(),
            load_time_ms: 0,
            status: MeasurementStatus::Error,
            taken_at: Utc::now(),
        }
    }

    /// A load time derived from an external report, with an up/down status.
    pub fn derived(region: &Region, load_time_ms: u64, up: bool) -> Self {
        Self {
            region_id: region.id.to_string(),
            region_name: region.display_name.to_string(),
            load_time_ms,
            status: if up {
                MeasurementStatus::Up
            } else {
                MeasurementStatus::Down
            },
            taken_at: Utc::now(),
        }
    }
}

/// All measurements taken together in one sampling pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementBatch {
    /// Target the batch was taken for.
    pub target: String,
    /// One measurement per region, in region order.
    pub measurements: Vec<Measurement>,
    /// Performance score (0-100) when the batch came from a report.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    /// Headline audits of the report the batch was derived from.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub audits: Vec<AuditSummary>,
    pub taken_at: DateTime<Utc>,
}

impl MeasurementBatch {
    pub fn new(target: impl Into<String>, measurements: Vec<Measurement>) -> Self {
        Self {
            target: target.into(),
            measurements,
            score: None,
            audits: Vec::new(),
            taken_at: Utc::now(),
        }
    }

    /// Attach a report performance score.
    pub fn with_score(mut self, score: Option<u8>) -> Self {
        self.score = score;
        self
    }

    /// Attach the report audits shown alongside the batch.
    pub fn with_audits(mut self, audits: Vec<AuditSummary>) -> Self {
        self.audits = audits;
        self
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    /// Raw load times in region order.
    pub fn load_times(&self) -> impl Iterator<Item = u64> + '_ {
        self.measurements.iter().map(|m| m.load_time_ms)
    }
}

/// A named audit from a page-speed report, in display form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub id: String,
    pub title: String,
    /// Human-readable value, e.g. `2.4 s`.
    pub display_value: String,
}

/// Summary statistics over the positive load times of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub mean: u64,
    pub min: u64,
    pub max: u64,
    pub p95: u64,
}

/// One point of the rolling trend history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Formatted local time of the pass.
    pub label: String,
    pub taken_at: DateTime<Utc>,
    /// Mean of the positive load times.
    pub mean_ms: u64,
    /// Average over every region, failures counted as zero.
    pub load_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
}

impl HistoryPoint {
    /// Build a history point from a batch and its statistics.
    pub fn from_pass(batch: &MeasurementBatch, stats: &SummaryStats, load_time_ms: u64) -> Self {
        Self {
            label: batch
                .taken_at
                .with_timezone(&Local)
                .format("%H:%M:%S")
                .to_string(),
            taken_at: batch.taken_at,
            mean_ms: stats.mean,
            load_time_ms,
            score: batch.score,
        }
    }
}

/// Everything the presentation layer receives after a pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub target: String,
    pub batch: MeasurementBatch,
    pub stats: SummaryStats,
    pub history: Vec<HistoryPoint>,
}

/// Metadata about a monitoring run.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    /// Monitored URL.
    pub target: String,
    /// Sampling source name (synthetic or pagespeed).
    pub source: String,
    pub started_at: DateTime<Utc>,
    /// Number of passes performed, including the immediate one.
    pub passes: usize,
    pub interval_seconds: u64,
    pub history_capacity: usize,
    pub duration_seconds: f64,
}

/// The complete run report.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub metadata: RunMetadata,
    /// Last snapshot of the run.
    pub snapshot: Snapshot,
    pub recommendations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(MeasurementStatus::classify(0), MeasurementStatus::Good);
        assert_eq!(MeasurementStatus::classify(299), MeasurementStatus::Good);
        assert_eq!(MeasurementStatus::classify(300), MeasurementStatus::Warning);
        assert_eq!(MeasurementStatus::classify(499), MeasurementStatus::Warning);
        assert_eq!(MeasurementStatus::classify(500), MeasurementStatus::Poor);
        assert_eq!(MeasurementStatus::classify(10_000), MeasurementStatus::Poor);
    }

    #[test]
    fn test_status_display_and_failure() {
        assert_eq!(MeasurementStatus::Warning.to_string(), "warning");
        assert_eq!(MeasurementStatus::Down.to_string(), "down");
        assert!(MeasurementStatus::Error.is_failure());
        assert!(MeasurementStatus::Down.is_failure());
        assert!(!MeasurementStatus::Poor.is_failure());
    }

    #[test]
    fn test_measurement_constructors() {
        let region = SYNTHETIC_REGIONS[0];

        let ok = Measurement::sampled(&region, 420);
        assert_eq!(ok.region_id, "us-east");
        assert_eq!(ok.status, MeasurementStatus::Warning);

        let failed = Measurement::failed(&region);
        assert_eq!(failed.load_time_ms, 0);
        assert_eq!(failed.status, MeasurementStatus::Error);

        let down = Measurement::derived(&region, 1800, false);
        assert_eq!(down.load_time_ms, 1800);
        assert_eq!(down.status, MeasurementStatus::Down);
    }

    #[test]
    fn test_region_sets() {
        assert_eq!(SYNTHETIC_REGIONS.len(), 5);
        assert_eq!(REPORT_REGIONS.len(), 4);
        assert!(SYNTHETIC_REGIONS.iter().any(|r| r.id == "ap-northeast"));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&MeasurementStatus::Good).unwrap();
        assert_eq!(json, "\"good\"");
    }

    #[test]
    fn test_history_point_from_pass() {
        let batch = MeasurementBatch::new(
            "https://example.com",
            vec![Measurement::sampled(&SYNTHETIC_REGIONS[0], 200)],
        )
        .with_score(Some(87));
        let stats = SummaryStats {
            mean: 200,
            min: 200,
            max: 200,
            p95: 200,
        };

        let point = HistoryPoint::from_pass(&batch, &stats, 200);
        assert_eq!(point.mean_ms, 200);
        assert_eq!(point.score, Some(87));
        assert_eq!(point.label.len(), 8);
    }
}
