//! Batch aggregation and statistics.
//!
//! This module reduces a measurement batch into summary statistics and
//! maintains the bounded trend history. Every function here is pure.

use crate::models::{HistoryPoint, Measurement, MeasurementBatch, MeasurementStatus, SummaryStats};
use std::collections::{BTreeMap, VecDeque};

/// Default number of history points kept.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// Compute mean/min/max/p95 over the positive load times of a batch.
///
/// Failed samples (zero load time) are ignored. A batch without any positive
/// sample yields all-zero statistics.
pub fn summarize(batch: &MeasurementBatch) -> SummaryStats {
    let times: Vec<u64> = batch.load_times().collect();
    summarize_load_times(&times)
}

/// Same as [`summarize`], over raw load times.
pub fn summarize_load_times(load_times: &[u64]) -> SummaryStats {
    let mut times: Vec<u64> = load_times.iter().copied().filter(|&t| t > 0).collect();
    if times.is_empty() {
        return SummaryStats::default();
    }

    times.sort_unstable();
    let n = times.len();
    let sum: u64 = times.iter().sum();
    let mean = (sum as f64 / n as f64).round() as u64;
    let min = times[0];
    let max = times[n - 1];

    let p95_index = (n as f64 * 0.95).floor() as usize;
    let p95 = times.get(p95_index).copied().unwrap_or(max);

    SummaryStats { mean, min, max, p95 }
}

/// Append a point and keep only the most recent `capacity` entries.
pub fn fold_history(
    mut history: VecDeque<HistoryPoint>,
    point: HistoryPoint,
    capacity: usize,
) -> VecDeque<HistoryPoint> {
    history.push_back(point);
    while history.len() > capacity {
        history.pop_front();
    }
    history
}

/// Rounded average over every measurement, failures counted as zero.
pub fn batch_average(batch: &MeasurementBatch) -> u64 {
    if batch.measurements.is_empty() {
        return 0;
    }
    let sum: u64 = batch.load_times().sum();
    (sum as f64 / batch.len() as f64).round() as u64
}

/// Number of measurements per status.
pub fn status_breakdown(batch: &MeasurementBatch) -> BTreeMap<MeasurementStatus, usize> {
    let mut breakdown = BTreeMap::new();

    for measurement in &batch.measurements {
        *breakdown.entry(measurement.status).or_default() += 1;
    }

    breakdown
}

/// The region with the largest positive load time.
pub fn slowest_region(batch: &MeasurementBatch) -> Option<&Measurement> {
    batch
        .measurements
        .iter()
        .filter(|m| m.load_time_ms > 0)
        .max_by_key(|m| m.load_time_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Measurement, SYNTHETIC_REGIONS};

    fn create_test_batch(load_times: &[u64]) -> MeasurementBatch {
        let measurements = load_times
            .iter()
            .zip(SYNTHETIC_REGIONS.iter().cycle())
            .map(|(&t, region)| {
                if t == 0 {
                    Measurement::failed(region)
                } else {
                    Measurement::sampled(region, t)
                }
            })
            .collect();
        MeasurementBatch::new("https://example.com", measurements)
    }

    fn create_test_point(n: u64) -> HistoryPoint {
        let batch = create_test_batch(&[n]);
        let stats = summarize(&batch);
        HistoryPoint::from_pass(&batch, &stats, n)
    }

    #[test]
    fn test_summarize_reference_batch() {
        let stats = summarize(&create_test_batch(&[100, 200, 300, 400, 500]));

        assert_eq!(
            stats,
            SummaryStats {
                mean: 300,
                min: 100,
                max: 500,
                p95: 500,
            }
        );
    }

    #[test]
    fn test_summarize_scripted_scenario() {
        let stats = summarize(&create_test_batch(&[120, 340, 510, 90, 610]));

        assert_eq!(stats.mean, 334);
        assert_eq!(stats.min, 90);
        assert_eq!(stats.max, 610);
        assert_eq!(stats.p95, 610);
    }

    #[test]
    fn test_summarize_all_errors_is_zero() {
        assert_eq!(summarize(&create_test_batch(&[0, 0, 0])), SummaryStats::default());
        assert_eq!(summarize(&create_test_batch(&[])), SummaryStats::default());
    }

    #[test]
    fn test_summarize_ignores_errors() {
        let stats = summarize(&create_test_batch(&[0, 250, 0, 350]));

        assert_eq!(stats.mean, 300);
        assert_eq!(stats.min, 250);
        assert_eq!(stats.max, 350);
        // floor(2 * 0.95) = 1
        assert_eq!(stats.p95, 350);
    }

    #[test]
    fn test_p95_index_on_larger_sample() {
        let times: Vec<u64> = (1..=40).map(|i| i * 10).collect();
        let stats = summarize_load_times(&times);

        // floor(40 * 0.95) = 38 -> 390
        assert_eq!(stats.p95, 390);
        assert_eq!(stats.max, 400);
        assert_eq!(stats.mean, 205);
    }

    #[test]
    fn test_mean_rounds_half_up() {
        assert_eq!(summarize_load_times(&[1, 2]).mean, 2);
        assert_eq!(summarize_load_times(&[100, 101, 101]).mean, 101);
    }

    #[test]
    fn test_fold_history_evicts_oldest() {
        let capacity = 3;
        let mut history = VecDeque::new();
        for n in 1..=capacity as u64 {
            history = fold_history(history, create_test_point(n * 100), capacity);
        }
        assert_eq!(history.len(), capacity);

        let history = fold_history(history, create_test_point(400), capacity);

        assert_eq!(history.len(), capacity);
        let means: Vec<u64> = history.iter().map(|p| p.mean_ms).collect();
        assert_eq!(means, vec![200, 300, 400]);
    }

    #[test]
    fn test_fold_history_below_capacity_appends() {
        let history = fold_history(VecDeque::new(), create_test_point(120), 20);
        let history = fold_history(history, create_test_point(140), 20);

        assert_eq!(history.len(), 2);
        assert_eq!(history.back().map(|p| p.mean_ms), Some(140));
    }

    #[test]
    fn test_batch_average_counts_failures() {
        assert_eq!(batch_average(&create_test_batch(&[300, 0, 300])), 200);
        assert_eq!(batch_average(&create_test_batch(&[])), 0);
    }

    #[test]
    fn test_status_breakdown() {
        let breakdown = status_breakdown(&create_test_batch(&[120, 340, 510, 0, 610]));

        assert_eq!(breakdown.get(&MeasurementStatus::Good), Some(&1));
        assert_eq!(breakdown.get(&MeasurementStatus::Warning), Some(&1));
        assert_eq!(breakdown.get(&MeasurementStatus::Poor), Some(&2));
        assert_eq!(breakdown.get(&MeasurementStatus::Error), Some(&1));
    }

    #[test]
    fn test_slowest_region() {
        let batch = create_test_batch(&[120, 340, 610, 90]);
        let slowest = slowest_region(&batch).unwrap();

        assert_eq!(slowest.region_id, "eu-west");
        assert!(slowest_region(&create_test_batch(&[0, 0])).is_none());
    }
}
