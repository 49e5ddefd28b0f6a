//! Markdown and JSON report generation.
//!
//! This module turns a finished run into a report file.

use crate::analysis::{slowest_region, status_breakdown};
use crate::models::{
    HistoryPoint, MeasurementBatch, MeasurementStatus, RunMetadata, RunReport, Snapshot,
    SummaryStats, WARNING_THRESHOLD_MS,
};
use anyhow::Result;

/// General optimisation tips appended to every report.
const OPTIMISATION_TIPS: [&str; 3] = [
    "CDN usage: distribute content globally to reduce latency.",
    "Caching: implement smart caching strategies.",
    "Compression: enable Brotli/Gzip compression.",
];

/// Build recommendations from the last snapshot of a run.
///
/// Findings derived from the measurements come first; the general
/// optimisation tips follow when `include_tips` is set.
pub fn recommendations(snapshot: &Snapshot, include_tips: bool) -> Vec<String> {
    let mut items = Vec::new();
    let batch = &snapshot.batch;

    if snapshot.stats.p95 >= WARNING_THRESHOLD_MS {
        items.push(format!(
            "P95 load time is {}ms, at or above the {}ms warning threshold.",
            snapshot.stats.p95, WARNING_THRESHOLD_MS
        ));
    }

    let failures = batch
        .measurements
        .iter()
        .filter(|m| m.status.is_failure())
        .count();
    if failures > 0 {
        items.push(format!(
            "{} of {} regions failed in the last pass; check availability from those regions.",
            failures,
            batch.len()
        ));
    }

    if let Some(slowest) = slowest_region(batch) {
        if slowest.load_time_ms >= WARNING_THRESHOLD_MS {
            items.push(format!(
                "{} is the slowest region at {}ms; consider an edge location closer to it.",
                slowest.region_name, slowest.load_time_ms
            ));
        }
    }

    if include_tips {
        items.extend(OPTIMISATION_TIPS.iter().map(|tip| tip.to_string()));
    }

    items
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &RunReport) -> String {
    let mut output = String::new();
    let snapshot = &report.snapshot;

    output.push_str("# Pulsewatch Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(&snapshot.stats, snapshot.batch.score));
    output.push_str(&generate_regions_section(&snapshot.batch));
    output.push_str(&generate_audits_section(&snapshot.batch));
    output.push_str(&generate_history_section(&snapshot.history));
    output.push_str(&generate_recommendations_section(&report.recommendations));
    output.push_str("---\n\n*Report generated by Pulsewatch*\n");

    output
}

fn generate_metadata_section(metadata: &RunMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Target:** {}\n", metadata.target));
    section.push_str(&format!("- **Source:** `{}`\n", metadata.source));
    section.push_str(&format!(
        "- **Started:** {}\n",
        metadata.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Passes:** {}\n", metadata.passes));
    section.push_str(&format!(
        "- **Interval:** {}s\n",
        metadata.interval_seconds
    ));
    section.push_str(&format!(
        "- **History Capacity:** {} points\n",
        metadata.history_capacity
    ));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n\n",
        metadata.duration_seconds
    ));

    section
}

fn generate_summary_section(stats: &SummaryStats, score: Option<u8>) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Average | Min | Max | P95 |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {}ms | {}ms | {}ms | {}ms |\n\n",
        stats.mean, stats.min, stats.max, stats.p95
    ));

    if let Some(score) = score {
        section.push_str(&format!("**Performance score:** {}/100\n\n", score));
    }

    section
}

fn generate_regions_section(batch: &MeasurementBatch) -> String {
    let mut section = String::new();

    section.push_str("## Regional Performance\n\n");
    section.push_str("| Region | Load Time | Status |\n");
    section.push_str("|:---|:---:|:---:|\n");
    for m in &batch.measurements {
        let value = if m.status == MeasurementStatus::Error {
            "-".to_string()
        } else {
            format!("{}ms", m.load_time_ms)
        };
        section.push_str(&format!(
            "| {} (`{}`) | {} | {} {} |\n",
            m.region_name,
            m.region_id,
            value,
            m.status.emoji(),
            m.status
        ));
    }
    section.push('\n');

    section.push_str("### Status Breakdown\n\n");
    section.push_str("| Status | Regions |\n");
    section.push_str("|:---|:---:|\n");
    for (status, count) in status_breakdown(batch) {
        section.push_str(&format!("| {} {} | {} |\n", status.emoji(), status, count));
    }
    section.push('\n');

    section
}

fn generate_audits_section(batch: &MeasurementBatch) -> String {
    if batch.audits.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Report Audits\n\n");
    section.push_str("| Audit | Value |\n");
    section.push_str("|:---|:---:|\n");
    for audit in &batch.audits {
        section.push_str(&format!("| {} | {} |\n", audit.title, audit.display_value));
    }
    section.push('\n');

    section
}

fn generate_history_section(history: &[HistoryPoint]) -> String {
    if history.is_empty() {
        return String::new();
    }

    let with_score = history.iter().any(|p| p.score.is_some());
    let mut section = String::new();

    section.push_str("## Trend\n\n");
    if with_score {
        section.push_str("| Time | Average (all regions) | Mean | Score |\n");
        section.push_str("|:---|:---:|:---:|:---:|\n");
    } else {
        section.push_str("| Time | Average (all regions) | Mean |\n");
        section.push_str("|:---|:---:|:---:|\n");
    }

    for point in history {
        let mut row = format!(
            "| {} | {}ms | {}ms |",
            point.label, point.load_time_ms, point.mean_ms
        );
        if with_score {
            match point.score {
                Some(score) => row.push_str(&format!(" {} |", score)),
                None => row.push_str(" - |"),
            }
        }
        row.push('\n');
        section.push_str(&row);
    }
    section.push('\n');

    section
}

fn generate_recommendations_section(recommendations: &[String]) -> String {
    if recommendations.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Recommendations\n\n");
    for (i, rec) in recommendations.iter().enumerate() {
        section.push_str(&format!("{}. {}\n", i + 1, rec));
    }
    section.push('\n');

    section
}

/// Generate a JSON report.
pub fn generate_json_report(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
