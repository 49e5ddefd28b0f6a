//! Terminal dashboard rendering.

use crate::models::{HistoryPoint, Measurement, MeasurementStatus, Snapshot};

/// Load time that fills a whole bar.
pub const BAR_SCALE_MS: u64 = 600;

/// Width of a region bar in characters.
const BAR_WIDTH: usize = 30;

/// Number of trend points shown in the terminal.
const TREND_POINTS: usize = 8;

/// Render a snapshot as a terminal dashboard.
pub fn render_console(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let stats = &snapshot.stats;

    out.push_str(&format!(
        "\n📈 {} ({})\n",
        snapshot.target,
        snapshot.batch.taken_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!(
        "   Avg {}ms | Min {}ms | Max {}ms | P95 {}ms\n",
        stats.mean, stats.min, stats.max, stats.p95
    ));
    if let Some(score) = snapshot.batch.score {
        out.push_str(&format!("   Performance score: {}/100\n", score));
    }

    out.push_str("\n🌍 Regional Performance\n");
    let name_width = snapshot
        .batch
        .measurements
        .iter()
        .map(|m| m.region_name.len())
        .max()
        .unwrap_or(0);
    for measurement in &snapshot.batch.measurements {
        out.push_str(&region_line(measurement, name_width));
    }

    if !snapshot.batch.audits.is_empty() {
        out.push_str("\n🔎 Report Audits\n");
        for audit in &snapshot.batch.audits {
            out.push_str(&format!("   {}: {}\n", audit.title, audit.display_value));
        }
    }

    if !snapshot.history.is_empty() {
        out.push_str("\n📉 Trend\n");
        out.push_str(&trend_line(&snapshot.history));
    }

    out
}

fn region_line(measurement: &Measurement, name_width: usize) -> String {
    let value = if measurement.status == MeasurementStatus::Error {
        "error".to_string()
    } else {
        format!("{}ms", measurement.load_time_ms)
    };

    format!(
        "   {:<width$}  {}  {:>7} {}\n",
        measurement.region_name,
        bar(measurement.load_time_ms),
        value,
        measurement.status.emoji(),
        width = name_width
    )
}

/// A fixed-width bar proportional to the load time, capped at full width.
fn bar(load_time_ms: u64) -> String {
    let filled = ((load_time_ms.min(BAR_SCALE_MS) as f64 / BAR_SCALE_MS as f64)
        * BAR_WIDTH as f64)
        .round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

fn trend_line(history: &[HistoryPoint]) -> String {
    let start = history.len().saturating_sub(TREND_POINTS);
    let points: Vec<String> = history[start..]
        .iter()
        .map(|p| format!("{} {}ms", p.label, p.load_time_ms))
        .collect();

    format!("   {}\n", points.join(" → "))
}
