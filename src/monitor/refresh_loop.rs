//! Timer-driven refresh loop.
//!
//! The loop is either idle or monitoring one target. Monitoring owns the
//! interval timer; only `start` arms it and only `stop` (or a restart) drops
//! it. A pass commits its batch to the context after sampling has finished,
//! so a tick future dropped mid-flight leaves the context untouched.

use crate::analysis::{batch_average, fold_history, summarize, DEFAULT_HISTORY_CAPACITY};
use crate::error::SampleError;
use crate::models::{HistoryPoint, MeasurementBatch, Snapshot, SummaryStats};
use crate::sampler::Sampler;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default refresh period.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Configuration for the refresh loop.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Time between two passes.
    pub interval: Duration,
    /// Maximum number of history points kept.
    pub history_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// State shared with presentation through snapshots.
#[derive(Debug, Clone, Default)]
pub struct MonitorContext {
    pub history: VecDeque<HistoryPoint>,
    pub last_batch: Option<MeasurementBatch>,
    pub last_stats: SummaryStats,
}

enum MonitorState {
    Idle,
    Monitoring { target: String, timer: Interval },
}

/// Drives a sampler on a fixed period while monitoring is active.
pub struct RefreshLoop<S> {
    sampler: S,
    config: MonitorConfig,
    state: MonitorState,
    context: MonitorContext,
    passes: usize,
}

impl<S: Sampler> RefreshLoop<S> {
    /// Create an idle loop.
    ///
    /// A zero interval falls back to [`DEFAULT_INTERVAL`] and the history
    /// capacity is at least one point.
    pub fn new(sampler: S, mut config: MonitorConfig) -> Self {
        if config.interval.is_zero() {
            warn!("Zero refresh interval, using {:?}", DEFAULT_INTERVAL);
            config.interval = DEFAULT_INTERVAL;
        }
        if config.history_capacity == 0 {
            warn!("Zero history capacity, keeping one point");
            config.history_capacity = 1;
        }

        Self {
            sampler,
            config,
            state: MonitorState::Idle,
            context: MonitorContext::default(),
            passes: 0,
        }
    }

    pub fn is_monitoring(&self) -> bool {
        matches!(self.state, MonitorState::Monitoring { .. })
    }

    /// Target captured by the last `start`, while monitoring.
    #[allow(dead_code)] // Inspection API
    pub fn target(&self) -> Option<&str> {
        match &self.state {
            MonitorState::Monitoring { target, .. } => Some(target),
            MonitorState::Idle => None,
        }
    }

    #[allow(dead_code)] // Inspection API
    pub fn context(&self) -> &MonitorContext {
        &self.context
    }

    /// Number of committed passes since the loop was created.
    pub fn passes(&self) -> usize {
        self.passes
    }

    pub fn sampler_name(&self) -> &'static str {
        self.sampler.name()
    }

    /// Begin monitoring `target`.
    ///
    /// Performs one immediate pass, then clears the history and commits it
    /// as the first point. The timer is armed after that pass, so the first
    /// tick fires one period later. Calling `start` while already monitoring
    /// restarts the cycle. When the first pass fails the loop is left idle
    /// and the previous context is kept as it was.
    pub async fn start(&mut self, target: &str) -> Result<Snapshot, SampleError> {
        if let MonitorState::Monitoring { target: previous, .. } = &self.state {
            info!("Restarting monitoring ({} -> {})", previous, target);
        }
        self.state = MonitorState::Idle;

        info!(
            "Monitoring {} with {} sampler every {:?}",
            target,
            self.sampler.name(),
            self.config.interval
        );

        let batch = self.sampler.sample(target).await?;
        self.context.history.clear();
        let snapshot = self.commit(target, batch);

        let period = self.config.interval;
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.state = MonitorState::Monitoring {
            target: target.to_string(),
            timer,
        };

        Ok(snapshot)
    }

    /// Wait for the next timer tick and perform one pass.
    ///
    /// Returns `None` right away when idle.
    pub async fn tick(&mut self) -> Option<Result<Snapshot, SampleError>> {
        let target = match &mut self.state {
            MonitorState::Idle => return None,
            MonitorState::Monitoring { target, timer } => {
                timer.tick().await;
                target.clone()
            }
        };

        debug!("Tick {} for {}", self.passes + 1, target);

        match self.sampler.sample(&target).await {
            Ok(batch) => Some(Ok(self.commit(&target, batch))),
            Err(e) => {
                warn!("Sampling pass failed: {}", e);
                Some(Err(e))
            }
        }
    }

    /// Stop monitoring. Returns whether the loop was monitoring.
    ///
    /// The last snapshot stays available.
    pub fn stop(&mut self) -> bool {
        let was_monitoring = self.is_monitoring();
        if was_monitoring {
            info!("Monitoring stopped after {} passes", self.passes);
        }
        self.state = MonitorState::Idle;
        was_monitoring
    }

    /// Perform one pass without entering the monitoring state.
    ///
    /// The result is folded into the existing history.
    pub async fn run_once(&mut self, target: &str) -> Result<Snapshot, SampleError> {
        self.stop();
        let batch = self.sampler.sample(target).await?;
        Ok(self.commit(target, batch))
    }

    /// Last committed snapshot, if any pass has completed.
    pub fn snapshot(&self) -> Option<Snapshot> {
        let batch = self.context.last_batch.clone()?;
        Some(Snapshot {
            target: batch.target.clone(),
            batch,
            stats: self.context.last_stats,
            history: self.context.history.iter().cloned().collect(),
        })
    }

    fn commit(&mut self, target: &str, batch: MeasurementBatch) -> Snapshot {
        let stats = summarize(&batch);
        let point = HistoryPoint::from_pass(&batch, &stats, batch_average(&batch));

        let history = std::mem::take(&mut self.context.history);
        self.context.history = fold_history(history, point, self.config.history_capacity);
        self.context.last_stats = stats;
        self.passes += 1;

        debug!(
            "{}: mean {}ms, min {}ms, max {}ms, p95 {}ms",
            target, stats.mean, stats.min, stats.max, stats.p95
        );

        let snapshot = Snapshot {
            target: target.to_string(),
            batch: batch.clone(),
            stats,
            history: self.context.history.iter().cloned().collect(),
        };
        self.context.last_batch = Some(batch);
        snapshot
    }
}
