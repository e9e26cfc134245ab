//! Periodic ticker for Fourline's background loops.
//!
//! Three kinds of loop run on a timer: the registry's disconnect sweep
//! (every 30s), the queue coordinator's matching pass (every 1s), and each
//! bot driver's turn poll (every 1s). They all use a [`Ticker`].
//!
//! # Disabled mode
//!
//! A period of zero disables the ticker: [`Ticker::wait_for_tick`] pends
//! forever. Inside a `tokio::select!` the other branches keep running, so
//! turning a loop off is a config change, not a code change.
//!
//! # Integration
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         _ = ticker.wait_for_tick() => {
//!             run_pass().await;
//!             ticker.record_tick_end();
//!         }
//!     }
//! }
//! ```
//!
//! All timing uses [`tokio::time::Instant`], so tests running under
//! `start_paused = true` see exact, repeatable tick times.

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when a tick fires late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPolicy {
    /// Count the missed ticks and schedule the next one a full period
    /// from now.
    #[default]
    Skip,
    /// Keep the original cadence: the next tick is one period after the
    /// missed deadline, even if that is already in the past.
    Fixed,
}

/// Ticker configuration.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Time between ticks. `Duration::ZERO` disables the ticker.
    pub period: Duration,
    pub policy: TickPolicy,
    /// Random delay (`0..initial_jitter`) added before the first tick so
    /// loops started together don't fire together.
    pub initial_jitter: Duration,
    /// Fraction of the period (0.0–1.0) a tick's work may take before a
    /// warning is logged.
    pub budget_warn_threshold: f64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            period: Duration::ZERO,
            policy: TickPolicy::default(),
            initial_jitter: Duration::ZERO,
            budget_warn_threshold: 0.80,
        }
    }
}

impl TickConfig {
    /// A config that ticks every `period` with no jitter.
    pub fn every(period: Duration) -> Self {
        Self {
            period,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values. Called by [`Ticker::new`].
    ///
    /// - `budget_warn_threshold` clamped to `0.0..=1.0`
    /// - `initial_jitter` capped at one period
    pub fn validated(mut self) -> Self {
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        if self.initial_jitter > self.period {
            self.initial_jitter = self.period;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Tick info / metrics
// ---------------------------------------------------------------------------

/// Returned by [`Ticker::wait_for_tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickInfo {
    /// Starts at 1.
    pub tick: u64,
    /// `true` if the tick fired more than 10% of a period late.
    pub overrun: bool,
    /// Whole periods missed (only counted under [`TickPolicy::Skip`]).
    pub ticks_skipped: u64,
}

/// Running totals for one ticker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickMetrics {
    pub total_ticks: u64,
    pub total_overruns: u64,
    pub total_skipped: u64,
    /// Longest work time reported via [`Ticker::record_tick_end`].
    pub max_tick_time: Duration,
    pub last_tick_time: Duration,
}

// ---------------------------------------------------------------------------
// Ticker
// ---------------------------------------------------------------------------

/// A periodic timer for one background loop.
pub struct Ticker {
    config: TickConfig,
    label: &'static str,
    tick_count: u64,
    next_tick: Option<Instant>,
    tick_start: Option<Instant>,
    metrics: TickMetrics,
}

impl Ticker {
    /// Creates a ticker. The first tick is one period (plus jitter) away.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let next_tick = (!config.period.is_zero()).then(|| {
            let jitter = if config.initial_jitter.is_zero() {
                Duration::ZERO
            } else {
                rand::rng().random_range(Duration::ZERO..config.initial_jitter)
            };
            Instant::now() + config.period + jitter
        });

        Self {
            config,
            label: "ticker",
            tick_count: 0,
            next_tick,
            tick_start: None,
            metrics: TickMetrics::default(),
        }
    }

    /// Shorthand for `Ticker::new(TickConfig::every(period))`.
    pub fn every(period: Duration) -> Self {
        Self::new(TickConfig::every(period))
    }

    /// Names the loop in log output.
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        if self.is_disabled() {
            debug!(ticker = label, "ticker disabled (zero period)");
        } else {
            debug!(
                ticker = label,
                period_ms = self.config.period.as_millis() as u64,
                policy = ?self.config.policy,
                "ticker created"
            );
        }
        self
    }

    /// Waits for the next tick.
    ///
    /// Pends forever when disabled. Cancel-safe: dropping the
    /// future before it resolves leaves the schedule untouched.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let next = match self.next_tick {
            Some(next) => next,
            None => std::future::pending().await,
        };

        time::sleep_until(next).await;

        let period = self.config.period;
        let now = Instant::now();
        self.tick_count += 1;
        self.tick_start = Some(now);

        let late_by = now.saturating_duration_since(next);
        let overrun = late_by > period / 10;
        let mut ticks_skipped = 0;

        self.next_tick = Some(match self.config.policy {
            TickPolicy::Skip => {
                if overrun {
                    ticks_skipped = (late_by.as_nanos() / period.as_nanos()) as u64;
                    if ticks_skipped > 0 {
                        warn!(
                            ticker = self.label,
                            tick = self.tick_count,
                            skipped = ticks_skipped,
                            late_ms = late_by.as_millis() as u64,
                            "ticker fell behind, skipping ahead"
                        );
                    }
                }
                now + period
            }
            TickPolicy::Fixed => next + period,
        });

        if overrun {
            self.metrics.total_overruns += 1;
        }
        self.metrics.total_skipped += ticks_skipped;
        self.metrics.total_ticks += 1;

        trace!(ticker = self.label, tick = self.tick_count, overrun, "tick");

        TickInfo {
            tick: self.tick_count,
            overrun,
            ticks_skipped,
        }
    }

    /// Reports that the work for the current tick is done.
    ///
    /// Feeds the metrics and warns if the work used more than the
    /// configured share of the period. A no-op without a preceding tick.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let elapsed = start.elapsed();
        self.metrics.last_tick_time = elapsed;
        self.metrics.max_tick_time = self.metrics.max_tick_time.max(elapsed);

        let period = self.config.period;
        if !period.is_zero() {
            let used = elapsed.as_secs_f64() / period.as_secs_f64();
            if used >= self.config.budget_warn_threshold {
                warn!(
                    ticker = self.label,
                    tick = self.tick_count,
                    elapsed_ms = elapsed.as_millis() as u64,
                    period_ms = period.as_millis() as u64,
                    "tick work is close to its period"
                );
            }
        }
    }

    /// `true` when the period is zero.
    pub fn is_disabled(&self) -> bool {
        self.next_tick.is_none()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn period(&self) -> Duration {
        self.config.period
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }
}
