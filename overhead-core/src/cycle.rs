//! Refresh-cycle state machine.
//!
//! A cycle is one round of schedule lookup plus render trigger, started at
//! most once per minimum alert interval. The refresh pulse is an edge
//! detector on the rendered asset's modification time: once the asset is newer
//! than the baseline captured at cycle start, `refresh` is asserted for a
//! bounded window, and only once per distinct flight.
//!
//! Pure logic. The caller supplies `now` and the asset mtime each tick.
//!
//! ```text
//! Idle ──start──▶ CycleActive ──next tick──▶ WaitingForRenderSignal
//!   ▲                                              │ asset mtime > baseline
//!   └──────── window elapsed ◀── RefreshAsserted ◀─┘
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

pub const DEFAULT_MIN_ALERT_INTERVAL_SECS: i64 = 60;
pub const DEFAULT_REFRESH_WINDOW_MS: i64 = 13_000;

/// Observable phase of the cycle, for logs and the status API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Idle,
    CycleActive,
    WaitingForRenderSignal,
    RefreshAsserted,
}

impl std::fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CyclePhase::Idle => write!(f, "idle"),
            CyclePhase::CycleActive => write!(f, "cycle active"),
            CyclePhase::WaitingForRenderSignal => write!(f, "waiting for render"),
            CyclePhase::RefreshAsserted => write!(f, "refresh asserted"),
        }
    }
}

/// Cycle timers and flags. One instance, owned by the loop.
#[derive(Debug, Clone)]
pub struct RefreshCycle {
    min_interval: Duration,
    refresh_window: Duration,

    last_cycle_start: Option<DateTime<Utc>>,
    refresh_ready: bool,
    refresh_ready_at: Option<DateTime<Utc>>,
    /// The render for the current cycle landed and its window is over.
    render_settled: bool,
    baseline_mtime: Option<DateTime<Utc>>,
    last_alerted_flight: Option<String>,
}

impl Default for RefreshCycle {
    fn default() -> Self {
        RefreshCycle::new(
            Duration::seconds(DEFAULT_MIN_ALERT_INTERVAL_SECS),
            Duration::milliseconds(DEFAULT_REFRESH_WINDOW_MS),
        )
    }
}

impl RefreshCycle {
    pub fn new(min_interval: Duration, refresh_window: Duration) -> Self {
        RefreshCycle {
            min_interval,
            refresh_window,
            last_cycle_start: None,
            refresh_ready: false,
            refresh_ready_at: None,
            render_settled: false,
            baseline_mtime: None,
            last_alerted_flight: None,
        }
    }

    /// No cycle yet, or the previous one started at least `min_interval` ago.
    pub fn should_start(&self, now: DateTime<Utc>) -> bool {
        match self.last_cycle_start {
            None => true,
            Some(start) => now - start >= self.min_interval,
        }
    }

    /// Start a cycle if the throttle allows it. Returns whether one started.
    ///
    /// `asset_mtime` is the rendered asset's modification time right now; it
    /// becomes the baseline the pulse compares against.
    pub fn try_start(&mut self, now: DateTime<Utc>, asset_mtime: Option<DateTime<Utc>>) -> bool {
        if !self.should_start(now) {
            return false;
        }
        self.last_cycle_start = Some(now);
        self.refresh_ready = false;
        self.refresh_ready_at = None;
        self.render_settled = false;
        self.baseline_mtime = asset_mtime;
        true
    }

    /// Evaluate the refresh pulse for this tick.
    ///
    /// `subject_flight` is the selected aircraft's flight identifier, `None`
    /// when nothing is eligible.
    pub fn pulse(
        &mut self,
        now: DateTime<Utc>,
        subject_flight: Option<&str>,
        within_schedule: bool,
        asset_mtime: Option<DateTime<Utc>>,
    ) -> bool {
        let flight = match subject_flight {
            Some(f) if within_schedule => f,
            _ => {
                self.last_alerted_flight = None;
                return false;
            }
        };

        let delivered = self.last_alerted_flight.as_deref() == Some(flight);
        if delivered && !self.refresh_ready {
            if asset_mtime > self.baseline_mtime {
                self.render_settled = true;
            }
            return false;
        }

        if !self.refresh_ready && self.last_cycle_start.is_some() && asset_mtime > self.baseline_mtime {
            self.refresh_ready = true;
            self.refresh_ready_at = Some(now);
        }

        if let (true, Some(ready_at)) = (self.refresh_ready, self.refresh_ready_at) {
            if now - ready_at <= self.refresh_window {
                self.last_alerted_flight = Some(flight.to_string());
                return true;
            }
            self.refresh_ready = false;
            self.refresh_ready_at = None;
            self.render_settled = true;
        }
        false
    }

    pub fn phase(&self, now: DateTime<Utc>) -> CyclePhase {
        let start = match self.last_cycle_start {
            Some(s) => s,
            None => return CyclePhase::Idle,
        };
        if let (true, Some(ready_at)) = (self.refresh_ready, self.refresh_ready_at) {
            if now - ready_at <= self.refresh_window {
                return CyclePhase::RefreshAsserted;
            }
        }
        if self.render_settled {
            CyclePhase::Idle
        } else if now == start {
            CyclePhase::CycleActive
        } else if now - start < self.min_interval && self.refresh_ready_at.is_none() {
            CyclePhase::WaitingForRenderSignal
        } else {
            CyclePhase::Idle
        }
    }

    pub fn last_cycle_start(&self) -> Option<DateTime<Utc>> {
        self.last_cycle_start
    }

    pub fn baseline_mtime(&self) -> Option<DateTime<Utc>> {
        self.baseline_mtime
    }

    pub fn is_refresh_ready(&self) -> bool {
        self.refresh_ready
    }

    pub fn last_alerted_flight(&self) -> Option<&str> {
        self.last_alerted_flight.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
