//! Progress tracking for navigation legs
//!
//! A leg is "stalled" when its progress metric (planar distance to target, or
//! altitude while descending) has not shrunk by at least `epsilon` for a full
//! window. The caller re-commands the vehicle whenever [`StallDetector::observe`]
//! reports a stall; the window then restarts.

use std::time::Duration;

/// Stall detector over a metric that should decrease toward zero
#[derive(Debug, Clone, PartialEq)]
pub struct StallDetector {
    window: Duration,
    epsilon: f64,
    last_metric: Option<f64>,
    since: Duration,
    reissues: u32,
}

impl StallDetector {
    /// Start tracking at mission time `now`, usually when the command is issued
    pub fn new(window: Duration, epsilon: f64, now: Duration) -> Self {
        Self {
            window,
            epsilon,
            last_metric: None,
            since: now,
            reissues: 0,
        }
    }

    /// Feed one reading; `None` means the metric could not be measured.
    ///
    /// Returns `true` when the command should be reissued.
    pub fn observe(&mut self, metric: Option<f64>, now: Duration) -> bool {
        if let Some(metric) = metric {
            if let Some(previous) = self.last_metric {
                if previous - metric >= self.epsilon {
                    self.since = now;
                }
            }
            self.last_metric = Some(metric);
        }

        if now.saturating_sub(self.since) >= self.window {
            self.since = now;
            self.reissues += 1;
            true
        } else {
            false
        }
    }

    /// Number of stalls reported so far
    pub fn reissues(&self) -> u32 {
        self.reissues
    }
}
