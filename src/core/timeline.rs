use super::stats::StatsSnapshot;
use serde::{Deserialize, Serialize};

/// Default spacing between chart samples, in simulation hours
pub const DEFAULT_SAMPLE_INTERVAL_HOURS: f64 = 0.2;
/// Default number of samples shown by the live chart
pub const DEFAULT_WINDOW: usize = 50;

/// Format simulation hours as a wall-clock style `HH:MM` label
pub fn format_clock(hours: f64) -> String {
    let total_minutes = (hours.max(0.0) * 60.0).floor() as u64;
    format!("{:02}:{:02}", total_minutes / 60, total_minutes % 60)
}

/// Queue lengths at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSample {
    pub clock_hours: f64,
    pub label: String,
    pub preferential: usize,
    pub general: usize,
}

/// Throttled history of queue lengths for the live and final charts
#[derive(Debug, Clone)]
pub struct Timeline {
    samples: Vec<QueueSample>,
    sample_interval: f64,
    window: usize,
    next_sample_at: f64,
}

impl Timeline {
    pub fn new() -> Self {
        Self::with_interval(DEFAULT_SAMPLE_INTERVAL_HOURS, DEFAULT_WINDOW)
    }

    pub fn with_interval(sample_interval: f64, window: usize) -> Self {
        Self {
            samples: Vec::new(),
            sample_interval: sample_interval.max(0.0),
            window: window.max(1),
            next_sample_at: 0.0,
        }
    }

    /// Record a sample if `elapsed_hours` has reached the next sampling
    /// point. Returns true when a sample was taken.
    pub fn observe(&mut self, elapsed_hours: f64, stats: &StatsSnapshot) -> bool {
        if elapsed_hours < self.next_sample_at {
            return false;
        }
        self.samples.push(QueueSample {
            clock_hours: elapsed_hours,
            label: format_clock(elapsed_hours),
            preferential: stats.pref_queue_len,
            general: stats.gen_queue_len,
        });
        if self.sample_interval > 0.0 {
            let periods = (elapsed_hours / self.sample_interval).floor() + 1.0;
            self.next_sample_at = periods * self.sample_interval;
        } else {
            self.next_sample_at = elapsed_hours;
        }
        true
    }

    /// Trailing samples for the live chart
    pub fn window(&self) -> &[QueueSample] {
        let start = self.samples.len().saturating_sub(self.window);
        &self.samples[start..]
    }

    /// Every sample taken, for the end-of-run chart
    pub fn samples(&self) -> &[QueueSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.next_sample_at = 0.0;
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}
