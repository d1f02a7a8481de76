use serde::{Deserialize, Serialize};

/// Running counters kept by the engine. Every field only ever grows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    pub arrivals: u64,
    pub served: u64,
    pub abandoned: u64,
    pub rejected: u64,
    /// Sum of hours spent queueing by dispatched clients
    pub wait_time_sum: f64,
    /// Integral of the busy fraction of the pool over time
    pub busy_time_sum: f64,
    pub max_queue_length: usize,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_arrival(&mut self) {
        self.arrivals += 1;
    }

    pub(crate) fn record_rejection(&mut self) {
        self.rejected += 1;
    }

    pub(crate) fn record_abandonments(&mut self, count: u64) {
        self.abandoned += count;
    }

    pub(crate) fn record_served(&mut self) {
        self.served += 1;
    }

    pub(crate) fn record_wait(&mut self, hours: f64) {
        self.wait_time_sum += hours.max(0.0);
    }

    pub(crate) fn record_busy_fraction(&mut self, busy: usize, servers: usize, dt: f64) {
        if servers > 0 {
            self.busy_time_sum += (busy as f64 / servers as f64) * dt;
        }
    }

    pub(crate) fn observe_queue_length(&mut self, len: usize) {
        self.max_queue_length = self.max_queue_length.max(len);
    }

    /// Busy fraction averaged over `elapsed` hours; 0 before any time passes
    pub fn utilization(&self, elapsed: f64) -> f64 {
        if elapsed > 0.0 {
            self.busy_time_sum / elapsed
        } else {
            0.0
        }
    }

    /// Mean wait of served clients in minutes
    pub fn avg_wait_minutes(&self) -> f64 {
        if self.served > 0 {
            (self.wait_time_sum / self.served as f64) * 60.0
        } else {
            0.0
        }
    }
}

/// Read-only view of the engine's statistics. All fields are always
/// present; those that do not apply to a configuration stay at zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub pref_queue_len: usize,
    pub gen_queue_len: usize,
    pub arrivals: u64,
    pub served: u64,
    pub abandoned: u64,
    pub rejected: u64,
    pub wait_time_sum: f64,
    pub busy_time_sum: f64,
    pub max_queue_length: usize,
    pub utilization: f64,
    pub avg_wait_minutes: f64,
    pub overtime_hours: f64,
    pub ticket_price: f64,
    pub cost_per_client: f64,
}

impl StatsSnapshot {
    pub fn queued(&self) -> usize {
        self.pref_queue_len + self.gen_queue_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_metrics_default_to_zero() {
        let stats = Statistics::new();
        assert_eq!(stats.utilization(0.0), 0.0);
        assert_eq!(stats.avg_wait_minutes(), 0.0);
    }

    #[test]
    fn test_average_wait_in_minutes() {
        let mut stats = Statistics::new();
        stats.record_wait(0.5);
        stats.record_wait(0.25);
        stats.record_served();
        stats.record_served();
        stats.record_served();
        assert!((stats.avg_wait_minutes() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_busy_fraction_and_watermark() {
        let mut stats = Statistics::new();
        stats.record_busy_fraction(1, 2, 1.0);
        stats.record_busy_fraction(2, 2, 1.0);
        assert!((stats.utilization(2.0) - 0.75).abs() < 1e-12);

        stats.observe_queue_length(4);
        stats.observe_queue_length(2);
        assert_eq!(stats.max_queue_length, 4);
    }
}
