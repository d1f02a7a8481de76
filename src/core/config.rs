//! Configuration for a queueing simulation run
//!
//! The engine trusts these values. Use [`EngineConfig::validate`] to reject
//! bad input or [`EngineConfig::sanitized`] to coerce it to defaults before
//! constructing an engine.

use log::warn;
use serde::{Deserialize, Serialize};

/// Whether the behavioural (reneging / balking) rules run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Standard,
    /// Clients renege when impatient and may balk at crowded lines
    Psych,
}

impl Mode {
    pub fn reneging_enabled(&self) -> bool {
        matches!(self, Mode::Psych)
    }
}

/// How many stations are reserved for VIP clients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VipServers {
    /// Fixed number of stations
    Count(usize),
    /// Fraction of the pool, rounded to the nearest station
    Density(f64),
}

impl VipServers {
    /// Resolve to a station count for a pool of `servers`.
    /// Always within `[0, servers]` and zero for a single-station pool.
    pub fn resolve(&self, servers: usize) -> usize {
        if servers <= 1 {
            return 0;
        }
        let count = match *self {
            VipServers::Count(n) => n,
            VipServers::Density(ratio) if ratio.is_finite() && ratio > 0.0 => {
                (servers as f64 * ratio).round() as usize
            }
            VipServers::Density(_) => 0,
        };
        count.min(servers)
    }
}

impl Default for VipServers {
    fn default() -> Self {
        VipServers::Count(1)
    }
}

/// Share of arrivals that are VIP clients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VipArrivals {
    Probability(f64),
    Percent(f64),
}

impl VipArrivals {
    /// Probability in `[0, 1]`
    pub fn probability(&self) -> f64 {
        let p = match *self {
            VipArrivals::Probability(p) => p,
            VipArrivals::Percent(pct) => pct / 100.0,
        };
        if p.is_finite() {
            p.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl Default for VipArrivals {
    fn default() -> Self {
        VipArrivals::Percent(5.0)
    }
}

/// Behavioural constants that have no obviously correct value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Chance of turning an arrival away once the lines are over tolerance
    pub shed_probability: f64,
    /// Length gap between general lines that triggers a move
    pub rebalance_threshold: usize,
    /// Patience is drawn uniformly within `base × (1 ± spread)`
    pub patience_spread: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            shed_probability: 0.7,
            rebalance_threshold: 2,
            patience_spread: 0.2,
        }
    }
}

/// Engine construction parameters. Rates are per hour, times in hours
/// unless the field name says otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Clients per hour
    pub arrival_rate: f64,
    /// Clients per hour per station
    pub service_rate: f64,
    pub server_count: usize,
    pub general_queue_count: usize,
    /// Closing time; `f64::INFINITY` keeps the doors open forever
    pub operating_hours: f64,
    pub vip_servers: VipServers,
    pub vip_arrivals: VipArrivals,
    pub ticket_price: f64,
    pub cost_per_client: f64,
    pub patience_base_minutes: f64,
    /// Queued clients per general line before arrivals start balking
    pub abandon_tolerance: f64,
    pub mode: Mode,
    pub tuning: Tuning,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            arrival_rate: 25.0,
            service_rate: 12.0,
            server_count: 4,
            general_queue_count: 3,
            operating_hours: 8.0,
            vip_servers: VipServers::default(),
            vip_arrivals: VipArrivals::default(),
            ticket_price: 20.0,
            cost_per_client: 0.5,
            patience_base_minutes: 15.0,
            abandon_tolerance: 10.0,
            mode: Mode::Standard,
            tuning: Tuning::default(),
        }
    }
}

/// Rejected configuration values
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A rate was negative or not finite
    InvalidRate(&'static str, f64),
    /// A count that must be at least one was zero
    ZeroCount(&'static str),
    /// Operating hours negative or NaN
    InvalidHours(f64),
    /// A probability outside `[0, 1]`
    InvalidProbability(&'static str, f64),
    /// Any other out-of-range value
    OutOfRange(&'static str, f64),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidRate(name, v) => write!(f, "Invalid rate {}: {}", name, v),
            ConfigError::ZeroCount(name) => write!(f, "{} must be at least 1", name),
            ConfigError::InvalidHours(v) => write!(f, "Invalid operating hours: {}", v),
            ConfigError::InvalidProbability(name, v) => {
                write!(f, "Probability {} must be within [0, 1]: {}", name, v)
            }
            ConfigError::OutOfRange(name, v) => write!(f, "Value out of range for {}: {}", name, v),
        }
    }
}

impl std::error::Error for ConfigError {}

fn valid_rate(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_arrival_rate(mut self, rate: f64) -> Self {
        self.arrival_rate = rate;
        self
    }

    pub fn with_service_rate(mut self, rate: f64) -> Self {
        self.service_rate = rate;
        self
    }

    pub fn with_servers(mut self, count: usize) -> Self {
        self.server_count = count;
        self
    }

    pub fn with_general_queues(mut self, count: usize) -> Self {
        self.general_queue_count = count;
        self
    }

    pub fn with_operating_hours(mut self, hours: f64) -> Self {
        self.operating_hours = hours;
        self
    }

    pub fn with_vip_servers(mut self, vip: VipServers) -> Self {
        self.vip_servers = vip;
        self
    }

    pub fn with_vip_arrivals(mut self, vip: VipArrivals) -> Self {
        self.vip_arrivals = vip;
        self
    }

    /// Shorthand for a run without any VIP stations or clients
    pub fn without_vip(self) -> Self {
        self.with_vip_servers(VipServers::Count(0))
            .with_vip_arrivals(VipArrivals::Probability(0.0))
    }

    pub fn with_pricing(mut self, ticket_price: f64, cost_per_client: f64) -> Self {
        self.ticket_price = ticket_price;
        self.cost_per_client = cost_per_client;
        self
    }

    pub fn with_patience_minutes(mut self, minutes: f64) -> Self {
        self.patience_base_minutes = minutes;
        self
    }

    pub fn with_abandon_tolerance(mut self, tolerance: f64) -> Self {
        self.abandon_tolerance = tolerance;
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_tuning(mut self, tuning: Tuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// VIP station count for this pool size
    pub fn vip_server_count(&self) -> usize {
        self.vip_servers.resolve(self.server_count.max(1))
    }

    /// Patience base in hours
    pub fn patience_base_hours(&self) -> f64 {
        self.patience_base_minutes / 60.0
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !valid_rate(self.arrival_rate) {
            return Err(ConfigError::InvalidRate("arrival_rate", self.arrival_rate));
        }
        if !valid_rate(self.service_rate) {
            return Err(ConfigError::InvalidRate("service_rate", self.service_rate));
        }
        if self.server_count == 0 {
            return Err(ConfigError::ZeroCount("server_count"));
        }
        if self.general_queue_count == 0 {
            return Err(ConfigError::ZeroCount("general_queue_count"));
        }
        if self.operating_hours.is_nan() || self.operating_hours < 0.0 {
            return Err(ConfigError::InvalidHours(self.operating_hours));
        }
        let p = match self.vip_arrivals {
            VipArrivals::Probability(p) => p,
            VipArrivals::Percent(pct) => pct / 100.0,
        };
        if !(0.0..=1.0).contains(&p) {
            return Err(ConfigError::InvalidProbability("vip_arrivals", p));
        }
        if let VipServers::Density(ratio) = self.vip_servers {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(ConfigError::OutOfRange("vip_servers", ratio));
            }
        }
        if !(0.0..=1.0).contains(&self.tuning.shed_probability) {
            return Err(ConfigError::InvalidProbability(
                "shed_probability",
                self.tuning.shed_probability,
            ));
        }
        if !(0.0..=1.0).contains(&self.tuning.patience_spread) {
            return Err(ConfigError::OutOfRange(
                "patience_spread",
                self.tuning.patience_spread,
            ));
        }
        if self.mode.reneging_enabled() {
            if !self.patience_base_minutes.is_finite() || self.patience_base_minutes <= 0.0 {
                return Err(ConfigError::OutOfRange(
                    "patience_base_minutes",
                    self.patience_base_minutes,
                ));
            }
            if !self.abandon_tolerance.is_finite() || self.abandon_tolerance < 0.0 {
                return Err(ConfigError::OutOfRange(
                    "abandon_tolerance",
                    self.abandon_tolerance,
                ));
            }
        }
        Ok(())
    }

    /// Replace every invalid value with its default, logging each change
    pub fn sanitized(mut self) -> Self {
        let defaults = EngineConfig::default();

        if !valid_rate(self.arrival_rate) {
            warn!("arrival_rate {} invalid, using {}", self.arrival_rate, defaults.arrival_rate);
            self.arrival_rate = defaults.arrival_rate;
        }
        if !valid_rate(self.service_rate) {
            warn!("service_rate {} invalid, using {}", self.service_rate, defaults.service_rate);
            self.service_rate = defaults.service_rate;
        }
        if self.server_count == 0 {
            warn!("server_count 0 invalid, using {}", defaults.server_count);
            self.server_count = defaults.server_count;
        }
        if self.general_queue_count == 0 {
            warn!("general_queue_count 0 invalid, using {}", defaults.general_queue_count);
            self.general_queue_count = defaults.general_queue_count;
        }
        if self.operating_hours.is_nan() || self.operating_hours < 0.0 {
            warn!("operating_hours {} invalid, using {}", self.operating_hours, defaults.operating_hours);
            self.operating_hours = defaults.operating_hours;
        }
        if !self.ticket_price.is_finite() {
            self.ticket_price = defaults.ticket_price;
        }
        if !self.cost_per_client.is_finite() {
            self.cost_per_client = defaults.cost_per_client;
        }
        if !self.patience_base_minutes.is_finite() || self.patience_base_minutes <= 0.0 {
            warn!(
                "patience_base_minutes {} invalid, using {}",
                self.patience_base_minutes, defaults.patience_base_minutes
            );
            self.patience_base_minutes = defaults.patience_base_minutes;
        }
        if !self.abandon_tolerance.is_finite() || self.abandon_tolerance < 0.0 {
            warn!(
                "abandon_tolerance {} invalid, using {}",
                self.abandon_tolerance, defaults.abandon_tolerance
            );
            self.abandon_tolerance = defaults.abandon_tolerance;
        }
        self.tuning.shed_probability = if self.tuning.shed_probability.is_finite() {
            self.tuning.shed_probability.clamp(0.0, 1.0)
        } else {
            defaults.tuning.shed_probability
        };
        self.tuning.patience_spread = if self.tuning.patience_spread.is_finite() {
            self.tuning.patience_spread.clamp(0.0, 1.0)
        } else {
            defaults.tuning.patience_spread
        };
        self
    }
}
