//! Batch execution of independent simulation runs
//!
//! Each replication gets its own engine seeded from `base_seed + index`, so
//! a batch is reproducible regardless of how it is scheduled.

use super::config::EngineConfig;
use super::simulation_engine::SimulationEngine;
use super::stats::StatsSnapshot;
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Enumeration of supported concurrency modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyMode {
    /// Runs execute one after another on the calling thread
    #[default]
    Sequential,
    /// Runs are spread over a Rayon thread pool
    Rayon,
}

/// Configuration for a batch of replications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicationConfig {
    /// The concurrency mode to use for execution
    pub concurrency_mode: ConcurrencyMode,
    /// The size of the thread pool for parallel execution.
    /// Only relevant when concurrency_mode is Rayon; the global pool is
    /// used when unset.
    pub thread_pool_size: Option<usize>,
    pub replications: usize,
    pub base_seed: u64,
    /// Simulation hours per step
    pub dt: f64,
    /// Step cap per run, guarding against configurations that never close
    pub max_steps: u64,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            concurrency_mode: ConcurrencyMode::default(),
            thread_pool_size: None,
            replications: 100,
            base_seed: 0,
            dt: 0.005,
            max_steps: 1_000_000,
        }
    }
}

impl ReplicationConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrency mode for the batch
    pub fn with_concurrency(mut self, mode: ConcurrencyMode) -> Self {
        self.concurrency_mode = mode;
        self
    }

    /// Set the thread pool size for parallel execution
    ///
    /// # Note
    /// This setting only affects execution when concurrency_mode is Rayon
    pub fn with_thread_pool_size(mut self, size: usize) -> Self {
        self.thread_pool_size = Some(size);
        self
    }

    pub fn with_replications(mut self, count: usize) -> Self {
        self.replications = count;
        self
    }

    pub fn with_base_seed(mut self, seed: u64) -> Self {
        self.base_seed = seed;
        self
    }

    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    pub fn with_max_steps(mut self, steps: u64) -> Self {
        self.max_steps = steps;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(format!("Step size must be positive, got {}", self.dt));
        }
        if self.max_steps == 0 {
            return Err("Step cap must be greater than 0".to_string());
        }
        if self.thread_pool_size == Some(0) {
            return Err("Thread pool size must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Result of a single replication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub seed: u64,
    pub steps: u64,
    /// False when the step cap was hit before the floor emptied
    pub completed: bool,
    pub stats: StatsSnapshot,
}

/// Aggregate over a batch of replications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationSummary {
    pub runs: Vec<RunOutcome>,
    pub mean_served: f64,
    pub min_served: u64,
    pub max_served: u64,
    pub mean_utilization: f64,
    pub mean_wait_minutes: f64,
    pub mean_overtime_hours: f64,
    pub incomplete_runs: usize,
}

impl ReplicationSummary {
    fn from_runs(runs: Vec<RunOutcome>) -> Self {
        Self {
            mean_served: mean_of(&runs, |r| r.stats.served as f64),
            min_served: runs.iter().map(|r| r.stats.served).min().unwrap_or(0),
            max_served: runs.iter().map(|r| r.stats.served).max().unwrap_or(0),
            mean_utilization: mean_of(&runs, |r| r.stats.utilization),
            mean_wait_minutes: mean_of(&runs, |r| r.stats.avg_wait_minutes),
            mean_overtime_hours: mean_of(&runs, |r| r.stats.overtime_hours),
            incomplete_runs: runs.iter().filter(|r| !r.completed).count(),
            runs,
        }
    }
}

fn mean_of(runs: &[RunOutcome], f: impl Fn(&RunOutcome) -> f64) -> f64 {
    if runs.is_empty() {
        return 0.0;
    }
    runs.iter().map(f).sum::<f64>() / runs.len() as f64
}

/// Run one seeded engine until it finishes or hits `max_steps`
pub fn run_single(config: &EngineConfig, seed: u64, dt: f64, max_steps: u64) -> RunOutcome {
    let mut engine = SimulationEngine::seeded(config.clone(), seed);
    let mut steps = 0;
    let mut completed = false;
    while steps < max_steps {
        steps += 1;
        if !engine.step(dt) {
            completed = true;
            break;
        }
    }
    RunOutcome {
        seed,
        steps,
        completed,
        stats: engine.stats(),
    }
}

/// Run every replication and summarise them. Runs are returned in seed
/// order whatever the concurrency mode.
pub fn run_replications(
    engine_config: &EngineConfig,
    config: &ReplicationConfig,
) -> Result<ReplicationSummary, String> {
    config.validate()?;
    let seeds: Vec<u64> = (0..config.replications as u64)
        .map(|i| config.base_seed.wrapping_add(i))
        .collect();
    let run = |seed: &u64| run_single(engine_config, *seed, config.dt, config.max_steps);

    let runs: Vec<RunOutcome> = match config.concurrency_mode {
        ConcurrencyMode::Sequential => seeds.iter().map(run).collect(),
        ConcurrencyMode::Rayon => match config.thread_pool_size {
            Some(size) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(size)
                    .build()
                    .map_err(|e| format!("Failed to build thread pool: {}", e))?;
                pool.install(|| seeds.par_iter().map(run).collect())
            }
            None => seeds.par_iter().map(run).collect(),
        },
    };

    let summary = ReplicationSummary::from_runs(runs);
    if summary.incomplete_runs > 0 {
        warn!(
            "{} of {} replications hit the {}-step cap",
            summary.incomplete_runs,
            summary.runs.len(),
            config.max_steps
        );
    }
    info!(
        "{} replications ({:?}): served mean {:.2} [{}..{}], utilization {:.3}",
        summary.runs.len(),
        config.concurrency_mode,
        summary.mean_served,
        summary.min_served,
        summary.max_served,
        summary.mean_utilization
    );
    Ok(summary)
}
