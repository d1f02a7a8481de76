pub mod core;

// Re-export commonly used types
pub use crate::core::config::{ConfigError, EngineConfig, Mode, Tuning, VipArrivals, VipServers};
pub use crate::core::driver::{SimulationDriver, TickObserver};
pub use crate::core::random::{RngSource, ScriptedSource, UniformSource};
pub use crate::core::replication::{run_replications, ConcurrencyMode, ReplicationConfig, ReplicationSummary};
pub use crate::core::report::{CostParams, FinancialReport};
pub use crate::core::simulation_engine::SimulationEngine;
pub use crate::core::stats::StatsSnapshot;
pub use crate::core::types::{Client, ClientId, ServiceClass};
