pub mod config;
pub mod driver;
pub mod queues;
pub mod random;
pub mod replication;
pub mod report;
pub mod servers;
pub mod simulation_engine;
pub mod stats;
pub mod timeline;
pub mod types;
