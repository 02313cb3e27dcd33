pub mod anomaly_engine;
pub mod briefing;
pub mod config;
pub mod diagnostics_engine;
pub mod engine;
pub mod error;
pub mod isolation_forest;
pub mod normalizer;
pub mod operations;
pub mod rankings;
pub mod record;
pub mod rng;
pub mod scorer;
pub mod simulation_engine;
pub mod snapshot;
pub mod store;
pub mod types;
