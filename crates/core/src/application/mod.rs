// Application Layer - Spawn use cases

pub mod config;
pub mod constants;
pub mod environment_table;
pub mod file_action_plan;
pub mod spawn_engine;

// Re-exports
pub use config::SpawnConfig;
pub use spawn_engine::SpawnEngine;
