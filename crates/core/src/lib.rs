// fastspawn Core - Domain Logic & Ports
// NO OS calls: environment merging, fd planning and strategy orchestration only

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use application::{SpawnConfig, SpawnEngine};
pub use domain::{
    Channel, Disposition, EnvValue, EnvironmentBuffer, EnvironmentOverride, ErrnoClass,
    FdDispositions, FdRef, FileAction, FileActionPlan, ProcessHandle, SpawnRequest, Strategy,
};
pub use error::{Result, SpawnError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
