// Domain Layer - Pure spawn data model

pub mod descriptor;
pub mod environment;
pub mod errno;
pub mod file_action;
pub mod request;

// Re-exports
pub use descriptor::{Channel, Disposition, FdDispositions, FdRef};
pub use environment::{EnvValue, EnvironmentBuffer, EnvironmentOverride};
pub use errno::ErrnoClass;
pub use file_action::{FileAction, FileActionPlan};
pub use request::{ProcessHandle, SpawnPhase, SpawnRequest, Strategy};
