// Port Layer - Interfaces for external dependencies

pub mod ambient_environment; // Injected for fake ambient tables in tests
pub mod descriptor_resolver;
pub mod process_spawner;

// Re-exports
pub use ambient_environment::AmbientEnvironment;
pub use descriptor_resolver::{DescriptorResolver, IoDescriptor};
pub use process_spawner::{EnvironmentSource, PreparedSpawn, ProcessSpawner};
