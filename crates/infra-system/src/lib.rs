// fastspawn Infrastructure - System Adapters
// Implements: AmbientEnvironment, ProcessSpawner

#[cfg(unix)]
mod c_string_array;
#[cfg(unix)]
pub mod errno;
#[cfg(unix)]
pub mod posix_spawn;
#[cfg(unix)]
pub mod posix_spawner;
#[cfg(unix)]
pub mod process_environment;
#[cfg(unix)]
pub mod vfork;

#[cfg(unix)]
pub use posix_spawner::PosixSpawner;
#[cfg(unix)]
pub use process_environment::ProcessEnvironment;
