// Spawn Engine Configuration

use super::constants::{DEFAULT_FALLBACK_STACK_SIZE, MIN_FALLBACK_STACK_SIZE};
use crate::domain::Strategy;
use tracing::warn;

/// Strategy environment variable (`batched` / `fallback`)
pub const ENV_STRATEGY: &str = "FASTSPAWN_STRATEGY";
/// vfork hint environment variable (`1` / `0` / `true` / `false`)
pub const ENV_USE_VFORK: &str = "FASTSPAWN_USE_VFORK";
/// Fallback child stack size in bytes
pub const ENV_FALLBACK_STACK: &str = "FASTSPAWN_FALLBACK_STACK";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnConfig {
    /// Strategy used by front ends when the caller does not choose one
    pub default_strategy: Strategy,
    /// Request copy-on-write-optimized creation on the batched path
    pub use_vfork_hint: bool,
    /// Stack reserved for the fallback child continuation
    pub fallback_stack_size: usize,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            default_strategy: Strategy::Batched,
            use_vfork_hint: true,
            fallback_stack_size: DEFAULT_FALLBACK_STACK_SIZE,
        }
    }
}

impl SpawnConfig {
    /// Load configuration from `FASTSPAWN_*` environment variables
    ///
    /// Malformed values are logged and replaced by defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup (testable)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_STRATEGY) {
            match raw.parse::<Strategy>() {
                Ok(strategy) => config.default_strategy = strategy,
                Err(e) => warn!(key = ENV_STRATEGY, value = %raw, error = %e, "Ignoring invalid value"),
            }
        }

        if let Some(raw) = lookup(ENV_USE_VFORK) {
            match parse_flag(&raw) {
                Some(flag) => config.use_vfork_hint = flag,
                None => warn!(key = ENV_USE_VFORK, value = %raw, "Ignoring invalid value"),
            }
        }

        if let Some(raw) = lookup(ENV_FALLBACK_STACK) {
            match raw.trim().parse::<usize>() {
                Ok(size) => config.fallback_stack_size = size.max(MIN_FALLBACK_STACK_SIZE),
                Err(e) => {
                    warn!(key = ENV_FALLBACK_STACK, value = %raw, error = %e, "Ignoring invalid value")
                }
            }
        }

        config
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = SpawnConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config, SpawnConfig::default());
        assert_eq!(config.default_strategy, Strategy::Batched);
        assert!(config.use_vfork_hint);
    }

    #[test]
    fn test_values_are_read() {
        let config = SpawnConfig::from_lookup(lookup_from(&[
            (ENV_STRATEGY, "fallback"),
            (ENV_USE_VFORK, "off"),
            (ENV_FALLBACK_STACK, "131072"),
        ]));
        assert_eq!(config.default_strategy, Strategy::Fallback);
        assert!(!config.use_vfork_hint);
        assert_eq!(config.fallback_stack_size, 131072);
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let config = SpawnConfig::from_lookup(lookup_from(&[
            (ENV_STRATEGY, "teleport"),
            (ENV_USE_VFORK, "maybe"),
            (ENV_FALLBACK_STACK, "lots"),
        ]));
        assert_eq!(config, SpawnConfig::default());
    }

    #[test]
    fn test_stack_size_has_floor() {
        let config = SpawnConfig::from_lookup(lookup_from(&[(ENV_FALLBACK_STACK, "1024")]));
        assert_eq!(config.fallback_stack_size, MIN_FALLBACK_STACK_SIZE);
    }
}
