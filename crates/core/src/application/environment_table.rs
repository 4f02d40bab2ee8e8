// Environment Table - builds the child's replacement environment
//
// Two passes: copy ambient entries that are not overridden, then append the
// override assignments. The ambient table is only read.

use crate::domain::environment::split_entry;
use crate::domain::{EnvironmentBuffer, EnvironmentOverride};
use crate::error::{Result, SpawnError};
use std::collections::HashSet;
use std::ffi::CString;
use tracing::debug;

/// Build the replacement environment buffer
///
/// # Arguments
/// * `ambient` - Ambient `NAME=VALUE` entries, in ambient order
/// * `overrides` - Set/unset operations; `None` copies the ambient table unchanged
///
/// # Errors
/// - SpawnError::InvalidArgument if an override name or value is malformed
///   (checked before anything is allocated)
/// - SpawnError::ResourceExhausted if the buffer cannot be reserved
///
/// # Example
/// ```text
/// let mut env = EnvironmentOverride::new();
/// env.set("FOO", "bar").unset("TERM");
/// let buffer = build(&ambient.entries(), Some(&env))?;
/// ```
pub fn build(
    ambient: &[Vec<u8>],
    overrides: Option<&EnvironmentOverride>,
) -> Result<EnvironmentBuffer> {
    if let Some(overrides) = overrides {
        validate_overrides(overrides)?;
    }

    let set_count = overrides.map_or(0, EnvironmentOverride::set_count);
    let capacity = ambient
        .len()
        .checked_add(set_count)
        .ok_or_else(|| SpawnError::ResourceExhausted("environment too large".to_string()))?;

    let mut entries: Vec<CString> = Vec::new();
    entries.try_reserve_exact(capacity).map_err(|e| {
        SpawnError::ResourceExhausted(format!("environment buffer ({} entries): {}", capacity, e))
    })?;

    // Unset and set both drop the ambient entry: the override always wins
    let excluded: HashSet<&[u8]> = overrides
        .into_iter()
        .flat_map(|o| o.iter())
        .map(|(name, _)| name.as_bytes())
        .collect();
    let mut seen: HashSet<&[u8]> = HashSet::with_capacity(ambient.len());

    for entry in ambient {
        let (name, _) = split_entry(entry);
        if excluded.contains(name) || !seen.insert(name) {
            continue;
        }
        entries.push(to_c_entry(entry.clone())?);
    }

    if let Some(overrides) = overrides {
        for (name, value) in overrides.assignments() {
            entries.push(to_c_entry(format!("{}={}", name, value).into_bytes())?);
        }
    }

    debug!(
        ambient = ambient.len(),
        assignments = set_count,
        entries = entries.len(),
        "Built environment buffer"
    );

    Ok(EnvironmentBuffer::from_entries(entries))
}

/// Check every override name and set value
///
/// Names must be non-empty and free of `=` and NUL; values must be free of NUL.
pub fn validate_overrides(overrides: &EnvironmentOverride) -> Result<()> {
    for (name, value) in overrides.iter() {
        if name.is_empty() {
            return Err(SpawnError::InvalidArgument(
                "environment variable name is empty".to_string(),
            ));
        }
        if name.contains('=') {
            return Err(SpawnError::InvalidArgument(format!(
                "environment variable name contains '=': {}",
                name
            )));
        }
        if name.contains('\0') {
            return Err(SpawnError::InvalidArgument(format!(
                "environment variable name contains NUL byte: {:?}",
                name
            )));
        }
        if value.as_set().is_some_and(|v| v.contains('\0')) {
            return Err(SpawnError::InvalidArgument(format!(
                "value of environment variable {} contains NUL byte",
                name
            )));
        }
    }
    Ok(())
}

fn to_c_entry(bytes: Vec<u8>) -> Result<CString> {
    CString::new(bytes).map_err(|e| {
        SpawnError::InvalidArgument(format!(
            "environment entry contains NUL byte at {}",
            e.nul_position()
        ))
    })
}
