// Process environment adapter (AmbientEnvironment)

use fastspawn_core::port::AmbientEnvironment;
use std::os::unix::ffi::{OsStrExt, OsStringExt};

/// Ambient accessor over the real process environment
///
/// Reads through `std::env::vars_os`, which holds the runtime's environment
/// read lock while it copies the table.
pub struct ProcessEnvironment;

impl AmbientEnvironment for ProcessEnvironment {
    fn entries(&self) -> Vec<Vec<u8>> {
        std::env::vars_os()
            .map(|(name, value)| {
                let mut entry = name.into_vec();
                entry.reserve(value.len() + 1);
                entry.push(b'=');
                entry.extend_from_slice(value.as_bytes());
                entry
            })
            .collect()
    }
}
