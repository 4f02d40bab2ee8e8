// Environment Domain Model

use std::collections::BTreeMap;
use std::ffi::CString;

/// Value half of an environment override
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvValue {
    /// Replace (or add) the variable with this value
    Set(String),
    /// Remove the variable from the child's environment
    Unset,
}

impl EnvValue {
    pub fn as_set(&self) -> Option<&str> {
        match self {
            EnvValue::Set(value) => Some(value),
            EnvValue::Unset => None,
        }
    }
}

impl From<Option<String>> for EnvValue {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(value) => EnvValue::Set(value),
            None => EnvValue::Unset,
        }
    }
}

/// Ordered name -> value-or-unset mapping for one spawn call
///
/// Keys are unique: inserting a name that is already present replaces its
/// value and keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentOverride {
    entries: Vec<(String, EnvValue)>,
}

impl EnvironmentOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: EnvValue) -> &mut Self {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.insert(name, EnvValue::Set(value.into()))
    }

    pub fn unset(&mut self, name: impl Into<String>) -> &mut Self {
        self.insert(name, EnvValue::Unset)
    }

    pub fn get(&self, name: &str) -> Option<&EnvValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EnvValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Entries that set a value, in insertion order
    pub fn assignments(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter_map(|(name, value)| value.as_set().map(|v| (name.as_str(), v)))
    }

    pub fn set_count(&self) -> usize {
        self.assignments().count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, EnvValue)> for EnvironmentOverride {
    fn from_iter<I: IntoIterator<Item = (K, EnvValue)>>(iter: I) -> Self {
        let mut env = EnvironmentOverride::new();
        for (name, value) in iter {
            env.insert(name, value);
        }
        env
    }
}

/// Replacement environment handed to the creation syscall
///
/// Holds `NAME=VALUE` entries with no duplicate names. The NULL sentinel is
/// added by the adapter when it turns the buffer into a `char **`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentBuffer {
    entries: Vec<CString>,
}

impl EnvironmentBuffer {
    pub(crate) fn from_entries(entries: Vec<CString>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CString] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reserved slots (excluding the sentinel)
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    /// Look up the value of `name`
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.iter().find_map(|entry| {
            let (entry_name, value) = split_entry(entry.as_bytes());
            (entry_name == name.as_bytes()).then_some(value)
        })
    }

    /// Parse the buffer back into a name -> value mapping
    pub fn to_map(&self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.entries
            .iter()
            .map(|entry| {
                let (name, value) = split_entry(entry.as_bytes());
                (name.to_vec(), value.to_vec())
            })
            .collect()
    }
}

/// Split a raw `NAME=VALUE` entry at its first `=`
///
/// An entry without `=` is all name and has an empty value.
pub fn split_entry(entry: &[u8]) -> (&[u8], &[u8]) {
    match entry.iter().position(|&b| b == b'=') {
        Some(idx) => (&entry[..idx], &entry[idx + 1..]),
        None => (entry, &[]),
    }
}
