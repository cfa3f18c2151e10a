//! Environment variable access and key-path to variable-name mapping.
//!
//! Lookups go through the [`EnvSource`] trait so tests can substitute a
//! map-backed environment instead of mutating process state.

use std::collections::HashMap;

/// Source of environment variables.
pub trait EnvSource {
    /// Look up a variable by exact name.
    fn get(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdEnv;

impl EnvSource for StdEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Map-backed environment for tests.
#[derive(Debug, Clone, Default)]
pub struct MockEnv {
    vars: HashMap<String, String>,
}

impl MockEnv {
    /// Create an empty mock environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock environment from key-value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Set a variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }
}

impl EnvSource for MockEnv {
    fn get(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

/// Derives environment-variable names from dotted key paths.
///
/// The key path is upper-cased, the replacer rules are applied in
/// order, and the prefix (if any) is prepended with an underscore:
/// key `metrics.listenAddress` with prefix `CP` and the default
/// `.` -> `_` rule derives `CP_METRICS_LISTENADDRESS`.
#[derive(Debug, Clone)]
pub struct EnvKeyMapper {
    prefix: Option<String>,
    replacers: Vec<(String, String)>,
}

impl Default for EnvKeyMapper {
    fn default() -> Self {
        Self {
            prefix: None,
            replacers: vec![(".".to_string(), "_".to_string())],
        }
    }
}

impl EnvKeyMapper {
    /// Set the static prefix prepended to every derived name.
    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = Some(prefix.into());
    }

    /// Replace the substitution rules applied after upper-casing.
    pub fn set_replacers(&mut self, rules: &[(&str, &str)]) {
        self.replacers = rules
            .iter()
            .map(|(from, to)| ((*from).to_string(), (*to).to_string()))
            .collect();
    }

    /// Derive the variable name for a key path.
    pub fn var_name(&self, key: &str) -> String {
        let mut name = key.to_ascii_uppercase();
        for (from, to) in &self.replacers {
            name = name.replace(from.as_str(), to.as_str());
        }
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_ascii_uppercase(), name),
            None => name,
        }
    }
}
