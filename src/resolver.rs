//! The layered resolver: priority-ordered lookup over override,
//! environment, file, and default sources.

use crate::env::{EnvKeyMapper, EnvSource, StdEnv};
use crate::error::{CoercionError, ConfigError};
use crate::value;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One ranked origin of configuration values.
///
/// Declaration order is priority order, highest first: an override for
/// a key shadows the environment, the environment shadows the file,
/// and the file shadows registered defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SourceKind {
    /// Values set programmatically at runtime.
    Override,
    /// Process environment variables.
    Environment,
    /// The parsed config file.
    File,
    /// Statically registered fallbacks.
    Default,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Override => write!(f, "override"),
            SourceKind::Environment => write!(f, "environment"),
            SourceKind::File => write!(f, "file"),
            SourceKind::Default => write!(f, "default"),
        }
    }
}

/// Extensions tried, in order, for each search path.
const SUPPORTED_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Precedence-aware lookup over a dotted key namespace assembled from
/// four source kinds.
///
/// Each resolver is an explicit instance owning all of its state;
/// independent resolvers share nothing. Mutating operations take
/// `&mut self` and reads take `&self`, so single-threaded use needs no
/// synchronization and concurrent use is a matter of wrapping the
/// resolver in `std::sync::RwLock`.
///
/// Key paths are dot-delimited (`"metrics.listenAddress"`) and match
/// case-insensitively. Numeric segments index into sequences.
pub struct Resolver {
    search_paths: Vec<PathBuf>,
    config_name: String,
    env: Box<dyn EnvSource>,
    env_mapper: EnvKeyMapper,
    automatic_env: bool,
    bound_env_keys: HashSet<String>,
    overrides: HashMap<String, Value>,
    defaults: HashMap<String, Value>,
    file_tree: Option<Value>,
    loaded_from: Option<PathBuf>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    /// Create a resolver with no search paths, config name `"config"`,
    /// and the process environment as its environment source.
    pub fn new() -> Self {
        Self {
            search_paths: Vec::new(),
            config_name: "config".to_string(),
            env: Box::new(StdEnv),
            env_mapper: EnvKeyMapper::default(),
            automatic_env: false,
            bound_env_keys: HashSet::new(),
            overrides: HashMap::new(),
            defaults: HashMap::new(),
            file_tree: None,
            loaded_from: None,
        }
    }

    /// Replace the environment source. Tests use
    /// [`MockEnv`](crate::env::MockEnv) here instead of mutating the
    /// process environment.
    pub fn with_env_source(mut self, source: impl EnvSource + 'static) -> Self {
        self.env = Box::new(source);
        self
    }

    /// Append a directory to the ordered config file search list.
    ///
    /// A nonexistent directory is not an error; it is simply skipped
    /// when [`read_in_config`](Self::read_in_config) runs.
    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        self.search_paths.push(path.into());
    }

    /// Set the config file base name (extension decided at load time).
    pub fn set_config_name(&mut self, name: impl Into<String>) {
        self.config_name = name.into();
    }

    /// Set the prefix prepended (with `_`) to every derived
    /// environment-variable name.
    pub fn set_env_prefix(&mut self, prefix: impl Into<String>) {
        self.env_mapper.set_prefix(prefix);
    }

    /// Set the substring replacement rules applied to the upper-cased
    /// key path when deriving its environment-variable name. The
    /// default rule maps `.` to `_`.
    pub fn set_env_key_replacer(&mut self, rules: &[(&str, &str)]) {
        self.env_mapper.set_replacers(rules);
    }

    /// When enabled, every lookup also consults the derived
    /// environment-variable name, even for keys never bound explicitly.
    pub fn automatic_env(&mut self, enabled: bool) {
        self.automatic_env = enabled;
    }

    /// Bind one key path to its derived environment variable, so the
    /// environment is consulted for it even when automatic lookup is
    /// off.
    pub fn bind_env(&mut self, key: impl AsRef<str>) {
        self.bound_env_keys.insert(key.as_ref().to_ascii_lowercase());
    }

    /// Register a lowest-priority fallback for a key path. The last
    /// registration for a given key wins among defaults.
    pub fn set_default(&mut self, key: impl AsRef<str>, value: impl Into<Value>) {
        self.defaults
            .insert(key.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Register a highest-priority override for a key path. Once set,
    /// it shadows every other source for that key for the life of this
    /// resolver.
    pub fn set(&mut self, key: impl AsRef<str>, value: impl Into<Value>) {
        self.overrides
            .insert(key.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Search the registered paths in order for `<name>.<ext>` over the
    /// supported extensions and parse the first match into the cached
    /// file tree.
    ///
    /// Re-invocable: a successful call replaces the previously loaded
    /// tree, while a failed call leaves it untouched. A
    /// [`ConfigError::NotFound`] result is recoverable; resolution then
    /// continues over the remaining sources.
    pub fn read_in_config(&mut self) -> Result<(), ConfigError> {
        for dir in &self.search_paths {
            for ext in SUPPORTED_EXTENSIONS {
                let candidate = dir.join(format!("{}.{}", self.config_name, ext));
                if !candidate.is_file() {
                    continue;
                }
                debug!(path = %candidate.display(), "found config file");
                let content = std::fs::read_to_string(&candidate).map_err(|source| {
                    ConfigError::Io {
                        path: candidate.clone(),
                        source,
                    }
                })?;
                let tree = parse_config(&candidate, ext, &content)?;
                info!(path = %candidate.display(), "loaded config file");
                self.file_tree = Some(tree);
                self.loaded_from = Some(candidate);
                return Ok(());
            }
        }
        warn!(name = %self.config_name, "no config file found in any search path");
        Err(ConfigError::NotFound {
            name: self.config_name.clone(),
            searched: self.search_paths.clone(),
        })
    }

    /// Path of the file loaded by the last successful
    /// [`read_in_config`](Self::read_in_config).
    pub fn config_file_used(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }

    /// Return the winning value for a key path, or `None` if no source
    /// defines it.
    ///
    /// Sources are consulted in priority order: override (exact,
    /// case-folded match), then the environment (when automatic lookup
    /// is on or the key is bound), then descent through the file tree,
    /// then defaults. The first hit wins; subtrees are never merged
    /// across sources here.
    pub fn get(&self, key: impl AsRef<str>) -> Option<Value> {
        let key = key.as_ref();
        let folded = key.to_ascii_lowercase();

        if let Some(value) = self.overrides.get(&folded) {
            return Some(value.clone());
        }

        if self.automatic_env || self.bound_env_keys.contains(&folded) {
            let var = self.env_mapper.var_name(key);
            if let Some(raw) = self.env.get(&var) {
                return Some(Value::String(raw));
            }
        }

        if let Some(tree) = &self.file_tree
            && let Some(value) = value::lookup_path(tree, key)
        {
            return Some(value.clone());
        }

        self.defaults.get(&folded).cloned()
    }

    /// Report which source wins for a key path, without cloning the
    /// value. `None` if no source defines the path.
    pub fn source_of(&self, key: impl AsRef<str>) -> Option<SourceKind> {
        let key = key.as_ref();
        let folded = key.to_ascii_lowercase();

        if self.overrides.contains_key(&folded) {
            return Some(SourceKind::Override);
        }
        if (self.automatic_env || self.bound_env_keys.contains(&folded))
            && self.env.get(&self.env_mapper.var_name(key)).is_some()
        {
            return Some(SourceKind::Environment);
        }
        if let Some(tree) = &self.file_tree
            && value::lookup_path(tree, key).is_some()
        {
            return Some(SourceKind::File);
        }
        if self.defaults.contains_key(&folded) {
            return Some(SourceKind::Default);
        }
        None
    }

    /// Strict string accessor: distinguishes missing keys from values
    /// that do not coerce.
    pub fn try_get_string(&self, key: impl AsRef<str>) -> Result<String, CoercionError> {
        let key = key.as_ref();
        let value = self.resolve(key)?;
        value::as_string(&value).ok_or_else(|| wrong_type(key, "string", &value))
    }

    /// Strict bool accessor.
    pub fn try_get_bool(&self, key: impl AsRef<str>) -> Result<bool, CoercionError> {
        let key = key.as_ref();
        let value = self.resolve(key)?;
        value::as_bool(&value).ok_or_else(|| wrong_type(key, "bool", &value))
    }

    /// Strict integer accessor.
    pub fn try_get_int(&self, key: impl AsRef<str>) -> Result<i64, CoercionError> {
        let key = key.as_ref();
        let value = self.resolve(key)?;
        value::as_int(&value).ok_or_else(|| wrong_type(key, "integer", &value))
    }

    /// Strict string-list accessor.
    pub fn try_get_string_slice(&self, key: impl AsRef<str>) -> Result<Vec<String>, CoercionError> {
        let key = key.as_ref();
        let value = self.resolve(key)?;
        value::as_string_slice(&value).ok_or_else(|| wrong_type(key, "string list", &value))
    }

    /// Lenient string accessor: absent or un-coercible values yield
    /// `""`. Documented looseness; use
    /// [`try_get_string`](Self::try_get_string) for strictness.
    pub fn get_string(&self, key: impl AsRef<str>) -> String {
        self.try_get_string(key).unwrap_or_default()
    }

    /// Lenient bool accessor: absent or un-coercible values yield
    /// `false`.
    pub fn get_bool(&self, key: impl AsRef<str>) -> bool {
        self.try_get_bool(key).unwrap_or_default()
    }

    /// Lenient integer accessor: absent or un-coercible values yield
    /// `0`.
    pub fn get_int(&self, key: impl AsRef<str>) -> i64 {
        self.try_get_int(key).unwrap_or_default()
    }

    /// Lenient string-list accessor: absent or un-coercible values
    /// yield an empty list.
    pub fn get_string_slice(&self, key: impl AsRef<str>) -> Vec<String> {
        self.try_get_string_slice(key).unwrap_or_default()
    }

    /// Deserialize the subtree rooted at `key` into `T`.
    ///
    /// For this one call the Default source is deep-merged beneath the
    /// File source under the subtree; environment and override values
    /// are not merged into nested fields. Mapping keys are folded to
    /// snake_case so ordinary serde struct fields match file keys
    /// case-insensitively. Unmatched subtree keys are ignored;
    /// unmatched struct fields keep their serde defaults. An entirely
    /// absent subtree behaves like an empty mapping.
    ///
    /// Calling this twice with unchanged sources yields
    /// field-identical results.
    pub fn unmarshal_key<T: DeserializeOwned>(
        &self,
        key: impl AsRef<str>,
    ) -> Result<T, ConfigError> {
        let key = key.as_ref();

        let defaults_tree =
            value::expand_dotted(self.defaults.iter().map(|(k, v)| (k.clone(), v.clone())));
        let base = value::lookup_path(&defaults_tree, key)
            .cloned()
            .unwrap_or(Value::Null);
        let overlay = self
            .file_tree
            .as_ref()
            .and_then(|tree| value::lookup_path(tree, key))
            .cloned()
            .unwrap_or(Value::Null);

        let mut merged = value::deep_merge(base, overlay);
        if merged.is_null() {
            merged = Value::Object(Map::new());
        }

        let folded = value::fold_keys_snake_case(merged);
        serde_json::from_value(folded).map_err(|err| ConfigError::Deserialize {
            key: key.to_string(),
            message: err.to_string(),
        })
    }

    /// Priority-ordered lookup that reports absence as an error, shared
    /// by the `try_get_*` family.
    fn resolve(&self, key: &str) -> Result<Value, CoercionError> {
        self.get(key).ok_or_else(|| CoercionError::Missing {
            key: key.to_string(),
        })
    }
}

fn wrong_type(key: &str, expected: &'static str, value: &Value) -> CoercionError {
    CoercionError::WrongType {
        key: key.to_string(),
        expected,
        found: value::type_name(value),
    }
}

/// Parse config file content into a generic value tree by extension.
fn parse_config(path: &Path, ext: &str, content: &str) -> Result<Value, ConfigError> {
    let parsed = match ext {
        "yaml" | "yml" => serde_yaml::from_str::<Value>(content).map_err(|e| e.to_string()),
        _ => serde_json::from_str::<Value>(content).map_err(|e| e.to_string()),
    };
    parsed.map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}
