//! Environment file parsing utilities.
//!
//! Provider API keys live in a `.env` file referenced by the `apiKeys`
//! setting instead of the configuration file itself. Each source names the
//! variable it reads through `apiKeyVar`.

use std::collections::HashMap;
use std::path::Path;

use crate::platform::path::expand_and_resolve;

/// Public demonstration key accepted by several catalogs at a very low rate.
pub const DEMO_KEY: &str = "DEMO_KEY";

/// Parses an environment file and returns a map of key-value pairs.
///
/// Returns an empty map if the file doesn't exist or can't be read.
#[must_use]
pub fn parse_env_file(path: &Path) -> HashMap<String, String> {
    match dotenvy::from_path_iter(path) {
        Ok(iter) => iter.filter_map(Result::ok).collect(),
        Err(err) => {
            if path.exists() {
                tracing::warn!(
                    error = %err,
                    path = %path.display(),
                    "failed to read env file"
                );
            }
            HashMap::new()
        }
    }
}

/// Loads API keys from an environment file.
///
/// * `api_keys_path` - Path to the env file (can be relative or absolute)
/// * `config_dir` - Directory containing the config file (for resolving relative paths)
#[must_use]
pub fn load_api_keys(api_keys_path: &str, config_dir: &Path) -> ApiKeys {
    if api_keys_path.is_empty() {
        return ApiKeys::default();
    }

    let resolved_path = expand_and_resolve(api_keys_path, config_dir);
    ApiKeys { values: parse_env_file(&resolved_path) }
}

/// API keys loaded from an environment file, looked up by variable name.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    values: HashMap<String, String>,
}

impl ApiKeys {
    /// Builds a key set from explicit pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Returns the value of `var`, or `None` if unset or empty.
    #[must_use]
    pub fn get(&self, var: &str) -> Option<&str> {
        self.values.get(var).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Returns the key for `var`, falling back to the public demo key.
    #[must_use]
    pub fn key_or_demo(&self, var: &str) -> &str {
        if var.is_empty() {
            return DEMO_KEY;
        }
        self.get(var).unwrap_or(DEMO_KEY)
    }
}
