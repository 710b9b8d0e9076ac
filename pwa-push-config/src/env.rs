// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;

/// Prefix for every pwa-push environment variable.
pub const DEFAULT_PREFIX: &str = "PWA_PUSH";

/// Reads `PREFIX_KEY` variables into lowercase `key` entries.
#[derive(Debug, Clone)]
pub struct EnvLoader {
    prefix: String,
}

impl EnvLoader {
    /// Create a loader for `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The variable prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Load every prefixed variable from the process environment.
    pub fn load(&self) -> HashMap<String, String> {
        self.load_from(env::vars())
    }

    /// Load prefixed entries from an explicit variable list.
    ///
    /// Empty values count as unset.
    pub fn load_from<I>(&self, vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let marker = format!("{}_", self.prefix);

        vars.into_iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .filter_map(|(key, value)| {
                key.strip_prefix(&marker)
                    .filter(|rest| !rest.is_empty())
                    .map(|rest| (rest.to_lowercase(), value))
            })
            .collect()
    }

    /// Full variable name for `key`.
    pub fn var_name(&self, key: &str) -> String {
        format!("{}_{}", self.prefix, key.to_uppercase())
    }

    /// Load a single variable.
    pub fn load_var(&self, key: &str) -> Result<String> {
        env::var(self.var_name(key)).map_err(ConfigError::EnvError)
    }

    /// Load a single variable with a default.
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}
