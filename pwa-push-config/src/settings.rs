// Push settings and layered loading

use crate::validation::{ConfigValidator, Validate};
use crate::{ConfigError, ConfigLoader, EnvLoader, FileFormat, Result};
use pwa_push::{ContentEncoding, DispatcherConfig, Urgency, VapidKeyPair};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Keys whose values are numbers when they arrive as strings.
const NUMERIC_KEYS: &[&str] = &[
    "ttl",
    "timeout_secs",
    "connect_timeout_secs",
    "concurrency",
    "batch_deadline_secs",
];

/// Everything needed to build a dispatcher.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushSettings {
    /// VAPID public key (base64url).
    pub public_key: String,
    /// VAPID private key PEM (base64url-wrapped).
    pub private_key: String,
    /// Contact address for the `sub` claim.
    pub admin_email: String,
    /// Message TTL in seconds.
    pub ttl: u32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Requests in flight per batch.
    pub concurrency: usize,
    /// Deadline for a whole batch in seconds.
    pub batch_deadline_secs: Option<u64>,
    /// `plain` or `aes128gcm`.
    pub encoding: String,
    /// `very-low`, `low`, `normal` or `high`.
    pub urgency: Option<String>,
    /// `Topic` header.
    pub topic: Option<String>,
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            public_key: String::new(),
            private_key: String::new(),
            admin_email: String::new(),
            ttl: 86400,
            timeout_secs: 10,
            connect_timeout_secs: 5,
            concurrency: 8,
            batch_deadline_secs: None,
            encoding: "plain".to_string(),
            urgency: None,
            topic: None,
        }
    }
}

impl std::fmt::Debug for PushSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushSettings")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("admin_email", &self.admin_email)
            .field("ttl", &self.ttl)
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("concurrency", &self.concurrency)
            .field("batch_deadline_secs", &self.batch_deadline_secs)
            .field("encoding", &self.encoding)
            .field("urgency", &self.urgency)
            .field("topic", &self.topic)
            .finish()
    }
}

impl PushSettings {
    /// Load from a file (if given) with `PWA_PUSH_*` variables on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut loader = SettingsLoader::new();
        if let Some(path) = path {
            loader = loader.file(path);
        }
        loader.load()
    }

    /// The VAPID key pair, checked for consistency.
    pub fn vapid_keys(&self) -> Result<VapidKeyPair> {
        ConfigValidator::not_empty(&self.public_key, "public_key")
            .map_err(|_| ConfigError::Missing("public_key".to_string()))?;
        ConfigValidator::not_empty(&self.private_key, "private_key")
            .map_err(|_| ConfigError::Missing("private_key".to_string()))?;

        Ok(VapidKeyPair::from_base64url(&self.public_key, &self.private_key)?)
    }

    /// Dispatcher configuration.
    pub fn dispatcher_config(&self) -> Result<DispatcherConfig> {
        let encoding: ContentEncoding = ConfigValidator::parses(&self.encoding, "encoding")?;

        let mut config = DispatcherConfig::new(self.admin_email.trim())
            .ttl(self.ttl)
            .timeout(Duration::from_secs(self.timeout_secs))
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .concurrency(self.concurrency)
            .encoding(encoding);

        if let Some(secs) = self.batch_deadline_secs {
            config = config.batch_deadline(Duration::from_secs(secs));
        }
        if let Some(urgency) = &self.urgency {
            config = config.urgency(ConfigValidator::parses::<Urgency>(urgency, "urgency")?);
        }
        if let Some(topic) = &self.topic {
            config = config.topic(topic.clone());
        }

        Ok(config)
    }

    /// Validated keys and dispatcher configuration.
    pub fn into_parts(self) -> Result<(VapidKeyPair, DispatcherConfig)> {
        self.validate()?;
        Ok((self.vapid_keys()?, self.dispatcher_config()?))
    }
}

impl Validate for PushSettings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::is_contact(&self.admin_email, "admin_email")?;
        ConfigValidator::at_least(self.timeout_secs, 1, "timeout_secs")?;
        ConfigValidator::at_least(self.connect_timeout_secs, 1, "connect_timeout_secs")?;
        ConfigValidator::at_least(self.concurrency, 1, "concurrency")?;
        ConfigValidator::parses::<ContentEncoding>(&self.encoding, "encoding")?;
        if let Some(urgency) = &self.urgency {
            ConfigValidator::parses::<Urgency>(urgency, "urgency")?;
        }
        Ok(())
    }
}

/// Merges defaults, settings files and environment variables, later layers winning.
pub struct SettingsLoader {
    files: Vec<PathBuf>,
    env: Option<EnvLoader>,
    overrides: Map<String, Value>,
}

impl SettingsLoader {
    /// Defaults plus `PWA_PUSH_*` variables.
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            env: Some(EnvLoader::default()),
            overrides: Map::new(),
        }
    }

    /// Add a settings file (JSON, TOML or `.env`).
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Read variables with a different prefix.
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env = Some(EnvLoader::new(prefix));
        self
    }

    /// Ignore the process environment.
    pub fn without_env(mut self) -> Self {
        self.env = None;
        self
    }

    /// Set one value on top of every other layer.
    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.overrides.insert(key.to_string(), value.into());
        self
    }

    /// Merge all layers and validate the result.
    pub fn load(&self) -> Result<PushSettings> {
        let env = self.env.as_ref().map(EnvLoader::load).unwrap_or_default();
        self.load_with_env(env.into_iter())
    }

    /// Like [`load`](Self::load) with an explicit variable set already stripped of its prefix.
    pub fn load_with_env<I>(&self, env: I) -> Result<PushSettings>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut merged = Map::new();

        for path in &self.files {
            let loader = ConfigLoader::auto(path)?;
            let layer = loader.load_file(path)?;
            merge(&mut merged, layer, loader.format() == FileFormat::Env)?;
        }

        let env_layer: Map<String, Value> = env
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect();
        merge(&mut merged, env_layer, true)?;
        merge(&mut merged, self.overrides.clone(), false)?;

        let settings: PushSettings = serde_json::from_value(Value::Object(merged))
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Overlay `layer` onto `target`; string layers get numeric keys converted.
fn merge(target: &mut Map<String, Value>, layer: Map<String, Value>, from_strings: bool) -> Result<()> {
    for (key, value) in layer {
        let value = match value {
            Value::String(s) if from_strings && NUMERIC_KEYS.contains(&key.as_str()) => {
                let n: u64 = s.trim().parse().map_err(|_| {
                    ConfigError::ParseError(format!("{} must be a number, got {:?}", key, s))
                })?;
                Value::from(n)
            }
            other => other,
        };
        target.insert(key, value);
    }
    Ok(())
}
