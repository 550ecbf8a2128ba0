//! Harness configuration
//!
//! All tunables are passed to the harness constructor; nothing is read from
//! process-wide state after construction. Sources are layered
//! defaults < file < environment < explicit overrides through [`ConfigBuilder`].
//!
//! Each source produces a [`Config::Layer`] that only holds the fields it
//! actually set, so an explicit value wins even when it equals the default.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use wifi_chip::{IfaceType, ReferenceChipConfig};

/// Environment variable prefix, e.g. `WIFI_HARNESS_NAN_ENABLED=true`
pub const ENV_PREFIX: &str = "WIFI_HARNESS";

/// Uniform configuration interface
pub trait Config: Serialize + serde::de::DeserializeOwned {
    /// Partial configuration produced by one source
    type Layer: serde::de::DeserializeOwned + Default;

    /// 校验配置的有效性
    fn validate(&self) -> Result<(), ConfigError>;

    fn defaults() -> Self;

    /// Apply `layer` on top of `self`
    ///
    /// # 参数
    /// - `layer`: fields set here take precedence over `self`, whatever their value
    fn merge(&self, layer: &Self::Layer) -> Result<Self, ConfigError>
    where
        Self: Sized;

    fn from_toml(toml: &str) -> Result<Self, ConfigError>
    where
        Self: Sized,
    {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(format!("TOML parse error: {}", e)))
    }

    fn from_json(json: &str) -> Result<Self, ConfigError>
    where
        Self: Sized,
    {
        serde_json::from_str(json)
            .map_err(|e| ConfigError::Parse(format!("JSON parse error: {}", e)))
    }

    /// Parse only the keys present in a TOML document
    fn layer_from_toml(toml: &str) -> Result<Self::Layer, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(format!("TOML parse error: {}", e)))
    }

    /// Parse only the keys present in a JSON document
    fn layer_from_json(json: &str) -> Result<Self::Layer, ConfigError> {
        serde_json::from_str(json)
            .map_err(|e| ConfigError::Parse(format!("JSON parse error: {}", e)))
    }

    fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(format!("TOML serialize error: {}", e)))
    }

    fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(format!("JSON serialize error: {}", e)))
    }

    /// Load from `PREFIX_KEY` environment variables
    fn from_env(prefix: &str) -> Result<Self, ConfigError>
    where
        Self: Sized,
    {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(prefix, &vars)
    }

    /// Same as [`Config::from_env`] over an explicit variable map
    fn from_vars(prefix: &str, vars: &HashMap<String, String>) -> Result<Self, ConfigError>
    where
        Self: Sized,
    {
        Self::defaults().merge(&Self::layer_from_vars(prefix, vars)?)
    }

    /// Variables under `prefix` that are present, as a layer
    fn layer_from_vars(
        _prefix: &str,
        _vars: &HashMap<String, String>,
    ) -> Result<Self::Layer, ConfigError> {
        Err(ConfigError::NotSupported(
            "Environment variable loading not implemented for this config type".to_string(),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),
}

impl From<ConfigError> for wifi_error::HarnessError {
    fn from(err: ConfigError) -> Self {
        wifi_error::HarnessError::Configuration(err.to_string())
    }
}

/// Tunables of one harness instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Whether the device is expected to support NAN; NAN scenarios are skipped otherwise
    pub nan_enabled: bool,
    /// Extra attempts after the first `ERROR_NOT_AVAILABLE`
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// Upper bound on waiting for an asynchronous NAN response
    pub callback_timeout_ms: u64,
    /// Pause between consecutive mode switches
    pub mode_toggle_delay_ms: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            nan_enabled: false,
            max_retries: 5,
            retry_delay_ms: 2,
            callback_timeout_ms: 1000,
            mode_toggle_delay_ms: 5,
        }
    }
}

impl HarnessConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn callback_timeout(&self) -> Duration {
        Duration::from_millis(self.callback_timeout_ms)
    }

    pub fn mode_toggle_delay(&self) -> Duration {
        Duration::from_millis(self.mode_toggle_delay_ms)
    }

    /// Whether scenarios for `iface_type` should run at all
    pub fn is_enabled(&self, iface_type: IfaceType) -> bool {
        match iface_type {
            IfaceType::Nan => self.nan_enabled,
            IfaceType::Sta | IfaceType::Ap | IfaceType::P2p => true,
        }
    }
}

/// [`HarnessConfig`] fields set by one source; `None` leaves the lower layer alone
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HarnessConfigLayer {
    pub nan_enabled: Option<bool>,
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub callback_timeout_ms: Option<u64>,
    pub mode_toggle_delay_ms: Option<u64>,
}

fn parse_var<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match vars.get(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Parse(format!("{}={:?} is not a valid value", key, raw))),
    }
}

impl Config for HarnessConfig {
    type Layer = HarnessConfigLayer;

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries > 1000 {
            return Err(ConfigError::Invalid("max_retries must be <= 1000".to_string()));
        }
        if self.retry_delay_ms > 60_000 {
            return Err(ConfigError::Invalid("retry_delay_ms must be <= 60000".to_string()));
        }
        if self.callback_timeout_ms == 0 {
            return Err(ConfigError::Invalid("callback_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    fn defaults() -> Self {
        Self::default()
    }

    fn merge(&self, layer: &HarnessConfigLayer) -> Result<Self, ConfigError> {
        Ok(Self {
            nan_enabled: layer.nan_enabled.unwrap_or(self.nan_enabled),
            max_retries: layer.max_retries.unwrap_or(self.max_retries),
            retry_delay_ms: layer.retry_delay_ms.unwrap_or(self.retry_delay_ms),
            callback_timeout_ms: layer.callback_timeout_ms.unwrap_or(self.callback_timeout_ms),
            mode_toggle_delay_ms: layer.mode_toggle_delay_ms.unwrap_or(self.mode_toggle_delay_ms),
        })
    }

    fn layer_from_vars(
        prefix: &str,
        vars: &HashMap<String, String>,
    ) -> Result<HarnessConfigLayer, ConfigError> {
        let key = |name: &str| format!("{}_{}", prefix, name);
        Ok(HarnessConfigLayer {
            nan_enabled: parse_var(vars, &key("NAN_ENABLED"))?,
            max_retries: parse_var(vars, &key("MAX_RETRIES"))?,
            retry_delay_ms: parse_var(vars, &key("RETRY_DELAY_MS"))?,
            callback_timeout_ms: parse_var(vars, &key("CALLBACK_TIMEOUT_MS"))?,
            mode_toggle_delay_ms: parse_var(vars, &key("MODE_TOGGLE_DELAY_MS"))?,
        })
    }
}

impl Config for ReferenceChipConfig {
    /// Chip configs come from a single file, so a layer is a whole config
    type Layer = ReferenceChipConfig;

    fn validate(&self) -> Result<(), ConfigError> {
        for iface_type in IfaceType::ALL {
            if self.iface_name(iface_type).is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "{} iface name cannot be empty",
                    iface_type
                )));
            }
        }
        if self.nan_response_delay_ms > 10_000 {
            return Err(ConfigError::Invalid(
                "nan_response_delay_ms must be <= 10000".to_string(),
            ));
        }
        Ok(())
    }

    fn defaults() -> Self {
        Self::default()
    }

    fn merge(&self, layer: &ReferenceChipConfig) -> Result<Self, ConfigError> {
        Ok(layer.clone())
    }
}

/// Layered configuration builder
///
/// # 示例
///
/// ```rust,ignore
/// let config = ConfigBuilder::<HarnessConfig>::new()
///     .with_file("harness.toml")?
///     .with_env(ENV_PREFIX)?
///     .with_override(HarnessConfigLayer { nan_enabled: Some(true), ..Default::default() })
///     .build()?;
/// ```
pub struct ConfigBuilder<C: Config> {
    base: C,
    layers: Vec<C::Layer>,
}

impl<C: Config> Default for ConfigBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Config> ConfigBuilder<C> {
    /// Start from [`Config::defaults`]
    pub fn new() -> Self {
        Self {
            base: C::defaults(),
            layers: Vec::new(),
        }
    }

    /// Add the keys present in a file; `.json` is parsed as JSON, anything else as TOML
    pub fn with_file(mut self, path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("Failed to read {}: {}", path.display(), e)))?;

        let layer = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => C::layer_from_json(&content)?,
            _ => C::layer_from_toml(&content)?,
        };
        self.layers.push(layer);
        Ok(self)
    }

    /// Add the process environment variables under `prefix`
    pub fn with_env(self, prefix: &str) -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        self.with_vars(prefix, &vars)
    }

    /// Same as [`ConfigBuilder::with_env`] over an explicit variable map
    pub fn with_vars(
        mut self,
        prefix: &str,
        vars: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let layer = C::layer_from_vars(prefix, vars)?;
        self.layers.push(layer);
        Ok(self)
    }

    /// Add an explicit layer, e.g. from command line flags
    pub fn with_override(mut self, layer: C::Layer) -> Self {
        self.layers.push(layer);
        self
    }

    /// Merge every layer in order, then validate the result
    pub fn build(self) -> Result<C, ConfigError> {
        let mut current = self.base;

        for layer in &self.layers {
            current = current.merge(layer)?;
        }

        current.validate()?;
        Ok(current)
    }
}
