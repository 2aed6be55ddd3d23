//! Pool settings and declarative pool manifests

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};
use crate::pool::RegisterContext;

/// Registry-wide behaviour settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Spread manifest prewarming over ticks instead of doing it up front
    pub incremental_prewarm: bool,
    /// Instances created per tick by incremental prewarming
    pub prewarm_batch: usize,
    /// Default log filter used by applications
    pub log_level: String,
}

impl PoolSettings {
    /// Create settings with defaults
    pub fn new() -> Self {
        Self {
            incremental_prewarm: false,
            prewarm_batch: 5,
            log_level: "info".to_string(),
        }
    }

    /// Enable or disable incremental prewarming
    pub fn with_incremental_prewarm(mut self, enabled: bool, batch: usize) -> Self {
        self.incremental_prewarm = enabled;
        self.prewarm_batch = batch;
        self
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prewarm_batch == 0 {
            return Err(ConfigError::Invalid("prewarm_batch must be at least 1".to_string()));
        }
        if self.log_level.is_empty() {
            return Err(ConfigError::Invalid("log_level cannot be empty".to_string()));
        }
        Ok(())
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for PoolSettings {}

/// Declarative list of pools to register at startup
///
/// Each entry is a register context, so a manifest replays exactly what a
/// chain of `RegisterBuilder` calls would have configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Serialize",
    deserialize = "T: DeserializeOwned"
))]
pub struct PoolManifest<T> {
    /// Registry settings
    #[serde(default)]
    pub settings: PoolSettings,
    /// Pools to register, in order
    #[serde(default = "Vec::new")]
    pub pools: Vec<RegisterContext<T>>,
}

impl<T> PoolManifest<T> {
    /// Create an empty manifest
    pub fn new() -> Self {
        Self {
            settings: PoolSettings::default(),
            pools: Vec::new(),
        }
    }

    /// Append a pool entry
    pub fn with_pool(mut self, entry: RegisterContext<T>) -> Self {
        self.pools.push(entry);
        self
    }

    /// Validate settings and entries
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.settings.validate()?;

        let mut seen = std::collections::HashSet::new();
        for entry in &self.pools {
            if entry.key.is_empty() {
                return Err(ConfigError::Invalid("pool key cannot be empty".to_string()));
            }
            if !seen.insert(entry.key.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate pool key '{}'", entry.key)));
            }
        }
        Ok(())
    }
}

impl<T> Default for PoolManifest<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Config for PoolManifest<T> where T: Serialize + DeserializeOwned {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults_validate() {
        let settings = PoolSettings::default();
        assert!(settings.validate().is_ok());
        assert!(!settings.incremental_prewarm);
        assert_eq!(settings.prewarm_batch, 5);
    }

    #[test]
    fn test_zero_batch_rejected() {
        let settings = PoolSettings::new().with_incremental_prewarm(true, 0);
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_manifest_from_toml() {
        let text = r#"
            [settings]
            incremental_prewarm = true
            prewarm_batch = 3

            [[pools]]
            key = "Bullet"
            template = "bullet"
            prewarm_count = 4
            max_size = 16

            [[pools]]
            key = "Spark"
            template = "spark"
        "#;

        let manifest = PoolManifest::<String>::from_toml_str(text).unwrap();
        assert!(manifest.validate().is_ok());
        assert!(manifest.settings.incremental_prewarm);
        assert_eq!(manifest.settings.prewarm_batch, 3);
        assert_eq!(manifest.settings.log_level, "info");
        assert_eq!(manifest.pools.len(), 2);

        let bullet = &manifest.pools[0];
        assert_eq!(bullet.key, "Bullet");
        assert_eq!(bullet.template.as_deref(), Some("bullet"));
        assert_eq!(bullet.prewarm_count, 4);
        assert_eq!(bullet.max_size, 16);

        let spark = &manifest.pools[1];
        assert_eq!(spark.prewarm_count, 0);
        assert_eq!(spark.max_size, RegisterContext::<String>::DEFAULT_MAX_SIZE);
    }

    #[test]
    fn test_manifest_from_ron() {
        let text = r#"(
            pools: [
                (key: "Bullet", template: Some("bullet"), prewarm_count: 2),
            ],
        )"#;

        let manifest = PoolManifest::<String>::from_ron_str(text).unwrap();
        assert_eq!(manifest.pools.len(), 1);
        assert_eq!(manifest.pools[0].prewarm_count, 2);
        assert_eq!(manifest.settings, PoolSettings::default());
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let manifest = PoolManifest::<String>::new()
            .with_pool(RegisterContext::new("Bullet"))
            .with_pool(RegisterContext::new("Bullet"));

        assert!(matches!(manifest.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file_reports_io_error() {
        let result = PoolSettings::load_from_file("does/not/exist/settings.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
