use crate::models::StationConfig;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::fs;

/// File name of the station configuration inside the config directory
pub const CONFIG_FILE_NAME: &str = "spielviel.yaml";

/// Default prefix for environment overrides (`SPIELVIEL_SCANNER__MIN_BARCODE_LENGTH=13`)
pub const ENV_PREFIX: &str = "SPIELVIEL";

/// Configuration manager for loading and saving the station configuration.
///
/// Values are layered: built-in defaults, then `spielviel.yaml` in the config
/// directory (optional), then environment variables.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    config_path: Utf8PathBuf,
    env_prefix: String,
}

impl ConfigManager {
    /// Create a new ConfigManager, creating `config_dir` if needed
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            config_path: config_dir.join(CONFIG_FILE_NAME),
            config_dir,
            env_prefix: ENV_PREFIX.to_string(),
        })
    }

    /// Use a different environment prefix (tests use unique ones)
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }

    /// Load and validate the layered configuration
    pub fn load(&self) -> Result<StationConfig> {
        if !self.config_path.exists() {
            tracing::warn!(
                "Config file not found at {}, using defaults and environment",
                self.config_path
            );
        }

        let layered = Config::builder()
            .add_source(File::new(self.config_path.as_str(), FileFormat::Yaml).required(false))
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read config: {}", self.config_path))?;

        let config: StationConfig = layered
            .try_deserialize()
            .with_context(|| format!("Failed to parse config: {}", self.config_path))?;

        config
            .validate()
            .with_context(|| format!("Invalid config: {}", self.config_path))?;

        tracing::info!("Loaded config from {}", self.config_path);
        Ok(config)
    }

    /// Save the configuration as YAML
    pub fn save(&self, config: &StationConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize config to YAML")?;

        fs::write(&self.config_path, yaml_string)
            .with_context(|| format!("Failed to write config: {}", self.config_path))?;

        tracing::info!("Saved config to {}", self.config_path);
        Ok(())
    }

    /// Write the default configuration unless a file already exists.
    ///
    /// Returns true if a file was written.
    pub fn write_default_if_missing(&self) -> Result<bool> {
        if self.config_path.exists() {
            return Ok(false);
        }
        self.save(&StationConfig::default())?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager() -> (TempDir, ConfigManager) {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let manager = ConfigManager::new(dir)
            .unwrap()
            .with_env_prefix("SPIELVIEL_UNIT_UNSET");
        (temp_dir, manager)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let (_temp_dir, manager) = manager();
        assert_eq!(manager.load().unwrap(), StationConfig::default());
    }

    #[test]
    fn test_write_default_only_once() {
        let (_temp_dir, manager) = manager();

        assert!(manager.write_default_if_missing().unwrap());
        assert!(manager.config_path().exists());
        assert!(!manager.write_default_if_missing().unwrap());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let (_temp_dir, manager) = manager();
        fs::write(manager.config_path(), "scanner:\n  max_key_interval_ms: 0\n").unwrap();

        let err = manager.load().unwrap_err();
        assert!(format!("{:#}", err).contains("max_key_interval_ms"));
    }
}
