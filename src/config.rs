use crate::error::ArborError;
use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::{Path, PathBuf},
};

/// Name of the optional per-vault configuration file.
pub const CONFIG_FILE_NAME: &str = "arbor.toml";

pub const DEFAULT_NOTE_EXT: &str = "md";
pub const DEFAULT_SCHEMA_EXT: &str = "schema.yml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Vault root directory. Relative paths in the config file resolve against the file.
    pub vault: PathBuf,
    /// Extension of note files, without the leading dot.
    pub note_ext: String,
    /// Suffix of schema module files, without the leading dot.
    pub schema_ext: String,
    /// Skip dot-files and dot-directories while enumerating the vault.
    pub skip_hidden: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            vault: PathBuf::from("."),
            note_ext: DEFAULT_NOTE_EXT.to_string(),
            schema_ext: DEFAULT_SCHEMA_EXT.to_string(),
            skip_hidden: true,
        }
    }
}

impl EngineConfig {
    pub fn new<P: AsRef<Path>>(vault: P) -> Self {
        EngineConfig {
            vault: vault.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Load `arbor.toml` from the vault when present, defaults otherwise.
    pub fn for_vault<P: AsRef<Path>>(vault: P) -> Result<Self, ArborError> {
        let provider = TomlConfigProvider::new(vault.as_ref().join(CONFIG_FILE_NAME));
        let mut config = provider.get_config()?;
        if config.vault == Path::new(".") {
            config.vault = vault.as_ref().to_path_buf();
        } else if config.vault.is_relative() {
            config.vault = vault.as_ref().join(&config.vault);
        }
        Ok(config)
    }
}

pub trait ConfigProvider: Send + Sync {
    fn get_config(&self) -> Result<EngineConfig, ArborError>;
    fn set_config(&self, config: &EngineConfig) -> Result<(), ArborError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TomlConfigProvider {
    path: PathBuf,
}

impl TomlConfigProvider {
    pub fn new(path: PathBuf) -> Self {
        TomlConfigProvider { path }
    }
}

impl ConfigProvider for TomlConfigProvider {
    fn get_config(&self) -> Result<EngineConfig, ArborError> {
        tracing::debug!("Attempting to read config from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Config file not found, using defaults.");
            return Ok(EngineConfig::default());
        }
        let content = read_to_string(&self.path)?;
        Ok(toml::from_str(&content)?)
    }

    fn set_config(&self, config: &EngineConfig) -> Result<(), ArborError> {
        tracing::debug!("Attempting to write config to: {:?}", &self.path);
        let toml_string = toml::to_string(config)?;
        write(&self.path, toml_string)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults_rooted_at_vault() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::for_vault(dir.path()).unwrap();
        assert_eq!(config.note_ext, "md");
        assert_eq!(config.schema_ext, "schema.yml");
        assert_eq!(config.vault.as_os_str(), dir.path().as_os_str());
    }

    #[test]
    fn partial_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "note_ext = \"markdown\"\n").unwrap();
        let config = EngineConfig::for_vault(dir.path()).unwrap();
        assert_eq!(config.note_ext, "markdown");
        assert_eq!(config.schema_ext, "schema.yml");
        assert!(config.skip_hidden);

        let provider = TomlConfigProvider::new(dir.path().join(CONFIG_FILE_NAME));
        provider.set_config(&EngineConfig::new("notes")).unwrap();
        assert_eq!(provider.get_config().unwrap().vault, PathBuf::from("notes"));
    }
}
