//! Optional `config.toml` in the data directory. Every field has a default,
//! so a missing file (or a missing section) means stock behavior.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use mood_core::TrainingConfig;

use crate::error::{Result, StoreError};

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub training: TrainingConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file name, relative to the data directory.
    pub database: String,
    /// Model artifact file name, relative to the data directory.
    pub model: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: "feed.db".to_string(),
            model: "recommender_model.json".to_string(),
        }
    }
}

impl Config {
    /// Read `<data_dir>/config.toml`, falling back to defaults if absent.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        let config = match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).map_err(|e| {
                StoreError::InvalidData(format!("{}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(StoreError::Io(e)),
        };
        config
            .validate()
            .map_err(|msg| StoreError::InvalidData(format!("{}: {msg}", path.display())))?;
        Ok(config)
    }

    /// Reject values that would let training bypass its gating or fit nothing.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let t = &self.training;
        if t.min_reactions < 2 {
            return Err("training.min_reactions must be >= 2".to_string());
        }
        if !t.regularization.is_finite() || t.regularization <= 0.0 {
            return Err("training.regularization must be a finite value > 0".to_string());
        }
        if t.max_iterations == 0 {
            return Err("training.max_iterations must be > 0".to_string());
        }
        if !t.tolerance.is_finite() || t.tolerance <= 0.0 {
            return Err("training.tolerance must be a finite value > 0".to_string());
        }
        if self.storage.database.trim().is_empty() || self.storage.model.trim().is_empty() {
            return Err("storage file names must not be empty".to_string());
        }
        Ok(())
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.storage.database)
    }

    pub fn model_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.storage.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.training.min_reactions, 10);
        assert_eq!(config.storage.database, "feed.db");
        assert_eq!(config.storage.model, "recommender_model.json");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = Config::parse("[training]\nmin_reactions = 4\n").unwrap();
        assert_eq!(config.training.min_reactions, 4);
        assert_eq!(config.training.regularization, 1.0);
        assert_eq!(config.storage, StorageConfig::default());
    }

    #[test]
    fn test_storage_override() {
        let config = Config::parse("[storage]\nmodel = \"m.json\"\n").unwrap();
        let dir = Path::new("/data");
        assert_eq!(config.model_path(dir), PathBuf::from("/data/m.json"));
        assert_eq!(config.database_path(dir), PathBuf::from("/data/feed.db"));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), Config::default());
    }

    fn load_str(content: &str) -> Result<Config> {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), content).unwrap();
        Config::load(dir.path())
    }

    #[test]
    fn test_defaults_validate() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_min_reactions_below_two() {
        for value in [0, 1] {
            let err = load_str(&format!("[training]\nmin_reactions = {value}\n")).unwrap_err();
            assert!(matches!(err, StoreError::InvalidData(ref m) if m.contains("min_reactions")));
        }
        assert!(load_str("[training]\nmin_reactions = 2\n").is_ok());
    }

    #[test]
    fn test_rejects_non_positive_regularization() {
        for value in ["0.0", "-1.0", "nan", "inf"] {
            let err = load_str(&format!("[training]\nregularization = {value}\n")).unwrap_err();
            assert!(
                matches!(err, StoreError::InvalidData(ref m) if m.contains("regularization")),
                "{value}: {err}"
            );
        }
    }

    #[test]
    fn test_rejects_zero_iterations() {
        let err = load_str("[training]\nmax_iterations = 0\n").unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(ref m) if m.contains("max_iterations")));
    }

    #[test]
    fn test_rejects_non_positive_tolerance() {
        for value in ["0.0", "-1e-8", "nan"] {
            let err = load_str(&format!("[training]\ntolerance = {value}\n")).unwrap_err();
            assert!(
                matches!(err, StoreError::InvalidData(ref m) if m.contains("tolerance")),
                "{value}: {err}"
            );
        }
    }

    #[test]
    fn test_rejects_empty_storage_names() {
        let err = load_str("[storage]\nmodel = \"\"\n").unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(ref m) if m.contains("storage")));
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[training\nmin_reactions = ").unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(StoreError::InvalidData(_))
        ));
    }
}
