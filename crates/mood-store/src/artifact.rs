//! Model artifact file: one JSON blob at a fixed path.
//!
//! Writes go to a uniquely named, fsynced temp file in the same directory
//! that is then renamed over the target. A crash mid-write leaves the
//! previous artifact intact, and concurrent writers never share a temp file.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use mood_core::{ScoringModel, TrainingConfig, export_model, import_model};

use crate::error::{Result, StoreError};

/// Persist a trained model, replacing any previous artifact.
pub fn save_model(model: &ScoringModel, path: &Path) -> Result<()> {
    let json = export_model(model).map_err(|e| StoreError::InvalidData(e.to_string()))?;

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(json.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;

    tracing::info!("model saved to {}", path.display());
    Ok(())
}

/// Load the artifact at `path`. A missing or unreadable artifact yields an
/// untrained model; it is never an error for the caller.
pub fn load_model(path: &Path, config: TrainingConfig) -> ScoringModel {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("no model artifact at {}, starting untrained", path.display());
            return ScoringModel::new(config);
        }
        Err(e) => {
            tracing::warn!("failed to read {}: {e}, starting untrained", path.display());
            return ScoringModel::new(config);
        }
    };

    match import_model(&json, config.clone()) {
        Ok(model) => {
            tracing::info!("model loaded from {}", path.display());
            model
        }
        Err(e) => {
            tracing::warn!("{e} ({}), starting untrained", path.display());
            ScoringModel::new(config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mood_core::{Emotion, TrainingSample};

    fn trained() -> ScoringModel {
        let mut data = Vec::new();
        for _ in 0..6 {
            data.push(TrainingSample::new(Emotion::Happy, "wholesomememes"));
            data.push(TrainingSample::new(Emotion::Sad, "dankmemes"));
        }
        let mut model = ScoringModel::default();
        model.train(&data).unwrap();
        model
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let model = trained();
        save_model(&model, &path).unwrap();

        let loaded = load_model(&path, TrainingConfig::default());
        assert!(loaded.is_trained());
        let probe = ["wholesomememes", "dankmemes", "other"];
        assert_eq!(model.predict_scores(&probe), loaded.predict_scores(&probe));
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1, "temp file should be renamed away");
    }

    #[test]
    fn test_missing_is_untrained() {
        let dir = tempfile::tempdir().unwrap();
        let model = load_model(&dir.path().join("absent.json"), TrainingConfig::default());
        assert!(!model.is_trained());
    }

    #[test]
    fn test_corrupt_is_untrained() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, "{\"version\": \"1\", \"pipel").unwrap();
        assert!(!load_model(&path, TrainingConfig::default()).is_trained());
    }

    #[test]
    fn test_untrained_cannot_be_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        assert!(save_model(&ScoringModel::default(), &path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_save_overwrites_previous() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, "stale").unwrap();
        save_model(&trained(), &path).unwrap();
        assert!(load_model(&path, TrainingConfig::default()).is_trained());
    }

    #[test]
    fn test_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/model.json");
        save_model(&trained(), &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_foreign_temp_file_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        // Another writer's in-flight temp file under the old fixed name.
        let other = dir.path().join("model.json.tmp");
        fs::write(&other, "half-written by someone else").unwrap();

        save_model(&trained(), &path).unwrap();

        assert_eq!(
            fs::read_to_string(&other).unwrap(),
            "half-written by someone else"
        );
        assert!(load_model(&path, TrainingConfig::default()).is_trained());
    }

    #[test]
    fn test_concurrent_saves_leave_valid_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let model = trained();

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..10 {
                        save_model(&model, &path).unwrap();
                    }
                });
            }
        });

        assert!(load_model(&path, TrainingConfig::default()).is_trained());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
