//! Versioned JSON form of a trained scoring model.
//!
//! ```json
//! {
//!   "version": "1",
//!   "trainedAt": "2026-10-19T20:00:00Z",
//!   "samples": 42,
//!   "positives": 11,
//!   "pipeline": { "categories": ["memes", "pics"], "coefficients": [0.8, -0.4], "intercept": 0.1 }
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{Pipeline, ScoringModel, TrainedModel, TrainingConfig};

pub const ARTIFACT_VERSION: &str = "1";

#[derive(Serialize, Deserialize, Debug)]
pub struct ModelArtifact {
    pub version: String,
    #[serde(rename = "trainedAt", default)]
    pub trained_at: String,
    #[serde(default)]
    pub samples: usize,
    #[serde(default)]
    pub positives: usize,
    pub pipeline: Pipeline,
}

#[derive(Debug)]
pub enum ArtifactError {
    /// Only trained models have an artifact.
    Untrained,
    Json(serde_json::Error),
    UnsupportedVersion(String),
    Invalid(String),
}

impl fmt::Display for ArtifactError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactError::Untrained => write!(f, "model is not trained"),
            ArtifactError::Json(e) => write!(f, "malformed model artifact: {e}"),
            ArtifactError::UnsupportedVersion(v) => {
                write!(f, "unsupported model artifact version '{v}'")
            }
            ArtifactError::Invalid(msg) => write!(f, "invalid model artifact: {msg}"),
        }
    }
}

impl std::error::Error for ArtifactError {}

impl From<serde_json::Error> for ArtifactError {
    fn from(e: serde_json::Error) -> Self {
        ArtifactError::Json(e)
    }
}

impl ModelArtifact {
    pub fn from_trained(trained: &TrainedModel) -> Self {
        Self {
            version: ARTIFACT_VERSION.to_string(),
            trained_at: trained.trained_at.clone(),
            samples: trained.samples,
            positives: trained.positives,
            pipeline: trained.pipeline.clone(),
        }
    }

    /// Check structural consistency and convert back into a trained model.
    pub fn into_trained(self) -> Result<TrainedModel, ArtifactError> {
        if self.version != ARTIFACT_VERSION {
            return Err(ArtifactError::UnsupportedVersion(self.version));
        }
        let p = &self.pipeline;
        if p.categories.len() != p.coefficients.len() {
            return Err(ArtifactError::Invalid(format!(
                "{} categories but {} coefficients",
                p.categories.len(),
                p.coefficients.len()
            )));
        }
        if p.categories.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ArtifactError::Invalid(
                "categories must be sorted and unique".to_string(),
            ));
        }
        if !p.intercept.is_finite() || p.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ArtifactError::Invalid("non-finite parameter".to_string()));
        }

        Ok(TrainedModel {
            pipeline: self.pipeline,
            samples: self.samples,
            positives: self.positives,
            trained_at: self.trained_at,
        })
    }
}

/// Serialize a trained model. Fails for an untrained one.
pub fn export_model(model: &ScoringModel) -> Result<String, ArtifactError> {
    let trained = model.trained().ok_or(ArtifactError::Untrained)?;
    Ok(serde_json::to_string_pretty(&ModelArtifact::from_trained(
        trained,
    ))?)
}

/// Rebuild a trained model from its JSON artifact.
pub fn import_model(json: &str, config: TrainingConfig) -> Result<ScoringModel, ArtifactError> {
    let artifact: ModelArtifact = serde_json::from_str(json)?;
    Ok(ScoringModel::from_trained(artifact.into_trained()?, config))
}
