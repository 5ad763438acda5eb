//! Model artifact persistence.
//!
//! The artifact is a single JSON file. Writes go to a sibling temp file that
//! is fsynced and then renamed over the target, so readers only ever see a
//! complete previous or complete new artifact.

use chrono::{DateTime, Utc};
use fd_types::{config_error, FdError, FdResult, ModelError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use crate::pipeline::ScoringPipeline;

/// Descriptive fields stored alongside the fitted pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub n_features: usize,
    pub feature_names: Vec<String>,
    /// Selected inverse regularization strength.
    pub c: f64,
    /// Mean cross-validated macro recall of the selected candidate.
    pub cv_score: f64,
    pub trained_at: DateTime<Utc>,
}

/// Serialized fitted model produced by training and consumed by scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub metadata: ArtifactMetadata,
    pub pipeline: ScoringPipeline,
}

impl ModelArtifact {
    fn validate(&self) -> Result<(), ModelError> {
        self.pipeline.check_consistency()?;
        if self.pipeline.n_features() != self.metadata.n_features {
            return Err(ModelError::Corrupt {
                message: format!(
                    "metadata declares {} features but the model has {}",
                    self.metadata.n_features,
                    self.pipeline.n_features()
                ),
            });
        }
        if self.metadata.n_features == 0 {
            return Err(ModelError::Corrupt {
                message: "model has no features".to_string(),
            });
        }
        Ok(())
    }
}

/// Reads and writes the artifact at one fixed path.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    path: PathBuf,
}

impl ArtifactStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically replace the artifact file.
    pub fn save(&self, artifact: &ModelArtifact) -> FdResult<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| config_error!("artifact path {} has no file name", self.path.display()))?
            .to_string_lossy();
        let temp_path = parent.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

        let written = Self::write_temp(&temp_path, artifact)
            .and_then(|_| fs::rename(&temp_path, &self.path).map_err(FdError::from));

        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&temp_path) {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %temp_path.display(), error = %cleanup, "Failed to remove temporary artifact");
                }
            }
            return Err(e);
        }

        info!(path = %self.path.display(), "Model artifact written");
        Ok(())
    }

    fn write_temp(temp_path: &Path, artifact: &ModelArtifact) -> FdResult<()> {
        let file = fs::File::create(temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, artifact)?;
        writer.flush()?;
        let file = writer.into_inner().map_err(|e| FdError::Io(e.into_error()))?;
        file.sync_all()?;
        Ok(())
    }

    /// Load and validate the artifact.
    pub fn load(&self) -> FdResult<ModelArtifact> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ModelError::ArtifactNotFound {
                    path: self.path.display().to_string(),
                }
                .into())
            }
            Err(e) => return Err(e.into()),
        };

        let artifact: ModelArtifact =
            serde_json::from_slice(&bytes).map_err(|e| ModelError::Corrupt {
                message: format!("{}: {}", self.path.display(), e),
            })?;
        artifact.validate()?;

        info!(
            path = %self.path.display(),
            features = artifact.metadata.n_features,
            c = artifact.metadata.c,
            trained_at = %artifact.metadata.trained_at,
            "Model artifact loaded"
        );
        Ok(artifact)
    }
}
