//! Fitted artifact loader
//!
//! Loads the scaler and isolation-forest artifacts the offline trainer
//! exported, validating them against the serving feature schema. Loading
//! happens once at process start and fails fast; nothing here is
//! recoverable per request.

use crate::feature_extractor::FeatureSchema;
use crate::models::forest::IsolationForest;
use crate::models::scaler::StandardScaler;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// File names the trainer writes into the artifacts directory.
pub const SCALER_FILE: &str = "scaler.json";
pub const FOREST_FILE: &str = "isolation_forest.json";

/// Scaler artifact as exported by the trainer.
#[derive(Debug, Deserialize)]
struct ScalerArtifact {
    schema_version: u32,
    feature_names: Vec<String>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

/// Loader for fitted artifacts.
pub struct ArtifactLoader {
    schema: FeatureSchema,
}

impl ArtifactLoader {
    /// Create a loader validating against the given serving schema.
    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    /// Load both artifacts from a directory.
    pub fn load<P: AsRef<Path>>(&self, dir: P) -> Result<(StandardScaler, IsolationForest)> {
        let dir = dir.as_ref();
        let scaler = self.load_scaler(&dir.join(SCALER_FILE))?;
        let forest = self.load_forest(&dir.join(FOREST_FILE))?;
        Ok((scaler, forest))
    }

    /// Load and validate the normalization parameters.
    pub fn load_scaler(&self, path: &Path) -> Result<StandardScaler> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read scaler artifact {}", path.display()))?;
        let artifact: ScalerArtifact = serde_json::from_str(&raw)
            .with_context(|| format!("malformed scaler artifact {}", path.display()))?;

        self.check_schema(artifact.schema_version, &artifact.feature_names, "scaler")?;

        if artifact.mean.len() != self.schema.len() || artifact.scale.len() != self.schema.len() {
            bail!(
                "scaler artifact has {} mean / {} scale entries, schema has {}",
                artifact.mean.len(),
                artifact.scale.len(),
                self.schema.len()
            );
        }

        let scaler = StandardScaler::new(artifact.mean, artifact.scale);
        if let Some(index) = scaler.degenerate_index() {
            bail!("scaler artifact has zero or non-finite scale at position {index}");
        }

        info!(
            path = %path.display(),
            features = scaler.len(),
            "Scaler parameters loaded"
        );

        Ok(scaler)
    }

    /// Load and validate the fitted forest.
    pub fn load_forest(&self, path: &Path) -> Result<IsolationForest> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read forest artifact {}", path.display()))?;
        let forest: IsolationForest = serde_json::from_str(&raw)
            .with_context(|| format!("malformed forest artifact {}", path.display()))?;

        self.check_schema(forest.schema_version, &forest.feature_names, "forest")?;
        forest
            .validate()
            .with_context(|| format!("invalid forest artifact {}", path.display()))?;

        info!(
            path = %path.display(),
            trees = forest.trees.len(),
            sample_size = forest.sample_size,
            "Isolation forest loaded"
        );

        Ok(forest)
    }

    /// Artifacts fitted against a different feature layout are unusable;
    /// reject them before they can corrupt scores.
    fn check_schema(&self, version: u32, names: &[String], what: &str) -> Result<()> {
        if version != self.schema.version() {
            bail!(
                "{what} artifact was fitted for schema version {version}, serving schema is {}",
                self.schema.version()
            );
        }
        if names != self.schema.columns() {
            bail!(
                "{what} artifact feature order {names:?} does not match serving schema {:?}",
                self.schema.columns()
            );
        }
        Ok(())
    }
}
