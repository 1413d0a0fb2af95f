//! Artifact loader

use super::artifact::ArtifactFile;
use super::onnx::OnnxClassifier;
use super::Classifier;
use crate::config::ModelConfig;
use crate::error::{ShieldError, ShieldResult};
use crate::feature_extractor::{FeatureEncoder, InputSchema};
use std::path::Path;
use tracing::info;

/// Artifact split into its parts, ready to back a prediction service
pub struct LoadedArtifact {
    /// Artifact name
    pub name: String,
    /// Preprocessing transform for incoming records
    pub encoder: FeatureEncoder,
    /// The classifier itself
    pub classifier: Box<dyn Classifier>,
}

/// Loader for JSON and ONNX artifacts
pub struct ModelLoader {
    /// Schema for artifacts that do not describe themselves (ONNX)
    onnx_schema: InputSchema,
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a loader with default settings (anonymized schema, 1 thread)
    pub fn new() -> Self {
        Self {
            onnx_schema: InputSchema::Anonymized,
            onnx_threads: 1,
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            onnx_schema: config.schema,
            onnx_threads: config.onnx_threads.max(1),
        }
    }

    pub fn with_onnx_schema(mut self, schema: InputSchema) -> Self {
        self.onnx_schema = schema;
        self
    }

    pub fn with_threads(mut self, onnx_threads: usize) -> Self {
        self.onnx_threads = onnx_threads.max(1);
        self
    }

    /// Load an artifact from file, dispatching on its extension.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> ShieldResult<LoadedArtifact> {
        let path = path.as_ref();

        if !path.is_file() {
            return Err(ShieldError::artifact(format!(
                "artifact not found: {}",
                path.display()
            )));
        }

        let is_onnx = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("onnx"))
            .unwrap_or(false);

        let loaded = if is_onnx {
            self.load_onnx(path)?
        } else {
            self.load_json(path)?
        };

        info!(
            model = %loaded.name,
            kind = loaded.classifier.kind(),
            schema = loaded.encoder.schema().as_str(),
            features = loaded.classifier.input_width(),
            path = %path.display(),
            "Artifact loaded successfully"
        );

        Ok(loaded)
    }

    fn load_json(&self, path: &Path) -> ShieldResult<LoadedArtifact> {
        let bytes = std::fs::read(path).map_err(|e| {
            ShieldError::artifact(format!("failed to read {}: {}", path.display(), e))
        })?;

        let (name, encoder, classifier) = ArtifactFile::from_slice(&bytes)?.into_parts()?;

        Ok(LoadedArtifact {
            name,
            encoder,
            classifier,
        })
    }

    fn load_onnx(&self, path: &Path) -> ShieldResult<LoadedArtifact> {
        let encoder = FeatureEncoder::for_schema(self.onnx_schema);
        let classifier = OnnxClassifier::load(path, encoder.width(), self.onnx_threads)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx_model".to_string());

        Ok(LoadedArtifact {
            name,
            encoder,
            classifier: Box::new(classifier),
        })
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}
