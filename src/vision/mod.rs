//! Tumor image classification pipeline.
//!
//! Uploads are validated and decoded before the model is touched, so a bad
//! file is always reported as a client error even when the model itself is
//! unavailable. The model is loaded on first use through [`ImageModelHandle`].

pub mod engine;
pub mod handle;
pub mod preprocess;

pub use engine::{
    argmax, format_shape, ClassLabelTable, ImageClassifier, ImageModelLoader, InputSize,
    OnnxImageClassifier, OnnxImageLoader, TUMOR_CLASSES,
};
pub use handle::{ImageModelHandle, LoadedImageModel};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::{Error, Result};

/// Response of `POST /predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageClassification {
    #[serde(rename = "class")]
    pub label: String,
    pub confidence: f64,
}

/// Response of `GET /model-info`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageModelInfo {
    pub input_shape: Vec<Option<usize>>,
    pub output_shape: Vec<Option<usize>>,
    pub layers: usize,
    pub class_names: Vec<String>,
}

#[derive(Clone)]
pub struct ImageService {
    handle: Arc<ImageModelHandle>,
    labels: ClassLabelTable,
}

impl ImageService {
    pub fn new(handle: Arc<ImageModelHandle>) -> Self {
        Self {
            handle,
            labels: ClassLabelTable::default(),
        }
    }

    pub fn handle(&self) -> &Arc<ImageModelHandle> {
        &self.handle
    }

    pub async fn describe(&self) -> Result<ImageModelInfo> {
        let model = self.handle.get().await?;
        let classifier = model.classifier();
        Ok(ImageModelInfo {
            input_shape: classifier.input_shape().to_vec(),
            output_shape: classifier.output_shape().to_vec(),
            layers: classifier.layer_count(),
            class_names: self.labels.labels().iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Classify one uploaded image.
    pub async fn classify(
        &self,
        content_type: Option<&str>,
        bytes: bytes::Bytes,
    ) -> Result<ImageClassification> {
        preprocess::validate_upload(content_type, &bytes)?;
        let image = tokio::task::spawn_blocking(move || preprocess::decode(&bytes)).await??;

        let model = self.handle.get().await?;
        let size = model.expected_size()?;

        let scores = tokio::task::spawn_blocking(move || {
            let input = preprocess::to_tensor(&image, size);
            model.classifier().predict(input)
        })
        .await??;

        let (index, confidence) = argmax(&scores)
            .ok_or_else(|| Error::Inference("model produced no class scores".into()))?;
        let label = self.labels.label(index)?;
        debug!(label, confidence, "image classified");

        Ok(ImageClassification {
            label: label.to_string(),
            confidence: confidence as f64,
        })
    }
}
