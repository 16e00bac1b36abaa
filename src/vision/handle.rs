//! Lazily loaded, process-lifetime image model.

use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::engine::{ImageClassifier, ImageModelLoader, InputSize};
use crate::error::{Error, Result};

/// A loaded classifier together with the resolution derived from its shape
pub struct LoadedImageModel {
    classifier: Arc<dyn ImageClassifier>,
    input_size: Option<InputSize>,
}

impl LoadedImageModel {
    pub fn new(classifier: Arc<dyn ImageClassifier>) -> Self {
        let input_size = match InputSize::from_shape(classifier.input_shape()) {
            Ok(size) => Some(size),
            Err(e) => {
                warn!("image model loaded but is unusable: {}", e);
                None
            }
        };
        Self {
            classifier,
            input_size,
        }
    }

    pub fn classifier(&self) -> &Arc<dyn ImageClassifier> {
        &self.classifier
    }

    /// `(H, W)` the classifier expects, or why it cannot be derived.
    pub fn expected_size(&self) -> Result<InputSize> {
        match self.input_size {
            Some(size) => Ok(size),
            None => InputSize::from_shape(self.classifier.input_shape()),
        }
    }
}

/// Initialize-once guard around the image model.
///
/// Concurrent first callers wait on a single load. A failed load leaves the
/// handle empty so the next caller tries again.
pub struct ImageModelHandle {
    loader: Arc<dyn ImageModelLoader>,
    cell: OnceCell<Arc<LoadedImageModel>>,
}

impl ImageModelHandle {
    pub fn new(loader: Arc<dyn ImageModelLoader>) -> Self {
        Self {
            loader,
            cell: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Return the loaded model, loading it first if needed.
    pub async fn get(&self) -> Result<Arc<LoadedImageModel>> {
        let loaded = self
            .cell
            .get_or_try_init(|| async {
                let loader = Arc::clone(&self.loader);
                let classifier = tokio::task::spawn_blocking(move || loader.load()).await??;
                info!("image model loaded");
                Ok::<_, Error>(Arc::new(LoadedImageModel::new(classifier)))
            })
            .await?;
        Ok(Arc::clone(loaded))
    }

    /// Best-effort eager load used at startup.
    pub async fn preload(&self) {
        if let Err(e) = self.get().await {
            warn!("image model lazy-load failed at startup: {}", e);
        }
    }
}
