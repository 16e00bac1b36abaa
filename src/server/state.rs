//! Server state management

use std::sync::Arc;

use crate::config::{ServerConfig, ServiceConfig};
use crate::error::Result;
use crate::storage::{self, PredictionStore};
use crate::tabular::TabularService;
use crate::vision::{ImageModelHandle, ImageService, OnnxImageLoader};

/// Shared server state
///
/// Every member is read-only after startup, so cloning the state per request
/// only bumps reference counts.
#[derive(Clone)]
pub struct ServerState {
    /// Tabular model and scaling descriptor, loaded at startup
    pub tabular: TabularService,

    /// Image classifier, loaded on first use
    pub vision: ImageService,

    /// Prediction log
    pub predictions: Arc<dyn PredictionStore>,

    /// Server configuration
    pub config: Arc<ServerConfig>,
}

impl ServerState {
    /// Assemble state from already constructed services
    pub fn new(
        tabular: TabularService,
        vision: ImageService,
        predictions: Arc<dyn PredictionStore>,
        config: ServerConfig,
    ) -> Self {
        Self {
            tabular,
            vision,
            predictions,
            config: Arc::new(config),
        }
    }

    /// Load models and open the prediction log described by `config`.
    ///
    /// A missing tabular model or descriptor is fatal. The image model is
    /// only attempted here when preloading is enabled, and failures are
    /// logged rather than returned.
    pub async fn load(config: &ServiceConfig) -> Result<Self> {
        let models = &config.models;

        tracing::info!("Loading tabular model from: {:?}", models.tabular_model_path());
        let tabular =
            TabularService::load(&models.tabular_model_path(), &models.model_info_path())?;
        tracing::info!(
            features = ?tabular.descriptor().feature_names(),
            accuracy = ?tabular.descriptor().accuracy(),
            "Tabular model ready"
        );

        tracing::info!("Initializing prediction log ({})", config.storage.engine);
        let predictions = storage::open_store(&config.storage)?;
        predictions.init().await?;

        let handle = Arc::new(ImageModelHandle::new(Arc::new(OnnxImageLoader::new(
            models.image_model_path(),
        ))));
        if models.preload_image_model {
            tracing::info!("Preloading image model: {:?}", models.image_model_path());
            handle.preload().await;
        }

        Ok(Self::new(
            tabular,
            ImageService::new(handle),
            predictions,
            config.server.clone(),
        ))
    }
}
