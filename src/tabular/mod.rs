//! Tabular diabetes-risk pipeline: validate, scale, run, decode, bucket.

pub mod decode;
pub mod descriptor;
pub mod engine;
pub mod request;

pub use decode::{InferenceOutcome, OutputEncoding};
pub use descriptor::{ModelDescriptor, ScaledFeatureVector};
pub use engine::{OnnxTabularModel, TabularModel};
pub use request::{FeatureRow, TabularRequest, FEATURE_COUNT, FEATURE_ORDER};

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::risk::RiskLevel;

/// Result of one tabular prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TabularPrediction {
    pub prediction: u8,
    pub probability: f64,
    pub risk_level: RiskLevel,
}

/// The tabular model and its scaling descriptor, loaded once at startup
#[derive(Clone)]
pub struct TabularService {
    model: Arc<dyn TabularModel>,
    descriptor: Arc<ModelDescriptor>,
}

impl TabularService {
    pub fn new(model: Arc<dyn TabularModel>, descriptor: ModelDescriptor) -> Self {
        Self {
            model,
            descriptor: Arc::new(descriptor),
        }
    }

    /// Load both artifacts. Either one missing is fatal for the service.
    pub fn load(model_path: &Path, descriptor_path: &Path) -> Result<Self> {
        let descriptor = ModelDescriptor::load(descriptor_path)?;
        let model = OnnxTabularModel::load(model_path, FEATURE_COUNT)?;
        Ok(Self::new(Arc::new(model), descriptor))
    }

    pub fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    /// Always true: a service is only built from a loaded model and descriptor.
    pub fn is_loaded(&self) -> bool {
        true
    }

    /// Run the full pipeline for one request.
    pub fn predict(&self, request: &TabularRequest) -> Result<TabularPrediction> {
        let scaled = self.descriptor.scale(&request.features().to_array());
        let outputs = self.model.run(&scaled)?;
        let outcome = InferenceOutcome::decode(&outputs)?;
        tracing::debug!(
            prediction = outcome.predicted_class,
            probability = outcome.probability,
            "tabular inference complete"
        );
        Ok(TabularPrediction {
            prediction: outcome.predicted_class,
            probability: outcome.probability,
            risk_level: RiskLevel::from_probability(outcome.probability),
        })
    }
}
