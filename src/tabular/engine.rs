//! Tabular model runtime.

use std::path::Path;
use tract_onnx::prelude::*;
use tracing::{debug, info};

use super::descriptor::ScaledFeatureVector;
use crate::error::{Error, Result};

/// A loaded binary classifier over a single `[1, N]` input row.
///
/// Implementations return every output tensor flattened to `f32`, in the
/// order the model declares them.
pub trait TabularModel: Send + Sync {
    fn run(&self, features: &ScaledFeatureVector) -> Result<Vec<Vec<f32>>>;
}

/// ONNX classifier executed by tract
#[derive(Debug)]
pub struct OnnxTabularModel {
    plan: TypedRunnableModel<TypedModel>,
    feature_count: usize,
}

impl OnnxTabularModel {
    /// Load and optimize the model for a `[1, feature_count]` input.
    ///
    /// A model whose declared input width disagrees with `feature_count`
    /// fails here rather than on the first request.
    pub fn load(path: &Path, feature_count: usize) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ModelNotFound(path.to_path_buf()));
        }
        info!("Loading tabular model from {}", path.display());

        let load_err = |e: TractError| Error::ModelLoad(format!("{}: {}", path.display(), e));
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(load_err)?
            .with_input_fact(0, f32::fact([1, feature_count]).into())
            .map_err(load_err)?
            .into_optimized()
            .map_err(load_err)?
            .into_runnable()
            .map_err(load_err)?;

        debug!(feature_count, "tabular model ready");
        Ok(Self { plan, feature_count })
    }
}

impl TabularModel for OnnxTabularModel {
    fn run(&self, features: &ScaledFeatureVector) -> Result<Vec<Vec<f32>>> {
        let input: Tensor = tract_ndarray::Array2::from_shape_vec(
            (1, self.feature_count),
            features.as_slice().to_vec(),
        )
        .map_err(|e| Error::OnnxInference(format!("bad input row: {}", e)))?
        .into();

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| Error::OnnxInference(e.to_string()))?;

        outputs
            .iter()
            .map(|value| -> TractResult<Vec<f32>> {
                let values = value.cast_to::<f32>()?;
                Ok(values.as_slice::<f32>()?.to_vec())
            })
            .collect::<TractResult<Vec<_>>>()
            .map_err(|e| Error::OnnxInference(format!("unreadable output tensor: {}", e)))
    }
}
