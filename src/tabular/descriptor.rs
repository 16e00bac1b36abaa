//! Scaling descriptor shipped next to the tabular model.
//!
//! The descriptor is read once from `model_info.json` and validated on load:
//! mean and scale vectors must both have one entry per model feature, and every
//! scale must be finite and non-zero. Scaling itself is then branch-free.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::request::FEATURE_COUNT;
use crate::error::{Error, Result};

/// On-disk layout of `model_info.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawDescriptor {
    #[serde(default)]
    feature_names: Vec<String>,
    scaler_mean: Vec<f32>,
    scaler_scale: Vec<f32>,
    #[serde(default)]
    accuracy: Option<f64>,
}

/// Validated per-feature standardization parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDescriptor", into = "RawDescriptor")]
pub struct ModelDescriptor {
    feature_names: Vec<String>,
    mean: [f32; FEATURE_COUNT],
    scale: [f32; FEATURE_COUNT],
    accuracy: Option<f64>,
}

/// Model input produced by [`ModelDescriptor::scale`]
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledFeatureVector([f32; FEATURE_COUNT]);

impl ScaledFeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl ModelDescriptor {
    pub fn new(
        feature_names: Vec<String>,
        mean: Vec<f32>,
        scale: Vec<f32>,
        accuracy: Option<f64>,
    ) -> Result<Self> {
        if mean.len() != scale.len() {
            return Err(Error::Config(format!(
                "scaler_mean has {} entries but scaler_scale has {}",
                mean.len(),
                scale.len()
            )));
        }
        let mean: [f32; FEATURE_COUNT] = mean.try_into().map_err(|v: Vec<f32>| {
            Error::Config(format!(
                "scaler vectors have {} entries, model expects {}",
                v.len(),
                FEATURE_COUNT
            ))
        })?;
        // lengths already checked against mean
        let scale: [f32; FEATURE_COUNT] = scale
            .try_into()
            .map_err(|_| Error::Config("scaler_scale length mismatch".into()))?;

        if let Some(i) = scale.iter().position(|s| *s == 0.0 || !s.is_finite()) {
            return Err(Error::Config(format!(
                "scaler_scale[{}] = {} is not a usable divisor",
                i, scale[i]
            )));
        }
        if let Some(i) = mean.iter().position(|m| !m.is_finite()) {
            return Err(Error::Config(format!("scaler_mean[{}] is not finite", i)));
        }
        if !feature_names.is_empty() && feature_names.len() != FEATURE_COUNT {
            return Err(Error::Config(format!(
                "feature_names has {} entries, model expects {}",
                feature_names.len(),
                FEATURE_COUNT
            )));
        }

        Ok(Self {
            feature_names,
            mean,
            scale,
            accuracy,
        })
    }

    /// Read and validate a descriptor file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ModelNotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| Error::Config(format!("invalid model descriptor: {}", e)))
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Accuracy reported by training, if recorded.
    pub fn accuracy(&self) -> Option<f64> {
        self.accuracy
    }

    /// Standardize a raw feature row: `(x - mean) / scale`.
    pub fn scale(&self, raw: &[f32; FEATURE_COUNT]) -> ScaledFeatureVector {
        let mut out = [0.0f32; FEATURE_COUNT];
        for (i, x) in raw.iter().enumerate() {
            out[i] = (x - self.mean[i]) / self.scale[i];
        }
        ScaledFeatureVector(out)
    }

    /// Inverse of [`ModelDescriptor::scale`].
    pub fn unscale(&self, scaled: &ScaledFeatureVector) -> [f32; FEATURE_COUNT] {
        let mut out = [0.0f32; FEATURE_COUNT];
        for (i, z) in scaled.0.iter().enumerate() {
            out[i] = z * self.scale[i] + self.mean[i];
        }
        out
    }
}

impl TryFrom<RawDescriptor> for ModelDescriptor {
    type Error = Error;

    fn try_from(raw: RawDescriptor) -> Result<Self> {
        Self::new(raw.feature_names, raw.scaler_mean, raw.scaler_scale, raw.accuracy)
    }
}

impl From<ModelDescriptor> for RawDescriptor {
    fn from(d: ModelDescriptor) -> Self {
        RawDescriptor {
            feature_names: d.feature_names,
            scaler_mean: d.mean.to_vec(),
            scaler_scale: d.scale.to_vec(),
            accuracy: d.accuracy,
        }
    }
}
