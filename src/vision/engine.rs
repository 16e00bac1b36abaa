//! Image classifier runtime and output interpretation.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tract_onnx::prelude::*;
use tract_onnx::tract_hir::internal::DimLike;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Labels of the tumor classifier, indexed by arg-max output position.
pub const TUMOR_CLASSES: [&str; 4] = ["glioma", "meningioma", "no_tumor", "pituitary"];

/// A loaded image classifier taking a `(1, H, W, 3)` float tensor
pub trait ImageClassifier: Send + Sync {
    /// Declared input shape; `None` marks a dimension the model leaves open.
    fn input_shape(&self) -> &[Option<usize>];
    fn output_shape(&self) -> &[Option<usize>];
    fn layer_count(&self) -> usize;
    /// Class scores for a single image.
    fn predict(&self, input: tract_ndarray::Array4<f32>) -> Result<Vec<f32>>;
}

/// Spatial resolution an image classifier expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InputSize {
    pub height: u32,
    pub width: u32,
}

impl InputSize {
    /// Read `(H, W)` from an NHWC input shape.
    pub fn from_shape(shape: &[Option<usize>]) -> Result<Self> {
        let unexpected = || {
            Error::ModelLoad(format!("unexpected model input shape: {}", format_shape(shape)))
        };
        if shape.len() < 4 {
            return Err(unexpected());
        }
        match (shape[1], shape[2]) {
            (Some(h), Some(w)) if h > 0 && w > 0 => Ok(Self {
                height: u32::try_from(h).map_err(|_| unexpected())?,
                width: u32::try_from(w).map_err(|_| unexpected())?,
            }),
            _ => Err(unexpected()),
        }
    }
}

/// Render a shape the way frameworks print them, e.g. `(None, 224, 224, 3)`.
pub fn format_shape(shape: &[Option<usize>]) -> String {
    let dims: Vec<String> = shape
        .iter()
        .map(|d| d.map_or_else(|| "None".to_string(), |v| v.to_string()))
        .collect();
    format!("({})", dims.join(", "))
}

/// Fixed mapping from output index to class label
#[derive(Debug, Clone, Copy)]
pub struct ClassLabelTable {
    labels: &'static [&'static str],
}

impl Default for ClassLabelTable {
    fn default() -> Self {
        Self::new(&TUMOR_CLASSES)
    }
}

impl ClassLabelTable {
    pub const fn new(labels: &'static [&'static str]) -> Self {
        Self { labels }
    }

    pub fn labels(&self) -> &'static [&'static str] {
        self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label for an output index; an index past the table is a model error.
    pub fn label(&self, index: usize) -> Result<&'static str> {
        self.labels.get(index).copied().ok_or_else(|| {
            Error::Inference(format!(
                "model predicted class {} but only {} labels are known",
                index,
                self.labels.len()
            ))
        })
    }
}

/// Index and value of the largest score. Ties resolve to the first index;
/// NaN scores never win.
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in scores.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best
}

/// ONNX image classifier executed by tract
pub struct OnnxImageClassifier {
    plan: TypedRunnableModel<TypedModel>,
    input_shape: Vec<Option<usize>>,
    output_shape: Vec<Option<usize>>,
    layers: usize,
}

impl OnnxImageClassifier {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ModelNotFound(path.to_path_buf()));
        }
        info!("Loading image model from {}", path.display());

        let load_err = |e: TractError| Error::ModelLoad(format!("{}: {}", path.display(), e));
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(load_err)?
            .into_typed()
            .map_err(load_err)?;

        let input_shape = concrete_dims(&model.input_fact(0).map_err(load_err)?.shape);
        let output_shape = concrete_dims(&model.output_fact(0).map_err(load_err)?.shape);
        let layers = model.nodes().len();

        let plan = model
            .into_optimized()
            .map_err(load_err)?
            .into_runnable()
            .map_err(load_err)?;

        info!(
            input_shape = %format_shape(&input_shape),
            output_shape = %format_shape(&output_shape),
            layers,
            "image model ready"
        );
        Ok(Self {
            plan,
            input_shape,
            output_shape,
            layers,
        })
    }
}

fn concrete_dims(shape: &ShapeFact) -> Vec<Option<usize>> {
    shape.iter().map(|d| d.to_usize().ok()).collect()
}

impl ImageClassifier for OnnxImageClassifier {
    fn input_shape(&self) -> &[Option<usize>] {
        &self.input_shape
    }

    fn output_shape(&self) -> &[Option<usize>] {
        &self.output_shape
    }

    fn layer_count(&self) -> usize {
        self.layers
    }

    fn predict(&self, input: tract_ndarray::Array4<f32>) -> Result<Vec<f32>> {
        let input: Tensor = input.into();
        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| Error::Inference(e.to_string()))?;
        let first = outputs
            .first()
            .ok_or_else(|| Error::Inference("model produced no outputs".into()))?;
        let scores = first
            .cast_to::<f32>()
            .map_err(|e| Error::Inference(e.to_string()))?;
        let scores = scores
            .as_slice::<f32>()
            .map_err(|e| Error::Inference(e.to_string()))?;
        Ok(scores.to_vec())
    }
}

/// Produces the image classifier on first use
pub trait ImageModelLoader: Send + Sync {
    fn load(&self) -> Result<std::sync::Arc<dyn ImageClassifier>>;
}

/// Loads an ONNX classifier from a fixed path
#[derive(Debug, Clone)]
pub struct OnnxImageLoader {
    path: PathBuf,
}

impl OnnxImageLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ImageModelLoader for OnnxImageLoader {
    fn load(&self) -> Result<std::sync::Arc<dyn ImageClassifier>> {
        let model = OnnxImageClassifier::load(&self.path)?;
        if let Some(Some(classes)) = model.output_shape.last() {
            if *classes != TUMOR_CLASSES.len() {
                warn!(
                    classes,
                    labels = TUMOR_CLASSES.len(),
                    "image model output does not match the class label table"
                );
            }
        }
        Ok(std::sync::Arc::new(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_size_from_nhwc_shape() {
        let size = InputSize::from_shape(&[None, Some(224), Some(192), Some(3)]).unwrap();
        assert_eq!(size, InputSize { height: 224, width: 192 });
    }

    #[test]
    fn rejects_short_or_open_shapes() {
        assert!(InputSize::from_shape(&[None, Some(224), Some(224)]).is_err());
        assert!(InputSize::from_shape(&[None, None, Some(224), Some(3)]).is_err());
        assert!(InputSize::from_shape(&[None, Some(224), None, Some(3)]).is_err());
        assert!(InputSize::from_shape(&[None, Some(0), Some(224), Some(3)]).is_err());
        let err = InputSize::from_shape(&[Some(1), Some(150)]).unwrap_err();
        assert!(err.to_string().contains("(1, 150)"));
    }

    #[test]
    fn formats_shapes_with_none() {
        assert_eq!(format_shape(&[None, Some(150), Some(150), Some(3)]), "(None, 150, 150, 3)");
        assert_eq!(format_shape(&[]), "()");
    }

    #[test]
    fn argmax_picks_first_maximum() {
        assert_eq!(argmax(&[0.1, 0.7, 0.15, 0.05]), Some((1, 0.7)));
        assert_eq!(argmax(&[0.4, 0.1, 0.4, 0.1]), Some((0, 0.4)));
        assert_eq!(argmax(&[f32::NAN, 0.2, 0.3]), Some((2, 0.3)));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn label_table_is_bounds_checked() {
        let table = ClassLabelTable::default();
        assert_eq!(table.label(0).unwrap(), "glioma");
        assert_eq!(table.label(3).unwrap(), "pituitary");
        assert!(matches!(table.label(4), Err(Error::Inference(_))));
    }

    #[test]
    fn missing_image_model_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let loader = OnnxImageLoader::new(dir.path().join("image_model.onnx"));
        assert!(matches!(loader.load(), Err(Error::ModelNotFound(_))));
    }
}
