//! Normalization of raw classifier outputs into a calibrated probability.
//!
//! Trained models in the wild emit one of three encodings for a binary
//! decision: a single logit, a single already-bounded score, or a two-class
//! probability vector. The length (and for single values, the magnitude) of
//! the first output tensor selects the encoding.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Probability above which class 1 is predicted. Ties go to class 0.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Encoding of the first output tensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputEncoding {
    /// One value above 1, treated as a logit
    SingleLogit(f32),
    /// One value at most 1, treated as a score
    SingleScore(f32),
    /// `[P(class=0), P(class=1)]`
    TwoClassVector([f32; 2]),
    /// Any other length; the first element is decoded like a single value
    Other(f32),
}

impl OutputEncoding {
    /// Pick the encoding for a flattened output tensor.
    pub fn classify(output: &[f32]) -> Result<Self> {
        if output.iter().any(|v| v.is_nan()) {
            return Err(Error::OnnxInference("model output contains NaN".into()));
        }
        match *output {
            [] => Err(Error::OnnxInference("model produced an empty output tensor".into())),
            [v] if v > 1.0 => Ok(OutputEncoding::SingleLogit(v)),
            [v] => Ok(OutputEncoding::SingleScore(v)),
            // index 1 is the positive class by the paired model's convention
            [p0, p1] => Ok(OutputEncoding::TwoClassVector([p0, p1])),
            [first, ..] => Ok(OutputEncoding::Other(first)),
        }
    }

    /// Probability of the positive class, always within `[0, 1]`.
    pub fn probability(&self) -> f64 {
        match *self {
            OutputEncoding::SingleLogit(v) => sigmoid(v as f64),
            OutputEncoding::SingleScore(v) => clamp_unit(v as f64),
            OutputEncoding::TwoClassVector([_, p1]) => clamp_unit(p1 as f64),
            OutputEncoding::Other(v) => single_value_probability(v as f64),
        }
    }
}

/// Final decision for one tabular request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceOutcome {
    pub predicted_class: u8,
    pub probability: f64,
}

impl InferenceOutcome {
    pub fn from_probability(probability: f64) -> Self {
        Self {
            predicted_class: u8::from(probability > DECISION_THRESHOLD),
            probability,
        }
    }

    /// Decode the model outputs; only the first tensor is consulted.
    pub fn decode(outputs: &[Vec<f32>]) -> Result<Self> {
        let first = outputs
            .first()
            .ok_or_else(|| Error::OnnxInference("model produced no outputs".into()))?;
        let encoding = OutputEncoding::classify(first)?;
        Ok(Self::from_probability(encoding.probability()))
    }
}

fn single_value_probability(v: f64) -> f64 {
    if v > 1.0 {
        sigmoid(v)
    } else {
        clamp_unit(v)
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn clamp_unit(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}
