//! Risk bucketing for calibrated probabilities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Probability above which a prediction is considered high risk.
pub const HIGH_RISK_THRESHOLD: f64 = 0.7;
/// Probability above which a prediction is considered medium risk.
pub const MEDIUM_RISK_THRESHOLD: f64 = 0.3;

/// Coarse risk level reported alongside a tabular prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Bucket a probability. Both thresholds are exclusive, so 0.7 is
    /// `Medium` and 0.3 is `Low`.
    pub fn from_probability(probability: f64) -> Self {
        if probability > HIGH_RISK_THRESHOLD {
            RiskLevel::High
        } else if probability > MEDIUM_RISK_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
