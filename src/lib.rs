//! Vaidya: model-serving backend for a medical screening application.
//!
//! Two pipelines share one HTTP server:
//! - [`tabular`] scores diabetes risk from eight clinical measurements
//! - [`vision`] classifies brain MRI scans into four tumor classes
//!
//! Successful tabular predictions are appended to a [`storage`] log.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod risk;
pub mod server;
pub mod storage;
pub mod tabular;
pub mod vision;

pub use config::ServiceConfig;
pub use error::{Error, Result};
pub use risk::RiskLevel;
