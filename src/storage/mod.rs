//! Prediction log storage.
//!
//! The log is append-only: records are written after each successful tabular
//! prediction and read back newest-first. Two backends are provided:
//! - `duckdb` - embedded DuckDB, file-backed or `:memory:`
//! - `memory` - process-local vector, lost on restart

pub mod duckdb;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::tabular::FeatureRow;

pub use self::duckdb::DuckDbStore;
pub use self::memory::MemoryStore;

/// Maximum number of records returned by a recency query.
pub const RECENT_LIMIT: usize = 50;

/// One logged tabular prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub inputs: FeatureRow,
    pub prediction: u8,
    pub probability: f64,
    pub timestamp: DateTime<Utc>,
}

impl PredictionRecord {
    pub fn now(inputs: FeatureRow, prediction: u8, probability: f64) -> Self {
        Self {
            inputs,
            prediction,
            probability,
            timestamp: Utc::now(),
        }
    }
}

#[async_trait]
pub trait PredictionStore: Send + Sync {
    /// Create tables and indexes if needed.
    async fn init(&self) -> Result<()>;

    async fn append(&self, record: PredictionRecord) -> Result<()>;

    /// Up to `limit` records, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<PredictionRecord>>;
}

/// Open the backend named in the configuration.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn PredictionStore>> {
    match config.engine.as_str() {
        "duckdb" => Ok(Arc::new(DuckDbStore::open(&config.connection)?)),
        "memory" => Ok(Arc::new(MemoryStore::new())),
        other => Err(Error::Config(format!("unsupported storage engine: {}", other))),
    }
}
