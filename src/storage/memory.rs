use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::Result;
use crate::storage::{PredictionRecord, PredictionStore};

/// Process-local prediction log
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<PredictionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl PredictionStore for MemoryStore {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn append(&self, record: PredictionRecord) -> Result<()> {
        self.records.write().push(record);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<PredictionRecord>> {
        // later appends win timestamp ties
        let mut records: Vec<PredictionRecord> =
            self.records.read().iter().rev().cloned().collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(limit);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabular::FeatureRow;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn newest_first_with_limit() {
        let store = MemoryStore::new();
        let base = Utc::now();
        for i in 0..55 {
            let mut r = PredictionRecord::now(FeatureRow::from_array([i as f64; 8]), 0, 0.1);
            // insert out of order
            r.timestamp = base + Duration::seconds((i * 7 % 55) as i64);
            store.append(r).await.unwrap();
        }
        let recent = store.recent(50).await.unwrap();
        assert_eq!(recent.len(), 50);
        assert!(recent.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
        assert_eq!(store.len(), 55);
    }

    #[tokio::test]
    async fn ties_prefer_later_append() {
        let store = MemoryStore::new();
        let ts = Utc::now();
        for g in [1.0, 2.0] {
            let mut r = PredictionRecord::now(FeatureRow::from_array([g; 8]), 0, 0.1);
            r.timestamp = ts;
            store.append(r).await.unwrap();
        }
        assert_eq!(store.recent(1).await.unwrap()[0].inputs.glucose, 2.0);
    }
}
