use crate::error::{Error, Result};
use crate::storage::{PredictionRecord, PredictionStore};
use crate::tabular::FeatureRow;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use duckdb::{params, Connection};
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct DuckDbStore {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbStore {
    /// Open a database file, or an in-memory database for `:memory:`.
    pub fn open(connection: &str) -> Result<Self> {
        let conn = if connection.is_empty() || connection == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(connection)
        }
        .map_err(|e| Error::Storage(format!("Failed to open {}: {}", connection, e)))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn timestamp_from_micros(micros: i64) -> Option<DateTime<Utc>> {
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    Utc.timestamp_opt(secs, nanos).single()
}

#[async_trait]
impl PredictionStore for DuckDbStore {
    async fn init(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch(
            "CREATE SEQUENCE IF NOT EXISTS predictions_seq;
            CREATE TABLE IF NOT EXISTS predictions (
                id BIGINT PRIMARY KEY DEFAULT nextval('predictions_seq'),
                pregnancies DOUBLE NOT NULL,
                glucose DOUBLE NOT NULL,
                blood_pressure DOUBLE NOT NULL,
                skin_thickness DOUBLE NOT NULL,
                insulin DOUBLE NOT NULL,
                bmi DOUBLE NOT NULL,
                diabetes_pedigree_function DOUBLE NOT NULL,
                age DOUBLE NOT NULL,
                prediction INTEGER NOT NULL,
                probability DOUBLE NOT NULL,
                timestamp BIGINT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_predictions_timestamp ON predictions(timestamp);",
        )
        .map_err(|e| Error::Storage(format!("Failed to create table and indexes: {}", e)))
    }

    async fn append(&self, record: PredictionRecord) -> Result<()> {
        let conn = self.conn.lock().await;
        let inputs = record.inputs;
        conn.execute(
            "INSERT INTO predictions (pregnancies, glucose, blood_pressure, skin_thickness, insulin,
                bmi, diabetes_pedigree_function, age, prediction, probability, timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                inputs.pregnancies,
                inputs.glucose,
                inputs.blood_pressure,
                inputs.skin_thickness,
                inputs.insulin,
                inputs.bmi,
                inputs.diabetes_pedigree_function,
                inputs.age,
                record.prediction as i32,
                record.probability,
                record.timestamp.timestamp_micros(),
            ],
        )
        .map_err(|e| Error::Storage(format!("Failed to insert prediction: {}", e)))?;
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<PredictionRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT pregnancies, glucose, blood_pressure, skin_thickness, insulin,
                    bmi, diabetes_pedigree_function, age, prediction, probability, timestamp
                 FROM predictions
                 ORDER BY timestamp DESC, id DESC
                 LIMIT {}",
                limit
            ))
            .map_err(|e| Error::Storage(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                let mut inputs = [0.0f64; 8];
                for (i, slot) in inputs.iter_mut().enumerate() {
                    *slot = row.get(i)?;
                }
                let prediction: i32 = row.get(8)?;
                let probability: f64 = row.get(9)?;
                let micros: i64 = row.get(10)?;
                Ok((FeatureRow::from_array(inputs), prediction, probability, micros))
            })
            .map_err(|e| Error::Storage(format!("Query execution failed: {}", e)))?;

        let mut results = Vec::new();
        for row in rows {
            let (inputs, prediction, probability, micros) =
                row.map_err(|e| Error::Storage(format!("Row mapping failed: {}", e)))?;
            let timestamp = timestamp_from_micros(micros)
                .ok_or_else(|| Error::Storage(format!("Invalid timestamp {}", micros)))?;
            let prediction = u8::try_from(prediction)
                .map_err(|_| Error::Storage(format!("Invalid prediction value {}", prediction)))?;
            results.push(PredictionRecord {
                inputs,
                prediction,
                probability,
                timestamp,
            });
        }
        Ok(results)
    }
}
