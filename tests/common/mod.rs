//! Shared fixtures for the HTTP API tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{body::Body, http::Request, Router};
use http_body_util::BodyExt;
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::Value;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use tract_onnx::prelude::tract_ndarray::Array4;

use vaidya_core::config::{CorsConfig, ServerConfig};
use vaidya_core::error::{Error, Result};
use vaidya_core::server::{create_app, state::ServerState};
use vaidya_core::storage::{MemoryStore, PredictionRecord, PredictionStore};
use vaidya_core::tabular::{ModelDescriptor, ScaledFeatureVector, TabularModel, TabularService};
use vaidya_core::vision::{ImageClassifier, ImageModelHandle, ImageModelLoader, ImageService};

pub const MULTIPART_BOUNDARY: &str = "vaidya-test-boundary";

/// Tabular model returning a fixed output
pub struct FixedTabularModel(pub Vec<Vec<f32>>);

impl TabularModel for FixedTabularModel {
    fn run(&self, _: &ScaledFeatureVector) -> Result<Vec<Vec<f32>>> {
        Ok(self.0.clone())
    }
}

pub struct FailingTabularModel;

impl TabularModel for FailingTabularModel {
    fn run(&self, _: &ScaledFeatureVector) -> Result<Vec<Vec<f32>>> {
        Err(Error::OnnxInference("session exploded".into()))
    }
}

/// Image classifier with a fixed 8x8 input and canned scores
pub struct StubClassifier {
    pub scores: Vec<f32>,
    pub calls: AtomicUsize,
    pub panic_on_describe: bool,
}

impl StubClassifier {
    pub fn new(scores: Vec<f32>) -> Self {
        Self {
            scores,
            calls: AtomicUsize::new(0),
            panic_on_describe: false,
        }
    }
}

impl ImageClassifier for StubClassifier {
    fn input_shape(&self) -> &[Option<usize>] {
        &[None, Some(8), Some(8), Some(3)]
    }

    fn output_shape(&self) -> &[Option<usize>] {
        &[None, Some(4)]
    }

    fn layer_count(&self) -> usize {
        if self.panic_on_describe {
            panic!("layer table corrupted");
        }
        12
    }

    fn predict(&self, input: Array4<f32>) -> Result<Vec<f32>> {
        assert_eq!(input.shape(), &[1, 8, 8, 3]);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.scores.clone())
    }
}

/// Loader handing out one shared classifier and counting load attempts
pub struct StubLoader {
    pub classifier: Option<Arc<StubClassifier>>,
    pub loads: AtomicUsize,
}

impl StubLoader {
    pub fn new(classifier: Arc<StubClassifier>) -> Self {
        Self {
            classifier: Some(classifier),
            loads: AtomicUsize::new(0),
        }
    }

    /// A loader whose artifact is absent
    pub fn missing() -> Self {
        Self {
            classifier: None,
            loads: AtomicUsize::new(0),
        }
    }
}

impl ImageModelLoader for StubLoader {
    fn load(&self) -> Result<Arc<dyn ImageClassifier>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        match &self.classifier {
            Some(classifier) => Ok(classifier.clone()),
            None => Err(Error::ModelNotFound("models/image_model.onnx".into())),
        }
    }
}

/// Store whose every operation fails
pub struct FailingStore;

#[async_trait]
impl PredictionStore for FailingStore {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn append(&self, _: PredictionRecord) -> Result<()> {
        Err(Error::Storage("disk full".into()))
    }

    async fn recent(&self, _: usize) -> Result<Vec<PredictionRecord>> {
        Err(Error::Storage("database is locked".into()))
    }
}

pub fn descriptor() -> ModelDescriptor {
    ModelDescriptor::new(
        vec![
            "Pregnancies".into(),
            "Glucose".into(),
            "BloodPressure".into(),
            "SkinThickness".into(),
            "Insulin".into(),
            "BMI".into(),
            "DiabetesPedigreeFunction".into(),
            "Age".into(),
        ],
        vec![0.0, 120.0, 0.0, 0.0, 0.0, 30.0, 0.0, 40.0],
        vec![1.0, 30.0, 1.0, 1.0, 1.0, 5.0, 1.0, 10.0],
        Some(0.78),
    )
    .unwrap()
}

pub fn server_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        request_timeout_secs: 5,
        max_upload_bytes: 64 * 1024 * 1024,
        cors: CorsConfig::default(),
    }
}

/// Everything a test may want to inspect after issuing requests
pub struct TestApp {
    pub app: Router,
    pub classifier: Arc<StubClassifier>,
    pub loader: Arc<StubLoader>,
}

pub struct TestAppBuilder {
    tabular: Arc<dyn TabularModel>,
    store: Arc<dyn PredictionStore>,
    classifier: StubClassifier,
    image_model_missing: bool,
    max_upload_bytes: Option<usize>,
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self {
            tabular: Arc::new(FixedTabularModel(vec![vec![0.82]])),
            store: Arc::new(MemoryStore::new()),
            classifier: StubClassifier::new(vec![0.05, 0.1, 0.8, 0.05]),
            image_model_missing: false,
            max_upload_bytes: None,
        }
    }
}

impl TestAppBuilder {
    pub fn tabular(mut self, model: impl TabularModel + 'static) -> Self {
        self.tabular = Arc::new(model);
        self
    }

    pub fn store(mut self, store: Arc<dyn PredictionStore>) -> Self {
        self.store = store;
        self
    }

    pub fn classifier(mut self, classifier: StubClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn without_image_model(mut self) -> Self {
        self.image_model_missing = true;
        self
    }

    pub fn max_upload_bytes(mut self, limit: usize) -> Self {
        self.max_upload_bytes = Some(limit);
        self
    }

    pub fn build(self) -> TestApp {
        let classifier = Arc::new(self.classifier);
        let loader = Arc::new(if self.image_model_missing {
            StubLoader::missing()
        } else {
            StubLoader::new(classifier.clone())
        });

        let mut config = server_config();
        if let Some(limit) = self.max_upload_bytes {
            config.max_upload_bytes = limit;
        }

        let state = ServerState::new(
            TabularService::new(self.tabular, descriptor()),
            ImageService::new(Arc::new(ImageModelHandle::new(loader.clone()))),
            self.store,
            config,
        );

        TestApp {
            app: create_app(state),
            classifier,
            loader,
        }
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> (u16, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status().as_u16();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Multipart request with a single part named `field`
pub fn post_upload(uri: &str, field: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
    let headers = format!(
        "Content-Disposition: form-data; name=\"{}\"; filename=\"scan\"\r\n\
         Content-Type: {}\r\n\r\n",
        field, content_type
    );
    body.extend_from_slice(headers.as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());

    Request::post(uri)
        .header("content-type", format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY))
        .body(Body::from(body))
        .unwrap()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x * 10) as u8, (y * 10) as u8, 128]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// PNG of pseudo-random pixels; noise defeats compression, so the file is
/// close to `3 * side * side` bytes.
pub fn noise_png(side: u32) -> Vec<u8> {
    let mut state: u32 = 0x9e37_79b9;
    let img = RgbImage::from_fn(side, side, |_, _| {
        let mut channel = || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        };
        Rgb([channel(), channel(), channel()])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Wait for spawned log writes to land.
pub async fn wait_for_records(store: &MemoryStore, expected: usize) {
    for _ in 0..200 {
        if store.len() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {} records, found {}", expected, store.len());
}
