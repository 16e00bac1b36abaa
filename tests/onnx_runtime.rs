//! Runs the tract-backed models against the small graphs in `tests/fixtures`.

mod common;

use image::{ImageFormat, Rgb, RgbImage};
use serde_json::json;
use std::io::Cursor;
use std::path::PathBuf;

use common::*;
use vaidya_core::config::{LoggingConfig, ModelsConfig, ServiceConfig, StorageConfig};
use vaidya_core::error::Error;
use vaidya_core::server::{create_app, state::ServerState};
use vaidya_core::tabular::{
    ModelDescriptor, OnnxTabularModel, TabularModel, TabularRequest, TabularService, FEATURE_COUNT,
};
use vaidya_core::vision::{preprocess, ImageClassifier, InputSize, OnnxImageClassifier};
use vaidya_core::RiskLevel;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn solid_png(color: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(20, 14, Rgb(color));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn fixture_config() -> ServiceConfig {
    ServiceConfig {
        server: server_config(),
        models: ModelsConfig {
            dir: fixture(""),
            tabular_model: PathBuf::from("diabetes_model.onnx"),
            model_info: PathBuf::from("model_info.json"),
            image_model: PathBuf::from("image_model.onnx"),
            preload_image_model: true,
        },
        storage: StorageConfig {
            engine: "memory".into(),
            connection: String::new(),
        },
        logging: LoggingConfig::default(),
    }
}

#[test]
fn test_tabular_graph_worked_example() {
    let service =
        TabularService::load(&fixture("diabetes_model.onnx"), &fixture("model_info.json")).unwrap();

    let result = service.predict(&TabularRequest::new(150.0, 33.6, 50.0)).unwrap();
    assert_eq!(result.prediction, 1);
    assert!((result.probability - 0.82).abs() < 1e-4, "{}", result.probability);
    assert_eq!(result.risk_level, RiskLevel::High);
}

#[test]
fn test_tabular_graph_output_is_flattened() {
    let descriptor = ModelDescriptor::load(&fixture("model_info.json")).unwrap();
    let model = OnnxTabularModel::load(&fixture("diabetes_model.onnx"), FEATURE_COUNT).unwrap();

    let scaled = descriptor.scale(&TabularRequest::new(120.0, 30.0, 40.0).features().to_array());
    let outputs = model.run(&scaled).unwrap();
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].len(), 1);
    // zero row leaves only the bias
    assert!((outputs[0][0] - 0.514).abs() < 1e-3, "{}", outputs[0][0]);
}

#[test]
fn test_tabular_graph_rejects_wrong_width() {
    let err = OnnxTabularModel::load(&fixture("diabetes_model.onnx"), 5).unwrap_err();
    assert!(matches!(err, Error::ModelLoad(_)), "{}", err);
}

#[test]
fn test_image_graph_shapes() {
    let classifier = OnnxImageClassifier::load(&fixture("image_model.onnx")).unwrap();
    assert_eq!(
        classifier.input_shape().to_vec(),
        vec![None, Some(8), Some(8), Some(3)]
    );
    assert_eq!(classifier.output_shape().to_vec(), vec![None, Some(4)]);
    assert!(classifier.layer_count() > 0);
    assert_eq!(
        InputSize::from_shape(classifier.input_shape()).unwrap(),
        InputSize { height: 8, width: 8 }
    );
}

#[test]
fn test_image_graph_scores_dominant_channel() {
    let classifier = OnnxImageClassifier::load(&fixture("image_model.onnx")).unwrap();
    let size = InputSize { height: 8, width: 8 };

    for (color, expected) in [([255, 0, 0], 0), ([0, 255, 0], 1), ([0, 0, 255], 2)] {
        let input = preprocess::preprocess(&solid_png(color), size).unwrap();
        let scores = classifier.predict(input).unwrap();
        assert_eq!(scores.len(), 4);
        assert!((scores.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        let (index, confidence) = vaidya_core::vision::argmax(&scores).unwrap();
        assert_eq!(index, expected, "{:?}", scores);
        assert!(confidence > 0.95);
    }
}

#[tokio::test]
async fn test_server_over_fixture_models() {
    let state = ServerState::load(&fixture_config()).await.unwrap();
    assert!(state.vision.handle().is_loaded());
    let app = create_app(state);

    let (status, body) = send(
        &app,
        post_json("/api/predict", &json!({"glucose": 150, "bmi": 33.6, "age": 50})),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["prediction"], 1);
    assert!((body["probability"].as_f64().unwrap() - 0.82).abs() < 1e-4);
    assert_eq!(body["risk_level"], "High");

    let (status, body) = send(&app, get("/api/health")).await;
    assert_eq!(status, 200);
    assert_eq!(body["onnx_model_loaded"], true);

    let (status, body) = send(
        &app,
        post_upload("/predict", "file", "image/png", &solid_png([0, 0, 255])),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["class"], "no_tumor");

    let (status, body) = send(&app, get("/model-info")).await;
    assert_eq!(status, 200);
    assert_eq!(body["input_shape"], json!([null, 8, 8, 3]));
    assert_eq!(body["output_shape"], json!([null, 4]));
    assert!(body["layers"].as_u64().unwrap() > 0);
}
