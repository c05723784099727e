//! Food classification on top of a pluggable object detector.
//!
//! `FoodClassifier` is what handlers talk to. It owns an optional
//! `ObjectDetector`; a detector that failed to load at startup is simply
//! absent and every call reports it instead of failing.

pub mod mock;
pub mod onnx;

use metrics::counter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Message returned when no detector is loaded.
pub const MODEL_NOT_LOADED: &str = "YOLO model not loaded";

/// Message returned when the image produced no usable detection.
pub const NO_FOOD_DETECTED: &str = "No food item detected with sufficient confidence";

/// A single labelled candidate from one inference pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Errors raised by a concrete detector.
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("failed to load model from {path}: {reason}")]
    ModelLoad { path: String, reason: String },

    #[error("failed to read image: {0}")]
    Image(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

/// Trait for object detection backends (e.g., YOLO on ONNX Runtime).
///
/// Implementations are called from the blocking thread pool and may block.
pub trait ObjectDetector: Send + Sync {
    /// Run one inference pass over the image at `image_path`.
    fn detect(&self, image_path: &Path) -> Result<Vec<Detection>, DetectionError>;

    /// Short name used in logs and health output.
    fn name(&self) -> &str;
}

/// Why classification produced no label through an error path.
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("{}", MODEL_NOT_LOADED)]
    Unavailable,

    #[error("Error during detection: {0}")]
    Detection(#[from] DetectionError),

    #[error("Error during detection: {0}")]
    Task(String),
}

/// Outcome of classifying one image.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    /// Present only when some detection scored above zero.
    pub label: Option<String>,
    pub confidence: f32,
    pub message: String,
}

impl DetectionResult {
    fn detected(detection: Detection) -> Self {
        let message = format!(
            "Detected {} with {:.2} confidence",
            detection.label, detection.confidence
        );
        Self {
            label: Some(detection.label),
            confidence: detection.confidence,
            message,
        }
    }

    fn missing(message: impl Into<String>) -> Self {
        Self {
            label: None,
            confidence: 0.0,
            message: message.into(),
        }
    }
}

/// Picks the detection with strictly the highest confidence above 0.0.
///
/// Ties keep the earliest detection in the order the model returned them.
pub fn select_best(detections: &[Detection]) -> Option<&Detection> {
    let mut best: Option<&Detection> = None;
    let mut highest_confidence = 0.0f32;

    for detection in detections {
        if detection.confidence > highest_confidence {
            highest_confidence = detection.confidence;
            best = Some(detection);
        }
    }

    best
}

/// Classifier adapter shared by all requests.
#[derive(Clone)]
pub struct FoodClassifier {
    detector: Option<Arc<dyn ObjectDetector>>,
}

impl FoodClassifier {
    pub fn new(detector: Arc<dyn ObjectDetector>) -> Self {
        Self {
            detector: Some(detector),
        }
    }

    /// A classifier whose model could not be loaded.
    pub fn unavailable() -> Self {
        Self { detector: None }
    }

    pub fn is_available(&self) -> bool {
        self.detector.is_some()
    }

    /// Runs detection and returns the best candidate, if any.
    pub async fn try_detect(&self, image_path: &Path) -> Result<Option<Detection>, ClassifierError> {
        let detector = self.detector.clone().ok_or(ClassifierError::Unavailable)?;
        let path: PathBuf = image_path.to_path_buf();

        let detections = tokio::task::spawn_blocking(move || detector.detect(&path))
            .await
            .map_err(|e| ClassifierError::Task(e.to_string()))??;

        tracing::debug!(candidates = detections.len(), "Detection pass finished");

        Ok(select_best(&detections).cloned())
    }

    /// Classifies an image, folding every failure into the result message.
    pub async fn detect(&self, image_path: &Path) -> DetectionResult {
        match self.try_detect(image_path).await {
            Ok(Some(detection)) => {
                tracing::info!(
                    label = %detection.label,
                    confidence = %format!("{:.2}", detection.confidence),
                    "Food detected"
                );
                counter!("food_detections_total", "outcome" => "detected").increment(1);
                DetectionResult::detected(detection)
            }
            Ok(None) => {
                counter!("food_detections_total", "outcome" => "none").increment(1);
                DetectionResult::missing(NO_FOOD_DETECTED)
            }
            Err(ClassifierError::Unavailable) => {
                tracing::error!("YOLO model is not loaded. Cannot perform detection.");
                counter!("food_detections_total", "outcome" => "unavailable").increment(1);
                DetectionResult::missing(MODEL_NOT_LOADED)
            }
            Err(e) => {
                tracing::error!(error = %e, "Error during food detection");
                counter!("food_detections_total", "outcome" => "error").increment(1);
                DetectionResult::missing(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockDetector;
    use super::*;

    #[test]
    fn select_best_picks_highest() {
        let detections = vec![
            Detection::new("cup", 0.40),
            Detection::new("pizza", 0.91),
            Detection::new("fork", 0.55),
        ];

        assert_eq!(select_best(&detections).unwrap().label, "pizza");
    }

    #[test]
    fn select_best_keeps_first_on_tie() {
        let detections = vec![Detection::new("apple", 0.7), Detection::new("orange", 0.7)];

        assert_eq!(select_best(&detections).unwrap().label, "apple");
    }

    #[test]
    fn select_best_ignores_zero_confidence() {
        assert!(select_best(&[]).is_none());
        assert!(select_best(&[Detection::new("cake", 0.0)]).is_none());
    }

    #[tokio::test]
    async fn detected_message_uses_two_decimals() {
        let classifier = FoodClassifier::new(Arc::new(MockDetector::with_detections(vec![
            Detection::new("banana", 0.876),
        ])));

        let result = classifier.detect(Path::new("unused.png")).await;

        assert_eq!(result.label.as_deref(), Some("banana"));
        assert_eq!(result.message, "Detected banana with 0.88 confidence");
    }

    #[tokio::test]
    async fn empty_detections_report_no_food() {
        let classifier = FoodClassifier::new(Arc::new(MockDetector::with_detections(vec![])));

        let result = classifier.detect(Path::new("unused.png")).await;

        assert_eq!(result.label, None);
        assert_eq!(result.message, NO_FOOD_DETECTED);
    }

    #[tokio::test]
    async fn unavailable_model_is_reported_without_calling_detector() {
        let result = FoodClassifier::unavailable()
            .detect(Path::new("unused.png"))
            .await;

        assert_eq!(result.label, None);
        assert_eq!(result.message, MODEL_NOT_LOADED);
    }

    #[tokio::test]
    async fn detector_failure_becomes_message() {
        let classifier = FoodClassifier::new(Arc::new(MockDetector::failing("corrupt header")));

        let result = classifier.detect(Path::new("unused.png")).await;

        assert_eq!(result.label, None);
        assert_eq!(
            result.message,
            "Error during detection: inference failed: corrupt header"
        );
    }

    #[tokio::test]
    async fn panicking_detector_becomes_message() {
        struct Panicking;
        impl ObjectDetector for Panicking {
            fn detect(&self, _: &Path) -> Result<Vec<Detection>, DetectionError> {
                panic!("runtime exploded");
            }
            fn name(&self) -> &str {
                "panicking"
            }
        }

        let result = FoodClassifier::new(Arc::new(Panicking))
            .detect(Path::new("unused.png"))
            .await;

        assert_eq!(result.label, None);
        assert!(result.message.starts_with("Error during detection:"));
    }
}
