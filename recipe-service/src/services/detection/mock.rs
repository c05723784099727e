//! Mock detector implementations for testing.

use super::{Detection, DetectionError, ObjectDetector};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

enum Script {
    Fixed(Vec<Detection>),
    Fail(String),
    /// Uses the uploaded file's text content as the label.
    EchoFile(f32),
}

/// Scripted detector that never touches a real model.
pub struct MockDetector {
    script: Script,
    calls: AtomicUsize,
}

impl MockDetector {
    pub fn with_detections(detections: Vec<Detection>) -> Self {
        Self::new(Script::Fixed(detections))
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self::new(Script::Fail(reason.into()))
    }

    /// Reads the image file and reports its trimmed UTF-8 content as the label.
    pub fn echo_file(confidence: f32) -> Self {
        Self::new(Script::EchoFile(confidence))
    }

    fn new(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ObjectDetector for MockDetector {
    fn detect(&self, image_path: &Path) -> Result<Vec<Detection>, DetectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match &self.script {
            Script::Fixed(detections) => Ok(detections.clone()),
            Script::Fail(reason) => Err(DetectionError::Inference(reason.clone())),
            Script::EchoFile(confidence) => {
                let content = std::fs::read_to_string(image_path)
                    .map_err(|e| DetectionError::Image(e.to_string()))?;
                let label = content.trim();
                if label.is_empty() {
                    Ok(Vec::new())
                } else {
                    Ok(vec![Detection::new(label, *confidence)])
                }
            }
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
