//! YOLOv8 detector running on ONNX Runtime.
//!
//! Expects the standard Ultralytics export: one `[1, 3, S, S]` f32 input in
//! RGB order scaled to [0, 1], and one `[1, 4 + classes, anchors]` output
//! whose first four rows are `cx, cy, w, h` in input pixels.

use super::{Detection, DetectionError, ObjectDetector};
use crate::config::DetectionConfig;
use image::{imageops::FilterType, ImageReader, RgbImage};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;

/// COCO dataset class names, in YOLOv8 output order.
pub const COCO_CLASSES: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

/// Post-processing thresholds.
#[derive(Debug, Clone, Copy)]
pub struct YoloParams {
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
}

impl From<&DetectionConfig> for YoloParams {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            input_size: config.input_size,
            confidence_threshold: config.confidence_threshold,
            iou_threshold: config.iou_threshold,
        }
    }
}

/// A decoded box in original-image pixels.
#[derive(Clone, Debug)]
struct Candidate {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    confidence: f32,
    class_id: usize,
}

/// YOLOv8 detector backed by a single ONNX Runtime session.
pub struct YoloOnnxDetector {
    // ONNX Runtime sessions need exclusive access to run.
    session: Mutex<Session>,
    params: YoloParams,
}

impl YoloOnnxDetector {
    /// Loads the model weights from disk.
    pub fn load(config: &DetectionConfig) -> Result<Self, DetectionError> {
        let load_error = |e: ort::Error| DetectionError::ModelLoad {
            path: config.model_path.clone(),
            reason: e.to_string(),
        };

        let session = Session::builder()
            .map_err(load_error)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(load_error)?
            .commit_from_file(&config.model_path)
            .map_err(load_error)?;

        Ok(Self {
            session: Mutex::new(session),
            params: YoloParams::from(config),
        })
    }

    fn run(&self, input: Vec<f32>) -> Result<(Vec<i64>, Vec<f32>), DetectionError> {
        let size = self.params.input_size as usize;
        let tensor = Tensor::from_array(([1usize, 3, size, size], input))
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectionError::Inference("detector session lock poisoned".into()))?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        Ok((shape.iter().copied().collect(), data.to_vec()))
    }
}

impl ObjectDetector for YoloOnnxDetector {
    fn detect(&self, image_path: &Path) -> Result<Vec<Detection>, DetectionError> {
        // Sniff the format from content; stored names may lack an extension.
        let image = ImageReader::open(image_path)
            .map_err(|e| DetectionError::Image(e.to_string()))?
            .with_guessed_format()
            .map_err(|e| DetectionError::Image(e.to_string()))?
            .decode()
            .map_err(|e| DetectionError::Image(e.to_string()))?
            .to_rgb8();

        let input = preprocess(&image, self.params.input_size);
        let (shape, output) = self.run(input)?;

        let candidates = postprocess(
            &output,
            &shape,
            (image.width() as f32, image.height() as f32),
            &self.params,
        )?;

        Ok(candidates
            .into_iter()
            .map(|c| Detection::new(class_name(c.class_id), c.confidence))
            .collect())
    }

    fn name(&self) -> &str {
        "yolov8-onnx"
    }
}

fn class_name(class_id: usize) -> String {
    COCO_CLASSES
        .get(class_id)
        .map(|name| name.to_string())
        .unwrap_or_else(|| format!("class_{}", class_id))
}

/// Resizes to the model input and lays pixels out as NCHW f32 in [0, 1].
fn preprocess(image: &RgbImage, input_size: u32) -> Vec<f32> {
    let resized = image::imageops::resize(image, input_size, input_size, FilterType::Triangle);

    let plane = (input_size * input_size) as usize;
    let mut input = vec![0.0f32; plane * 3];
    for (i, pixel) in resized.pixels().enumerate() {
        input[i] = pixel[0] as f32 / 255.0;
        input[plane + i] = pixel[1] as f32 / 255.0;
        input[2 * plane + i] = pixel[2] as f32 / 255.0;
    }
    input
}

/// Decodes a `[1, 4 + classes, anchors]` output into NMS-filtered candidates.
fn postprocess(
    output: &[f32],
    shape: &[i64],
    original_size: (f32, f32),
    params: &YoloParams,
) -> Result<Vec<Candidate>, DetectionError> {
    let (attributes, anchors) = match shape {
        [1, a, n] if *a > 4 && *n > 0 => (*a as usize, *n as usize),
        _ => {
            return Err(DetectionError::Inference(format!(
                "unexpected output shape {:?}",
                shape
            )))
        }
    };
    if output.len() != attributes * anchors {
        return Err(DetectionError::Inference(format!(
            "output has {} values, shape {:?} needs {}",
            output.len(),
            shape,
            attributes * anchors
        )));
    }

    let at = |attr: usize, anchor: usize| output[attr * anchors + anchor];
    let scale_x = original_size.0 / params.input_size as f32;
    let scale_y = original_size.1 / params.input_size as f32;

    let mut candidates = Vec::new();
    for anchor in 0..anchors {
        let mut max_score = 0.0f32;
        let mut max_class = 0usize;
        for class_id in 0..attributes - 4 {
            let score = at(4 + class_id, anchor);
            if score > max_score {
                max_score = score;
                max_class = class_id;
            }
        }

        if max_score < params.confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (at(0, anchor), at(1, anchor), at(2, anchor), at(3, anchor));
        candidates.push(Candidate {
            x: (cx - w / 2.0) * scale_x,
            y: (cy - h / 2.0) * scale_y,
            width: w * scale_x,
            height: h * scale_y,
            confidence: max_score,
            class_id: max_class,
        });
    }

    Ok(nms(candidates, params.iou_threshold))
}

/// Class-wise non-maximum suppression. Output is sorted by confidence.
fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == candidate.class_id && iou(k, &candidate) >= iou_threshold);
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

fn iou(a: &Candidate, b: &Candidate) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.width * a.height + b.width * b.height - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}
