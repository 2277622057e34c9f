//! Object detection and frame annotation.
//!
//! The [`Detector`] trait is the seam to the model. [`Annotator`] runs it on
//! each frame and draws the overlay. With the `onnx` feature,
//! [`OnnxDetector`] runs a YOLOv8 export through onnxruntime.

mod annotate;
mod detector;
mod glyphs;
#[cfg(feature = "onnx")]
mod onnx;
mod types;
mod yolo;

pub use annotate::{AnnotationStyle, Annotated, Annotator};
pub use detector::{coco_class_names, Detector, COCO_CLASSES};
#[cfg(feature = "onnx")]
pub use onnx::OnnxDetector;
pub use types::{BoundingBox, DetectError, Detection};
pub use yolo::{decode, non_max_suppression, preprocess, Preprocessed, YoloParams, MAX_INPUT_SIZE};

use std::path::Path;

/// Load the production detector. Failure is fatal for the service.
#[cfg(feature = "onnx")]
pub fn load_detector(model_path: &Path, params: YoloParams) -> Result<Box<dyn Detector>, DetectError> {
    Ok(Box::new(OnnxDetector::load(model_path, params)?))
}

/// Load the production detector. Failure is fatal for the service.
#[cfg(not(feature = "onnx"))]
pub fn load_detector(model_path: &Path, _params: YoloParams) -> Result<Box<dyn Detector>, DetectError> {
    Err(DetectError::ModelLoad(format!(
        "{}: built without the `onnx` feature",
        model_path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(feature = "onnx")]
    fn test_missing_model_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.onnx");
        match load_detector(&path, YoloParams::default()) {
            Err(DetectError::ModelLoad(message)) => {
                assert!(message.contains("missing.onnx"));
                assert!(!message.contains("built without"));
            }
            Err(other) => panic!("expected ModelLoad, got {}", other),
            Ok(_) => panic!("loaded a model that does not exist"),
        }
    }

    #[test]
    #[cfg(not(feature = "onnx"))]
    fn test_without_onnx_support_load_names_the_feature() {
        let result = load_detector(Path::new("yolov8n.onnx"), YoloParams::default());
        assert!(matches!(result, Err(DetectError::ModelLoad(ref m)) if m.contains("`onnx` feature")));
    }
}
