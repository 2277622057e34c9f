//! YOLOv8 ONNX detector backed by onnxruntime.

use std::path::Path;

use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;

use super::detector::{coco_class_names, Detector};
use super::types::{DetectError, Detection};
use super::yolo::{decode, preprocess, YoloParams};
use crate::camera::Frame;

/// YOLOv8 exported to ONNX, run on the CPU execution provider.
pub struct OnnxDetector {
    session: Session,
    params: YoloParams,
    class_names: Vec<String>,
}

impl OnnxDetector {
    /// Load the model at `model_path`. Failure here is fatal for the service.
    pub fn load(model_path: &Path, params: YoloParams) -> Result<Self, DetectError> {
        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(|e| {
                DetectError::ModelLoad(format!("{}: {}", model_path.display(), e))
            })?;

        log::info!("YOLO model loaded from {}", model_path.display());

        Ok(Self {
            session,
            params,
            class_names: coco_class_names(),
        })
    }
}

impl Detector for OnnxDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectError> {
        let size = self.params.input_size as usize;
        let input = preprocess(frame, self.params.input_size)?;

        let tensor = Tensor::from_array(([1usize, 3, size, size], input.tensor))
            .map_err(|e| DetectError::Inference(e.to_string()))?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .map_err(|e| DetectError::Inference(e.to_string()))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectError::Inference(e.to_string()))?;
        let shape: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();

        decode(
            data,
            &shape,
            &self.params,
            input.scale_x,
            input.scale_y,
            frame.width,
            frame.height,
        )
    }

    fn class_names(&self) -> &[String] {
        &self.class_names
    }
}
