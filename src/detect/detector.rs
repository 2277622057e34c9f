//! The detector seam.

use super::types::{DetectError, Detection};
use crate::camera::Frame;

/// COCO class names (80 classes), the label set YOLOv8 exports ship with.
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat",
    "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack",
    "umbrella", "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball",
    "kite", "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
    "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple",
    "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair",
    "couch", "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator",
    "book", "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// An object detector run once per frame.
///
/// Detectors live on the capture thread, hence `Send` but not `Sync`.
pub trait Detector: Send {
    /// Detect objects in `frame`. Results are in the detector's own order.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectError>;

    /// Class names indexed by class id.
    fn class_names(&self) -> &[String];

    /// Names lookup for a class id.
    fn class_name(&self, class_id: usize) -> Option<&str> {
        self.class_names().get(class_id).map(String::as_str)
    }
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectError> {
        (**self).detect(frame)
    }

    fn class_names(&self) -> &[String] {
        (**self).class_names()
    }
}

/// COCO names as owned strings.
pub fn coco_class_names() -> Vec<String> {
    COCO_CLASSES.iter().map(|s| s.to_string()).collect()
}
