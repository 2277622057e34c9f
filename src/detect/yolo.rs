//! YOLOv8 pre- and post-processing.
//!
//! The exported head emits `[1, 4 + classes, anchors]`: rows 0..4 are
//! `cx, cy, w, h` in model input pixels, the remaining rows are per-class
//! scores. There is no separate objectness row.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb};

use super::types::{BoundingBox, DetectError, Detection};
use crate::camera::Frame;

/// Largest accepted model input edge, in pixels.
pub const MAX_INPUT_SIZE: u32 = 4096;

/// Detector thresholds and input geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct YoloParams {
    /// Square model input edge in pixels
    pub input_size: u32,
    /// Minimum class score kept
    pub confidence_threshold: f32,
    /// IoU above which lower-scored boxes of the same class are suppressed
    pub iou_threshold: f32,
    /// Cap on detections returned per frame
    pub max_detections: usize,
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 300,
        }
    }
}

/// Model input tensor plus the factors mapping model coordinates back to the frame.
pub struct Preprocessed {
    /// CHW, normalized to `[0, 1]`
    pub tensor: Vec<f32>,
    pub scale_x: f32,
    pub scale_y: f32,
}

/// Resize `frame` to the model input and lay it out as a normalized CHW tensor.
pub fn preprocess(frame: &Frame, input_size: u32) -> Result<Preprocessed, DetectError> {
    if input_size == 0 || input_size > MAX_INPUT_SIZE {
        return Err(DetectError::InputSize(input_size));
    }
    let expected = frame.expected_len();
    let image = ImageBuffer::<Rgb<u8>, &[u8]>::from_raw(
        frame.width,
        frame.height,
        frame.data.as_slice(),
    )
    .ok_or(DetectError::InvalidFrame {
        expected,
        actual: frame.data.len(),
    })?;

    let resized = imageops::resize(&image, input_size, input_size, FilterType::Triangle);

    let edge = input_size as usize;
    let plane = edge * edge;
    let mut tensor = vec![0.0f32; plane * 3];
    for (i, pixel) in resized.pixels().enumerate() {
        tensor[i] = pixel[0] as f32 / 255.0;
        tensor[plane + i] = pixel[1] as f32 / 255.0;
        tensor[2 * plane + i] = pixel[2] as f32 / 255.0;
    }

    Ok(Preprocessed {
        tensor,
        scale_x: frame.width as f32 / input_size as f32,
        scale_y: frame.height as f32 / input_size as f32,
    })
}

/// Decode a raw `[1, 4 + classes, anchors]` output into frame-space detections.
///
/// Detections come back sorted by descending confidence after class-aware NMS.
pub fn decode(
    output: &[f32],
    shape: &[usize],
    params: &YoloParams,
    scale_x: f32,
    scale_y: f32,
    frame_width: u32,
    frame_height: u32,
) -> Result<Vec<Detection>, DetectError> {
    let (rows, anchors) = match shape {
        [1, rows, anchors] if *rows > 4 => (*rows, *anchors),
        _ => return Err(DetectError::OutputShape(shape.to_vec())),
    };
    if output.len() < rows * anchors {
        return Err(DetectError::OutputShape(shape.to_vec()));
    }
    let at = |row: usize, anchor: usize| output[row * anchors + anchor];

    let mut candidates = Vec::new();
    for anchor in 0..anchors {
        let mut best_class = 0;
        let mut best_score = f32::MIN;
        for class_id in 0..rows - 4 {
            let score = at(4 + class_id, anchor);
            if score > best_score {
                best_score = score;
                best_class = class_id;
            }
        }
        if best_score < params.confidence_threshold {
            continue;
        }

        let bbox = BoundingBox::from_center(
            at(0, anchor) * scale_x,
            at(1, anchor) * scale_y,
            at(2, anchor) * scale_x,
            at(3, anchor) * scale_y,
        )
        .clamped(frame_width, frame_height);

        candidates.push(Detection {
            class_id: best_class,
            confidence: best_score,
            bbox,
        });
    }

    Ok(non_max_suppression(
        candidates,
        params.iou_threshold,
        params.max_detections,
    ))
}

/// Class-aware greedy NMS.
pub fn non_max_suppression(
    mut detections: Vec<Detection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Detection> = Vec::new();
    for candidate in detections {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}
