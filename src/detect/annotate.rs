//! Runs the detector on a frame and draws boxes and labels into it.

use image::{ImageBuffer, Rgb};

use super::detector::Detector;
use super::glyphs::{glyph_bits, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};
use super::types::{BoundingBox, DetectError};
use crate::camera::Frame;

type Canvas<'a> = ImageBuffer<Rgb<u8>, &'a mut [u8]>;

/// Overlay appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationStyle {
    pub color: [u8; 3],
    /// Box outline width in pixels
    pub thickness: u32,
    /// Integer upscale applied to the 5x7 font
    pub font_scale: u32,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            color: [0, 255, 0],
            thickness: 2,
            font_scale: 2,
        }
    }
}

/// An annotated frame and the labels drawn onto it, in detector order.
#[derive(Debug, Clone)]
pub struct Annotated {
    pub frame: Frame,
    pub labels: Vec<String>,
}

/// Detection Annotator.
pub struct Annotator<D> {
    detector: D,
    style: AnnotationStyle,
}

impl<D: Detector> Annotator<D> {
    pub fn new(detector: D) -> Self {
        Self::with_style(detector, AnnotationStyle::default())
    }

    pub fn with_style(detector: D, style: AnnotationStyle) -> Self {
        Self { detector, style }
    }

    /// Detect, then draw every box and label directly into `frame`.
    ///
    /// On any error the frame is dropped. Labels are resolved before the
    /// first pixel is touched, so a failure never yields a half-drawn frame.
    pub fn annotate(&mut self, mut frame: Frame) -> Result<Annotated, DetectError> {
        let expected = frame.expected_len();
        if frame.data.len() != expected {
            return Err(DetectError::InvalidFrame {
                expected,
                actual: frame.data.len(),
            });
        }

        let detections = self.detector.detect(&frame)?;

        let labels = detections
            .iter()
            .map(|d| {
                self.detector
                    .class_name(d.class_id)
                    .map(str::to_owned)
                    .ok_or(DetectError::UnknownClass(d.class_id))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if !detections.is_empty() {
            let (width, height) = (frame.width, frame.height);
            let mut canvas = Canvas::from_raw(width, height, frame.data.as_mut_slice()).ok_or(
                DetectError::InvalidFrame {
                    expected,
                    actual: expected,
                },
            )?;
            let color = Rgb(self.style.color);
            for (detection, label) in detections.iter().zip(&labels) {
                draw_box(&mut canvas, &detection.bbox, self.style.thickness, color);
                draw_label(&mut canvas, &detection.bbox, label, &self.style, color);
            }
        }

        log::debug!("Detected {} object(s): {:?}", labels.len(), labels);
        Ok(Annotated { frame, labels })
    }
}

fn to_pixel_rect(bbox: &BoundingBox, width: u32, height: u32) -> (i32, i32, i32, i32) {
    let max_x = width.saturating_sub(1) as f32;
    let max_y = height.saturating_sub(1) as f32;
    let left = bbox.x1.min(bbox.x2).clamp(0.0, max_x).round() as i32;
    let right = bbox.x1.max(bbox.x2).clamp(0.0, max_x).round() as i32;
    let top = bbox.y1.min(bbox.y2).clamp(0.0, max_y).round() as i32;
    let bottom = bbox.y1.max(bbox.y2).clamp(0.0, max_y).round() as i32;
    (left, top, right, bottom)
}

fn put(canvas: &mut Canvas<'_>, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < canvas.width() && (y as u32) < canvas.height() {
        canvas.put_pixel(x as u32, y as u32, color);
    }
}

fn draw_box(canvas: &mut Canvas<'_>, bbox: &BoundingBox, thickness: u32, color: Rgb<u8>) {
    if canvas.width() == 0 || canvas.height() == 0 {
        return;
    }
    let (left, top, right, bottom) = to_pixel_rect(bbox, canvas.width(), canvas.height());

    for inset in 0..thickness.max(1) as i32 {
        let (l, t, r, b) = (left + inset, top + inset, right - inset, bottom - inset);
        if l > r || t > b {
            break;
        }
        for x in l..=r {
            put(canvas, x, t, color);
            put(canvas, x, b, color);
        }
        for y in t..=b {
            put(canvas, l, y, color);
            put(canvas, r, y, color);
        }
    }
}

fn draw_label(
    canvas: &mut Canvas<'_>,
    bbox: &BoundingBox,
    text: &str,
    style: &AnnotationStyle,
    color: Rgb<u8>,
) {
    if canvas.width() == 0 || canvas.height() == 0 {
        return;
    }
    let scale = style.font_scale.max(1) as i32;
    let glyph_h = GLYPH_HEIGHT as i32 * scale;
    let (left, top, _, _) = to_pixel_rect(bbox, canvas.width(), canvas.height());

    // Above the box when there is room, otherwise just inside it
    let mut y = top - glyph_h - 4;
    if y < 0 {
        y = top + style.thickness as i32 + 2;
    }

    let mut x = left;
    for ch in text.chars() {
        if let Some(rows) = glyph_bits(ch) {
            for (row, pattern) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if (pattern >> (GLYPH_WIDTH - 1 - col)) & 1 == 0 {
                        continue;
                    }
                    let px = x + col as i32 * scale;
                    let py = y + row as i32 * scale;
                    for dy in 0..scale {
                        for dx in 0..scale {
                            put(canvas, px + dx, py + dy, color);
                        }
                    }
                }
            }
        }
        x += GLYPH_ADVANCE as i32 * scale;
        if x >= canvas.width() as i32 {
            break;
        }
    }
}
