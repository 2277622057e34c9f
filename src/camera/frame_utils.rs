//! Pixel helpers for captured frames.

use super::types::Frame;

/// Decode whatever the device delivered (MJPEG, YUYV, NV12) into RGB8.
/// `None` when nokhwa cannot decode the buffer.
#[cfg(feature = "camera")]
pub fn decode_buffer(buffer: &nokhwa::Buffer) -> Option<Frame> {
    let rgb = buffer
        .decode_image::<nokhwa::pixel_format::RgbFormat>()
        .ok()?;
    let (width, height) = rgb.dimensions();
    Some(Frame::new(rgb.into_raw(), width, height))
}

/// Flip a frame left-right in place. Malformed buffers are left untouched.
pub fn mirror_horizontal(frame: &mut Frame) {
    let bpp = Frame::BYTES_PER_PIXEL;
    let pixels = frame.width as usize;
    if pixels == 0 || frame.data.len() != frame.expected_len() {
        return;
    }

    for row in frame.data.chunks_exact_mut(pixels * bpp) {
        for left in 0..pixels / 2 {
            let right = pixels - 1 - left;
            for channel in 0..bpp {
                row.swap(left * bpp + channel, right * bpp + channel);
            }
        }
    }
}
