//! `multipart/x-mixed-replace` framing for the MJPEG stream.

use bytes::{BufMut, Bytes, BytesMut};

/// Part boundary token.
pub const BOUNDARY: &str = "frame";

/// Response content type for the stream.
pub const CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

const PART_HEADER: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
const PART_TRAILER: &[u8] = b"\r\n";

/// One stream part carrying a JPEG payload.
pub fn frame_part(jpeg: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(PART_HEADER.len() + jpeg.len() + PART_TRAILER.len());
    buf.put_slice(PART_HEADER);
    buf.put_slice(jpeg);
    buf.put_slice(PART_TRAILER);
    buf.freeze()
}

/// A part with identical framing and no payload, sent while no camera is available.
pub fn empty_part() -> Bytes {
    frame_part(&[])
}
