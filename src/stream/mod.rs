//! Streaming Publisher: the capture thread and the multipart fan-out.

mod frame_loop;
mod multipart;
mod publisher;

pub use frame_loop::{
    spawn, CameraControl, CaptureCommand, FrameLoop, FrameLoopHandle, LoopSettings, Step,
    DEFAULT_RETRY_INTERVAL, READ_FAILURES_BEFORE_PAUSE,
};
pub use multipart::{empty_part, frame_part, BOUNDARY, CONTENT_TYPE};
pub use publisher::{Publisher, DEFAULT_BUFFER};
