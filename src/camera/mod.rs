//! Camera access: device probing, capture handles and the frame source.
//!
//! - Backend abstraction via [`CaptureBackend`] / [`CaptureHandle`]
//! - Probe order via [`DeviceProbe`]
//! - Acquisition and re-acquisition via [`FrameSource`]

mod backend;
mod device;
mod frame_utils;
mod source;
mod types;

pub use backend::{CaptureBackend, CaptureHandle, NativeBackend, NativeHandle};
pub use device::{list_devices, DeviceProbe, DEFAULT_SCAN_END, DEFAULT_SCAN_START};
pub use frame_utils::mirror_horizontal;
pub use source::FrameSource;
pub use types::{CameraError, DeviceInfo, CameraSettings, Frame, Resolution};
