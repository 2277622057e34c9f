//! Capture backend abstraction.
//!
//! A backend opens devices by integer index. The returned handle may or may
//! not be open; callers check [`CaptureHandle::is_opened`] and must release
//! handles that failed to open.

use super::types::{CameraError, Frame};

/// A device handle produced by a [`CaptureBackend`].
///
/// Handles are not required to be `Send`: they are created and used on the
/// capture thread only.
pub trait CaptureHandle {
    /// Whether the device is open and may be read from.
    fn is_opened(&self) -> bool;

    /// Read the next frame. Only valid while `is_opened()` is true.
    fn read(&mut self) -> Result<Frame, CameraError>;

    /// Release the underlying device. Idempotent.
    fn release(&mut self);
}

/// Opens capture devices by index.
pub trait CaptureBackend {
    type Handle: CaptureHandle;

    /// Attempt to open the device at `index`.
    fn open(&self, index: i32) -> Self::Handle;
}

#[cfg(feature = "camera")]
pub use native::{NativeBackend, NativeHandle};

#[cfg(not(feature = "camera"))]
pub use disabled::{NativeBackend, NativeHandle};

#[cfg(feature = "camera")]
mod native {
    use nokhwa::pixel_format::RgbFormat;
    use nokhwa::utils::{
        CameraFormat, CameraIndex, FrameFormat as NokhwaFrameFormat, RequestedFormat,
        RequestedFormatType,
    };
    use nokhwa::Camera;

    use super::super::frame_utils::{decode_buffer, mirror_horizontal};
    use super::{CaptureBackend, CaptureHandle};
    use crate::camera::types::{CameraError, CameraSettings, Frame};

    /// nokhwa-backed capture devices.
    #[derive(Debug, Clone, Default)]
    pub struct NativeBackend {
        settings: CameraSettings,
    }

    impl NativeBackend {
        pub fn new(settings: CameraSettings) -> Self {
            Self { settings }
        }
    }

    /// An opened (or failed) nokhwa camera.
    pub struct NativeHandle {
        camera: Option<Camera>,
        mirror: bool,
    }

    impl CaptureBackend for NativeBackend {
        type Handle = NativeHandle;

        fn open(&self, index: i32) -> NativeHandle {
            let mirror = self.settings.mirror;
            // nokhwa has no "any device" index
            let Ok(raw_index) = u32::try_from(index) else {
                log::debug!("Skipping camera index {}: not addressable", index);
                return NativeHandle {
                    camera: None,
                    mirror,
                };
            };

            let camera = match open_camera_with_fallback(raw_index, &self.settings) {
                Ok(mut cam) => match cam.open_stream() {
                    Ok(()) => Some(cam),
                    Err(e) => {
                        log::debug!("Camera {} stream failed to start: {}", index, e);
                        None
                    }
                },
                Err(e) => {
                    log::debug!("{}", e);
                    None
                }
            };

            NativeHandle { camera, mirror }
        }
    }

    impl CaptureHandle for NativeHandle {
        fn is_opened(&self) -> bool {
            self.camera.as_ref().is_some_and(|c| c.is_stream_open())
        }

        fn read(&mut self) -> Result<Frame, CameraError> {
            let camera = self
                .camera
                .as_mut()
                .ok_or_else(|| CameraError::ReadFailed("camera is not open".to_string()))?;
            let raw = camera
                .frame()
                .map_err(|e| CameraError::ReadFailed(e.to_string()))?;
            let mut frame = decode_buffer(&raw)
                .ok_or_else(|| CameraError::ReadFailed("frame decode failed".to_string()))?;
            if self.mirror {
                mirror_horizontal(&mut frame);
            }
            Ok(frame)
        }

        fn release(&mut self) {
            if let Some(mut camera) = self.camera.take() {
                let _ = camera.stop_stream();
            }
        }
    }

    impl Drop for NativeHandle {
        fn drop(&mut self) {
            self.release();
        }
    }

    /// Try to open a camera with multiple format fallback strategies.
    fn open_camera_with_fallback(
        index: u32,
        settings: &CameraSettings,
    ) -> Result<Camera, CameraError> {
        let resolution =
            nokhwa::utils::Resolution::new(settings.resolution.width, settings.resolution.height);
        let format_attempts: Vec<RequestedFormat> = vec![
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
                resolution,
                NokhwaFrameFormat::MJPEG,
                settings.fps,
            ))),
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
                resolution,
                NokhwaFrameFormat::YUYV,
                settings.fps,
            ))),
            // Let the camera pick whatever format works best
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate),
        ];

        let mut last_error = String::from("no format attempted");
        for requested in format_attempts {
            match Camera::new(CameraIndex::Index(index), requested) {
                Ok(cam) => return Ok(cam),
                Err(e) => last_error = e.to_string(),
            }
        }

        let msg = last_error.to_lowercase();
        if msg.contains("permission") || msg.contains("denied") || msg.contains("authorization") {
            Err(CameraError::PermissionDenied)
        } else {
            Err(CameraError::OpenFailed {
                index: index as i32,
                message: last_error,
            })
        }
    }
}

#[cfg(not(feature = "camera"))]
mod disabled {
    use super::{CaptureBackend, CaptureHandle};
    use crate::camera::types::{CameraError, CameraSettings, Frame};

    /// Stand-in used when the crate is built without the `camera` feature.
    /// Every probe fails to open, so the stream degrades to empty chunks.
    #[derive(Debug, Clone, Default)]
    pub struct NativeBackend {
        _settings: CameraSettings,
    }

    impl NativeBackend {
        pub fn new(settings: CameraSettings) -> Self {
            Self {
                _settings: settings,
            }
        }
    }

    pub struct NativeHandle;

    impl CaptureBackend for NativeBackend {
        type Handle = NativeHandle;

        fn open(&self, index: i32) -> NativeHandle {
            log::debug!(
                "Camera {} not opened: built without the `camera` feature",
                index
            );
            NativeHandle
        }
    }

    impl CaptureHandle for NativeHandle {
        fn is_opened(&self) -> bool {
            false
        }

        fn read(&mut self) -> Result<Frame, CameraError> {
            Err(CameraError::ReadFailed("camera support not compiled in".to_string()))
        }

        fn release(&mut self) {}
    }
}
