//! Frame source: owns the active camera handle and re-acquires it on failure.

use super::backend::{CaptureBackend, CaptureHandle};
use super::device::DeviceProbe;
use super::types::{CameraError, Frame};

/// Owns at most one open capture handle.
///
/// Not thread-safe by construction: it lives on the capture thread and is
/// driven by one loop at a time.
pub struct FrameSource<B: CaptureBackend> {
    backend: B,
    probe: DeviceProbe,
    handle: Option<B::Handle>,
    active_index: Option<i32>,
}

impl<B: CaptureBackend> FrameSource<B> {
    /// Create a source. No device is opened until [`initialize`](Self::initialize)
    /// or the first [`read_frame`](Self::read_frame).
    pub fn new(backend: B, probe: DeviceProbe) -> Self {
        Self {
            backend,
            probe,
            handle: None,
            active_index: None,
        }
    }

    /// Device index the current handle is bound to, if any.
    pub fn active_index(&self) -> Option<i32> {
        self.active_index
    }

    /// Whether a handle is held and reports open.
    pub fn is_open(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| h.is_opened())
    }

    /// Acquire a camera by probing indices in order.
    ///
    /// Any previously held handle is released first. Every probe that fails
    /// to open is released before the next index is tried.
    pub fn initialize(&mut self) -> bool {
        self.release();

        for &index in self.probe.as_slice() {
            let mut handle = self.backend.open(index);
            if handle.is_opened() {
                log::info!("Camera {} opened", index);
                self.handle = Some(handle);
                self.active_index = Some(index);
                return true;
            }
            handle.release();
        }

        log::error!("No camera could be opened (probed {})", self.probe);
        false
    }

    /// Read the next frame, re-acquiring the camera when needed.
    ///
    /// Returns [`CameraError::Unavailable`] when no device could be opened and
    /// [`CameraError::ReadFailed`] when a read failed but a device was
    /// re-acquired (the caller should simply try again).
    pub fn read_frame(&mut self) -> Result<Frame, CameraError> {
        if !self.is_open() {
            log::warn!("Camera is not open, re-initializing");
            if !self.initialize() {
                return Err(CameraError::Unavailable);
            }
        }

        let result = match self.handle.as_mut() {
            Some(handle) => handle.read(),
            None => return Err(CameraError::Unavailable),
        };

        match result {
            Ok(frame) => {
                log::trace!("Frame read: {}x{}", frame.width, frame.height);
                Ok(frame)
            }
            Err(e) => {
                log::error!("Failed to read frame from camera: {}", e);
                if self.initialize() {
                    Err(e)
                } else {
                    Err(CameraError::Unavailable)
                }
            }
        }
    }

    /// Re-initialize if needed, then attempt exactly one read.
    pub fn check(&mut self) -> Result<(), CameraError> {
        if !self.is_open() && !self.initialize() {
            return Err(CameraError::Unavailable);
        }
        let handle = self.handle.as_mut().ok_or(CameraError::Unavailable)?;
        handle.read().map(|_| ())
    }

    /// Release the active handle, if any.
    pub fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.release();
        }
        self.active_index = None;
    }
}

impl<B: CaptureBackend> Drop for FrameSource<B> {
    fn drop(&mut self) {
        self.release();
    }
}
