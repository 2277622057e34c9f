//! Frames, capture settings and camera errors.

use std::fmt;
use std::time::Instant;

/// A camera the platform backend knows about, as shown by `list-cameras`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Index to pass to `--camera`
    pub index: i32,
    pub name: String,
    /// Backend-specific details (driver, bus path)
    pub details: String,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.details.is_empty() {
            write!(f, "{:>3}  {}", self.index, self.name)
        } else {
            write!(f, "{:>3}  {} - {}", self.index, self.name, self.details)
        }
    }
}

/// Requested capture size. Cameras may deliver something close instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// 640x480, the usual webcam default and the detector's input edge.
    pub const VGA: Resolution = Resolution {
        width: 640,
        height: 480,
    };
}

impl Default for Resolution {
    fn default() -> Self {
        Self::VGA
    }
}

/// One captured image, packed RGB8, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// When the backend handed the frame over
    pub timestamp: Instant,
}

impl Frame {
    pub const BYTES_PER_PIXEL: usize = 3;

    /// Wrap an existing RGB8 buffer, stamped now. The length is not checked
    /// here; consumers reject malformed buffers.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    /// Solid-color frame.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        Self::new(rgb.repeat(pixels), width, height)
    }

    /// Buffer length a `width` x `height` RGB8 frame must have.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * Self::BYTES_PER_PIXEL
    }

    /// RGB value at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * Self::BYTES_PER_PIXEL;
        let px = self.data.get(offset..offset + Self::BYTES_PER_PIXEL)?;
        Some([px[0], px[1], px[2]])
    }
}

/// How an opened device should be configured.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraSettings {
    pub resolution: Resolution,
    pub fps: u32,
    /// Flip frames left-right before detection
    pub mirror: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            resolution: Resolution::VGA,
            fps: 30,
            mirror: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CameraError {
    /// The platform backend could not enumerate devices
    QueryFailed(String),
    OpenFailed { index: i32, message: String },
    /// macOS refused camera access to this process
    PermissionDenied,
    /// No probed device index could be opened
    Unavailable,
    /// Reading a frame from an open device failed
    ReadFailed(String),
    /// The capture thread did not answer
    LoopUnavailable,
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::QueryFailed(msg) => write!(f, "Could not enumerate cameras: {}", msg),
            CameraError::OpenFailed { index, message } => {
                write!(f, "Failed to open camera {}: {}", index, message)
            }
            CameraError::PermissionDenied => write!(
                f,
                "Camera access denied; allow it under System Settings > Privacy & Security > Camera"
            ),
            CameraError::Unavailable => write!(f, "No camera could be opened"),
            CameraError::ReadFailed(msg) => write!(f, "Failed to read frame: {}", msg),
            CameraError::LoopUnavailable => write!(f, "Capture loop is not running"),
        }
    }
}

impl std::error::Error for CameraError {}
