//! Camera device enumeration and probe order.

use std::fmt;

use super::types::{CameraError, DeviceInfo};

/// First index of the default scan range on platforms with multi-camera indexing.
pub const DEFAULT_SCAN_START: i32 = -1;

/// Last index (inclusive) of the default scan range.
pub const DEFAULT_SCAN_END: i32 = 9;

/// Ordered list of device indices tried when acquiring a camera.
///
/// The first index whose handle reports open wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProbe {
    indices: Vec<i32>,
}

impl DeviceProbe {
    /// Probe exactly the given indices, in order.
    pub fn indices(indices: Vec<i32>) -> Self {
        Self { indices }
    }

    /// Probe a single index.
    pub fn single(index: i32) -> Self {
        Self {
            indices: vec![index],
        }
    }

    /// Probe every index in `start..=end`.
    pub fn range(start: i32, end: i32) -> Self {
        Self {
            indices: (start..=end).collect(),
        }
    }

    /// Platform default: index 0 on macOS, `-1..=9` elsewhere.
    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            Self::single(0)
        } else {
            Self::range(DEFAULT_SCAN_START, DEFAULT_SCAN_END)
        }
    }

    /// Indices in probe order.
    pub fn as_slice(&self) -> &[i32] {
        &self.indices
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

impl Default for DeviceProbe {
    fn default() -> Self {
        Self::platform_default()
    }
}

impl fmt::Display for DeviceProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.indices.iter().map(|i| i.to_string()).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Cameras the platform backend can enumerate. None attached is an empty
/// list, not an error.
#[cfg(feature = "camera")]
pub fn list_devices() -> Result<Vec<DeviceInfo>, CameraError> {
    let devices = nokhwa::query(nokhwa::utils::ApiBackend::Auto)
        .map_err(|e| CameraError::QueryFailed(e.to_string()))?;

    Ok(devices
        .into_iter()
        .map(|d| DeviceInfo {
            index: d.index().as_index().map_or(-1, |i| i as i32),
            name: d.human_name(),
            details: d.misc(),
        })
        .collect())
}

/// Cameras the platform backend can enumerate.
///
/// Built without the `camera` feature there is nothing to enumerate.
#[cfg(not(feature = "camera"))]
pub fn list_devices() -> Result<Vec<DeviceInfo>, CameraError> {
    Ok(Vec::new())
}
