//! Configuration file handling for lookout.
//!
//! Loads configuration from `<config dir>/lookout/config.toml` or a custom path.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::assistant::{DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use crate::camera::{CameraSettings, DeviceProbe, Resolution};
use crate::detect::{YoloParams, MAX_INPUT_SIZE};
use crate::encoding::DEFAULT_JPEG_QUALITY;
use crate::server::{DEFAULT_CHECK_TIMEOUT, DEFAULT_MAX_MESSAGE_SIZE};
use crate::stream::{LoopSettings, DEFAULT_BUFFER, DEFAULT_RETRY_INTERVAL};

/// Configuration file structure for lookout.
///
/// Every section and key is optional; missing values take their defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub stream: StreamConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Prebuilt front-end bundle
    pub static_dir: PathBuf,
    pub check_timeout_ms: u64,
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5001,
            static_dir: PathBuf::from("frontend/build"),
            check_timeout_ms: DEFAULT_CHECK_TIMEOUT.as_millis() as u64,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Device indices to probe, in order. Unset means the platform default.
    pub devices: Option<Vec<i32>>,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub mirror: bool,
    pub retry_interval_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            devices: None,
            width: Resolution::VGA.width,
            height: Resolution::VGA.height,
            fps: 30,
            mirror: false,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL.as_millis() as u64,
        }
    }
}

impl CameraConfig {
    pub fn probe(&self) -> DeviceProbe {
        match &self.devices {
            Some(devices) => DeviceProbe::indices(devices.clone()),
            None => DeviceProbe::platform_default(),
        }
    }

    pub fn settings(&self) -> CameraSettings {
        CameraSettings {
            resolution: Resolution {
                width: self.width,
                height: self.height,
            },
            fps: self.fps,
            mirror: self.mirror,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DetectorConfig {
    /// YOLOv8 ONNX export
    pub model_path: PathBuf,
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        let params = YoloParams::default();
        Self {
            model_path: PathBuf::from("yolov8n.onnx"),
            input_size: params.input_size,
            confidence_threshold: params.confidence_threshold,
            iou_threshold: params.iou_threshold,
            max_detections: params.max_detections,
        }
    }
}

impl DetectorConfig {
    /// Detector parameters, rejecting an input size the model cannot use.
    pub fn params(&self) -> Result<YoloParams, ConfigError> {
        if self.input_size == 0 || self.input_size > MAX_INPUT_SIZE {
            return Err(ConfigError::Invalid {
                key: "detector.input_size",
                message: format!(
                    "{} is out of range (1..={})",
                    self.input_size, MAX_INPUT_SIZE
                ),
            });
        }
        Ok(YoloParams {
            input_size: self.input_size,
            confidence_threshold: self.confidence_threshold,
            iou_threshold: self.iou_threshold,
            max_detections: self.max_detections,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AssistantConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: 60,
        }
    }
}

impl AssistantConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StreamConfig {
    /// Parts buffered per client before it starts skipping
    pub buffer: usize,
    pub jpeg_quality: u8,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer: DEFAULT_BUFFER,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// With an explicit `path` the file must exist. Without one, the default
    /// location is used and a missing file yields the defaults. A file that
    /// exists but cannot be parsed is always an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match default_path() {
                Some(p) => (p, false),
                None => return Ok(Config::default()),
            },
        };

        if !path.exists() {
            if required {
                return Err(ConfigError::NotFound { path });
            }
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            path: path.clone(),
            source: e,
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.clone(),
            source: e,
        })?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            retry_interval: Duration::from_millis(self.camera.retry_interval_ms),
            jpeg_quality: self.stream.jpeg_quality,
        }
    }

    /// Effective settings as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::SerializeError)
    }
}

/// Commented starter file written by `config init`.
pub const DEFAULT_CONFIG_TOML: &str = r#"# lookout configuration

[server]
host = "127.0.0.1"
port = 5001
# Prebuilt front-end bundle served at /
static_dir = "frontend/build"
check_timeout_ms = 5000
max_message_size = 104857600

[camera]
# Device indices to try, in order. Omit to use the platform default
# ([0] on macOS, -1 through 9 elsewhere).
# devices = [0, 1]
width = 640
height = 480
fps = 30
mirror = false
retry_interval_ms = 500

[detector]
model_path = "yolov8n.onnx"
input_size = 640
confidence_threshold = 0.25
iou_threshold = 0.45
max_detections = 300

[assistant]
# API key is read from OPENAI_API_KEY (a .env file works too)
base_url = "https://api.openai.com/v1"
model = "gpt-4o"
max_tokens = 300
timeout_secs = 60

[stream]
buffer = 8
jpeg_quality = 80
"#;

/// Write [`DEFAULT_CONFIG_TOML`] to `path`, creating parent directories.
/// An existing file is only replaced when `force` is set.
pub fn write_default(path: &Path, force: bool) -> Result<(), ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }
    let io_err = |source| ConfigError::IoError {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, DEFAULT_CONFIG_TOML).map_err(io_err)
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    NotFound {
        path: PathBuf,
    },
    AlreadyExists {
        path: PathBuf,
    },
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    SerializeError(toml::ser::Error),
    Invalid {
        key: &'static str,
        message: String,
    },
    NoConfigDir,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound { path } => {
                write!(f, "Config file '{}' does not exist", path.display())
            }
            ConfigError::AlreadyExists { path } => {
                write!(
                    f,
                    "Config file '{}' already exists (use --force to overwrite)",
                    path.display()
                )
            }
            ConfigError::IoError { path, source } => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::SerializeError(source) => {
                write!(f, "Failed to serialize config: {}", source)
            }
            ConfigError::Invalid { key, message } => {
                write!(f, "Invalid value for {}: {}", key, message)
            }
            ConfigError::NoConfigDir => {
                write!(f, "No config directory on this platform; pass --config <path>")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::SerializeError(source) => Some(source),
            ConfigError::NotFound { .. }
            | ConfigError::AlreadyExists { .. }
            | ConfigError::Invalid { .. }
            | ConfigError::NoConfigDir => None,
        }
    }
}

/// Get the default config file path, if the platform has a config directory.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lookout").join("config.toml"))
}
