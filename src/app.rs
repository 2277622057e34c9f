//! Wires the components together for the `serve` command.

use std::sync::Arc;

use crate::assistant::{QueryResponder, Unconfigured, VisionClient, VisionModel, OPENAI_API_KEY_ENV};
use crate::camera::{CameraError, NativeBackend};
use crate::config::{AssistantConfig, Config, ConfigError};
use crate::detect::{self, DetectError};
use crate::observation::LastObservation;
use crate::server::{self, AppState, ServerError};
use crate::shutdown::{self, Shutdown};
use crate::stream::{self, Publisher};

/// Anything that ends the process with a non-zero status.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error(transparent)]
    Detector(#[from] DetectError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("Failed to install Ctrl+C handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Vision model for the Query Responder. Without an API key the server still
/// runs; every question then gets the apology message.
pub fn vision_model(config: &AssistantConfig) -> Arc<dyn VisionModel> {
    let key = std::env::var(OPENAI_API_KEY_ENV).unwrap_or_default();
    if key.is_empty() {
        log::warn!(
            "{} is not set; questions will not be answered",
            OPENAI_API_KEY_ENV
        );
        return Arc::new(Unconfigured);
    }

    match VisionClient::with_options(
        key,
        config.base_url.clone(),
        config.model.clone(),
        config.timeout(),
    ) {
        Ok(client) => {
            log::info!("Vision API: {} ({})", client.base_url(), client.model());
            Arc::new(client)
        }
        Err(e) => {
            log::error!("Failed to create vision API client: {}", e);
            Arc::new(Unconfigured)
        }
    }
}

/// Run the service until Ctrl+C.
///
/// Startup order matters: the model loads first (fatal on failure), then the
/// listener binds (fatal on failure), and only then does the capture thread
/// start.
pub fn run_server(config: Config) -> Result<(), AppError> {
    let detector = detect::load_detector(&config.detector.model_path, config.detector.params()?)?;

    let shutdown = Shutdown::new();
    shutdown::install_ctrlc_handler(&shutdown)?;

    let runtime = tokio::runtime::Runtime::new()?;
    let listener = runtime.block_on(server::bind(&config.server.addr()))?;

    if !config.server.static_dir.join("index.html").exists() {
        log::warn!(
            "No front end at {}; only the API routes will be useful",
            config.server.static_dir.display()
        );
    }

    let publisher = Publisher::new(config.stream.buffer);
    let observation = Arc::new(LastObservation::new());

    let probe = config.camera.probe();
    log::info!("Camera probe order: {}", probe);
    let mut frame_loop = stream::spawn(
        NativeBackend::new(config.camera.settings()),
        probe,
        detector,
        publisher.clone(),
        Arc::clone(&observation),
        config.loop_settings(),
        shutdown.flag(),
    )?;

    let responder = QueryResponder::new(vision_model(&config.assistant), observation)
        .with_max_tokens(config.assistant.max_tokens);

    let state = AppState {
        publisher,
        camera: frame_loop.control(),
        responder,
        shutdown: shutdown.subscribe(),
        check_timeout: config.server.check_timeout(),
        max_message_size: config.server.max_message_size,
    };
    let app = server::router(state, &config.server.static_dir);

    let result = runtime.block_on(server::serve(listener, app, shutdown.subscribe()));

    shutdown.trigger();
    frame_loop.stop();
    result.map_err(AppError::from)
}
