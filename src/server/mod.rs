//! HTTP and event server.
//!
//! | Route | |
//! |---|---|
//! | `GET /video_feed` | annotated MJPEG stream |
//! | `GET /check_camera` | camera health as JSON |
//! | `GET /events` | question/answer WebSocket |
//! | anything else | front-end bundle, falling back to `index.html` |

mod events;
mod routes;

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

pub use events::{ClientEvent, ServerEvent};
pub use routes::CameraStatus;

use crate::assistant::QueryResponder;
use crate::shutdown::wait_for_shutdown;
use crate::stream::{CameraControl, Publisher};

/// Default time `/check_camera` waits for the capture thread.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Default WebSocket message cap (100 MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

/// Shared handler state. Every field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    pub publisher: Publisher,
    pub camera: CameraControl,
    pub responder: QueryResponder,
    pub shutdown: watch::Receiver<bool>,
    pub check_timeout: Duration,
    pub max_message_size: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Build the router. `static_dir` holds the prebuilt front end.
pub fn router(state: AppState, static_dir: &Path) -> Router {
    let spa = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .route("/video_feed", get(routes::video_feed))
        .route("/check_camera", get(routes::check_camera))
        .route("/events", get(events::events))
        .fallback_service(spa)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `addr`. Failure here is fatal at startup.
pub async fn bind(addr: &str) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Serve until the shutdown signal fires, then drain open connections.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: watch::Receiver<bool>,
) -> Result<(), ServerError> {
    let local: Option<SocketAddr> = listener.local_addr().ok();
    if let Some(addr) = local {
        log::info!("Listening on http://{}", addr);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(shutdown))
        .await?;

    log::info!("Server stopped");
    Ok(())
}
