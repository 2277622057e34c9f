use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::camera::CameraError;
use crate::shutdown::wait_for_shutdown;
use crate::stream::CONTENT_TYPE;

/// `/check_camera` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraStatus {
    pub status: String,
    pub message: String,
}

impl CameraStatus {
    fn success() -> Self {
        Self {
            status: "success".to_string(),
            message: "Camera access successful.".to_string(),
        }
    }

    fn error(err: &CameraError) -> Self {
        let message = match err {
            CameraError::ReadFailed(_) => "Could not get an image from the camera.",
            CameraError::LoopUnavailable => "Capture loop is not responding.",
            _ => "Could not access the camera.",
        };
        Self {
            status: "error".to_string(),
            message: message.to_string(),
        }
    }
}

/// `GET /video_feed`: endless multipart stream, one JPEG part per frame.
pub async fn video_feed(State(state): State<AppState>) -> Response {
    log::info!(
        "Video stream client connected ({} active)",
        state.publisher.subscriber_count() + 1
    );
    let chunks = state
        .publisher
        .chunk_stream()
        .take_until(wait_for_shutdown(state.shutdown.clone()));

    (
        [
            (header::CONTENT_TYPE, CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(chunks),
    )
        .into_response()
}

/// `GET /check_camera`: one read through the capture thread.
pub async fn check_camera(State(state): State<AppState>) -> (StatusCode, Json<CameraStatus>) {
    match state.camera.check(state.check_timeout).await {
        Ok(()) => (StatusCode::OK, Json(CameraStatus::success())),
        Err(e) => {
            log::error!("Camera check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(CameraStatus::error(&e)),
            )
        }
    }
}
