//! lookout library crate.
//!
//! Webcam frames go through an object detector, get boxes and labels drawn
//! on them, and are streamed as `multipart/x-mixed-replace`. Questions about
//! the latest frame are relayed to a vision-language API over a WebSocket.

pub mod app;
pub mod assistant;
pub mod camera;
pub mod cli;
pub mod config;
pub mod detect;
pub mod encoding;
pub mod observation;
pub mod server;
pub mod shutdown;
pub mod stream;
