//! Fan-out of stream parts to every connected `/video_feed` client.

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

/// Default number of parts buffered per subscriber before it starts lagging.
pub const DEFAULT_BUFFER: usize = 8;

/// Single-producer, many-consumer publisher of multipart chunks.
///
/// Subscribers see chunks in publish order. A subscriber that falls more than
/// the buffer behind skips ahead instead of stalling the producer.
#[derive(Debug, Clone)]
pub struct Publisher {
    tx: broadcast::Sender<Bytes>,
}

impl Publisher {
    pub fn new(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self { tx }
    }

    /// Send a chunk to every current subscriber. Returns how many received it.
    pub fn publish(&self, chunk: Bytes) -> usize {
        // No subscribers is not an error, nobody is watching
        self.tx.send(chunk).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Bytes> {
        self.tx.subscribe()
    }

    /// Subscribe as a stream suitable for a streaming response body.
    ///
    /// The stream ends only when the publisher is dropped.
    pub fn chunk_stream(&self) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
        BroadcastStream::new(self.tx.subscribe()).filter_map(|item| async move {
            match item {
                Ok(chunk) => Some(Ok(chunk)),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    log::debug!("Stream client lagged, skipped {} chunk(s)", skipped);
                    None
                }
            }
        })
    }
}

impl Default for Publisher {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER)
    }
}
