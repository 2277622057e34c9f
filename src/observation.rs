//! The most recent annotated frame and its labels, shared between the
//! capture thread (single writer) and question handlers (readers).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use bytes::Bytes;

/// One published frame. Immutable once created, so the image and labels a
/// reader holds always belong together.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Monotonic publish counter, starting at 1
    pub sequence: u64,
    /// Annotated frame as JPEG
    pub jpeg: Bytes,
    /// Labels of the detections drawn on the frame, in detector order
    pub labels: Vec<String>,
    pub width: u32,
    pub height: u32,
}

/// Snapshot slot. Publishing swaps the whole `Arc`, readers clone it.
#[derive(Debug, Default)]
pub struct LastObservation {
    slot: RwLock<Option<Arc<Observation>>>,
    next_sequence: AtomicU64,
}

impl LastObservation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current observation. Returns its sequence number.
    pub fn publish(&self, jpeg: Bytes, labels: Vec<String>, width: u32, height: u32) -> u64 {
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let observation = Arc::new(Observation {
            sequence,
            jpeg,
            labels,
            width,
            height,
        });

        // A poisoned lock only means a writer panicked mid-swap; the Option
        // inside is still a whole value.
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(observation);
        sequence
    }

    /// The latest observation, or `None` before the first frame.
    pub fn snapshot(&self) -> Option<Arc<Observation>> {
        self.slot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
