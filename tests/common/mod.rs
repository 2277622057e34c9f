//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use lookout::camera::{CameraError, CaptureBackend, CaptureHandle, Frame};
use lookout::detect::{BoundingBox, DetectError, Detection, Detector};

pub const FRAME_WIDTH: u32 = 64;
pub const FRAME_HEIGHT: u32 = 48;
pub const BACKGROUND: [u8; 3] = [10, 20, 30];

/// What the scripted backend has been asked to do.
#[derive(Debug, Default)]
pub struct BackendState {
    /// Indices that open successfully
    pub openable: Vec<i32>,
    /// The next N reads fail
    pub failing_reads: usize,
    /// Every `open` call, in order
    pub opened: Vec<i32>,
    /// Every `release` call, in order
    pub released: Vec<i32>,
    /// Handles that reported open and have not been released
    pub live: usize,
    pub reads: usize,
}

/// Capture backend driven by a shared script.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    pub state: Arc<Mutex<BackendState>>,
}

impl ScriptedBackend {
    pub fn with_openable(openable: &[i32]) -> Self {
        let backend = Self::default();
        backend.state.lock().unwrap().openable = openable.to_vec();
        backend
    }

    pub fn set_openable(&self, openable: &[i32]) {
        self.state.lock().unwrap().openable = openable.to_vec();
    }

    pub fn fail_next_reads(&self, n: usize) {
        self.state.lock().unwrap().failing_reads = n;
    }

    pub fn opened(&self) -> Vec<i32> {
        self.state.lock().unwrap().opened.clone()
    }

    pub fn released(&self) -> Vec<i32> {
        self.state.lock().unwrap().released.clone()
    }

    pub fn live(&self) -> usize {
        self.state.lock().unwrap().live
    }

    pub fn reads(&self) -> usize {
        self.state.lock().unwrap().reads
    }
}

#[derive(Debug)]
pub struct ScriptedHandle {
    index: i32,
    opened: bool,
    released: bool,
    state: Arc<Mutex<BackendState>>,
}

impl CaptureHandle for ScriptedHandle {
    fn is_opened(&self) -> bool {
        self.opened && !self.released
    }

    fn read(&mut self) -> Result<Frame, CameraError> {
        let mut state = self.state.lock().unwrap();
        state.reads += 1;
        if !self.is_opened() {
            return Err(CameraError::ReadFailed("handle closed".to_string()));
        }
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(CameraError::ReadFailed("scripted failure".to_string()));
        }
        Ok(Frame::filled(FRAME_WIDTH, FRAME_HEIGHT, BACKGROUND))
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let mut state = self.state.lock().unwrap();
        state.released.push(self.index);
        if self.opened {
            state.live -= 1;
        }
    }
}

impl CaptureBackend for ScriptedBackend {
    type Handle = ScriptedHandle;

    fn open(&self, index: i32) -> ScriptedHandle {
        let mut state = self.state.lock().unwrap();
        state.opened.push(index);
        let opened = state.openable.contains(&index);
        if opened {
            state.live += 1;
        }
        ScriptedHandle {
            index,
            opened,
            released: false,
            state: Arc::clone(&self.state),
        }
    }
}

/// Detector that returns the same detections for every frame.
pub struct StubDetector {
    pub detections: Vec<Detection>,
    pub names: Vec<String>,
    pub fail: bool,
}

impl StubDetector {
    pub fn new(detections: Vec<(usize, BoundingBox)>, names: &[&str]) -> Self {
        Self {
            detections: detections
                .into_iter()
                .map(|(class_id, bbox)| Detection {
                    class_id,
                    confidence: 0.9,
                    bbox,
                })
                .collect(),
            names: names.iter().map(|s| s.to_string()).collect(),
            fail: false,
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![], &["person"])
    }

    pub fn failing() -> Self {
        let mut detector = Self::empty();
        detector.fail = true;
        detector
    }

    /// A person and a cup, in that order.
    pub fn person_and_cup() -> Self {
        Self::new(
            vec![
                (0, BoundingBox::new(4.0, 20.0, 30.0, 44.0)),
                (1, BoundingBox::new(35.0, 24.0, 60.0, 44.0)),
            ],
            &["person", "cup"],
        )
    }
}

impl Detector for StubDetector {
    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, DetectError> {
        if self.fail {
            return Err(DetectError::Inference("stub failure".to_string()));
        }
        Ok(self.detections.clone())
    }

    fn class_names(&self) -> &[String] {
        &self.names
    }
}
