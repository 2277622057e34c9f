//! The capture thread: read, annotate, encode, publish.
//!
//! Camera handles are not required to be `Send`, so the [`FrameSource`] is
//! built on the capture thread itself. Everything else talks to the thread
//! through [`CaptureCommand`]s and the stop flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::oneshot;

use super::multipart::{empty_part, frame_part};
use super::publisher::Publisher;
use crate::camera::{CameraError, CaptureBackend, DeviceProbe, FrameSource};
use crate::detect::{Annotator, Detector};
use crate::encoding::{encode_jpeg, DEFAULT_JPEG_QUALITY};
use crate::observation::LastObservation;

/// Default pause between camera re-acquisition attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Consecutive failed reads after which the loop backs off as if the camera
/// were gone.
pub const READ_FAILURES_BEFORE_PAUSE: u32 = 3;

/// Requests handled by the capture thread between frames.
#[derive(Debug)]
pub enum CaptureCommand {
    /// Re-initialize if needed and read one frame, reporting the outcome
    Check(oneshot::Sender<Result<(), CameraError>>),
    /// Leave the loop and release the camera
    Stop,
}

/// Frame loop tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSettings {
    /// Wait after publishing an empty part before trying the camera again
    pub retry_interval: Duration,
    /// JPEG quality (1-100) for published frames
    pub jpeg_quality: u8,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            retry_interval: DEFAULT_RETRY_INTERVAL,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Outcome of one loop iteration.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// An annotated frame went out to subscribers and the observation slot
    Published { sequence: u64, labels: Vec<String> },
    /// No camera; an empty part was published
    NoCamera,
    /// The device opened but the read failed; the frame was dropped
    ReadFailed,
    /// The frame was dropped (detection or encoding failed)
    Skipped,
}

/// Frame Source, Detection Annotator and Streaming Publisher wired together.
pub struct FrameLoop<B: CaptureBackend, D: Detector> {
    source: FrameSource<B>,
    annotator: Annotator<D>,
    publisher: Publisher,
    observation: Arc<LastObservation>,
    settings: LoopSettings,
    failed_reads: u32,
}

impl<B: CaptureBackend, D: Detector> FrameLoop<B, D> {
    pub fn new(
        source: FrameSource<B>,
        annotator: Annotator<D>,
        publisher: Publisher,
        observation: Arc<LastObservation>,
        settings: LoopSettings,
    ) -> Self {
        Self {
            source,
            annotator,
            publisher,
            observation,
            settings,
            failed_reads: 0,
        }
    }

    pub fn source(&self) -> &FrameSource<B> {
        &self.source
    }

    /// Run one iteration. Never fails: per-frame errors are logged and the
    /// frame is skipped.
    pub fn step(&mut self) -> Step {
        let frame = match self.source.read_frame() {
            Ok(frame) => {
                self.failed_reads = 0;
                frame
            }
            Err(CameraError::Unavailable) => {
                self.failed_reads = 0;
                self.publisher.publish(empty_part());
                return Step::NoCamera;
            }
            Err(e) => {
                self.failed_reads = self.failed_reads.saturating_add(1);
                log::warn!("Skipping frame ({} failed read(s) in a row): {}", self.failed_reads, e);
                if self.failed_reads >= READ_FAILURES_BEFORE_PAUSE {
                    self.publisher.publish(empty_part());
                }
                return Step::ReadFailed;
            }
        };
        let captured_at = frame.timestamp;

        let annotated = match self.annotator.annotate(frame) {
            Ok(annotated) => annotated,
            Err(e) => {
                log::error!("Error while processing frame: {}", e);
                return Step::Skipped;
            }
        };

        let jpeg = match encode_jpeg(&annotated.frame, self.settings.jpeg_quality) {
            Ok(jpeg) => Bytes::from(jpeg),
            Err(e) => {
                log::error!("Failed to encode frame: {}", e);
                return Step::Skipped;
            }
        };

        let sequence = self.observation.publish(
            jpeg.clone(),
            annotated.labels.clone(),
            annotated.frame.width,
            annotated.frame.height,
        );
        self.publisher.publish(frame_part(&jpeg));
        log::trace!("Frame {} published {:?} after capture", sequence, captured_at.elapsed());

        Step::Published {
            sequence,
            labels: annotated.labels,
        }
    }

    /// How long to wait for commands after `step` before the next iteration.
    /// `None` means go straight on.
    pub fn pause_after(&self, step: &Step) -> Option<Duration> {
        match step {
            Step::NoCamera => Some(self.settings.retry_interval),
            Step::ReadFailed if self.failed_reads >= READ_FAILURES_BEFORE_PAUSE => {
                Some(self.settings.retry_interval)
            }
            _ => None,
        }
    }

    /// Handle one command. Returns `false` when the loop should exit.
    pub fn handle_command(&mut self, command: CaptureCommand) -> bool {
        match command {
            CaptureCommand::Check(reply) => {
                let result = self.source.check();
                match &result {
                    Ok(()) => log::info!("Camera check succeeded"),
                    Err(e) => log::error!("Camera check failed: {}", e),
                }
                // The requester may have timed out already
                let _ = reply.send(result);
                true
            }
            CaptureCommand::Stop => false,
        }
    }

    /// Loop until `stop` is set, a `Stop` command arrives, or every command
    /// sender is gone. The camera is released on exit.
    pub fn run(mut self, stop: Arc<AtomicBool>, commands: mpsc::Receiver<CaptureCommand>) {
        log::info!("Frame loop started");

        while !stop.load(Ordering::SeqCst) {
            let step = self.step();
            let keep_going = match self.pause_after(&step) {
                Some(pause) => self.wait_for_command(&commands, pause),
                None => self.drain_commands(&commands),
            };
            if !keep_going {
                break;
            }
        }

        self.source.release();
        log::info!("Frame loop stopped");
    }

    /// Block up to `pause` for one command. `false` means exit.
    fn wait_for_command(&mut self, commands: &mpsc::Receiver<CaptureCommand>, pause: Duration) -> bool {
        match commands.recv_timeout(pause) {
            Ok(command) => self.handle_command(command),
            Err(RecvTimeoutError::Timeout) => true,
            Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Handle every queued command without blocking. `false` means exit.
    fn drain_commands(&mut self, commands: &mpsc::Receiver<CaptureCommand>) -> bool {
        loop {
            match commands.try_recv() {
                Ok(command) => {
                    if !self.handle_command(command) {
                        return false;
                    }
                }
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }
}

/// Cloneable sender side of the command channel, used by HTTP handlers.
#[derive(Debug, Clone)]
pub struct CameraControl {
    commands: mpsc::Sender<CaptureCommand>,
}

impl CameraControl {
    pub fn new(commands: mpsc::Sender<CaptureCommand>) -> Self {
        Self { commands }
    }

    /// A control plus the receiving end, for driving a loop by hand.
    pub fn channel() -> (Self, mpsc::Receiver<CaptureCommand>) {
        let (tx, rx) = mpsc::channel();
        (Self::new(tx), rx)
    }

    /// Ask the capture thread to check the camera.
    ///
    /// A loop that does not answer within `timeout` counts as
    /// [`CameraError::LoopUnavailable`].
    pub async fn check(&self, timeout: Duration) -> Result<(), CameraError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(CaptureCommand::Check(reply))
            .map_err(|_| CameraError::LoopUnavailable)?;

        match tokio::time::timeout(timeout, response).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) | Err(_) => Err(CameraError::LoopUnavailable),
        }
    }

    fn stop(&self) {
        let _ = self.commands.send(CaptureCommand::Stop);
    }
}

/// Owns the running capture thread. Dropping it stops the loop and joins.
pub struct FrameLoopHandle {
    control: CameraControl,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl FrameLoopHandle {
    pub fn control(&self) -> CameraControl {
        self.control.clone()
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the loop and wait for the thread to release the camera.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        self.control.stop();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Frame loop thread panicked");
            }
        }
    }
}

impl Drop for FrameLoopHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawn the capture thread.
///
/// `backend` and `detector` move onto the thread; the [`FrameSource`] is
/// created there. `stop` is shared with the Ctrl+C handler.
pub fn spawn<B, D>(
    backend: B,
    probe: DeviceProbe,
    detector: D,
    publisher: Publisher,
    observation: Arc<LastObservation>,
    settings: LoopSettings,
    stop: Arc<AtomicBool>,
) -> std::io::Result<FrameLoopHandle>
where
    B: CaptureBackend + Send + 'static,
    D: Detector + 'static,
{
    let (control, commands) = CameraControl::channel();
    let thread_stop = Arc::clone(&stop);

    let thread = thread::Builder::new()
        .name("frame-loop".to_string())
        .spawn(move || {
            let mut source = FrameSource::new(backend, probe);
            source.initialize();
            let frame_loop = FrameLoop::new(
                source,
                Annotator::new(detector),
                publisher,
                observation,
                settings,
            );
            frame_loop.run(thread_stop, commands);
        })?;

    Ok(FrameLoopHandle {
        control,
        stop,
        thread: Some(thread),
    })
}
