//! Continuous (live) frame pipeline.
//!
//! One background task per pipeline pulls the current camera frame at the
//! target rate, composes it on the blocking pool and presents the result to
//! the preview sink and, while recording, to the recording sink. The size of
//! each pulled frame is written back to the shared [`Layout`].
//!
//! The task owns the source and both sinks, so each surface has exactly one
//! writer. Starting a new preview stops the previous task first, and stopping
//! cancels through a `CancellationToken` and waits for the task to exit.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use ts_rs::TS;

use super::compositor::Compositor;
use super::region::Layout;
use super::types::{Frame, FrameDimensions, FrameRequest};
use crate::error::{CamFrameError, CamFrameResult, OptionExt};

/// A live camera (or any continuously updating) source.
pub trait FrameSource: Send {
    /// Pixel size, or `None` while the device is still starting.
    fn dimensions(&self) -> Option<FrameDimensions>;

    /// The frame currently shown by the source.
    ///
    /// `SourceUnavailable` means "not ready yet"; the tick is skipped.
    fn current_frame(&mut self) -> CamFrameResult<Frame>;
}

/// Destination for composited frames (preview canvas, encoder stream).
pub trait FrameSink: Send {
    fn present(&mut self, frame: &Frame) -> CamFrameResult<()>;
}

/// Lifecycle of a live pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum LiveState {
    Idle,
    Previewing,
    Recording,
    Stopped,
}

/// Snapshot of the pipeline for the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct LiveStatus {
    pub state: LiveState,
    #[ts(type = "number")]
    pub frames_rendered: u64,
    #[ts(type = "number")]
    pub frames_skipped: u64,
    /// Last recording failure, if recording was stopped by an error.
    pub last_error: Option<String>,
}

impl Default for LiveStatus {
    fn default() -> Self {
        Self {
            state: LiveState::Idle,
            frames_rendered: 0,
            frames_skipped: 0,
            last_error: None,
        }
    }
}

/// Commands sent from the pipeline handle to the live loop.
enum LiveCommand {
    StartRecording(Box<dyn FrameSink>),
    StopRecording(oneshot::Sender<Option<Box<dyn FrameSink>>>),
}

/// State shared between the handle and the loop.
#[derive(Clone)]
struct Shared {
    compositor: Arc<Compositor>,
    request: Arc<Mutex<FrameRequest>>,
    layout: Arc<Mutex<Layout>>,
    status: Arc<Mutex<LiveStatus>>,
}

/// Handle to a live preview/recording loop.
pub struct LivePipeline {
    shared: Shared,
    fps: u32,
    cancel: Option<CancellationToken>,
    command_tx: Option<mpsc::Sender<LiveCommand>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl LivePipeline {
    pub fn new(compositor: Compositor, layout: Layout, fps: u32) -> Self {
        Self {
            shared: Shared {
                compositor: Arc::new(compositor),
                request: Arc::new(Mutex::new(FrameRequest::default())),
                layout: Arc::new(Mutex::new(layout)),
                status: Arc::new(Mutex::new(LiveStatus::default())),
            },
            fps: fps.clamp(1, 120),
            cancel: None,
            command_tx: None,
            task: None,
        }
    }

    pub fn status(&self) -> LiveStatus {
        self.shared.status.lock().clone()
    }

    pub fn state(&self) -> LiveState {
        self.shared.status.lock().state
    }

    /// Replace the crop/effect/mirror request; picked up on the next tick.
    pub fn set_request(&self, request: FrameRequest) {
        *self.shared.request.lock() = request;
    }

    pub fn request(&self) -> FrameRequest {
        *self.shared.request.lock()
    }

    /// Replace the layout after a resize or fullscreen toggle.
    pub fn set_layout(&self, layout: Layout) {
        *self.shared.layout.lock() = layout;
    }

    pub fn layout(&self) -> Layout {
        *self.shared.layout.lock()
    }

    /// Start the loop. A running loop is stopped first.
    pub async fn start_preview(
        &mut self,
        source: Box<dyn FrameSource>,
        preview: Box<dyn FrameSink>,
    ) -> CamFrameResult<()> {
        if self.task.is_some() {
            log::debug!("[LIVE] Restarting preview loop");
            self.stop().await;
        }

        if let Some(dims) = source.dimensions() {
            self.shared.layout.lock().frame = Some(dims);
        }

        let (tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        {
            let mut status = self.shared.status.lock();
            *status = LiveStatus {
                state: LiveState::Previewing,
                ..LiveStatus::default()
            };
        }

        let shared = self.shared.clone();
        let fps = self.fps;
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            live_loop(source, preview, rx, token, shared, fps).await;
        });

        log::info!("[LIVE] Preview started at {} fps", self.fps);
        self.cancel = Some(cancel);
        self.command_tx = Some(tx);
        self.task = Some(handle);
        Ok(())
    }

    /// Also send composited frames to `sink` until recording stops.
    pub async fn start_recording(&self, sink: Box<dyn FrameSink>) -> CamFrameResult<()> {
        let tx = self.command_tx.as_ref().context("preview is not running")?;
        tx.send(LiveCommand::StartRecording(sink))
            .await
            .map_err(|_| CamFrameError::Other("live loop has exited".to_string()))?;
        log::info!("[LIVE] Recording started");
        Ok(())
    }

    /// Stop recording; the preview keeps running. Returns the recording
    /// sink so the caller can finalize it.
    pub async fn stop_recording(&self) -> CamFrameResult<Option<Box<dyn FrameSink>>> {
        let tx = self.command_tx.as_ref().context("preview is not running")?;
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(LiveCommand::StopRecording(reply_tx))
            .await
            .map_err(|_| CamFrameError::Other("live loop has exited".to_string()))?;
        let sink = reply_rx
            .await
            .map_err(|_| CamFrameError::Other("live loop dropped the reply".to_string()))?;
        log::info!("[LIVE] Recording stopped");
        Ok(sink)
    }

    /// Cancel the loop and wait for it to exit.
    pub async fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.command_tx = None;
        if let Some(handle) = self.task.take() {
            if let Err(e) = handle.await {
                log::error!("[LIVE] Live loop task failed: {}", e);
            }
        }
        let mut status = self.shared.status.lock();
        if status.state != LiveState::Idle {
            status.state = LiveState::Stopped;
        }
        log::info!(
            "[LIVE] Stopped after {} frames ({} skipped)",
            status.frames_rendered,
            status.frames_skipped
        );
    }
}

impl Drop for LivePipeline {
    fn drop(&mut self) {
        // The task can't be awaited here; cancelling makes it exit on its next poll
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}

/// Current frame of `source`, or `None` while it is still starting.
fn next_frame(source: &mut dyn FrameSource) -> CamFrameResult<Option<Frame>> {
    match source.current_frame() {
        Ok(frame) => Ok(Some(frame)),
        Err(CamFrameError::SourceUnavailable(reason)) => {
            log::debug!("[LIVE] Skipping tick: {}", reason);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Compose one frame from `source` with the given layout and request.
///
/// Returns `Ok(None)` when the source has no frame yet.
pub fn render_tick(
    source: &mut dyn FrameSource,
    compositor: &Compositor,
    layout: &Layout,
    request: &FrameRequest,
) -> CamFrameResult<Option<Frame>> {
    match next_frame(source)? {
        Some(frame) => compositor.compose_frame(&frame, layout, request).map(Some),
        None => Ok(None),
    }
}

/// Store the size of the frame just pulled in the shared layout and return
/// a snapshot of it.
fn sync_layout(layout: &Mutex<Layout>, dims: FrameDimensions) -> Layout {
    let mut layout = layout.lock();
    if layout.frame != Some(dims) {
        log::info!("[LIVE] Source frame size is now {}x{}", dims.width, dims.height);
        layout.frame = Some(dims);
    }
    *layout
}

async fn live_loop(
    mut source: Box<dyn FrameSource>,
    mut preview: Box<dyn FrameSink>,
    mut rx: mpsc::Receiver<LiveCommand>,
    cancel: CancellationToken,
    shared: Shared,
    fps: u32,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / fps as f64));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut recorder: Option<Box<dyn FrameSink>> = None;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            cmd = rx.recv() => match cmd {
                Some(LiveCommand::StartRecording(sink)) => {
                    recorder = Some(sink);
                    let mut status = shared.status.lock();
                    status.state = LiveState::Recording;
                    status.last_error = None;
                }
                Some(LiveCommand::StopRecording(reply)) => {
                    if reply.send(recorder.take()).is_err() {
                        log::debug!("[LIVE] Stop requester went away, dropping recording sink");
                    }
                    shared.status.lock().state = LiveState::Previewing;
                }
                None => break,
            },

            _ = ticker.tick() => {
                let frame = match next_frame(source.as_mut()) {
                    Ok(Some(frame)) => frame,
                    Ok(None) => {
                        shared.status.lock().frames_skipped += 1;
                        continue;
                    }
                    Err(e) => {
                        log::warn!("[LIVE] Frame dropped: {}", e);
                        shared.status.lock().frames_skipped += 1;
                        continue;
                    }
                };

                // Snapshots so no lock is held while compositing
                let layout = sync_layout(&shared.layout, frame.dimensions());
                let request = *shared.request.lock();

                let composed = tokio::select! {
                    biased;

                    _ = cancel.cancelled() => break,

                    result = Arc::clone(&shared.compositor).compose_blocking(frame, layout, request) => result,
                };
                let frame = match composed {
                    Ok(frame) => frame,
                    Err(e) => {
                        log::warn!("[LIVE] Frame dropped: {}", e);
                        shared.status.lock().frames_skipped += 1;
                        continue;
                    }
                };

                if let Err(e) = preview.present(&frame) {
                    log::warn!("[LIVE] Preview present failed: {}", e);
                }

                if let Some(sink) = recorder.as_mut() {
                    if let Err(e) = sink.present(&frame) {
                        log::error!("[LIVE] Recording sink failed, stopping recording: {}", e);
                        recorder = None;
                        let mut status = shared.status.lock();
                        status.state = LiveState::Previewing;
                        status.last_error = Some(e.to_string());
                    }
                }

                shared.status.lock().frames_rendered += 1;
            }
        }
    }

    log::debug!("[LIVE] Live loop exited");
}
