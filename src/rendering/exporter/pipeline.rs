//! Stepped frame loop for export.
//!
//! Seeks the source to each output timestamp in order, runs the shared
//! mirror → crop → effect composition on the blocking pool, draws the result
//! on the export canvas and hands it to the encoder.

use std::sync::Arc;
use std::time::Instant;

use super::frame_ops::scale_frame_to_fill;
use super::{ExportProgress, ExportSettings, FrameEncoder, SeekableSource};
use crate::error::{CamFrameError, CamFrameResult};
use crate::rendering::compositor::Compositor;
use crate::rendering::region::Layout;
use crate::rendering::types::{Frame, FrameRequest};

/// Reusable surface frames are drawn on before encoding.
///
/// Only the export loop writes to it. After an abort it is cleared so the
/// next export never starts from a half-drawn frame.
#[derive(Debug, Default)]
pub struct ExportCanvas {
    target: Option<(u32, u32)>,
    frame: Option<Frame>,
}

impl ExportCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the canvas size; frames are cover-fitted to it. `None` keeps the
    /// composed frame's own size.
    pub fn set_target(&mut self, target: Option<(u32, u32)>) {
        self.target = target;
    }

    pub fn target(&self) -> Option<(u32, u32)> {
        self.target
    }

    /// Draw a composed frame, replacing whatever was there.
    pub fn draw(&mut self, frame: Frame) -> &Frame {
        let drawn = match self.target {
            Some((w, h)) if (frame.width, frame.height) != (w, h) => scale_frame_to_fill(&frame, w, h),
            _ => frame,
        };
        self.frame.insert(drawn)
    }

    pub fn clear(&mut self) {
        self.frame = None;
    }

    pub fn is_clear(&self) -> bool {
        self.frame.is_none()
    }

    pub fn current(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }
}

/// Number of frames for a trim of `duration_secs` at `fps`.
pub fn total_frames(duration_secs: f64, fps: u32) -> u32 {
    if !duration_secs.is_finite() || duration_secs <= 0.0 || fps == 0 {
        return 0;
    }
    // Small epsilon so 3.0s * 30fps is 90, not 89
    (duration_secs * fps as f64 + 1e-9).floor() as u32
}

/// Seek with retries; the final failure is reported as `SeekFailed`.
pub async fn seek_with_retry<S: SeekableSource>(
    source: &mut S,
    timestamp_secs: f64,
    retries: u32,
) -> CamFrameResult<Frame> {
    let mut attempt = 0;
    loop {
        match source.seek(timestamp_secs).await {
            Ok(frame) => return Ok(frame),
            Err(e) if attempt < retries => {
                attempt += 1;
                log::warn!(
                    "[EXPORT] Seek to {:.3}s failed ({}), retry {}/{}",
                    timestamp_secs,
                    e,
                    attempt,
                    retries
                );
            }
            Err(CamFrameError::SeekFailed { timestamp_secs, reason }) => {
                return Err(CamFrameError::SeekFailed {
                    timestamp_secs,
                    reason,
                })
            }
            Err(e) => {
                return Err(CamFrameError::SeekFailed {
                    timestamp_secs,
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// Everything the step loop borrows for one export.
pub struct StepContext<'a> {
    pub compositor: &'a Arc<Compositor>,
    pub layout: &'a Layout,
    pub request: &'a FrameRequest,
    pub settings: &'a ExportSettings,
}

/// Run every step in order. Returns the number of frames encoded.
///
/// Progress is reported after each encoded frame.
pub async fn run_steps<S, E, P>(
    source: &mut S,
    encoder: &mut E,
    canvas: &mut ExportCanvas,
    ctx: StepContext<'_>,
    on_progress: &mut P,
) -> CamFrameResult<u32>
where
    S: SeekableSource,
    E: FrameEncoder,
    P: FnMut(&ExportProgress) + Send,
{
    let settings = ctx.settings;
    let fps = settings.fps;
    let total = total_frames(settings.trim.duration(), fps);
    let started = Instant::now();

    for index in 0..total {
        let offset = index as f64 / fps as f64;
        let timestamp = settings.trim.start + offset;

        let mut frame = seek_with_retry(source, timestamp, settings.seek_retries).await?;
        frame.frame_number = index;
        frame.timestamp_ms = (offset * 1000.0).round() as u64;

        let composed = Arc::clone(ctx.compositor)
            .compose_blocking(frame, *ctx.layout, *ctx.request)
            .await?;
        let drawn = canvas.draw(composed);

        encoder.encode_frame(drawn, offset).map_err(|e| match e {
            CamFrameError::EncodeFailed(_) => e,
            other => CamFrameError::EncodeFailed(other.to_string()),
        })?;

        on_progress(&ExportProgress::step(index + 1, total, started.elapsed()));
    }

    Ok(total)
}
