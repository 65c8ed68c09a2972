//! Stepped (offline) export.
//!
//! Like the live loop, export runs every frame through the shared
//! compositor, but it drives the source explicitly:
//! 1. Seek to `trim.start + i / fps` and wait for the frame
//! 2. Mirror, crop and apply the effect with the preview's `Layout`
//! 3. Draw onto the export canvas and hand the frame to the encoder
//!
//! A watchdog bounds the whole run at `duration + grace` seconds. Seek
//! failures, stalls and compositing failures abort and deliver the original
//! source instead; only encoder failures reach the caller as errors.

pub mod formats;
pub mod frame_ops;
pub mod pipeline;

#[cfg(test)]
mod tests;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::compositor::Compositor;
use super::region::Layout;
use super::types::{Frame, FrameDimensions, FrameRequest};
use crate::config::export::ExportConfig;
use crate::error::{CamFrameError, CamFrameResult};

pub use formats::{ExportFormat, FormatProfile};
pub use pipeline::{total_frames, ExportCanvas, StepContext};

/// A recorded or uploaded clip that can be sought frame by frame.
pub trait SeekableSource: Send {
    /// Clip length in seconds.
    fn duration(&self) -> f64;

    fn dimensions(&self) -> FrameDimensions;

    /// Seek to `timestamp_secs` and resolve once that frame is ready.
    fn seek(&mut self, timestamp_secs: f64) -> impl Future<Output = CamFrameResult<Frame>> + Send;
}

/// External encoder fed one frame at a time.
pub trait FrameEncoder: Send {
    /// `timestamp_secs` is relative to the trim start.
    fn encode_frame(&mut self, frame: &Frame, timestamp_secs: f64) -> CamFrameResult<()>;

    fn finish(&mut self) -> CamFrameResult<()>;

    /// Throw away everything encoded so far.
    fn abort(&mut self);
}

/// Part of a clip to export, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct TrimRange {
    pub start: f64,
    pub end: f64,
}

impl TrimRange {
    pub fn new(start: f64, end: f64) -> CamFrameResult<Self> {
        if !start.is_finite() || !end.is_finite() || start < 0.0 || end <= start {
            return Err(CamFrameError::InvalidDimensions(format!(
                "trim {:.3}s..{:.3}s",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// The whole clip.
    pub fn full(duration_secs: f64) -> Self {
        Self {
            start: 0.0,
            end: duration_secs.max(0.0),
        }
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Keep the range inside `[0, clip_duration]`.
    pub fn clamp_to(&self, clip_duration: f64) -> Self {
        let end = self.end.clamp(0.0, clip_duration.max(0.0));
        Self {
            start: self.start.clamp(0.0, end),
            end,
        }
    }

    /// Whether both ends are within `tolerance` of the clip's ends.
    pub fn covers(&self, clip_duration: f64, tolerance: f64) -> bool {
        self.start <= tolerance && (clip_duration - self.end).abs() <= tolerance
    }
}

/// Parameters of one export run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSettings {
    pub trim: TrimRange,
    pub fps: u32,
    /// Canvas size frames are cover-fitted to; `None` keeps the composed size.
    pub output_size: Option<(u32, u32)>,
    pub watchdog_grace_secs: f64,
    pub seek_retries: u32,
    pub full_clip_tolerance_secs: f64,
}

impl ExportSettings {
    /// Settings at the configured stepping rate, keeping the composed size.
    pub fn new(trim: TrimRange, config: &ExportConfig) -> Self {
        Self {
            trim,
            fps: config.fps.max(1),
            output_size: None,
            watchdog_grace_secs: config.watchdog_grace_secs,
            seek_retries: config.seek_retries,
            full_clip_tolerance_secs: config.full_clip_tolerance_secs,
        }
    }

    /// Settings for a container preset: its rate and canvas size.
    pub fn for_format(trim: TrimRange, format: ExportFormat, config: &ExportConfig) -> Self {
        let profile = format.profile();
        Self {
            fps: profile.fps,
            output_size: Some((profile.width, profile.height)),
            ..Self::new(trim, config)
        }
    }

    /// Watchdog bound for the run.
    pub fn watchdog_secs(&self) -> f64 {
        self.trim.duration() + self.watchdog_grace_secs
    }
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum ExportStage {
    /// Validating the trim and setting up the canvas.
    Preparing,
    /// Stepping through frames.
    Encoding,
    /// Flushing the encoder.
    Finalizing,
    /// Export complete (processed or original).
    Complete,
    /// Export failed.
    Failed,
}

/// Progress update for the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ExportProgress {
    pub frames_done: u32,
    pub total_frames: u32,
    /// Current progress (0.0 - 1.0).
    pub progress: f32,
    pub stage: ExportStage,
    /// Human-readable status message.
    pub message: String,
    /// Estimated time left, from the average time per frame so far.
    #[ts(type = "number | null")]
    pub estimated_remaining_ms: Option<u64>,
}

impl ExportProgress {
    pub fn new(progress: f32, stage: ExportStage, message: impl Into<String>) -> Self {
        Self {
            frames_done: 0,
            total_frames: 0,
            progress: progress.clamp(0.0, 1.0),
            stage,
            message: message.into(),
            estimated_remaining_ms: None,
        }
    }

    /// Progress after `done` of `total` frames, `elapsed` after the first.
    pub fn step(done: u32, total: u32, elapsed: Duration) -> Self {
        let progress = if total == 0 {
            1.0
        } else {
            done as f32 / total as f32
        };
        let estimated_remaining_ms = (done > 0).then(|| {
            let per_frame_ms = elapsed.as_secs_f64() * 1000.0 / done as f64;
            (per_frame_ms * total.saturating_sub(done) as f64).round() as u64
        });
        Self {
            frames_done: done,
            total_frames: total,
            progress,
            stage: ExportStage::Encoding,
            message: format!("Encoding frame {}/{}", done, total),
            estimated_remaining_ms,
        }
    }
}

/// What the export delivered.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ExportOutcome {
    /// The encoder received this many processed frames and was finished.
    Processed { frames: u32 },
    /// Processing was skipped or abandoned; deliver the source unmodified.
    /// `reason` is `None` when there was nothing to process.
    Original { reason: Option<CamFrameError> },
}

impl ExportOutcome {
    pub fn is_original(&self) -> bool {
        matches!(self, ExportOutcome::Original { .. })
    }
}

/// Export `source` through the shared composition.
///
/// `layout` must be the layout the selections were drawn in, so the export
/// crops and blurs exactly what the preview showed. `canvas` is reused
/// across exports and left cleared if the run is abandoned.
#[allow(clippy::too_many_arguments)]
pub async fn export_clip<S, E, P>(
    source: &mut S,
    encoder: &mut E,
    canvas: &mut ExportCanvas,
    compositor: &Arc<Compositor>,
    layout: &Layout,
    request: &FrameRequest,
    settings: &ExportSettings,
    mut on_progress: P,
) -> CamFrameResult<ExportOutcome>
where
    S: SeekableSource,
    E: FrameEncoder,
    P: FnMut(&ExportProgress) + Send,
{
    on_progress(&ExportProgress::new(0.0, ExportStage::Preparing, "Preparing export..."));

    let clip_duration = source.duration();
    let mut settings = settings.clone();
    settings.trim = settings.trim.clamp_to(clip_duration);

    if request.is_passthrough()
        && settings.output_size.is_none()
        && settings.trim.covers(clip_duration, settings.full_clip_tolerance_secs)
    {
        log::info!("[EXPORT] Untrimmed clip with no edits, delivering original");
        on_progress(&ExportProgress::new(1.0, ExportStage::Complete, "Nothing to process"));
        return Ok(ExportOutcome::Original { reason: None });
    }

    let total = total_frames(settings.trim.duration(), settings.fps);
    if total == 0 {
        log::warn!(
            "[EXPORT] Trim {:.3}s..{:.3}s is shorter than one frame",
            settings.trim.start,
            settings.trim.end
        );
        on_progress(&ExportProgress::new(1.0, ExportStage::Complete, "Trim too short, using original"));
        return Ok(ExportOutcome::Original {
            reason: Some(CamFrameError::SourceUnavailable(
                "trim is shorter than one frame".to_string(),
            )),
        });
    }

    canvas.clear();
    canvas.set_target(settings.output_size);

    let watchdog_secs = settings.watchdog_secs();
    log::info!(
        "[EXPORT] Exporting {} frames at {} fps ({:.2}s, watchdog {:.1}s)",
        total,
        settings.fps,
        settings.trim.duration(),
        watchdog_secs
    );

    let ctx = StepContext {
        compositor,
        layout,
        request,
        settings: &settings,
    };
    // Out-of-range bounds (NaN, overflow) mean no practical limit
    let watchdog = Duration::try_from_secs_f64(watchdog_secs).unwrap_or(Duration::MAX);
    let result = tokio::time::timeout(
        watchdog,
        pipeline::run_steps(source, encoder, canvas, ctx, &mut on_progress),
    )
    .await
    .unwrap_or(Err(CamFrameError::Timeout {
        secs: watchdog_secs,
    }));

    let frames = match result {
        Ok(frames) => frames,
        Err(e @ CamFrameError::EncodeFailed(_)) => {
            log::error!("[EXPORT] Encoder failed: {}", e);
            encoder.abort();
            canvas.clear();
            on_progress(&ExportProgress::new(0.0, ExportStage::Failed, e.to_string()));
            return Err(e);
        }
        Err(e) => {
            log::warn!("[EXPORT] Processing abandoned, delivering original: {}", e);
            encoder.abort();
            canvas.clear();
            on_progress(&ExportProgress::new(
                1.0,
                ExportStage::Complete,
                format!("Exported original ({})", e),
            ));
            return Ok(ExportOutcome::Original { reason: Some(e) });
        }
    };

    on_progress(&ExportProgress::new(1.0, ExportStage::Finalizing, "Finalizing..."));
    if let Err(e) = encoder.finish() {
        let e = match e {
            CamFrameError::EncodeFailed(_) => e,
            other => CamFrameError::EncodeFailed(other.to_string()),
        };
        log::error!("[EXPORT] Encoder failed to finish: {}", e);
        encoder.abort();
        canvas.clear();
        on_progress(&ExportProgress::new(0.0, ExportStage::Failed, e.to_string()));
        return Err(e);
    }

    log::info!("[EXPORT] Export complete: {} frames", frames);
    on_progress(&ExportProgress {
        frames_done: frames,
        total_frames: frames,
        ..ExportProgress::new(1.0, ExportStage::Complete, "Export complete")
    });
    Ok(ExportOutcome::Processed { frames })
}
