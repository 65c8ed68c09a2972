//! Tests for the exporter module.

#![cfg(test)]

use std::time::Duration;

use super::*;
use crate::config::export::ExportConfig;
use crate::rendering::live::{render_tick, FrameSource};
use crate::rendering::region::NormalizedRegion;
use crate::rendering::types::{EffectKind, EffectSpec};

/// Clip whose frame content encodes the timestamp it was sought to.
struct FakeClip {
    duration: f64,
    dims: FrameDimensions,
    seeks: Vec<f64>,
    /// Seeks to this timestamp fail while `fail_count` is non-zero.
    fail_at: Option<f64>,
    fail_count: u32,
    /// Seeks at or after this timestamp hang for `stall`.
    stall_from: Option<f64>,
    stall: Duration,
}

impl FakeClip {
    fn new(duration: f64, width: u32, height: u32) -> Self {
        Self {
            duration,
            dims: FrameDimensions::new(width, height).unwrap(),
            seeks: Vec::new(),
            fail_at: None,
            fail_count: 0,
            stall_from: None,
            stall: Duration::ZERO,
        }
    }

    fn failing_at(mut self, timestamp: f64, times: u32) -> Self {
        self.fail_at = Some(timestamp);
        self.fail_count = times;
        self
    }

    fn stalling_from(mut self, timestamp: f64, stall: Duration) -> Self {
        self.stall_from = Some(timestamp);
        self.stall = stall;
        self
    }

    fn frame_at(&self, timestamp: f64) -> Frame {
        // Left half dark, right half bright, so mirroring is visible
        let mut frame = Frame::solid(self.dims.width, self.dims.height, [200, 200, 200, 255]);
        let shade = ((timestamp * 10.0) as u8).min(100);
        for y in 0..self.dims.height {
            for x in 0..self.dims.width / 2 {
                let idx = ((y * self.dims.width + x) * 4) as usize;
                frame.data[idx..idx + 3].copy_from_slice(&[shade, 0, 0]);
            }
        }
        frame
    }
}

impl SeekableSource for FakeClip {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn dimensions(&self) -> FrameDimensions {
        self.dims
    }

    async fn seek(&mut self, timestamp_secs: f64) -> CamFrameResult<Frame> {
        self.seeks.push(timestamp_secs);

        if let Some(at) = self.fail_at {
            if (timestamp_secs - at).abs() < 1e-6 && self.fail_count > 0 {
                self.fail_count -= 1;
                return Err(CamFrameError::SourceUnavailable("decoder busy".to_string()));
            }
        }
        if let Some(from) = self.stall_from {
            if timestamp_secs >= from - 1e-6 {
                tokio::time::sleep(self.stall).await;
            }
        }
        Ok(self.frame_at(timestamp_secs))
    }
}

/// Same frames, served as a live source for comparing paths.
impl FrameSource for FakeClip {
    fn dimensions(&self) -> Option<FrameDimensions> {
        Some(self.dims)
    }

    fn current_frame(&mut self) -> CamFrameResult<Frame> {
        Ok(self.frame_at(0.0))
    }
}

#[derive(Default)]
struct FakeEncoder {
    frames: Vec<(f64, Frame)>,
    fail_on: Option<usize>,
    fail_finish: bool,
    finished: bool,
    aborted: bool,
}

impl FrameEncoder for FakeEncoder {
    fn encode_frame(&mut self, frame: &Frame, timestamp_secs: f64) -> CamFrameResult<()> {
        if self.fail_on == Some(self.frames.len()) {
            return Err(CamFrameError::Other("muxer rejected frame".to_string()));
        }
        self.frames.push((timestamp_secs, frame.clone()));
        Ok(())
    }

    fn finish(&mut self) -> CamFrameResult<()> {
        if self.fail_finish {
            return Err(CamFrameError::EncodeFailed("flush failed".to_string()));
        }
        self.finished = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.aborted = true;
        self.frames.clear();
    }
}

fn blur_request() -> FrameRequest {
    FrameRequest {
        effect: EffectSpec::new(EffectKind::Blur, 3),
        ..FrameRequest::default()
    }
}

fn default_settings(trim: TrimRange) -> ExportSettings {
    ExportSettings::new(trim, &ExportConfig::default())
}

/// Run an export and collect every progress update.
async fn run_export(
    clip: &mut FakeClip,
    encoder: &mut FakeEncoder,
    canvas: &mut ExportCanvas,
    request: &FrameRequest,
    settings: &ExportSettings,
) -> (CamFrameResult<ExportOutcome>, Vec<ExportProgress>) {
    let compositor = Arc::new(Compositor::default());
    let layout = Layout::for_frame(clip.dims);
    let mut updates = Vec::new();
    let result = export_clip(
        clip,
        encoder,
        canvas,
        &compositor,
        &layout,
        request,
        settings,
        |p: &ExportProgress| updates.push(p.clone()),
    )
    .await;
    (result, updates)
}

// ============================================================================
// Stepping
// ============================================================================

#[tokio::test]
async fn test_three_seconds_at_30fps_is_90_steps() {
    let mut clip = FakeClip::new(3.0, 32, 18);
    let mut encoder = FakeEncoder::default();
    let mut canvas = ExportCanvas::new();
    let settings = default_settings(TrimRange::full(3.0));

    let (result, updates) =
        run_export(&mut clip, &mut encoder, &mut canvas, &blur_request(), &settings).await;

    assert!(matches!(result.unwrap(), ExportOutcome::Processed { frames: 90 }));
    assert_eq!(clip.seeks.len(), 90);
    assert_eq!(encoder.frames.len(), 90);
    assert!(encoder.finished);
    assert!(!encoder.aborted);

    // Strictly increasing timestamps, one frame interval apart
    for pair in encoder.frames.windows(2) {
        let step = pair[1].0 - pair[0].0;
        assert!((step - 1.0 / 30.0).abs() < 1e-9);
    }
    assert!(clip.seeks.windows(2).all(|w| w[1] > w[0]));
    assert_eq!(encoder.frames[0].1.frame_number, 0);
    assert_eq!(encoder.frames[89].1.frame_number, 89);
    assert_eq!(encoder.frames[30].1.timestamp_ms, 1000);

    let encoding: Vec<_> = updates
        .iter()
        .filter(|p| p.stage == ExportStage::Encoding)
        .collect();
    assert_eq!(encoding.len(), 90);
    assert!(encoding.windows(2).all(|w| w[1].progress > w[0].progress));
    assert_eq!(encoding[89].frames_done, 90);
    assert_eq!(encoding[89].progress, 1.0);

    assert_eq!(updates.first().unwrap().stage, ExportStage::Preparing);
    let last = updates.last().unwrap();
    assert_eq!(last.stage, ExportStage::Complete);
    assert_eq!(last.frames_done, 90);
    assert!(updates.iter().any(|p| p.stage == ExportStage::Finalizing));
}

#[tokio::test]
async fn test_trim_offsets_seeks_and_rebases_timestamps() {
    let mut clip = FakeClip::new(5.0, 16, 16);
    let mut encoder = FakeEncoder::default();
    let mut canvas = ExportCanvas::new();
    let mut settings = default_settings(TrimRange::new(1.0, 2.0).unwrap());
    settings.fps = 10;

    let (result, _) = run_export(
        &mut clip,
        &mut encoder,
        &mut canvas,
        &FrameRequest::default(),
        &settings,
    )
    .await;

    assert!(matches!(result.unwrap(), ExportOutcome::Processed { frames: 10 }));
    assert!((clip.seeks[0] - 1.0).abs() < 1e-9);
    assert!((clip.seeks[9] - 1.9).abs() < 1e-9);
    assert_eq!(encoder.frames[0].0, 0.0);
    assert!((encoder.frames[9].0 - 0.9).abs() < 1e-9);
}

#[tokio::test]
async fn test_trim_past_end_is_clamped_to_clip() {
    let mut clip = FakeClip::new(2.0, 16, 16);
    let mut encoder = FakeEncoder::default();
    let mut canvas = ExportCanvas::new();
    let mut settings = default_settings(TrimRange::new(1.5, 9.0).unwrap());
    settings.fps = 10;

    let (result, _) =
        run_export(&mut clip, &mut encoder, &mut canvas, &blur_request(), &settings).await;

    assert!(matches!(result.unwrap(), ExportOutcome::Processed { frames: 5 }));
    assert!(clip.seeks.iter().all(|&t| t < 2.0));
}

// ============================================================================
// Shortcuts
// ============================================================================

#[tokio::test]
async fn test_untouched_full_clip_delivers_original() {
    let mut clip = FakeClip::new(3.0, 16, 16);
    let mut encoder = FakeEncoder::default();
    let mut canvas = ExportCanvas::new();
    // Within tolerance of both ends
    let settings = default_settings(TrimRange::new(0.05, 2.95).unwrap());

    let (result, updates) = run_export(
        &mut clip,
        &mut encoder,
        &mut canvas,
        &FrameRequest::default(),
        &settings,
    )
    .await;

    assert!(matches!(
        result.unwrap(),
        ExportOutcome::Original { reason: None }
    ));
    assert!(clip.seeks.is_empty());
    assert!(encoder.frames.is_empty());
    assert!(!encoder.finished);
    assert_eq!(updates.last().unwrap().stage, ExportStage::Complete);
}

#[tokio::test]
async fn test_edits_on_full_clip_still_process() {
    let mut clip = FakeClip::new(1.0, 16, 16);
    let mut encoder = FakeEncoder::default();
    let mut canvas = ExportCanvas::new();
    let settings = default_settings(TrimRange::full(1.0));
    let request = FrameRequest {
        mirrored: true,
        ..FrameRequest::default()
    };

    let (result, _) =
        run_export(&mut clip, &mut encoder, &mut canvas, &request, &settings).await;

    assert!(matches!(result.unwrap(), ExportOutcome::Processed { frames: 30 }));
    // Dark half moved to the right
    let first = &encoder.frames[0].1;
    assert_eq!(first.pixel(15, 0), Some([0, 0, 0, 255]));
    assert_eq!(first.pixel(0, 0), Some([200, 200, 200, 255]));
}

#[tokio::test]
async fn test_trim_shorter_than_one_frame_delivers_original() {
    let mut clip = FakeClip::new(3.0, 16, 16);
    let mut encoder = FakeEncoder::default();
    let mut canvas = ExportCanvas::new();
    let settings = default_settings(TrimRange::new(1.0, 1.01).unwrap());

    let (result, _) =
        run_export(&mut clip, &mut encoder, &mut canvas, &blur_request(), &settings).await;

    match result.unwrap() {
        ExportOutcome::Original {
            reason: Some(CamFrameError::SourceUnavailable(_)),
        } => {}
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(clip.seeks.is_empty());
}

// ============================================================================
// Failure handling
// ============================================================================

#[tokio::test]
async fn test_seek_is_retried_once() {
    let mut clip = FakeClip::new(1.0, 16, 16).failing_at(0.5, 1);
    let mut encoder = FakeEncoder::default();
    let mut canvas = ExportCanvas::new();
    let settings = default_settings(TrimRange::full(1.0));

    let (result, _) =
        run_export(&mut clip, &mut encoder, &mut canvas, &blur_request(), &settings).await;

    assert!(matches!(result.unwrap(), ExportOutcome::Processed { frames: 30 }));
    assert_eq!(clip.seeks.len(), 31);
    assert_eq!(encoder.frames.len(), 30);
}

#[tokio::test]
async fn test_repeated_seek_failure_falls_back_to_original() {
    let mut clip = FakeClip::new(1.0, 16, 16).failing_at(0.5, 2);
    let mut encoder = FakeEncoder::default();
    let mut canvas = ExportCanvas::new();
    let settings = default_settings(TrimRange::full(1.0));

    let (result, updates) =
        run_export(&mut clip, &mut encoder, &mut canvas, &blur_request(), &settings).await;

    match result.unwrap() {
        ExportOutcome::Original {
            reason: Some(CamFrameError::SeekFailed { timestamp_secs, .. }),
        } => assert!((timestamp_secs - 0.5).abs() < 1e-9),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(encoder.aborted);
    assert!(!encoder.finished);
    assert!(encoder.frames.is_empty());
    assert!(canvas.is_clear());

    let last = updates.last().unwrap();
    assert_eq!(last.stage, ExportStage::Complete);
    assert!(last.message.starts_with("Exported original"));
}

#[tokio::test(start_paused = true)]
async fn test_stalled_seek_trips_watchdog() {
    let mut clip = FakeClip::new(3.0, 16, 16).stalling_from(1.0, Duration::from_secs(60));
    let mut encoder = FakeEncoder::default();
    let mut canvas = ExportCanvas::new();
    let settings = default_settings(TrimRange::full(3.0));
    assert_eq!(settings.watchdog_secs(), 13.0);

    let started = tokio::time::Instant::now();
    let (result, _) =
        run_export(&mut clip, &mut encoder, &mut canvas, &blur_request(), &settings).await;

    match result.unwrap() {
        ExportOutcome::Original {
            reason: Some(CamFrameError::Timeout { secs }),
        } => assert_eq!(secs, 13.0),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(started.elapsed() >= Duration::from_secs(13));
    assert!(started.elapsed() < Duration::from_secs(60));
    assert!(encoder.aborted);
    assert!(canvas.is_clear());
}

#[tokio::test]
async fn test_encoder_failure_is_returned() {
    let mut clip = FakeClip::new(1.0, 16, 16);
    let mut encoder = FakeEncoder {
        fail_on: Some(4),
        ..FakeEncoder::default()
    };
    let mut canvas = ExportCanvas::new();
    let settings = default_settings(TrimRange::full(1.0));

    let (result, updates) =
        run_export(&mut clip, &mut encoder, &mut canvas, &blur_request(), &settings).await;

    match result {
        Err(CamFrameError::EncodeFailed(reason)) => assert!(reason.contains("muxer")),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(encoder.aborted);
    assert!(canvas.is_clear());
    assert_eq!(updates.last().unwrap().stage, ExportStage::Failed);
}

#[tokio::test]
async fn test_finish_failure_is_returned() {
    let mut clip = FakeClip::new(0.5, 16, 16);
    let mut encoder = FakeEncoder {
        fail_finish: true,
        ..FakeEncoder::default()
    };
    let mut canvas = ExportCanvas::new();
    let settings = default_settings(TrimRange::full(0.5));

    let (result, _) =
        run_export(&mut clip, &mut encoder, &mut canvas, &blur_request(), &settings).await;

    assert!(matches!(result, Err(CamFrameError::EncodeFailed(_))));
    assert!(encoder.aborted);
}

// ============================================================================
// Output geometry
// ============================================================================

#[tokio::test]
async fn test_format_preset_sets_rate_and_canvas() {
    let mut clip = FakeClip::new(1.0, 64, 36);
    let mut encoder = FakeEncoder::default();
    let mut canvas = ExportCanvas::new();
    let settings = ExportSettings::for_format(
        TrimRange::full(1.0),
        ExportFormat::Avi,
        &ExportConfig::default(),
    );
    assert_eq!(settings.fps, 30);

    let (result, _) = run_export(
        &mut clip,
        &mut encoder,
        &mut canvas,
        &FrameRequest::default(),
        &settings,
    )
    .await;

    // A resize alone is enough to process a full clip
    assert!(matches!(result.unwrap(), ExportOutcome::Processed { frames: 30 }));
    let (_, frame) = &encoder.frames[0];
    assert_eq!((frame.width, frame.height), (640, 480));
    assert_eq!(canvas.target(), Some((640, 480)));
}

#[tokio::test]
async fn test_crop_and_effect_match_live_path() {
    let mut clip = FakeClip::new(0.2, 80, 40);
    let mut encoder = FakeEncoder::default();
    let mut canvas = ExportCanvas::new();
    let mut settings = default_settings(TrimRange::full(0.2));
    settings.fps = 10;

    let request = FrameRequest {
        crop: Some(NormalizedRegion::new(0.25, 0.25, 0.5, 0.5)),
        effect_region: Some(NormalizedRegion::new(0.5, 0.25, 0.25, 0.5)),
        effect: EffectSpec::new(EffectKind::Pixelate, 2),
        mirrored: false,
    };

    let (result, _) =
        run_export(&mut clip, &mut encoder, &mut canvas, &request, &settings).await;
    assert!(matches!(result.unwrap(), ExportOutcome::Processed { frames: 2 }));

    let (_, exported) = &encoder.frames[0];
    assert_eq!((exported.width, exported.height), (40, 20));

    // The live path renders the same pixels for the same frame and layout
    let compositor = Compositor::default();
    let layout = Layout::for_frame(clip.dims);
    let live = render_tick(&mut clip, &compositor, &layout, &request)
        .unwrap()
        .unwrap();
    assert_eq!(live.data, exported.data);
}

// ============================================================================
// Value types
// ============================================================================

#[test]
fn test_trim_range() {
    assert!(TrimRange::new(2.0, 1.0).is_err());
    assert!(TrimRange::new(-1.0, 1.0).is_err());
    assert!(TrimRange::new(0.0, f64::NAN).is_err());

    let trim = TrimRange::new(0.05, 2.95).unwrap();
    assert!(trim.covers(3.0, 0.1));
    assert!(!trim.covers(3.5, 0.1));

    let clamped = TrimRange::new(4.0, 6.0).unwrap().clamp_to(3.0);
    assert_eq!(clamped.duration(), 0.0);
}

#[test]
fn test_progress_estimate() {
    let progress = ExportProgress::step(10, 40, Duration::from_millis(500));
    assert_eq!(progress.progress, 0.25);
    assert_eq!(progress.estimated_remaining_ms, Some(1500));
    assert_eq!(progress.stage, ExportStage::Encoding);

    assert_eq!(ExportProgress::step(0, 40, Duration::ZERO).estimated_remaining_ms, None);
}

#[test]
fn test_outcome_serializes_with_kind_tag() {
    let json = serde_json::to_value(ExportOutcome::Processed { frames: 3 }).unwrap();
    assert_eq!(json["kind"], "processed");
    assert_eq!(json["frames"], 3);

    let json = serde_json::to_value(ExportOutcome::Original {
        reason: Some(CamFrameError::Timeout { secs: 13.0 }),
    })
    .unwrap();
    assert_eq!(json["kind"], "original");
    assert_eq!(json["reason"], "Timed out after 13.0s");
}
