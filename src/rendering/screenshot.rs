//! Still capture from the live source.
//!
//! A screenshot goes through the same mirror → crop → effect composition as
//! the live stream and export, so the saved image is what the preview showed.
//! Only one capture runs at a time; the busy flag is released when the
//! capture finishes, fails or times out.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use serde::Serialize;

use super::compositor::Compositor;
use super::region::Layout;
use super::types::{Frame, FrameRequest};
use crate::config::export::{ExportConfig, ScreenshotFormat};
use crate::error::{CamFrameError, CamFrameResult, ResultExt};

/// An encoded still.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Screenshot {
    pub id: String,
    pub taken_at: DateTime<Utc>,
    pub format: ScreenshotFormat,
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl Screenshot {
    /// `data:` URL for showing the image without saving it.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            STANDARD.encode(&self.bytes)
        )
    }

    /// Suggested file name, e.g. `screenshot-20240101-120000.png`.
    pub fn file_name(&self) -> String {
        format!(
            "screenshot-{}.{}",
            self.taken_at.format("%Y%m%d-%H%M%S"),
            self.format.extension()
        )
    }
}

/// Encode a frame as PNG or JPEG.
pub fn encode_frame(frame: &Frame, format: ScreenshotFormat, jpeg_quality: u8) -> CamFrameResult<Vec<u8>> {
    let image = frame.to_image()?;
    let mut buffer = Cursor::new(Vec::new());
    match format {
        ScreenshotFormat::Png => {
            DynamicImage::ImageRgba8(image).write_to(&mut buffer, ImageFormat::Png)?;
        }
        ScreenshotFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgba8(image).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut buffer, jpeg_quality.clamp(1, 100));
            encoder.encode_image(&rgb)?;
        }
    }
    Ok(buffer.into_inner())
}

/// Clears the busy flag when a capture ends, however it ends.
struct CaptureGuard(Arc<AtomicBool>);

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Takes screenshots, one at a time.
pub struct ScreenshotCapturer {
    compositor: Arc<Compositor>,
    capturing: Arc<AtomicBool>,
    format: ScreenshotFormat,
    jpeg_quality: u8,
    timeout: Duration,
}

impl ScreenshotCapturer {
    pub fn new(compositor: Arc<Compositor>, config: &ExportConfig) -> Self {
        Self {
            compositor,
            capturing: Arc::new(AtomicBool::new(false)),
            format: config.screenshot_format,
            jpeg_quality: config.jpeg_quality,
            timeout: Duration::from_millis(config.screenshot_timeout_ms),
        }
    }

    /// Capturer using the global effect and export configs.
    pub fn from_global() -> Self {
        Self::new(
            Arc::new(Compositor::from_global()),
            &crate::config::export::get_export_config(),
        )
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::Acquire)
    }

    pub fn format(&self) -> ScreenshotFormat {
        self.format
    }

    /// Compose and encode `frame`.
    ///
    /// Fails with `CaptureInProgress` if another capture is running and with
    /// `Timeout` if composing and encoding take longer than the configured
    /// limit. The capturer is idle again when this returns.
    pub async fn capture(
        &self,
        frame: Frame,
        layout: Layout,
        request: FrameRequest,
    ) -> CamFrameResult<Screenshot> {
        if self
            .capturing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("[SCREENSHOT] Capture already in progress, ignoring");
            return Err(CamFrameError::CaptureInProgress);
        }
        let _guard = CaptureGuard(Arc::clone(&self.capturing));

        let compositor = Arc::clone(&self.compositor);
        let format = self.format;
        let quality = self.jpeg_quality;
        let task = tokio::task::spawn_blocking(move || {
            let composed = compositor.compose_frame(&frame, &layout, &request)?;
            let bytes = encode_frame(&composed, format, quality)?;
            Ok::<_, CamFrameError>((composed.width, composed.height, bytes))
        });

        let (width, height, bytes) = match tokio::time::timeout(self.timeout, task).await {
            Ok(joined) => joined.context("Screenshot task failed")??,
            Err(_) => {
                log::warn!(
                    "[SCREENSHOT] Capture timed out after {}ms",
                    self.timeout.as_millis()
                );
                return Err(CamFrameError::Timeout {
                    secs: self.timeout.as_secs_f64(),
                });
            }
        };

        let screenshot = Screenshot {
            id: uuid::Uuid::new_v4().to_string(),
            taken_at: Utc::now(),
            format,
            width,
            height,
            bytes,
        };
        log::info!(
            "[SCREENSHOT] Captured {}x{} {} ({} bytes)",
            width,
            height,
            format.extension(),
            screenshot.bytes.len()
        );
        Ok(screenshot)
    }
}
