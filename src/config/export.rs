//! Export and screenshot configuration.

use lazy_static::lazy_static;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CamFrameResult;

/// Still image format for screenshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum ScreenshotFormat {
    #[default]
    Png,
    Jpeg,
}

impl ScreenshotFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ScreenshotFormat::Png => "image/png",
            ScreenshotFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ScreenshotFormat::Png => "png",
            ScreenshotFormat::Jpeg => "jpg",
        }
    }
}

/// Export and screenshot settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportConfig {
    /// Stepping rate for offline processing (1-60).
    pub fps: u32,

    /// Seconds added to the clip duration before the watchdog fires.
    pub watchdog_grace_secs: f64,

    /// Extra attempts per failed seek before the export gives up.
    pub seek_retries: u32,

    /// A trim within this many seconds of both clip ends counts as untrimmed.
    pub full_clip_tolerance_secs: f64,

    /// Screenshot encoding.
    pub screenshot_format: ScreenshotFormat,

    /// JPEG quality (1-100).
    pub jpeg_quality: u8,

    /// Time after which a stuck screenshot capture is abandoned.
    pub screenshot_timeout_ms: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            watchdog_grace_secs: 10.0,
            seek_retries: 1,
            full_clip_tolerance_secs: 0.1,
            screenshot_format: ScreenshotFormat::default(),
            jpeg_quality: 90,
            screenshot_timeout_ms: 5000,
        }
    }
}

impl ExportConfig {
    /// Validate and clamp settings to acceptable ranges.
    pub fn validate(&mut self) {
        self.fps = self.fps.clamp(1, 60);
        if !self.watchdog_grace_secs.is_finite() {
            self.watchdog_grace_secs = 10.0;
        }
        self.watchdog_grace_secs = self.watchdog_grace_secs.clamp(0.0, 600.0);
        self.seek_retries = self.seek_retries.min(5);
        if !self.full_clip_tolerance_secs.is_finite() {
            self.full_clip_tolerance_secs = 0.1;
        }
        self.full_clip_tolerance_secs = self.full_clip_tolerance_secs.clamp(0.0, 1.0);
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        self.screenshot_timeout_ms = self.screenshot_timeout_ms.clamp(100, 60_000);
    }

    /// Reset all settings to defaults.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn load_from_json(json: &str) -> CamFrameResult<Self> {
        let mut config: Self = serde_json::from_str(json)?;
        config.validate();
        Ok(config)
    }

    pub fn to_json(&self) -> CamFrameResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

lazy_static! {
    /// Global export configuration.
    pub static ref EXPORT_CONFIG: RwLock<ExportConfig> = RwLock::new(ExportConfig::default());
}

pub fn get_export_config() -> ExportConfig {
    EXPORT_CONFIG.read().clone()
}

pub fn get_export_fps() -> u32 {
    EXPORT_CONFIG.read().fps
}

pub fn get_screenshot_format() -> ScreenshotFormat {
    EXPORT_CONFIG.read().screenshot_format
}

/// Replace the global export config (batch update).
pub fn set_export_config(config: ExportConfig) {
    let mut current = EXPORT_CONFIG.write();
    *current = config;
    current.validate();
    log::debug!("[CONFIG] Export config updated: {:?}", *current);
}

pub fn reset_export_config() {
    EXPORT_CONFIG.write().reset();
    log::debug!("[CONFIG] Export settings reset to defaults");
}
