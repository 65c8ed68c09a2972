//! Capture configuration.
//!
//! Aspect-ratio preset requested from the camera, the frame size assumed
//! until the camera reports one, and the live loop rate.

use lazy_static::lazy_static;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CamFrameResult;
use crate::rendering::types::FrameDimensions;

/// Aspect-ratio presets offered for capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "4:3")]
    Standard,
    #[serde(rename = "1:1")]
    Square,
}

/// Ideal/min/max bounds for one capture axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ConstraintRange {
    pub ideal: u32,
    pub min: u32,
    pub max: u32,
}

impl ConstraintRange {
    const fn new(ideal: u32, min: u32, max: u32) -> Self {
        Self { ideal, min, max }
    }

    pub fn contains(&self, value: u32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Size constraints handed to the camera for a preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CaptureConstraints {
    pub width: ConstraintRange,
    pub height: ConstraintRange,
}

impl AspectRatio {
    pub fn ratio(&self) -> f64 {
        match self {
            AspectRatio::Landscape => 16.0 / 9.0,
            AspectRatio::Portrait => 9.0 / 16.0,
            AspectRatio::Standard => 4.0 / 3.0,
            AspectRatio::Square => 1.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Standard => "4:3",
            AspectRatio::Square => "1:1",
        }
    }

    pub fn constraints(&self) -> CaptureConstraints {
        match self {
            AspectRatio::Landscape => CaptureConstraints {
                width: ConstraintRange::new(1280, 854, 1920),
                height: ConstraintRange::new(720, 480, 1080),
            },
            AspectRatio::Portrait => CaptureConstraints {
                width: ConstraintRange::new(720, 480, 1080),
                height: ConstraintRange::new(1280, 854, 1920),
            },
            AspectRatio::Standard => CaptureConstraints {
                width: ConstraintRange::new(960, 640, 1440),
                height: ConstraintRange::new(720, 480, 1080),
            },
            AspectRatio::Square => CaptureConstraints {
                width: ConstraintRange::new(720, 480, 1080),
                height: ConstraintRange::new(720, 480, 1080),
            },
        }
    }

    /// The ideal capture size for this preset.
    pub fn ideal_dimensions(&self) -> FrameDimensions {
        let c = self.constraints();
        FrameDimensions {
            width: c.width.ideal,
            height: c.height.ideal,
        }
    }
}

/// Capture settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureConfig {
    /// Requested aspect-ratio preset.
    pub aspect_ratio: AspectRatio,

    /// Frame size assumed until the source reports one.
    pub fallback_dimensions: FrameDimensions,

    /// Live preview/recording loop rate (10-60).
    pub live_fps: u32,

    /// Mirror the camera by default (selfie view).
    pub mirror: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: AspectRatio::default(),
            fallback_dimensions: FrameDimensions::FALLBACK,
            live_fps: 30,
            mirror: false,
        }
    }
}

impl CaptureConfig {
    /// Validate and clamp settings to acceptable ranges.
    pub fn validate(&mut self) {
        self.live_fps = self.live_fps.clamp(10, 60);
        if self.fallback_dimensions.width == 0 || self.fallback_dimensions.height == 0 {
            self.fallback_dimensions = FrameDimensions::FALLBACK;
        }
    }

    /// Reset all settings to defaults.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Parse a saved snapshot; out-of-range values are clamped.
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
    /// Global capture configuration.
    ///
    /// Thread-safe access via `parking_lot::RwLock` (non-poisoning, fast).
    pub static ref CAPTURE_CONFIG: RwLock<CaptureConfig> = RwLock::new(CaptureConfig::default());
}

// ============================================================================
// Convenience Getters
// ============================================================================

pub fn get_capture_config() -> CaptureConfig {
    CAPTURE_CONFIG.read().clone()
}

pub fn get_live_fps() -> u32 {
    CAPTURE_CONFIG.read().live_fps
}

pub fn get_fallback_dimensions() -> FrameDimensions {
    CAPTURE_CONFIG.read().fallback_dimensions
}

/// Replace the global capture config (batch update).
pub fn set_capture_config(config: CaptureConfig) {
    let mut current = CAPTURE_CONFIG.write();
    *current = config;
    current.validate();
    log::debug!("[CONFIG] Capture config updated: {:?}", *current);
}

pub fn reset_capture_config() {
    CAPTURE_CONFIG.write().reset();
    log::debug!("[CONFIG] Capture settings reset to defaults");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CamFrameError;

    #[test]
    fn test_preset_constraints() {
        let c = AspectRatio::Landscape.constraints();
        assert_eq!(c.width, ConstraintRange::new(1280, 854, 1920));
        assert_eq!(c.height, ConstraintRange::new(720, 480, 1080));

        let portrait = AspectRatio::Portrait.constraints();
        assert_eq!(portrait.width.ideal, 720);
        assert_eq!(portrait.height.ideal, 1280);

        for preset in [
            AspectRatio::Landscape,
            AspectRatio::Portrait,
            AspectRatio::Standard,
            AspectRatio::Square,
        ] {
            let ideal = preset.ideal_dimensions();
            assert!((ideal.aspect_ratio() - preset.ratio()).abs() < 0.01, "{}", preset.label());
            let c = preset.constraints();
            assert!(c.width.contains(ideal.width) && c.height.contains(ideal.height));
        }
    }

    #[test]
    fn test_aspect_ratio_serializes_as_label() {
        let json = serde_json::to_string(&AspectRatio::Standard).unwrap();
        assert_eq!(json, "\"4:3\"");
        let parsed: AspectRatio = serde_json::from_str("\"9:16\"").unwrap();
        assert_eq!(parsed, AspectRatio::Portrait);
    }

    #[test]
    fn test_validate_clamps_fps() {
        let mut config = CaptureConfig {
            live_fps: 500,
            ..Default::default()
        };
        config.validate();
        assert_eq!(config.live_fps, 60);
    }

    #[test]
    fn test_json_snapshot() {
        let config = CaptureConfig {
            aspect_ratio: AspectRatio::Square,
            mirror: true,
            ..Default::default()
        };
        let json = config.to_json().unwrap();
        assert!(json.contains("\"aspectRatio\": \"1:1\""));
        assert_eq!(CaptureConfig::load_from_json(&json).unwrap(), config);

        let clamped = CaptureConfig::load_from_json(
            r#"{"aspectRatio":"16:9","fallbackDimensions":{"width":640,"height":480},"liveFps":1,"mirror":false}"#,
        )
        .unwrap();
        assert_eq!(clamped.live_fps, 10);
        assert_eq!(clamped.fallback_dimensions, FrameDimensions::new(640, 480).unwrap());

        // Zero-sized frames never make it past parsing
        let zero = CaptureConfig::load_from_json(
            r#"{"aspectRatio":"16:9","fallbackDimensions":{"width":0,"height":0},"liveFps":30,"mirror":false}"#,
        );
        assert!(matches!(zero, Err(CamFrameError::JsonError(_))));
    }
}
