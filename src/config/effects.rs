//! Effect configuration.
//!
//! One canonical intensity→pixel mapping shared by preview, screenshot and
//! export, so the same intensity looks the same everywhere.

use lazy_static::lazy_static;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::CamFrameResult;
use crate::rendering::types::EffectSpec;

/// Effect strength settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectConfig {
    /// Blur radius in pixels per intensity step.
    pub blur_scale: f32,

    /// Pixelate block size in pixels per intensity step.
    pub pixelate_scale: u32,

    /// Smallest pixelate block.
    pub min_block: u32,

    /// Intensity selected when an effect is first enabled (1-10).
    pub default_intensity: u8,

    /// Try the native blur filter before the manual box blur.
    pub prefer_native_filter: bool,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            blur_scale: 2.0,
            pixelate_scale: 4,
            min_block: 2,
            default_intensity: 5,
            prefer_native_filter: true,
        }
    }
}

impl EffectConfig {
    /// Validate and clamp settings to acceptable ranges.
    pub fn validate(&mut self) {
        if !self.blur_scale.is_finite() {
            self.blur_scale = 2.0;
        }
        self.blur_scale = self.blur_scale.clamp(0.5, 10.0);
        self.pixelate_scale = self.pixelate_scale.clamp(1, 16);
        self.min_block = self.min_block.clamp(1, 64);
        self.default_intensity = self
            .default_intensity
            .clamp(EffectSpec::MIN_INTENSITY, EffectSpec::MAX_INTENSITY);
    }

    /// Reset all settings to defaults.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Blur radius for an intensity.
    pub fn blur_radius(&self, intensity: u8) -> f32 {
        intensity as f32 * self.blur_scale
    }

    /// Half-width of the manual box blur for an intensity.
    pub fn box_radius(&self, intensity: u8) -> u32 {
        (self.blur_radius(intensity) / 2.0).ceil() as u32
    }

    /// Pixelate block size for an intensity.
    pub fn pixelate_block(&self, intensity: u8) -> u32 {
        (intensity as u32 * self.pixelate_scale).max(self.min_block)
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
    /// Global effect configuration.
    pub static ref EFFECT_CONFIG: RwLock<EffectConfig> = RwLock::new(EffectConfig::default());
}

pub fn get_effect_config() -> EffectConfig {
    EFFECT_CONFIG.read().clone()
}

pub fn get_default_intensity() -> u8 {
    EFFECT_CONFIG.read().default_intensity
}

/// Replace the global effect config (batch update).
pub fn set_effect_config(config: EffectConfig) {
    let mut current = EFFECT_CONFIG.write();
    *current = config;
    current.validate();
    log::debug!("[CONFIG] Effect config updated: {:?}", *current);
}

pub fn reset_effect_config() {
    EFFECT_CONFIG.write().reset();
    log::debug!("[CONFIG] Effect settings reset to defaults");
}
