//! Core types shared by the geometry, compositing and pipeline modules.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::coord::{ContainerSpace, FrameSpace, Size};
use super::region::NormalizedRegion;
use crate::error::{CamFrameError, CamFrameResult};

/// Pixel size of a source video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct FrameDimensions {
    pub width: u32,
    pub height: u32,
}

impl FrameDimensions {
    /// Dimensions used until the capture device reports real ones.
    pub const FALLBACK: FrameDimensions = FrameDimensions {
        width: 1280,
        height: 720,
    };

    pub fn new(width: u32, height: u32) -> CamFrameResult<Self> {
        if width == 0 || height == 0 {
            return Err(CamFrameError::InvalidDimensions(format!(
                "frame {}x{}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    pub fn size(&self) -> Size<FrameSpace> {
        Size::from_u32(self.width, self.height)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Pixel size of the surface a frame is displayed within.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ContainerRect {
    pub width: f64,
    pub height: f64,
}

impl ContainerRect {
    pub fn new(width: f64, height: f64) -> CamFrameResult<Self> {
        if !(width > 0.0 && height > 0.0) || !width.is_finite() || !height.is_finite() {
            return Err(CamFrameError::InvalidDimensions(format!(
                "container {}x{}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }

    pub fn size(&self) -> Size<ContainerSpace> {
        Size::new(self.width, self.height)
    }
}

/// Wire form of a width/height pair, validated on the way in.
#[derive(Deserialize)]
struct RawSize<T> {
    width: T,
    height: T,
}

impl<'de> Deserialize<'de> for FrameDimensions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawSize::<u32>::deserialize(deserializer)?;
        FrameDimensions::new(raw.width, raw.height).map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for ContainerRect {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawSize::<f64>::deserialize(deserializer)?;
        ContainerRect::new(raw.width, raw.height).map_err(serde::de::Error::custom)
    }
}

/// An RGBA frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Frame number (0-indexed).
    pub frame_number: u32,
    /// Timestamp in milliseconds.
    pub timestamp_ms: u64,
    /// RGBA pixel data (width * height * 4 bytes).
    pub data: Vec<u8>,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
}

impl Frame {
    pub fn new(
        frame_number: u32,
        timestamp_ms: u64,
        data: Vec<u8>,
        width: u32,
        height: u32,
    ) -> CamFrameResult<Self> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || data.len() != expected {
            return Err(CamFrameError::InvalidDimensions(format!(
                "{}x{} frame with {} bytes (expected {})",
                width,
                height,
                data.len(),
                expected
            )));
        }
        Ok(Self {
            frame_number,
            timestamp_ms,
            data,
            width,
            height,
        })
    }

    /// Create an empty black frame.
    pub fn empty(width: u32, height: u32) -> Self {
        Self::solid(width, height, [0, 0, 0, 255])
    }

    /// Create a frame filled with one colour.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            frame_number: 0,
            timestamp_ms: 0,
            data,
            width,
            height,
        }
    }

    pub fn dimensions(&self) -> FrameDimensions {
        FrameDimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// RGBA value at `(x, y)`; out-of-range reads return `None`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize * self.width as usize) + x as usize) * 4;
        self.data
            .get(idx..idx + 4)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }

    /// Copy into an `image` buffer.
    pub fn to_image(&self) -> CamFrameResult<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(|| {
            CamFrameError::InvalidDimensions(format!(
                "{}x{} frame buffer too small",
                self.width, self.height
            ))
        })
    }

    /// Replace the pixel data with an `image` buffer, keeping frame metadata.
    pub fn with_image(&self, image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            frame_number: self.frame_number,
            timestamp_ms: self.timestamp_ms,
            data: image.into_raw(),
            width,
            height,
        }
    }
}

/// Visual effect selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum EffectKind {
    #[default]
    None,
    Blur,
    Pixelate,
}

/// Effect plus strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct EffectSpec {
    pub kind: EffectKind,
    /// Strength in `[1, 10]`.
    pub intensity: u8,
}

impl EffectSpec {
    pub const MIN_INTENSITY: u8 = 1;
    pub const MAX_INTENSITY: u8 = 10;

    pub fn new(kind: EffectKind, intensity: u8) -> Self {
        Self {
            kind,
            intensity: intensity.clamp(Self::MIN_INTENSITY, Self::MAX_INTENSITY),
        }
    }

    pub fn none() -> Self {
        Self::new(EffectKind::None, 5)
    }

    pub fn is_active(&self) -> bool {
        self.kind != EffectKind::None
    }
}

impl Default for EffectSpec {
    fn default() -> Self {
        Self::none()
    }
}

#[derive(Deserialize)]
struct RawEffectSpec {
    kind: EffectKind,
    intensity: u8,
}

/// Goes through [`EffectSpec::new`] so out-of-range intensities are clamped.
impl<'de> Deserialize<'de> for EffectSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawEffectSpec::deserialize(deserializer)?;
        Ok(EffectSpec::new(raw.kind, raw.intensity))
    }
}

/// Everything the pipeline needs to turn one source frame into an output frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct FrameRequest {
    /// Recorded area; `None` captures the whole frame.
    pub crop: Option<NormalizedRegion>,
    /// Effect area; `None` applies an active effect to the whole frame.
    pub effect_region: Option<NormalizedRegion>,
    pub effect: EffectSpec,
    pub mirrored: bool,
}

impl FrameRequest {
    /// Whether the request leaves frames untouched.
    pub fn is_passthrough(&self) -> bool {
        self.crop.is_none() && !self.effect.is_active() && !self.mirrored
    }
}
