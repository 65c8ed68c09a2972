//! Frame compositor.
//!
//! Applies the mirror → crop → effect sequence to a single frame. The live
//! loop, screenshots and export all call [`Compositor::compose_frame`] with
//! the same [`Layout`], so every path captures exactly what the overlay shows.

use std::sync::Arc;

use image::imageops;

use super::effects::{box_blur_rgba, pixelate_rgba, mirror_horizontal, BlurFilter, DisabledBlur, NativeBlur};
use super::exporter::frame_ops::crop_frame;
use super::region::{Layout, SourcePixelRegion};
use super::types::{EffectKind, EffectSpec, Frame, FrameRequest};
use crate::config::effects::EffectConfig;
use crate::error::{CamFrameError, CamFrameResult, ResultExt};

/// Where an effect is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectTarget {
    Full,
    Region(SourcePixelRegion),
}

/// Composites effects onto frames.
pub struct Compositor {
    filter: Box<dyn BlurFilter>,
    config: EffectConfig,
}

impl Compositor {
    /// Create a compositor. Uses the native blur filter unless the config
    /// turns it off.
    pub fn new(config: EffectConfig) -> Self {
        let filter: Box<dyn BlurFilter> = if config.prefer_native_filter {
            Box::new(NativeBlur)
        } else {
            Box::new(DisabledBlur)
        };
        Self::with_filter(filter, config)
    }

    /// Create a compositor from the global effect config.
    pub fn from_global() -> Self {
        Self::new(crate::config::effects::get_effect_config())
    }

    pub fn with_filter(filter: Box<dyn BlurFilter>, config: EffectConfig) -> Self {
        log::debug!("[EFFECT] Compositor using {} blur", filter.name());
        Self { filter, config }
    }

    pub fn config(&self) -> &EffectConfig {
        &self.config
    }

    /// Apply `spec` to `source` inside `target`.
    ///
    /// When `mirrored` is set the source is flipped first and `target` is
    /// read in the flipped (displayed) coordinates. Pixels outside the
    /// target's pixel bounds are copied unchanged. `source` is never modified.
    pub fn apply_effect(
        &self,
        source: &Frame,
        target: EffectTarget,
        spec: &EffectSpec,
        mirrored: bool,
    ) -> CamFrameResult<Frame> {
        let mut output = source.clone();
        if mirrored {
            mirror_horizontal(&mut output.data, output.width, output.height);
        }
        if !spec.is_active() {
            return Ok(output);
        }

        let mut image = output.to_image()?;
        match target {
            EffectTarget::Full => {
                let processed = self.process(image, spec)?;
                Ok(output.with_image(processed))
            }
            EffectTarget::Region(region) => {
                let bounds = region.to_pixel_bounds(output.dimensions());
                let sub = imageops::crop_imm(&image, bounds.x, bounds.y, bounds.width, bounds.height)
                    .to_image();
                let processed = self.process(sub, spec)?;
                imageops::replace(&mut image, &processed, bounds.x as i64, bounds.y as i64);
                Ok(output.with_image(image))
            }
        }
    }

    fn process(&self, image: image::RgbaImage, spec: &EffectSpec) -> CamFrameResult<image::RgbaImage> {
        let (width, height) = image.dimensions();
        match spec.kind {
            EffectKind::None => Ok(image),
            EffectKind::Blur => {
                let radius = self.config.blur_radius(spec.intensity);
                match self.filter.blur(&image, radius) {
                    Ok(blurred) => Ok(blurred),
                    Err(e) => {
                        log::debug!(
                            "[EFFECT] {} blur unavailable ({}), using box blur",
                            self.filter.name(),
                            e
                        );
                        let data = box_blur_rgba(
                            image.as_raw(),
                            width,
                            height,
                            self.config.box_radius(spec.intensity),
                        )?;
                        raw_to_image(width, height, data)
                    }
                }
            }
            EffectKind::Pixelate => {
                let block = self.config.pixelate_block(spec.intensity);
                let data = pixelate_rgba(image.as_raw(), width, height, block)?;
                raw_to_image(width, height, data)
            }
        }
    }

    /// Run the full per-frame sequence for `request`.
    ///
    /// Regions are mapped through `layout` (with the frame's real size). The
    /// effect region is mapped with the same placement as the crop and then
    /// expressed relative to the cropped frame; an effect region entirely
    /// outside the crop leaves the frame untouched.
    pub fn compose_frame(
        &self,
        source: &Frame,
        layout: &Layout,
        request: &FrameRequest,
    ) -> CamFrameResult<Frame> {
        let dims = source.dimensions();
        let layout = layout.with_frame(dims);

        let mut working = source.clone();
        if request.mirrored {
            mirror_horizontal(&mut working.data, working.width, working.height);
        }

        let crop_bounds = request
            .crop
            .map(|crop| layout.map_region(&crop).to_pixel_bounds(dims));
        if let Some(bounds) = crop_bounds {
            working = crop_frame(&working, bounds)?;
        }

        if !request.effect.is_active() {
            return Ok(working);
        }

        let target = match request.effect_region {
            None => EffectTarget::Full,
            Some(region) => {
                let mapped = layout.map_region(&region);
                match crop_bounds {
                    None => EffectTarget::Region(mapped),
                    Some(bounds) => match mapped.relative_to(&bounds) {
                        Some(relative) => EffectTarget::Region(relative),
                        None => return Ok(working),
                    },
                }
            }
        };

        self.apply_effect(&working, target, &request.effect, false)
    }

    /// [`compose_frame`](Self::compose_frame) on tokio's blocking pool.
    pub async fn compose_blocking(
        self: Arc<Self>,
        frame: Frame,
        layout: Layout,
        request: FrameRequest,
    ) -> CamFrameResult<Frame> {
        tokio::task::spawn_blocking(move || self.compose_frame(&frame, &layout, &request))
            .await
            .context("Compose task failed")?
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(EffectConfig::default())
    }
}

fn raw_to_image(width: u32, height: u32, data: Vec<u8>) -> CamFrameResult<image::RgbaImage> {
    image::RgbaImage::from_raw(width, height, data).ok_or_else(|| {
        CamFrameError::InvalidDimensions(format!("{}x{} effect output", width, height))
    })
}
