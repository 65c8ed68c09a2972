//! Selection regions and the region mapper.
//!
//! A [`NormalizedRegion`] is a rectangle in fractions of the *container*.
//! The crop region and the effect region are both instances of it, each
//! owned by its own [`RegionSelection`].
//!
//! [`Layout`] is the only place placement and region mapping are derived.
//! The preview overlay, the live loop, screenshots and export all go through
//! it so what is drawn selected is exactly what gets captured.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::coord::{ContainerSpace, ContainerUVSpace, Coord, FrameSpace, Rect, Size};
use super::placement::{compute_display_placement, DisplayPlacement};
use super::types::{ContainerRect, FrameDimensions};

/// Smallest side a region can be resized to.
pub const MIN_REGION_SIDE: f64 = 0.1;

/// Smallest extent accepted when constructing a region directly.
const MIN_EXTENT: f64 = 1e-6;

/// Clamp without panicking when `lo > hi`; `hi` wins.
fn clamp_to(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Which selection a region belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum RegionKind {
    /// Defines the captured/recorded area.
    Crop,
    /// Defines where the visual effect applies.
    Effect,
}

/// Corner handle used to resize a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum ResizeHandle {
    Nw,
    Ne,
    Sw,
    Se,
}

impl ResizeHandle {
    fn moves_left_edge(self) -> bool {
        matches!(self, ResizeHandle::Nw | ResizeHandle::Sw)
    }

    fn moves_top_edge(self) -> bool {
        matches!(self, ResizeHandle::Nw | ResizeHandle::Ne)
    }
}

/// Rectangle in container fractions.
///
/// Always satisfies `x + width <= 1`, `y + height <= 1` and non-zero extent.
/// Every constructor and mutation clamps to keep that true.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct NormalizedRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Deserialize)]
struct RawRegion {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

/// Regions coming back from the UI go through [`NormalizedRegion::new`].
impl<'de> Deserialize<'de> for NormalizedRegion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawRegion::deserialize(deserializer)?;
        Ok(NormalizedRegion::new(raw.x, raw.y, raw.width, raw.height))
    }
}

impl Default for NormalizedRegion {
    fn default() -> Self {
        Self::full()
    }
}

impl NormalizedRegion {
    /// Build a region, clamping it into the unit square.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        let width = clamp_to(finite_or(width, 1.0), MIN_EXTENT, 1.0);
        let height = clamp_to(finite_or(height, 1.0), MIN_EXTENT, 1.0);
        Self {
            x: clamp_to(finite_or(x, 0.0), 0.0, 1.0 - width),
            y: clamp_to(finite_or(y, 0.0), 0.0, 1.0 - height),
            width,
            height,
        }
    }

    /// The whole container.
    pub fn full() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }

    /// Region a selection starts with when its mode is switched on.
    pub fn default_for(kind: RegionKind) -> Self {
        match kind {
            // 80% centered
            RegionKind::Crop => Self::new(0.1, 0.1, 0.8, 0.8),
            // 60% centered
            RegionKind::Effect => Self::new(0.2, 0.2, 0.6, 0.6),
        }
    }

    /// Drag the region, keeping it inside the container.
    pub fn move_by(&mut self, dx: f64, dy: f64) {
        self.x = clamp_to(self.x + finite_or(dx, 0.0), 0.0, 1.0 - self.width);
        self.y = clamp_to(self.y + finite_or(dy, 0.0), 0.0, 1.0 - self.height);
    }

    /// Drag one corner. The opposite corner stays put and neither side
    /// shrinks below [`MIN_REGION_SIDE`].
    pub fn resize(&mut self, handle: ResizeHandle, dx: f64, dy: f64) {
        let dx = finite_or(dx, 0.0);
        let dy = finite_or(dy, 0.0);

        if handle.moves_left_edge() {
            let right = self.x + self.width;
            let new_x = clamp_to(self.x + dx, 0.0, (right - MIN_REGION_SIDE).max(0.0));
            self.width = right - new_x;
            self.x = new_x;
        } else {
            self.width = clamp_to(self.width + dx, MIN_REGION_SIDE, 1.0 - self.x);
        }

        if handle.moves_top_edge() {
            let bottom = self.y + self.height;
            let new_y = clamp_to(self.y + dy, 0.0, (bottom - MIN_REGION_SIDE).max(0.0));
            self.height = bottom - new_y;
            self.y = new_y;
        } else {
            self.height = clamp_to(self.height + dy, MIN_REGION_SIDE, 1.0 - self.y);
        }
    }

    /// Convert a pointer delta in container pixels to fractions.
    pub fn delta_from_pixels(dx_px: f64, dy_px: f64, container: ContainerRect) -> (f64, f64) {
        (dx_px / container.width, dy_px / container.height)
    }

    pub fn as_uv_rect(&self) -> Rect<ContainerUVSpace> {
        Rect::from_coords(self.x, self.y, self.width, self.height)
    }
}

/// One toggleable selection (crop or effect area).
///
/// Holds the region only while the mode is active; switching the mode off
/// discards it and switching it back on starts from the kind's default.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSelection {
    kind: RegionKind,
    region: Option<NormalizedRegion>,
}

impl RegionSelection {
    pub fn new(kind: RegionKind) -> Self {
        Self { kind, region: None }
    }

    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.region.is_some()
    }

    pub fn region(&self) -> Option<NormalizedRegion> {
        self.region
    }

    /// Flip the mode; returns whether it is now active.
    pub fn toggle(&mut self) -> bool {
        self.region = match self.region {
            Some(_) => None,
            None => Some(NormalizedRegion::default_for(self.kind)),
        };
        log::debug!(
            "[REGION] {:?} selection {}",
            self.kind,
            if self.is_active() { "on" } else { "off" }
        );
        self.is_active()
    }

    /// Put an active region back to the kind's default.
    pub fn reset(&mut self) {
        if self.region.is_some() {
            self.region = Some(NormalizedRegion::default_for(self.kind));
        }
    }

    pub fn move_by(&mut self, dx: f64, dy: f64) {
        if let Some(region) = self.region.as_mut() {
            region.move_by(dx, dy);
        }
    }

    pub fn resize(&mut self, handle: ResizeHandle, dx: f64, dy: f64) {
        if let Some(region) = self.region.as_mut() {
            region.resize(handle, dx, dy);
        }
    }
}

/// A region projected into source-frame pixels.
///
/// Always inside the frame and at least one pixel wide and tall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourcePixelRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Integer pixel bounds for raster operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl SourcePixelRegion {
    /// Covering integer bounds, clamped to `frame`.
    pub fn to_pixel_bounds(&self, frame: FrameDimensions) -> PixelBounds {
        let x0 = (self.x.floor().max(0.0) as u32).min(frame.width.saturating_sub(1));
        let y0 = (self.y.floor().max(0.0) as u32).min(frame.height.saturating_sub(1));
        let x1 = ((self.x + self.width).ceil().max(0.0) as u32).min(frame.width);
        let y1 = ((self.y + self.height).ceil().max(0.0) as u32).min(frame.height);
        PixelBounds {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0).max(1),
            height: y1.saturating_sub(y0).max(1),
        }
    }

    /// Intersect with `crop` and express the result relative to the crop's
    /// top-left. `None` when they don't overlap.
    pub fn relative_to(&self, crop: &PixelBounds) -> Option<SourcePixelRegion> {
        let left = self.x.max(crop.x as f64);
        let top = self.y.max(crop.y as f64);
        let right = (self.x + self.width).min((crop.x + crop.width) as f64);
        let bottom = (self.y + self.height).min((crop.y + crop.height) as f64);
        if right <= left || bottom <= top {
            return None;
        }

        let crop_w = crop.width as f64;
        let crop_h = crop.height as f64;
        let x = clamp_to(left - crop.x as f64, 0.0, crop_w - 1.0);
        let y = clamp_to(top - crop.y as f64, 0.0, crop_h - 1.0);
        Some(SourcePixelRegion {
            x,
            y,
            width: clamp_to(right - left, 1.0, crop_w - x),
            height: clamp_to(bottom - top, 1.0, crop_h - y),
        })
    }

    pub fn as_rect(&self) -> Rect<FrameSpace> {
        Rect::from_coords(self.x, self.y, self.width, self.height)
    }
}

/// Project a container-fraction region into frame pixels, clamped to the frame.
///
/// Total over all inputs. The origin is clamped into the frame first and the
/// size is then clamped to what is left from that origin, so a region that
/// starts in a letterbox bar is pulled onto the frame edge with its projected
/// size. The result is never less than one pixel on either side.
pub fn to_source_pixels(
    region: &NormalizedRegion,
    placement: &DisplayPlacement,
    frame: FrameDimensions,
    container: ContainerRect,
) -> SourcePixelRegion {
    let uv = region.as_uv_rect();
    let container_rect = uv.to_container_space(container.size());

    let origin = placement.container_to_frame(container_rect.origin, frame);
    let size = placement.container_size_to_frame(container_rect.size, frame);

    let frame_w = frame.width as f64;
    let frame_h = frame.height as f64;

    // Origin stops one pixel short of the far edge so the size clamp below
    // always leaves at least one pixel
    let x = clamp_to(origin.x, 0.0, frame_w - 1.0);
    let y = clamp_to(origin.y, 0.0, frame_h - 1.0);

    SourcePixelRegion {
        x,
        y,
        width: clamp_to(size.width, 1.0, frame_w - x),
        height: clamp_to(size.height, 1.0, frame_h - y),
    }
}

/// Inverse of [`to_source_pixels`]: where a frame-pixel rect is drawn in the
/// container.
pub fn source_to_container(
    source: &SourcePixelRegion,
    placement: &DisplayPlacement,
    frame: FrameDimensions,
) -> Rect<ContainerSpace> {
    let origin = placement.frame_to_container(Coord::new(source.x, source.y), frame);
    let size = placement.frame_size_to_container(Size::new(source.width, source.height), frame);
    Rect::new(origin, size)
}

/// Inverse of [`to_source_pixels`] back to container fractions.
pub fn to_normalized(
    source: &SourcePixelRegion,
    placement: &DisplayPlacement,
    frame: FrameDimensions,
    container: ContainerRect,
) -> NormalizedRegion {
    let uv = source_to_container(source, placement, frame).to_uv_space(container.size());
    NormalizedRegion::new(uv.origin.x, uv.origin.y, uv.size.width, uv.size.height)
}

/// Current geometry of the preview surface.
///
/// `frame` is `None` until the source reports its size; `fallback` is used
/// until then. In fullscreen the video element's rect replaces the container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub frame: Option<FrameDimensions>,
    pub container: ContainerRect,
    pub video_element: Option<ContainerRect>,
    pub fullscreen: bool,
    pub fallback: FrameDimensions,
}

impl Layout {
    pub fn new(container: ContainerRect) -> Self {
        Self {
            frame: None,
            container,
            video_element: None,
            fullscreen: false,
            fallback: FrameDimensions::FALLBACK,
        }
    }

    /// Layout where the container is the frame itself. Regions are then
    /// fractions of the frame; used when nothing is on screen.
    pub fn for_frame(frame: FrameDimensions) -> Self {
        let container = ContainerRect {
            width: frame.width as f64,
            height: frame.height as f64,
        };
        Self {
            frame: Some(frame),
            ..Self::new(container)
        }
    }

    pub fn with_frame(mut self, frame: FrameDimensions) -> Self {
        self.frame = Some(frame);
        self
    }

    pub fn with_fallback(mut self, fallback: FrameDimensions) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_fullscreen(mut self, fullscreen: bool, video_element: Option<ContainerRect>) -> Self {
        self.fullscreen = fullscreen;
        self.video_element = video_element;
        self
    }

    /// Rect the frame is actually laid out in.
    pub fn effective_container(&self) -> ContainerRect {
        match (self.fullscreen, self.video_element) {
            (true, Some(video)) => video,
            _ => self.container,
        }
    }

    pub fn frame_dimensions(&self) -> FrameDimensions {
        self.frame.unwrap_or(self.fallback)
    }

    pub fn placement(&self) -> DisplayPlacement {
        compute_display_placement(self.frame_dimensions(), self.effective_container())
    }

    /// Map a selection into source pixels.
    pub fn map_region(&self, region: &NormalizedRegion) -> SourcePixelRegion {
        to_source_pixels(
            region,
            &self.placement(),
            self.frame_dimensions(),
            self.effective_container(),
        )
    }

    /// Where a mapped region is drawn in the container, for selection handles.
    pub fn overlay_rect(&self, source: &SourcePixelRegion) -> Rect<ContainerSpace> {
        source_to_container(source, &self.placement(), self.frame_dimensions())
    }

    pub fn to_normalized(&self, source: &SourcePixelRegion) -> NormalizedRegion {
        to_normalized(
            source,
            &self.placement(),
            self.frame_dimensions(),
            self.effective_container(),
        )
    }
}
