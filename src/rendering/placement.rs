//! Display-area calculation.
//!
//! Computes where a frame lands inside its container under "contain" fit,
//! and converts points between container pixels and frame pixels using that
//! placement. Every consumer (overlay, live stream, screenshot, export) goes
//! through these functions.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::coord::{ContainerSpace, Coord, FrameSpace, Rect, Size};
use super::types::{ContainerRect, FrameDimensions};

/// Aspect ratios closer than this are treated as identical.
pub const ASPECT_RATIO_TOLERANCE: f64 = 0.01;

/// Where a frame is drawn inside a container.
///
/// Invariant: `offset_x * 2 + displayed_width == container.width`, same for Y.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct DisplayPlacement {
    pub displayed_width: f64,
    pub displayed_height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl DisplayPlacement {
    /// The displayed frame as a container rect.
    pub fn displayed_rect(&self) -> Rect<ContainerSpace> {
        Rect::from_coords(
            self.offset_x,
            self.offset_y,
            self.displayed_width,
            self.displayed_height,
        )
    }

    /// Frame pixels per displayed container pixel, per axis.
    pub fn frame_scale(&self, frame: FrameDimensions) -> (f64, f64) {
        (
            frame.width as f64 / self.displayed_width,
            frame.height as f64 / self.displayed_height,
        )
    }

    /// Container pixel → frame pixel (unclamped).
    pub fn container_to_frame(
        &self,
        point: Coord<ContainerSpace>,
        frame: FrameDimensions,
    ) -> Coord<FrameSpace> {
        let (sx, sy) = self.frame_scale(frame);
        Coord::new((point.x - self.offset_x) * sx, (point.y - self.offset_y) * sy)
    }

    /// Frame pixel → container pixel.
    pub fn frame_to_container(
        &self,
        point: Coord<FrameSpace>,
        frame: FrameDimensions,
    ) -> Coord<ContainerSpace> {
        let (sx, sy) = self.frame_scale(frame);
        Coord::new(point.x / sx + self.offset_x, point.y / sy + self.offset_y)
    }

    pub fn container_size_to_frame(
        &self,
        size: Size<ContainerSpace>,
        frame: FrameDimensions,
    ) -> Size<FrameSpace> {
        let (sx, sy) = self.frame_scale(frame);
        Size::new(size.width * sx, size.height * sy)
    }

    pub fn frame_size_to_container(
        &self,
        size: Size<FrameSpace>,
        frame: FrameDimensions,
    ) -> Size<ContainerSpace> {
        let (sx, sy) = self.frame_scale(frame);
        Size::new(size.width / sx, size.height / sy)
    }
}

/// Place `frame` inside `container` with letterbox/pillarbox "contain" fit.
///
/// Both inputs must have positive dimensions; `FrameDimensions::new` and
/// `ContainerRect::new` enforce that.
pub fn compute_display_placement(
    frame: FrameDimensions,
    container: ContainerRect,
) -> DisplayPlacement {
    let frame_aspect = frame.aspect_ratio();
    let container_aspect = container.aspect_ratio();

    if (frame_aspect - container_aspect).abs() < ASPECT_RATIO_TOLERANCE {
        // Fills the container
        DisplayPlacement {
            displayed_width: container.width,
            displayed_height: container.height,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    } else if frame_aspect > container_aspect {
        // Frame is wider - fit to width, bars top and bottom
        let displayed_height = container.width / frame_aspect;
        DisplayPlacement {
            displayed_width: container.width,
            displayed_height,
            offset_x: 0.0,
            offset_y: (container.height - displayed_height) / 2.0,
        }
    } else {
        // Frame is taller - fit to height, bars left and right
        let displayed_width = container.height * frame_aspect;
        DisplayPlacement {
            displayed_width,
            displayed_height: container.height,
            offset_x: (container.width - displayed_width) / 2.0,
            offset_y: 0.0,
        }
    }
}
