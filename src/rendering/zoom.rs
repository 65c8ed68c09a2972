//! Preview zoom and pan.
//!
//! The preview is scaled about the container centre and then translated by
//! the pan offset. Zoom never changes what is captured: selections are always
//! expressed in the unzoomed container, so pointer positions have to go
//! through [`ViewTransform::screen_to_container`] before region editing.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::coord::{ContainerSpace, Coord};
use super::types::ContainerRect;

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 3.0;
pub const ZOOM_STEP: f64 = 0.25;

/// Pan range in container pixels per unit of zoom above 1.
pub const PAN_PER_ZOOM: f64 = 100.0;

/// Zoom level plus pan offset of the preview.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ViewTransform {
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawView {
    zoom: f64,
    #[serde(default)]
    pan_x: f64,
    #[serde(default)]
    pan_y: f64,
}

impl<'de> Deserialize<'de> for ViewTransform {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawView::deserialize(deserializer)?;
        let mut view = ViewTransform::default();
        view.set_zoom(raw.zoom);
        view.pan_x = if raw.pan_x.is_finite() { raw.pan_x } else { 0.0 };
        view.pan_y = if raw.pan_y.is_finite() { raw.pan_y } else { 0.0 };
        view.clamp_pan();
        Ok(view)
    }
}

impl ViewTransform {
    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom - ZOOM_STEP);
    }

    /// Back to 1x with no pan.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        let zoom = if zoom.is_finite() { zoom } else { 1.0 };
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        // Shrinking the zoom shrinks the pan range
        self.clamp_pan();
        log::debug!("[ZOOM] zoom={:.2} pan=({:.1}, {:.1})", self.zoom, self.pan_x, self.pan_y);
    }

    /// Largest allowed pan offset on either axis.
    pub fn max_pan(&self) -> f64 {
        (PAN_PER_ZOOM * (self.zoom - 1.0)).max(0.0)
    }

    /// Panning only makes sense zoomed in, and is disabled while a region is
    /// being edited so drags go to the region.
    pub fn can_pan(&self, editing_region: bool) -> bool {
        self.zoom > 1.0 && !editing_region
    }

    /// Pan by a pointer delta. Returns whether the pan was applied.
    pub fn pan_by(&mut self, dx: f64, dy: f64, editing_region: bool) -> bool {
        if !self.can_pan(editing_region) {
            return false;
        }
        self.pan_x += if dx.is_finite() { dx } else { 0.0 };
        self.pan_y += if dy.is_finite() { dy } else { 0.0 };
        self.clamp_pan();
        true
    }

    fn clamp_pan(&mut self) {
        let limit = self.max_pan();
        self.pan_x = self.pan_x.clamp(-limit, limit);
        self.pan_y = self.pan_y.clamp(-limit, limit);
    }

    /// Map a pointer position on screen back to the unzoomed container.
    pub fn screen_to_container(
        &self,
        point: Coord<ContainerSpace>,
        container: ContainerRect,
    ) -> Coord<ContainerSpace> {
        let centre = Coord::new(container.width / 2.0, container.height / 2.0);
        let pan = Coord::new(self.pan_x, self.pan_y);
        centre + (point - centre - pan) * (1.0 / self.zoom)
    }

    /// Inverse of [`screen_to_container`](Self::screen_to_container).
    pub fn container_to_screen(
        &self,
        point: Coord<ContainerSpace>,
        container: ContainerRect,
    ) -> Coord<ContainerSpace> {
        let centre = Coord::new(container.width / 2.0, container.height / 2.0);
        let pan = Coord::new(self.pan_x, self.pan_y);
        centre + (point - centre) * self.zoom + pan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_steps_and_limits() {
        let mut view = ViewTransform::default();
        view.zoom_in();
        assert_eq!(view.zoom, 1.25);
        for _ in 0..20 {
            view.zoom_in();
        }
        assert_eq!(view.zoom, MAX_ZOOM);
        for _ in 0..20 {
            view.zoom_out();
        }
        assert_eq!(view.zoom, MIN_ZOOM);
        view.reset();
        assert_eq!(view, ViewTransform::default());
    }

    #[test]
    fn test_pan_requires_zoom_and_no_editing() {
        let mut view = ViewTransform::default();
        assert!(!view.pan_by(10.0, 10.0, false));
        assert_eq!(view.pan_x, 0.0);

        view.set_zoom(2.0);
        assert!(!view.pan_by(10.0, 10.0, true));
        assert!(view.pan_by(30.0, -500.0, false));
        assert_eq!(view.pan_x, 30.0);
        assert_eq!(view.pan_y, -100.0);
    }

    #[test]
    fn test_zooming_out_clamps_pan() {
        let mut view = ViewTransform::default();
        view.set_zoom(3.0);
        view.pan_by(180.0, 0.0, false);
        assert_eq!(view.pan_x, 180.0);
        view.set_zoom(1.5);
        assert_eq!(view.pan_x, 50.0);
        view.set_zoom(1.0);
        assert_eq!(view.pan_x, 0.0);
    }

    #[test]
    fn test_screen_mapping_is_invertible() {
        let container = ContainerRect::new(800.0, 600.0).unwrap();
        let mut view = ViewTransform::default();
        view.set_zoom(2.0);
        view.pan_by(40.0, -20.0, false);

        // Centre of the screen minus pan is the container centre
        let c = view.screen_to_container(Coord::new(440.0, 280.0), container);
        assert!((c.x - 400.0).abs() < 1e-9 && (c.y - 300.0).abs() < 1e-9);

        let p = Coord::new(123.0, 456.0);
        let back = view.container_to_screen(view.screen_to_container(p, container), container);
        assert!((back.x - p.x).abs() < 1e-9 && (back.y - p.y).abs() < 1e-9);
    }

    #[test]
    fn test_deserialize_clamps_zoom_and_pan() {
        let view: ViewTransform =
            serde_json::from_str(r#"{"zoom":9,"panX":500,"panY":0}"#).unwrap();
        assert_eq!(view.zoom, MAX_ZOOM);
        assert_eq!(view.pan_x, 200.0);
        assert_eq!(view.pan_y, 0.0);

        let unzoomed: ViewTransform = serde_json::from_str(r#"{"zoom":1,"panX":40}"#).unwrap();
        assert_eq!(unzoomed.pan_x, 0.0);
    }
}
