//! Type-safe coordinate spaces for region mapping.
//!
//! Every selection rectangle passes through three spaces:
//!
//! ```text
//! ContainerUVSpace → ContainerSpace → FrameSpace
//! ```
//!
//! - `ContainerUVSpace`: fractions (0.0-1.0) of the rendering container.
//! - `ContainerSpace`: container pixels, letterbox/pillarbox bars included.
//! - `FrameSpace`: pixels of the source video frame.
//!
//! Each space is a phantom type so a container coordinate can never be handed
//! to a raster operation that expects frame pixels.

use std::marker::PhantomData;
use std::ops::{Add, Mul, Sub};

/// Normalized container coordinates (0.0-1.0).
#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct ContainerUVSpace;

/// Pixel coordinates inside the rendering container.
/// `(0, 0)` is the container's top-left, which may lie in a letterbox bar.
#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct ContainerSpace;

/// Pixel coordinates of the source frame.
/// `(0, 0)` is the top-left pixel of the captured image.
#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct FrameSpace;

/// A 2D coordinate tagged with its space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Coord<TSpace> {
    pub x: f64,
    pub y: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> Coord<TSpace> {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            _space: PhantomData,
        }
    }

    pub fn as_tuple(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Clamp each axis into `[min, max]`.
    pub fn clamp(self, min: Coord<TSpace>, max: Coord<TSpace>) -> Self {
        Self::new(self.x.clamp(min.x, max.x), self.y.clamp(min.y, max.y))
    }
}

impl Coord<ContainerUVSpace> {
    /// Scale fractions to container pixels.
    pub fn to_container_space(&self, container: Size<ContainerSpace>) -> Coord<ContainerSpace> {
        Coord::new(self.x * container.width, self.y * container.height)
    }
}

impl Coord<ContainerSpace> {
    /// Express container pixels as fractions of the container.
    pub fn to_uv_space(&self, container: Size<ContainerSpace>) -> Coord<ContainerUVSpace> {
        Coord::new(self.x / container.width, self.y / container.height)
    }
}

impl<T> Add for Coord<T> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl<T> Sub for Coord<T> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl<T> Mul<f64> for Coord<T> {
    type Output = Self;
    fn mul(self, scalar: f64) -> Self {
        Self::new(self.x * scalar, self.y * scalar)
    }
}

/// Size in a specific coordinate space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size<TSpace> {
    pub width: f64,
    pub height: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> Size<TSpace> {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            _space: PhantomData,
        }
    }

    pub fn from_u32(width: u32, height: u32) -> Self {
        Self::new(width as f64, height as f64)
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }

    /// Scale both axes independently.
    pub fn scale(&self, sx: f64, sy: f64) -> Self {
        Self::new(self.width * sx, self.height * sy)
    }
}

impl Size<ContainerUVSpace> {
    pub fn to_container_space(&self, container: Size<ContainerSpace>) -> Size<ContainerSpace> {
        Size::new(self.width * container.width, self.height * container.height)
    }
}

impl Size<ContainerSpace> {
    pub fn to_uv_space(&self, container: Size<ContainerSpace>) -> Size<ContainerUVSpace> {
        Size::new(self.width / container.width, self.height / container.height)
    }
}

/// A rectangular region in a specific coordinate space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect<TSpace> {
    pub origin: Coord<TSpace>,
    pub size: Size<TSpace>,
}

impl<TSpace: Copy> Rect<TSpace> {
    pub fn new(origin: Coord<TSpace>, size: Size<TSpace>) -> Self {
        Self { origin, size }
    }

    pub fn from_coords(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(Coord::new(x, y), Size::new(width, height))
    }

    pub fn bottom_right(&self) -> Coord<TSpace> {
        Coord::new(
            self.origin.x + self.size.width,
            self.origin.y + self.size.height,
        )
    }

    pub fn center(&self) -> Coord<TSpace> {
        Coord::new(
            self.origin.x + self.size.width / 2.0,
            self.origin.y + self.size.height / 2.0,
        )
    }

    pub fn contains(&self, point: Coord<TSpace>) -> bool {
        point.x >= self.origin.x
            && point.x <= self.origin.x + self.size.width
            && point.y >= self.origin.y
            && point.y <= self.origin.y + self.size.height
    }

    /// Whether `other` lies entirely inside this rect (with tolerance).
    pub fn contains_rect(&self, other: &Rect<TSpace>, epsilon: f64) -> bool {
        let br = self.bottom_right();
        let other_br = other.bottom_right();
        other.origin.x >= self.origin.x - epsilon
            && other.origin.y >= self.origin.y - epsilon
            && other_br.x <= br.x + epsilon
            && other_br.y <= br.y + epsilon
    }
}

impl Rect<ContainerUVSpace> {
    pub fn to_container_space(&self, container: Size<ContainerSpace>) -> Rect<ContainerSpace> {
        Rect::new(
            self.origin.to_container_space(container),
            self.size.to_container_space(container),
        )
    }
}

impl Rect<ContainerSpace> {
    pub fn to_uv_space(&self, container: Size<ContainerSpace>) -> Rect<ContainerUVSpace> {
        Rect::new(
            self.origin.to_uv_space(container),
            self.size.to_uv_space(container),
        )
    }
}
