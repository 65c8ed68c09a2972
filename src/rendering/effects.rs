//! Raster effects on RGBA buffers.
//!
//! Blur has two paths: a [`BlurFilter`] (the `image` crate's gaussian by
//! default) and [`box_blur_rgba`], a pure-data box blur used whenever the
//! filter is unavailable or fails. Pixelate and mirror are pure-data only.

use image::RgbaImage;

use crate::error::{CamFrameError, CamFrameResult};

/// A blur primitive that may be unavailable on some targets.
pub trait BlurFilter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Blur `image` with the given radius in pixels.
    ///
    /// Returns `FilterUnsupported` when the primitive can't run; callers then
    /// fall back to [`box_blur_rgba`].
    fn blur(&self, image: &RgbaImage, radius: f32) -> CamFrameResult<RgbaImage>;
}

/// Gaussian blur from `image::imageops`. The radius is used as sigma.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeBlur;

impl BlurFilter for NativeBlur {
    fn name(&self) -> &'static str {
        "native-gaussian"
    }

    fn blur(&self, image: &RgbaImage, radius: f32) -> CamFrameResult<RgbaImage> {
        if !radius.is_finite() || radius <= 0.0 {
            return Ok(image.clone());
        }
        Ok(image::imageops::blur(image, radius))
    }
}

/// Filter that always reports itself unavailable. Forces the manual path.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledBlur;

impl BlurFilter for DisabledBlur {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn blur(&self, _image: &RgbaImage, _radius: f32) -> CamFrameResult<RgbaImage> {
        Err(CamFrameError::FilterUnsupported(
            "native blur disabled".to_string(),
        ))
    }
}

fn check_buffer(data: &[u8], width: u32, height: u32) -> CamFrameResult<()> {
    let expected = width as usize * height as usize * 4;
    if width == 0 || height == 0 || data.len() != expected {
        return Err(CamFrameError::InvalidDimensions(format!(
            "{}x{} buffer with {} bytes (expected {})",
            width,
            height,
            data.len(),
            expected
        )));
    }
    Ok(())
}

/// Box blur over raw RGBA.
///
/// Every output channel is the rounded mean of the same channel over the
/// `(2r+1)²` neighbourhood, shrunk at the edges to the pixels that exist.
/// Alpha is averaged like the colour channels.
pub fn box_blur_rgba(data: &[u8], width: u32, height: u32, radius: u32) -> CamFrameResult<Vec<u8>> {
    check_buffer(data, width, height)?;
    if radius == 0 {
        return Ok(data.to_vec());
    }

    let w = width as usize;
    let h = height as usize;
    let r = radius as usize;

    // Horizontal window sums (not averages, so the result rounds only once)
    let mut row_sums = vec![0u64; w * h * 4];
    let mut prefix = vec![0u64; (w + 1) * 4];
    for y in 0..h {
        let row = &data[y * w * 4..(y + 1) * w * 4];
        for x in 0..w {
            for c in 0..4 {
                prefix[(x + 1) * 4 + c] = prefix[x * 4 + c] + row[x * 4 + c] as u64;
            }
        }
        for x in 0..w {
            let lo = x.saturating_sub(r);
            let hi = (x + r).min(w - 1) + 1;
            for c in 0..4 {
                row_sums[(y * w + x) * 4 + c] = prefix[hi * 4 + c] - prefix[lo * 4 + c];
            }
        }
    }

    // Vertical pass over the row sums
    let mut output = vec![0u8; w * h * 4];
    let mut col_prefix = vec![0u64; (h + 1) * 4];
    for x in 0..w {
        let count_x = ((x + r).min(w - 1) + 1 - x.saturating_sub(r)) as u64;
        for y in 0..h {
            for c in 0..4 {
                col_prefix[(y + 1) * 4 + c] = col_prefix[y * 4 + c] + row_sums[(y * w + x) * 4 + c];
            }
        }
        for y in 0..h {
            let lo = y.saturating_sub(r);
            let hi = (y + r).min(h - 1) + 1;
            let count = count_x * (hi - lo) as u64;
            for c in 0..4 {
                let sum = col_prefix[hi * 4 + c] - col_prefix[lo * 4 + c];
                output[(y * w + x) * 4 + c] = ((sum + count / 2) / count) as u8;
            }
        }
    }

    Ok(output)
}

/// Nearest-neighbour resample of an RGBA buffer (no smoothing).
pub fn resample_nearest(
    data: &[u8],
    src_w: u32,
    src_h: u32,
    dst_w: u32,
    dst_h: u32,
) -> CamFrameResult<Vec<u8>> {
    check_buffer(data, src_w, src_h)?;
    if dst_w == 0 || dst_h == 0 {
        return Err(CamFrameError::InvalidDimensions(format!(
            "resample target {}x{}",
            dst_w, dst_h
        )));
    }

    let mut output = vec![0u8; dst_w as usize * dst_h as usize * 4];
    for dst_y in 0..dst_h {
        let src_y = (dst_y as u64 * src_h as u64 / dst_h as u64) as usize;
        for dst_x in 0..dst_w {
            let src_x = (dst_x as u64 * src_w as u64 / dst_w as u64) as usize;
            let src_idx = (src_y * src_w as usize + src_x) * 4;
            let dst_idx = (dst_y as usize * dst_w as usize + dst_x as usize) * 4;
            output[dst_idx..dst_idx + 4].copy_from_slice(&data[src_idx..src_idx + 4]);
        }
    }
    Ok(output)
}

/// Pixelate by shrinking to `floor(size / block)` (at least 1) and growing
/// back, both with nearest sampling.
pub fn pixelate_rgba(data: &[u8], width: u32, height: u32, block: u32) -> CamFrameResult<Vec<u8>> {
    check_buffer(data, width, height)?;
    let block = block.max(1);
    if block == 1 {
        return Ok(data.to_vec());
    }

    let small_w = (width / block).max(1);
    let small_h = (height / block).max(1);
    let small = resample_nearest(data, width, height, small_w, small_h)?;
    resample_nearest(&small, small_w, small_h, width, height)
}

/// Flip an RGBA buffer left-to-right in place.
pub fn mirror_horizontal(rgba: &mut [u8], width: u32, height: u32) {
    let row_size = (width * 4) as usize;
    for y in 0..height as usize {
        let row_start = y * row_size;
        let Some(row) = rgba.get_mut(row_start..row_start + row_size) else {
            return;
        };
        for x in 0..(width / 2) as usize {
            let left_idx = x * 4;
            let right_idx = (width as usize - 1 - x) * 4;
            for i in 0..4 {
                row.swap(left_idx + i, right_idx + i);
            }
        }
    }
}
