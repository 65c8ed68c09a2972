//! Frame manipulation operations.
//!
//! Cropping to a mapped region and fitting processed frames onto the export
//! canvas.

use super::super::region::PixelBounds;
use super::super::types::Frame;
use crate::error::{CamFrameError, CamFrameResult};

/// Clamp crop bounds to the frame.
fn clamp_bounds(bounds: PixelBounds, frame_width: u32, frame_height: u32) -> PixelBounds {
    let x = bounds.x.min(frame_width.saturating_sub(1));
    let y = bounds.y.min(frame_height.saturating_sub(1));
    PixelBounds {
        x,
        y,
        width: bounds.width.min(frame_width.saturating_sub(x)),
        height: bounds.height.min(frame_height.saturating_sub(y)),
    }
}

/// Extract a cropped region from RGBA frame data.
///
/// Bounds are clamped to the frame. Returns the cropped RGBA data with proper
/// row ordering.
pub fn extract_crop_region(
    frame_data: &[u8],
    frame_width: u32,
    frame_height: u32,
    bounds: PixelBounds,
) -> CamFrameResult<Vec<u8>> {
    let PixelBounds {
        x: crop_x,
        y: crop_y,
        width: crop_width,
        height: crop_height,
    } = clamp_bounds(bounds, frame_width, frame_height);

    if crop_width == 0 || crop_height == 0 {
        log::warn!(
            "[CROP] Invalid crop region: {}x{} at ({}, {})",
            crop_width,
            crop_height,
            crop_x,
            crop_y
        );
        return Err(CamFrameError::InvalidDimensions(format!(
            "crop {}x{} at ({}, {})",
            crop_width, crop_height, crop_x, crop_y
        )));
    }

    let mut output = Vec::with_capacity((crop_width * crop_height * 4) as usize);
    let src_stride = (frame_width * 4) as usize;
    let crop_stride = (crop_width * 4) as usize;

    for row in 0..crop_height {
        let src_y = crop_y + row;
        let src_row_start = (src_y as usize * src_stride) + (crop_x as usize * 4);
        let src_row_end = src_row_start + crop_stride;

        match frame_data.get(src_row_start..src_row_end) {
            Some(src_row) => output.extend_from_slice(src_row),
            None => {
                return Err(CamFrameError::InvalidDimensions(format!(
                    "{}x{} frame buffer too small for row {}",
                    frame_width, frame_height, src_y
                )))
            }
        }
    }

    Ok(output)
}

/// Crop a frame to `bounds`, keeping its frame number and timestamp.
pub fn crop_frame(frame: &Frame, bounds: PixelBounds) -> CamFrameResult<Frame> {
    let data = extract_crop_region(&frame.data, frame.width, frame.height, bounds)?;
    let PixelBounds { width, height, .. } = clamp_bounds(bounds, frame.width, frame.height);
    Ok(Frame {
        frame_number: frame.frame_number,
        timestamp_ms: frame.timestamp_ms,
        data,
        width,
        height,
    })
}

/// Scale a frame to COVER target dimensions (crop to fill, like CSS
/// object-fit: cover).
///
/// Unlike FIT (contain), this crops the source to match the output aspect
/// ratio, so the whole export canvas is filled with no black bars.
pub fn scale_frame_to_fill(frame: &Frame, target_w: u32, target_h: u32) -> Frame {
    let src_w = frame.width as f32;
    let src_h = frame.height as f32;
    let target_w_f = target_w as f32;
    let target_h_f = target_h as f32;

    // Black canvas; stays black for any pixel that can't be sampled
    let mut output: Vec<u8> = [0u8, 0, 0, 255]
        .iter()
        .copied()
        .cycle()
        .take((target_w * target_h * 4) as usize)
        .collect();

    if frame.width == 0 || frame.height == 0 || target_w == 0 || target_h == 0 {
        return Frame {
            frame_number: frame.frame_number,
            timestamp_ms: frame.timestamp_ms,
            data: output,
            width: target_w,
            height: target_h,
        };
    }

    let src_aspect = src_w / src_h;
    let target_aspect = target_w_f / target_h_f;

    // Crop the minimum amount needed to fill the output
    let (crop_x, crop_y, crop_w, crop_h) = if src_aspect > target_aspect {
        // Source is wider than target - crop left and right
        let visible_width = src_h * target_aspect;
        let crop_x = (src_w - visible_width) / 2.0;
        (crop_x, 0.0, visible_width, src_h)
    } else {
        // Source is taller than target - crop top and bottom
        let visible_height = src_w / target_aspect;
        let crop_y = (src_h - visible_height) / 2.0;
        (0.0, crop_y, src_w, visible_height)
    };

    let scale_x = target_w_f / crop_w;
    let scale_y = target_h_f / crop_h;

    // Simple nearest-neighbor scaling from cropped region
    for dst_y in 0..target_h {
        for dst_x in 0..target_w {
            let src_x = (crop_x + (dst_x as f32 / scale_x)) as u32;
            let src_y = (crop_y + (dst_y as f32 / scale_y)) as u32;

            if src_x < frame.width && src_y < frame.height {
                let src_idx = ((src_y * frame.width + src_x) * 4) as usize;
                let dst_idx = ((dst_y * target_w + dst_x) * 4) as usize;

                if src_idx + 3 < frame.data.len() && dst_idx + 3 < output.len() {
                    output[dst_idx..dst_idx + 4].copy_from_slice(&frame.data[src_idx..src_idx + 4]);
                }
            }
        }
    }

    Frame {
        frame_number: frame.frame_number,
        timestamp_ms: frame.timestamp_ms,
        data: output,
        width: target_w,
        height: target_h,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indexed_frame(width: u32, height: u32) -> Frame {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8, y as u8, 0, 255]);
            }
        }
        Frame::new(7, 233, data, width, height).unwrap()
    }

    #[test]
    fn test_crop_frame_keeps_metadata() {
        let frame = indexed_frame(20, 10);
        let cropped = crop_frame(
            &frame,
            PixelBounds {
                x: 5,
                y: 2,
                width: 7,
                height: 3,
            },
        )
        .unwrap();
        assert_eq!((cropped.width, cropped.height), (7, 3));
        assert_eq!(cropped.frame_number, 7);
        assert_eq!(cropped.timestamp_ms, 233);
        assert_eq!(cropped.pixel(0, 0), Some([5, 2, 0, 255]));
        assert_eq!(cropped.pixel(6, 2), Some([11, 4, 0, 255]));
    }

    #[test]
    fn test_crop_is_clamped_to_frame() {
        let frame = indexed_frame(10, 10);
        let cropped = crop_frame(
            &frame,
            PixelBounds {
                x: 8,
                y: 0,
                width: 50,
                height: 4,
            },
        )
        .unwrap();
        assert_eq!((cropped.width, cropped.height), (2, 4));
        assert_eq!(cropped.data.len(), 2 * 4 * 4);
    }

    #[test]
    fn test_cover_fit_crops_sides() {
        // 20x10 into 10x10: middle 10 columns survive
        let frame = indexed_frame(20, 10);
        let fitted = scale_frame_to_fill(&frame, 10, 10);
        assert_eq!((fitted.width, fitted.height), (10, 10));
        assert_eq!(fitted.pixel(0, 0), Some([5, 0, 0, 255]));
        assert_eq!(fitted.pixel(9, 9), Some([14, 9, 0, 255]));
    }

    #[test]
    fn test_cover_fit_upscales() {
        let frame = Frame::solid(2, 2, [9, 8, 7, 255]);
        let fitted = scale_frame_to_fill(&frame, 6, 4);
        assert!(fitted.data.chunks_exact(4).all(|p| p == [9, 8, 7, 255]));
    }
}
