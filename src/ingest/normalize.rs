//! Raw camera buffers to RGBA.

use anyhow::{anyhow, Result};
use image::{DynamicImage, Rgba, RgbImage, RgbaImage};

/// Layout of a raw camera buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(not(feature = "ingest-v4l2"), allow(dead_code))]
pub(crate) enum PixelFormat {
    /// Packed 8-bit R, G, B.
    Rgb24,
    /// Full-resolution Y plane followed by interleaved half-resolution UV.
    Nv12,
}

impl PixelFormat {
    fn frame_len(self, width: u32, height: u32) -> Option<usize> {
        let pixels = (width as usize).checked_mul(height as usize)?;
        match self {
            PixelFormat::Rgb24 => pixels.checked_mul(3),
            PixelFormat::Nv12 => pixels.checked_add(pixels / 2),
        }
    }
}

/// Convert a raw camera buffer into an opaque RGBA image.
pub(crate) fn normalize_to_rgba(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<RgbaImage> {
    let expected = format
        .frame_len(width, height)
        .ok_or_else(|| anyhow!("{:?} frame dimensions overflow", format))?;
    if pixels.len() != expected {
        return Err(anyhow!(
            "{:?} frame length mismatch: expected {}, got {}",
            format,
            expected,
            pixels.len()
        ));
    }

    match format {
        PixelFormat::Rgb24 => {
            let rgb = RgbImage::from_raw(width, height, pixels.to_vec())
                .ok_or_else(|| anyhow!("RGB buffer does not match {}x{}", width, height))?;
            Ok(DynamicImage::ImageRgb8(rgb).to_rgba8())
        }
        PixelFormat::Nv12 => Ok(nv12_to_rgba(pixels, width, height)),
    }
}

/// BT.601 full-range conversion. `pixels` must already be length-checked.
fn nv12_to_rgba(pixels: &[u8], width: u32, height: u32) -> RgbaImage {
    let stride = width as usize;
    let (luma, chroma) = pixels.split_at(stride * height as usize);
    RgbaImage::from_fn(width, height, |x, y| {
        let (x, y) = (x as usize, y as usize);
        let luma = luma[y * stride + x] as f32;
        let pair = (y / 2) * stride + (x / 2) * 2;
        let cb = chroma[pair] as f32 - 128.0;
        let cr = chroma[pair + 1] as f32 - 128.0;
        Rgba([
            to_channel(luma + 1.402 * cr),
            to_channel(luma - 0.344_136 * cb - 0.714_136 * cr),
            to_channel(luma + 1.772 * cb),
            255,
        ])
    })
}

fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_chroma_is_gray() -> Result<()> {
        let mut nv12 = vec![200u8; 4];
        nv12.extend_from_slice(&[128, 128]);
        let rgba = normalize_to_rgba(&nv12, 2, 2, PixelFormat::Nv12)?;
        assert!(rgba.pixels().all(|px| px.0 == [200, 200, 200, 255]));
        Ok(())
    }

    #[test]
    fn red_chroma_pushes_red_channel() -> Result<()> {
        let mut nv12 = vec![100u8; 4];
        nv12.extend_from_slice(&[128, 228]);
        let rgba = normalize_to_rgba(&nv12, 2, 2, PixelFormat::Nv12)?;
        let px = rgba.get_pixel(1, 1).0;
        assert!(px[0] > px[1] && px[0] > px[2]);
        Ok(())
    }

    #[test]
    fn rgb_gains_opaque_alpha() -> Result<()> {
        let pixels = vec![1u8, 2, 3, 4, 5, 6, 7, 8, 9];
        let rgba = normalize_to_rgba(&pixels, 1, 3, PixelFormat::Rgb24)?;
        assert_eq!(rgba.get_pixel(0, 2).0, [7, 8, 9, 255]);
        Ok(())
    }

    #[test]
    fn lengths_are_checked() {
        assert!(normalize_to_rgba(&[0u8; 8], 1, 3, PixelFormat::Rgb24).is_err());
        assert!(normalize_to_rgba(&[0u8; 4], 2, 2, PixelFormat::Nv12).is_err());
    }
}
