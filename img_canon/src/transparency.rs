//! Transparency classification.

use crate::image_handle::{ImageHandle, PixelMode};
use image::DynamicImage;

/// Whether the image has at least one pixel that is not fully opaque.
///
/// Palette images only count when a transparent index is declared; since the
/// decoder maps that index to alpha below 255, "the index is used" is the same
/// as "some expanded pixel is not opaque".
pub fn has_transparency(handle: &ImageHandle) -> bool {
    match handle.mode {
        PixelMode::Indexed {
            transparent_index: None,
        } => false,
        PixelMode::Indexed {
            transparent_index: Some(_),
        } => has_translucent_pixel(&handle.image),
        PixelMode::Rgba | PixelMode::Other(_) => has_translucent_pixel(&handle.image),
        PixelMode::Rgb => false,
    }
}

/// True when the layout carries alpha and its minimum is below fully opaque.
pub fn has_translucent_pixel(image: &DynamicImage) -> bool {
    match image {
        DynamicImage::ImageRgba8(buf) => buf.pixels().any(|p| p[3] < u8::MAX),
        DynamicImage::ImageLumaA8(buf) => buf.pixels().any(|p| p[1] < u8::MAX),
        DynamicImage::ImageRgba16(buf) => buf.pixels().any(|p| p[3] < u16::MAX),
        DynamicImage::ImageLumaA16(buf) => buf.pixels().any(|p| p[1] < u16::MAX),
        DynamicImage::ImageRgba32F(buf) => buf.pixels().any(|p| p[3] < 1.0),
        other if other.color().has_alpha() => other.to_rgba16().pixels().any(|p| p[3] < u16::MAX),
        _ => false,
    }
}
