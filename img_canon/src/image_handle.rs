//! Decoded image plus the facts about its source the conversion rules need.

use crate::formats::{self, HeaderInfo};
use image::{ColorType, DynamicImage, ImageError, ImageFormat, ImageReader};
use shared_utils::img_errors::{CanonError, Result};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Storage layout of the source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelMode {
    /// Palette-indexed; the decoder has already expanded it.
    Indexed { transparent_index: Option<u8> },
    Rgb,
    Rgba,
    /// Any other decoded layout (grey, 16-bit, float).
    Other(ColorType),
}

impl PixelMode {
    fn from_color(color: ColorType) -> Self {
        match color {
            ColorType::Rgb8 => PixelMode::Rgb,
            ColorType::Rgba8 => PixelMode::Rgba,
            other => PixelMode::Other(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Rle,
    /// The container has no RLE notion, or the header could not be read.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatMetadata {
    pub format: Option<ImageFormat>,
    pub compression: Compression,
}

impl FormatMetadata {
    pub fn unknown() -> Self {
        Self {
            format: None,
            compression: Compression::Unknown,
        }
    }
}

/// An image owned by the worker processing it.
#[derive(Debug, Clone)]
pub struct ImageHandle {
    pub source_path: Option<PathBuf>,
    pub image: DynamicImage,
    pub mode: PixelMode,
    pub metadata: FormatMetadata,
}

impl ImageHandle {
    /// Wraps an in-memory image with no source; mode follows the pixel layout.
    pub fn from_image(image: DynamicImage) -> Self {
        Self {
            mode: PixelMode::from_color(image.color()),
            source_path: None,
            image,
            metadata: FormatMetadata::unknown(),
        }
    }

    /// Reads and decodes `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::decode(&bytes, Some(path))
    }

    /// Decodes `bytes`. The extension of `path` picks the decoder for
    /// formats without a magic number (TGA); content sniffing wins otherwise.
    pub fn decode(bytes: &[u8], path: Option<&Path>) -> Result<Self> {
        let display_path = || path.map(Path::to_path_buf).unwrap_or_default();

        let mut reader = ImageReader::new(Cursor::new(bytes));
        if let Some(format) = path.and_then(|p| ImageFormat::from_path(p).ok()) {
            reader.set_format(format);
        }
        let reader = reader.with_guessed_format()?;
        let format = reader.format().ok_or_else(|| CanonError::Unreadable {
            path: display_path(),
            reason: "unrecognized image format".to_string(),
        })?;
        // decoding reads from memory, so an I/O error means a truncated stream
        let image = reader.decode().map_err(|e| match e {
            ImageError::IoError(io) => CanonError::Unreadable {
                path: display_path(),
                reason: io.to_string(),
            },
            other => CanonError::Image(other),
        })?;

        let header = formats::sniff(format, bytes);
        let mode = classify_mode(&image, format, &header);
        let compression = match header.rle {
            Some(true) => Compression::Rle,
            Some(false) => Compression::None,
            None => Compression::Unknown,
        };

        tracing::trace!(
            path = ?path,
            ?format,
            ?mode,
            ?compression,
            width = image.width(),
            height = image.height(),
            "Decoded image"
        );

        Ok(Self {
            source_path: path.map(Path::to_path_buf),
            image,
            mode,
            metadata: FormatMetadata {
                format: Some(format),
                compression,
            },
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Palette storage counts as `Indexed` unless the decoded pixels carry alpha
/// the header does not explain: colour-mapped TGA/BMP files with an alpha
/// palette keep their decoded layout so that alpha is never discarded. GIF
/// always decodes to RGBA, so it stays `Indexed` regardless.
fn classify_mode(image: &DynamicImage, format: ImageFormat, header: &HeaderInfo) -> PixelMode {
    if !header.palette {
        return PixelMode::from_color(image.color());
    }
    let alpha_explained = header.declares_transparency || format == ImageFormat::Gif;
    if image.color().has_alpha() && !alpha_explained {
        return PixelMode::from_color(image.color());
    }
    PixelMode::Indexed {
        transparent_index: header.transparent_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_decode_rgb_png() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 2, Rgb([1, 2, 3])));
        let bytes = encode(&img, ImageFormat::Png);
        let handle = ImageHandle::decode(&bytes, Some(Path::new("a.png"))).unwrap();
        assert_eq!(handle.mode, PixelMode::Rgb);
        assert_eq!(handle.metadata.format, Some(ImageFormat::Png));
        assert_eq!(handle.metadata.compression, Compression::Unknown);
        assert_eq!((handle.width(), handle.height()), (3, 2));
        assert_eq!(handle.source_path.as_deref(), Some(Path::new("a.png")));
    }

    #[test]
    fn test_decode_tga_uses_extension_hint() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([9, 9, 9, 128])));
        let bytes = encode(&img, ImageFormat::Tga);
        let handle = ImageHandle::decode(&bytes, Some(Path::new("icon.TGA"))).unwrap();
        assert_eq!(handle.mode, PixelMode::Rgba);
        assert_eq!(handle.metadata.format, Some(ImageFormat::Tga));
        assert_eq!(handle.metadata.compression, Compression::Rle);
    }

    #[test]
    fn test_decode_content_beats_wrong_extension() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(2, 2));
        let bytes = encode(&img, ImageFormat::Png);
        let handle = ImageHandle::decode(&bytes, Some(Path::new("mislabelled.bmp"))).unwrap();
        assert_eq!(handle.metadata.format, Some(ImageFormat::Png));
    }

    #[test]
    fn test_decode_garbage_is_unreadable() {
        let err = ImageHandle::decode(b"definitely not an image", Some(Path::new("bad.png")))
            .unwrap_err();
        assert!(err.is_unreadable(), "unexpected error: {:?}", err);
    }

    #[test]
    fn test_from_image_has_no_path() {
        let handle = ImageHandle::from_image(DynamicImage::ImageLuma8(image::GrayImage::new(1, 1)));
        assert!(handle.source_path.is_none());
        assert_eq!(handle.mode, PixelMode::Other(ColorType::L8));
    }

    #[test]
    fn test_classify_gif_like_palette() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::new(1, 1));
        let header = HeaderInfo {
            palette: true,
            declares_transparency: true,
            transparent_index: Some(3),
            rle: None,
        };
        assert_eq!(
            classify_mode(&rgba, ImageFormat::Gif, &header),
            PixelMode::Indexed { transparent_index: Some(3) }
        );

        let no_trns = HeaderInfo {
            palette: true,
            ..HeaderInfo::default()
        };
        assert_eq!(
            classify_mode(&rgba, ImageFormat::Gif, &no_trns),
            PixelMode::Indexed { transparent_index: None }
        );
    }

    #[test]
    fn test_classify_colour_mapped_tga_with_alpha_keeps_rgba() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::new(1, 1));
        let header = HeaderInfo {
            palette: true,
            rle: Some(false),
            ..HeaderInfo::default()
        };
        assert_eq!(classify_mode(&rgba, ImageFormat::Tga, &header), PixelMode::Rgba);

        let rgb = DynamicImage::ImageRgb8(RgbImage::new(1, 1));
        assert_eq!(
            classify_mode(&rgb, ImageFormat::Bmp, &header),
            PixelMode::Indexed { transparent_index: None }
        );
    }
}
