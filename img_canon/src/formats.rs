//! Container header sniffing
//!
//! The decoder expands palettes and forgets how the file was stored, so the
//! bits the conversion rules depend on are read straight from the header
//! bytes: palette storage, declared transparency and RLE compression.

use image::ImageFormat;

/// Storage facts recovered from a file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeaderInfo {
    /// Pixels are stored as palette indices.
    pub palette: bool,
    /// The file declares transparency (PNG `tRNS`, GIF transparent index).
    pub declares_transparency: bool,
    /// First palette index declared (partially) transparent.
    pub transparent_index: Option<u8>,
    /// `Some(true)` for run-length-encoded pixel data, `None` when the
    /// container has no such notion.
    pub rle: Option<bool>,
}

/// Reads the header facts for `format`; unknown layouts yield the default.
pub fn sniff(format: ImageFormat, bytes: &[u8]) -> HeaderInfo {
    match format {
        ImageFormat::Png => png::sniff(bytes),
        ImageFormat::Gif => gif::sniff(bytes),
        ImageFormat::Tga => tga::sniff(bytes),
        ImageFormat::Bmp => bmp::sniff(bytes),
        _ => HeaderInfo::default(),
    }
}

/// PNG: IHDR colour type and `tRNS` chunk.
pub mod png {
    use super::HeaderInfo;

    const SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";
    const COLOR_TYPE_PALETTE: u8 = 3;

    pub fn sniff(bytes: &[u8]) -> HeaderInfo {
        let mut info = HeaderInfo::default();
        if bytes.len() < 33 || &bytes[..8] != SIGNATURE || &bytes[12..16] != b"IHDR" {
            return info;
        }
        info.palette = bytes[25] == COLOR_TYPE_PALETTE;

        // chunk = length(4) + type(4) + data(length) + crc(4)
        let mut pos = 8usize;
        while pos + 8 <= bytes.len() {
            let len = u32::from_be_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]])
                as usize;
            let kind = &bytes[pos + 4..pos + 8];
            let data_start = pos + 8;

            match kind {
                b"tRNS" => {
                    info.declares_transparency = true;
                    if info.palette {
                        let data_end = data_start.saturating_add(len).min(bytes.len());
                        info.transparent_index = bytes[data_start..data_end]
                            .iter()
                            .position(|&alpha| alpha < 255)
                            .map(|i| i as u8);
                    }
                    break;
                }
                b"IDAT" | b"IEND" => break,
                _ => {}
            }

            pos = match data_start.checked_add(len).and_then(|p| p.checked_add(4)) {
                Some(next) => next,
                None => break,
            };
        }
        info
    }
}

/// GIF: graphic control extension of the first frame.
pub mod gif {
    use super::HeaderInfo;

    const EXTENSION: u8 = 0x21;
    const GRAPHIC_CONTROL: u8 = 0xF9;
    const IMAGE_DESCRIPTOR: u8 = 0x2C;
    const TRAILER: u8 = 0x3B;

    fn color_table_len(packed: u8) -> usize {
        if packed & 0x80 != 0 {
            3 * (1usize << ((packed & 0x07) + 1))
        } else {
            0
        }
    }

    /// Skips a data sub-block chain starting at `pos`; returns the position
    /// after the zero terminator.
    fn skip_sub_blocks(bytes: &[u8], mut pos: usize) -> Option<usize> {
        loop {
            let size = *bytes.get(pos)? as usize;
            pos += 1;
            if size == 0 {
                return Some(pos);
            }
            pos += size;
        }
    }

    pub fn sniff(bytes: &[u8]) -> HeaderInfo {
        let mut info = HeaderInfo {
            palette: true,
            ..HeaderInfo::default()
        };
        if bytes.len() < 13 || !(bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a")) {
            info.palette = false;
            return info;
        }

        let mut pos = 13 + color_table_len(bytes[10]);
        while let Some(&marker) = bytes.get(pos) {
            match marker {
                EXTENSION => {
                    let label = match bytes.get(pos + 1) {
                        Some(&l) => l,
                        None => break,
                    };
                    if label == GRAPHIC_CONTROL && pos + 7 <= bytes.len() {
                        // block size(1) packed(1) delay(2) transparent index(1)
                        let packed = bytes[pos + 3];
                        if packed & 0x01 != 0 {
                            info.declares_transparency = true;
                            info.transparent_index = Some(bytes[pos + 6]);
                        }
                    }
                    pos = match skip_sub_blocks(bytes, pos + 2) {
                        Some(next) => next,
                        None => break,
                    };
                }
                IMAGE_DESCRIPTOR | TRAILER => break,
                _ => break,
            }
        }
        info
    }
}

/// TGA: colour-map type and image type bytes.
pub mod tga {
    use super::HeaderInfo;

    const COLOR_MAPPED: u8 = 1;
    const RLE_COLOR_MAPPED: u8 = 9;

    pub fn sniff(bytes: &[u8]) -> HeaderInfo {
        if bytes.len() < 18 {
            return HeaderInfo::default();
        }
        let image_type = bytes[2];
        HeaderInfo {
            palette: matches!(image_type, COLOR_MAPPED | RLE_COLOR_MAPPED),
            rle: Some(matches!(image_type, 9..=11)),
            ..HeaderInfo::default()
        }
    }

    /// True when `bytes` is a TGA whose pixel data is run-length encoded.
    pub fn is_rle(bytes: &[u8]) -> bool {
        sniff(bytes).rle == Some(true)
    }
}

/// BMP: BITMAPINFOHEADER bit count and compression.
pub mod bmp {
    use super::HeaderInfo;

    const BI_RLE8: u32 = 1;
    const BI_RLE4: u32 = 2;

    pub fn sniff(bytes: &[u8]) -> HeaderInfo {
        if bytes.len() < 34 || !bytes.starts_with(b"BM") {
            return HeaderInfo::default();
        }
        let bit_count = u16::from_le_bytes([bytes[28], bytes[29]]);
        let compression = u32::from_le_bytes([bytes[30], bytes[31], bytes[32], bytes[33]]);
        HeaderInfo {
            palette: bit_count <= 8,
            rle: Some(matches!(compression, BI_RLE8 | BI_RLE4)),
            ..HeaderInfo::default()
        }
    }
}
