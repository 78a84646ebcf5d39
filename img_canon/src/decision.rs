//! Format decision engine.
//!
//! Opaque images become 8-bit RGB PNG, transparent ones 8-bit RGBA TGA with
//! RLE. A file already in its canonical form is left alone, and an unrelated
//! file sitting at the canonical path is never overwritten unless the config
//! says so.

use crate::config::{CanonConfig, CollisionPolicy, TargetFormat};
use crate::image_handle::{Compression, ImageHandle, PixelMode};
use crate::persist::{save_image, save_image_new, SaveOutcome};
use crate::transparency::has_transparency;
use image::DynamicImage;
use shared_utils::common_utils::{
    append_to_stem, get_dotted_extension_lowercase, path_stem, same_logical_path,
};
use shared_utils::img_errors::{CanonError, Result};

/// True when `handle` already has the pixel mode and compression `target`
/// requires. The extension is checked separately.
pub fn is_canonical_for(handle: &ImageHandle, target: TargetFormat) -> bool {
    match target {
        TargetFormat::Png => handle.mode == PixelMode::Rgb,
        TargetFormat::Tga => {
            handle.mode == PixelMode::Rgba && handle.metadata.compression == Compression::Rle
        }
    }
}

fn coerce(image: DynamicImage, target: TargetFormat) -> DynamicImage {
    match (target, image) {
        (TargetFormat::Png, img @ DynamicImage::ImageRgb8(_)) => img,
        (TargetFormat::Png, img) => DynamicImage::ImageRgb8(img.to_rgb8()),
        (TargetFormat::Tga, img @ DynamicImage::ImageRgba8(_)) => img,
        (TargetFormat::Tga, img) => DynamicImage::ImageRgba8(img.to_rgba8()),
    }
}

/// Resaves `handle` in its canonical format beside the source.
///
/// Returns [`SaveOutcome::NoOp`] when the source is already canonical.
///
/// # Errors
/// - [`CanonError::NotFound`] if the handle has no source path.
/// - [`CanonError::AlreadyExists`] if a different file already occupies the
///   canonical path and the collision policy is `Refuse`.
pub fn resave_img(handle: ImageHandle, config: &CanonConfig) -> Result<SaveOutcome> {
    let source = handle.source_path.as_deref().ok_or(CanonError::NotFound)?;
    let ext = get_dotted_extension_lowercase(source);
    let transparent = has_transparency(&handle);
    let target = config.target_for(transparent);
    let target_ext = target.extension();

    if ext == target_ext && is_canonical_for(&handle, target) {
        tracing::trace!(source = %source.display(), "Already canonical");
        return Ok(SaveOutcome::NoOp);
    }

    let stem = path_stem(source);
    let target_path = append_to_stem(&stem, target_ext);
    // `foo.PNG` -> `foo.png` is a new file on case-sensitive filesystems
    let in_place = same_logical_path(source, &target_path);

    if !in_place && target_path.exists() {
        match config.collision_policy {
            CollisionPolicy::Refuse => return Err(CanonError::AlreadyExists(target_path)),
            CollisionPolicy::Overwrite => {
                tracing::warn!(
                    source = %source.display(),
                    target = %target_path.display(),
                    "Overwriting existing file"
                );
            }
        }
    }

    tracing::debug!(
        source = %source.display(),
        transparent,
        mode = ?handle.mode,
        target = target_ext,
        in_place,
        "Resaving"
    );

    let image = coerce(handle.image, target);
    if in_place || config.collision_policy == CollisionPolicy::Overwrite {
        Ok(save_image(Some(&image), &stem, target_ext))
    } else {
        // another worker may claim the path between the check and the write
        save_image_new(&image, &stem, target_ext)
    }
}
