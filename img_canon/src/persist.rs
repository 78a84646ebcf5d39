//! Persistence adapter: encodes at maximum quality and replaces the
//! destination atomically.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::tga::TgaEncoder;
use image::{DynamicImage, ImageFormat};
use shared_utils::common_utils::append_to_stem;
use shared_utils::img_errors::{CanonError, Result};
use std::fs;
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

/// Result of one save attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing to write.
    NoOp,
    Written(PathBuf),
    Failed { path: PathBuf, reason: String },
}

impl SaveOutcome {
    pub fn written_path(&self) -> Option<&Path> {
        match self {
            SaveOutcome::Written(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SaveOutcome::Failed { .. })
    }
}

/// How the finished temp file is moved onto the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Commit {
    Replace,
    /// Fails with `AlreadyExists` if anything appeared at the destination.
    NoClobber,
}

/// Writes `image` to `stem + ext` (`ext` includes the dot), replacing any
/// existing file.
///
/// `None` is a no-op. Failures are logged and returned, never propagated.
/// `.tga` output is RLE-compressed.
pub fn save_image(image: Option<&DynamicImage>, stem: &Path, ext: &str) -> SaveOutcome {
    let Some(image) = image else {
        return SaveOutcome::NoOp;
    };
    let path = append_to_stem(stem, ext);
    let result = write_atomically(image, &path, ext, Commit::Replace);
    outcome(path, result)
}

/// Like [`save_image`], but never replaces an existing file.
///
/// The existence check and the write are one atomic step, so two writers
/// racing for the same path cannot both succeed.
///
/// # Errors
/// [`CanonError::AlreadyExists`] if the destination exists at commit time;
/// nothing is written in that case. Other failures come back as
/// [`SaveOutcome::Failed`].
pub fn save_image_new(image: &DynamicImage, stem: &Path, ext: &str) -> Result<SaveOutcome> {
    let path = append_to_stem(stem, ext);
    match write_atomically(image, &path, ext, Commit::NoClobber) {
        Err(CanonError::AlreadyExists(existing)) => {
            tracing::debug!(path = %existing.display(), "Destination appeared before commit");
            Err(CanonError::AlreadyExists(existing))
        }
        result => Ok(outcome(path, result)),
    }
}

fn outcome(path: PathBuf, result: Result<()>) -> SaveOutcome {
    match result {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Saved image");
            SaveOutcome::Written(path)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to save image");
            SaveOutcome::Failed {
                path,
                reason: e.to_string(),
            }
        }
    }
}

fn write_atomically(image: &DynamicImage, path: &Path, ext: &str, commit: Commit) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".img-canon-")
        .suffix(".part")
        .tempfile_in(dir)?;

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        encode(image, &mut writer, ext)?;
        writer.flush()?;
    }

    // temp files are created 0600; keep the destination's mode or use 0644
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(path)
            .map(|m| m.permissions().mode())
            .unwrap_or(0o644);
        tmp.as_file().set_permissions(fs::Permissions::from_mode(mode))?;
    }

    let persisted = match commit {
        Commit::Replace => tmp.persist(path),
        Commit::NoClobber => tmp.persist_noclobber(path),
    };
    match persisted {
        Ok(_) => Ok(()),
        Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(CanonError::AlreadyExists(path.to_path_buf()))
        }
        Err(e) => Err(CanonError::Io(e.error)),
    }
}

fn encode<W: Write + Seek>(image: &DynamicImage, writer: W, ext: &str) -> Result<()> {
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    match ext.as_str() {
        "png" => image.write_with_encoder(PngEncoder::new_with_quality(
            writer,
            CompressionType::Best,
            FilterType::Adaptive,
        ))?,
        "tga" => image.write_with_encoder(TgaEncoder::new(writer))?,
        "jpg" | "jpeg" | "jpe" | "jfif" => {
            image.write_with_encoder(JpegEncoder::new_with_quality(writer, 100))?
        }
        other => {
            let format = ImageFormat::from_extension(other).ok_or_else(|| {
                CanonError::Image(image::ImageError::Unsupported(
                    image::error::UnsupportedError::from_format_and_kind(
                        image::error::ImageFormatHint::Name(other.to_string()),
                        image::error::UnsupportedErrorKind::Format(
                            image::error::ImageFormatHint::Name(other.to_string()),
                        ),
                    ),
                ))
            })?;
            let mut writer = writer;
            image.write_to(&mut writer, format)?
        }
    }
    Ok(())
}
