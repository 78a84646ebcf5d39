//! Auxiliary texture recipes: mirror-concat and the eye/mouth split, plus a
//! batch runner that drives either over a file list.

use crate::image_handle::ImageHandle;
use crate::persist::{save_image, SaveOutcome};
use image::{DynamicImage, GenericImage, ImageBuffer};
use rayon::ThreadPool;
use serde::Serialize;
use shared_utils::common_utils::{append_to_stem, path_stem};
use shared_utils::img_errors::{CanonError, Result};
use shared_utils::progress::create_progress_bar;
use shared_utils::report::{print_issue_list, print_simple_summary};
use shared_utils::thread_manager::{run_parallel, TaskResult};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

/// Extension exactly as it appears on disk, with the dot; empty if none.
fn source_extension(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}

/// `[left | right]`, both halves the same height. Pixel layout and bit depth
/// are preserved when both sides share one; otherwise the result is RGBA16.
fn side_by_side(left: &DynamicImage, right: &DynamicImage) -> Result<DynamicImage> {
    macro_rules! join {
        ($variant:ident, $l:expr, $r:expr) => {{
            let mut out = ImageBuffer::new($l.width() + $r.width(), $l.height());
            out.copy_from($l, 0, 0)?;
            out.copy_from($r, $l.width(), 0)?;
            DynamicImage::$variant(out)
        }};
    }

    use DynamicImage::*;
    Ok(match (left, right) {
        (ImageLuma8(l), ImageLuma8(r)) => join!(ImageLuma8, l, r),
        (ImageLumaA8(l), ImageLumaA8(r)) => join!(ImageLumaA8, l, r),
        (ImageRgb8(l), ImageRgb8(r)) => join!(ImageRgb8, l, r),
        (ImageRgba8(l), ImageRgba8(r)) => join!(ImageRgba8, l, r),
        (ImageLuma16(l), ImageLuma16(r)) => join!(ImageLuma16, l, r),
        (ImageLumaA16(l), ImageLumaA16(r)) => join!(ImageLumaA16, l, r),
        (ImageRgb16(l), ImageRgb16(r)) => join!(ImageRgb16, l, r),
        (ImageRgba16(l), ImageRgba16(r)) => join!(ImageRgba16, l, r),
        (ImageRgb32F(l), ImageRgb32F(r)) => join!(ImageRgb32F, l, r),
        (ImageRgba32F(l), ImageRgba32F(r)) => join!(ImageRgba32F, l, r),
        (l, r) => {
            let (l, r) = (l.to_rgba16(), r.to_rgba16());
            join!(ImageRgba16, &l, &r)
        }
    })
}

/// Appends the horizontal mirror of the image to its right and saves the
/// result over the source (same stem, same extension).
pub fn mirror_concat_img(handle: ImageHandle) -> Result<SaveOutcome> {
    let source = handle.source_path.as_deref().ok_or(CanonError::NotFound)?;
    let concat = side_by_side(&handle.image, &handle.image.fliph())?;
    Ok(save_image(Some(&concat), &path_stem(source), &source_extension(source)))
}

/// Splits a 2×4 eye/mouth atlas into eight mirrored textures.
///
/// For band `i` (top to bottom), `stem_{i+1}` is the left half preceded by its
/// mirror and `stem_{i+5}` is the right half followed by its mirror. Outcomes
/// come back in write order: `_1, _5, _2, _6, _3, _7, _4, _8`.
///
/// # Errors
/// [`CanonError::InvalidGeometry`] unless the width is even, the height is a
/// multiple of four and neither is zero; nothing is written in that case.
pub fn split_eyes_img(handle: ImageHandle) -> Result<Vec<SaveOutcome>> {
    let source = handle.source_path.as_deref().ok_or(CanonError::NotFound)?;
    let (width, height) = (handle.width(), handle.height());
    if width == 0 || height == 0 || width % 2 != 0 || height % 4 != 0 {
        return Err(CanonError::InvalidGeometry {
            path: source.to_path_buf(),
            width,
            height,
        });
    }

    let stem = path_stem(source);
    let ext = source_extension(source);
    let half = width / 2;
    let band = height / 4;
    let mut outcomes = Vec::with_capacity(8);

    for i in 0..4u32 {
        let y = i * band;
        let left = handle.image.crop_imm(0, y, half, band);
        let right = handle.image.crop_imm(half, y, half, band);

        let first = side_by_side(&left.fliph(), &left)?;
        let second = side_by_side(&right, &right.fliph())?;

        let first_stem = append_to_stem(&stem, &format!("_{}", i + 1));
        let second_stem = append_to_stem(&stem, &format!("_{}", i + 5));
        outcomes.push(save_image(Some(&first), &first_stem, &ext));
        outcomes.push(save_image(Some(&second), &second_stem, &ext));
    }

    Ok(outcomes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Recipe {
    MirrorConcat,
    SplitEyes,
}

impl Recipe {
    pub fn name(&self) -> &'static str {
        match self {
            Recipe::MirrorConcat => "Mirror",
            Recipe::SplitEyes => "Split eyes",
        }
    }
}

/// Terminal state of one recipe input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeOutcome {
    Done(Vec<PathBuf>),
    Unreadable(String),
    InvalidGeometry(String),
    Failed(String),
}

/// Opens `path` and applies `recipe`.
pub fn apply_recipe(path: &Path, recipe: Recipe) -> RecipeOutcome {
    let outcomes = ImageHandle::open(path).and_then(|handle| match recipe {
        Recipe::MirrorConcat => mirror_concat_img(handle).map(|o| vec![o]),
        Recipe::SplitEyes => split_eyes_img(handle),
    });

    match outcomes {
        Ok(outcomes) => {
            let failures: Vec<String> = outcomes
                .iter()
                .filter_map(|o| match o {
                    SaveOutcome::Failed { path, reason } => {
                        Some(format!("{}: {}", path.display(), reason))
                    }
                    _ => None,
                })
                .collect();
            if failures.is_empty() {
                RecipeOutcome::Done(
                    outcomes
                        .iter()
                        .filter_map(|o| o.written_path().map(Path::to_path_buf))
                        .collect(),
                )
            } else {
                RecipeOutcome::Failed(failures.join("; "))
            }
        }
        Err(e @ CanonError::InvalidGeometry { .. }) => RecipeOutcome::InvalidGeometry(e.to_string()),
        Err(e) if e.is_unreadable() => RecipeOutcome::Unreadable(e.to_string()),
        Err(e) => RecipeOutcome::Failed(e.to_string()),
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RecipeReport {
    /// Source files fully processed.
    pub succeeded: Vec<PathBuf>,
    /// Every file written.
    pub outputs: Vec<PathBuf>,
    pub unreadable: Vec<PathBuf>,
    pub invalid_geometry: Vec<(PathBuf, String)>,
    pub failed: Vec<(PathBuf, String)>,
    pub cancelled: usize,
}

impl RecipeReport {
    pub fn print(&self, recipe: Recipe) {
        print_simple_summary(
            recipe.name(),
            self.succeeded.len(),
            self.unreadable.len() + self.invalid_geometry.len() + self.failed.len(),
            self.cancelled,
        );
        let unreadable: Vec<_> = self.unreadable.iter().map(|p| (p.clone(), String::new())).collect();
        print_issue_list("❓ Not readable as images:", &unreadable);
        print_issue_list("📐 Wrong resolution:", &self.invalid_geometry);
        print_issue_list("❌ Failed:", &self.failed);
    }
}

/// Applies `recipe` to every file on the pool; per-file problems are
/// bucketed, never raised.
pub fn run_recipe(
    files: &[PathBuf],
    recipe: Recipe,
    pool: &ThreadPool,
    cancel: &AtomicBool,
    show_progress: bool,
) -> RecipeReport {
    let pb = create_progress_bar(files.len() as u64, recipe.name(), !show_progress);
    let mut report = RecipeReport::default();

    run_parallel(
        pool,
        files,
        cancel,
        |path| apply_recipe(path, recipe),
        |index, result| {
            let path = files[index].clone();
            pb.set_message(path.display().to_string());
            match result {
                TaskResult::Done(RecipeOutcome::Done(outputs)) => {
                    report.outputs.extend(outputs);
                    report.succeeded.push(path);
                }
                TaskResult::Done(RecipeOutcome::Unreadable(reason)) => {
                    tracing::info!(path = %path.display(), %reason, "Not an image");
                    report.unreadable.push(path);
                }
                TaskResult::Done(RecipeOutcome::InvalidGeometry(reason)) => {
                    tracing::warn!(%reason, "Skipping image");
                    report.invalid_geometry.push((path, reason));
                }
                TaskResult::Done(RecipeOutcome::Failed(reason)) => {
                    tracing::warn!(path = %path.display(), %reason, "Recipe failed");
                    report.failed.push((path, reason));
                }
                TaskResult::Panicked(msg) => {
                    tracing::error!(path = %path.display(), panic = %msg, "Worker panicked");
                    report.failed.push((path, format!("worker panicked: {}", msg)));
                }
                TaskResult::Cancelled => report.cancelled += 1,
            }
            pb.inc(1);
        },
    );
    pb.finish_and_clear();

    report.succeeded.sort();
    report.outputs.sort();
    report.unreadable.sort();
    report.invalid_geometry.sort();
    report.failed.sort();
    report
}
