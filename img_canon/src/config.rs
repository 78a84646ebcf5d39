//! Run configuration, built once in `main` and passed by reference.

use image::ImageFormat;
use serde::Serialize;

/// One of the two canonical output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TargetFormat {
    /// Opaque images: 8-bit RGB PNG.
    Png,
    /// Transparent images: 8-bit RGBA TGA, RLE-compressed.
    Tga,
}

impl TargetFormat {
    /// Lower-case extension with the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            TargetFormat::Png => ".png",
            TargetFormat::Tga => ".tga",
        }
    }
}

/// What to do when the canonical output path is taken by an unrelated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CollisionPolicy {
    /// Leave both files alone and report the collision.
    #[default]
    Refuse,
    /// Replace the existing file with the conversion.
    Overwrite,
}

impl std::str::FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "refuse" => Ok(CollisionPolicy::Refuse),
            "overwrite" => Ok(CollisionPolicy::Overwrite),
            other => Err(format!("unknown collision policy '{}', expected refuse|overwrite", other)),
        }
    }
}

/// Every extension (lower-case, no dot) whose decoder is compiled into `image`.
pub fn readable_extensions() -> Vec<String> {
    let mut exts: Vec<String> = ImageFormat::all()
        .filter(|f| f.reading_enabled())
        .flat_map(|f| f.extensions_str().iter().map(|e| e.to_ascii_lowercase()))
        .collect();
    exts.sort();
    exts.dedup();
    exts
}

#[derive(Debug, Clone)]
pub struct CanonConfig {
    /// Input extensions considered during directory enumeration.
    pub supported_extensions: Vec<String>,
    pub collision_policy: CollisionPolicy,
    /// Worker count; 0 picks one per logical CPU.
    pub threads: usize,
    pub recursive: bool,
    pub show_progress: bool,
}

impl Default for CanonConfig {
    fn default() -> Self {
        Self {
            supported_extensions: readable_extensions(),
            collision_policy: CollisionPolicy::Refuse,
            threads: 0,
            recursive: true,
            show_progress: true,
        }
    }
}

impl CanonConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Canonical format for an image with the given transparency verdict.
    pub fn target_for(&self, transparent: bool) -> TargetFormat {
        if transparent {
            TargetFormat::Tga
        } else {
            TargetFormat::Png
        }
    }
}
