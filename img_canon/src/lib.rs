pub mod config;
pub mod decision;
pub mod formats;
pub mod image_handle;
pub mod interactive;
pub mod orchestrator;
pub mod persist;
pub mod recipes;
pub mod transparency;

mod batch_tests;

pub use config::{readable_extensions, CanonConfig, CollisionPolicy, TargetFormat};
pub use decision::{is_canonical_for, resave_img};
pub use image_handle::{Compression, FormatMetadata, ImageHandle, PixelMode};
pub use orchestrator::{
    collect_inputs, convert_directory, convert_inputs, process_file, BatchReport, BatchState,
    ConversionOutcome,
};
pub use persist::{save_image, SaveOutcome};
pub use recipes::{
    apply_recipe, mirror_concat_img, run_recipe, split_eyes_img, Recipe, RecipeOutcome,
    RecipeReport,
};
pub use transparency::{has_translucent_pixel, has_transparency};

pub use shared_utils::img_errors::{CanonError, Result};
