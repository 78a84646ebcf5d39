//! Common Utilities Module
//!
//! Small path helpers used across the conversion pipeline:
//! - extension inspection (case-insensitive)
//! - stem handling (a path with its extension removed)
//! - relative paths for log output
//! - logical path identity on case-insensitive filesystems

use std::ffi::OsString;
use std::path::{Path, PathBuf};

// ═══════════════════════════════════════════════════════════════
// Extensions
// ═══════════════════════════════════════════════════════════════

/// Lower-cased extension of `path` without the dot, or an empty string.
///
/// # Examples
/// ```
/// use std::path::Path;
/// use shared_utils::common_utils::get_extension_lowercase;
///
/// assert_eq!(get_extension_lowercase(Path::new("test.JPG")), "jpg");
/// assert_eq!(get_extension_lowercase(Path::new("noext")), "");
/// ```
pub fn get_extension_lowercase(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// Lower-cased extension of `path` including the leading dot (`".png"`),
/// or an empty string when the path has none.
pub fn get_dotted_extension_lowercase(path: &Path) -> String {
    let ext = get_extension_lowercase(path);
    if ext.is_empty() {
        ext
    } else {
        format!(".{}", ext)
    }
}

/// Case-insensitive membership test; `extensions` are given without dots.
///
/// # Examples
/// ```
/// use std::path::Path;
/// use shared_utils::common_utils::has_extension;
///
/// let extensions = &["jpg", "png", "gif"];
/// assert!(has_extension(Path::new("photo.JPG"), extensions));
/// assert!(!has_extension(Path::new("video.mp4"), extensions));
/// ```
pub fn has_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    let ext = get_extension_lowercase(path);
    !ext.is_empty() && extensions.iter().any(|e| e.as_ref() == ext)
}

// ═══════════════════════════════════════════════════════════════
// Stems
// ═══════════════════════════════════════════════════════════════

/// `path` with its final extension removed: `dir/foo.jpg` → `dir/foo`.
pub fn path_stem(path: &Path) -> PathBuf {
    match path.file_stem() {
        Some(stem) => path.with_file_name(stem),
        None => path.to_path_buf(),
    }
}

/// Appends `ext` (dot included, e.g. `".tga"` or `"_3.png"`) to a stem.
///
/// Plain string concatenation, so stems that contain dots keep them:
/// `dir/foo.bar` + `.png` → `dir/foo.bar.png`.
pub fn append_to_stem(stem: &Path, ext: &str) -> PathBuf {
    let mut raw: OsString = stem.as_os_str().to_os_string();
    raw.push(ext);
    PathBuf::from(raw)
}

// ═══════════════════════════════════════════════════════════════
// Display & identity
// ═══════════════════════════════════════════════════════════════

/// Path relative to `base`, or `path` unchanged when it is not under `base`.
///
/// # Examples
/// ```
/// use std::path::{Path, PathBuf};
/// use shared_utils::common_utils::compute_relative_path;
///
/// let base = Path::new("/home/user/project");
/// let path = Path::new("/home/user/project/src/main.rs");
/// assert_eq!(compute_relative_path(path, base), PathBuf::from("src/main.rs"));
/// ```
pub fn compute_relative_path(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base)
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Whether two paths name the same file on the host's default filesystem.
///
/// Windows and macOS volumes are case-insensitive by default, so `foo.PNG`
/// and `foo.png` are one file there; elsewhere paths must match exactly.
pub fn same_logical_path(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    if cfg!(any(windows, target_os = "macos")) {
        a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_extension_lowercase() {
        assert_eq!(get_extension_lowercase(Path::new("test.JPG")), "jpg");
        assert_eq!(get_extension_lowercase(Path::new("test.tga")), "tga");
        assert_eq!(get_extension_lowercase(Path::new("noext")), "");
        assert_eq!(get_extension_lowercase(Path::new(".hidden")), "");
    }

    #[test]
    fn test_get_dotted_extension_lowercase() {
        assert_eq!(get_dotted_extension_lowercase(Path::new("a/b.PNG")), ".png");
        assert_eq!(get_dotted_extension_lowercase(Path::new("a/b")), "");
    }

    #[test]
    fn test_has_extension() {
        let extensions = &["jpg", "png", "gif"];
        assert!(has_extension(Path::new("photo.JPG"), extensions));
        assert!(has_extension(Path::new("image.png"), extensions));
        assert!(!has_extension(Path::new("video.mp4"), extensions));
        assert!(!has_extension(Path::new("README"), extensions));

        let owned = vec!["tga".to_string()];
        assert!(has_extension(Path::new("icon.TGA"), &owned));
    }

    #[test]
    fn test_path_stem() {
        assert_eq!(path_stem(Path::new("dir/foo.jpg")), PathBuf::from("dir/foo"));
        assert_eq!(path_stem(Path::new("dir/foo.bar.gif")), PathBuf::from("dir/foo.bar"));
        assert_eq!(path_stem(Path::new("dir/noext")), PathBuf::from("dir/noext"));
    }

    #[test]
    fn test_append_to_stem() {
        assert_eq!(
            append_to_stem(Path::new("dir/foo"), ".tga"),
            PathBuf::from("dir/foo.tga")
        );
        assert_eq!(
            append_to_stem(Path::new("dir/eyes"), "_3.png"),
            PathBuf::from("dir/eyes_3.png")
        );
        assert_eq!(
            append_to_stem(Path::new("dir/foo.bar"), ".png"),
            PathBuf::from("dir/foo.bar.png")
        );
    }

    #[test]
    fn test_compute_relative_path() {
        let base = Path::new("/home/user/textures");
        let path = Path::new("/home/user/textures/chars/face.png");
        assert_eq!(compute_relative_path(path, base), PathBuf::from("chars/face.png"));

        let unrelated = Path::new("/tmp/file.png");
        assert_eq!(compute_relative_path(unrelated, base), unrelated);
    }

    #[test]
    fn test_same_logical_path() {
        assert!(same_logical_path(Path::new("a/foo.png"), Path::new("a/foo.png")));
        assert!(!same_logical_path(Path::new("a/foo.png"), Path::new("a/bar.png")));

        let differs_by_case = same_logical_path(Path::new("a/foo.PNG"), Path::new("a/foo.png"));
        assert_eq!(differs_by_case, cfg!(any(windows, target_os = "macos")));
    }
}
