//! Safety Module
//!
//! Refuses destructive batch runs rooted at system directories or directly at
//! a home directory. The converter deletes superseded sources, so a mistyped
//! root must fail loudly instead of walking the whole disk.

use std::path::Path;

const DANGEROUS_DIRS: &[&str] = &[
    "/",
    "/System",
    "/usr",
    "/bin",
    "/sbin",
    "/etc",
    "/var",
    "/private",
    "/Library",
    "/Applications",
    "/Users",
    "/home",
    "/root",
    "/boot",
    "/dev",
    "/proc",
    "/sys",
    "/tmp",
    "/opt",
];

const DANGEROUS_WINDOWS_DIRS: &[&str] = &[
    "c:\\",
    "c:\\windows",
    "c:\\program files",
    "c:\\program files (x86)",
    "c:\\users",
];

fn blocked(target: &str, detail: &str, hint: &str) -> String {
    format!(
        "🚨 DANGEROUS OPERATION BLOCKED!\n\
         ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\
         ❌ Target '{}' {}.\n\
         ❌ img-canon deletes converted sources; running here could destroy files you need.\n\
         \n\
         💡 {}\n\
         ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━",
        target, detail, hint
    )
}

/// `Err` with a user-facing message when `path` is a protected location.
pub fn check_dangerous_directory(path: &Path) -> Result<(), String> {
    let path_str = path.to_string_lossy();
    let trimmed = if path_str.len() > 1 {
        path_str.trim_end_matches(['/', '\\'])
    } else {
        &path_str
    };

    if DANGEROUS_DIRS.contains(&trimmed)
        || DANGEROUS_WINDOWS_DIRS.contains(&trimmed.to_lowercase().as_str())
        || DANGEROUS_WINDOWS_DIRS.contains(&format!("{}\\", trimmed.to_lowercase()).as_str())
    {
        return Err(blocked(
            trimmed,
            "is a protected system directory",
            "Please specify the texture folder itself instead.",
        ));
    }

    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let components = canonical.components().count();
    let canonical_str = canonical.to_string_lossy();

    if components <= 3 && (canonical_str.starts_with("/Users/") || canonical_str.starts_with("/home/")) {
        return Err(blocked(
            &path.display().to_string(),
            "is too close to your home directory root",
            "Please specify a subdirectory like ~/projects/game/textures instead.",
        ));
    }

    Ok(())
}

/// [`check_dangerous_directory`] plus a warning for folders that commonly
/// hold unrelated personal files.
pub fn check_safe_for_destructive(path: &Path, operation: &str) -> Result<(), String> {
    check_dangerous_directory(path)?;

    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let canonical_str = canonical.to_string_lossy();

    if canonical_str.contains("/Desktop") || canonical_str.contains("/Downloads") {
        tracing::warn!(
            path = %path.display(),
            operation,
            "Target is a common location for important files; make sure you have backups"
        );
    }

    Ok(())
}
