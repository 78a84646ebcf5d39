//! Safe Delete
//!
//! A superseded source is only removed once its replacement is on disk,
//! non-empty and readable.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

/// Checks that `output` exists, holds at least `min_size` bytes (and never
/// zero) and can be opened for reading.
pub fn verify_output_integrity(output: &Path, min_size: u64) -> Result<(), String> {
    if !output.exists() {
        return Err("Output file does not exist".to_string());
    }

    let metadata =
        fs::metadata(output).map_err(|e| format!("Cannot read output metadata: {}", e))?;

    if metadata.len() == 0 {
        return Err("Output file is empty (0 bytes)".to_string());
    }

    if metadata.len() < min_size {
        return Err(format!(
            "Output file too small: {} < {} bytes",
            metadata.len(),
            min_size
        ));
    }

    let mut file = File::open(output).map_err(|e| format!("Cannot open output file: {}", e))?;
    let mut buffer = [0u8; 16];
    file.read(&mut buffer)
        .map_err(|e| format!("Cannot read output file: {}", e))?;

    Ok(())
}

/// Deletes `input` only if `output` passes [`verify_output_integrity`].
pub fn safe_delete_original(input: &Path, output: &Path, min_output_size: u64) -> io::Result<()> {
    if let Err(reason) = verify_output_integrity(output, min_output_size) {
        tracing::warn!(
            original = %input.display(),
            output = %output.display(),
            reason = %reason,
            "Output integrity check failed, original kept"
        );
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Output integrity check failed: {}", reason),
        ));
    }

    fs::remove_file(input)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_safe_delete_with_valid_output() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("face.jpg");
        let output = temp.path().join("face.png");
        fs::write(&input, b"jpeg bytes").unwrap();
        fs::write(&output, b"png bytes").unwrap();

        safe_delete_original(&input, &output, 1).unwrap();

        assert!(!input.exists());
        assert!(output.exists());
    }

    #[test]
    fn test_safe_delete_missing_output_protects_input() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("face.jpg");
        fs::write(&input, b"jpeg bytes").unwrap();

        let err = safe_delete_original(&input, &temp.path().join("face.png"), 1).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(input.exists());
    }

    #[test]
    fn test_safe_delete_empty_output_protects_input() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("face.jpg");
        let output = temp.path().join("face.png");
        fs::write(&input, b"jpeg bytes").unwrap();
        fs::write(&output, b"").unwrap();

        assert!(safe_delete_original(&input, &output, 0).is_err());
        assert!(input.exists());
    }

    #[test]
    fn test_verify_output_integrity_min_size() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("small.png");
        fs::write(&output, b"abc").unwrap();

        assert!(verify_output_integrity(&output, 3).is_ok());
        let err = verify_output_integrity(&output, 10).unwrap_err();
        assert!(err.contains("too small"));
    }
}
