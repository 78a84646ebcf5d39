//! Terminal prompts used when a subcommand is started without paths.

use dialoguer::Input;
use std::io;
use std::path::PathBuf;

fn prompt_error(e: dialoguer::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e.to_string())
}

/// Asks for the directory to convert. An empty answer means nothing was
/// selected.
pub fn prompt_directory() -> io::Result<Option<PathBuf>> {
    let answer: String = Input::new()
        .with_prompt("Directory to convert (leave empty to cancel)")
        .allow_empty(true)
        .validate_with(|input: &String| -> Result<(), String> {
            match parse_answer(input) {
                Some(path) if !path.is_dir() => {
                    Err(format!("'{}' is not a directory", path.display()))
                }
                _ => Ok(()),
            }
        })
        .interact_text()
        .map_err(prompt_error)?;

    Ok(parse_answer(&answer))
}

/// Asks for image files one at a time until an empty answer.
pub fn prompt_files() -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    loop {
        let prompt = if files.is_empty() {
            "Image file (leave empty to cancel)".to_string()
        } else {
            format!("Image file #{} (leave empty to start)", files.len() + 1)
        };
        let answer: String = Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .validate_with(|input: &String| -> Result<(), String> {
                match parse_answer(input) {
                    Some(path) if !path.is_file() => {
                        Err(format!("'{}' is not a file", path.display()))
                    }
                    _ => Ok(()),
                }
            })
            .interact_text()
            .map_err(prompt_error)?;

        match parse_answer(&answer) {
            Some(path) => files.push(path),
            None => break,
        }
    }
    Ok(files)
}

/// Trims whitespace and the quotes terminals add to dropped paths.
fn parse_answer(answer: &str) -> Option<PathBuf> {
    let trimmed = answer.trim().trim_matches(|c| c == '"' || c == '\'');
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer(""), None);
        assert_eq!(parse_answer("   "), None);
        assert_eq!(parse_answer("''"), None);
        assert_eq!(parse_answer(" /tmp/tex "), Some(PathBuf::from("/tmp/tex")));
        assert_eq!(
            parse_answer("\"/tmp/with space\""),
            Some(PathBuf::from("/tmp/with space"))
        );
    }
}
