//! Loading prompt text from the prompts directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rand::Rng;

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("no personalities found in {0}")]
    NoPersonalities(PathBuf),
}

/// Every `*.txt` in `dir`, keyed by upper-cased file stem. A missing directory yields an empty map.
pub fn load_text_dir(dir: &Path) -> Result<BTreeMap<String, String>, PromptError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(dir = %dir.display(), "prompt directory not found");
            return Ok(BTreeMap::new());
        }
        Err(source) => {
            return Err(PromptError::Io {
                path: dir.to_path_buf(),
                source,
            });
        }
    };

    let mut texts = BTreeMap::new();
    for entry in entries {
        let path = entry
            .map_err(|source| PromptError::Io {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        if path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let key = stem.replace(' ', "").to_uppercase();
        texts.insert(key, read(&path)?);
    }
    Ok(texts)
}

/// Personality set: like [`load_text_dir`] but an empty result is an error.
pub fn load_personalities(dir: &Path) -> Result<BTreeMap<String, String>, PromptError> {
    let set = load_text_dir(dir)?;
    if set.is_empty() {
        return Err(PromptError::NoPersonalities(dir.to_path_buf()));
    }
    tracing::info!(count = set.len(), dir = %dir.display(), "personalities loaded");
    Ok(set)
}

/// Non-empty trimmed lines of an optional file.
pub fn load_lines(path: &Path) -> Result<Vec<String>, PromptError> {
    Ok(load_text(path)?
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect())
}

/// Whole contents of an optional file; empty if it does not exist.
pub fn load_text(path: &Path) -> Result<String, PromptError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "prompt file not found");
            Ok(String::new())
        }
        Err(source) => Err(PromptError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// One line at random, e.g. the opening scenario.
pub fn random_line(lines: &[String]) -> Option<&str> {
    if lines.is_empty() {
        return None;
    }
    let idx = rand::rng().random_range(0..lines.len());
    Some(lines[idx].as_str())
}

fn read(path: &Path) -> Result<String, PromptError> {
    std::fs::read_to_string(path).map_err(|source| PromptError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_dir_keys_are_uppercased_stems() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("aiko.txt"), "You are Aiko.").unwrap();
        std::fs::write(dir.path().join("grumpy aiko.txt"), "You are grumpy.").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let texts = load_text_dir(dir.path()).unwrap();
        assert_eq!(texts.len(), 2);
        assert_eq!(texts["AIKO"], "You are Aiko.");
        assert_eq!(texts["GRUMPYAIKO"], "You are grumpy.");
    }

    #[test]
    fn empty_personality_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_personalities(dir.path()),
            Err(PromptError::NoPersonalities(_))
        ));
    }

    #[test]
    fn lines_skip_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenarios.txt");
        std::fs::write(&path, "at the beach\n\n  in a cafe  \n").unwrap();
        assert_eq!(load_lines(&path).unwrap(), vec!["at the beach", "in a cafe"]);
    }

    #[test]
    fn missing_optional_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_lines(&dir.path().join("nope.txt")).unwrap().is_empty());
        assert!(load_text_dir(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn random_line_picks_from_list() {
        assert_eq!(random_line(&[]), None);
        let lines = vec!["a".to_string(), "b".to_string()];
        let picked = random_line(&lines).unwrap();
        assert!(picked == "a" || picked == "b");
    }
}
