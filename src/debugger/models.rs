use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::DebuggerError;

/// Loads one language model per locale file in `dir`, keyed by file stem
/// (`en-US.json` becomes `"en-US"`). Only JSON files are read.
pub fn load_language_models(
    dir: &Path,
) -> Result<serde_json::Map<String, serde_json::Value>, DebuggerError> {
    if !dir.is_dir() {
        return Err(DebuggerError::ModelDirectoryNotFound(dir.to_path_buf()));
    }
    let io_error = |source| DebuggerError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(io_error)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    let mut models = serde_json::Map::new();
    for path in files {
        let Some(locale) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            debug!(path = %path.display(), "skipping non-json language model");
            continue;
        }
        let text = fs::read_to_string(&path).map_err(|source| DebuggerError::Io {
            path: path.clone(),
            source,
        })?;
        let model = serde_json::from_str(&text).map_err(|source| DebuggerError::ModelParse {
            path: path.clone(),
            source,
        })?;
        models.insert(locale.to_string(), model);
    }
    Ok(models)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn loads_one_entry_per_locale() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("en-US.json"), r#"{"invocation": "counter"}"#).unwrap();
        fs::write(dir.path().join("de-DE.json"), r#"{"invocation": "zaehler"}"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let models = load_language_models(dir.path()).unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models["en-US"], json!({"invocation": "counter"}));
        assert_eq!(models["de-DE"], json!({"invocation": "zaehler"}));
    }

    #[test]
    fn missing_directory_is_named_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_language_models(&dir.path().join("models")).unwrap_err();
        assert!(matches!(err, DebuggerError::ModelDirectoryNotFound(_)));
    }

    #[test]
    fn malformed_model_reports_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("en-US.json"), "{").unwrap();
        let err = load_language_models(dir.path()).unwrap_err();
        assert!(matches!(err, DebuggerError::ModelParse { .. }));
    }
}
