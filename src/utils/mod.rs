//! File format utilities shared by the cache and the resource adapters.
//!
//! Every JSON document tributors writes (`.tributors`, `.all-contributorsrc`,
//! `.zenodo.json`, `codemeta.json`) goes through [`write_json_file`], which
//! produces 4-space-indented, UTF-8-preserving output with a trailing
//! newline so repeated runs with unchanged data are byte-identical.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::ser::PrettyFormatter;
use std::path::Path;

use crate::core::TributorsError;

/// Reads and parses a JSON file.
///
/// # Errors
/// Returns [`TributorsError::JsonParseError`] naming the file when the
/// content is not valid JSON for `T`, or an I/O error when it cannot be read.
pub fn read_json_file<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).map_err(|e| {
        TributorsError::JsonParseError {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Writes data as 4-space-indented JSON with a trailing newline.
///
/// # Errors
/// Returns an error if serialization fails or the file cannot be written.
pub fn write_json_file<T>(path: &Path, data: &T) -> Result<()>
where
    T: Serialize,
{
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    data.serialize(&mut ser)?;
    buf.push(b'\n');
    std::fs::write(path, buf)
        .with_context(|| format!("Failed to write JSON file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    #[test]
    fn test_roundtrip_preserves_unicode() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.json");
        let value = json!({"name": "Ярослав Гальченко"});

        write_json_file(&path, &value).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Ярослав"));
        assert!(content.ends_with('\n'));

        let back: Value = read_json_file(&path).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_write_is_stable() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.json");
        let value = json!({"b": 1, "a": [1, 2]});

        write_json_file(&path, &value).unwrap();
        let first = std::fs::read_to_string(&path).unwrap();
        write_json_file(&path, &value).unwrap();
        let second = std::fs::read_to_string(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_read_invalid_json_names_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = read_json_file::<Value>(&path).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }
}
