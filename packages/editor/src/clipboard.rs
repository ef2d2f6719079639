//! Session clipboard: one copied element, serialized to a temp file.
//!
//! Copy overwrites the slot (last copy wins); paste reads the file back
//! without deleting it. The entry keeps the path so the session layer can
//! reclaim the file when the session itself is dropped.

use std::io::Write;
use std::path::PathBuf;

use serde_json::Value;
use tempfile::NamedTempFile;

use crate::errors::EditorError;

#[derive(Clone, Debug)]
pub struct ClipboardEntry {
    pub elt_id: String,
    pub path: PathBuf,
}

/// Serialize the copied element data to a kept temp file.
pub fn store(elt_id: &str, data: &Value) -> Result<ClipboardEntry, EditorError> {
    let mut file = NamedTempFile::new()?;
    file.write_all(data.to_string().as_bytes())?;
    let (_, path) = file
        .keep()
        .map_err(|e| EditorError::Internal(e.to_string()))?;
    Ok(ClipboardEntry {
        elt_id: elt_id.to_string(),
        path,
    })
}

/// Read the clipboard payload back. The file is left in place.
pub fn read(entry: &ClipboardEntry) -> Result<Value, EditorError> {
    let content = std::fs::read_to_string(&entry.path)?;
    serde_json::from_str(&content).map_err(|e| EditorError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_store_then_read() {
        let data = json!({ "elt_id": "Exercise:number", "fields": { "Exercise:number:_value": "Hello world" } });
        let entry = store("Exercise:number", &data).unwrap();
        assert_eq!(entry.elt_id, "Exercise:number");

        let loaded = read(&entry).unwrap();
        assert_eq!(loaded, data);

        // Read again: the file is not consumed.
        let loaded = read(&entry).unwrap();
        assert_eq!(loaded["fields"]["Exercise:number:_value"], "Hello world");

        std::fs::remove_file(&entry.path).unwrap();
    }

    #[test]
    fn test_read_missing_file() {
        let entry = ClipboardEntry {
            elt_id: "Exercise".to_string(),
            path: PathBuf::from("/nonexistent/clipboard.json"),
        };
        assert!(read(&entry).is_err());
    }
}
