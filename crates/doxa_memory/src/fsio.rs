//! JSON file helpers: tolerant reads, durable atomic writes.

use crate::error::{StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::Path;

/// Read and parse a JSON file. A missing file is `Ok(None)`; anything that
/// exists but does not parse is an error.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::Io { path: path.to_path_buf(), source: e }),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StoreError::Malformed { path: path.to_path_buf(), source })
}

/// Write `value` as pretty JSON to `path` via tmp file + fsync + rename.
/// Readers see either the old file or the new one, never a partial write.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|source| StoreError::Malformed { path: path.to_path_buf(), source })?;

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(StoreError::io(parent))?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);
    {
        let mut file = File::create(tmp_path).map_err(StoreError::io(tmp_path))?;
        file.write_all(&bytes).map_err(StoreError::io(tmp_path))?;
        file.sync_all().map_err(StoreError::io(tmp_path))?;
    }
    fs::rename(tmp_path, path).map_err(StoreError::io(path))?;

    // Sync parent directory to make rename durable
    if let Ok(dir) = File::open(parent) {
        let _ = dir.sync_all();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_missing_is_none() {
        let dir = tempfile::TempDir::new().unwrap();
        let v: Option<serde_json::Value> = read_json(&dir.path().join("nope.json")).unwrap();
        assert!(v.is_none());
    }

    #[test]
    fn test_write_then_read_leaves_no_tmp() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("doc.json");
        write_json_atomic(&path, &serde_json::json!({"a": 1})).unwrap();
        let v: serde_json::Value = read_json(&path).unwrap().unwrap();
        assert_eq!(v["a"], 1);
        assert!(!dir.path().join("nested").join("doc.json.tmp").exists());
    }

    #[test]
    fn test_read_malformed_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        let err = read_json::<serde_json::Value>(&path).unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }
}
