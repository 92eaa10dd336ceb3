//! File I/O utilities with atomic writes
//!
//! Writes go to a sibling temp file which is synced and renamed over the
//! target, so a crash leaves either the old or the new contents.

use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::SheetbookError;

/// Read JSON from a file, returning a default value if the file doesn't exist
pub fn read_json<T, P>(path: P) -> Result<T, SheetbookError>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Ok(T::default());
    }

    let file = File::open(path).map_err(|e| {
        SheetbookError::Storage(format!("Failed to open {}: {}", path.display(), e))
    })?;

    serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        SheetbookError::Storage(format!("Failed to parse {}: {}", path.display(), e))
    })
}

/// Read a whole file as text, `None` if it doesn't exist
pub fn read_text<P: AsRef<Path>>(path: P) -> Result<Option<String>, SheetbookError> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SheetbookError::Storage(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Serialize `data` as pretty JSON and write it atomically
pub fn write_json_atomic<T, P>(path: P, data: &T) -> Result<(), SheetbookError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let contents = serde_json::to_vec_pretty(data)
        .map_err(|e| SheetbookError::Storage(format!("Failed to serialize data: {}", e)))?;
    write_atomic(path, &contents)
}

/// Write raw bytes atomically (write to temp, sync, then rename)
pub fn write_atomic<P: AsRef<Path>>(path: P, contents: &[u8]) -> Result<(), SheetbookError> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            SheetbookError::Storage(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    // Same directory as the target so the rename stays on one filesystem
    let temp_path = path.with_extension("tmp");

    let mut file = File::create(&temp_path)
        .map_err(|e| SheetbookError::Storage(format!("Failed to create temp file: {}", e)))?;

    file.write_all(contents)
        .and_then(|_| file.sync_all())
        .map_err(|e| SheetbookError::Storage(format!("Failed to write data: {}", e)))?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        SheetbookError::Storage(format!("Failed to rename temp file: {}", e))
    })
}

/// Remove a file, treating an already-missing file as success
pub fn remove_file_if_exists<P: AsRef<Path>>(path: P) -> Result<(), SheetbookError> {
    let path = path.as_ref();
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SheetbookError::Storage(format!(
            "Failed to remove {}: {}",
            path.display(),
            e
        ))),
    }
}
