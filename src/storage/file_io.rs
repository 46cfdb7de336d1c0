//! File I/O utilities with atomic writes
//!
//! Provides safe file operations that won't corrupt data on failure. A failed
//! write never leaves its temp file behind, and several files can be staged
//! first and then renamed together.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use crate::error::ContactbookError;

/// Read JSON from a file, returning a default value if file doesn't exist
pub fn read_json<T, P>(path: P) -> Result<T, ContactbookError>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Ok(T::default());
    }

    let file = File::open(path).map_err(|e| {
        ContactbookError::Storage(format!("Failed to open {}: {}", path.display(), e))
    })?;

    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(|e| {
        ContactbookError::Storage(format!("Failed to parse {}: {}", path.display(), e))
    })
}

/// Write JSON to a file atomically (write to temp, then rename)
pub fn write_json_atomic<T, P>(path: P, data: &T) -> Result<(), ContactbookError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    write_atomic(path.as_ref(), |writer| {
        serde_json::to_writer_pretty(writer, data)
            .map_err(|e| ContactbookError::Storage(format!("Failed to serialize data: {}", e)))
    })
}

/// Write raw bytes to a file atomically (write to temp, then rename)
pub fn write_bytes_atomic<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<(), ContactbookError> {
    write_atomic(path.as_ref(), |writer| {
        writer
            .write_all(bytes)
            .map_err(|e| ContactbookError::Storage(format!("Failed to write data: {}", e)))
    })
}

/// Temp file used while `path` is being written
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_atomic<F>(path: &Path, fill: F) -> Result<(), ContactbookError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), ContactbookError>,
{
    write_staged(path, fill)?.commit()
}

/// A fully written temp file waiting to be renamed over its target
///
/// Dropping an uncommitted stage removes the temp file.
#[derive(Debug)]
pub struct StagedFile {
    temp: PathBuf,
    target: PathBuf,
    done: bool,
}

impl StagedFile {
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Rename the temp file over the target
    pub fn commit(mut self) -> Result<(), ContactbookError> {
        fs::rename(&self.temp, &self.target)
            .map_err(|e| ContactbookError::Storage(format!("Failed to rename temp file: {}", e)))?;
        self.done = true;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.done {
            let _ = fs::remove_file(&self.temp);
        }
    }
}

/// Write JSON to the temp file beside `path` without touching `path` itself
pub fn stage_json<T, P>(path: P, data: &T) -> Result<StagedFile, ContactbookError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    write_staged(path.as_ref(), |writer| {
        serde_json::to_writer_pretty(writer, data)
            .map_err(|e| ContactbookError::Storage(format!("Failed to serialize data: {}", e)))
    })
}

/// Rename every staged file over its target as one unit
///
/// Targets already replaced when a later rename fails get their previous
/// contents written back (or are removed if they did not exist).
pub fn commit_all(staged: Vec<StagedFile>) -> Result<(), ContactbookError> {
    let mut previous = Vec::with_capacity(staged.len());
    for file in &staged {
        let before = match fs::read(file.target()) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                return Err(ContactbookError::Storage(format!(
                    "Failed to read {}: {}",
                    file.target().display(),
                    e
                )))
            }
        };
        previous.push((file.target().to_path_buf(), before));
    }

    for (index, file) in staged.into_iter().enumerate() {
        if let Err(e) = file.commit() {
            for (target, before) in &previous[..index] {
                let restored = match before {
                    Some(bytes) => write_bytes_atomic(target, bytes),
                    None => fs::remove_file(target).map_err(ContactbookError::from),
                };
                if let Err(restore_err) = restored {
                    warn!(file = %target.display(), error = %restore_err, "could not restore table file");
                }
            }
            return Err(e);
        }
    }
    Ok(())
}

fn write_staged<F>(path: &Path, fill: F) -> Result<StagedFile, ContactbookError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), ContactbookError>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            ContactbookError::Storage(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    // Temp file in same directory (important for atomic rename)
    let temp_path = temp_path_for(path);

    let file = File::create(&temp_path)
        .map_err(|e| ContactbookError::Storage(format!("Failed to create temp file: {}", e)))?;
    let staged = StagedFile {
        temp: temp_path,
        target: path.to_path_buf(),
        done: false,
    };

    let mut writer = BufWriter::new(file);
    fill(&mut writer)?;

    writer
        .flush()
        .map_err(|e| ContactbookError::Storage(format!("Failed to flush data: {}", e)))?;

    writer
        .get_ref()
        .sync_all()
        .map_err(|e| ContactbookError::Storage(format!("Failed to sync data: {}", e)))?;

    Ok(staged)
}
