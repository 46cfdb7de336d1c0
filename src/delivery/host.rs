//! Host primitives used by the delivery strategies
//!
//! Each platform exposes a different subset: directory writes, a share sheet,
//! or browser-style downloads through object URLs. The broker only talks to
//! these traits, so tests can substitute failing or recording hosts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use tracing::debug;
use uuid::Uuid;

use crate::error::{ContactbookError, ContactbookResult};
use crate::storage::file_io::write_bytes_atomic;

/// Writes a finished artifact into a directory
pub trait FileSink {
    /// Write `bytes` as `dir/file_name`, creating `dir` if needed
    ///
    /// A failed write must leave nothing behind.
    fn write(&self, dir: &Path, file_name: &str, bytes: &[u8]) -> ContactbookResult<PathBuf>;
}

/// Hands a written file to the user (share sheet, system file handler)
pub trait ShareSheet {
    fn share(&self, path: &Path, mime_type: &str) -> ContactbookResult<()>;
}

/// Browser-style download through a transient object URL
pub trait DownloadHost {
    fn create_object_url(&self, bytes: &[u8], mime_type: &str) -> ContactbookResult<String>;
    /// Start the download; returns where the file ended up
    fn download(&self, url: &str, file_name: &str) -> ContactbookResult<PathBuf>;
    fn revoke_object_url(&self, url: &str);
}

/// Filesystem sink using temp-file-then-rename writes
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSink;

impl FileSink for LocalFileSink {
    fn write(&self, dir: &Path, file_name: &str, bytes: &[u8]) -> ContactbookResult<PathBuf> {
        let path = dir.join(file_name);
        write_bytes_atomic(&path, bytes)?;
        Ok(path)
    }
}

/// Opens the file with the platform's default handler
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl ShareSheet for SystemOpener {
    fn share(&self, path: &Path, _mime_type: &str) -> ContactbookResult<()> {
        let mut command = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", "start", ""]);
            c
        } else if cfg!(target_os = "macos") {
            Command::new("open")
        } else {
            Command::new("xdg-open")
        };

        let status = command
            .arg(path)
            .status()
            .map_err(|e| ContactbookError::Io(format!("Failed to launch file handler: {}", e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(ContactbookError::Io(format!(
                "File handler exited with {}",
                status
            )))
        }
    }
}

/// Object URL that is revoked when dropped, on every exit path
pub struct ObjectUrl<'h> {
    host: &'h dyn DownloadHost,
    url: String,
}

impl<'h> ObjectUrl<'h> {
    pub fn create(host: &'h dyn DownloadHost, bytes: &[u8], mime_type: &str) -> ContactbookResult<Self> {
        let url = host.create_object_url(bytes, mime_type)?;
        Ok(Self { host, url })
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl Drop for ObjectUrl<'_> {
    fn drop(&mut self) {
        self.host.revoke_object_url(&self.url);
        debug!(url = %self.url, "object URL revoked");
    }
}

/// Download host that saves into a downloads directory
///
/// Object URLs are held in memory until revoked, the way a browser keeps the
/// blob alive for as long as its URL exists.
#[derive(Debug)]
pub struct DirectoryDownloadHost {
    dir: PathBuf,
    live: Mutex<HashMap<String, Vec<u8>>>,
}

impl DirectoryDownloadHost {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            live: Mutex::new(HashMap::new()),
        }
    }

    /// Object URLs not yet revoked
    pub fn live_urls(&self) -> usize {
        self.live.lock().map(|live| live.len()).unwrap_or(0)
    }
}

impl DownloadHost for DirectoryDownloadHost {
    fn create_object_url(&self, bytes: &[u8], _mime_type: &str) -> ContactbookResult<String> {
        let url = format!("blob:contactbook/{}", Uuid::new_v4());
        self.live
            .lock()
            .map_err(|e| ContactbookError::Storage(format!("Failed to acquire lock: {}", e)))?
            .insert(url.clone(), bytes.to_vec());
        Ok(url)
    }

    fn download(&self, url: &str, file_name: &str) -> ContactbookResult<PathBuf> {
        let live = self
            .live
            .lock()
            .map_err(|e| ContactbookError::Storage(format!("Failed to acquire lock: {}", e)))?;
        let bytes = live
            .get(url)
            .ok_or_else(|| ContactbookError::DeliveryFailed(format!("object URL {} revoked", url)))?;

        let path = self.dir.join(file_name);
        write_bytes_atomic(&path, bytes)?;
        Ok(path)
    }

    fn revoke_object_url(&self, url: &str) {
        if let Ok(mut live) = self.live.lock() {
            live.remove(url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_local_sink_creates_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("Documents");
        let path = LocalFileSink.write(&dir, "a.json", b"{}").unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"{}");
    }

    #[test]
    fn test_object_url_revoked_on_drop() {
        let temp = TempDir::new().unwrap();
        let host = DirectoryDownloadHost::new(temp.path().to_path_buf());
        {
            let url = ObjectUrl::create(&host, b"data", "application/json").unwrap();
            assert_eq!(host.live_urls(), 1);
            host.download(url.as_str(), "a.json").unwrap();
        }
        assert_eq!(host.live_urls(), 0);
        assert!(temp.path().join("a.json").exists());
    }

    #[test]
    fn test_object_url_revoked_on_error() {
        let temp = TempDir::new().unwrap();
        // A file where the downloads directory should be
        let blocked = temp.path().join("Downloads");
        std::fs::write(&blocked, b"").unwrap();
        let host = DirectoryDownloadHost::new(blocked);

        let result = (|| -> ContactbookResult<PathBuf> {
            let url = ObjectUrl::create(&host, b"data", "application/json")?;
            host.download(url.as_str(), "a.json")
        })();

        assert!(result.is_err());
        assert_eq!(host.live_urls(), 0);
    }
}
