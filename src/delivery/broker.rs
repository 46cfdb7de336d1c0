//! Delivery broker
//!
//! Tries an ordered list of strategies strictly in sequence until one gets
//! the artifact onto durable storage. A failed attempt leaves nothing behind.
//! When every strategy fails the artifact is handed back inside
//! [`DeliveryFailure`] so the caller can retry without re-exporting.

use std::fmt;
use std::path::PathBuf;

use tracing::{info, warn};

use super::host::{
    DirectoryDownloadHost, DownloadHost, FileSink, LocalFileSink, ObjectUrl, ShareSheet,
    SystemOpener,
};
use super::platform::PlatformCapability;
use super::Artifact;
use crate::config::paths::ContactbookPaths;
use crate::error::{ContactbookError, ContactbookResult};

/// Directory a filesystem strategy writes into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Directory named by the user
    Chosen,
    Documents,
    Cache,
    AppPrivate,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chosen => write!(f, "chosen"),
            Self::Documents => write!(f, "documents"),
            Self::Cache => write!(f, "cache"),
            Self::AppPrivate => write!(f, "app-private"),
        }
    }
}

/// One concrete way of persisting the artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    Directory { location: Location, dir: PathBuf },
    Download,
}

impl Strategy {
    pub fn label(&self) -> String {
        match self {
            Self::Directory { location, .. } => format!("{} directory", location),
            Self::Download => "browser download".to_string(),
        }
    }
}

/// Default strategy order for a platform
pub fn strategies_for(platform: PlatformCapability, paths: &ContactbookPaths) -> Vec<Strategy> {
    match platform {
        PlatformCapability::Browser => vec![Strategy::Download],
        PlatformCapability::NativeShell | PlatformCapability::EmbeddedDesktop => vec![
            Strategy::Directory {
                location: Location::Documents,
                dir: paths.documents_dir(),
            },
            Strategy::Directory {
                location: Location::Cache,
                dir: paths.cache_dir(),
            },
            Strategy::Directory {
                location: Location::AppPrivate,
                dir: paths.private_dir(),
            },
        ],
    }
}

/// A strategy that did not work, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    pub strategy: String,
    pub error: String,
}

/// Where and how the artifact was delivered
#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
    pub strategy: String,
    pub path: PathBuf,
    pub file_name: String,
    /// Whether the file was handed to the share sheet
    pub shared: bool,
    /// Share failure; the file is still delivered
    pub share_error: Option<String>,
    /// Strategies tried before the one that worked
    pub failed_attempts: Vec<AttemptFailure>,
}

/// Every strategy failed; the artifact is kept for a retry
#[derive(Debug)]
pub struct DeliveryFailure {
    pub artifact: Artifact,
    pub attempts: Vec<AttemptFailure>,
}

impl fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not save {}", self.artifact.file_name)?;
        for attempt in &self.attempts {
            write!(f, "; {}: {}", attempt.strategy, attempt.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for DeliveryFailure {}

impl From<DeliveryFailure> for ContactbookError {
    fn from(failure: DeliveryFailure) -> Self {
        ContactbookError::DeliveryFailed(failure.to_string())
    }
}

/// Gets artifacts onto durable storage for one platform
pub struct DeliveryBroker {
    platform: PlatformCapability,
    strategies: Vec<Strategy>,
    sink: Box<dyn FileSink>,
    share_sheet: Box<dyn ShareSheet>,
    download_host: Box<dyn DownloadHost>,
}

impl DeliveryBroker {
    /// Broker with the platform's default strategies and real hosts
    pub fn for_platform(platform: PlatformCapability, paths: &ContactbookPaths) -> Self {
        Self {
            platform,
            strategies: strategies_for(platform, paths),
            sink: Box::new(LocalFileSink),
            share_sheet: Box::new(SystemOpener),
            download_host: Box::new(DirectoryDownloadHost::new(paths.downloads_dir())),
        }
    }

    pub fn with_strategies(mut self, strategies: Vec<Strategy>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Try `dir` before the platform's own strategies
    pub fn prefer_directory(mut self, dir: PathBuf) -> Self {
        self.strategies.insert(
            0,
            Strategy::Directory {
                location: Location::Chosen,
                dir,
            },
        );
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn FileSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_share_sheet(mut self, share_sheet: Box<dyn ShareSheet>) -> Self {
        self.share_sheet = share_sheet;
        self
    }

    pub fn with_download_host(mut self, host: Box<dyn DownloadHost>) -> Self {
        self.download_host = host;
        self
    }

    pub fn platform(&self) -> PlatformCapability {
        self.platform
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// Deliver, optionally handing the file to the share sheet afterwards
    pub fn deliver(&self, artifact: Artifact, share: bool) -> Result<DeliveryReceipt, DeliveryFailure> {
        let mut failed_attempts = Vec::new();

        for strategy in &self.strategies {
            let label = strategy.label();
            info!(strategy = %label, file = %artifact.file_name, "delivery attempt");

            match self.attempt(strategy, &artifact) {
                Ok(path) => {
                    let (shared, share_error) = self.maybe_share(strategy, &path, &artifact, share);
                    info!(strategy = %label, path = %path.display(), "artifact delivered");
                    return Ok(DeliveryReceipt {
                        strategy: label,
                        path,
                        file_name: artifact.file_name,
                        shared,
                        share_error,
                        failed_attempts,
                    });
                }
                Err(e) => {
                    warn!(strategy = %label, error = %e, "delivery attempt failed");
                    failed_attempts.push(AttemptFailure {
                        strategy: label,
                        error: e.to_string(),
                    });
                }
            }
        }

        Err(DeliveryFailure {
            artifact,
            attempts: failed_attempts,
        })
    }

    /// Run the chain again with the artifact from a failed delivery
    pub fn retry(&self, failure: DeliveryFailure, share: bool) -> Result<DeliveryReceipt, DeliveryFailure> {
        self.deliver(failure.artifact, share)
    }

    fn attempt(&self, strategy: &Strategy, artifact: &Artifact) -> ContactbookResult<PathBuf> {
        match strategy {
            Strategy::Directory { dir, .. } => {
                self.sink.write(dir, &artifact.file_name, &artifact.bytes)
            }
            Strategy::Download => {
                let url = ObjectUrl::create(
                    self.download_host.as_ref(),
                    &artifact.bytes,
                    artifact.mime_type,
                )?;
                self.download_host.download(url.as_str(), &artifact.file_name)
            }
        }
    }

    fn maybe_share(
        &self,
        strategy: &Strategy,
        path: &std::path::Path,
        artifact: &Artifact,
        requested: bool,
    ) -> (bool, Option<String>) {
        if !requested || matches!(strategy, Strategy::Download) {
            return (false, None);
        }

        match self.share_sheet.share(path, artifact.mime_type) {
            Ok(()) => (true, None),
            Err(e) => {
                warn!(error = %e, "share failed; file kept at {}", path.display());
                (false, Some(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::BackupFormat;
    use chrono::Utc;
    use std::cell::RefCell;
    use std::fs;
    use std::path::Path;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn artifact() -> Artifact {
        Artifact::new(BackupFormat::Structured, false, b"{\"contacts\":[]}".to_vec(), Utc::now())
    }

    fn dir_strategy(location: Location, dir: PathBuf) -> Strategy {
        Strategy::Directory { location, dir }
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    struct RecordingShare(Rc<RefCell<Vec<PathBuf>>>);

    impl ShareSheet for RecordingShare {
        fn share(&self, path: &Path, _mime_type: &str) -> ContactbookResult<()> {
            self.0.borrow_mut().push(path.to_path_buf());
            Ok(())
        }
    }

    /// Local sink that records every directory it was asked to write into
    struct RecordingSink(Rc<RefCell<Vec<(PathBuf, bool)>>>);

    impl FileSink for RecordingSink {
        fn write(&self, dir: &Path, file_name: &str, bytes: &[u8]) -> ContactbookResult<PathBuf> {
            let result = LocalFileSink.write(dir, file_name, bytes);
            self.0.borrow_mut().push((dir.to_path_buf(), result.is_ok()));
            result
        }
    }

    /// Download host whose downloads always fail
    #[derive(Default)]
    struct RefusingDownloads {
        created: Rc<RefCell<Vec<String>>>,
        revoked: Rc<RefCell<Vec<String>>>,
    }

    impl DownloadHost for RefusingDownloads {
        fn create_object_url(&self, _bytes: &[u8], _mime_type: &str) -> ContactbookResult<String> {
            let url = format!("blob:test/{}", self.created.borrow().len());
            self.created.borrow_mut().push(url.clone());
            Ok(url)
        }

        fn download(&self, _url: &str, _file_name: &str) -> ContactbookResult<PathBuf> {
            Err(ContactbookError::Io("download blocked".into()))
        }

        fn revoke_object_url(&self, url: &str) {
            self.revoked.borrow_mut().push(url.to_string());
        }
    }

    struct FailingShare;

    impl ShareSheet for FailingShare {
        fn share(&self, _path: &Path, _mime_type: &str) -> ContactbookResult<()> {
            Err(ContactbookError::Io("no share target".into()))
        }
    }

    #[test]
    fn test_third_strategy_succeeds_without_residue() {
        let temp = TempDir::new().unwrap();
        let paths = ContactbookPaths::with_base_dir(temp.path().to_path_buf());
        let artifact = artifact();

        // 1: the directory path is occupied by a regular file
        let first = temp.path().join("first");
        fs::write(&first, b"not a directory").unwrap();
        // 2: the target file name is occupied by a non-empty directory
        let second = temp.path().join("second");
        fs::create_dir_all(second.join(&artifact.file_name).join("child")).unwrap();
        // 3: writable
        let third = temp.path().join("third");

        let writes = Rc::new(RefCell::new(Vec::new()));
        let broker = DeliveryBroker::for_platform(PlatformCapability::NativeShell, &paths)
            .with_strategies(vec![
                dir_strategy(Location::Documents, first.clone()),
                dir_strategy(Location::Cache, second.clone()),
                dir_strategy(Location::AppPrivate, third.clone()),
            ])
            .with_sink(Box::new(RecordingSink(writes.clone())));

        let receipt = broker.deliver(artifact, false).unwrap();
        assert_eq!(
            writes.borrow().as_slice(),
            &[(first.clone(), false), (second.clone(), false), (third.clone(), true)]
        );

        assert_eq!(receipt.strategy, "app-private directory");
        assert_eq!(receipt.failed_attempts.len(), 2);
        assert_eq!(receipt.path, third.join(&receipt.file_name));
        assert!(receipt.path.exists());

        assert_eq!(fs::read(&first).unwrap(), b"not a directory");
        assert_eq!(entries(&second), vec![receipt.file_name.clone()]);
        assert!(second.join(&receipt.file_name).is_dir());
    }

    #[test]
    fn test_total_failure_keeps_artifact_for_retry() {
        let temp = TempDir::new().unwrap();
        let paths = ContactbookPaths::with_base_dir(temp.path().to_path_buf());
        let blocked = temp.path().join("blocked");
        fs::write(&blocked, b"").unwrap();

        let broker = DeliveryBroker::for_platform(PlatformCapability::EmbeddedDesktop, &paths)
            .with_strategies(vec![dir_strategy(Location::Documents, blocked.clone())]);

        let original = artifact();
        let failure = broker.deliver(original.clone(), false).unwrap_err();
        assert_eq!(failure.artifact.bytes, original.bytes);
        assert_eq!(failure.attempts.len(), 1);

        fs::remove_file(&blocked).unwrap();
        let receipt = broker.retry(failure, false).unwrap();
        assert_eq!(fs::read(receipt.path).unwrap(), original.bytes);
    }

    #[test]
    fn test_failure_converts_to_delivery_failed() {
        let failure = DeliveryFailure {
            artifact: artifact(),
            attempts: vec![AttemptFailure {
                strategy: "documents directory".into(),
                error: "denied".into(),
            }],
        };
        let err: ContactbookError = failure.into();
        assert!(matches!(err, ContactbookError::DeliveryFailed(ref msg) if msg.contains("denied")));
    }

    #[test]
    fn test_share_after_write() {
        let temp = TempDir::new().unwrap();
        let paths = ContactbookPaths::with_base_dir(temp.path().to_path_buf());
        let shared = Rc::new(RefCell::new(Vec::new()));

        let broker = DeliveryBroker::for_platform(PlatformCapability::NativeShell, &paths)
            .with_share_sheet(Box::new(RecordingShare(shared.clone())));

        let receipt = broker.deliver(artifact(), true).unwrap();
        assert!(receipt.shared);
        assert_eq!(receipt.strategy, "documents directory");
        assert_eq!(shared.borrow().as_slice(), &[receipt.path.clone()]);
    }

    #[test]
    fn test_share_failure_does_not_undo_delivery() {
        let temp = TempDir::new().unwrap();
        let paths = ContactbookPaths::with_base_dir(temp.path().to_path_buf());
        let broker = DeliveryBroker::for_platform(PlatformCapability::EmbeddedDesktop, &paths)
            .with_share_sheet(Box::new(FailingShare));

        let receipt = broker.deliver(artifact(), true).unwrap();
        assert!(!receipt.shared);
        assert!(receipt.share_error.is_some());
        assert!(receipt.path.exists());
    }

    #[test]
    fn test_browser_download() {
        let temp = TempDir::new().unwrap();
        let paths = ContactbookPaths::with_base_dir(temp.path().to_path_buf());
        let broker = DeliveryBroker::for_platform(PlatformCapability::Browser, &paths);

        assert_eq!(broker.strategies(), &[Strategy::Download]);
        let receipt = broker.deliver(artifact(), true).unwrap();
        assert!(!receipt.shared);
        assert_eq!(receipt.path, paths.downloads_dir().join(&receipt.file_name));
    }

    #[test]
    fn test_failed_download_still_revokes_url() {
        let temp = TempDir::new().unwrap();
        let paths = ContactbookPaths::with_base_dir(temp.path().to_path_buf());
        let host = RefusingDownloads::default();
        let (created, revoked) = (host.created.clone(), host.revoked.clone());

        let broker = DeliveryBroker::for_platform(PlatformCapability::Browser, &paths)
            .with_download_host(Box::new(host));

        let failure = broker.deliver(artifact(), false).unwrap_err();
        assert_eq!(failure.attempts.len(), 1);
        assert!(failure.attempts[0].error.contains("download blocked"));
        assert_eq!(created.borrow().len(), 1);
        assert_eq!(*revoked.borrow(), *created.borrow());
        assert!(!paths.downloads_dir().exists() || entries(&paths.downloads_dir()).is_empty());
    }
}
