use std::time::{Duration, Instant};

use camino::Utf8Path;
use serde::Serialize;

use crate::catalog;
use crate::domain::{ArchiveId, DatasetName};
use crate::error::SpawriousError;
use crate::fetch::ArchiveClient;
use crate::fs_util::extract_tar_gz;
use crate::record::{DatasetRecord, Snapshot};
use crate::store::ArchiveStore;

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub delete_archive: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            delete_archive: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub download: DownloadOptions,
    pub augment: bool,
    pub write_snapshot: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            download: DownloadOptions::default(),
            augment: true,
            write_snapshot: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadAction {
    /// The manifest already listed the archive.
    AlreadyExtracted,
    /// An archive left on disk by an earlier run was extracted.
    ExtractedExisting,
    Downloaded,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadResult {
    pub dataset: String,
    pub archive: String,
    pub root: String,
    pub action: DownloadAction,
    pub bytes: Option<u64>,
    pub entries: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Clone)]
pub struct App<C: ArchiveClient> {
    client: C,
}

impl<C: ArchiveClient> App<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Makes sure the archive behind `name` is extracted under `root`.
    ///
    /// Skips every step the manifest or the filesystem says is done. An
    /// archive file from an interrupted transfer is taken as complete.
    pub fn download(
        &self,
        name: &str,
        root: &Utf8Path,
        options: &DownloadOptions,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadResult, SpawriousError> {
        let dataset: DatasetName = name.parse()?;
        let store = ArchiveStore::new(root.to_path_buf());
        store.ensure_root()?;
        self.ensure_extracted(dataset, &store, options, sink)
    }

    /// Downloads if needed, then returns the record for a benchmark variant
    /// with every path under `root`.
    pub fn load(
        &self,
        name: &str,
        root: &Utf8Path,
        options: &LoadOptions,
        sink: &dyn ProgressSink,
    ) -> Result<DatasetRecord, SpawriousError> {
        let dataset: DatasetName = name.parse()?;
        let code = dataset.variant()?;
        let store = ArchiveStore::new(root.to_path_buf());
        store.ensure_root()?;
        self.ensure_extracted(dataset, &store, &options.download, sink)?;

        let snapshot_path = store.snapshot_path(code);
        if snapshot_path.as_std_path().is_file() {
            sink.event(ProgressEvent {
                message: format!("phase=Resolve; reading snapshot {code}"),
                elapsed: None,
            });
            let snapshot = Snapshot::read(&snapshot_path)?;
            if snapshot.variant != code {
                return Err(SpawriousError::Snapshot(format!(
                    "{snapshot_path} holds {} instead of {code}",
                    snapshot.variant
                )));
            }
            return snapshot.record.rebind(root);
        }

        sink.event(ProgressEvent {
            message: format!("phase=Resolve; assembling {code} from image folders"),
            elapsed: None,
        });
        let start = Instant::now();
        let record = catalog::variant(code).build(store.image_root(), options.augment)?;
        sink.event(ProgressEvent {
            message: format!(
                "resolve.done environments={} latency_ms={}",
                record.len(),
                start.elapsed().as_millis()
            ),
            elapsed: Some(start.elapsed()),
        });

        if options.write_snapshot {
            sink.event(ProgressEvent {
                message: format!("phase=Store; writing snapshot {snapshot_path}"),
                elapsed: None,
            });
            Snapshot::new(code, record.detach(root)?).write(&snapshot_path)?;
        }
        Ok(record)
    }

    fn ensure_extracted(
        &self,
        dataset: DatasetName,
        store: &ArchiveStore,
        options: &DownloadOptions,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadResult, SpawriousError> {
        let archive = dataset.archive();
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; dataset {dataset} (archive {archive})"),
            elapsed: None,
        });
        let result = |action, bytes, entries| DownloadResult {
            dataset: dataset.to_string(),
            archive: archive.to_string(),
            root: store.root().to_string(),
            action,
            bytes,
            entries,
        };

        if store.is_extracted(archive.as_str())? {
            tracing::info!(%archive, root = %store.root(), "dataset already extracted");
            sink.event(ProgressEvent {
                message: "phase=Store; already downloaded and extracted".to_string(),
                elapsed: None,
            });
            return Ok(result(DownloadAction::AlreadyExtracted, None, None));
        }

        let archive_path = store.archive_path(archive);
        let (action, bytes) = if store.archive_present(archive) {
            tracing::info!(path = %archive_path, "archive already present, not fetching");
            (DownloadAction::ExtractedExisting, None)
        } else {
            (
                DownloadAction::Downloaded,
                Some(self.fetch_archive(archive, store, sink)?),
            )
        };

        sink.event(ProgressEvent {
            message: format!("phase=Extract; unpacking {archive_path}"),
            elapsed: None,
        });
        let start = Instant::now();
        let entries = extract_tar_gz(
            archive_path.as_std_path(),
            store.root().as_std_path(),
            options.delete_archive,
        )?;
        sink.event(ProgressEvent {
            message: format!(
                "extract.done entries={entries} latency_ms={}",
                start.elapsed().as_millis()
            ),
            elapsed: Some(start.elapsed()),
        });

        store.mark_extracted(archive.as_str())?;
        sink.event(ProgressEvent {
            message: format!("phase=Store; recorded {archive} in manifest"),
            elapsed: None,
        });
        Ok(result(action, bytes, Some(entries)))
    }

    fn fetch_archive(
        &self,
        archive: ArchiveId,
        store: &ArchiveStore,
        sink: &dyn ProgressSink,
    ) -> Result<u64, SpawriousError> {
        let destination = store.archive_path(archive);
        sink.event(ProgressEvent {
            message: format!("phase=Fetch; downloading {}", archive.file_name()),
            elapsed: None,
        });
        let start = Instant::now();
        let bytes = self
            .client
            .fetch(archive.url(), destination.as_std_path(), sink)?;
        sink.event(ProgressEvent {
            message: format!(
                "fetch.done bytes={bytes} latency_ms={}",
                start.elapsed().as_millis()
            ),
            elapsed: Some(start.elapsed()),
        });
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use camino::Utf8PathBuf;

    use super::*;
    use crate::output::JsonOutput;

    #[derive(Default)]
    struct FailingClient {
        calls: Mutex<usize>,
    }

    impl ArchiveClient for FailingClient {
        fn fetch(
            &self,
            _url: &str,
            destination: &Path,
            _sink: &dyn ProgressSink,
        ) -> Result<u64, SpawriousError> {
            *self.calls.lock().unwrap() += 1;
            std::fs::write(destination, b"partial").unwrap();
            Err(SpawriousError::TransferHttp("connection reset".to_string()))
        }
    }

    #[test]
    fn unknown_name_fails_before_touching_disk() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().join("root")).unwrap();
        let app = App::new(FailingClient::default());

        let err = app
            .download("cifar10", &root, &DownloadOptions::default(), &JsonOutput)
            .unwrap_err();

        assert_matches!(err, SpawriousError::UnknownDataset(_));
        assert!(!root.as_std_path().exists());
    }

    #[test]
    fn transfer_failure_leaves_partial_archive_and_no_manifest_entry() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let app = App::new(FailingClient::default());

        let err = app
            .download("o2o_easy", &root, &DownloadOptions::default(), &JsonOutput)
            .unwrap_err();

        assert!(err.is_transfer());
        let store = ArchiveStore::new(root);
        assert!(store.archive_present(ArchiveId::O2oEasy));
        assert!(!store.is_extracted("o2o_easy").unwrap());
    }

    #[test]
    fn load_rejects_names_without_variant() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let app = App::new(FailingClient::default());

        let err = app
            .load("m2m", &root, &LoadOptions::default(), &JsonOutput)
            .unwrap_err();

        assert_matches!(err, SpawriousError::UnknownVariant(_));
        assert_eq!(*app.client.calls.lock().unwrap(), 0);
    }
}
