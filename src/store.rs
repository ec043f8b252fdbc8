use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use tempfile::Builder;

use crate::domain::{ArchiveId, ENTIRE_DATASET_MARKER, VariantCode};
use crate::error::SpawriousError;

pub const MANIFEST_FILE: &str = "datasets.txt";
pub const IMAGE_DIR: &str = "spawrious224";

/// Extraction state for one dataset root.
///
/// The manifest is an append-only list of archive names, one per line. A
/// line equal to `entire_dataset` satisfies every lookup. Appends replace
/// the manifest through a temp file in the same directory, so a reader never
/// sees a half-written line. There is no cross-process lock: two writers
/// racing on the same root can still drop one of their appends.
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    root: Utf8PathBuf,
}

impl ArchiveStore {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn default_root() -> Result<Utf8PathBuf, SpawriousError> {
        BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("spawrious")).ok()
            })
            .ok_or_else(|| {
                SpawriousError::Filesystem("unable to resolve cache directory".to_string())
            })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn manifest_path(&self) -> Utf8PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn archive_path(&self, archive: ArchiveId) -> Utf8PathBuf {
        self.root.join(archive.file_name())
    }

    pub fn image_root(&self) -> Utf8PathBuf {
        self.root.join(IMAGE_DIR)
    }

    pub fn snapshot_path(&self, variant: VariantCode) -> Utf8PathBuf {
        self.image_root().join(variant.snapshot_file_name())
    }

    pub fn ensure_root(&self) -> Result<(), SpawriousError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| SpawriousError::Filesystem(err.to_string()))
    }

    /// Names recorded so far; a missing manifest means nothing is extracted.
    pub fn entries(&self) -> Result<Vec<String>, SpawriousError> {
        let path = self.manifest_path();
        if !path.as_std_path().exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| SpawriousError::Filesystem(format!("read {path}: {err}")))?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    pub fn is_extracted(&self, name: &str) -> Result<bool, SpawriousError> {
        Ok(self
            .entries()?
            .iter()
            .any(|line| line == name || line == ENTIRE_DATASET_MARKER))
    }

    /// Appends `name` without deduplicating.
    pub fn mark_extracted(&self, name: &str) -> Result<(), SpawriousError> {
        let path = self.manifest_path();
        let mut content = if path.as_std_path().exists() {
            fs::read_to_string(path.as_std_path())
                .map_err(|err| SpawriousError::Filesystem(format!("read {path}: {err}")))?
        } else {
            String::new()
        };
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(name);
        content.push('\n');
        Self::write_bytes_atomic(&path, content.as_bytes())
    }

    pub fn archive_present(&self, archive: ArchiveId) -> bool {
        self.archive_path(archive).as_std_path().is_file()
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), SpawriousError> {
        let parent = path
            .parent()
            .ok_or_else(|| SpawriousError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| SpawriousError::Filesystem(err.to_string()))?;
        let mut temp = Builder::new()
            .prefix(".spawrious")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| SpawriousError::Filesystem(err.to_string()))?;
        temp.write_all(content)
            .map_err(|err| SpawriousError::Filesystem(err.to_string()))?;
        temp.as_file()
            .sync_all()
            .map_err(|err| SpawriousError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| SpawriousError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, ArchiveStore) {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        (temp, ArchiveStore::new(root))
    }

    #[test]
    fn layout_paths() {
        let (_temp, store) = temp_store();
        assert!(
            store
                .archive_path(ArchiveId::O2oHard)
                .ends_with("spawrious__o2o_hard.tar.gz")
        );
        assert!(store.manifest_path().ends_with("datasets.txt"));
        assert!(
            store
                .snapshot_path(VariantCode::Sc22)
                .ends_with("spawrious224/sc22.json")
        );
    }

    #[test]
    fn missing_manifest_means_nothing_extracted() {
        let (_temp, store) = temp_store();
        assert!(store.entries().unwrap().is_empty());
        assert!(!store.is_extracted("o2o_easy").unwrap());
    }

    #[test]
    fn mark_extracted_appends_without_dedup() {
        let (_temp, store) = temp_store();
        store.mark_extracted("m2m").unwrap();
        store.mark_extracted("m2m").unwrap();
        assert_eq!(store.entries().unwrap(), vec!["m2m", "m2m"]);
        assert!(store.is_extracted("m2m").unwrap());
        assert!(!store.is_extracted("o2o_easy").unwrap());
    }

    #[test]
    fn entire_dataset_satisfies_every_name() {
        let (_temp, store) = temp_store();
        store.mark_extracted(ENTIRE_DATASET_MARKER).unwrap();
        assert!(store.is_extracted("o2o_medium").unwrap());
        assert!(store.is_extracted("m2m").unwrap());
    }

    #[test]
    fn reads_manifest_with_leading_newlines() {
        let (_temp, store) = temp_store();
        fs::write(store.manifest_path().as_std_path(), "\no2o_easy\no2o_hard").unwrap();
        assert!(store.is_extracted("o2o_easy").unwrap());
        store.mark_extracted("m2m").unwrap();
        assert_eq!(store.entries().unwrap(), vec!["o2o_easy", "o2o_hard", "m2m"]);
    }
}
