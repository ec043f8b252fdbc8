use std::collections::BTreeMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ClassLabel, VariantCode};
use crate::error::SpawriousError;
use crate::folder::{ImageFolder, Sample};
use crate::store::ArchiveStore;
use crate::transform::Preprocessing;

/// Root that snapshot paths are written relative to.
pub const SNAPSHOT_ROOT: &str = "./data";
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;
pub const TEST_ENVIRONMENT: &str = "Test";

pub fn train_environment_name(group: usize) -> String {
    format!("SC_group_{}", group + 1)
}

/// Positions into one folder of the record's folder table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subset {
    pub folder: usize,
    pub indices: Vec<usize>,
}

/// Concatenation of subsets, read with one preprocessing pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledDataset {
    pub name: String,
    pub preprocess: Preprocessing,
    pub parts: Vec<Subset>,
}

impl LabeledDataset {
    pub fn len(&self) -> usize {
        self.parts.iter().map(|part| part.indices.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Assembled benchmark: element 0 is the flat test set, the rest are the
/// training groups in group-index order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub folders: Vec<ImageFolder>,
    pub environments: Vec<LabeledDataset>,
}

impl DatasetRecord {
    pub fn len(&self) -> usize {
        self.environments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.environments.is_empty()
    }

    pub fn environment_names(&self) -> Vec<&str> {
        self.environments.iter().map(|env| env.name.as_str()).collect()
    }

    pub fn view(&self, environment: usize) -> Option<DatasetView<'_>> {
        self.environments
            .get(environment)
            .map(|dataset| DatasetView {
                record: self,
                dataset,
            })
    }

    pub fn test(&self) -> Option<DatasetView<'_>> {
        self.view(0)
    }

    pub fn train_groups(&self) -> impl Iterator<Item = DatasetView<'_>> {
        (1..self.environments.len()).filter_map(move |idx| self.view(idx))
    }

    /// Copy whose paths are rewritten from `root` to the snapshot placeholder.
    pub fn detach(&self, root: &Utf8Path) -> Result<DatasetRecord, SpawriousError> {
        self.map_paths(|path| {
            let relative = path
                .strip_prefix(root)
                .map_err(|_| SpawriousError::RebindPrefix {
                    path: path.to_string(),
                    prefix: root.to_string(),
                })?;
            Ok(Utf8PathBuf::from(SNAPSHOT_ROOT).join(relative))
        })
    }

    /// Copy whose placeholder-rooted paths now live under `new_root`.
    ///
    /// Paths that do not carry the placeholder are rejected, so a record
    /// rebound once cannot be rebound again.
    pub fn rebind(&self, new_root: &Utf8Path) -> Result<DatasetRecord, SpawriousError> {
        self.map_paths(|path| {
            let relative = path
                .strip_prefix(SNAPSHOT_ROOT)
                .map_err(|_| SpawriousError::RebindPrefix {
                    path: path.to_string(),
                    prefix: SNAPSHOT_ROOT.to_string(),
                })?;
            Ok(new_root.join(relative))
        })
    }

    fn map_paths<F>(&self, rewrite: F) -> Result<DatasetRecord, SpawriousError>
    where
        F: Fn(&Utf8Path) -> Result<Utf8PathBuf, SpawriousError>,
    {
        let folders = self
            .folders
            .iter()
            .map(|folder| {
                let samples = folder
                    .samples
                    .iter()
                    .map(|sample| {
                        Ok(Sample {
                            path: rewrite(&sample.path)?,
                            label: sample.label,
                        })
                    })
                    .collect::<Result<Vec<_>, SpawriousError>>()?;
                Ok(ImageFolder {
                    root: rewrite(&folder.root)?,
                    classes: folder.classes.clone(),
                    samples,
                })
            })
            .collect::<Result<Vec<_>, SpawriousError>>()?;
        Ok(DatasetRecord {
            folders,
            environments: self.environments.clone(),
        })
    }
}

/// Read access to one environment of a record.
#[derive(Debug, Clone, Copy)]
pub struct DatasetView<'a> {
    record: &'a DatasetRecord,
    dataset: &'a LabeledDataset,
}

impl<'a> DatasetView<'a> {
    pub fn name(&self) -> &'a str {
        &self.dataset.name
    }

    pub fn preprocess(&self) -> &'a Preprocessing {
        &self.dataset.preprocess
    }

    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    pub fn get(&self, mut index: usize) -> Option<&'a Sample> {
        for part in &self.dataset.parts {
            if index < part.indices.len() {
                let folder = self.record.folders.get(part.folder)?;
                return folder.samples.get(part.indices[index]);
            }
            index -= part.indices.len();
        }
        None
    }

    pub fn iter(self) -> impl Iterator<Item = &'a Sample> + 'a {
        let folders = &self.record.folders;
        self.dataset.parts.iter().flat_map(move |part| {
            part.indices
                .iter()
                .filter_map(move |idx| folders.get(part.folder)?.samples.get(*idx))
        })
    }

    pub fn class_counts(&self) -> BTreeMap<ClassLabel, usize> {
        let mut counts = BTreeMap::new();
        for sample in self.iter() {
            *counts.entry(sample.label).or_insert(0) += 1;
        }
        counts
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: u32,
    pub variant: VariantCode,
    pub built_at: DateTime<Utc>,
    pub record: DatasetRecord,
}

impl Snapshot {
    pub fn new(variant: VariantCode, detached: DatasetRecord) -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            variant,
            built_at: Utc::now(),
            record: detached,
        }
    }

    pub fn read(path: &Utf8Path) -> Result<Self, SpawriousError> {
        let content = fs::read(path.as_std_path())
            .map_err(|err| SpawriousError::Snapshot(format!("read {path}: {err}")))?;
        let snapshot: Snapshot = serde_json::from_slice(&content)
            .map_err(|err| SpawriousError::Snapshot(format!("parse {path}: {err}")))?;
        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(SpawriousError::Snapshot(format!(
                "unsupported schema version {} in {path}",
                snapshot.schema_version
            )));
        }
        Ok(snapshot)
    }

    pub fn write(&self, path: &Utf8Path) -> Result<(), SpawriousError> {
        let content = serde_json::to_vec(self)
            .map_err(|err| SpawriousError::Snapshot(err.to_string()))?;
        ArchiveStore::write_bytes_atomic(path, &content)
    }
}
