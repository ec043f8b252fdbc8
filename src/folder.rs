use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::ClassLabel;
use crate::error::SpawriousError;
use crate::fs_util::{sorted_children, walk_files_sorted};

static IMAGE_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(jpe?g|png|ppm|bmp|pgm|tiff?|webp)$").expect("static regex")
});

pub fn is_image_file(path: &Utf8Path) -> bool {
    IMAGE_EXTENSION.is_match(path.as_str())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub path: Utf8PathBuf,
    pub label: ClassLabel,
}

/// Images under `root/<class>/...`, classes and files in name order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFolder {
    pub root: Utf8PathBuf,
    pub classes: Vec<ClassLabel>,
    pub samples: Vec<Sample>,
}

impl ImageFolder {
    pub fn scan(root: &Utf8Path) -> Result<Self, SpawriousError> {
        if !root.as_std_path().is_dir() {
            return Err(SpawriousError::PathResolution(root.to_string()));
        }

        let mut classes = Vec::new();
        let mut samples = Vec::new();
        for class_dir in sorted_children(root.as_std_path())? {
            if !class_dir.is_dir() {
                continue;
            }
            let class_dir = to_utf8(class_dir)?;
            let Some(name) = class_dir.file_name() else {
                continue;
            };
            let label = match name.parse::<ClassLabel>() {
                Ok(label) => label,
                Err(_) => {
                    tracing::warn!(dir = %class_dir, "skipping unknown class directory");
                    continue;
                }
            };
            classes.push(label);
            for file in walk_files_sorted(class_dir.as_std_path())? {
                let file = to_utf8(file)?;
                if is_image_file(&file) {
                    samples.push(Sample { path: file, label });
                }
            }
        }
        tracing::debug!(
            root = %root,
            classes = classes.len(),
            samples = samples.len(),
            "scanned image folder"
        );

        Ok(Self {
            root: root.to_path_buf(),
            classes,
            samples,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn class_index(&self) -> ClassIndex {
        let mut positions: BTreeMap<ClassLabel, Vec<usize>> = BTreeMap::new();
        for (idx, sample) in self.samples.iter().enumerate() {
            positions.entry(sample.label).or_default().push(idx);
        }
        ClassIndex { positions }
    }

    /// Sample positions for `classes`, grouped in the order given, each class
    /// truncated to its first `cap` samples when a cap is set.
    pub fn select(
        &self,
        classes: &[ClassLabel],
        cap: Option<usize>,
    ) -> Result<Vec<usize>, SpawriousError> {
        for class in classes {
            if !self.classes.contains(class) {
                return Err(SpawriousError::MissingClass {
                    class: class.to_string(),
                    root: self.root.to_string(),
                });
            }
        }
        Ok(self.class_index().take_prefix(classes, cap))
    }
}

/// Class to ordered sample positions.
#[derive(Debug, Clone, Default)]
pub struct ClassIndex {
    positions: BTreeMap<ClassLabel, Vec<usize>>,
}

impl ClassIndex {
    pub fn positions(&self, class: ClassLabel) -> &[usize] {
        self.positions
            .get(&class)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn take_prefix(&self, classes: &[ClassLabel], cap: Option<usize>) -> Vec<usize> {
        let mut kept = Vec::new();
        for class in classes {
            let positions = self.positions(*class);
            let take = cap.map_or(positions.len(), |cap| cap.min(positions.len()));
            kept.extend_from_slice(&positions[..take]);
        }
        kept
    }
}

fn to_utf8(path: PathBuf) -> Result<Utf8PathBuf, SpawriousError> {
    Utf8PathBuf::from_path_buf(path).map_err(|path| {
        SpawriousError::Filesystem(format!("non-utf8 path: {}", path.display()))
    })
}
