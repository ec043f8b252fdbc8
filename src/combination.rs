//! Turns declarative class-group placements into the assembled record.
//!
//! Training placements are laid out as a matrix indexed by class group and
//! placement position. Column `p` of that matrix becomes training group `p`:
//! every class group contributes exactly its own placement at position `p`.
//! Test placements go through the same matrix, after which all columns are
//! flattened into the single test environment.

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::domain::{ClassLabel, Layout, Location};
use crate::error::SpawriousError;
use crate::folder::ImageFolder;
use crate::record::{
    DatasetRecord, LabeledDataset, Subset, TEST_ENVIRONMENT, train_environment_name,
};
use crate::transform::Preprocessing;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainPlacement {
    pub location: Location,
    /// Maximum images kept per class of the group.
    pub cap: usize,
}

impl TrainPlacement {
    pub fn new(location: impl Into<Location>, cap: usize) -> Self {
        Self {
            location: location.into(),
            cap,
        }
    }
}

pub trait Placement {
    fn location(&self) -> &Location;
    fn cap(&self) -> Option<usize>;
}

impl Placement for TrainPlacement {
    fn location(&self) -> &Location {
        &self.location
    }

    fn cap(&self) -> Option<usize> {
        Some(self.cap)
    }
}

impl Placement for Location {
    fn location(&self) -> &Location {
        self
    }

    fn cap(&self) -> Option<usize> {
        None
    }
}

/// Classes sharing one correlation pattern, with their ordered placements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassGroup<P> {
    pub classes: Vec<ClassLabel>,
    pub placements: Vec<P>,
}

impl<P> ClassGroup<P> {
    pub fn new(classes: &[ClassLabel], placements: Vec<P>) -> Self {
        Self {
            classes: classes.to_vec(),
            placements,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Combinations<P> {
    /// Class groups in declaration order.
    Grouped(Vec<ClassGroup<P>>),
    /// One unfiltered dataset per location.
    Flat(Vec<Location>),
}

pub type TrainCombinations = Combinations<TrainPlacement>;
pub type TestCombinations = Combinations<Location>;

pub struct CombinationResolver {
    image_root: Utf8PathBuf,
    layout: Layout,
    augment: bool,
}

impl CombinationResolver {
    pub fn new(image_root: Utf8PathBuf, layout: Layout, augment: bool) -> Self {
        Self {
            image_root,
            layout,
            augment,
        }
    }

    pub fn image_root(&self) -> &Utf8Path {
        &self.image_root
    }

    pub fn placement_root(&self, placement: usize, location: &Location) -> Utf8PathBuf {
        self.image_root
            .join(self.layout.folder_index(placement).to_string())
            .join(location.as_str())
    }

    pub fn resolve(
        &self,
        train: &TrainCombinations,
        test: &TestCombinations,
    ) -> Result<DatasetRecord, SpawriousError> {
        let mut table = FolderTable::default();

        let train_columns = match train {
            Combinations::Grouped(groups) => self.columns(groups, &mut table)?,
            // the flat training path always reads the shared folder
            Combinations::Flat(locations) => locations
                .iter()
                .map(|location| {
                    let root = self.image_root.join("0").join(location.as_str());
                    table.open_all(&root).map(|subset| vec![subset])
                })
                .collect::<Result<Vec<_>, _>>()?,
        };

        let test_parts = match test {
            Combinations::Grouped(groups) => self
                .columns(groups, &mut table)?
                .into_iter()
                .flatten()
                .collect::<Vec<_>>(),
            Combinations::Flat(locations) => locations
                .iter()
                .enumerate()
                .map(|(idx, location)| table.open_all(&self.placement_root(idx, location)))
                .collect::<Result<Vec<_>, _>>()?,
        };

        let mut environments = Vec::with_capacity(train_columns.len() + 1);
        environments.push(LabeledDataset {
            name: TEST_ENVIRONMENT.to_string(),
            preprocess: Preprocessing::test(),
            parts: test_parts,
        });
        let train_preprocess = Preprocessing::train(self.augment);
        for (group, parts) in train_columns.into_iter().enumerate() {
            environments.push(LabeledDataset {
                name: train_environment_name(group),
                preprocess: train_preprocess.clone(),
                parts,
            });
        }

        tracing::info!(
            environments = environments.len(),
            folders = table.folders.len(),
            "combinations resolved"
        );
        Ok(DatasetRecord {
            folders: table.folders,
            environments,
        })
    }

    /// Builds the [class group][placement] matrix and returns its columns.
    fn columns<P: Placement>(
        &self,
        groups: &[ClassGroup<P>],
        table: &mut FolderTable,
    ) -> Result<Vec<Vec<Subset>>, SpawriousError> {
        let first = groups
            .first()
            .ok_or(SpawriousError::EmptyCombination("class-group"))?;
        let width = first.placements.len();
        if width == 0 {
            return Err(SpawriousError::EmptyCombination("placement"));
        }
        if let Some(ragged) = groups.iter().find(|g| g.placements.len() != width) {
            return Err(SpawriousError::RaggedGroups {
                expected: width,
                found: ragged.placements.len(),
            });
        }

        let mut matrix = Vec::with_capacity(groups.len());
        for group in groups {
            let mut row = Vec::with_capacity(width);
            for (position, placement) in group.placements.iter().enumerate() {
                let root = self.placement_root(position, placement.location());
                let folder = table.open(&root)?;
                let indices = table.folders[folder].select(&group.classes, placement.cap())?;
                row.push(Subset { folder, indices });
            }
            matrix.push(row);
        }

        let mut columns = vec![Vec::with_capacity(groups.len()); width];
        for row in matrix {
            for (position, subset) in row.into_iter().enumerate() {
                columns[position].push(subset);
            }
        }
        Ok(columns)
    }
}

/// Scanned folders, each scanned at most once per resolution.
#[derive(Default)]
struct FolderTable {
    folders: Vec<ImageFolder>,
    by_root: HashMap<Utf8PathBuf, usize>,
}

impl FolderTable {
    fn open(&mut self, root: &Utf8Path) -> Result<usize, SpawriousError> {
        if let Some(idx) = self.by_root.get(root) {
            return Ok(*idx);
        }
        let folder = ImageFolder::scan(root)?;
        let idx = self.folders.len();
        self.folders.push(folder);
        self.by_root.insert(root.to_path_buf(), idx);
        Ok(idx)
    }

    fn open_all(&mut self, root: &Utf8Path) -> Result<Subset, SpawriousError> {
        let folder = self.open(root)?;
        Ok(Subset {
            folder,
            indices: (0..self.folders[folder].len()).collect(),
        })
    }
}
