use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SpawriousError;

/// Names accepted by `download` and `load`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetName {
    EntireDataset,
    O2oEasy,
    O2oMedium,
    O2oHard,
    M2m,
    M2mEasy,
    M2mMedium,
    M2mHard,
}

impl DatasetName {
    pub const ALL: [DatasetName; 8] = [
        DatasetName::EntireDataset,
        DatasetName::O2oEasy,
        DatasetName::O2oMedium,
        DatasetName::O2oHard,
        DatasetName::M2m,
        DatasetName::M2mEasy,
        DatasetName::M2mMedium,
        DatasetName::M2mHard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetName::EntireDataset => "entire_dataset",
            DatasetName::O2oEasy => "o2o_easy",
            DatasetName::O2oMedium => "o2o_medium",
            DatasetName::O2oHard => "o2o_hard",
            DatasetName::M2m => "m2m",
            DatasetName::M2mEasy => "m2m_easy",
            DatasetName::M2mMedium => "m2m_medium",
            DatasetName::M2mHard => "m2m_hard",
        }
    }

    /// All `m2m*` names share one archive.
    pub fn archive(&self) -> ArchiveId {
        match self {
            DatasetName::EntireDataset => ArchiveId::EntireDataset,
            DatasetName::O2oEasy => ArchiveId::O2oEasy,
            DatasetName::O2oMedium => ArchiveId::O2oMedium,
            DatasetName::O2oHard => ArchiveId::O2oHard,
            DatasetName::M2m
            | DatasetName::M2mEasy
            | DatasetName::M2mMedium
            | DatasetName::M2mHard => ArchiveId::M2m,
        }
    }

    pub fn variant(&self) -> Result<VariantCode, SpawriousError> {
        match self {
            DatasetName::O2oEasy => Ok(VariantCode::Sc11),
            DatasetName::O2oMedium => Ok(VariantCode::Sc12),
            DatasetName::O2oHard => Ok(VariantCode::Sc13),
            DatasetName::M2mHard => Ok(VariantCode::Sc21),
            DatasetName::M2mEasy => Ok(VariantCode::Sc22),
            DatasetName::M2mMedium => Ok(VariantCode::Sc23),
            DatasetName::EntireDataset | DatasetName::M2m => {
                Err(SpawriousError::UnknownVariant(self.as_str().to_string()))
            }
        }
    }
}

impl fmt::Display for DatasetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DatasetName {
    type Err = SpawriousError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        DatasetName::ALL
            .into_iter()
            .find(|name| name.as_str() == normalized)
            .ok_or_else(|| SpawriousError::UnknownDataset(value.to_string()))
    }
}

/// One downloadable archive on the remote host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveId {
    EntireDataset,
    O2oEasy,
    O2oMedium,
    O2oHard,
    M2m,
}

/// Marker line that satisfies every manifest lookup.
pub const ENTIRE_DATASET_MARKER: &str = "entire_dataset";

impl ArchiveId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveId::EntireDataset => ENTIRE_DATASET_MARKER,
            ArchiveId::O2oEasy => "o2o_easy",
            ArchiveId::O2oMedium => "o2o_medium",
            ArchiveId::O2oHard => "o2o_hard",
            ArchiveId::M2m => "m2m",
        }
    }

    pub fn url(&self) -> &'static str {
        match self {
            ArchiveId::EntireDataset => {
                "https://www.dropbox.com/s/wc9mwza5yk66i83/spawrious224.tar.gz?dl=1"
            }
            ArchiveId::O2oEasy => {
                "https://www.dropbox.com/s/bonf1elisg2ohiq/spawrious__o2o_easy.tar.gz?dl=1"
            }
            ArchiveId::O2oMedium => {
                "https://www.dropbox.com/s/xfea065mhh70me1/spawrious__o2o_medium.tar.gz?dl=1"
            }
            ArchiveId::O2oHard => {
                "https://www.dropbox.com/s/m5eeqp0nsc31nyt/spawrious__o2o_hard.tar.gz?dl=1"
            }
            ArchiveId::M2m => {
                "https://www.dropbox.com/s/spwszi0rxbf53f8/spawrious__m2m.tar.gz?dl=1"
            }
        }
    }

    pub fn file_name(&self) -> String {
        format!("spawrious__{}.tar.gz", self.as_str())
    }
}

impl fmt::Display for ArchiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The six concrete benchmark variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantCode {
    Sc11,
    Sc12,
    Sc13,
    Sc21,
    Sc22,
    Sc23,
}

impl VariantCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantCode::Sc11 => "sc11",
            VariantCode::Sc12 => "sc12",
            VariantCode::Sc13 => "sc13",
            VariantCode::Sc21 => "sc21",
            VariantCode::Sc22 => "sc22",
            VariantCode::Sc23 => "sc23",
        }
    }

    pub fn snapshot_file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl fmt::Display for VariantCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Background category; one directory of extracted images.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Location(String);

impl Location {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Location {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Dog breed; variant order is the label index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassLabel {
    Bulldog,
    Corgi,
    Dachshund,
    Labrador,
}

impl ClassLabel {
    pub const ALL: [ClassLabel; 4] = [
        ClassLabel::Bulldog,
        ClassLabel::Corgi,
        ClassLabel::Dachshund,
        ClassLabel::Labrador,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassLabel::Bulldog => "bulldog",
            ClassLabel::Corgi => "corgi",
            ClassLabel::Dachshund => "dachshund",
            ClassLabel::Labrador => "labrador",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ClassLabel {
    type Err = SpawriousError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        ClassLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == normalized)
            .ok_or_else(|| SpawriousError::UnknownClass(value.to_string()))
    }
}

/// Folder convention for the placement directories under the image root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Every placement reads `0/<location>`.
    Shared,
    /// Placement `i` reads `<i>/<location>`.
    Indexed,
}

impl Layout {
    pub fn folder_index(&self, placement: usize) -> usize {
        match self {
            Layout::Shared => 0,
            Layout::Indexed => placement,
        }
    }
}
