use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SpawriousError {
    #[error("unknown dataset name: {0}")]
    #[diagnostic(help(
        "expected one of entire_dataset, o2o_easy, o2o_medium, o2o_hard, m2m, m2m_easy, m2m_medium, m2m_hard"
    ))]
    UnknownDataset(String),

    #[error("no benchmark variant for dataset: {0}")]
    UnknownVariant(String),

    #[error("unknown class label: {0}")]
    UnknownClass(String),

    #[error("config file {0} does not exist")]
    MissingConfig(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("archive request failed: {0}")]
    TransferHttp(String),

    #[error("archive host returned status {status}: {message}")]
    TransferStatus { status: u16, message: String },

    #[error("failed to extract archive {path}: {message}")]
    Extraction { path: String, message: String },

    #[error("path not found: {0}")]
    PathResolution(String),

    #[error("class {class} not present under {root}")]
    MissingClass { class: String, root: String },

    #[error("class groups disagree on placement count: expected {expected}, found {found}")]
    RaggedGroups { expected: usize, found: usize },

    #[error("combination has no {0} placements")]
    EmptyCombination(&'static str),

    #[error("path {path} does not start with snapshot prefix {prefix}")]
    RebindPrefix { path: String, prefix: String },

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl SpawriousError {
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SpawriousError::UnknownDataset(_)
                | SpawriousError::UnknownVariant(_)
                | SpawriousError::UnknownClass(_)
                | SpawriousError::MissingConfig(_)
                | SpawriousError::ConfigRead(_)
                | SpawriousError::ConfigParse(_)
        )
    }

    pub fn is_transfer(&self) -> bool {
        matches!(
            self,
            SpawriousError::TransferHttp(_) | SpawriousError::TransferStatus { .. }
        )
    }
}
