use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::DatasetName;
use crate::error::SpawriousError;
use crate::store::ArchiveStore;

pub const DEFAULT_CONFIG_FILE: &str = "spawrious.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub dataset_name: Option<String>,
    #[serde(default)]
    pub root_dir: Option<String>,
}

/// Values given on the command line, applied over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub dataset_name: Option<String>,
    pub root_dir: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub dataset_name: DatasetName,
    pub root_dir: Utf8PathBuf,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `path`, or `spawrious.json` in the working directory when no
    /// path is given. Only the default file may be absent.
    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, SpawriousError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| SpawriousError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content)
                .map_err(|err| SpawriousError::ConfigParse(err.to_string()))?
        } else if path.is_some() {
            return Err(SpawriousError::MissingConfig(config_path));
        } else {
            tracing::debug!("no {DEFAULT_CONFIG_FILE} in working directory, using defaults");
            Config::default()
        };

        Self::resolve_config(config, overrides)
    }

    pub fn resolve_config(
        config: Config,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, SpawriousError> {
        let dataset_name = match overrides.dataset_name.or(config.dataset_name) {
            Some(name) => name.parse()?,
            None => DatasetName::EntireDataset,
        };
        let root_dir = match overrides.root_dir.or(config.root_dir) {
            Some(dir) => Utf8PathBuf::from(dir),
            None => ArchiveStore::default_root()?,
        };

        Ok(ResolvedConfig {
            dataset_name,
            root_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn command_line_wins_over_file() {
        let config: Config =
            serde_json::from_str(r#"{"dataset_name":"o2o_hard","root_dir":"/data/file"}"#)
                .unwrap();
        let resolved = ConfigLoader::resolve_config(
            config,
            ConfigOverrides {
                dataset_name: Some("M2M_Easy".to_string()),
                root_dir: None,
            },
        )
        .unwrap();

        assert_eq!(resolved.dataset_name, DatasetName::M2mEasy);
        assert_eq!(resolved.root_dir, "/data/file");
    }

    #[test]
    fn defaults_apply_to_empty_file() {
        let config: Config = serde_json::from_str("{}").unwrap();
        let resolved = ConfigLoader::resolve_config(
            config,
            ConfigOverrides {
                dataset_name: None,
                root_dir: Some("/tmp/spawrious".to_string()),
            },
        )
        .unwrap();
        assert_eq!(resolved.dataset_name, DatasetName::EntireDataset);
    }

    #[test]
    fn bad_name_in_file_is_configuration_error() {
        let config = Config {
            dataset_name: Some("o2o_extreme".to_string()),
            root_dir: Some("/tmp".to_string()),
        };
        let err = ConfigLoader::resolve_config(config, ConfigOverrides::default()).unwrap_err();
        assert!(err.is_configuration());
        assert_matches!(err, SpawriousError::UnknownDataset(_));
    }
}
