use std::fs;

use assert_matches::assert_matches;

use spawrious_data::config::{ConfigLoader, ConfigOverrides};
use spawrious_data::domain::DatasetName;
use spawrious_data::error::SpawriousError;

#[test]
fn explicit_config_file_is_read() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("bench.json");
    fs::write(
        &path,
        r#"{"dataset_name": "o2o_medium", "root_dir": "/srv/spawrious"}"#,
    )
    .unwrap();

    let resolved =
        ConfigLoader::resolve(path.to_str(), ConfigOverrides::default()).unwrap();

    assert_eq!(resolved.dataset_name, DatasetName::O2oMedium);
    assert_eq!(resolved.root_dir, "/srv/spawrious");
}

#[test]
fn overrides_replace_file_values() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("bench.json");
    fs::write(&path, r#"{"dataset_name": "o2o_medium"}"#).unwrap();

    let resolved = ConfigLoader::resolve(
        path.to_str(),
        ConfigOverrides {
            dataset_name: Some("m2m".to_string()),
            root_dir: Some("/data".to_string()),
        },
    )
    .unwrap();

    assert_eq!(resolved.dataset_name, DatasetName::M2m);
    assert_eq!(resolved.root_dir, "/data");
}

#[test]
fn missing_explicit_file_is_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    let err = ConfigLoader::resolve(path.to_str(), ConfigOverrides::default()).unwrap_err();
    assert_matches!(err, SpawriousError::MissingConfig(_));
}

#[test]
fn malformed_file_is_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("bench.json");
    fs::write(&path, "{ dataset_name: o2o_easy").unwrap();
    let err = ConfigLoader::resolve(path.to_str(), ConfigOverrides::default()).unwrap_err();
    assert_matches!(err, SpawriousError::ConfigParse(_));
}
