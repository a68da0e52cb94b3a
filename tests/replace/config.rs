//! Namespaces built from TOML config files.

use crate::common::*;
use strata_replica::{ConfigError, CONFIG_FILE_NAME};
use tempfile::TempDir;

#[test]
fn namespace_from_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(
        &path,
        r#"
name = "users"
storage = "device"
single_bin = true
conflict_resolution_policy = "last-update-time"
index_capacity = 64
"#,
    )
    .unwrap();

    let config = NamespaceConfig::from_file(&path).unwrap();
    let ns = Namespace::from_config(config).unwrap();
    assert_eq!(ns.name(), "users");
    assert_eq!(ns.layout(), StorageLayout::DEVICE_SINGLE_BIN);
    assert_eq!(
        ns.conflict_resolution_policy(),
        ConflictResolutionPolicy::LastUpdateTime
    );
    assert_eq!(ns.index().capacity(), 64);

    ns.replace_if_better(&remote(Origin::Migration, b"k", 1, 1))
        .unwrap();
    assert_eq!(ns.read(&digest(b"k")).unwrap().bins, vec![Bin::new("v", 1i64)]);
}

#[test]
fn written_config_reloads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    let config = NamespaceConfig::new("orders")
        .with_strong_consistency(true)
        .with_max_record_size(4096);
    config.write_to_file(&path).unwrap();

    let loaded = NamespaceConfig::from_file(&path).unwrap();
    assert_eq!(loaded, config);
    let ns = Namespace::from_config(loaded).unwrap();
    assert_eq!(
        ns.conflict_resolution_policy(),
        ConflictResolutionPolicy::Consistency
    );
}

#[test]
fn invalid_files_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);

    assert!(matches!(
        NamespaceConfig::from_file(&path),
        Err(ConfigError::Io { .. })
    ));

    std::fs::write(&path, "name = \"x\"\nstorage = \"tape\"\n").unwrap();
    assert_eq!(
        NamespaceConfig::from_file(&path),
        Err(ConfigError::InvalidStorage("tape".to_string()))
    );

    std::fs::write(&path, "name = \"x\"\nconflict_resolution_policy = \"consistency\"\n").unwrap();
    assert_eq!(
        NamespaceConfig::from_file(&path),
        Err(ConfigError::ConsistencyPolicyNotConfigurable)
    );

    std::fs::write(&path, "name = [").unwrap();
    assert!(matches!(
        NamespaceConfig::from_file(&path),
        Err(ConfigError::Parse(_))
    ));
}
