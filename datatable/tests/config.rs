use datatable::{ConnectInfo, DataTableConfig, PoolSettings};
use serial_test::serial;
use std::time::Duration;

#[test]
#[serial]
fn test_profile_file_overrides_base() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("datatable.yaml"),
        "datatable:\n  db:\n    host: base-host\n    name: classicmodels\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("datatable-prod.yaml"),
        "datatable:\n  db:\n    host: prod-host\n",
    )
    .unwrap();

    let config = DataTableConfig::load_from(dir.path(), "prod").unwrap();
    assert_eq!(config.profile(), "prod");
    let info = ConnectInfo::from_config(&config).unwrap();
    assert_eq!(info.host, "prod-host");
    assert_eq!(info.db, "classicmodels");
}

#[test]
#[serial]
fn test_environment_overrides_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("datatable.yaml"),
        "datatable:\n  pool:\n    statement_timeout_ms: 1000\n",
    )
    .unwrap();

    std::env::set_var("DATATABLE_POOL_STATEMENT_TIMEOUT_MS", "250");
    let config = DataTableConfig::load_from(dir.path(), "dev");
    std::env::remove_var("DATATABLE_POOL_STATEMENT_TIMEOUT_MS");

    let settings = PoolSettings::from_config(&config.unwrap()).unwrap();
    assert_eq!(settings.statement_timeout, Duration::from_millis(250));
}

#[test]
#[serial]
fn test_missing_files_yield_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = DataTableConfig::load_from(dir.path(), "dev").unwrap();
    assert_eq!(ConnectInfo::from_config(&config).unwrap(), ConnectInfo::default());
}
