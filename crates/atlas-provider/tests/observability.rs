use std::fs;

use atlas_provider::bootstrap;
use atlas_provider::observability::apply_logging_level;

// Installs the process-wide subscriber, so it lives in its own test binary.
#[test]
fn bootstrap_installs_reloadable_tracing() {
    assert!(!apply_logging_level("debug"), "no subscriber installed yet");

    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("atlas-provider.toml");
    fs::write(
        &path,
        r#"
[logging]
level = "warn"

[provider_configs.default]
region = "eu-west-1"
secret_name = "atlas/root"
"#,
    )
    .expect("write toml");

    let (config, _connector) = bootstrap(path.to_str()).expect("bootstrap");
    assert_eq!(config.logging.level, "warn");
    assert_eq!(config.provider_configs.len(), 1);

    assert!(apply_logging_level("debug"));
    assert!(apply_logging_level("atlas_reconciler=trace,info"));
    assert!(!apply_logging_level("[invalid"));
}
