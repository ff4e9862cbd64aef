//! Integration test: `templates/config.yaml` parses into a valid
//! `Config`, and loading behaves for missing or invalid files.

use std::path::Path;

use concierge::config::Config;
use tempfile::TempDir;

#[test]
fn template_config_parses() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("templates/config.yaml");
    let contents = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));

    let cfg: Config = serde_yaml::from_str(&contents)
        .unwrap_or_else(|e| panic!("template config does not parse: {e}"));
    cfg.validate().unwrap();

    // The template documents the defaults.
    let defaults = Config::default();
    assert_eq!(cfg.quota, defaults.quota);
    assert_eq!(cfg.sessions, defaults.sessions);
    assert_eq!(cfg.artifacts, defaults.artifacts);
    assert_eq!(cfg.model.endpoint, defaults.model.endpoint);
    assert_eq!(cfg.model.model, defaults.model.model);
    assert_eq!(cfg.tools.image_model, defaults.tools.image_model);
}

#[tokio::test]
async fn missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let cfg = Config::load(&dir.path().join("nope.yaml")).await.unwrap();
    assert_eq!(cfg.quota.limit, 10);
    assert_eq!(cfg.sessions.max_per_user, 5);
    // Relative data dir is anchored somewhere absolute.
    assert!(Path::new(&cfg.data_dir).is_absolute() || cfg.data_dir.starts_with('.'));
}

#[tokio::test]
async fn absolute_data_dir_is_kept() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("records");
    let path = dir.path().join("config.yaml");
    std::fs::write(
        &path,
        format!("data_dir: {}\nquota:\n  limit: 3\n", data.display()),
    )
    .unwrap();

    let cfg = Config::load(&path).await.unwrap();
    assert_eq!(cfg.data_dir(), data);
    assert_eq!(cfg.quota_policy().limit, 3);
}

#[tokio::test]
async fn unknown_top_level_field_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "quota:\n  limit: 3\nchannels: {}\n").unwrap();
    assert!(Config::load(&path).await.is_err());
}

#[tokio::test]
async fn invalid_values_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "sessions:\n  max_per_user: 0\n").unwrap();
    let err = Config::load(&path).await.unwrap_err();
    assert!(err.to_string().contains("max_per_user"), "{err}");
}

#[tokio::test]
async fn oversized_reset_interval_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "quota:\n  reset_interval_minutes: 1000000000000000\n").unwrap();
    let err = Config::load(&path).await.unwrap_err();
    assert!(err.to_string().contains("reset_interval_minutes"), "{err}");

    std::fs::write(&path, "quota:\n  reset_interval_minutes: 525600\n").unwrap();
    let cfg = Config::load(&path).await.unwrap();
    assert_eq!(
        cfg.quota_policy().reset_interval,
        chrono::Duration::days(365)
    );
}
