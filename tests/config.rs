use serial_test::serial;
use stylemate::config::{config_path, load_config_from, save_config_to};
use stylemate::inference::ModelLocator;
use stylemate::{load_config, save_config, Config, InputSource};
use tempfile::tempdir;

#[test]
#[serial]
fn path_uses_env_variable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("custom.json");
    std::env::set_var("STYLEMATE_CONFIG_PATH", &path);
    assert_eq!(config_path(), path);
    std::env::remove_var("STYLEMATE_CONFIG_PATH");
    assert_eq!(config_path(), std::path::PathBuf::from("stylemate.json"));
}

#[test]
#[serial]
fn missing_file_yields_defaults() {
    let dir = tempdir().unwrap();
    std::env::set_var("STYLEMATE_CONFIG_PATH", dir.path().join("absent.json"));
    let cfg = load_config();
    assert_eq!(cfg, Config::default());
    assert_eq!(cfg.loop_fps, 60.0);
    assert_eq!(cfg.webcam.width, 400);
    assert_eq!(cfg.webcam.height, 300);
    assert!(cfg.webcam.mirror);
    assert_eq!(cfg.gating.min_confidence, Some(0.60));
    assert!(cfg.gating.face_detector.is_none());
    std::env::remove_var("STYLEMATE_CONFIG_PATH");
}

#[test]
#[serial]
fn save_then_load_roundtrip() {
    let dir = tempdir().unwrap();
    std::env::set_var(
        "STYLEMATE_CONFIG_PATH",
        dir.path().join("nested").join("stylemate.json"),
    );
    let mut cfg = Config::default();
    cfg.initial_source = InputSource::Upload;
    cfg.gating.face_detector = Some(ModelLocator {
        dir: "models/faces".into(),
        hf_repo: Some("example/face-detector".into()),
    });
    save_config(&cfg);
    assert_eq!(load_config(), cfg);
    std::env::remove_var("STYLEMATE_CONFIG_PATH");
}

#[test]
fn partial_file_fills_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("partial.json");
    std::fs::write(
        &path,
        r#"{"initial_source": "upload", "webcam": {"width": 640}, "gating": {"min_confidence": null}}"#,
    )
    .unwrap();
    let cfg = load_config_from(&path);
    assert_eq!(cfg.initial_source, InputSource::Upload);
    assert_eq!(cfg.webcam.width, 640);
    assert_eq!(cfg.webcam.height, 300);
    assert_eq!(cfg.gating.min_confidence, None);
    assert_eq!(cfg.gating.face_confidence, Some(0.9));
    assert_eq!(cfg.face_shape_model, ModelLocator::local("models/model_1"));
}

#[test]
fn invalid_file_yields_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, b"{ not json").unwrap();
    assert_eq!(load_config_from(&path), Config::default());
}

#[test]
fn explicit_path_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cfg.json");
    let mut cfg = Config::default();
    cfg.loop_fps = 15.0;
    cfg.personal_tone_model = ModelLocator::local("elsewhere");
    save_config_to(&path, &cfg).unwrap();
    assert_eq!(load_config_from(&path), cfg);
}
