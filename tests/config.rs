use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use fruit_detect::config::FruitDetectConfig;
use fruit_detect::detect::BackendChoice;
use fruit_detect::{DetectorKind, SizePreset};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "FRUIT_DETECT_CONFIG",
        "FRUIT_DETECT_CAMERA",
        "FRUIT_DETECT_BUNDLE_DIR",
        "FRUIT_DETECT_CLASSIFIER_SHA256",
        "FRUIT_DETECT_BACKEND",
        "FRUIT_DETECT_PRESET",
        "FRUIT_DETECT_OUTPUT_DIR",
        "FRUIT_DETECT_REPORT",
    ] {
        std::env::remove_var(key);
    }
}

fn write_config(toml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");
    file
}

#[test]
fn defaults_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = FruitDetectConfig::load().expect("load config");

    assert_eq!(cfg.camera.device, "stub://camera");
    assert_eq!(cfg.camera.target_fps, 10);
    assert_eq!((cfg.camera.width, cfg.camera.height), (640, 480));
    assert_eq!(cfg.classifier.bundle_dir, PathBuf::from("res/raw"));
    assert_eq!(cfg.classifier.resource, "banana_classifier.xml");
    assert_eq!(cfg.classifier.method, DetectorKind::Cascade);
    assert_eq!(cfg.classifier.backend, BackendChoice::Opencv);
    assert_eq!(cfg.preset().unwrap(), SizePreset::Fruit20);
    assert_eq!(cfg.output.every_n, 1);
    assert!(cfg.output.dir.is_none());
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let digest = "AB".repeat(32);
    let file = write_config(&format!(
        r#"
[camera]
device = "stub://orchard?seed=7"
target_fps = 15
width = 320
height = 240

[classifier]
bundle_dir = "assets"
resource = "fruit.xml"
sha256 = "{digest}"
method = "cascade"
backend = "scripted"

[detection]
preset = 40

[output]
dir = "frames"
every_n = 5
"#
    ));

    std::env::set_var("FRUIT_DETECT_CONFIG", file.path());
    std::env::set_var("FRUIT_DETECT_PRESET", "30%");
    std::env::set_var("FRUIT_DETECT_REPORT", "detections.jsonl");

    let cfg = FruitDetectConfig::load().expect("load config");

    assert_eq!(cfg.camera.device, "stub://orchard?seed=7");
    assert_eq!(cfg.camera.target_fps, 15);
    assert_eq!((cfg.camera.width, cfg.camera.height), (320, 240));
    assert_eq!(cfg.classifier.bundle_dir, PathBuf::from("assets"));
    assert_eq!(cfg.classifier.resource, "fruit.xml");
    assert_eq!(cfg.classifier.sha256.as_deref(), Some("ab".repeat(32).as_str()));
    assert_eq!(cfg.classifier.backend, BackendChoice::Scripted);
    assert_eq!(cfg.preset().unwrap(), SizePreset::Fruit30);
    assert_eq!(cfg.output.dir, Some(PathBuf::from("frames")));
    assert_eq!(cfg.output.every_n, 5);
    assert_eq!(cfg.output.report, Some(PathBuf::from("detections.jsonl")));

    clear_env();
}

#[test]
fn rejects_preset_outside_menu() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config("[detection]\npreset = 25\n");
    let err = FruitDetectConfig::load_from(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("detection.preset"));
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    for toml in [
        "[camera]\ntarget_fps = 0\n",
        "[camera]\nheight = 0\n",
        "[output]\nevery_n = 0\n",
        "[classifier]\nsha256 = \"not-hex\"\n",
        "[classifier]\nbackend = \"tensorflow\"\n",
        "[classifier]\nmethod = \"hog\"\n",
        "[unknown]\nkey = 1\n",
    ] {
        let file = write_config(toml);
        assert!(
            FruitDetectConfig::load_from(Some(file.path())).is_err(),
            "accepted {:?}",
            toml
        );
    }
}

#[test]
fn rejects_bad_env_preset() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("FRUIT_DETECT_PRESET", "half");
    assert!(FruitDetectConfig::load().is_err());
    std::env::set_var("FRUIT_DETECT_PRESET", "35");
    assert!(FruitDetectConfig::load().is_err());

    clear_env();
}
