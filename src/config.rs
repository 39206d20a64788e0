use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::classifier::DEFAULT_RESOURCE;
use crate::detect::{BackendChoice, DetectorKind};
use crate::ingest::CameraConfig;
use crate::sink::SinkConfig;
use crate::size_policy::SizePreset;

const DEFAULT_CAMERA_DEVICE: &str = "stub://camera";
const DEFAULT_CAMERA_FPS: u32 = 10;
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_BUNDLE_DIR: &str = "res/raw";
const DEFAULT_PRESET_PERCENT: u32 = 20;
const DEFAULT_EVERY_N: u32 = 1;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct FruitDetectConfigFile {
    camera: Option<CameraConfigFile>,
    classifier: Option<ClassifierConfigFile>,
    detection: Option<DetectionConfigFile>,
    output: Option<OutputConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CameraConfigFile {
    device: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ClassifierConfigFile {
    bundle_dir: Option<PathBuf>,
    resource: Option<String>,
    sha256: Option<String>,
    method: Option<DetectorKind>,
    backend: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectionConfigFile {
    preset: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct OutputConfigFile {
    dir: Option<PathBuf>,
    every_n: Option<u32>,
    report: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct FruitDetectConfig {
    pub camera: CameraConfig,
    pub classifier: ClassifierSettings,
    /// Preset applied before the first frame, as a percentage.
    pub preset_percent: u32,
    pub output: SinkConfig,
}

#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    pub bundle_dir: PathBuf,
    pub resource: String,
    /// Expected SHA-256 of the resource, lowercase hex.
    pub sha256: Option<String>,
    pub method: DetectorKind,
    pub backend: BackendChoice,
}

impl FruitDetectConfig {
    /// Load from the file named by `FRUIT_DETECT_CONFIG`, if any.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("FRUIT_DETECT_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Load from an explicit file (or defaults), then apply env overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: FruitDetectConfigFile) -> Result<Self> {
        let camera_file = file.camera.unwrap_or_default();
        let camera = CameraConfig {
            device: camera_file
                .device
                .unwrap_or_else(|| DEFAULT_CAMERA_DEVICE.to_string()),
            target_fps: camera_file.target_fps.unwrap_or(DEFAULT_CAMERA_FPS),
            width: camera_file.width.unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: camera_file.height.unwrap_or(DEFAULT_CAMERA_HEIGHT),
        };

        let classifier_file = file.classifier.unwrap_or_default();
        let backend = match classifier_file.backend.as_deref() {
            Some(value) => BackendChoice::parse(value)?,
            None => BackendChoice::default(),
        };
        let classifier = ClassifierSettings {
            bundle_dir: classifier_file
                .bundle_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BUNDLE_DIR)),
            resource: classifier_file
                .resource
                .unwrap_or_else(|| DEFAULT_RESOURCE.to_string()),
            sha256: classifier_file.sha256,
            method: classifier_file.method.unwrap_or_default(),
            backend,
        };

        let preset_percent = file
            .detection
            .and_then(|detection| detection.preset)
            .unwrap_or(DEFAULT_PRESET_PERCENT);

        let output_file = file.output.unwrap_or_default();
        let output = SinkConfig {
            dir: output_file.dir,
            every_n: output_file.every_n.unwrap_or(DEFAULT_EVERY_N),
            report: output_file.report,
        };

        Ok(Self {
            camera,
            classifier,
            preset_percent,
            output,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("FRUIT_DETECT_CAMERA") {
            if !device.trim().is_empty() {
                self.camera.device = device;
            }
        }
        if let Ok(dir) = std::env::var("FRUIT_DETECT_BUNDLE_DIR") {
            if !dir.trim().is_empty() {
                self.classifier.bundle_dir = PathBuf::from(dir);
            }
        }
        if let Ok(digest) = std::env::var("FRUIT_DETECT_CLASSIFIER_SHA256") {
            if !digest.trim().is_empty() {
                self.classifier.sha256 = Some(digest);
            }
        }
        if let Ok(backend) = std::env::var("FRUIT_DETECT_BACKEND") {
            if !backend.trim().is_empty() {
                self.classifier.backend = BackendChoice::parse(&backend)?;
            }
        }
        if let Ok(preset) = std::env::var("FRUIT_DETECT_PRESET") {
            self.preset_percent = preset
                .trim()
                .trim_end_matches('%')
                .parse()
                .map_err(|_| anyhow!("FRUIT_DETECT_PRESET must be one of 50, 40, 30, 20"))?;
        }
        if let Ok(dir) = std::env::var("FRUIT_DETECT_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.output.dir = Some(PathBuf::from(dir));
            }
        }
        if let Ok(report) = std::env::var("FRUIT_DETECT_REPORT") {
            if !report.trim().is_empty() {
                self.output.report = Some(PathBuf::from(report));
            }
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.camera.target_fps == 0 {
            return Err(anyhow!("camera.target_fps must be greater than zero"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera.width and camera.height must be greater than zero"));
        }
        self.preset()?;
        if self.output.every_n == 0 {
            return Err(anyhow!("output.every_n must be greater than zero"));
        }
        if let Some(digest) = self.classifier.sha256.as_mut() {
            let trimmed = digest.trim().to_ascii_lowercase();
            if trimmed.len() != 64 || hex::decode(&trimmed).is_err() {
                return Err(anyhow!("classifier.sha256 must be 64 hex characters"));
            }
            *digest = trimmed;
        }
        Ok(())
    }

    /// The configured starting preset.
    pub fn preset(&self) -> Result<SizePreset> {
        SizePreset::from_percent(self.preset_percent).ok_or_else(|| {
            anyhow!(
                "detection.preset must be one of 50, 40, 30, 20 (got {})",
                self.preset_percent
            )
        })
    }
}

fn read_config_file(path: &Path) -> Result<FruitDetectConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
