use crate::inference::ModelLocator;
use crate::session::{InputSource, ModelSlot};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf};
use tracing::{debug, error};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WebcamConfig {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub mirror: bool,
}

impl Default for WebcamConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: 400,
            height: 300,
            mirror: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GatingConfig {
    /// Face gates stay off unless a detector is configured.
    pub face_detector: Option<ModelLocator>,
    pub face_confidence: Option<f32>,
    pub min_face_size: Option<u32>,
    pub min_confidence: Option<f32>,
}

impl Default for GatingConfig {
    fn default() -> Self {
        Self {
            face_detector: None,
            face_confidence: Some(0.9),
            min_face_size: Some(50),
            min_confidence: Some(0.60),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub initial_source: InputSource,
    pub face_shape_model: ModelLocator,
    pub personal_tone_model: ModelLocator,
    pub webcam: WebcamConfig,
    pub loop_fps: f32,
    pub gating: GatingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_source: InputSource::Webcam,
            face_shape_model: ModelLocator::local("models/model_1"),
            personal_tone_model: ModelLocator::local("models/model_2"),
            webcam: WebcamConfig::default(),
            loop_fps: 60.0,
            gating: GatingConfig::default(),
        }
    }
}

impl Config {
    pub fn locator(&self, slot: ModelSlot) -> &ModelLocator {
        match slot {
            ModelSlot::FaceShape => &self.face_shape_model,
            ModelSlot::PersonalTone => &self.personal_tone_model,
        }
    }
}

pub fn config_path() -> PathBuf {
    env::var_os("STYLEMATE_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("stylemate.json"))
}

pub fn load_config_from(path: &Path) -> Config {
    if let Ok(data) = fs::read(path) {
        match serde_json::from_slice(&data) {
            Ok(cfg) => return cfg,
            Err(e) => error!("invalid config {}: {e}", path.display()),
        }
    } else {
        debug!(path = %path.display(), "no config file, using defaults");
    }
    Config::default()
}

pub fn load_config() -> Config {
    load_config_from(&config_path())
}

/// Writes `cfg` as pretty JSON, creating parent directories.
pub fn save_config_to(path: &Path, cfg: &Config) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_vec_pretty(cfg)?;
    fs::write(path, data)
}

pub fn save_config(cfg: &Config) {
    let path = config_path();
    if let Err(e) = save_config_to(&path, cfg) {
        error!("failed to write config {}: {e}", path.display());
    }
}
