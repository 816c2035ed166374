use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use emotune_vision::model::OutputActivation;
use emotune_vision::{InputSize, LocatorSettings};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> = Lazy::new(|| ProjectDirs::from("", "", "emotune"));

pub static CONFIG_PATH: Lazy<PathBuf> = Lazy::new(|| {
    if let Some(path) = option_env!("EMOTUNE_CONFIG_PATH") {
        return PathBuf::from(path);
    }
    PROJECT_DIRS
        .as_ref()
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("emotune.toml"))
});

pub static MODEL_DIR: Lazy<PathBuf> = Lazy::new(|| {
    if let Some(path) = option_env!("EMOTUNE_MODEL_DIR") {
        return PathBuf::from(path);
    }
    PROJECT_DIRS
        .as_ref()
        .map(|dirs| dirs.data_dir().join("models"))
        .unwrap_or_else(|| PathBuf::from("models"))
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// ONNX export of the emotion classifier.
    pub model_path: PathBuf,
    /// Label artifact (`class_indices.json`).
    pub labels_path: PathBuf,
    /// SeetaFace frontal cascade.
    pub cascade_path: PathBuf,
    pub camera: String,
    /// Frames averaged per live stream.
    pub smoothing_window: usize,
    /// Detections under this confidence are reported as low confidence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f32>,
    pub top_n: usize,
    pub activation: OutputActivation,
    pub input_size: InputSize,
    pub detector: LocatorSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: MODEL_DIR.join("emotion.onnx"),
            labels_path: MODEL_DIR.join("class_indices.json"),
            cascade_path: MODEL_DIR.join("seeta_fd_frontal_v1.0.bin"),
            camera: "/dev/video0".to_string(),
            smoothing_window: emotune_vision::smoothing::DEFAULT_WINDOW,
            min_confidence: None,
            top_n: 3,
            activation: OutputActivation::Identity,
            input_size: InputSize::default(),
            detector: LocatorSettings::default(),
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        log::debug!("no config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            camera = "/dev/video2"
            smoothing_window = 8
            activation = "softmax"

            [detector]
            min_face_size = 48
            "#,
        )
        .unwrap();
        assert_eq!(cfg.camera, "/dev/video2");
        assert_eq!(cfg.smoothing_window, 8);
        assert_eq!(cfg.activation, OutputActivation::Softmax);
        assert_eq!(cfg.detector.min_face_size, 48);
        assert_eq!(cfg.detector.window_step, 4);
        assert_eq!(cfg.input_size, InputSize::default());
        assert_eq!(cfg.min_confidence, None);
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir()
            .join(format!("emotune-config-{}", uuid::Uuid::new_v4()))
            .join("config.toml");
        let cfg = Config {
            min_confidence: Some(0.4),
            top_n: 5,
            ..Config::default()
        };
        save_config(&cfg, Some(&path)).unwrap();
        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded, cfg);
        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let cfg = load_config(Some(Path::new("/nonexistent/emotune.toml"))).unwrap();
        assert_eq!(cfg, Config::default());
    }
}
