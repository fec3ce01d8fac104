use crate::evaluator::pycocotools::DEFAULT_PYTHON;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "DETMERGE_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CliConfig {
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MergeConfig {
    pub img_suffix: String,
    pub output_json: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EvaluatorConfig {
    pub python: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            img_suffix: ".jpg".to_string(),
            output_json: PathBuf::from("result_coco_format.json"),
        }
    }
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            python: DEFAULT_PYTHON.to_string(),
        }
    }
}

impl CliConfig {
    pub fn load() -> Self {
        match Self::config_file_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// A missing file means defaults; a broken one is reported and ignored.
    pub fn load_from(path: &std::path::Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no config file at {}", path.display());
                return Self::default();
            }
            Err(e) => {
                warn!("ignoring unreadable config {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match toml::from_str(&content) {
            Ok(config) => {
                debug!("loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("ignoring malformed config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn config_file_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|v| !v.is_empty()) {
            return Some(PathBuf::from(path));
        }
        Self::config_dir().map(|mut path| {
            path.push("config.toml");
            path
        })
    }

    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("detmerge");
            path
        })
    }
}
