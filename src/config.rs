//! Settings for the command-line surface
//!
//! Loaded from a YAML or JSON file chosen by extension; every field has a
//! default so an empty or partial file is valid.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScaffoldError};
use crate::orchestrator::DEFAULT_THRESHOLD;

/// Scaffold settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaffoldConfig {
    /// Directory holding `<name>.yaml` profiles
    pub profiles_dir: PathBuf,
    /// Profile used when none is given
    pub default_profile: String,
    /// Layers scoring below this are regenerated on request
    pub regeneration_threshold: f64,
}

impl Default for ScaffoldConfig {
    fn default() -> Self {
        Self {
            profiles_dir: PathBuf::from("profiles"),
            default_profile: "chatbot_tutor".to_string(),
            regeneration_threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl ScaffoldConfig {
    /// Load from `path`, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Parse a YAML (`.yaml`/`.yml`) or JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| ScaffoldError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&contents)?,
            _ => serde_json::from_str(&contents)?,
        };
        Ok(config)
    }
}
