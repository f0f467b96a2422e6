//! Feature toggles at three levels
//!
//! 1. Profile defaults read from `<profiles_dir>/<name>.yaml`
//! 2. Runtime overrides (sparse, per layer, per field)
//! 3. A/B experiment variants derived from a base configuration
//!
//! A missing or malformed profile degrades to "every layer enabled, none
//! required, weight 1.0" instead of failing.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::core::{default_layer_configs, sanitize_weight, Layer, LayerConfig, LayerConfigs};
use crate::error::{Result, ScaffoldError};

/// Sparse override for one layer; unset fields inherit from the base
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl LayerOverride {
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Self::default()
        }
    }

    pub fn required(required: bool) -> Self {
        Self {
            required: Some(required),
            ..Self::default()
        }
    }

    pub fn weight(weight: f64) -> Self {
        Self {
            weight: Some(weight),
            ..Self::default()
        }
    }

    /// Merge onto a base config
    pub fn apply(&self, base: &LayerConfig) -> LayerConfig {
        LayerConfig::new(
            self.enabled.unwrap_or(base.enabled),
            self.required.unwrap_or(base.required),
            self.weight.unwrap_or(base.weight()),
        )
    }
}

impl From<&LayerConfig> for LayerOverride {
    /// Full override pinning every field
    fn from(config: &LayerConfig) -> Self {
        Self {
            enabled: Some(config.enabled),
            required: Some(config.required),
            weight: Some(config.weight()),
        }
    }
}

/// Runtime overrides keyed by layer
pub type LayerOverrides = BTreeMap<Layer, LayerOverride>;

/// Convert a full configuration into an override map that pins it exactly
pub fn configs_to_overrides(configs: &LayerConfigs) -> LayerOverrides {
    configs
        .iter()
        .map(|(layer, config)| (*layer, LayerOverride::from(config)))
        .collect()
}

/// On-disk profile document
#[derive(Debug, Default, Deserialize)]
struct ProfileFile {
    #[serde(default)]
    layers: BTreeMap<String, LayerOverride>,
}

#[derive(Debug, Clone)]
struct CachedProfile {
    configs: LayerConfigs,
    checksum: String,
}

/// Resolves per-layer configuration from profiles, overrides and variants
#[derive(Debug)]
pub struct ToggleManager {
    profiles_dir: PathBuf,
    cache: RwLock<HashMap<String, CachedProfile>>,
}

impl ToggleManager {
    pub fn new(profiles_dir: impl Into<PathBuf>) -> Self {
        Self {
            profiles_dir: profiles_dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn profiles_dir(&self) -> &Path {
        &self.profiles_dir
    }

    /// Load a profile's layer configs, falling back to defaults.
    ///
    /// Successful loads are cached by name for the manager's lifetime.
    pub fn load_profile(&self, name: &str) -> LayerConfigs {
        if let Some(cached) = self.cache.read().get(name) {
            return cached.configs.clone();
        }

        match self.read_profile(name) {
            Ok(profile) => {
                let configs = profile.configs.clone();
                self.cache.write().insert(name.to_string(), profile);
                configs
            }
            Err(e) => {
                warn!("Profile '{}' unavailable, using defaults: {}", name, e);
                default_layer_configs()
            }
        }
    }

    /// SHA-256 of a loaded profile's file, if it was loaded from disk
    pub fn profile_checksum(&self, name: &str) -> Option<String> {
        self.cache.read().get(name).map(|p| p.checksum.clone())
    }

    /// Names of the profiles available in the profiles directory, sorted
    pub fn list_profiles(&self) -> Vec<String> {
        let mut names: Vec<String> = WalkDir::new(&self.profiles_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                matches!(
                    entry.path().extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml")
                )
            })
            .filter_map(|entry| {
                entry
                    .path()
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(String::from)
            })
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn profile_path(&self, name: &str) -> Option<PathBuf> {
        ["yaml", "yml"]
            .iter()
            .map(|ext| self.profiles_dir.join(format!("{}.{}", name, ext)))
            .find(|path| path.is_file())
    }

    fn read_profile(&self, name: &str) -> Result<CachedProfile> {
        let path = self
            .profile_path(name)
            .ok_or_else(|| ScaffoldError::InvalidProfile {
                name: name.to_string(),
                reason: format!("not found in {}", self.profiles_dir.display()),
            })?;

        let contents = fs::read_to_string(&path).map_err(|e| ScaffoldError::FileRead {
            path: path.clone(),
            source: e,
        })?;
        let checksum = format!("{:x}", Sha256::digest(contents.as_bytes()));

        // An empty document is a valid profile with every layer defaulted
        let file: ProfileFile = if contents.trim().is_empty() {
            ProfileFile::default()
        } else {
            serde_yaml::from_str(&contents)?
        };

        let configs = parse_layers(name, &file.layers);
        debug!("Loaded profile '{}' from {}", name, path.display());

        Ok(CachedProfile { configs, checksum })
    }

    /// Apply sparse runtime overrides on top of a base configuration.
    ///
    /// Override keys for layers absent from `base` are ignored.
    pub fn apply_overrides(&self, base: &LayerConfigs, overrides: &LayerOverrides) -> LayerConfigs {
        base.iter()
            .map(|(layer, config)| {
                let merged = match overrides.get(layer) {
                    Some(o) => o.apply(config),
                    None => *config,
                };
                (*layer, merged)
            })
            .collect()
    }

    /// Create the (enabled, disabled) variant pair for an A/B experiment.
    ///
    /// The enabled variant forces `layer.enabled = true` and keeps
    /// `required`; the disabled variant forces `enabled = required = false`.
    /// When `layer` is absent from `base` both are plain copies.
    pub fn create_experiment_variants(
        &self,
        base: &LayerConfigs,
        layer: Layer,
    ) -> (LayerConfigs, LayerConfigs) {
        let mut enabled_variant = base.clone();
        let mut disabled_variant = base.clone();

        if let Some(config) = base.get(&layer) {
            enabled_variant.insert(layer, LayerConfig::new(true, config.required, config.weight()));
            disabled_variant.insert(layer, LayerConfig::new(false, false, config.weight()));
        }

        (enabled_variant, disabled_variant)
    }
}

fn parse_layers(profile: &str, raw: &BTreeMap<String, LayerOverride>) -> LayerConfigs {
    for key in raw.keys() {
        if key.parse::<Layer>().is_err() {
            warn!("Profile '{}': ignoring unknown layer '{}'", profile, key);
        }
    }

    let by_layer: BTreeMap<Layer, &LayerOverride> = raw
        .iter()
        .filter_map(|(key, o)| key.parse::<Layer>().ok().map(|layer| (layer, o)))
        .collect();

    Layer::ALL
        .iter()
        .map(|layer| {
            let config = match by_layer.get(layer) {
                Some(o) => {
                    if let Some(w) = o.weight {
                        if sanitize_weight(w) != w {
                            warn!(
                                "Profile '{}': weight {} for '{}' clamped to 0",
                                profile, w, layer
                            );
                        }
                    }
                    o.apply(&LayerConfig::enabled())
                }
                None => LayerConfig::enabled(),
            };
            (*layer, config)
        })
        .collect()
}
