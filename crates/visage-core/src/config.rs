use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, VisageError};

/// Top-level configuration for the Visage avatar runtime.
///
/// Loaded from `~/.visage/config.toml` by default. Each section corresponds
/// to a subsystem or cross-cutting concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisageConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

impl Default for VisageConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            audio: AudioConfig::default(),
            animation: AnimationConfig::default(),
            lifecycle: LifecycleConfig::default(),
        }
    }
}

impl VisageConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: VisageConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| VisageError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Audio session timing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Seconds to wait for a pre-recorded asset to become ready before
    /// timing the session out.
    pub ready_timeout_secs: u64,
    /// Seconds to wait when probing a source with an ad-hoc validation ping.
    pub probe_timeout_secs: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            ready_timeout_secs: 10,
            probe_timeout_secs: 5,
        }
    }
}

/// Animation clip roster and cross-fade timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Clip shown when no intent matches and while not speaking.
    pub default_clip: String,
    /// Cross-fade duration in seconds between clips.
    pub fade_secs: f64,
    /// Cross-fade duration for the very first clip activation.
    pub first_activation_fade_secs: f64,
    /// Intent name -> candidate clip identifiers. Multi-candidate intents
    /// pick one variant uniformly at random per activation.
    pub clips: HashMap<String, Vec<String>>,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        let mut clips = HashMap::new();
        clips.insert(
            "talking".to_string(),
            vec![
                "talking_0".to_string(),
                "talking_1".to_string(),
                "talking_2".to_string(),
            ],
        );
        clips.insert("listening".to_string(), vec!["listening".to_string()]);
        clips.insert("greeting".to_string(), vec!["greeting".to_string()]);
        clips.insert("idle".to_string(), vec!["idle".to_string()]);

        Self {
            default_clip: "idle".to_string(),
            fade_secs: 0.5,
            first_activation_fade_secs: 0.0,
            clips,
        }
    }
}

impl AnimationConfig {
    /// Cross-fade duration the rendering layer should use for a clip change.
    pub fn fade_for(&self, first_activation: bool) -> f64 {
        if first_activation {
            self.first_activation_fade_secs
        } else {
            self.fade_secs
        }
    }
}

/// Interview termination sequencing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Fallback re-check interval in seconds while waiting for in-flight
    /// audio to drain before firing the completion callback.
    pub termination_poll_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            termination_poll_secs: 1,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
