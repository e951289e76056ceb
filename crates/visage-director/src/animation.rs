//! Animation clip selection.
//!
//! Maps a semantic intent ("talking", "listening", "greeting", ...) to a
//! concrete clip identifier. Intents with several candidate clips pick one
//! uniformly at random per activation, not per frame; the randomness source
//! is injectable so tests stay deterministic.

use std::collections::HashMap;

use rand::Rng;

use visage_core::config::AnimationConfig;
use visage_core::types::{AnimationIntent, ClipId};

/// Chooses an index in `0..n` for multi-variant intents.
pub type VariantPicker = Box<dyn Fn(usize) -> usize + Send + Sync>;

/// Pure intent-to-clip resolution over the configured roster.
pub struct AnimationSelector {
    clips: HashMap<String, Vec<ClipId>>,
    default_clip: ClipId,
    picker: VariantPicker,
}

impl std::fmt::Debug for AnimationSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationSelector")
            .field("intents", &self.clips.len())
            .field("default_clip", &self.default_clip)
            .finish()
    }
}

impl AnimationSelector {
    /// Build a selector from the configured roster with a uniform random
    /// variant picker.
    pub fn new(config: &AnimationConfig) -> Self {
        Self::with_picker(
            config,
            Box::new(|n| rand::rng().random_range(0..n)),
        )
    }

    /// Build a selector with an explicit variant picker (deterministic tests).
    pub fn with_picker(config: &AnimationConfig, picker: VariantPicker) -> Self {
        let clips = config
            .clips
            .iter()
            .map(|(intent, names)| {
                (
                    intent.clone(),
                    names.iter().map(|n| ClipId::new(n.clone())).collect(),
                )
            })
            .collect();
        Self {
            clips,
            default_clip: ClipId::new(config.default_clip.clone()),
            picker,
        }
    }

    /// The clip shown for unknown intents and while not speaking.
    pub fn default_clip(&self) -> &ClipId {
        &self.default_clip
    }

    /// Resolve an intent to a concrete clip.
    ///
    /// Unknown intents (and intents with an empty candidate list) fall back
    /// to the default clip.
    pub fn resolve(&self, intent: &AnimationIntent) -> ClipId {
        match self.clips.get(intent.as_str()) {
            None => self.default_clip.clone(),
            Some(candidates) if candidates.is_empty() => self.default_clip.clone(),
            Some(candidates) if candidates.len() == 1 => candidates[0].clone(),
            Some(candidates) => {
                let index = (self.picker)(candidates.len()).min(candidates.len() - 1);
                candidates[index].clone()
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
