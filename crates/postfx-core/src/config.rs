use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Everything needed to build a pipeline. Every field has a default, so a
/// config file only lists what it changes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub viewport: Viewport,
    pub passes: PassToggles,
    pub tint: [f32; 3],
    pub wave: WaveConfig,
    pub normal_map: NormalMapConfig,
    pub glitch: GlitchConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
    /// Device pixel ratios above this are clamped.
    pub max_pixel_ratio: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            pixel_ratio: 1.0,
            max_pixel_ratio: 2.0,
        }
    }
}

impl Viewport {
    pub fn effective_ratio(&self) -> f32 {
        clamp_ratio(self.pixel_ratio, self.max_pixel_ratio)
    }
}

/// `min(ratio, max)`, logging when the cap applies.
pub fn clamp_ratio(ratio: f32, max: f32) -> f32 {
    if ratio > max {
        log::warn!("pixel ratio {ratio} clamped to {max}");
        max
    } else {
        ratio
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Antialias {
    /// On only when the effective pixel ratio is exactly 1.
    #[default]
    Auto,
    On,
    Off,
}

impl Antialias {
    pub fn enabled_at(self, pixel_ratio: f32) -> bool {
        match self {
            Antialias::Auto => pixel_ratio == 1.0,
            Antialias::On => true,
            Antialias::Off => false,
        }
    }
}

/// Which passes start enabled. Every pass is always built, so the panel
/// can switch any of them on later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassToggles {
    pub dot_screen: bool,
    pub glitch: bool,
    pub rgb_shift: bool,
    pub bloom: bool,
    pub tint: bool,
    pub wave: bool,
    pub normal_map: bool,
    pub gamma_correction: bool,
    pub antialias: Antialias,
}

impl Default for PassToggles {
    fn default() -> Self {
        Self {
            dot_screen: false,
            glitch: true,
            rgb_shift: false,
            bloom: false,
            tint: false,
            wave: false,
            normal_map: false,
            gamma_correction: true,
            antialias: Antialias::Auto,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveConfig {
    pub speed: f32,
    pub amplitude: f32,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            amplitude: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalMapConfig {
    /// Image to load; a map is generated from `size` and `seed` when absent.
    pub path: Option<PathBuf>,
    pub size: u32,
    pub seed: i32,
    pub light_direction: [f32; 2],
    pub light_strength: f32,
}

impl Default for NormalMapConfig {
    fn default() -> Self {
        Self {
            path: None,
            size: 256,
            seed: 1337,
            light_direction: [-1.0, 1.0],
            light_strength: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlitchConfig {
    pub go_wild: bool,
    pub seed: i32,
}

impl Default for GlitchConfig {
    fn default() -> Self {
        Self { go_wild: false, seed: 42 }
    }
}

impl PipelineConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text)?;
        log::info!("loaded config {}", path.display());
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
