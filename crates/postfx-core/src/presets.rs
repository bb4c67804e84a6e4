use crate::config::{Antialias, PassToggles, PipelineConfig};

/// Named starting configurations. Which passes start enabled is a property
/// of the deployment, so each preset carries its own set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Glitch and gamma correction on, antialiasing when the pixel ratio is 1.
    Original,
    Clean,
    CustomShaders,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Original, Preset::Clean, Preset::CustomShaders];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Original => "Original",
            Preset::Clean => "Clean",
            Preset::CustomShaders => "Custom Shaders",
        }
    }

    /// Command-line spelling.
    pub fn slug(self) -> &'static str {
        match self {
            Preset::Original => "original",
            Preset::Clean => "clean",
            Preset::CustomShaders => "custom-shaders",
        }
    }

    /// Look up by slug or display name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.slug().eq_ignore_ascii_case(name) || p.name().eq_ignore_ascii_case(name))
    }

    pub fn config(self) -> PipelineConfig {
        let passes = match self {
            Preset::Original => PassToggles::default(),
            Preset::Clean => PassToggles {
                glitch: false,
                ..PassToggles::default()
            },
            Preset::CustomShaders => PassToggles {
                glitch: false,
                tint: true,
                wave: true,
                normal_map: true,
                antialias: Antialias::Auto,
                ..PassToggles::default()
            },
        };
        let tint = match self {
            Preset::CustomShaders => [0.1, 0.0, 0.0],
            _ => [0.0; 3],
        };
        PipelineConfig {
            passes,
            tint,
            ..PipelineConfig::default()
        }
    }

    /// Switch `base` to this preset: the pass toggles and tint come from the
    /// preset, everything else (viewport, normal map, wave, glitch) is kept.
    pub fn apply(self, base: &PipelineConfig) -> PipelineConfig {
        let preset = self.config();
        PipelineConfig {
            passes: preset.passes,
            tint: preset.tint,
            ..base.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_names_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for p in Preset::ALL {
            assert!(seen.insert(p.name()), "duplicate preset name: {}", p.name());
            assert!(!p.slug().is_empty());
        }
    }

    #[test]
    fn from_name_accepts_slug_and_display_name() {
        assert_eq!(Preset::from_name("custom-shaders"), Some(Preset::CustomShaders));
        assert_eq!(Preset::from_name("Custom Shaders"), Some(Preset::CustomShaders));
        assert_eq!(Preset::from_name("CLEAN"), Some(Preset::Clean));
        assert_eq!(Preset::from_name("bogus"), None);
    }

    #[test]
    fn original_matches_default_config() {
        assert_eq!(Preset::Original.config(), PipelineConfig::default());
    }

    #[test]
    fn clean_only_corrects_gamma() {
        let p = Preset::Clean.config().passes;
        assert!(p.gamma_correction);
        assert!(!(p.glitch || p.dot_screen || p.rgb_shift || p.bloom || p.tint || p.wave || p.normal_map));
    }

    #[test]
    fn apply_keeps_viewport_and_normal_map_source() {
        let mut base = PipelineConfig::default();
        base.viewport.width = 1280;
        base.viewport.max_pixel_ratio = 1.0;
        base.normal_map.path = Some("maps/bricks.png".into());
        base.wave.speed = 2.5;

        let switched = Preset::CustomShaders.apply(&base);
        assert_eq!(switched.passes, Preset::CustomShaders.config().passes);
        assert_eq!(switched.tint, [0.1, 0.0, 0.0]);
        assert_eq!(switched.viewport, base.viewport);
        assert_eq!(switched.normal_map, base.normal_map);
        assert_eq!(switched.wave, base.wave);
    }

    #[test]
    fn custom_shaders_enables_all_three() {
        let p = Preset::CustomShaders.config().passes;
        assert!(p.tint && p.wave && p.normal_map && p.gamma_correction);
        assert!(!p.glitch);
    }
}
