use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use postfx_core::{PipelineConfig, Preset};

pub const USAGE: &str =
    "usage: postfx [--config FILE.json] [--preset NAME] [--headless FRAMES] [--out FILE.png]";

#[derive(Debug, Clone, PartialEq)]
pub struct Cli {
    pub config: Option<PathBuf>,
    pub preset: Option<Preset>,
    /// Render this many frames on the CPU and exit instead of opening a window.
    pub headless: Option<u64>,
    pub out: PathBuf,
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: None,
            preset: None,
            headless: None,
            out: PathBuf::from("postfx.png"),
        }
    }
}

pub fn parse_cli(args: &[String]) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = || {
            args.get(i + 1)
                .map(String::as_str)
                .ok_or_else(|| anyhow!("missing value for {flag}"))
        };
        match flag {
            "--config" => cli.config = Some(PathBuf::from(value()?)),
            "--preset" => {
                let name = value()?;
                let preset = Preset::from_name(name).ok_or_else(|| {
                    let known: Vec<_> = Preset::ALL.iter().map(|p| p.slug()).collect();
                    anyhow!("unknown preset `{name}` (known: {})", known.join(", "))
                })?;
                cli.preset = Some(preset);
            }
            "--headless" => {
                let frames = value()?;
                cli.headless = Some(
                    frames
                        .parse()
                        .with_context(|| format!("--headless expects a frame count, got `{frames}`"))?,
                );
            }
            "--out" => cli.out = PathBuf::from(value()?),
            "-h" | "--help" => return Err(anyhow!(USAGE)),
            other => return Err(anyhow!("unknown argument: {other}\n{USAGE}")),
        }
        i += 2;
    }
    Ok(cli)
}

impl Cli {
    /// The config file if given, otherwise the preset (default `Original`).
    /// A preset named alongside a file replaces only what the preset
    /// defines (pass toggles and tint).
    pub fn resolve_config(&self) -> Result<PipelineConfig> {
        let Some(path) = &self.config else {
            return Ok(self.preset().config());
        };
        let config = PipelineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?;
        Ok(match self.preset {
            Some(preset) => preset.apply(&config),
            None => config,
        })
    }

    pub fn preset(&self) -> Preset {
        self.preset.unwrap_or(Preset::Original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_args_give_defaults() {
        let cli = parse_cli(&[]).unwrap();
        assert_eq!(cli, Cli::default());
        assert_eq!(cli.preset(), Preset::Original);
    }

    #[test]
    fn parses_every_flag() {
        let cli = parse_cli(&args(&[
            "--config", "fx.json", "--preset", "clean", "--headless", "30", "--out", "frame.png",
        ]))
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("fx.json")));
        assert_eq!(cli.preset, Some(Preset::Clean));
        assert_eq!(cli.headless, Some(30));
        assert_eq!(cli.out, PathBuf::from("frame.png"));
    }

    #[test]
    fn missing_value_is_an_error() {
        let err = parse_cli(&args(&["--headless"])).unwrap_err();
        assert!(err.to_string().contains("missing value for --headless"), "{err}");
    }

    #[test]
    fn bad_frame_count_is_an_error() {
        assert!(parse_cli(&args(&["--headless", "lots"])).is_err());
    }

    #[test]
    fn unknown_preset_lists_known_ones() {
        let err = parse_cli(&args(&["--preset", "sepia"])).unwrap_err();
        assert!(err.to_string().contains("custom-shaders"), "{err}");
    }

    #[test]
    fn unknown_flag_is_an_error() {
        assert!(parse_cli(&args(&["--fast"])).is_err());
    }

    #[test]
    fn preset_without_file_picks_preset_config() {
        let cli = parse_cli(&args(&["--preset", "custom-shaders"])).unwrap();
        assert_eq!(cli.resolve_config().unwrap(), Preset::CustomShaders.config());
    }

    #[test]
    fn preset_on_top_of_file_keeps_file_viewport() {
        let path = std::env::temp_dir().join(format!("postfx-cli-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "viewport": { "width": 320, "height": 200 } }"#).unwrap();
        let cli = parse_cli(&args(&["--config", path.to_str().unwrap(), "--preset", "custom-shaders"])).unwrap();
        let config = cli.resolve_config().unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!((config.viewport.width, config.viewport.height), (320, 200));
        assert_eq!(config.passes, Preset::CustomShaders.config().passes);
        assert_eq!(config.tint, Preset::CustomShaders.config().tint);
    }

    #[test]
    fn missing_config_file_has_context() {
        let cli = parse_cli(&args(&["--config", "/nonexistent/fx.json"])).unwrap();
        let err = cli.resolve_config().unwrap_err();
        assert!(format!("{err:#}").contains("loading config"), "{err:#}");
    }
}
