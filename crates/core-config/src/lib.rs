//! Configuration loading and parsing.
//!
//! Parses `wrapview.toml` (or an override path provided by the binary) into
//! three tables:
//!
//! ```toml
//! [wrap]
//! mode = "column"   # "none" | "column" | "bounds"
//! margin = 72       # wrap column when mode = "column"
//!
//! [text]
//! tab_distance = 8
//!
//! [viewport]
//! width = 640
//! height = 480
//! line_height = 16
//! ```
//!
//! Every field is optional. A missing file or one that fails to parse falls
//! back to defaults. The raw parsed values are kept as written; clamping
//! happens in `Config::apply_context` once the caller knows the viewport it is
//! laying out for, so a later resize can re-clamp from the original values.
//! Unknown fields are ignored.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{debug, info, warn};

/// Config file name looked up in the working directory and the platform
/// config dir.
pub const FILE_NAME: &str = "wrapview.toml";

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WrapSetting {
    #[default]
    None,
    Column,
    Bounds,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WrapConfig {
    #[serde(default)]
    pub mode: WrapSetting,
    #[serde(default = "WrapConfig::default_margin")]
    pub margin: u32,
}

impl Default for WrapConfig {
    fn default() -> Self {
        Self {
            mode: WrapSetting::default(),
            margin: Self::default_margin(),
        }
    }
}

impl WrapConfig {
    const fn default_margin() -> u32 {
        80
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TextConfig {
    #[serde(default = "TextConfig::default_tab_distance")]
    pub tab_distance: usize,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            tab_distance: Self::default_tab_distance(),
        }
    }
}

impl TextConfig {
    const fn default_tab_distance() -> usize {
        8
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ViewportConfig {
    #[serde(default = "ViewportConfig::default_width")]
    pub width: u32,
    #[serde(default = "ViewportConfig::default_height")]
    pub height: u32,
    #[serde(default = "ViewportConfig::default_line_height")]
    pub line_height: u32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: Self::default_width(),
            height: Self::default_height(),
            line_height: Self::default_line_height(),
        }
    }
}

impl ViewportConfig {
    const fn default_width() -> u32 {
        640
    }
    const fn default_height() -> u32 {
        480
    }
    const fn default_line_height() -> u32 {
        16
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub wrap: WrapConfig,
    #[serde(default)]
    pub text: TextConfig,
    #[serde(default)]
    pub viewport: ViewportConfig,
}

/// Viewport the configuration is applied to. Command line overrides take
/// precedence over the file's `[viewport]` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigContext {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ConfigContext {
    pub const fn new(width: Option<u32>, height: Option<u32>) -> Self {
        Self { width, height }
    }
}

/// Values after overrides and clamping, ready to hand to the layout engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub wrap: WrapSetting,
    pub margin: u32,
    pub tab_distance: usize,
    pub width: u32,
    pub height: u32,
    pub line_height: u32,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        let file = ConfigFile::default();
        Self {
            wrap: file.wrap.mode,
            margin: file.wrap.margin,
            tab_distance: file.text.tab_distance,
            width: file.viewport.width,
            height: file.viewport.height,
            line_height: file.viewport.line_height,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub file: ConfigFile,    // parsed (or default) data
    pub effective: EffectiveConfig,
}

/// Best-effort config path following platform conventions (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    // Prefer a `wrapview.toml` in the working directory.
    let local = PathBuf::from(FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("wrapview").join(FILE_NAME);
    }
    PathBuf::from(FILE_NAME)
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        debug!(target: "config", path = %path.display(), "config_missing_using_defaults");
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            debug!(target: "config", path = %path.display(), "config_loaded");
            let mut config = Config {
                raw: Some(content),
                file,
                effective: EffectiveConfig::default(),
            };
            config.apply_context(ConfigContext::default());
            Ok(config)
        }
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed_using_defaults");
            Ok(Config::default())
        }
    }
}

impl Config {
    /// Resolve overrides and clamp every value to something the layout
    /// engine accepts. Returns the effective values.
    pub fn apply_context(&mut self, ctx: ConfigContext) -> EffectiveConfig {
        let wrap = self.file.wrap.mode;
        let margin = clamp_at_least("wrap.margin", self.file.wrap.margin, 1);
        let tab_distance = clamp_at_least("text.tab_distance", self.file.text.tab_distance, 1);
        let width = ctx.width.unwrap_or(self.file.viewport.width);
        let height = ctx.height.unwrap_or(self.file.viewport.height);
        let line_height =
            clamp_at_least("viewport.line_height", self.file.viewport.line_height, 1);

        self.effective = EffectiveConfig {
            wrap,
            margin,
            tab_distance,
            width,
            height,
            line_height,
        };
        self.effective
    }
}

fn clamp_at_least<T>(field: &'static str, raw: T, min: T) -> T
where
    T: Copy + PartialOrd + std::fmt::Display,
{
    if raw >= min {
        return raw;
    }
    info!(target: "config", field, raw = %raw, clamped = %min, "value_clamped");
    min
}
