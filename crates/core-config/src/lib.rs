//! Configuration loading and parsing.
//!
//! Parses `asmview.toml` (or an override path provided by the binary)
//! extracting `[view] wheel_lines`, `[render] refresh_hz`, and
//! `[render] blink_interval_ms`. Raw parsed values are retained so the
//! effective values can be re-clamped when the viewport geometry changes;
//! the clamp logic lives in `Config::apply_context`.
//!
//! Unknown fields are ignored (TOML deserialization tolerance) to allow
//! forward evolution without immediate warnings. A missing file is normal
//! and silent; a malformed file falls back to defaults with a warning.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

/// Upper bound for `[render] refresh_hz`; beyond this a terminal repaint
/// cannot keep up anyway.
pub const MAX_REFRESH_HZ: u16 = 240;

/// Viewport geometry supplied by the host when applying the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigContext {
    pub viewport_rows: u16,
    pub status_rows: u16,
}

impl ConfigContext {
    pub fn new(viewport_rows: u16, status_rows: u16) -> Self {
        Self {
            viewport_rows,
            status_rows,
        }
    }

    pub fn text_rows(&self) -> u16 {
        self.viewport_rows.saturating_sub(self.status_rows)
    }

    pub fn from_viewport_height(viewport_rows: u16) -> Self {
        Self {
            viewport_rows,
            status_rows: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ViewConfig {
    #[serde(default = "ViewConfig::default_wheel_lines")]
    pub wheel_lines: u16,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            wheel_lines: Self::default_wheel_lines(),
        }
    }
}

impl ViewConfig {
    const fn default_wheel_lines() -> u16 {
        3
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    #[serde(default = "RenderConfig::default_refresh_hz")]
    pub refresh_hz: u16,
    #[serde(default = "RenderConfig::default_blink_interval_ms")]
    pub blink_interval_ms: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            refresh_hz: Self::default_refresh_hz(),
            blink_interval_ms: Self::default_blink_interval_ms(),
        }
    }
}

impl RenderConfig {
    const fn default_refresh_hz() -> u16 {
        60
    }
    const fn default_blink_interval_ms() -> u64 {
        500
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

/// Clamped values actually in force, recomputed per viewport context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EffectiveConfig {
    pub wheel_lines: u16,
    pub refresh_hz: u16,
    pub blink_interval_ms: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>,      // original file string (optional)
    pub file: ConfigFile,         // parsed (or default) data
    pub effective: EffectiveConfig, // clamped to viewport semantics
}

/// Best-effort config path following platform conventions (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from("asmview.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("asmview").join("asmview.toml");
    }
    // Final fallback relative filename.
    PathBuf::from("asmview.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    if let Ok(content) = fs::read_to_string(&path) {
        match toml::from_str::<ConfigFile>(&content) {
            Ok(file) => Ok(Config {
                raw: Some(content),
                file,
                effective: EffectiveConfig::default(), // computed later
            }),
            Err(err) => {
                warn!(
                    target: "config",
                    path = %path.display(),
                    error = %err,
                    "config_parse_failed_using_defaults"
                );
                Ok(Config::default())
            }
        }
    } else {
        Ok(Config::default())
    }
}

impl Config {
    /// Apply viewport context to compute the clamped effective values.
    ///
    /// `wheel_lines` is clamped into `[1, text_rows]` so a wheel tick never
    /// scrolls past a full page; `refresh_hz` is clamped into
    /// `[1, MAX_REFRESH_HZ]`.
    pub fn apply_context(&mut self, ctx: ConfigContext) -> EffectiveConfig {
        let text_rows = ctx.text_rows();

        let raw_wheel = self.file.view.wheel_lines;
        let max_wheel = text_rows.max(1);
        let wheel_lines = raw_wheel.clamp(1, max_wheel);
        if wheel_lines != raw_wheel {
            info!(
                target: "config",
                raw = raw_wheel,
                clamped = wheel_lines,
                text_rows,
                viewport_rows = ctx.viewport_rows,
                status_rows = ctx.status_rows,
                "wheel_lines_clamped"
            );
        }

        let raw_hz = self.file.render.refresh_hz;
        let refresh_hz = raw_hz.clamp(1, MAX_REFRESH_HZ);
        if refresh_hz != raw_hz {
            info!(
                target: "config",
                raw = raw_hz,
                clamped = refresh_hz,
                "refresh_hz_clamped"
            );
        }

        let effective = EffectiveConfig {
            wheel_lines,
            refresh_hz,
            blink_interval_ms: self.file.render.blink_interval_ms,
        };
        self.effective = effective;
        effective
    }

    /// Recompute effective values on a viewport change. Returns
    /// `Some(new_effective)` when anything changed, else `None`.
    pub fn recompute_with_context(&mut self, ctx: ConfigContext) -> Option<EffectiveConfig> {
        let prev = self.effective;
        let current = self.apply_context(ctx);
        if current != prev { Some(current) } else { None }
    }
}
