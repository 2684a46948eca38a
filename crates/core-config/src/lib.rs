//! Configuration loading and parsing.
//!
//! Reads `notator.toml` (or an override path provided by the binary). Every
//! section and key is optional; missing keys take the defaults below and
//! unknown keys are ignored. A missing or unparsable file yields the
//! defaults. After parsing, out-of-range values are clamped (see
//! [`Config::normalize`]) and each clamp is logged on the `config` target.
//!
//! ```toml
//! [layout]
//! default_measure_width = 160
//! measure_padding = 8
//! stem_margin = 7
//! [widths]
//! note_head = 10
//! [undo]
//! history_max = 200
//! [clipboard]
//! stack_max = 16
//! [input]
//! mode = "insert"
//! default_duration = 2
//! ```

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

pub const CONFIG_FILE_NAME: &str = "notator.toml";

/// Longest duration code accepted for `input.default_duration`.
const MAX_DURATION_CODE: i32 = 8;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LayoutConfig {
    #[serde(default = "LayoutConfig::default_measure_width")]
    pub default_measure_width: u32,
    #[serde(default = "LayoutConfig::default_measure_padding")]
    pub measure_padding: u32,
    #[serde(default = "LayoutConfig::default_stem_margin")]
    pub stem_margin: i32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            default_measure_width: Self::default_measure_width(),
            measure_padding: Self::default_measure_padding(),
            stem_margin: Self::default_stem_margin(),
        }
    }
}

impl LayoutConfig {
    const fn default_measure_width() -> u32 {
        160
    }
    const fn default_measure_padding() -> u32 {
        8
    }
    const fn default_stem_margin() -> i32 {
        7
    }
}

/// Glyph widths in pixels used by the standard width provider.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct WidthsConfig {
    pub note_head: u32,
    pub dot: u32,
    pub accidental: u32,
    pub flag: u32,
    pub clef: u32,
    pub key_accidental: u32,
    pub time_signature: u32,
    pub marker: u32,
    pub directive: u32,
}

impl Default for WidthsConfig {
    fn default() -> Self {
        Self {
            note_head: 10,
            dot: 4,
            accidental: 8,
            flag: 6,
            clef: 24,
            key_accidental: 7,
            time_signature: 16,
            marker: 4,
            directive: 8,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct UndoConfig {
    #[serde(default = "UndoConfig::default_history_max")]
    pub history_max: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            history_max: Self::default_history_max(),
        }
    }
}

impl UndoConfig {
    const fn default_history_max() -> usize {
        200
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ClipboardConfig {
    #[serde(default = "ClipboardConfig::default_stack_max")]
    pub stack_max: usize,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            stack_max: Self::default_stack_max(),
        }
    }
}

impl ClipboardConfig {
    const fn default_stack_max() -> usize {
        16
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputModeConfig {
    #[default]
    Insert,
    Edit,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct InputConfig {
    #[serde(default)]
    pub mode: InputModeConfig,
    #[serde(default = "InputConfig::default_duration")] // quarter note
    pub default_duration: i32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            mode: InputModeConfig::default(),
            default_duration: Self::default_duration(),
        }
    }
}

impl InputConfig {
    const fn default_duration() -> i32 {
        2
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub widths: WidthsConfig,
    #[serde(default)]
    pub undo: UndoConfig,
    #[serde(default)]
    pub clipboard: ClipboardConfig,
    #[serde(default)]
    pub input: InputConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub file: ConfigFile,    // parsed (or default) data
    pub path: Option<PathBuf>,
}

/// Best-effort config path: the working directory first, then the platform
/// config dir (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("notator").join(CONFIG_FILE_NAME);
    }
    PathBuf::from(CONFIG_FILE_NAME)
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        info!(target: "config", path = %path.display(), "config_missing_using_defaults");
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            let mut cfg = Config {
                raw: Some(content),
                file,
                path: Some(path),
            };
            cfg.normalize();
            Ok(cfg)
        }
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed_using_defaults");
            Ok(Config::default())
        }
    }
}

impl Config {
    /// Clamp out-of-range values. Returns how many were changed.
    pub fn normalize(&mut self) -> usize {
        let mut changed = 0;
        let f = &mut self.file;
        if f.layout.default_measure_width == 0 {
            clamped("layout.default_measure_width", 0, 1);
            f.layout.default_measure_width = 1;
            changed += 1;
        }
        if f.layout.stem_margin < 0 {
            clamped("layout.stem_margin", i64::from(f.layout.stem_margin), 0);
            f.layout.stem_margin = 0;
            changed += 1;
        }
        if f.undo.history_max == 0 {
            clamped("undo.history_max", 0, 1);
            f.undo.history_max = 1;
            changed += 1;
        }
        if f.clipboard.stack_max == 0 {
            clamped("clipboard.stack_max", 0, 1);
            f.clipboard.stack_max = 1;
            changed += 1;
        }
        let duration = f.input.default_duration;
        if !(0..=MAX_DURATION_CODE).contains(&duration) {
            let fixed = duration.clamp(0, MAX_DURATION_CODE);
            clamped("input.default_duration", i64::from(duration), i64::from(fixed));
            f.input.default_duration = fixed;
            changed += 1;
        }
        changed
    }
}

fn clamped(key: &'static str, raw: i64, clamped: i64) {
    info!(target: "config", key, raw, clamped, "config_value_clamped");
}
