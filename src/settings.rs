//! Viewer settings with JSON persistence.
//!
//! Settings live at `~/.pleat/settings.json`. Missing keys in a persisted
//! file fall back to defaults per field, so a file carrying only
//! `{"behavior": {"rainbowBrackets": true}}` keeps every other option at
//! its default. A malformed file never blocks startup.

use std::fs;
use std::io;
use std::path::PathBuf;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::highlight::HighlightOptions;

/// Top-level settings object, mirrored in the persisted JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub theme: String,
    pub font_family: String,
    pub font_size: u16,
    pub colors: Colors,
    pub behavior: Behavior,
}

/// Syntax colors, keyed by token class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Colors {
    pub key: String,
    pub string: String,
    pub number: String,
    pub boolean: String,
    pub null: String,
    pub bracket: String,
    pub object: String,
    pub array: String,
}

/// Display and interaction toggles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Behavior {
    pub auto_expand: bool,
    pub show_data_types: bool,
    pub highlight_matches: bool,
    pub show_line_numbers: bool,
    pub rainbow_brackets: bool,
    pub show_string_length: bool,
    pub show_array_indices: bool,
    pub string_length_threshold: usize,
    pub indent_size: usize,
    pub show_whitespace: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            theme: "dark".to_string(),
            font_family: "'Fira Code', 'Consolas', monospace".to_string(),
            font_size: 14,
            colors: Colors::default(),
            behavior: Behavior::default(),
        }
    }
}

impl Default for Colors {
    fn default() -> Self {
        Colors {
            key: "#9cdcfe".to_string(),
            string: "#ce9178".to_string(),
            number: "#b5cea8".to_string(),
            boolean: "#569cd6".to_string(),
            null: "#808080".to_string(),
            bracket: "#d4d4d4".to_string(),
            object: "#ffd700".to_string(),
            array: "#ff6b6b".to_string(),
        }
    }
}

impl Default for Behavior {
    fn default() -> Self {
        Behavior {
            auto_expand: false,
            show_data_types: true,
            highlight_matches: true,
            show_line_numbers: true,
            rainbow_brackets: false,
            show_string_length: false,
            show_array_indices: true,
            string_length_threshold: 20,
            indent_size: 2,
            show_whitespace: false,
        }
    }
}

impl Settings {
    /// Parse settings JSON, falling back to defaults on any error.
    pub fn from_json(text: &str) -> Settings {
        match serde_json::from_str(text) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("malformed settings, using defaults: {}", e);
                Settings::default()
            }
        }
    }

    /// Load settings from disk, or defaults when no file exists or the
    /// file cannot be read.
    pub fn load() -> Settings {
        let Some(path) = settings_path() else {
            return Settings::default();
        };
        match fs::read_to_string(&path) {
            Ok(text) => Settings::from_json(&text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Settings::default(),
            Err(e) => {
                warn!("could not read {}: {}", path.display(), e);
                Settings::default()
            }
        }
    }

    /// Persist settings to disk, creating `~/.pleat` if needed.
    pub fn save(&self) -> io::Result<()> {
        let Some(path) = settings_path() else {
            return Err(io::Error::other("no home directory"));
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        fs::write(&path, json)
    }

    pub fn highlight_options(&self) -> HighlightOptions {
        HighlightOptions::from(&self.behavior)
    }
}

impl From<&Behavior> for HighlightOptions {
    fn from(behavior: &Behavior) -> Self {
        HighlightOptions {
            rainbow_brackets: behavior.rainbow_brackets,
            show_whitespace: behavior.show_whitespace,
            show_data_types: behavior.show_data_types,
            show_string_length: behavior.show_string_length,
            string_length_threshold: behavior.string_length_threshold,
            highlight_matches: behavior.highlight_matches,
        }
    }
}

fn settings_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".pleat").join("settings.json"))
}
