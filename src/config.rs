//! Crate configuration
//!
//! Formatting and rendering settings, loadable from JSON or YAML. Missing
//! fields fall back to their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ScoreError, ScoreResult};
use crate::format::FormatContext;
use crate::models::pitch::PitchLanguage;

/// Configuration options for formatting and persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Target LilyPond version (e.g., "2.24.0")
    pub lilypond_version: String,

    /// Note name language
    pub language: PitchLanguage,

    /// Spaces per nesting level
    pub indent_width: usize,

    /// Renderer executable, looked up on `PATH` when not absolute
    pub renderer: String,

    /// Seconds before a renderer run is killed
    pub renderer_timeout_secs: u64,

    /// Directory for rendered files; relative paths resolve against it
    pub output_directory: PathBuf,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            lilypond_version: "2.24.0".to_string(),
            language: PitchLanguage::English,
            indent_width: 4,
            renderer: "lilypond".to_string(),
            renderer_timeout_secs: 60,
            output_directory: PathBuf::from("."),
        }
    }
}

impl Configuration {
    pub fn from_json(text: &str) -> ScoreResult<Self> {
        serde_json::from_str(text).map_err(|e| ScoreError::Config(format!("invalid JSON: {}", e)))
    }

    pub fn from_yaml(text: &str) -> ScoreResult<Self> {
        serde_yaml::from_str(text).map_err(|e| ScoreError::Config(format!("invalid YAML: {}", e)))
    }

    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn from_file(path: impl AsRef<Path>) -> ScoreResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&text),
            Some("yaml") | Some("yml") => Self::from_yaml(&text),
            other => Err(ScoreError::Config(format!(
                "unsupported configuration format {:?} for {}",
                other,
                path.display()
            ))),
        }
    }

    pub fn to_json(&self) -> ScoreResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ScoreError::Config(e.to_string()))
    }

    /// Format context carrying this configuration's language and indent
    pub fn format_context(&self) -> FormatContext {
        FormatContext::default()
            .with_language(self.language)
            .with_indent_width(self.indent_width)
    }

    pub fn renderer_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.renderer_timeout_secs)
    }

    /// `path` resolved against the output directory
    pub fn output_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.output_directory.join(path)
        }
    }
}
