//! Reader configuration: render layout plus visual theme

use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Noto Sans covers most scripts, including Gujarati and Devanagari.
pub const DEFAULT_FONT_STYLESHEET: &str =
    "https://fonts.googleapis.com/css2?family=Noto+Sans:wght@400;700&display=swap";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReaderConfig {
    pub layout: LayoutConfig,
    pub theme: ThemeConfig,
}

/// Layout handed to the renderer when binding a document to a container.
///
/// Serializes to the option object epub.js expects from `renderTo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub width: String,
    pub height: String,
    pub spread: SpreadMode,
    pub flow: FlowMode,
    /// Below this container width the renderer falls back to single pages.
    pub min_spread_width: u32,
    pub manager: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpreadMode {
    Always,
    Auto,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowMode {
    Paginated,
    Scrolled,
    ScrolledDoc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}

impl TextDirection {
    pub fn as_css(&self) -> &'static str {
        match self {
            TextDirection::Ltr => "ltr",
            TextDirection::Rtl => "rtl",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThemeConfig {
    pub name: String,
    pub max_width: String,
    pub margin: String,
    pub overflow_x: String,
    pub font_family: String,
    pub font_size: String,
    pub direction: TextDirection,
    /// Remote stylesheet providing `font_family`; `None` skips the injection.
    pub font_stylesheet: Option<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            width: "100%".to_string(),
            height: "100%".to_string(),
            spread: SpreadMode::Always,
            flow: FlowMode::Paginated,
            min_spread_width: 800,
            manager: "default".to_string(),
        }
    }
}

impl Default for ThemeConfig {
    fn default() -> Self {
        ThemeConfig {
            name: "custom".to_string(),
            max_width: "100%".to_string(),
            margin: "0 auto !important".to_string(),
            overflow_x: "hidden".to_string(),
            font_family: "\"Noto Sans\", sans-serif".to_string(),
            font_size: "1rem".to_string(),
            direction: TextDirection::Ltr,
            font_stylesheet: Some(DEFAULT_FONT_STYLESHEET.to_string()),
        }
    }
}

impl ReaderConfig {
    /// Parse a (possibly partial) JSON config; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load overrides from `READER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = ReaderConfig::default();

        if let Ok(name) = env::var("READER_THEME") {
            config.theme.name = name;
        }
        if let Ok(family) = env::var("READER_FONT_FAMILY") {
            config.theme.font_family = family;
        }
        if let Ok(size) = env::var("READER_FONT_SIZE") {
            config.theme.font_size = size;
        }
        if let Ok(value) = env::var("READER_DIRECTION") {
            config.theme.direction = match value.to_ascii_lowercase().as_str() {
                "ltr" => TextDirection::Ltr,
                "rtl" => TextDirection::Rtl,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "READER_DIRECTION",
                        value,
                    })
                }
            };
        }
        if let Ok(value) = env::var("READER_SPREAD") {
            config.layout.spread = match value.to_ascii_lowercase().as_str() {
                "always" => SpreadMode::Always,
                "auto" => SpreadMode::Auto,
                "none" => SpreadMode::None,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "READER_SPREAD",
                        value,
                    })
                }
            };
        }
        if let Ok(value) = env::var("READER_MIN_SPREAD_WIDTH") {
            config.layout.min_spread_width =
                value.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "READER_MIN_SPREAD_WIDTH",
                    value: value.clone(),
                })?;
        }

        Ok(config)
    }
}
