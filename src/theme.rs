//! Named visual themes registered on a rendition

use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::ThemeConfig;

/// CSS property -> value, per selector.
pub type StyleRules = BTreeMap<String, BTreeMap<String, String>>;

/// A named set of style rules, shaped like epub.js `themes.register(name, rules)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Theme {
    pub name: String,
    pub rules: StyleRules,
}

impl Theme {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: StyleRules::new(),
        }
    }

    pub fn with_rule(mut self, selector: &str, property: &str, value: &str) -> Self {
        self.rules
            .entry(selector.to_string())
            .or_default()
            .insert(property.to_string(), value.to_string());
        self
    }

    pub fn rule(&self, selector: &str, property: &str) -> Option<&str> {
        self.rules
            .get(selector)
            .and_then(|props| props.get(property))
            .map(String::as_str)
    }
}

impl From<&ThemeConfig> for Theme {
    fn from(config: &ThemeConfig) -> Self {
        Theme::new(config.name.clone())
            .with_rule("body", "max-width", &config.max_width)
            .with_rule("body", "margin", &config.margin)
            .with_rule("body", "overflow-x", &config.overflow_x)
            .with_rule("body", "font-family", &config.font_family)
            .with_rule("body", "font-size", &config.font_size)
            .with_rule("body", "direction", config.direction.as_css())
    }
}
