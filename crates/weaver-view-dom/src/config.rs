//! Converter configuration.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::ConfigError;
use crate::filler::BlockFillerMode;
use crate::matcher::ElementPattern;

/// Block-level element names.
pub const DEFAULT_BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "caption", "center", "dd", "details", "dir",
    "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3",
    "h4", "h5", "h6", "header", "hgroup", "legend", "li", "main", "menu", "nav", "ol", "p", "pre",
    "section", "summary", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

/// Elements whose whitespace is rendered verbatim.
pub const DEFAULT_PRE_ELEMENTS: &[&str] = &["pre", "textarea"];

/// Inline elements that stand for embedded objects rather than text.
pub const DEFAULT_INLINE_OBJECT_ELEMENTS: &[&str] = &[
    "object", "iframe", "input", "button", "textarea", "select", "option", "video", "embed",
    "audio", "img", "canvas",
];

/// Elements never rendered as-is in editing mode.
pub const DEFAULT_UNSAFE_ELEMENTS: &[&str] = &["script", "style"];

/// What the converted host tree is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderingMode {
    /// Lossless and unfiltered, for import and export.
    Data,
    /// Live editable surface: unsafe content is quarantined.
    #[default]
    Editing,
}

/// Converter configuration, consumed at construction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    pub rendering_mode: RenderingMode,
    /// Defaults to `br` when editing and `nbsp` for data.
    pub block_filler_mode: Option<BlockFillerMode>,
    pub block_elements: Option<Vec<SmolStr>>,
    pub pre_elements: Option<Vec<SmolStr>>,
    pub inline_object_elements: Option<Vec<SmolStr>>,
    pub unsafe_elements: Option<Vec<SmolStr>>,
    /// Elements whose inner markup is captured verbatim on the way back.
    pub raw_content_elements: Vec<ElementPattern>,
}

impl ConverterConfig {
    pub fn data() -> Self {
        Self {
            rendering_mode: RenderingMode::Data,
            ..Default::default()
        }
    }

    pub fn editing() -> Self {
        Self::default()
    }

    pub fn with_block_filler_mode(mut self, mode: BlockFillerMode) -> Self {
        self.block_filler_mode = Some(mode);
        self
    }

    /// Load a configuration document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub(crate) fn resolve(self) -> ResolvedConfig {
        let block_filler_mode = self.block_filler_mode.unwrap_or(match self.rendering_mode {
            RenderingMode::Editing => BlockFillerMode::Br,
            RenderingMode::Data => BlockFillerMode::Nbsp,
        });
        ResolvedConfig {
            rendering_mode: self.rendering_mode,
            block_filler_mode,
            block_elements: names_or(self.block_elements, DEFAULT_BLOCK_ELEMENTS),
            pre_elements: names_or(self.pre_elements, DEFAULT_PRE_ELEMENTS),
            inline_object_elements: names_or(
                self.inline_object_elements,
                DEFAULT_INLINE_OBJECT_ELEMENTS,
            ),
            unsafe_elements: names_or(self.unsafe_elements, DEFAULT_UNSAFE_ELEMENTS),
            raw_content_elements: self.raw_content_elements,
        }
    }
}

fn names_or(names: Option<Vec<SmolStr>>, defaults: &[&str]) -> Vec<SmolStr> {
    names
        .unwrap_or_else(|| defaults.iter().map(|name| SmolStr::new(name)).collect())
        .into_iter()
        .map(|name| name.to_ascii_lowercase().into())
        .collect()
}

/// Configuration with every default filled in. Immutable once built.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub rendering_mode: RenderingMode,
    pub block_filler_mode: BlockFillerMode,
    pub block_elements: Vec<SmolStr>,
    pub pre_elements: Vec<SmolStr>,
    pub inline_object_elements: Vec<SmolStr>,
    pub unsafe_elements: Vec<SmolStr>,
    pub raw_content_elements: Vec<ElementPattern>,
}

impl ResolvedConfig {
    pub fn is_block_name(&self, name: &str) -> bool {
        contains_name(&self.block_elements, name)
    }

    pub fn is_pre_name(&self, name: &str) -> bool {
        contains_name(&self.pre_elements, name)
    }

    pub fn is_inline_object_name(&self, name: &str) -> bool {
        contains_name(&self.inline_object_elements, name)
    }
}

/// Whether `names` holds `name`, ignoring ASCII case.
pub(crate) fn contains_name(names: &[SmolStr], name: &str) -> bool {
    names.iter().any(|n| n.eq_ignore_ascii_case(name))
}
