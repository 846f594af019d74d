//! Bidirectional conversion between the view tree and a host document.
//!
//! [`DomConverter`] owns the binding tables, the safety filter and the
//! element matchers for one host document. It is configured once at
//! construction; only the matchers can grow afterwards.
//!
//! - `to_dom`: view nodes to host nodes, with block fillers and protected
//!   whitespace.
//! - `to_view`: host nodes to view nodes, skipping fillers and undoing the
//!   whitespace protection.
//! - `position`: positions, ranges and text correspondence.
//! - `selection`: host selections, fake selections and validity checks.

mod position;
mod selection;
mod to_dom;
mod to_view;

use std::cell::RefCell;

use smol_str::SmolStr;
use tracing::debug;
use weaver_view::{ViewElement, ViewFragment, ViewParent, ViewSelection};

use crate::binding::BindingTables;
use crate::config::{ConverterConfig, RenderingMode, ResolvedConfig};
use crate::error::ConfigError;
use crate::filler::{self, BlockFillerMode};
use crate::host::HostDom;
use crate::matcher::{ElementPattern, Matcher};
use crate::safety::SafetyFilter;
use crate::whitespace::WhitespaceRules;

pub use to_dom::HostWriter;

/// Options for view to host conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToDomOptions {
    /// Bind every created element and fragment to its view node.
    pub bind: bool,
    /// Convert children too. Shallow conversion creates the node only.
    pub with_children: bool,
}

impl Default for ToDomOptions {
    fn default() -> Self {
        Self {
            bind: false,
            with_children: true,
        }
    }
}

impl ToDomOptions {
    pub fn bound() -> Self {
        Self {
            bind: true,
            ..Self::default()
        }
    }
}

/// Options for host to view conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToViewOptions {
    pub bind: bool,
    pub with_children: bool,
    /// Keep host element names as they are instead of lowercasing them.
    pub keep_original_case: bool,
    /// Drop host comments instead of converting them to `$comment` elements.
    pub skip_comments: bool,
}

impl Default for ToViewOptions {
    fn default() -> Self {
        Self {
            bind: false,
            with_children: true,
            keep_original_case: false,
            skip_comments: false,
        }
    }
}

impl ToViewOptions {
    pub fn bound() -> Self {
        Self {
            bind: true,
            ..Self::default()
        }
    }
}

/// Converter between the view tree and one host document.
pub struct DomConverter<H: HostDom> {
    dom: H,
    config: ResolvedConfig,
    bindings: BindingTables<H>,
    safety: SafetyFilter,
    raw_content_matcher: RefCell<Matcher>,
    inline_object_matcher: RefCell<Matcher>,
}

impl<H: HostDom> DomConverter<H> {
    /// Build a converter for `dom`.
    ///
    /// Fails when a configured raw content pattern is not a valid regex.
    pub fn new(dom: H, config: ConverterConfig) -> Result<Self, ConfigError> {
        let config = config.resolve();

        let mut raw_content_matcher = Matcher::new("raw_content_elements");
        for pattern in &config.raw_content_elements {
            raw_content_matcher.add(pattern)?;
        }

        let safety = SafetyFilter::new(config.rendering_mode, config.unsafe_elements.clone());
        debug!(
            rendering_mode = ?config.rendering_mode,
            block_filler_mode = ?config.block_filler_mode,
            "created converter"
        );

        Ok(Self {
            dom,
            config,
            bindings: BindingTables::new(),
            safety,
            raw_content_matcher: RefCell::new(raw_content_matcher),
            inline_object_matcher: RefCell::new(Matcher::new("inline_object_elements")),
        })
    }

    pub fn dom(&self) -> &H {
        &self.dom
    }

    pub fn rendering_mode(&self) -> RenderingMode {
        self.config.rendering_mode
    }

    pub fn block_filler_mode(&self) -> BlockFillerMode {
        self.config.block_filler_mode
    }

    pub fn block_elements(&self) -> &[SmolStr] {
        &self.config.block_elements
    }

    pub fn pre_elements(&self) -> &[SmolStr] {
        &self.config.pre_elements
    }

    pub fn inline_object_elements(&self) -> &[SmolStr] {
        &self.config.inline_object_elements
    }

    pub fn unsafe_elements(&self) -> &[SmolStr] {
        &self.config.unsafe_elements
    }

    pub fn bindings(&self) -> &BindingTables<H> {
        &self.bindings
    }

    // --- matchers ---

    /// Capture the inner markup of matching host elements verbatim.
    pub fn register_raw_content_matcher(&self, pattern: &ElementPattern) -> Result<(), ConfigError> {
        self.raw_content_matcher.borrow_mut().add(pattern)
    }

    /// Treat matching elements as inline objects in whitespace handling.
    pub fn register_inline_object_matcher(
        &self,
        pattern: &ElementPattern,
    ) -> Result<(), ConfigError> {
        self.inline_object_matcher.borrow_mut().add(pattern)
    }

    fn with_whitespace<R>(&self, f: impl FnOnce(&WhitespaceRules<'_>) -> R) -> R {
        let inline_objects = self.inline_object_matcher.borrow();
        f(&WhitespaceRules::new(&self.config, &inline_objects))
    }

    fn is_block_view_element(&self, element: &ViewElement) -> bool {
        self.with_whitespace(|rules| rules.is_block_element(element))
    }

    fn is_inline_object(&self, element: &ViewElement) -> bool {
        self.with_whitespace(|rules| rules.is_inline_object(element))
    }

    fn is_block_host_element(&self, node: &H::Node) -> bool {
        self.dom.is_element(node) && self.config.is_block_name(&self.dom.node_name(node))
    }

    // --- bindings ---

    pub fn bind_elements(&self, host: &H::Node, view: &ViewElement) {
        self.bindings.bind(&self.dom, host, &view.as_parent());
    }

    pub fn bind_document_fragments(&self, host: &H::Node, view: &ViewFragment) {
        self.bindings.bind(&self.dom, host, &view.as_parent());
    }

    /// Unbind `host` and every host node below it.
    pub fn unbind_dom_element(&self, host: &H::Node) {
        self.bindings.unbind(&self.dom, host);
    }

    /// Remember `selection` for a host container that cannot hold a real selection.
    pub fn bind_fake_selection(&self, host: &H::Node, selection: &ViewSelection) {
        self.bindings.bind_fake_selection(&self.dom, host, selection);
    }

    pub fn fake_selection_to_view(&self, host: &H::Node) -> Option<ViewSelection> {
        self.bindings.fake_selection_for(&self.dom, host)
    }

    pub fn map_view_to_dom(&self, view: &ViewParent) -> Option<H::Node> {
        self.bindings.host_for(&self.dom, view)
    }

    /// View node bound to `host`.
    ///
    /// Anything rendered by a UI or raw element maps to that element.
    pub fn map_dom_to_view(&self, host: &H::Node) -> Option<ViewParent> {
        self.get_host_view_element(host)
            .map(|element| element.as_parent())
            .or_else(|| self.bindings.view_for(&self.dom, host))
    }

    /// Outermost UI or raw element whose rendered content contains `host`.
    pub fn get_host_view_element(&self, host: &H::Node) -> Option<ViewElement> {
        self.dom.ancestors(host).iter().rev().find_map(|ancestor| {
            match self.bindings.view_for(&self.dom, ancestor)? {
                ViewParent::Element(element) if element.kind().is_opaque_render() => {
                    Some(element)
                }
                ViewParent::Element(_) => None,
                ViewParent::Fragment(_) => None,
            }
        })
    }

    // --- fillers and safety ---

    /// Whether `host` is a block filler under this converter's mode.
    pub fn is_block_filler(&self, host: &H::Node) -> bool {
        filler::is_block_filler(
            &self.dom,
            host,
            self.config.block_filler_mode,
            &self.config.block_elements,
        )
    }

    pub fn should_render_attribute(&self, key: &str, value: &str, element_name: &str) -> bool {
        self.safety.should_render_attribute(key, value, element_name)
    }

    /// Set an attribute on a host element through the safety filter.
    pub fn set_dom_element_attribute(
        &self,
        host: &H::Node,
        key: &str,
        value: &str,
        related: Option<&ViewElement>,
    ) {
        self.safety
            .set_dom_element_attribute(&self.dom, host, key, value, related);
    }

    pub fn remove_dom_element_attribute(&self, host: &H::Node, key: &str) {
        self.safety.remove_dom_element_attribute(&self.dom, host, key);
    }

    /// Quarantine unsafe content below `host`. No-op in data mode.
    pub fn sanitize_host_subtree(&self, host: &H::Node) {
        self.safety.sanitize_subtree(&self.dom, host);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDom;

    #[test]
    fn test_accessors_reflect_config() {
        let converter = DomConverter::new(MemoryDom::new(), ConverterConfig::data()).unwrap();
        assert_eq!(converter.rendering_mode(), RenderingMode::Data);
        assert_eq!(converter.block_filler_mode(), BlockFillerMode::Nbsp);
        assert!(converter.block_elements().iter().any(|n| n == "p"));
        assert!(converter.pre_elements().iter().any(|n| n == "pre"));
        assert!(converter.inline_object_elements().iter().any(|n| n == "img"));
        assert!(converter.unsafe_elements().iter().any(|n| n == "script"));
    }

    #[test]
    fn test_invalid_raw_content_pattern_fails_construction() {
        let mut config = ConverterConfig::editing();
        config.raw_content_elements.push(ElementPattern::name_regex("["));
        assert!(matches!(
            DomConverter::new(MemoryDom::new(), config),
            Err(ConfigError::Pattern { field: "raw_content_elements", .. })
        ));
    }

    #[test]
    fn test_host_view_element_is_outermost_render_element() {
        let dom = MemoryDom::new();
        let converter = DomConverter::new(dom, ConverterConfig::editing()).unwrap();
        let root = dom.parse_html("<div><span><b>x</b></span></div>");
        let div = dom.first_child(&root).unwrap();
        let span = dom.first_child(&div).unwrap();
        let b = dom.first_child(&span).unwrap();
        let text = dom.first_child(&b).unwrap();

        let container = ViewElement::container("div");
        let outer = ViewElement::ui("span", |_| {});
        let inner = ViewElement::ui("b", |_| {});
        converter.bind_elements(&div, &container);
        converter.bind_elements(&span, &outer);
        converter.bind_elements(&b, &inner);

        assert_eq!(converter.get_host_view_element(&text), Some(outer.clone()));
        assert_eq!(converter.get_host_view_element(&b), Some(outer.clone()));
        assert_eq!(converter.get_host_view_element(&span), None);
        assert_eq!(converter.map_dom_to_view(&span), Some(outer.as_parent()));
        assert_eq!(converter.map_dom_to_view(&div), Some(container.as_parent()));
    }

    #[test]
    fn test_unbind_removes_descendants() {
        let dom = MemoryDom::new();
        let converter = DomConverter::new(dom, ConverterConfig::editing()).unwrap();
        let root = dom.parse_html("<ul><li></li></ul>");
        let ul = dom.first_child(&root).unwrap();
        let li = dom.first_child(&ul).unwrap();
        let view_ul = ViewElement::container("ul");
        let view_li = ViewElement::container("li");
        converter.bind_elements(&ul, &view_ul);
        converter.bind_elements(&li, &view_li);

        converter.unbind_dom_element(&ul);
        assert_eq!(converter.map_dom_to_view(&li), None);
        assert_eq!(converter.map_view_to_dom(&view_ul.as_parent()), None);
    }
}
