//! Attribute and element safety policy for the editing surface.
//!
//! Nothing unsafe is ever deleted. Rejected attributes are renamed under
//! [`UNSAFE_ATTRIBUTE_PREFIX`], and rejected elements are swapped for a
//! `span` that records the original name in [`UNSAFE_ELEMENT_ATTRIBUTE`] and
//! keeps the original attributes and children.

use std::sync::LazyLock;

use regex::Regex;
use smol_str::SmolStr;
use tracing::warn;
use weaver_view::ViewElement;

use crate::config::{RenderingMode, contains_name};
use crate::host::HostDom;

pub const UNSAFE_ATTRIBUTE_PREFIX: &str = "data-ck-unsafe-attribute-";

pub const UNSAFE_ELEMENT_ATTRIBUTE: &str = "data-ck-unsafe-element";

/// Script smuggled into an inline document.
static SRCDOC_SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bon\S+\s*=|javascript:|<\s*/*script").unwrap());

/// Values that execute when used as a URL.
static EXECUTABLE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(javascript:|data:(image/svg|text/x?html))").unwrap()
});

#[derive(Debug, Clone)]
pub struct SafetyFilter {
    mode: RenderingMode,
    unsafe_elements: Vec<SmolStr>,
}

impl SafetyFilter {
    pub fn new(mode: RenderingMode, unsafe_elements: Vec<SmolStr>) -> Self {
        Self {
            mode,
            unsafe_elements,
        }
    }

    /// Whether an attribute can be rendered as-is.
    ///
    /// Data mode renders everything. In editing mode, in order: event
    /// handlers are rejected, scripted `srcdoc` is rejected, image sources
    /// are accepted, executable URLs are rejected, anything else is accepted.
    pub fn should_render_attribute(&self, key: &str, value: &str, element_name: &str) -> bool {
        if self.mode == RenderingMode::Data {
            return true;
        }

        let key = key.to_ascii_lowercase();
        let element_name = element_name.to_ascii_lowercase();

        if key.starts_with("on") {
            return false;
        }
        if key == "srcdoc" && SRCDOC_SCRIPT_RE.is_match(value) {
            return false;
        }
        if element_name == "img" && (key == "src" || key == "srcset") {
            return true;
        }
        if element_name == "source" && key == "srcset" {
            return true;
        }
        !EXECUTABLE_URL_RE.is_match(value)
    }

    /// Whether an element of this name gets swapped for a quarantine `span`.
    pub fn should_rename_element(&self, name: &str) -> bool {
        self.mode == RenderingMode::Editing && contains_name(&self.unsafe_elements, name)
    }

    /// Set an attribute, renaming it under the quarantine prefix if unsafe.
    ///
    /// `related` can allow specific unsafe attributes for the element it
    /// renders. Names the host rejects are logged and skipped.
    pub fn set_dom_element_attribute<H: HostDom>(
        &self,
        dom: &H,
        node: &H::Node,
        key: &str,
        value: &str,
        related: Option<&ViewElement>,
    ) {
        let element_name = dom.node_name(node);
        let should_render = self.should_render_attribute(key, value, &element_name)
            || related.is_some_and(|element| element.should_render_unsafe_attribute(key));

        if !should_render {
            warn!(element = %element_name, key, value, "unsafe attribute detected");
        }

        let quarantined = format!("{UNSAFE_ATTRIBUTE_PREFIX}{key}");
        if should_render {
            if dom.attribute(node, &quarantined).is_some() {
                dom.remove_attribute(node, &quarantined);
            }
        } else if dom.attribute(node, key).is_some() {
            dom.remove_attribute(node, key);
        }

        let name = if should_render { key } else { quarantined.as_str() };
        if let Err(err) = dom.set_attribute(node, name, value) {
            warn!(element = %element_name, key, %err, "invalid attribute skipped");
        }
    }

    /// Remove an attribute together with its quarantined form.
    ///
    /// The element quarantine marker is never removed.
    pub fn remove_dom_element_attribute<H: HostDom>(&self, dom: &H, node: &H::Node, key: &str) {
        if key == UNSAFE_ELEMENT_ATTRIBUTE {
            return;
        }
        dom.remove_attribute(node, key);
        dom.remove_attribute(node, &format!("{UNSAFE_ATTRIBUTE_PREFIX}{key}"));
    }

    /// A quarantine `span` for an element named `name`.
    ///
    /// When `original` is given its children are moved over and its
    /// attributes copied verbatim.
    pub fn create_replacement_element<H: HostDom>(
        &self,
        dom: &H,
        name: &str,
        original: Option<&H::Node>,
    ) -> H::Node {
        warn!(element = name, "unsafe element replaced");
        let span = dom.create_element("span");
        if let Err(err) = dom.set_attribute(&span, UNSAFE_ELEMENT_ATTRIBUTE, name) {
            warn!(%err, "could not mark replacement element");
        }
        if let Some(original) = original {
            for child in dom.children(original) {
                dom.append_child(&span, &child);
            }
            for key in dom.attribute_names(original) {
                let value = dom.attribute(original, &key).unwrap_or_default();
                if let Err(err) = dom.set_attribute(&span, &key, &value) {
                    warn!(key = %key, %err, "invalid attribute skipped");
                }
            }
        }
        span
    }

    /// Quarantine unsafe attributes and elements below `root`.
    ///
    /// `root` itself is left alone; it is the container the content was
    /// rendered into. No-op in data mode.
    pub fn sanitize_subtree<H: HostDom>(&self, dom: &H, root: &H::Node) {
        if self.mode == RenderingMode::Data {
            return;
        }

        let mut elements = Vec::new();
        collect_elements(dom, root, &mut elements);

        for element in elements {
            for key in dom.attribute_names(&element) {
                let value = dom.attribute(&element, &key).unwrap_or_default();
                self.set_dom_element_attribute(dom, &element, &key, &value, None);
            }
            let name = dom.node_name(&element).to_ascii_lowercase();
            if self.should_rename_element(&name) {
                let replacement = self.create_replacement_element(dom, &name, Some(&element));
                dom.replace(&element, &replacement);
            }
        }
    }
}

/// Element descendants of `node` in document order.
fn collect_elements<H: HostDom>(dom: &H, node: &H::Node, out: &mut Vec<H::Node>) {
    for child in dom.children(node) {
        if dom.is_element(&child) {
            out.push(child.clone());
        }
        collect_elements(dom, &child, out);
    }
}
