//! Synthetic host content that keeps empty regions focusable.
//!
//! Block fillers sit alone inside an otherwise empty block. Inline fillers
//! prefix a host text node so a collapsed caret has somewhere to live. Neither
//! ever reaches the view tree, and neither counts toward text offsets.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tracing::trace;

use crate::host::HostDom;

/// Marker attribute carried by element fillers.
pub const FILLER_ATTRIBUTE: &str = "data-cke-filler";

pub const INLINE_FILLER_LENGTH: usize = 7;

/// Seven word joiners: invisible, zero width, never collapsed.
pub const INLINE_FILLER: &str = "\u{2060}\u{2060}\u{2060}\u{2060}\u{2060}\u{2060}\u{2060}";

pub const NBSP: char = '\u{00A0}';

/// How block fillers are represented on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockFillerMode {
    /// `<br data-cke-filler="true">`
    Br,
    /// A lone non-breaking space text node.
    Nbsp,
    /// `<span data-cke-filler="true">&nbsp;</span>`
    MarkedNbsp,
}

impl BlockFillerMode {
    /// A fresh filler instance for `dom`.
    pub fn create<H: HostDom>(self, dom: &H) -> H::Node {
        match self {
            BlockFillerMode::Br => {
                let br = dom.create_element("br");
                mark_filler(dom, &br);
                br
            }
            BlockFillerMode::Nbsp => dom.create_text(&NBSP.to_string()),
            BlockFillerMode::MarkedNbsp => {
                let span = dom.create_element("span");
                mark_filler(dom, &span);
                dom.append_child(&span, &dom.create_text(&NBSP.to_string()));
                span
            }
        }
    }
}

fn mark_filler<H: HostDom>(dom: &H, node: &H::Node) {
    if let Err(err) = dom.set_attribute(node, FILLER_ATTRIBUTE, "true") {
        trace!(%err, "host rejected filler marker");
    }
}

/// Whether `node` is a block filler for `mode`.
///
/// Compared structurally, since every host document makes its own fillers.
/// A `<br>` that is the only child of a block is a filler in every mode:
/// hosts insert those on their own.
pub fn is_block_filler<H: HostDom>(
    dom: &H,
    node: &H::Node,
    mode: BlockFillerMode,
    block_elements: &[SmolStr],
) -> bool {
    if mode == BlockFillerMode::Br {
        return dom.is_equal_node(node, &BlockFillerMode::Br.create(dom));
    }

    if dom.is_element_named(node, "br") && is_only_child_of_block(dom, node, block_elements) {
        return true;
    }

    dom.is_equal_node(node, &BlockFillerMode::MarkedNbsp.create(dom))
        || (dom.is_equal_node(node, &BlockFillerMode::Nbsp.create(dom))
            && is_only_child_of_block(dom, node, block_elements))
}

fn is_only_child_of_block<H: HostDom>(dom: &H, node: &H::Node, block_elements: &[SmolStr]) -> bool {
    let Some(parent) = dom.parent(node) else {
        return false;
    };
    dom.is_element(&parent)
        && block_elements
            .iter()
            .any(|name| dom.node_name(&parent).eq_ignore_ascii_case(name))
        && dom.child_count(&parent) == 1
}

/// Whether `data` begins with the inline filler.
pub fn starts_with_filler(data: &str) -> bool {
    data.starts_with(INLINE_FILLER)
}

/// Whether `node` is a text node holding nothing but the inline filler.
pub fn is_inline_filler<H: HostDom>(dom: &H, node: &H::Node) -> bool {
    dom.is_text(node) && dom.text_data(node) == INLINE_FILLER
}

/// Whether `node` is a text node that starts with the inline filler.
pub fn node_starts_with_filler<H: HostDom>(dom: &H, node: &H::Node) -> bool {
    dom.is_text(node) && starts_with_filler(&dom.text_data(node))
}

/// `data` with a leading inline filler removed.
pub fn data_without_filler(data: &str) -> &str {
    data.strip_prefix(INLINE_FILLER).unwrap_or(data)
}
