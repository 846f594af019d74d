//! Host to view conversion.
//!
//! Conversion runs depth first and attaches every new view node to its
//! parent before descending, so whitespace handling can see the view
//! ancestors of each text. Texts and inline objects are collected per block
//! and normalized together once the block is complete.

use tracing::{trace, warn};
use weaver_view::{
    ElementKind, RAW_CONTENT_PROPERTY, ViewElement, ViewFragment, ViewNode, ViewParent, ViewText,
};

use super::{DomConverter, ToViewOptions};
use crate::filler::{self, BlockFillerMode, FILLER_ATTRIBUTE};
use crate::host::{HostDom, HostNodeType};

impl<H: HostDom> DomConverter<H> {
    /// View node for a host node.
    ///
    /// `None` for fillers, skipped comments, and text that is empty once
    /// host whitespace is accounted for. Content rendered by a UI or raw
    /// element converts to that element.
    pub fn dom_to_view(&self, host: &H::Node, options: ToViewOptions) -> Option<ViewNode> {
        let mut inline_nodes = Vec::new();
        let node = self.dom_node_to_view(host, None, options, &mut inline_nodes)?;
        self.with_whitespace(|rules| {
            rules.normalize_inline_nodes(&mut inline_nodes, options.with_children)
        });

        if self.config.block_filler_mode == BlockFillerMode::Br && is_view_br_filler(&node) {
            return None;
        }
        if node.as_text().is_some_and(ViewText::is_empty) {
            return None;
        }
        Some(node)
    }

    /// View nodes for the children of `host`, detached.
    pub fn dom_children_to_view(&self, host: &H::Node, options: ToViewOptions) -> Vec<ViewNode> {
        let staging = ViewFragment::new();
        let mut inline_nodes = Vec::new();
        self.dom_children_into(host, &staging.as_parent(), options, &mut inline_nodes);
        staging.remove_children(0, staging.child_count())
    }

    fn dom_children_into(
        &self,
        host: &H::Node,
        parent: &ViewParent,
        options: ToViewOptions,
        inline_nodes: &mut Vec<ViewNode>,
    ) {
        for child in self.dom.children(host) {
            self.dom_node_to_view(&child, Some((host, parent)), options, inline_nodes);
        }
        self.flush_inline_nodes(Some(host), inline_nodes, options);
    }

    /// Normalize collected inline nodes, but only at a block or at the top.
    ///
    /// Inside inline wrappers the nodes keep accumulating so the normalizer
    /// sees the whole run of a block at once.
    fn flush_inline_nodes(
        &self,
        host_parent: Option<&H::Node>,
        inline_nodes: &mut Vec<ViewNode>,
        options: ToViewOptions,
    ) {
        if inline_nodes.is_empty() {
            return;
        }
        if let Some(parent) = host_parent {
            if !self.dom.is_fragment(parent) && !self.is_block_host_element(parent) {
                return;
            }
        }
        self.with_whitespace(|rules| rules.normalize_inline_nodes(inline_nodes, options.with_children));
    }

    fn dom_node_to_view(
        &self,
        host: &H::Node,
        parent: Option<(&H::Node, &ViewParent)>,
        options: ToViewOptions,
        inline_nodes: &mut Vec<ViewNode>,
    ) -> Option<ViewNode> {
        let (node, descend) = self.create_view_node(host, options, inline_nodes)?;

        if let Some((host_parent, view_parent)) = parent {
            if node
                .as_element()
                .is_some_and(|element| self.is_block_view_element(element))
            {
                self.flush_inline_nodes(Some(host_parent), inline_nodes, options);
            }
            if let Err(err) = view_parent.append_child(node.clone()) {
                warn!(%err, "converted node dropped");
                return None;
            }
        }

        if descend {
            let mut nested = Vec::new();
            if options.with_children {
                if let Some(view_parent) = node.as_parent() {
                    self.dom_children_into(host, &view_parent, options, &mut nested);
                }
            }
            match node.as_element() {
                Some(element) if self.is_inline_object(element) => inline_nodes.push(node.clone()),
                _ => inline_nodes.append(&mut nested),
            }
        }

        Some(node)
    }

    /// The view node for `host` alone, and whether its children still need converting.
    fn create_view_node(
        &self,
        host: &H::Node,
        options: ToViewOptions,
        inline_nodes: &mut Vec<ViewNode>,
    ) -> Option<(ViewNode, bool)> {
        if self.is_block_filler(host) {
            trace!(host = %self.dom.node_id(host), "skipped block filler");
            return None;
        }
        if let Some(owner) = self.get_host_view_element(host) {
            return Some((owner.as_node(), false));
        }

        match self.dom.node_type(host) {
            HostNodeType::Text => self.text_to_view(host, inline_nodes),
            HostNodeType::Comment if options.skip_comments => None,
            node_type => match self.map_dom_to_view(host) {
                Some(bound) => Some((self.bound_to_view(host, bound, inline_nodes), false)),
                None => self.create_view_parent(host, node_type, options, inline_nodes),
            },
        }
    }

    fn text_to_view(
        &self,
        host: &H::Node,
        inline_nodes: &mut Vec<ViewNode>,
    ) -> Option<(ViewNode, bool)> {
        if filler::is_inline_filler(&self.dom, host) {
            return None;
        }
        let data = self.dom.text_data(host);
        if data.is_empty() {
            return None;
        }
        let text = ViewText::new(data).as_node();
        inline_nodes.push(text.clone());
        Some((text, false))
    }

    /// An already bound view node. Raw elements pick up the current host markup.
    fn bound_to_view(
        &self,
        host: &H::Node,
        bound: ViewParent,
        inline_nodes: &mut Vec<ViewNode>,
    ) -> ViewNode {
        if let ViewParent::Element(element) = &bound {
            if element.kind() == ElementKind::Raw {
                element.set_custom_property(RAW_CONTENT_PROPERTY, self.dom.inner_html(host));
            }
            if self.is_inline_object(element) {
                inline_nodes.push(bound.as_node());
            }
        }
        bound.as_node()
    }

    fn create_view_parent(
        &self,
        host: &H::Node,
        node_type: HostNodeType,
        options: ToViewOptions,
        inline_nodes: &mut Vec<ViewNode>,
    ) -> Option<(ViewNode, bool)> {
        match node_type {
            HostNodeType::Fragment => {
                let fragment = ViewFragment::new();
                if options.bind {
                    self.bind_document_fragments(host, &fragment);
                }
                Some((fragment.as_node(), true))
            }
            HostNodeType::Comment => {
                let comment = ViewElement::comment(self.dom.text_data(host));
                if options.bind {
                    self.bind_elements(host, &comment);
                }
                Some((comment.as_node(), false))
            }
            HostNodeType::Element | HostNodeType::Text => {
                let name = self.dom.node_name(host);
                let element = if options.keep_original_case {
                    ViewElement::new(name)
                } else {
                    ViewElement::new(name.to_ascii_lowercase())
                };
                if options.bind {
                    self.bind_elements(host, &element);
                }
                for key in self.dom.attribute_names(host) {
                    let value = self.dom.attribute(host, &key).unwrap_or_default();
                    element.set_attribute(key, value);
                }

                if options.with_children && self.raw_content_matcher.borrow().matches(&self.dom, host)
                {
                    trace!(element = element.name(), "captured raw content");
                    element.set_custom_property(RAW_CONTENT_PROPERTY, self.dom.inner_html(host));
                    if !self.is_block_view_element(&element) {
                        inline_nodes.push(element.as_node());
                    }
                    return Some((element.as_node(), false));
                }
                Some((element.as_node(), true))
            }
        }
    }
}

fn is_view_br_filler(node: &ViewNode) -> bool {
    node.as_element().is_some_and(|element| {
        element.is_named("br") && element.attribute(FILLER_ATTRIBUTE).as_deref() == Some("true")
    })
}
