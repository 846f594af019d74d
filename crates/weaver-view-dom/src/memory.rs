//! In-memory host document.
//!
//! Mirrors the parts of a browser document the converter relies on: identity
//! bearing nodes, weak parent links, ordered attributes, attribute name
//! validation. Used by tests and by embeddings without a real document.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use smol_str::SmolStr;
use tracing::warn;

use crate::error::HostError;
use crate::host::{HostDom, HostNodeId, HostNodeType};
use crate::html;

enum NodeKind {
    Element(SmolStr),
    Text,
    Comment,
    Fragment,
}

struct NodeData {
    id: HostNodeId,
    kind: NodeKind,
    parent: RefCell<Weak<NodeData>>,
    children: RefCell<Vec<MemoryNode>>,
    attributes: RefCell<Vec<(SmolStr, String)>>,
    data: RefCell<String>,
}

/// Handle to an in-memory host node. Equality is identity.
#[derive(Clone)]
pub struct MemoryNode(Rc<NodeData>);

/// Weak counterpart of [`MemoryNode`].
#[derive(Clone)]
pub struct WeakMemoryNode(Weak<NodeData>);

impl PartialEq for MemoryNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for MemoryNode {}

impl fmt::Debug for MemoryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.kind {
            NodeKind::Element(name) => write!(f, "<{name}>#{}", self.0.id),
            NodeKind::Text => write!(f, "#text({:?})#{}", self.0.data.borrow(), self.0.id),
            NodeKind::Comment => write!(f, "#comment#{}", self.0.id),
            NodeKind::Fragment => write!(f, "#fragment#{}", self.0.id),
        }
    }
}

impl MemoryNode {
    fn new(kind: NodeKind, data: &str) -> Self {
        Self(Rc::new(NodeData {
            id: HostNodeId::next(),
            kind,
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            attributes: RefCell::new(Vec::new()),
            data: RefCell::new(data.to_string()),
        }))
    }

    fn detach(&self) {
        let Some(parent) = self.0.parent.borrow().upgrade() else {
            return;
        };
        parent.children.borrow_mut().retain(|c| c != self);
        *self.0.parent.borrow_mut() = Weak::new();
    }
}

/// Factory and accessor for in-memory host nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryDom;

impl MemoryDom {
    pub fn new() -> Self {
        Self
    }

    /// Parse an HTML fragment into a detached host fragment.
    ///
    /// Markup is parsed as `<body>` content, with the error recovery a
    /// browser applies: implied end tags, stray closing tags ignored,
    /// lowercased names, named and numeric character references.
    pub fn parse_html(&self, markup: &str) -> MemoryNode {
        html::parse_html(self, markup)
    }

    /// Build an element with attributes and children in one call.
    pub fn element<'a>(
        &self,
        name: &str,
        attributes: impl IntoIterator<Item = (&'a str, &'a str)>,
        children: impl IntoIterator<Item = MemoryNode>,
    ) -> Result<MemoryNode, HostError> {
        let element = self.create_element(name);
        for (key, value) in attributes {
            self.set_attribute(&element, key, value)?;
        }
        for child in children {
            self.append_child(&element, &child);
        }
        Ok(element)
    }
}

/// Names a browser would reject with an invalid character error.
fn is_valid_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && !name.chars().any(|c| {
            c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '>' | '/' | '=' | '<')
        })
}

impl HostDom for MemoryDom {
    type Node = MemoryNode;
    type WeakNode = WeakMemoryNode;

    fn create_element(&self, name: &str) -> MemoryNode {
        MemoryNode::new(NodeKind::Element(SmolStr::new(name)), "")
    }

    fn create_text(&self, data: &str) -> MemoryNode {
        MemoryNode::new(NodeKind::Text, data)
    }

    fn create_comment(&self, data: &str) -> MemoryNode {
        MemoryNode::new(NodeKind::Comment, data)
    }

    fn create_fragment(&self) -> MemoryNode {
        MemoryNode::new(NodeKind::Fragment, "")
    }

    fn node_id(&self, node: &MemoryNode) -> HostNodeId {
        node.0.id
    }

    fn downgrade(&self, node: &MemoryNode) -> WeakMemoryNode {
        WeakMemoryNode(Rc::downgrade(&node.0))
    }

    fn upgrade(&self, weak: &WeakMemoryNode) -> Option<MemoryNode> {
        weak.0.upgrade().map(MemoryNode)
    }

    fn node_type(&self, node: &MemoryNode) -> HostNodeType {
        match node.0.kind {
            NodeKind::Element(_) => HostNodeType::Element,
            NodeKind::Text => HostNodeType::Text,
            NodeKind::Comment => HostNodeType::Comment,
            NodeKind::Fragment => HostNodeType::Fragment,
        }
    }

    fn node_name(&self, node: &MemoryNode) -> SmolStr {
        match &node.0.kind {
            NodeKind::Element(name) => name.clone(),
            _ => SmolStr::default(),
        }
    }

    fn parent(&self, node: &MemoryNode) -> Option<MemoryNode> {
        node.0.parent.borrow().upgrade().map(MemoryNode)
    }

    fn children(&self, node: &MemoryNode) -> Vec<MemoryNode> {
        node.0.children.borrow().clone()
    }

    fn insert_child(&self, parent: &MemoryNode, index: usize, child: &MemoryNode) {
        if self.contains(child, parent) {
            warn!(?parent, ?child, "refusing to insert a node into itself or its descendant");
            return;
        }
        let moved = match child.0.kind {
            NodeKind::Fragment => {
                let children = std::mem::take(&mut *child.0.children.borrow_mut());
                for node in &children {
                    *node.0.parent.borrow_mut() = Weak::new();
                }
                children
            }
            _ => {
                child.detach();
                vec![child.clone()]
            }
        };

        let mut children = parent.0.children.borrow_mut();
        let index = index.min(children.len());
        for (i, node) in moved.into_iter().enumerate() {
            *node.0.parent.borrow_mut() = Rc::downgrade(&parent.0);
            children.insert(index + i, node);
        }
    }

    fn remove(&self, node: &MemoryNode) {
        node.detach();
    }

    fn attribute_names(&self, node: &MemoryNode) -> Vec<SmolStr> {
        node.0
            .attributes
            .borrow()
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    fn attribute(&self, node: &MemoryNode, name: &str) -> Option<String> {
        node.0
            .attributes
            .borrow()
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    fn set_attribute(&self, node: &MemoryNode, name: &str, value: &str) -> Result<(), HostError> {
        if !is_valid_attribute_name(name) {
            return Err(HostError::InvalidAttributeName(SmolStr::new(name)));
        }
        let mut attributes = node.0.attributes.borrow_mut();
        match attributes.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some(slot) => slot.1 = value.to_string(),
            None => attributes.push((SmolStr::new(name), value.to_string())),
        }
        Ok(())
    }

    fn remove_attribute(&self, node: &MemoryNode, name: &str) {
        node.0
            .attributes
            .borrow_mut()
            .retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    fn text_data(&self, node: &MemoryNode) -> String {
        node.0.data.borrow().clone()
    }

    fn set_text_data(&self, node: &MemoryNode, data: &str) {
        *node.0.data.borrow_mut() = data.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_html_round_trip() {
        let dom = MemoryDom::new();
        let html = r#"<p class="a">foo <b>bar</b></p><!-- c --><img src="x.png"><p>baz</p>"#;
        let fragment = dom.parse_html(html);
        assert_eq!(dom.child_count(&fragment), 4);
        assert_eq!(dom.inner_html(&fragment), html);
    }

    #[test]
    fn test_parse_html_recovers() {
        let dom = MemoryDom::new();
        let fragment = dom.parse_html("<div><p>a</span>b</div>c<br/>d");
        insta::assert_snapshot!(dom.inner_html(&fragment), @"<div><p>ab</p></div>c<br>d");
    }

    #[test]
    fn test_parse_html_unquoted_and_bare_attributes() {
        let dom = MemoryDom::new();
        let fragment = dom.parse_html("<input type=checkbox checked>");
        let input = dom.first_child(&fragment).unwrap();
        assert_eq!(dom.attribute(&input, "type").as_deref(), Some("checkbox"));
        assert_eq!(dom.attribute(&input, "checked").as_deref(), Some(""));
    }

    #[test]
    fn test_insert_detaches_and_fragment_moves_children() {
        let dom = MemoryDom::new();
        let a = dom.create_element("div");
        let b = dom.create_element("div");
        let text = dom.create_text("x");
        dom.append_child(&a, &text);
        dom.append_child(&b, &text);
        assert_eq!(dom.child_count(&a), 0);
        assert_eq!(dom.parent(&text), Some(b.clone()));

        let fragment = dom.parse_html("<i></i><u></u>");
        dom.insert_child(&b, 0, &fragment);
        assert_eq!(dom.child_count(&fragment), 0);
        assert_eq!(dom.inner_html(&b), "<i></i><u></u>x");
    }

    #[test]
    fn test_insert_into_own_descendant_is_refused() {
        let dom = MemoryDom::new();
        let fragment = dom.parse_html("<div><p>x</p></div>");
        let div = dom.first_child(&fragment).unwrap();
        let p = dom.first_child(&div).unwrap();

        dom.append_child(&p, &div);
        dom.append_child(&div, &div);
        dom.append_child(&p, &fragment);
        assert_eq!(dom.parent(&div), Some(fragment.clone()));
        assert_eq!(dom.inner_html(&fragment), "<div><p>x</p></div>");
    }

    #[test]
    fn test_parse_html_drops_rejected_attributes() {
        let dom = MemoryDom::new();
        let fragment = dom.parse_html(r#"<p a"b="1" c="2">x</p>"#);
        let p = dom.first_child(&fragment).unwrap();
        assert_eq!(dom.attribute_names(&p), vec![SmolStr::new("c")]);
    }

    #[test]
    fn test_invalid_attribute_name() {
        let dom = MemoryDom::new();
        let div = dom.create_element("div");
        assert_eq!(
            dom.set_attribute(&div, "on click", "x"),
            Err(HostError::InvalidAttributeName("on click".into()))
        );
        assert!(dom.attribute_names(&div).is_empty());
    }

    #[test]
    fn test_weak_handles() {
        let dom = MemoryDom::new();
        let weak = {
            let node = dom.create_element("p");
            dom.downgrade(&node)
        };
        assert!(dom.upgrade(&weak).is_none());
    }

    #[test]
    fn test_element_builder() {
        let dom = MemoryDom::new();
        let p = dom
            .element("p", [("class", "x")], [dom.create_text("hi")])
            .unwrap();
        assert_eq!(dom.outer_html(&p), r#"<p class="x">hi</p>"#);
    }
}
