//! Narrow capability interface over a host document tree.
//!
//! The converter never touches a platform API directly. Everything it needs
//! from the host (creating nodes, walking children, reading and writing
//! attributes) goes through [`HostDom`], so it runs the same against a browser
//! document or the in-memory tree in [`crate::memory`].
//!
//! Text offsets inside host text nodes are character offsets.

use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use smol_str::SmolStr;

use crate::error::HostError;
use crate::html;

static NEXT_HOST_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique identity of a host node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostNodeId(u64);

impl HostNodeId {
    /// Allocate a fresh id. Host implementations call this once per node.
    pub fn next() -> Self {
        Self(NEXT_HOST_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HostNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostNodeType {
    Element,
    Text,
    Comment,
    Fragment,
}

/// Access to a host document.
///
/// Node handles are cheap to clone and compare by identity. Mutating methods
/// take `&self`: host documents are shared, externally mutable resources.
pub trait HostDom {
    type Node: Clone + PartialEq + fmt::Debug;
    type WeakNode: Clone;

    fn create_element(&self, name: &str) -> Self::Node;
    fn create_text(&self, data: &str) -> Self::Node;
    fn create_comment(&self, data: &str) -> Self::Node;
    fn create_fragment(&self) -> Self::Node;

    fn node_id(&self, node: &Self::Node) -> HostNodeId;
    fn downgrade(&self, node: &Self::Node) -> Self::WeakNode;
    fn upgrade(&self, weak: &Self::WeakNode) -> Option<Self::Node>;

    fn node_type(&self, node: &Self::Node) -> HostNodeType;
    /// Element tag name as created. Empty for non-elements.
    fn node_name(&self, node: &Self::Node) -> SmolStr;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;
    /// Insert `child` at `index`, detaching it from its current parent first.
    /// Inserting a fragment moves the fragment's children. Inserting a node
    /// into itself or one of its descendants is refused with a warning.
    fn insert_child(&self, parent: &Self::Node, index: usize, child: &Self::Node);
    /// Detach `node` from its parent. No-op for detached nodes.
    fn remove(&self, node: &Self::Node);

    /// Attribute names in document order.
    fn attribute_names(&self, node: &Self::Node) -> Vec<SmolStr>;
    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;
    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) -> Result<(), HostError>;
    fn remove_attribute(&self, node: &Self::Node, name: &str);

    /// Payload of a text or comment node. Empty for other nodes.
    fn text_data(&self, node: &Self::Node) -> String;
    fn set_text_data(&self, node: &Self::Node, data: &str);

    // --- provided ---

    fn is_element(&self, node: &Self::Node) -> bool {
        self.node_type(node) == HostNodeType::Element
    }

    fn is_text(&self, node: &Self::Node) -> bool {
        self.node_type(node) == HostNodeType::Text
    }

    fn is_comment(&self, node: &Self::Node) -> bool {
        self.node_type(node) == HostNodeType::Comment
    }

    fn is_fragment(&self, node: &Self::Node) -> bool {
        self.node_type(node) == HostNodeType::Fragment
    }

    /// Whether `node` is an element named `name`, ignoring ASCII case.
    fn is_element_named(&self, node: &Self::Node, name: &str) -> bool {
        self.is_element(node) && self.node_name(node).eq_ignore_ascii_case(name)
    }

    fn child_count(&self, node: &Self::Node) -> usize {
        self.children(node).len()
    }

    fn child(&self, node: &Self::Node, index: usize) -> Option<Self::Node> {
        self.children(node).into_iter().nth(index)
    }

    fn first_child(&self, node: &Self::Node) -> Option<Self::Node> {
        self.child(node, 0)
    }

    fn last_child(&self, node: &Self::Node) -> Option<Self::Node> {
        self.children(node).pop()
    }

    fn append_child(&self, parent: &Self::Node, child: &Self::Node) {
        let index = self.child_count(parent);
        self.insert_child(parent, index, child);
    }

    fn index_of(&self, node: &Self::Node) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(&parent).iter().position(|c| c == node)
    }

    fn previous_sibling(&self, node: &Self::Node) -> Option<Self::Node> {
        let parent = self.parent(node)?;
        let index = self.index_of(node)?;
        self.child(&parent, index.checked_sub(1)?)
    }

    fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node> {
        let parent = self.parent(node)?;
        let index = self.index_of(node)?;
        self.child(&parent, index + 1)
    }

    /// Ancestors of `node`, nearest first.
    fn ancestors(&self, node: &Self::Node) -> Vec<Self::Node> {
        let mut ancestors = Vec::new();
        let mut current = self.parent(node);
        while let Some(parent) = current {
            current = self.parent(&parent);
            ancestors.push(parent);
        }
        ancestors
    }

    /// Whether `node` is `ancestor` or lies inside it.
    fn contains(&self, ancestor: &Self::Node, node: &Self::Node) -> bool {
        node == ancestor || self.ancestors(node).iter().any(|a| a == ancestor)
    }

    /// Replace `old` with `new` at the same place in the tree.
    fn replace(&self, old: &Self::Node, new: &Self::Node) {
        let (Some(parent), Some(index)) = (self.parent(old), self.index_of(old)) else {
            return;
        };
        self.remove(old);
        self.insert_child(&parent, index, new);
    }

    /// Structural equality: same type, name, attributes, data and children.
    /// Element names compare ignoring ASCII case.
    fn is_equal_node(&self, a: &Self::Node, b: &Self::Node) -> bool {
        if self.node_type(a) != self.node_type(b) {
            return false;
        }
        match self.node_type(a) {
            HostNodeType::Text | HostNodeType::Comment => self.text_data(a) == self.text_data(b),
            HostNodeType::Element | HostNodeType::Fragment => {
                if !self.node_name(a).eq_ignore_ascii_case(&self.node_name(b)) {
                    return false;
                }
                let names = self.attribute_names(a);
                if names.len() != self.attribute_names(b).len()
                    || names
                        .iter()
                        .any(|name| self.attribute(a, name) != self.attribute(b, name))
                {
                    return false;
                }
                let (left, right) = (self.children(a), self.children(b));
                left.len() == right.len()
                    && left
                        .iter()
                        .zip(&right)
                        .all(|(l, r)| self.is_equal_node(l, r))
            }
        }
    }

    /// Serialized children of `node`.
    fn inner_html(&self, node: &Self::Node) -> String {
        html::inner_html(self, node)
    }

    /// Serialized `node` including its own tag.
    fn outer_html(&self, node: &Self::Node) -> String {
        html::outer_html(self, node)
    }

    /// Document order of two positions. `None` when they are in different trees.
    fn compare_positions(
        &self,
        a: &HostPosition<Self::Node>,
        b: &HostPosition<Self::Node>,
    ) -> Option<Ordering> {
        let (root_a, path_a) = self.position_path(a);
        let (root_b, path_b) = self.position_path(b);
        if root_a != root_b {
            return None;
        }
        Some(path_a.cmp(&path_b))
    }

    /// Root of the position's tree and the index path leading to it.
    #[doc(hidden)]
    fn position_path(&self, position: &HostPosition<Self::Node>) -> (Self::Node, Vec<usize>) {
        let mut path = vec![position.offset];
        let mut node = position.parent.clone();
        while let Some(parent) = self.parent(&node) {
            path.push(self.index_of(&node).unwrap_or(0));
            node = parent;
        }
        path.reverse();
        (node, path)
    }

    /// Selection from `anchor` to `focus` with its single range in document order.
    fn selection_between(
        &self,
        anchor: HostPosition<Self::Node>,
        focus: HostPosition<Self::Node>,
    ) -> HostSelection<Self::Node> {
        let range = match self.compare_positions(&anchor, &focus) {
            Some(Ordering::Greater) => HostRange::new(focus.clone(), anchor.clone()),
            _ => HostRange::new(anchor.clone(), focus.clone()),
        };
        HostSelection {
            anchor: Some(anchor),
            focus: Some(focus),
            ranges: vec![range],
        }
    }
}

/// A place inside a host node: between children, or between characters of text.
#[derive(Debug, Clone, PartialEq)]
pub struct HostPosition<N> {
    pub parent: N,
    pub offset: usize,
}

impl<N> HostPosition<N> {
    pub fn new(parent: N, offset: usize) -> Self {
        Self { parent, offset }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostRange<N> {
    pub start: HostPosition<N>,
    pub end: HostPosition<N>,
}

impl<N: PartialEq> HostRange<N> {
    pub fn new(start: HostPosition<N>, end: HostPosition<N>) -> Self {
        Self { start, end }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Snapshot of a host selection.
///
/// `anchor` and `focus` keep the direction the user made the selection in;
/// `ranges` are always in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct HostSelection<N> {
    pub anchor: Option<HostPosition<N>>,
    pub focus: Option<HostPosition<N>>,
    pub ranges: Vec<HostRange<N>>,
}

impl<N: Clone + PartialEq> HostSelection<N> {
    pub fn empty() -> Self {
        Self {
            anchor: None,
            focus: None,
            ranges: Vec::new(),
        }
    }

    pub fn collapsed(position: HostPosition<N>) -> Self {
        Self {
            anchor: Some(position.clone()),
            focus: Some(position.clone()),
            ranges: vec![HostRange::new(position.clone(), position)],
        }
    }

    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_collapsed(&self) -> bool {
        self.ranges.iter().all(HostRange::is_collapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDom;

    #[test]
    fn test_outer_html_escapes_and_skips_void_close() {
        let dom = MemoryDom::new();
        let p = dom.create_element("p");
        dom.set_attribute(&p, "title", "a\"b").unwrap();
        dom.append_child(&p, &dom.create_text("x<y\u{00A0}"));
        dom.append_child(&p, &dom.create_element("br"));
        dom.append_child(&p, &dom.create_comment(" c "));
        insta::assert_snapshot!(dom.outer_html(&p), @r#"<p title="a&quot;b">x&lt;y&nbsp;<br><!-- c --></p>"#);
    }

    #[test]
    fn test_compare_positions_in_document_order() {
        let dom = MemoryDom::new();
        let root = dom.parse_html("<p>foo</p><p>bar</p>");
        let first = dom.child(&root, 0).unwrap();
        let text = dom.first_child(&first).unwrap();

        let before_text = HostPosition::new(first.clone(), 0);
        let in_text = HostPosition::new(text.clone(), 2);
        let after_first = HostPosition::new(root.clone(), 1);

        assert_eq!(dom.compare_positions(&before_text, &in_text), Some(Ordering::Less));
        assert_eq!(dom.compare_positions(&after_first, &in_text), Some(Ordering::Greater));
        assert_eq!(dom.compare_positions(&in_text, &in_text), Some(Ordering::Equal));

        let other = dom.create_element("div");
        assert_eq!(
            dom.compare_positions(&in_text, &HostPosition::new(other, 0)),
            None
        );
    }

    #[test]
    fn test_selection_between_orders_range() {
        let dom = MemoryDom::new();
        let root = dom.parse_html("<p>foobar</p>");
        let text = dom.first_child(&dom.first_child(&root).unwrap()).unwrap();
        let selection = dom.selection_between(
            HostPosition::new(text.clone(), 4),
            HostPosition::new(text.clone(), 1),
        );
        assert_eq!(selection.ranges[0].start.offset, 1);
        assert_eq!(selection.anchor.as_ref().unwrap().offset, 4);
    }

    #[test]
    fn test_structural_equality() {
        let dom = MemoryDom::new();
        let a = dom.parse_html(r#"<span data-x="1">&nbsp;</span>"#);
        let b = dom.parse_html(r#"<span data-x="1">&nbsp;</span>"#);
        let c = dom.parse_html(r#"<span data-x="2">&nbsp;</span>"#);
        assert_ne!(a, b);
        assert!(dom.is_equal_node(&a, &b));
        assert!(!dom.is_equal_node(&a, &c));
    }

    #[test]
    fn test_structural_equality_ignores_name_case() {
        let dom = MemoryDom::new();
        let upper = dom.create_element("BR");
        let lower = dom.create_element("br");
        assert!(dom.is_equal_node(&upper, &lower));
        assert!(!dom.is_equal_node(&upper, &dom.create_element("hr")));
    }
}
