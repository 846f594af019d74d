//! View tree nodes.
//!
//! The view tree is the platform-independent mirror of what the editor shows.
//! Nodes are reference-counted handles: cloning a handle never clones the node,
//! and equality between handles is identity. Parents are held weakly, so a
//! detached subtree is freed as soon as nobody holds on to it.
//!
//! Text nodes carry no binding identity of their own. Converters locate them
//! through their siblings and parent, never through side tables.

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use smol_str::SmolStr;

use crate::filler_offset::default_filler_offset;
use crate::render::{RenderFn, RenderWriter};

/// Custom property holding verbatim markup captured from the host.
pub const RAW_CONTENT_PROPERTY: &str = "$rawContent";

/// Name of the UI element that stands in for a host comment.
pub const COMMENT_ELEMENT_NAME: &str = "$comment";

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique identity of a view node.
///
/// Ids are never reused, so they are safe keys for side tables that must not
/// keep the node alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewNodeId(u64);

impl ViewNodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ViewNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// What an element means to the converters.
///
/// Every converter branch matches on this exhaustively, so a new kind shows up
/// as a compile error rather than a silent fallthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ElementKind {
    /// Plain element with no rendering semantics, as produced by reverse conversion.
    #[default]
    Element,
    /// Block-level element (paragraph, heading, list item).
    Container,
    /// Inline formatting wrapper (bold, link).
    Attribute,
    /// Element that never has children (image, horizontal rule).
    Empty,
    /// Opaque render element. Host content comes from a render callback and is
    /// never read back.
    Ui,
    /// Transparent-raw render element. Host content comes from a render callback
    /// and is read back verbatim into [`RAW_CONTENT_PROPERTY`].
    Raw,
    /// Editable root or nested editable. Behaves like a container.
    Editable,
}

impl ElementKind {
    /// Type prefix used by the dev notation (`<container:p>`).
    pub fn notation_type(self) -> Option<&'static str> {
        match self {
            ElementKind::Container => Some("container"),
            ElementKind::Attribute => Some("attribute"),
            ElementKind::Empty => Some("empty"),
            ElementKind::Ui => Some("ui"),
            ElementKind::Raw => Some("raw"),
            ElementKind::Element | ElementKind::Editable => None,
        }
    }

    pub fn from_notation_type(prefix: &str) -> Option<Self> {
        match prefix {
            "container" => Some(ElementKind::Container),
            "attribute" => Some(ElementKind::Attribute),
            "empty" => Some(ElementKind::Empty),
            "ui" => Some(ElementKind::Ui),
            "raw" => Some(ElementKind::Raw),
            _ => None,
        }
    }

    /// Whether host content for this kind is produced by a render callback.
    pub fn is_opaque_render(self) -> bool {
        matches!(self, ElementKind::Ui | ElementKind::Raw)
    }

    /// Whether this kind acts as a block boundary.
    pub fn is_container(self) -> bool {
        matches!(self, ElementKind::Container | ElementKind::Editable)
    }

    pub fn allows_children(self) -> bool {
        match self {
            ElementKind::Element
            | ElementKind::Container
            | ElementKind::Attribute
            | ElementKind::Editable => true,
            ElementKind::Empty | ElementKind::Ui | ElementKind::Raw => false,
        }
    }
}

/// Structural errors when mutating the view tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("`{name}` is a {kind:?} element and cannot contain children")]
    ChildrenNotAllowed { name: SmolStr, kind: ElementKind },
    #[error("a node cannot be inserted into itself or its own descendant")]
    InsertIntoDescendant,
}

/// Hook overriding where a block filler goes inside an element.
pub type FillerOffsetFn = Rc<dyn Fn(&ViewElement) -> Option<usize>>;

#[derive(Default, Clone)]
enum ParentLink {
    #[default]
    Detached,
    Element(Weak<ElementData>),
    Fragment(Weak<FragmentData>),
}

impl ParentLink {
    fn upgrade(&self) -> Option<ViewParent> {
        match self {
            ParentLink::Detached => None,
            ParentLink::Element(weak) => weak
                .upgrade()
                .map(|data| ViewParent::Element(ViewElement(data))),
            ParentLink::Fragment(weak) => weak
                .upgrade()
                .map(|data| ViewParent::Fragment(ViewFragment(data))),
        }
    }
}

struct TextData {
    id: ViewNodeId,
    data: RefCell<SmolStr>,
    parent: RefCell<ParentLink>,
}

struct ElementData {
    id: ViewNodeId,
    name: SmolStr,
    kind: ElementKind,
    attributes: RefCell<Vec<(SmolStr, String)>>,
    children: RefCell<Vec<ViewNode>>,
    parent: RefCell<ParentLink>,
    custom_properties: RefCell<Vec<(SmolStr, String)>>,
    render: RefCell<Option<RenderFn>>,
    filler_offset: RefCell<Option<FillerOffsetFn>>,
    unsafe_attributes_to_render: RefCell<Vec<SmolStr>>,
}

struct FragmentData {
    id: ViewNodeId,
    children: RefCell<Vec<ViewNode>>,
}

/// Text node handle.
#[derive(Clone)]
pub struct ViewText(Rc<TextData>);

/// Element handle.
#[derive(Clone)]
pub struct ViewElement(Rc<ElementData>);

/// Document fragment handle: an ordered list of top-level nodes.
#[derive(Clone)]
pub struct ViewFragment(Rc<FragmentData>);

/// Any node of the view tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewNode {
    Text(ViewText),
    Element(ViewElement),
    Fragment(ViewFragment),
}

/// A node that can hold children.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewParent {
    Element(ViewElement),
    Fragment(ViewFragment),
}

/// Weak handle to an element or fragment, used by binding tables.
#[derive(Clone)]
pub struct WeakViewParent(ParentLink);

impl WeakViewParent {
    pub fn upgrade(&self) -> Option<ViewParent> {
        self.0.upgrade()
    }
}

impl fmt::Debug for WeakViewParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(parent) => write!(f, "Weak({parent:?})"),
            None => f.write_str("Weak(<dropped>)"),
        }
    }
}

// === ViewText ===

impl ViewText {
    pub fn new(data: impl Into<SmolStr>) -> Self {
        Self(Rc::new(TextData {
            id: ViewNodeId::next(),
            data: RefCell::new(data.into()),
            parent: RefCell::new(ParentLink::Detached),
        }))
    }

    pub fn id(&self) -> ViewNodeId {
        self.0.id
    }

    pub fn data(&self) -> SmolStr {
        self.0.data.borrow().clone()
    }

    /// Replace the text payload.
    ///
    /// Converters and fixture parsers rewrite text in place while they still
    /// hold positions pointing at the node.
    pub fn set_data(&self, data: impl Into<SmolStr>) {
        *self.0.data.borrow_mut() = data.into();
    }

    /// Length in characters. Text offsets are character offsets.
    pub fn char_len(&self) -> usize {
        self.0.data.borrow().chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.data.borrow().is_empty()
    }

    pub fn parent(&self) -> Option<ViewParent> {
        self.0.parent.borrow().upgrade()
    }

    pub fn as_node(&self) -> ViewNode {
        ViewNode::Text(self.clone())
    }
}

impl PartialEq for ViewText {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ViewText {}

impl Hash for ViewText {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for ViewText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewText({:?})", self.0.data.borrow().as_str())
    }
}

// === ViewElement ===

impl ViewElement {
    /// Create a plain element.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self::with_kind(ElementKind::Element, name)
    }

    pub fn with_kind(kind: ElementKind, name: impl Into<SmolStr>) -> Self {
        Self(Rc::new(ElementData {
            id: ViewNodeId::next(),
            name: name.into(),
            kind,
            attributes: RefCell::new(Vec::new()),
            children: RefCell::new(Vec::new()),
            parent: RefCell::new(ParentLink::Detached),
            custom_properties: RefCell::new(Vec::new()),
            render: RefCell::new(None),
            filler_offset: RefCell::new(None),
            unsafe_attributes_to_render: RefCell::new(Vec::new()),
        }))
    }

    pub fn container(name: impl Into<SmolStr>) -> Self {
        Self::with_kind(ElementKind::Container, name)
    }

    pub fn attribute_element(name: impl Into<SmolStr>) -> Self {
        Self::with_kind(ElementKind::Attribute, name)
    }

    pub fn empty(name: impl Into<SmolStr>) -> Self {
        Self::with_kind(ElementKind::Empty, name)
    }

    pub fn editable(name: impl Into<SmolStr>) -> Self {
        Self::with_kind(ElementKind::Editable, name)
    }

    /// Opaque render element whose host content is written by `render`.
    pub fn ui(
        name: impl Into<SmolStr>,
        render: impl Fn(&mut dyn RenderWriter) + 'static,
    ) -> Self {
        let element = Self::with_kind(ElementKind::Ui, name);
        element.set_render(render);
        element
    }

    /// Transparent-raw render element whose host content is written by `render`.
    pub fn raw(
        name: impl Into<SmolStr>,
        render: impl Fn(&mut dyn RenderWriter) + 'static,
    ) -> Self {
        let element = Self::with_kind(ElementKind::Raw, name);
        element.set_render(render);
        element
    }

    /// UI element standing in for a host comment.
    pub fn comment(data: impl Into<String>) -> Self {
        let element = Self::with_kind(ElementKind::Ui, COMMENT_ELEMENT_NAME);
        element.set_custom_property(RAW_CONTENT_PROPERTY, data);
        element
    }

    /// Builder form of [`ViewElement::set_attribute`].
    pub fn with_attribute(self, key: impl Into<SmolStr>, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// Builder that appends `children` in order.
    pub fn with_children<I, N>(self, children: I) -> Result<Self, TreeError>
    where
        I: IntoIterator<Item = N>,
        N: Into<ViewNode>,
    {
        for child in children {
            self.append_child(child)?;
        }
        Ok(self)
    }

    pub fn id(&self) -> ViewNodeId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> ElementKind {
        self.0.kind
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.0.name == name
    }

    pub fn is_comment(&self) -> bool {
        self.0.kind == ElementKind::Ui && self.0.name == COMMENT_ELEMENT_NAME
    }

    // --- attributes ---

    pub fn attribute(&self, key: &str) -> Option<String> {
        self.0
            .attributes
            .borrow()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.0.attributes.borrow().iter().any(|(k, _)| k == key)
    }

    /// Attribute keys in insertion order.
    pub fn attribute_keys(&self) -> Vec<SmolStr> {
        self.0
            .attributes
            .borrow()
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn attributes(&self) -> Vec<(SmolStr, String)> {
        self.0.attributes.borrow().clone()
    }

    /// Set an attribute. An existing key keeps its place in the order.
    pub fn set_attribute(&self, key: impl Into<SmolStr>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        let mut attributes = self.0.attributes.borrow_mut();
        match attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => attributes.push((key, value)),
        }
    }

    pub fn remove_attribute(&self, key: &str) -> Option<String> {
        let mut attributes = self.0.attributes.borrow_mut();
        let index = attributes.iter().position(|(k, _)| k == key)?;
        Some(attributes.remove(index).1)
    }

    /// Class names from the `class` attribute.
    pub fn class_names(&self) -> Vec<SmolStr> {
        self.attribute("class")
            .map(|classes| classes.split_whitespace().map(SmolStr::new).collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class_name: &str) -> bool {
        self.attribute("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class_name))
    }

    /// Let the host render `key` on this element even when it looks unsafe.
    pub fn allow_unsafe_attribute(&self, key: impl Into<SmolStr>) {
        let key = key.into();
        let mut allowed = self.0.unsafe_attributes_to_render.borrow_mut();
        if !allowed.contains(&key) {
            allowed.push(key);
        }
    }

    pub fn should_render_unsafe_attribute(&self, key: &str) -> bool {
        self.0
            .unsafe_attributes_to_render
            .borrow()
            .iter()
            .any(|k| k == key)
    }

    // --- custom properties ---

    pub fn custom_property(&self, key: &str) -> Option<String> {
        self.0
            .custom_properties
            .borrow()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    pub fn set_custom_property(&self, key: impl Into<SmolStr>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        let mut properties = self.0.custom_properties.borrow_mut();
        match properties.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => properties.push((key, value)),
        }
    }

    /// Verbatim host markup captured for this element, if any.
    pub fn raw_content(&self) -> Option<String> {
        self.custom_property(RAW_CONTENT_PROPERTY)
    }

    // --- render hooks ---

    pub fn render_fn(&self) -> Option<RenderFn> {
        self.0.render.borrow().clone()
    }

    pub fn set_render(&self, render: impl Fn(&mut dyn RenderWriter) + 'static) {
        *self.0.render.borrow_mut() = Some(Rc::new(render));
    }

    /// Offset at which a block filler must be rendered, if the element needs one.
    pub fn filler_offset(&self) -> Option<usize> {
        let hook = self.0.filler_offset.borrow().clone();
        match hook {
            Some(hook) => hook(self),
            None => default_filler_offset(self),
        }
    }

    pub fn set_filler_offset_hook(&self, hook: impl Fn(&ViewElement) -> Option<usize> + 'static) {
        *self.0.filler_offset.borrow_mut() = Some(Rc::new(hook));
    }

    // --- tree ---

    pub fn parent(&self) -> Option<ViewParent> {
        self.0.parent.borrow().upgrade()
    }

    pub fn index(&self) -> Option<usize> {
        self.as_node().index()
    }

    pub fn as_node(&self) -> ViewNode {
        ViewNode::Element(self.clone())
    }

    pub fn as_parent(&self) -> ViewParent {
        ViewParent::Element(self.clone())
    }

    pub fn children(&self) -> Vec<ViewNode> {
        self.0.children.borrow().clone()
    }

    pub fn child_count(&self) -> usize {
        self.0.children.borrow().len()
    }

    pub fn child(&self, index: usize) -> Option<ViewNode> {
        self.0.children.borrow().get(index).cloned()
    }

    pub fn append_child(&self, node: impl Into<ViewNode>) -> Result<(), TreeError> {
        self.as_parent().append_child(node)
    }

    pub fn insert_child(&self, index: usize, node: impl Into<ViewNode>) -> Result<(), TreeError> {
        self.as_parent().insert_child(index, node)
    }

    pub fn remove_children(&self, index: usize, count: usize) -> Vec<ViewNode> {
        self.as_parent().remove_children(index, count)
    }
}

impl PartialEq for ViewElement {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ViewElement {}

impl Hash for ViewElement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for ViewElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.kind.notation_type() {
            Some(kind) => write!(f, "ViewElement({kind}:{}#{})", self.0.name, self.0.id),
            None => write!(f, "ViewElement({}#{})", self.0.name, self.0.id),
        }
    }
}

// === ViewFragment ===

impl ViewFragment {
    pub fn new() -> Self {
        Self(Rc::new(FragmentData {
            id: ViewNodeId::next(),
            children: RefCell::new(Vec::new()),
        }))
    }

    pub fn with_children<I, N>(self, children: I) -> Result<Self, TreeError>
    where
        I: IntoIterator<Item = N>,
        N: Into<ViewNode>,
    {
        for child in children {
            self.append_child(child)?;
        }
        Ok(self)
    }

    pub fn id(&self) -> ViewNodeId {
        self.0.id
    }

    pub fn as_node(&self) -> ViewNode {
        ViewNode::Fragment(self.clone())
    }

    pub fn as_parent(&self) -> ViewParent {
        ViewParent::Fragment(self.clone())
    }

    pub fn children(&self) -> Vec<ViewNode> {
        self.0.children.borrow().clone()
    }

    pub fn child_count(&self) -> usize {
        self.0.children.borrow().len()
    }

    pub fn child(&self, index: usize) -> Option<ViewNode> {
        self.0.children.borrow().get(index).cloned()
    }

    pub fn append_child(&self, node: impl Into<ViewNode>) -> Result<(), TreeError> {
        self.as_parent().append_child(node)
    }

    pub fn insert_child(&self, index: usize, node: impl Into<ViewNode>) -> Result<(), TreeError> {
        self.as_parent().insert_child(index, node)
    }

    pub fn remove_children(&self, index: usize, count: usize) -> Vec<ViewNode> {
        self.as_parent().remove_children(index, count)
    }
}

impl Default for ViewFragment {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ViewFragment {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ViewFragment {}

impl Hash for ViewFragment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for ViewFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewFragment(#{})", self.0.id)
    }
}

// === ViewParent ===

impl ViewParent {
    fn children_cell(&self) -> &RefCell<Vec<ViewNode>> {
        match self {
            ViewParent::Element(element) => &element.0.children,
            ViewParent::Fragment(fragment) => &fragment.0.children,
        }
    }

    fn link(&self) -> ParentLink {
        match self {
            ViewParent::Element(element) => ParentLink::Element(Rc::downgrade(&element.0)),
            ViewParent::Fragment(fragment) => ParentLink::Fragment(Rc::downgrade(&fragment.0)),
        }
    }

    pub fn id(&self) -> ViewNodeId {
        match self {
            ViewParent::Element(element) => element.id(),
            ViewParent::Fragment(fragment) => fragment.id(),
        }
    }

    pub fn as_node(&self) -> ViewNode {
        match self {
            ViewParent::Element(element) => ViewNode::Element(element.clone()),
            ViewParent::Fragment(fragment) => ViewNode::Fragment(fragment.clone()),
        }
    }

    pub fn as_element(&self) -> Option<&ViewElement> {
        match self {
            ViewParent::Element(element) => Some(element),
            ViewParent::Fragment(_) => None,
        }
    }

    pub fn parent(&self) -> Option<ViewParent> {
        match self {
            ViewParent::Element(element) => element.parent(),
            ViewParent::Fragment(_) => None,
        }
    }

    pub fn downgrade(&self) -> WeakViewParent {
        WeakViewParent(self.link())
    }

    pub fn children(&self) -> Vec<ViewNode> {
        self.children_cell().borrow().clone()
    }

    pub fn child_count(&self) -> usize {
        self.children_cell().borrow().len()
    }

    pub fn child(&self, index: usize) -> Option<ViewNode> {
        self.children_cell().borrow().get(index).cloned()
    }

    /// Index of `node` among the children, compared by identity.
    pub fn index_of(&self, node: &ViewNode) -> Option<usize> {
        self.children_cell().borrow().iter().position(|c| c == node)
    }

    pub fn append_child(&self, node: impl Into<ViewNode>) -> Result<(), TreeError> {
        let index = self.child_count();
        self.insert_child(index, node)
    }

    /// Insert `node` at `index`, detaching it from its previous parent first.
    ///
    /// Inserting a fragment moves the fragment's children instead. A node
    /// cannot go into itself or anything below it.
    pub fn insert_child(&self, index: usize, node: impl Into<ViewNode>) -> Result<(), TreeError> {
        if let ViewParent::Element(element) = self {
            if !element.kind().allows_children() {
                return Err(TreeError::ChildrenNotAllowed {
                    name: element.0.name.clone(),
                    kind: element.kind(),
                });
            }
        }

        let node = node.into();
        if let Some(inserted) = node.as_parent() {
            if *self == inserted || self.as_node().ancestors().any(|a| a == inserted) {
                return Err(TreeError::InsertIntoDescendant);
            }
        }

        let nodes = match node {
            ViewNode::Fragment(fragment) => fragment.remove_children(0, fragment.child_count()),
            other => {
                other.remove();
                vec![other]
            }
        };

        let link = self.link();
        let mut children = self.children_cell().borrow_mut();
        let index = index.min(children.len());
        for (i, node) in nodes.into_iter().enumerate() {
            node.set_parent_link(link.clone());
            children.insert(index + i, node);
        }
        Ok(())
    }

    /// Remove up to `count` children starting at `index` and return them detached.
    pub fn remove_children(&self, index: usize, count: usize) -> Vec<ViewNode> {
        let removed: Vec<ViewNode> = {
            let mut children = self.children_cell().borrow_mut();
            let end = index.saturating_add(count).min(children.len());
            if index >= end {
                return Vec::new();
            }
            children.drain(index..end).collect()
        };
        for node in &removed {
            node.set_parent_link(ParentLink::Detached);
        }
        removed
    }
}

// === ViewNode ===

impl ViewNode {
    pub fn id(&self) -> ViewNodeId {
        match self {
            ViewNode::Text(text) => text.id(),
            ViewNode::Element(element) => element.id(),
            ViewNode::Fragment(fragment) => fragment.id(),
        }
    }

    pub fn as_text(&self) -> Option<&ViewText> {
        match self {
            ViewNode::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<&ViewElement> {
        match self {
            ViewNode::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_fragment(&self) -> Option<&ViewFragment> {
        match self {
            ViewNode::Fragment(fragment) => Some(fragment),
            _ => None,
        }
    }

    /// The node as a parent, when it can hold children.
    pub fn as_parent(&self) -> Option<ViewParent> {
        match self {
            ViewNode::Text(_) => None,
            ViewNode::Element(element) => Some(ViewParent::Element(element.clone())),
            ViewNode::Fragment(fragment) => Some(ViewParent::Fragment(fragment.clone())),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ViewNode::Text(_))
    }

    /// Whether this is an element with the given name.
    pub fn is_element_named(&self, name: &str) -> bool {
        matches!(self, ViewNode::Element(element) if element.is_named(name))
    }

    pub fn is_ui_element(&self) -> bool {
        matches!(self, ViewNode::Element(element) if element.kind() == ElementKind::Ui)
    }

    pub fn parent(&self) -> Option<ViewParent> {
        match self {
            ViewNode::Text(text) => text.parent(),
            ViewNode::Element(element) => element.parent(),
            ViewNode::Fragment(_) => None,
        }
    }

    pub fn index(&self) -> Option<usize> {
        self.parent()?.index_of(self)
    }

    pub fn previous_sibling(&self) -> Option<ViewNode> {
        let parent = self.parent()?;
        let index = parent.index_of(self)?;
        parent.child(index.checked_sub(1)?)
    }

    pub fn next_sibling(&self) -> Option<ViewNode> {
        let parent = self.parent()?;
        let index = parent.index_of(self)?;
        parent.child(index + 1)
    }

    /// Detach the node from its parent. No-op for detached nodes.
    pub fn remove(&self) {
        let Some(parent) = self.parent() else {
            return;
        };
        if let Some(index) = parent.index_of(self) {
            parent.remove_children(index, 1);
        }
    }

    /// Ancestors, nearest first.
    pub fn ancestors(&self) -> Ancestors {
        Ancestors {
            next: self.parent(),
        }
    }

    fn set_parent_link(&self, link: ParentLink) {
        match self {
            ViewNode::Text(text) => *text.0.parent.borrow_mut() = link,
            ViewNode::Element(element) => *element.0.parent.borrow_mut() = link,
            ViewNode::Fragment(_) => {}
        }
    }
}

/// Iterator over the ancestors of a node, nearest first.
pub struct Ancestors {
    next: Option<ViewParent>,
}

impl Iterator for Ancestors {
    type Item = ViewParent;

    fn next(&mut self) -> Option<ViewParent> {
        let current = self.next.take()?;
        self.next = current.parent();
        Some(current)
    }
}

impl From<ViewText> for ViewNode {
    fn from(text: ViewText) -> Self {
        ViewNode::Text(text)
    }
}

impl From<ViewElement> for ViewNode {
    fn from(element: ViewElement) -> Self {
        ViewNode::Element(element)
    }
}

impl From<ViewFragment> for ViewNode {
    fn from(fragment: ViewFragment) -> Self {
        ViewNode::Fragment(fragment)
    }
}

impl From<ViewParent> for ViewNode {
    fn from(parent: ViewParent) -> Self {
        parent.as_node()
    }
}

impl From<&str> for ViewNode {
    fn from(data: &str) -> Self {
        ViewNode::Text(ViewText::new(data))
    }
}

impl From<ViewElement> for ViewParent {
    fn from(element: ViewElement) -> Self {
        ViewParent::Element(element)
    }
}

impl From<ViewFragment> for ViewParent {
    fn from(fragment: ViewFragment) -> Self {
        ViewParent::Fragment(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_sets_parent_and_index() {
        let p = ViewElement::container("p");
        let text = ViewText::new("foo");
        let b = ViewElement::attribute_element("b");
        p.append_child(text.clone()).unwrap();
        p.append_child(b.clone()).unwrap();

        assert_eq!(text.parent(), Some(p.as_parent()));
        assert_eq!(b.index(), Some(1));
        assert_eq!(text.as_node().next_sibling(), Some(b.as_node()));
        assert_eq!(b.as_node().previous_sibling(), Some(text.as_node()));
    }

    #[test]
    fn test_reparenting_detaches_from_old_parent() {
        let first = ViewElement::container("p");
        let second = ViewElement::container("p");
        let text = ViewText::new("foo");
        first.append_child(text.clone()).unwrap();
        second.append_child(text.clone()).unwrap();

        assert_eq!(first.child_count(), 0);
        assert_eq!(second.child_count(), 1);
        assert_eq!(text.parent(), Some(second.as_parent()));
    }

    #[test]
    fn test_inserting_fragment_moves_its_children() {
        let fragment = ViewFragment::new()
            .with_children(["a", "b"])
            .unwrap();
        let p = ViewElement::container("p").with_children(["x"]).unwrap();
        p.insert_child(0, fragment.clone()).unwrap();

        assert_eq!(fragment.child_count(), 0);
        let data: Vec<_> = p
            .children()
            .iter()
            .filter_map(|c| c.as_text().map(|t| t.data()))
            .collect();
        assert_eq!(data, ["a", "b", "x"]);
    }

    #[test]
    fn test_empty_and_ui_elements_reject_children() {
        let img = ViewElement::empty("img");
        let err = img.append_child("x").unwrap_err();
        assert_eq!(
            err,
            TreeError::ChildrenNotAllowed {
                name: "img".into(),
                kind: ElementKind::Empty
            }
        );
        assert!(ViewElement::ui("span", |_| {}).append_child("x").is_err());
    }

    #[test]
    fn test_insert_into_own_descendant_is_rejected() {
        let outer = ViewElement::container("div");
        let inner = ViewElement::attribute_element("b");
        outer.append_child(inner.clone()).unwrap();

        assert_eq!(outer.append_child(outer.clone()), Err(TreeError::InsertIntoDescendant));
        assert_eq!(inner.insert_child(0, outer.clone()), Err(TreeError::InsertIntoDescendant));
        assert_eq!(inner.parent(), Some(outer.as_parent()));
        assert_eq!(outer.parent(), None);

        let fragment = ViewFragment::new();
        fragment.append_child(outer.clone()).unwrap();
        assert_eq!(inner.append_child(fragment.clone()), Err(TreeError::InsertIntoDescendant));
        assert_eq!(fragment.insert_child(0, fragment.clone()), Err(TreeError::InsertIntoDescendant));
        assert_eq!(fragment.child_count(), 1);

        // Moving a node under a sibling is fine.
        let sibling = ViewElement::attribute_element("i");
        outer.append_child(sibling.clone()).unwrap();
        sibling.append_child(inner.clone()).unwrap();
        assert_eq!(inner.parent(), Some(sibling.as_parent()));
    }

    #[test]
    fn test_opaque_render_kinds() {
        let opaque: Vec<_> = [
            ElementKind::Element,
            ElementKind::Container,
            ElementKind::Attribute,
            ElementKind::Empty,
            ElementKind::Ui,
            ElementKind::Raw,
            ElementKind::Editable,
        ]
        .into_iter()
        .filter(|kind| kind.is_opaque_render())
        .collect();
        assert_eq!(opaque, [ElementKind::Ui, ElementKind::Raw]);
    }

    #[test]
    fn test_attributes_keep_insertion_order() {
        let el = ViewElement::new("a")
            .with_attribute("href", "x")
            .with_attribute("class", "foo bar");
        el.set_attribute("href", "y");

        assert_eq!(el.attribute_keys(), ["href", "class"]);
        assert_eq!(el.attribute("href").as_deref(), Some("y"));
        assert_eq!(el.class_names(), ["foo", "bar"]);
        assert!(el.has_class("bar"));
        assert_eq!(el.remove_attribute("href").as_deref(), Some("y"));
        assert!(!el.has_attribute("href"));
    }

    #[test]
    fn test_equality_is_identity() {
        let a = ViewText::new("same");
        let b = ViewText::new("same");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_parent_link_is_weak() {
        let text = ViewText::new("orphan");
        {
            let p = ViewElement::container("p");
            p.append_child(text.clone()).unwrap();
            assert!(text.parent().is_some());
        }
        assert!(text.parent().is_none());
    }

    #[test]
    fn test_ancestors_are_nearest_first() {
        let fragment = ViewFragment::new();
        let p = ViewElement::container("p");
        let b = ViewElement::attribute_element("b");
        let text = ViewText::new("x");
        fragment.append_child(p.clone()).unwrap();
        p.append_child(b.clone()).unwrap();
        b.append_child(text.clone()).unwrap();

        let ancestors: Vec<_> = text.as_node().ancestors().collect();
        assert_eq!(
            ancestors,
            [b.as_parent(), p.as_parent(), fragment.as_parent()]
        );
    }

    #[test]
    fn test_comment_element() {
        let comment = ViewElement::comment(" note ");
        assert!(comment.is_comment());
        assert_eq!(comment.raw_content().as_deref(), Some(" note "));
    }
}
