//! Positions, ranges and selections in the view tree.
//!
//! A position is a parent node plus an offset. In an element or fragment the
//! offset counts children; in a text node it counts characters.

use std::fmt;

use crate::node::{ViewNode, ViewParent};

/// A place between two children of a node, or between two characters of a text.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ViewPosition {
    parent: ViewNode,
    offset: usize,
}

impl ViewPosition {
    pub fn new(parent: impl Into<ViewNode>, offset: usize) -> Self {
        Self {
            parent: parent.into(),
            offset,
        }
    }

    /// Position directly before `node`. `None` for detached nodes.
    pub fn before(node: &ViewNode) -> Option<Self> {
        let parent = node.parent()?;
        let index = parent.index_of(node)?;
        Some(Self::new(parent, index))
    }

    /// Position directly after `node`. `None` for detached nodes.
    pub fn after(node: &ViewNode) -> Option<Self> {
        let parent = node.parent()?;
        let index = parent.index_of(node)?;
        Some(Self::new(parent, index + 1))
    }

    pub fn at_start(parent: impl Into<ViewNode>) -> Self {
        Self::new(parent, 0)
    }

    pub fn at_end(parent: impl Into<ViewNode>) -> Self {
        let parent = parent.into();
        let offset = match &parent {
            ViewNode::Text(text) => text.char_len(),
            ViewNode::Element(element) => element.child_count(),
            ViewNode::Fragment(fragment) => fragment.child_count(),
        };
        Self { parent, offset }
    }

    pub fn parent(&self) -> &ViewNode {
        &self.parent
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Node right before the position. Always `None` inside text.
    pub fn node_before(&self) -> Option<ViewNode> {
        let parent = self.parent.as_parent()?;
        parent.child(self.offset.checked_sub(1)?)
    }

    /// Node right after the position. Always `None` inside text.
    pub fn node_after(&self) -> Option<ViewNode> {
        let parent: ViewParent = self.parent.as_parent()?;
        parent.child(self.offset)
    }
}

impl fmt::Debug for ViewPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{}", self.parent, self.offset)
    }
}

/// Pair of positions. `start` is expected to precede `end`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewRange {
    pub start: ViewPosition,
    pub end: ViewPosition,
}

impl ViewRange {
    pub fn new(start: ViewPosition, end: ViewPosition) -> Self {
        Self { start, end }
    }

    pub fn collapsed(position: ViewPosition) -> Self {
        Self {
            start: position.clone(),
            end: position,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// A set of ranges plus direction.
///
/// Selections are plain values: cloning one captures its ranges, so later
/// edits to a selection that was cloned from never reach the copy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewSelection {
    ranges: Vec<ViewRange>,
    backward: bool,
    fake: bool,
    label: Option<String>,
}

impl ViewSelection {
    pub fn new(ranges: Vec<ViewRange>, backward: bool) -> Self {
        Self {
            ranges,
            backward,
            fake: false,
            label: None,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn collapsed_at(position: ViewPosition) -> Self {
        Self::new(vec![ViewRange::collapsed(position)], false)
    }

    /// Mark the selection as fake, as used for content the host cannot select natively.
    pub fn with_fake(mut self, label: Option<String>) -> Self {
        self.fake = true;
        self.label = label;
        self
    }

    pub fn ranges(&self) -> &[ViewRange] {
        &self.ranges
    }

    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn first_range(&self) -> Option<&ViewRange> {
        self.ranges.first()
    }

    pub fn is_backward(&self) -> bool {
        self.backward && !self.is_collapsed()
    }

    pub fn is_fake(&self) -> bool {
        self.fake
    }

    pub fn fake_label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Collapsed when it is a single collapsed range.
    pub fn is_collapsed(&self) -> bool {
        self.ranges.len() == 1 && self.ranges[0].is_collapsed()
    }

    /// Where the selection was started: the last range's end when backward.
    pub fn anchor(&self) -> Option<&ViewPosition> {
        let range = self.ranges.last()?;
        Some(if self.backward { &range.end } else { &range.start })
    }

    /// Where the selection ends: the last range's start when backward.
    pub fn focus(&self) -> Option<&ViewPosition> {
        let range = self.ranges.last()?;
        Some(if self.backward { &range.start } else { &range.end })
    }

    /// Replace the ranges in place.
    pub fn set_to(&mut self, ranges: Vec<ViewRange>, backward: bool) {
        self.ranges = ranges;
        self.backward = backward;
    }
}

impl From<ViewRange> for ViewSelection {
    fn from(range: ViewRange) -> Self {
        Self::new(vec![range], false)
    }
}

impl From<ViewPosition> for ViewSelection {
    fn from(position: ViewPosition) -> Self {
        Self::collapsed_at(position)
    }
}
