//! Positions, ranges and text correspondence.
//!
//! Text nodes are never bound. A view text is found from its previous
//! sibling or its parent, whichever is bound, and the same goes the other
//! way. Inline filler characters are invisible to view offsets.

use tracing::trace;
use weaver_view::{ViewNode, ViewParent, ViewPosition, ViewRange, ViewText};

use super::DomConverter;
use crate::filler::{self, INLINE_FILLER_LENGTH};
use crate::host::{HostDom, HostPosition, HostRange};

impl<H: HostDom> DomConverter<H> {
    /// Host text node rendered for `text`.
    pub fn find_corresponding_dom_text(&self, text: &ViewText) -> Option<H::Node> {
        let host = match text.as_node().previous_sibling() {
            Some(previous) => {
                let previous_host = self.map_view_to_dom(&previous.as_parent()?)?;
                self.dom.next_sibling(&previous_host)
            }
            None => {
                let parent_host = self.map_view_to_dom(&text.parent()?)?;
                self.dom.first_child(&parent_host)
            }
        }?;
        self.dom.is_text(&host).then_some(host)
    }

    /// View text for a host text node.
    ///
    /// Text rendered by a UI or raw element maps to that element. Inline
    /// fillers map to nothing.
    pub fn find_corresponding_view_text(&self, host: &H::Node) -> Option<ViewNode> {
        if filler::is_inline_filler(&self.dom, host) {
            return None;
        }
        if let Some(owner) = self.get_host_view_element(host) {
            return Some(owner.as_node());
        }

        let candidate = match self.dom.previous_sibling(host) {
            Some(previous) => {
                if !self.dom.is_element(&previous) {
                    return None;
                }
                self.map_dom_to_view(&previous)?.as_node().next_sibling()
            }
            None => self.map_dom_to_view(&self.dom.parent(host)?)?.child(0),
        };
        candidate.filter(ViewNode::is_text)
    }

    /// Host position for a view position.
    ///
    /// `None` when the relevant part of the view has not been rendered. A
    /// position right before an inline filler lands inside it, after the
    /// filler characters.
    pub fn view_position_to_dom(&self, position: &ViewPosition) -> Option<HostPosition<H::Node>> {
        let parent = match position.parent() {
            ViewNode::Text(text) => {
                let host = self.find_corresponding_dom_text(text)?;
                let data = self.dom.text_data(&host);
                let mut offset = position.offset();
                if filler::starts_with_filler(&data) {
                    offset += INLINE_FILLER_LENGTH;
                }
                let offset = offset.min(data.chars().count());
                return Some(HostPosition::new(host, offset));
            }
            ViewNode::Element(element) => element.as_parent(),
            ViewNode::Fragment(fragment) => fragment.as_parent(),
        };

        let (host_parent, host_before) = match position.node_before() {
            None => (self.map_view_to_dom(&parent)?, None),
            Some(before) => {
                let host_before = match &before {
                    ViewNode::Text(text) => self.find_corresponding_dom_text(text),
                    other => self.map_view_to_dom(&other.as_parent()?),
                }?;
                (self.dom.parent(&host_before)?, Some(host_before))
            }
        };

        let host_after = match &host_before {
            Some(before) => self.dom.next_sibling(before),
            None => self.dom.first_child(&host_parent),
        };
        if let Some(after) = host_after {
            if filler::node_starts_with_filler(&self.dom, &after) {
                trace!(host = %self.dom.node_id(&after), "position moved into inline filler");
                return Some(HostPosition::new(after, INLINE_FILLER_LENGTH));
            }
        }

        let offset = match &host_before {
            Some(before) => self.dom.index_of(before)? + 1,
            None => 0,
        };
        Some(HostPosition::new(host_parent, offset))
    }

    /// View position for a host position.
    ///
    /// Positions in fillers move next to them. Positions inside content
    /// rendered by a UI or raw element move before that element. `None`
    /// when the host content is not bound to the view.
    pub fn dom_position_to_view(&self, host_parent: &H::Node, offset: usize) -> Option<ViewPosition> {
        if self.is_block_filler(host_parent) {
            return self.position_before_host(host_parent);
        }

        if let Some(ViewParent::Element(element)) = self.map_dom_to_view(host_parent) {
            if element.kind().is_opaque_render() {
                return ViewPosition::before(&element.as_node());
            }
        }

        if self.dom.is_text(host_parent) {
            if filler::is_inline_filler(&self.dom, host_parent) {
                return self.position_before_host(host_parent);
            }
            let view_text = self.find_corresponding_view_text(host_parent)?;
            let offset = if filler::node_starts_with_filler(&self.dom, host_parent) {
                offset.saturating_sub(INLINE_FILLER_LENGTH)
            } else {
                offset
            };
            return Some(ViewPosition::new(view_text, offset));
        }

        if offset == 0 {
            return self
                .map_dom_to_view(host_parent)
                .map(|view| ViewPosition::new(view, 0));
        }

        let host_before = self.dom.child(host_parent, offset - 1)?;
        if filler::is_inline_filler(&self.dom, &host_before) || self.is_block_filler(&host_before) {
            return self.dom_position_to_view(host_parent, offset - 1);
        }

        let view_before = if self.dom.is_text(&host_before) {
            self.find_corresponding_view_text(&host_before)
        } else {
            self.map_dom_to_view(&host_before).map(|view| view.as_node())
        }?;
        ViewPosition::after(&view_before)
    }

    fn position_before_host(&self, host: &H::Node) -> Option<ViewPosition> {
        let parent = self.dom.parent(host)?;
        let index = self.dom.index_of(host)?;
        self.dom_position_to_view(&parent, index)
    }

    pub fn view_range_to_dom(&self, range: &ViewRange) -> Option<HostRange<H::Node>> {
        Some(HostRange::new(
            self.view_position_to_dom(&range.start)?,
            self.view_position_to_dom(&range.end)?,
        ))
    }

    pub fn dom_range_to_view(&self, range: &HostRange<H::Node>) -> Option<ViewRange> {
        Some(ViewRange::new(
            self.dom_position_to_view(&range.start.parent, range.start.offset)?,
            self.dom_position_to_view(&range.end.parent, range.end.offset)?,
        ))
    }
}
