//! Host selections.

use std::cmp::Ordering;

use tracing::trace;
use weaver_view::{ViewParent, ViewSelection};

use super::DomConverter;
use crate::filler::{self, INLINE_FILLER_LENGTH};
use crate::host::{HostDom, HostPosition, HostSelection};

impl<H: HostDom> DomConverter<H> {
    /// View selection for a host selection.
    ///
    /// A single range starting in a fake selection container, or in a text
    /// directly inside one, returns a copy of the bound selection. Otherwise
    /// ranges that cannot be converted are dropped.
    pub fn dom_selection_to_view(&self, selection: &HostSelection<H::Node>) -> ViewSelection {
        if let [range] = selection.ranges.as_slice() {
            let mut container = range.start.parent.clone();
            if self.dom.is_text(&container) {
                if let Some(parent) = self.dom.parent(&container) {
                    container = parent;
                }
            }
            if let Some(fake) = self.fake_selection_to_view(&container) {
                trace!(host = %self.dom.node_id(&container), "resolved fake selection");
                return fake;
            }
        }

        let backward = self.is_dom_selection_backward(selection);
        let ranges = selection
            .ranges
            .iter()
            .filter_map(|range| self.dom_range_to_view(range))
            .collect();
        ViewSelection::new(ranges, backward)
    }

    /// Whether the focus precedes the anchor.
    ///
    /// Positions that cannot be ordered, such as ones in unrelated trees,
    /// count as forward.
    pub fn is_dom_selection_backward(&self, selection: &HostSelection<H::Node>) -> bool {
        if selection.is_collapsed() {
            return false;
        }
        let (Some(anchor), Some(focus)) = (&selection.anchor, &selection.focus) else {
            return false;
        };
        match self.dom.compare_positions(anchor, focus) {
            Some(order) => order == Ordering::Greater,
            None => {
                trace!("selection ends are not comparable");
                false
            }
        }
    }

    /// Whether both selection ends are positions the view can take as-is.
    ///
    /// Ends before or inside an inline filler, or inside content rendered
    /// by a UI or raw element, are not.
    pub fn is_dom_selection_correct(&self, selection: &HostSelection<H::Node>) -> bool {
        [&selection.anchor, &selection.focus]
            .into_iter()
            .flatten()
            .all(|position| self.is_dom_selection_position_correct(position))
    }

    fn is_dom_selection_position_correct(&self, position: &HostPosition<H::Node>) -> bool {
        let parent = &position.parent;

        if filler::node_starts_with_filler(&self.dom, parent) && position.offset < INLINE_FILLER_LENGTH
        {
            return false;
        }
        if self.dom.is_element(parent)
            && self
                .dom
                .child(parent, position.offset)
                .is_some_and(|child| filler::node_starts_with_filler(&self.dom, &child))
        {
            return false;
        }

        match self.map_dom_to_view(parent) {
            Some(ViewParent::Element(element)) => !element.kind().is_opaque_render(),
            Some(ViewParent::Fragment(_)) | None => true,
        }
    }
}
