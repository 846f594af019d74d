//! Default block filler placement per element kind.
//!
//! A block filler keeps an otherwise empty block focusable on the host. The
//! view tree never contains one; it only reports where the host-side
//! converter has to insert it.

use crate::node::{ElementKind, ViewElement, ViewNode, ViewParent};

pub(crate) fn default_filler_offset(element: &ViewElement) -> Option<usize> {
    match element.kind() {
        ElementKind::Container | ElementKind::Editable => container_filler_offset(element),
        ElementKind::Attribute => attribute_filler_offset(element),
        ElementKind::Element | ElementKind::Empty | ElementKind::Ui | ElementKind::Raw => None,
    }
}

/// Containers need a filler when empty, when they only hold UI elements, or
/// after a trailing `<br>`.
fn container_filler_offset(element: &ViewElement) -> Option<usize> {
    let children = element.children();

    if children.last().is_some_and(|last| last.is_element_named("br")) {
        return Some(children.len());
    }

    if children.iter().all(ViewNode::is_ui_element) {
        Some(children.len())
    } else {
        None
    }
}

/// An empty attribute element needs the filler itself when it is the only
/// content of its container: `<p><b></b></p>` renders as `<p><b><br></b></p>`.
fn attribute_filler_offset(element: &ViewElement) -> Option<usize> {
    if non_ui_child_count(&element.as_parent()) > 0 {
        return None;
    }

    let mut ancestor = element.parent();
    loop {
        match &ancestor {
            Some(ViewParent::Element(parent)) if parent.kind() == ElementKind::Attribute => {
                if non_ui_child_count(&parent.as_parent()) > 1 {
                    return None;
                }
                let next = parent.parent();
                ancestor = next;
            }
            _ => break,
        }
    }

    match ancestor {
        Some(parent) if non_ui_child_count(&parent) <= 1 => Some(element.child_count()),
        _ => None,
    }
}

fn non_ui_child_count(parent: &ViewParent) -> usize {
    parent
        .children()
        .iter()
        .filter(|child| !child.is_ui_element())
        .count()
}
