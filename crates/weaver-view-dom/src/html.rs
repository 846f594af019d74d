//! HTML markup in and out of a host document.
//!
//! Parsing and serialization go through html5ever, so hosts read and write
//! markup with the same tree construction and escaping rules a browser uses.
//! The host tree is copied to and from an `RcDom` at the boundary.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use html5ever::serialize::{SerializeOpts, TraversalScope};
use html5ever::tendril::TendrilSink;
use html5ever::{Attribute, LocalName, ParseOpts, QualName, ns, parse_fragment, serialize};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use tracing::warn;

use crate::host::{HostDom, HostNodeType};

/// Parse `html` as `<body>` content into a detached host fragment.
///
/// Attributes the host rejects are dropped with a warning.
pub fn parse_html<H: HostDom + ?Sized>(dom: &H, html: &str) -> H::Node {
    let context = QualName::new(None, ns!(html), LocalName::from("body"));
    let parsed =
        parse_fragment(RcDom::default(), ParseOpts::default(), context, Vec::new(), false).one(html);

    let fragment = dom.create_fragment();
    // Fragment parsing roots its output in a synthetic `<html>` element.
    let root = parsed.document.children.borrow().first().cloned();
    if let Some(root) = root {
        copy_children(dom, &root, &fragment);
    }
    fragment
}

fn copy_children<H: HostDom + ?Sized>(dom: &H, source: &Handle, target: &H::Node) {
    for child in source.children.borrow().iter() {
        if let Some(node) = copy_node(dom, child) {
            dom.append_child(target, &node);
        }
    }
}

fn copy_node<H: HostDom + ?Sized>(dom: &H, handle: &Handle) -> Option<H::Node> {
    match &handle.data {
        NodeData::Text { contents } => Some(dom.create_text(&contents.borrow())),
        NodeData::Comment { contents } => Some(dom.create_comment(contents)),
        NodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            let element = dom.create_element(&name.local);
            for attr in attrs.borrow().iter() {
                let key = attribute_name(&attr.name);
                if let Err(err) = dom.set_attribute(&element, &key, &attr.value) {
                    warn!(%err, "dropping attribute from parsed markup");
                }
            }
            let contents = template_contents.borrow().clone();
            copy_children(dom, contents.as_ref().unwrap_or(handle), &element);
            Some(element)
        }
        NodeData::Document | NodeData::Doctype { .. } | NodeData::ProcessingInstruction { .. } => {
            None
        }
    }
}

fn attribute_name(name: &QualName) -> String {
    match &name.prefix {
        Some(prefix) => format!("{prefix}:{}", name.local),
        None => name.local.to_string(),
    }
}

/// Serialized children of `node`.
pub fn inner_html<H: HostDom + ?Sized>(dom: &H, node: &H::Node) -> String {
    match dom.node_type(node) {
        HostNodeType::Element => {
            // The element name decides whether text children are escaped.
            let scope = TraversalScope::ChildrenOnly(Some(element_name(&dom.node_name(node))));
            write_handle(to_handle(dom, node), scope)
        }
        HostNodeType::Fragment => {
            write_handle(to_handle(dom, node), TraversalScope::ChildrenOnly(None))
        }
        HostNodeType::Text | HostNodeType::Comment => String::new(),
    }
}

/// Serialized `node` including its own tag.
pub fn outer_html<H: HostDom + ?Sized>(dom: &H, node: &H::Node) -> String {
    match dom.node_type(node) {
        HostNodeType::Fragment => inner_html(dom, node),
        HostNodeType::Element | HostNodeType::Text | HostNodeType::Comment => {
            write_handle(to_handle(dom, node), TraversalScope::IncludeNode)
        }
    }
}

fn element_name(name: &str) -> QualName {
    QualName::new(None, ns!(html), LocalName::from(name))
}

fn to_handle<H: HostDom + ?Sized>(dom: &H, node: &H::Node) -> Handle {
    let data = match dom.node_type(node) {
        HostNodeType::Element => {
            let attributes = dom
                .attribute_names(node)
                .into_iter()
                .map(|key| Attribute {
                    name: QualName::new(None, ns!(), LocalName::from(key.as_str())),
                    value: dom.attribute(node, &key).unwrap_or_default().into(),
                })
                .collect();
            NodeData::Element {
                name: element_name(&dom.node_name(node)),
                attrs: RefCell::new(attributes),
                template_contents: Default::default(),
                mathml_annotation_xml_integration_point: false,
            }
        }
        HostNodeType::Text => NodeData::Text {
            contents: RefCell::new(dom.text_data(node).into()),
        },
        HostNodeType::Comment => NodeData::Comment {
            contents: dom.text_data(node).into(),
        },
        // rcdom only serializes a document's children, which is what a fragment wants.
        HostNodeType::Fragment => NodeData::Document,
    };

    let children = dom
        .children(node)
        .iter()
        .map(|child| to_handle(dom, child))
        .collect();
    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(children),
        data,
    })
}

fn write_handle(handle: Handle, scope: TraversalScope) -> String {
    let mut output = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: scope,
        ..Default::default()
    };
    if let Err(err) = serialize(&mut output, &SerializableHandle::from(handle), opts) {
        warn!(%err, "markup serialization failed");
    }
    String::from_utf8_lossy(&output).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDom;

    #[test]
    fn test_implied_end_tags() {
        let dom = MemoryDom::new();
        let paragraphs = dom.parse_html("<p>a<p>b");
        insta::assert_snapshot!(dom.inner_html(&paragraphs), @"<p>a</p><p>b</p>");
        assert_eq!(dom.child_count(&paragraphs), 2);

        let list = dom.parse_html("<ul><li>a<li>b</ul>");
        insta::assert_snapshot!(dom.inner_html(&list), @"<ul><li>a</li><li>b</li></ul>");
    }

    #[test]
    fn test_named_character_references() {
        let dom = MemoryDom::new();
        let fragment = dom.parse_html("<p>x&copy;y&eacute;</p>");
        let text = dom.first_child(&dom.first_child(&fragment).unwrap()).unwrap();
        assert_eq!(dom.text_data(&text), "x©yé");
    }

    #[test]
    fn test_tag_names_are_lowercased() {
        let dom = MemoryDom::new();
        let fragment = dom.parse_html(r#"<DIV Title="x"><SPAN>a</SPAN></DIV>"#);
        let div = dom.first_child(&fragment).unwrap();
        assert_eq!(dom.node_name(&div).as_str(), "div");
        assert_eq!(dom.attribute(&div, "title").as_deref(), Some("x"));
        insta::assert_snapshot!(dom.outer_html(&div), @r#"<div title="x"><span>a</span></div>"#);
    }

    #[test]
    fn test_leading_whitespace_and_comments_survive() {
        let dom = MemoryDom::new();
        let fragment = dom.parse_html(" <!-- a --><b>x</b> ");
        assert_eq!(dom.child_count(&fragment), 4);
        assert_eq!(dom.inner_html(&fragment), " <!-- a --><b>x</b> ");
    }

    #[test]
    fn test_raw_text_is_not_escaped() {
        let dom = MemoryDom::new();
        let script = dom.create_element("script");
        dom.append_child(&script, &dom.create_text("a < b && c"));
        insta::assert_snapshot!(dom.inner_html(&script), @"a < b && c");

        let div = dom.create_element("div");
        dom.append_child(&div, &dom.create_text("a < b && c"));
        insta::assert_snapshot!(dom.inner_html(&div), @"a &lt; b &amp;&amp; c");
    }

    #[test]
    fn test_template_contents_are_copied() {
        let dom = MemoryDom::new();
        let fragment = dom.parse_html("<template><b>x</b></template>");
        let template = dom.first_child(&fragment).unwrap();
        insta::assert_snapshot!(dom.inner_html(&template), @"<b>x</b>");
    }

    #[test]
    fn test_text_and_comment_have_no_inner_html() {
        let dom = MemoryDom::new();
        assert_eq!(dom.inner_html(&dom.create_text("x")), "");
        assert_eq!(dom.outer_html(&dom.create_comment("c")), "<!--c-->");
    }
}
