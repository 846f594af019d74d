//! View tree to notation.

use crate::node::{ElementKind, ViewElement, ViewNode, ViewText};
use crate::position::{ViewRange, ViewSelection};
use crate::render::MarkupWriter;

use super::{ELEMENT_RANGE_END, ELEMENT_RANGE_START, TEXT_RANGE_END, TEXT_RANGE_START};

/// Knobs for [`stringify`].
#[derive(Debug, Clone, Default)]
pub struct StringifyOptions {
    /// Prefix element names with their kind (`<container:p>`).
    pub show_type: bool,
    /// Print only the children of the root element.
    pub ignore_root: bool,
    /// Use `[` `]` inside text as well.
    pub same_selection_characters: bool,
    /// Print what UI elements render instead of their (absent) children.
    pub render_ui_elements: bool,
    /// Print what raw elements render instead of their (absent) children.
    pub render_raw_elements: bool,
}

/// Print `node` in the dev notation, marking the ranges of `selection`.
pub fn stringify(
    node: &ViewNode,
    selection: Option<&ViewSelection>,
    options: &StringifyOptions,
) -> String {
    let stringifier = Stringifier {
        root: node,
        ranges: selection.map(ViewSelection::ranges).unwrap_or(&[]),
        options,
    };
    let mut out = String::new();
    stringifier.walk(node, &mut out);
    out
}

/// Print `node` with default options and no selection.
pub fn stringify_node(node: &ViewNode) -> String {
    stringify(node, None, &StringifyOptions::default())
}

struct Stringifier<'a> {
    root: &'a ViewNode,
    ranges: &'a [ViewRange],
    options: &'a StringifyOptions,
}

impl Stringifier<'_> {
    fn walk(&self, node: &ViewNode, out: &mut String) {
        match node {
            ViewNode::Text(text) => out.push_str(&self.text_with_ranges(text)),
            ViewNode::Fragment(fragment) => self.walk_children(node, &fragment.children(), out),
            ViewNode::Element(element) => {
                let ignore = self.options.ignore_root && node == self.root;
                if element.is_comment() && !ignore {
                    out.push_str("<!--");
                    out.push_str(&element.raw_content().unwrap_or_default());
                    out.push_str("-->");
                    return;
                }

                if !ignore {
                    out.push_str(&self.open_tag(element));
                }

                let rendered = match element.kind() {
                    ElementKind::Ui if self.options.render_ui_elements => element.render_fn(),
                    ElementKind::Raw if self.options.render_raw_elements => element.render_fn(),
                    _ => None,
                };
                match rendered {
                    Some(render) => {
                        let mut writer = MarkupWriter::new();
                        render(&mut writer);
                        out.push_str(&writer.finish());
                    }
                    None => self.walk_children(node, &element.children(), out),
                }

                if !ignore {
                    out.push_str(&self.close_tag(element));
                }
            }
        }
    }

    fn walk_children(&self, parent: &ViewNode, children: &[ViewNode], out: &mut String) {
        out.push_str(&self.element_ranges(parent, 0));
        for (index, child) in children.iter().enumerate() {
            self.walk(child, out);
            out.push_str(&self.element_ranges(parent, index + 1));
        }
    }

    fn element_ranges(&self, parent: &ViewNode, offset: usize) -> String {
        let mut start = String::new();
        let mut end = String::new();
        let mut collapsed = String::new();

        for range in self.ranges {
            if range.start.parent() == parent && range.start.offset() == offset {
                if range.is_collapsed() {
                    collapsed.push(ELEMENT_RANGE_START);
                    collapsed.push(ELEMENT_RANGE_END);
                } else {
                    start.push(ELEMENT_RANGE_START);
                }
            }
            if range.end.parent() == parent && range.end.offset() == offset && !range.is_collapsed()
            {
                end.push(ELEMENT_RANGE_END);
            }
        }

        end + &collapsed + &start
    }

    fn text_with_ranges(&self, text: &ViewText) -> String {
        let node = text.as_node();
        let chars: Vec<char> = text.data().chars().collect();
        let (start_token, end_token) = if self.options.same_selection_characters {
            (ELEMENT_RANGE_START, ELEMENT_RANGE_END)
        } else {
            (TEXT_RANGE_START, TEXT_RANGE_END)
        };

        // One slot per offset, including the one after the last character.
        let mut slots = vec![(String::new(), String::new(), String::new()); chars.len() + 1];
        for range in self.ranges {
            let collapsed = range.is_collapsed();
            if range.start.parent() == &node && range.start.offset() <= chars.len() {
                let slot = &mut slots[range.start.offset()];
                if collapsed {
                    slot.1.push(start_token);
                    slot.1.push(end_token);
                } else {
                    slot.2.push(start_token);
                }
            }
            if range.end.parent() == &node && range.end.offset() <= chars.len() && !collapsed {
                slots[range.end.offset()].0.push(end_token);
            }
        }

        let mut out = String::new();
        for (index, (end, collapsed, start)) in slots.into_iter().enumerate() {
            out.push_str(&end);
            out.push_str(&collapsed);
            out.push_str(&start);
            if let Some(c) = chars.get(index) {
                out.push(*c);
            }
        }
        out
    }

    fn qualified_name(&self, element: &ViewElement) -> String {
        let kind = if self.options.show_type {
            match element.kind() {
                ElementKind::Editable => Some("container"),
                kind => kind.notation_type(),
            }
        } else {
            None
        };
        match kind {
            Some(kind) => format!("{kind}:{}", element.name()),
            None => element.name().to_string(),
        }
    }

    fn open_tag(&self, element: &ViewElement) -> String {
        let mut parts = vec![self.qualified_name(element)];

        let mut attributes = element.attributes();
        attributes.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, value) in attributes {
            let value = if key == "class" {
                let mut classes = element.class_names();
                classes.sort();
                classes.join(" ")
            } else {
                value
            };
            parts.push(format!("{key}=\"{value}\""));
        }

        format!("<{}>", parts.join(" "))
    }

    fn close_tag(&self, element: &ViewElement) -> String {
        format!("</{}>", self.qualified_name(element))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ViewFragment, ViewText};
    use crate::position::ViewPosition;

    #[test]
    fn test_plain_tree() {
        let p = ViewElement::container("p")
            .with_attribute("style", "color:red")
            .with_attribute("class", "b a")
            .with_children(["foo"])
            .unwrap();
        insta::assert_snapshot!(stringify_node(&p.as_node()), @r#"<p class="a b" style="color:red">foo</p>"#);
    }

    #[test]
    fn test_show_type() {
        let b = ViewElement::attribute_element("b").with_children(["x"]).unwrap();
        let p = ViewElement::container("p").with_children([b]).unwrap();
        let options = StringifyOptions {
            show_type: true,
            ..Default::default()
        };
        insta::assert_snapshot!(stringify(&p.as_node(), None, &options), @"<container:p><attribute:b>x</attribute:b></container:p>");
    }

    #[test]
    fn test_ranges_in_text_and_elements() {
        let text = ViewText::new("foobar");
        let p = ViewElement::container("p").with_children([text.clone()]).unwrap();
        let fragment = ViewFragment::new().with_children([p.clone()]).unwrap();
        let selection = ViewSelection::new(
            vec![
                ViewRange::new(ViewPosition::new(text.clone(), 1), ViewPosition::new(text.clone(), 3)),
                ViewRange::collapsed(ViewPosition::new(fragment.clone(), 1)),
            ],
            false,
        );

        let printed = stringify(&fragment.as_node(), Some(&selection), &Default::default());
        assert_eq!(printed, "<p>f{oo}bar</p>[]");

        let same = StringifyOptions {
            same_selection_characters: true,
            ..Default::default()
        };
        assert_eq!(
            stringify(&fragment.as_node(), Some(&selection), &same),
            "<p>f[oo]bar</p>[]"
        );
    }

    #[test]
    fn test_ignore_root() {
        let p = ViewElement::container("p").with_children(["foo"]).unwrap();
        let options = StringifyOptions {
            ignore_root: true,
            ..Default::default()
        };
        assert_eq!(stringify(&p.as_node(), None, &options), "foo");
    }

    #[test]
    fn test_render_ui_elements() {
        let ui = ViewElement::ui("span", |writer| {
            writer.start_element("b");
            writer.text("rendered");
            writer.end_element();
        });
        assert_eq!(stringify_node(&ui.as_node()), "<span></span>");

        let options = StringifyOptions {
            render_ui_elements: true,
            ..Default::default()
        };
        assert_eq!(
            stringify(&ui.as_node(), None, &options),
            "<span><b>rendered</b></span>"
        );
    }

    #[test]
    fn test_comment() {
        let div = ViewElement::new("div")
            .with_children([ViewElement::comment("x").as_node(), "y".into()])
            .unwrap();
        assert_eq!(stringify_node(&div.as_node()), "<div><!--x-->y</div>");
    }
}
