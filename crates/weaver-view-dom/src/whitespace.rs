//! Whitespace normalization across the view/host boundary.
//!
//! Hosts collapse whitespace runs and drop spaces at block edges. Going to
//! the host, spaces that would be lost are written as non-breaking spaces.
//! Coming back, the host's own collapsing is applied first and the
//! non-breaking spaces it needed are turned back into plain ones.
//!
//! The reverse direction is a heuristic: a non-breaking space the author
//! typed at a block edge reads back as a plain space.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;
use weaver_view::{ViewElement, ViewNode, ViewParent, ViewText};

use crate::config::ResolvedConfig;
use crate::filler::{NBSP, data_without_filler, starts_with_filler};
use crate::matcher::Matcher;

/// Whitespace a host collapses into a single space.
static COLLAPSIBLE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \n\t\r]+").unwrap());

/// Nearest inline content next to a text node, within its block.
#[derive(Debug, Clone, PartialEq)]
pub enum Touching {
    Text(ViewText),
    /// An inline object, such as an image. It has no text of its own.
    Object(ViewElement),
}

/// Whitespace rules for one converter configuration.
pub struct WhitespaceRules<'a> {
    config: &'a ResolvedConfig,
    inline_objects: &'a Matcher,
}

impl<'a> WhitespaceRules<'a> {
    pub fn new(config: &'a ResolvedConfig, inline_objects: &'a Matcher) -> Self {
        Self {
            config,
            inline_objects,
        }
    }

    /// Block-level by kind, or by name for plain elements.
    pub fn is_block_element(&self, element: &ViewElement) -> bool {
        element.kind().is_container() || self.config.is_block_name(element.name())
    }

    /// `br`, a configured inline object name, or a registered inline object pattern.
    pub fn is_inline_object(&self, element: &ViewElement) -> bool {
        element.is_named("br")
            || self.config.is_inline_object_name(element.name())
            || self.inline_objects.matches_view(element)
    }

    /// Whether any ancestor renders whitespace verbatim.
    pub fn is_preformatted(&self, node: &ViewNode) -> bool {
        node.ancestors().any(|ancestor| {
            ancestor
                .as_element()
                .is_some_and(|element| self.config.is_pre_name(element.name()))
        })
    }

    /// Text data as it must be written to the host.
    pub fn text_for_host(&self, text: &ViewText) -> String {
        let data = text.data();
        if self.is_preformatted(&text.as_node()) {
            return data.to_string();
        }

        let mut chars: Vec<char> = data.chars().collect();

        if chars.first() == Some(&' ') {
            let previous = self.touching_inline_node(text, false);
            let previous_ends_with_space = match &previous {
                Some(Touching::Text(previous)) => self.ends_with_space(previous),
                _ => false,
            };
            if previous.is_none() || previous_ends_with_space {
                chars[0] = NBSP;
            }
        }

        if chars.last() == Some(&' ') {
            let len = chars.len();
            let next = self.touching_inline_node(text, true);
            let next_starts_with_space =
                matches!(&next, Some(Touching::Text(next)) if next.data().starts_with(' '));
            let doubled = len >= 2 && chars[len - 2] == ' ';
            if doubled || next.is_none() || next_starts_with_space {
                chars[len - 1] = NBSP;
            }
        }

        let mut i = 0;
        while i + 1 < chars.len() {
            if chars[i] == ' ' && chars[i + 1] == ' ' {
                chars[i + 1] = NBSP;
                i += 2;
            } else {
                i += 1;
            }
        }

        let rendered: String = chars.into_iter().collect();
        if rendered != data {
            trace!(view = %text.id(), data = %data, rendered = %rendered, "protected whitespace");
        }
        rendered
    }

    fn ends_with_space(&self, text: &ViewText) -> bool {
        !self.is_preformatted(&text.as_node()) && self.text_for_host(text).ends_with(' ')
    }

    /// Nearest text or inline object before or after `text` in the same block.
    ///
    /// The walk enters and leaves inline wrappers freely. A `br` or a block
    /// boundary ends it with `None`.
    pub fn touching_inline_node(&self, text: &ViewText, forward: bool) -> Option<Touching> {
        let mut parent = text.parent()?;
        let index = parent.index_of(&text.as_node())?;
        let mut offset = if forward { index + 1 } else { index };

        loop {
            let child = if forward {
                parent.child(offset)
            } else {
                offset.checked_sub(1).and_then(|i| parent.child(i))
            };

            match child {
                Some(ViewNode::Text(text)) => return Some(Touching::Text(text)),
                Some(ViewNode::Element(element)) => {
                    if let Some(found) = self.walk_stop(&element) {
                        return found;
                    }
                    offset = if forward { 0 } else { element.child_count() };
                    parent = element.as_parent();
                }
                Some(ViewNode::Fragment(_)) => return None,
                None => {
                    let ViewParent::Element(element) = parent else {
                        return None;
                    };
                    if let Some(found) = self.walk_stop(&element) {
                        return found;
                    }
                    let index = element.index()?;
                    offset = if forward { index + 1 } else { index };
                    parent = element.parent()?;
                }
            }
        }
    }

    fn walk_stop(&self, element: &ViewElement) -> Option<Option<Touching>> {
        if element.is_named("br") {
            Some(None)
        } else if self.is_inline_object(element) {
            Some(Some(Touching::Object(element.clone())))
        } else if self.is_block_element(element) {
            Some(None)
        } else {
            None
        }
    }

    /// Undo host whitespace handling on freshly converted inline nodes.
    ///
    /// `inline_nodes` holds the texts and inline objects of one block, in
    /// document order. Texts left empty are removed from their parent. The
    /// list is drained. Edge trimming is skipped for shallow conversions.
    pub fn normalize_inline_nodes(&self, inline_nodes: &mut Vec<ViewNode>, with_children: bool) {
        let mut previous_ends_with_space = false;
        let mut i = 0;

        while i < inline_nodes.len() {
            let text = match &inline_nodes[i] {
                ViewNode::Text(text) => text.clone(),
                _ => {
                    previous_ends_with_space = false;
                    i += 1;
                    continue;
                }
            };

            let raw = text.data();
            let mut ends_with_space = false;

            let data = if self.is_preformatted(&text.as_node()) {
                data_without_filler(&raw).to_string()
            } else {
                let previous = i.checked_sub(1).map(|p| &inline_nodes[p]);
                let next = inline_nodes.get(i + 1);

                let mut data = COLLAPSIBLE_RUN_RE.replace_all(&raw, " ").into_owned();
                ends_with_space = data
                    .chars()
                    .last()
                    .is_some_and(|c| c.is_whitespace() && c != NBSP);

                let left_trim = previous.is_none_or(|p| p.is_element_named("br"))
                    || previous_ends_with_space;
                let right_trim = next.is_none() && !starts_with_filler(&raw);

                if with_children {
                    if left_trim && data.starts_with(' ') {
                        data.remove(0);
                    }
                    if right_trim && data.ends_with(' ') {
                        data.pop();
                    }
                }

                // The filler goes only now so a host space next to it is trimmed above.
                let mut data = data_without_filler(&data).replace(" \u{A0}", "  ");

                let next_is_object =
                    matches!(next, Some(ViewNode::Element(element)) if !element.is_named("br"));
                let next_starts_with_space =
                    matches!(next, Some(ViewNode::Text(next)) if next.data().starts_with(' '));
                if data.ends_with(NBSP)
                    && (ends_with_double_space(&data)
                        || next.is_none()
                        || next_is_object
                        || next_starts_with_space)
                {
                    data.pop();
                    data.push(' ');
                }

                let previous_is_object =
                    matches!(previous, Some(ViewNode::Element(element)) if !element.is_named("br"));
                if data.starts_with(NBSP) && (left_trim || previous_is_object) {
                    data.replace_range(..NBSP.len_utf8(), " ");
                }
                data
            };

            if data.is_empty() && text.parent().is_some() {
                trace!(view = %text.id(), "dropped whitespace-only text");
                text.as_node().remove();
                inline_nodes.remove(i);
            } else {
                text.set_data(data);
                previous_ends_with_space = ends_with_space;
                i += 1;
            }
        }

        inline_nodes.clear();
    }
}

/// Ends with a non-breaking space preceded by any space.
fn ends_with_double_space(data: &str) -> bool {
    let mut chars = data.chars().rev();
    chars.next() == Some(NBSP) && matches!(chars.next(), Some(' ') | Some(NBSP))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConverterConfig;
    use crate::filler::INLINE_FILLER;
    use crate::matcher::ElementPattern;

    fn config() -> ResolvedConfig {
        ConverterConfig::data().resolve()
    }

    /// Forward-normalize `data` as the only text of a paragraph.
    fn to_host(data: &str) -> String {
        let config = config();
        let matcher = Matcher::new("inline_object_elements");
        let rules = WhitespaceRules::new(&config, &matcher);
        let p = ViewElement::container("p");
        let text = ViewText::new(data);
        p.append_child(text.clone()).unwrap();
        rules.text_for_host(&text)
    }

    /// Reverse-normalize host texts that are the children of one paragraph.
    fn from_host(data: &[&str]) -> Vec<String> {
        let config = config();
        let matcher = Matcher::new("inline_object_elements");
        let rules = WhitespaceRules::new(&config, &matcher);
        let p = ViewElement::new("p");
        let mut nodes: Vec<ViewNode> = data.iter().map(|d| ViewText::new(*d).as_node()).collect();
        for node in &nodes {
            p.append_child(node.clone()).unwrap();
        }
        rules.normalize_inline_nodes(&mut nodes, true);
        p.children()
            .iter()
            .filter_map(|c| c.as_text().map(|t| t.data().to_string()))
            .collect()
    }

    fn round_trip(data: &str) -> String {
        let config = config();
        let matcher = Matcher::new("inline_object_elements");
        let rules = WhitespaceRules::new(&config, &matcher);

        let p = ViewElement::container("p");
        let text = ViewText::new(data);
        p.append_child(text.clone()).unwrap();
        let host = rules.text_for_host(&text);

        let back = ViewElement::new("p");
        let back_text = ViewText::new(host);
        back.append_child(back_text.clone()).unwrap();
        rules.normalize_inline_nodes(&mut vec![back_text.as_node()], true);
        back_text.data().to_string()
    }

    #[test]
    fn test_block_edge_spaces_become_nbsp() {
        let config = config();
        let matcher = Matcher::new("inline_object_elements");
        let rules = WhitespaceRules::new(&config, &matcher);
        let p = ViewElement::container("p");
        let cases = [
            (" x", "\u{A0}x"),
            ("  x", "\u{A0} x"),
            ("   x", "\u{A0} \u{A0}x"),
            ("x ", "x\u{A0}"),
            ("x  ", "x \u{A0}"),
            ("a  b", "a \u{A0}b"),
            ("a b", "a b"),
            (" ", "\u{A0}"),
        ];
        for (data, expected) in cases {
            let text = ViewText::new(data);
            p.remove_children(0, p.child_count());
            p.append_child(text.clone()).unwrap();
            assert_eq!(rules.text_for_host(&text), expected, "{data:?}");
        }
    }

    #[test]
    fn test_boundary_runs_round_trip() {
        for data in [" x", "  x", "   x", "x ", "x  ", "a  b", "a   b", " a b "] {
            assert_eq!(round_trip(data), data, "{data:?}");
        }
    }

    #[test]
    fn test_single_interior_spaces_are_identity() {
        for data in ["foo", "foo bar", "a b c d"] {
            assert_eq!(to_host(data), data);
            assert_eq!(from_host(&[data]), vec![data.to_string()]);
        }
    }

    #[test]
    fn test_adjacent_texts_across_inline_wrappers() {
        let config = config();
        let matcher = Matcher::new("inline_object_elements");
        let rules = WhitespaceRules::new(&config, &matcher);

        // <p>foo <b> bar</b></p>
        let foo = ViewText::new("foo ");
        let bar = ViewText::new(" bar");
        let b = ViewElement::attribute_element("b")
            .with_children([bar.clone()])
            .unwrap();
        let _p = ViewElement::container("p")
            .with_children([foo.as_node(), b.as_node()])
            .unwrap();

        assert_eq!(rules.text_for_host(&foo), "foo\u{A0}");
        assert_eq!(rules.text_for_host(&bar), " bar");
        assert_eq!(
            rules.touching_inline_node(&bar, false),
            Some(Touching::Text(foo.clone()))
        );
        assert_eq!(rules.touching_inline_node(&foo, false), None);
    }

    #[test]
    fn test_br_and_objects_stop_the_walk() {
        let config = config();
        let matcher = Matcher::new("inline_object_elements");
        let rules = WhitespaceRules::new(&config, &matcher);

        let after_br = ViewText::new(" x");
        let after_img = ViewText::new(" y");
        let img = ViewElement::empty("img");
        let _p = ViewElement::container("p")
            .with_children([
                ViewText::new("a ").as_node(),
                ViewElement::empty("br").as_node(),
                after_br.as_node(),
                img.as_node(),
                after_img.as_node(),
            ])
            .unwrap();

        assert_eq!(rules.text_for_host(&after_br), "\u{A0}x");
        assert_eq!(rules.text_for_host(&after_img), " y");
        assert_eq!(
            rules.touching_inline_node(&after_img, false),
            Some(Touching::Object(img))
        );
    }

    #[test]
    fn test_registered_inline_object_stops_the_walk() {
        let config = config();
        let plain = Matcher::new("inline_object_elements");
        let mut registered = Matcher::new("inline_object_elements");
        registered
            .add(&ElementPattern::name("span").with_class("mention"))
            .unwrap();

        let before = ViewText::new("a ");
        let after = ViewText::new(" b");
        let mention = ViewElement::attribute_element("span").with_attribute("class", "mention");
        let _p = ViewElement::container("p")
            .with_children([before.as_node(), mention.as_node(), after.as_node()])
            .unwrap();

        let rules = WhitespaceRules::new(&config, &registered);
        assert_eq!(
            rules.touching_inline_node(&after, false),
            Some(Touching::Object(mention.clone()))
        );
        assert_eq!(rules.text_for_host(&before), "a ");
        assert_eq!(rules.text_for_host(&after), " b");

        // Unregistered, the empty span is transparent and the spaces meet.
        let rules = WhitespaceRules::new(&config, &plain);
        assert_eq!(
            rules.touching_inline_node(&after, false),
            Some(Touching::Text(before.clone()))
        );
        assert_eq!(rules.text_for_host(&before), "a\u{A0}");
    }

    #[test]
    fn test_registered_inline_object_keeps_spaces_from_host() {
        let config = config();
        let mut matcher = Matcher::new("inline_object_elements");
        matcher
            .add(&ElementPattern::name("span").with_class("mention"))
            .unwrap();
        let rules = WhitespaceRules::new(&config, &matcher);

        let before = ViewText::new("a\u{A0}");
        let after = ViewText::new(" b");
        let mention = ViewElement::new("span").with_attribute("class", "mention");
        let _p = ViewElement::new("p")
            .with_children([before.as_node(), mention.as_node(), after.as_node()])
            .unwrap();

        rules.normalize_inline_nodes(
            &mut vec![before.as_node(), mention.as_node(), after.as_node()],
            true,
        );
        assert_eq!(before.data(), "a ");
        assert_eq!(after.data(), " b");
    }

    #[test]
    fn test_walk_stops_at_sibling_blocks() {
        let config = config();
        let matcher = Matcher::new("inline_object_elements");
        let rules = WhitespaceRules::new(&config, &matcher);

        let first = ViewText::new("a ");
        let second = ViewText::new(" b");
        let _root = ViewElement::new("div")
            .with_children([
                ViewElement::new("p").with_children([first.clone()]).unwrap(),
                ViewElement::new("p").with_children([second.clone()]).unwrap(),
            ])
            .unwrap();

        assert_eq!(rules.touching_inline_node(&first, true), None);
        assert_eq!(rules.text_for_host(&second), "\u{A0}b");
    }

    #[test]
    fn test_preformatted_is_verbatim() {
        let config = config();
        let matcher = Matcher::new("inline_object_elements");
        let rules = WhitespaceRules::new(&config, &matcher);

        let text = ViewText::new("  a  b  ");
        let pre = ViewElement::new("pre").with_children([text.clone()]).unwrap();
        assert_eq!(rules.text_for_host(&text), "  a  b  ");

        let host = ViewText::new(format!("{INLINE_FILLER}  a\n b "));
        pre.append_child(host.clone()).unwrap();
        rules.normalize_inline_nodes(&mut vec![host.as_node()], true);
        assert_eq!(host.data(), "  a\n b ");
    }

    #[test]
    fn test_host_whitespace_collapses() {
        assert_eq!(from_host(&["\n  foo \t\n bar  \n"]), vec!["foo bar"]);
        assert_eq!(from_host(&["foo ", " bar"]), vec!["foo ", "bar"]);
        assert_eq!(from_host(&["foo", "   "]), vec!["foo"]);
    }

    #[test]
    fn test_authored_nbsp_inside_text_survives() {
        assert_eq!(from_host(&["a\u{A0}b"]), vec!["a\u{A0}b"]);
    }

    #[test]
    fn test_shallow_conversion_keeps_edges() {
        let config = config();
        let matcher = Matcher::new("inline_object_elements");
        let rules = WhitespaceRules::new(&config, &matcher);
        let text = ViewText::new(" foo ");
        rules.normalize_inline_nodes(&mut vec![text.as_node()], false);
        assert_eq!(text.data(), " foo ");
    }

    #[test]
    fn test_registered_inline_object() {
        let config = config();
        let mut matcher = Matcher::new("inline_object_elements");
        matcher
            .add(&ElementPattern::name("span").with_class("mention"))
            .unwrap();
        let rules = WhitespaceRules::new(&config, &matcher);
        assert!(rules.is_inline_object(&ViewElement::new("span").with_attribute("class", "mention")));
        assert!(!rules.is_inline_object(&ViewElement::new("span")));
        assert!(rules.is_inline_object(&ViewElement::new("br")));
    }
}
