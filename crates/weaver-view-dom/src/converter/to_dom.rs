//! View to host conversion.

use tracing::{trace, warn};
use weaver_view::{ElementKind, RenderWriter, ViewElement, ViewNode, ViewParent};

use super::{DomConverter, ToDomOptions};
use crate::host::HostDom;

impl<H: HostDom> DomConverter<H> {
    /// Host node for a view node.
    ///
    /// Bound elements and fragments are returned as they are, without
    /// touching their children. Text is never bound, so it is always created
    /// fresh with its whitespace protected.
    pub fn view_to_dom(&self, node: &ViewNode, options: ToDomOptions) -> H::Node {
        match node {
            ViewNode::Text(text) => {
                let data = self.with_whitespace(|rules| rules.text_for_host(text));
                self.dom.create_text(&data)
            }
            ViewNode::Fragment(fragment) => {
                if let Some(host) = self.map_view_to_dom(&fragment.as_parent()) {
                    return host;
                }
                let host = self.dom.create_fragment();
                if options.bind {
                    self.bind_document_fragments(&host, fragment);
                }
                if options.with_children {
                    self.append_view_children(&host, &fragment.as_parent(), options);
                }
                host
            }
            ViewNode::Element(element) => {
                if let Some(host) = self.map_view_to_dom(&element.as_parent()) {
                    return host;
                }
                self.element_to_dom(element, options)
            }
        }
    }

    fn element_to_dom(&self, element: &ViewElement, options: ToDomOptions) -> H::Node {
        match element.kind() {
            ElementKind::Ui => {
                let host = if element.is_comment() {
                    self.dom
                        .create_comment(&element.raw_content().unwrap_or_default())
                } else {
                    let host = self.dom.create_element(element.name());
                    for (key, value) in element.attributes() {
                        if let Err(err) = self.dom.set_attribute(&host, &key, &value) {
                            warn!(element = element.name(), %err, "invalid attribute skipped");
                        }
                    }
                    self.render_into(element, &host);
                    host
                };
                if options.bind {
                    self.bind_elements(&host, element);
                }
                host
            }
            ElementKind::Raw
            | ElementKind::Element
            | ElementKind::Container
            | ElementKind::Attribute
            | ElementKind::Empty
            | ElementKind::Editable => {
                let host = if self.safety.should_rename_element(element.name()) {
                    self.safety
                        .create_replacement_element(&self.dom, element.name(), None)
                } else {
                    self.dom.create_element(element.name())
                };

                if element.kind() == ElementKind::Raw {
                    self.render_into(element, &host);
                    self.sanitize_host_subtree(&host);
                }
                if options.bind {
                    self.bind_elements(&host, element);
                }
                for (key, value) in element.attributes() {
                    self.set_dom_element_attribute(&host, &key, &value, Some(element));
                }
                if options.with_children {
                    self.append_view_children(&host, &element.as_parent(), options);
                }
                host
            }
        }
    }

    /// Host nodes for the children of `parent`, block filler included.
    pub fn view_children_to_dom(&self, parent: &ViewParent, options: ToDomOptions) -> Vec<H::Node> {
        let filler_offset = parent.as_element().and_then(ViewElement::filler_offset);
        let children = parent.children();
        let mut nodes = Vec::with_capacity(children.len() + 1);

        for (offset, child) in children.iter().enumerate() {
            if filler_offset == Some(offset) {
                nodes.push(self.create_block_filler());
            }
            nodes.push(self.view_to_dom(child, options));
        }
        if filler_offset == Some(children.len()) {
            nodes.push(self.create_block_filler());
        }
        nodes
    }

    fn append_view_children(&self, host: &H::Node, parent: &ViewParent, options: ToDomOptions) {
        for child in self.view_children_to_dom(parent, options) {
            self.dom.append_child(host, &child);
        }
    }

    fn create_block_filler(&self) -> H::Node {
        trace!(mode = ?self.config.block_filler_mode, "inserting block filler");
        self.config.block_filler_mode.create(&self.dom)
    }

    fn render_into(&self, element: &ViewElement, host: &H::Node) {
        let Some(render) = element.render_fn() else {
            return;
        };
        let mut writer = HostWriter::new(&self.dom, host.clone());
        render(&mut writer);
    }
}

/// [`RenderWriter`] that builds real host nodes under a root element.
pub struct HostWriter<'a, H: HostDom> {
    dom: &'a H,
    root: H::Node,
    open: Vec<H::Node>,
}

impl<'a, H: HostDom> HostWriter<'a, H> {
    pub fn new(dom: &'a H, root: H::Node) -> Self {
        Self {
            dom,
            root,
            open: Vec::new(),
        }
    }

    fn current(&self) -> &H::Node {
        self.open.last().unwrap_or(&self.root)
    }
}

impl<H: HostDom> RenderWriter for HostWriter<'_, H> {
    fn start_element(&mut self, name: &str) {
        let element = self.dom.create_element(name);
        self.dom.append_child(self.current(), &element);
        self.open.push(element);
    }

    fn set_attribute(&mut self, key: &str, value: &str) {
        if let Err(err) = self.dom.set_attribute(self.current(), key, value) {
            warn!(%err, "render callback wrote an invalid attribute");
        }
    }

    fn text(&mut self, data: &str) {
        let text = self.dom.create_text(data);
        self.dom.append_child(self.current(), &text);
    }

    fn comment(&mut self, data: &str) {
        let comment = self.dom.create_comment(data);
        self.dom.append_child(self.current(), &comment);
    }

    fn end_element(&mut self) {
        self.open.pop();
    }
}

#[cfg(test)]
mod tests {
    use weaver_view::{ViewFragment, ViewText};

    use super::*;
    use crate::config::ConverterConfig;
    use crate::filler::BlockFillerMode;
    use crate::memory::MemoryDom;

    fn editing() -> DomConverter<MemoryDom> {
        DomConverter::new(MemoryDom::new(), ConverterConfig::editing()).unwrap()
    }

    fn data() -> DomConverter<MemoryDom> {
        DomConverter::new(MemoryDom::new(), ConverterConfig::data()).unwrap()
    }

    #[test]
    fn test_paragraphs_to_host() {
        let converter = data();
        let fragment = ViewFragment::new()
            .with_children([
                ViewElement::container("p").with_children(["foo"]).unwrap(),
                ViewElement::container("p").with_children(["bar"]).unwrap(),
            ])
            .unwrap();

        let host = converter.view_to_dom(&fragment.as_node(), ToDomOptions::default());
        insta::assert_snapshot!(converter.dom().inner_html(&host), @"<p>foo</p><p>bar</p>");
    }

    #[test]
    fn test_empty_container_gets_filler_per_mode() {
        for (mode, expected) in [
            (BlockFillerMode::Br, r#"<p><br data-cke-filler="true"></p>"#),
            (BlockFillerMode::Nbsp, "<p>&nbsp;</p>"),
            (BlockFillerMode::MarkedNbsp, r#"<p><span data-cke-filler="true">&nbsp;</span></p>"#),
        ] {
            let converter = DomConverter::new(
                MemoryDom::new(),
                ConverterConfig::editing().with_block_filler_mode(mode),
            )
            .unwrap();
            let host =
                converter.view_to_dom(&ViewElement::container("p").as_node(), ToDomOptions::default());
            assert_eq!(converter.dom().outer_html(&host), expected);
        }
    }

    #[test]
    fn test_bound_element_is_reused() {
        let converter = editing();
        let p = ViewElement::container("p").with_children(["x"]).unwrap();
        let first = converter.view_to_dom(&p.as_node(), ToDomOptions::bound());
        let second = converter.view_to_dom(&p.as_node(), ToDomOptions::default());
        assert_eq!(first, second);
        assert_eq!(converter.map_view_to_dom(&p.as_parent()), Some(first));
    }

    #[test]
    fn test_shallow_conversion() {
        let converter = editing();
        let p = ViewElement::container("p")
            .with_attribute("class", "a")
            .with_children(["x"])
            .unwrap();
        let options = ToDomOptions {
            with_children: false,
            ..ToDomOptions::default()
        };
        let host = converter.view_to_dom(&p.as_node(), options);
        insta::assert_snapshot!(converter.dom().outer_html(&host), @r#"<p class="a"></p>"#);
    }

    #[test]
    fn test_unsafe_content_is_quarantined_when_editing() {
        let converter = editing();
        let div = ViewElement::container("div")
            .with_children([
                ViewElement::new("a")
                    .with_attribute("href", "javascript:alert(1)")
                    .with_children(["x"])
                    .unwrap()
                    .as_node(),
                ViewElement::new("script").with_children(["y"]).unwrap().as_node(),
            ])
            .unwrap();

        let host = converter.view_to_dom(&div.as_node(), ToDomOptions::default());
        insta::assert_snapshot!(
            converter.dom().outer_html(&host),
            @r#"<div><a data-ck-unsafe-attribute-href="javascript:alert(1)">x</a><span data-ck-unsafe-element="script">y</span></div>"#
        );

        let host = data().view_to_dom(&div.as_node(), ToDomOptions::default());
        insta::assert_snapshot!(
            data().dom().outer_html(&host),
            @r#"<div><a href="javascript:alert(1)">x</a><script>y</script></div>"#
        );
    }

    #[test]
    fn test_ui_element_renders_through_callback() {
        let converter = editing();
        let ui = ViewElement::ui("span", |writer| {
            writer.set_attribute("contenteditable", "false");
            writer.start_element("b");
            writer.set_attribute("class", "label");
            writer.text("hi");
            writer.end_element();
        })
        .with_attribute("class", "widget");

        let host = converter.view_to_dom(&ui.as_node(), ToDomOptions::bound());
        insta::assert_snapshot!(
            converter.dom().outer_html(&host),
            @r#"<span class="widget" contenteditable="false"><b class="label">hi</b></span>"#
        );
        assert_eq!(converter.map_dom_to_view(&host), Some(ui.as_parent()));
    }

    #[test]
    fn test_raw_element_output_is_sanitized_when_editing() {
        let converter = editing();
        let raw = ViewElement::raw("div", |writer| {
            writer.start_element("img");
            writer.set_attribute("onerror", "x()");
            writer.end_element();
        });
        let host = converter.view_to_dom(&raw.as_node(), ToDomOptions::default());
        insta::assert_snapshot!(
            converter.dom().outer_html(&host),
            @r#"<div><img data-ck-unsafe-attribute-onerror="x()"></div>"#
        );
    }

    #[test]
    fn test_comment_element_to_host_comment() {
        let converter = data();
        let p = ViewElement::container("p")
            .with_children([ViewElement::comment(" note ").as_node(), ViewText::new("x").as_node()])
            .unwrap();
        let host = converter.view_to_dom(&p.as_node(), ToDomOptions::default());
        insta::assert_snapshot!(converter.dom().outer_html(&host), @"<p><!-- note -->x</p>");
    }

    #[test]
    fn test_allowed_unsafe_attribute_renders() {
        let converter = editing();
        let div = ViewElement::new("div").with_attribute("onclick", "go()");
        div.allow_unsafe_attribute("onclick");
        let host = converter.view_to_dom(&div.as_node(), ToDomOptions::default());
        insta::assert_snapshot!(converter.dom().outer_html(&host), @r#"<div onclick="go()"></div>"#);
    }

    #[test]
    fn test_text_whitespace_is_protected() {
        let converter = data();
        let p = ViewElement::container("p").with_children([" a  b "]).unwrap();
        let host = converter.view_to_dom(&p.as_node(), ToDomOptions::default());
        insta::assert_snapshot!(converter.dom().outer_html(&host), @"<p>&nbsp;a &nbsp;b&nbsp;</p>");
    }
}
