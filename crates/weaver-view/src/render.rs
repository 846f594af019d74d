//! Render capability for opaque view elements.
//!
//! UI and raw elements do not convert their children. Instead they carry a
//! callback that writes host content through a [`RenderWriter`]. The writer is
//! supplied by whoever renders: the host converter writes real host nodes, the
//! dev notation writes markup.

use std::rc::Rc;

use smol_str::SmolStr;

/// Builder interface a render callback writes host content through.
///
/// Calls nest like markup: `start_element` opens a child of the current
/// element, `end_element` closes it. `set_attribute` applies to the most
/// recently opened element, or to the rendering element itself when nothing
/// is open.
pub trait RenderWriter {
    fn start_element(&mut self, name: &str);
    fn set_attribute(&mut self, key: &str, value: &str);
    fn text(&mut self, data: &str);
    fn comment(&mut self, data: &str);
    fn end_element(&mut self);
}

/// Shared render callback stored on UI and raw elements.
pub type RenderFn = Rc<dyn Fn(&mut dyn RenderWriter)>;

/// Writes rendered content as markup.
#[derive(Debug, Default)]
pub struct MarkupWriter {
    out: String,
    open: Vec<SmolStr>,
    tag_pending: bool,
}

impl MarkupWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn close_pending_tag(&mut self) {
        if self.tag_pending {
            self.out.push('>');
            self.tag_pending = false;
        }
    }

    /// Close anything still open and return the markup.
    pub fn finish(mut self) -> String {
        while !self.open.is_empty() {
            self.end_element();
        }
        self.out
    }
}

impl RenderWriter for MarkupWriter {
    fn start_element(&mut self, name: &str) {
        self.close_pending_tag();
        self.out.push('<');
        self.out.push_str(name);
        self.open.push(SmolStr::new(name));
        self.tag_pending = true;
    }

    fn set_attribute(&mut self, key: &str, value: &str) {
        // Attributes of the rendering element itself are not part of its content.
        if !self.tag_pending {
            return;
        }
        self.out.push(' ');
        self.out.push_str(key);
        self.out.push_str("=\"");
        self.out.push_str(&escape_attribute(value));
        self.out.push('"');
    }

    fn text(&mut self, data: &str) {
        self.close_pending_tag();
        self.out.push_str(&escape_text(data));
    }

    fn comment(&mut self, data: &str) {
        self.close_pending_tag();
        self.out.push_str("<!--");
        self.out.push_str(data);
        self.out.push_str("-->");
    }

    fn end_element(&mut self) {
        let Some(name) = self.open.pop() else {
            return;
        };
        self.close_pending_tag();
        self.out.push_str("</");
        self.out.push_str(&name);
        self.out.push('>');
    }
}

/// Escape text content the way HTML serializers do.
pub fn escape_text(data: &str) -> String {
    let mut out = String::with_capacity(data.len());
    for c in data.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
    out
}

/// Escape a double-quoted attribute value the way HTML serializers do.
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
    out
}
