//! Notation to view tree.
//!
//! Parsing runs in two passes. The markup pass builds elements and text nodes
//! with the range brackets still inside the text. The range pass then strips
//! the brackets, turning each one into a position, and pairs them into ranges.

use std::collections::HashMap;

use miette::{Diagnostic, SourceSpan};
use smol_str::SmolStr;
use thiserror::Error;
use tracing::trace;

use crate::node::{ElementKind, ViewElement, ViewFragment, ViewNode, ViewNodeId, ViewParent, ViewText};
use crate::position::{ViewPosition, ViewRange, ViewSelection};

use super::{ELEMENT_RANGE_END, ELEMENT_RANGE_START, TEXT_RANGE_END, TEXT_RANGE_START};

/// Knobs for [`parse_with`].
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Treat `[` `]` inside text as text positions.
    pub same_selection_characters: bool,
    /// Make the resulting selection backward.
    pub last_range_backward: bool,
    /// 1-based target index of each range, in document order.
    pub order: Vec<usize>,
    /// Drop comments instead of turning them into comment elements.
    pub skip_comments: bool,
}

/// Result of parsing notation.
#[derive(Debug, Clone)]
pub struct Parsed {
    /// A single top-level node, or a fragment holding several.
    pub view: ViewNode,
    /// Present when the notation contained any range brackets.
    pub selection: Option<ViewSelection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("unknown element type `{0}`")]
    UnknownNamespace(SmolStr),
    #[error("malformed tag")]
    MalformedTag,
    #[error("closing tag `{found}` does not match open element `{expected}`")]
    MismatchedClosingTag { expected: SmolStr, found: SmolStr },
    #[error("closing tag `{0}` has no open element")]
    UnexpectedClosingTag(SmolStr),
    #[error("element `{0}` is never closed")]
    UnclosedElement(SmolStr),
    #[error("comment is never closed")]
    UnterminatedComment,
    #[error("`{0}` elements cannot contain children")]
    ChildrenNotAllowed(SmolStr),
    #[error("range end `{0}` has no matching start")]
    RangeEndWithoutStart(char),
    #[error("range start `{0}` opened inside another range")]
    NestedRangeStart(char),
    #[error("range is never closed")]
    UnclosedRange,
    #[error("`{0}` can only be placed at the start or end of a text")]
    ElementDelimiterInsideText(char),
    #[error("`{0}` cannot mark a position inside text that is otherwise empty")]
    TextDelimiterInEmptyText(char),
    #[error("range order lists {found} entries but there are {expected} ranges")]
    RangeOrderMismatch { expected: usize, found: usize },
    #[error("range order must be a permutation of 1..={0}")]
    InvalidRangeOrder(usize),
}

/// Notation that could not be parsed.
#[derive(Debug, Error, Diagnostic)]
#[error("{kind}")]
#[diagnostic(code(weaver_view::dev::parse))]
pub struct ParseError {
    kind: ParseErrorKind,
    #[source_code]
    src: String,
    #[label("here")]
    span: SourceSpan,
}

impl ParseError {
    fn new(kind: ParseErrorKind, src: &str, span: impl Into<SourceSpan>) -> Self {
        Self {
            kind,
            src: src.to_string(),
            span: span.into(),
        }
    }

    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    pub fn span(&self) -> SourceSpan {
        self.span
    }
}

/// Parse notation with default options.
pub fn parse(data: &str) -> Result<Parsed, ParseError> {
    parse_with(data, &ParseOptions::default())
}

/// Parse notation into a view tree and an optional selection.
///
/// A lone top-level node is returned on its own. Without a selection it is
/// also detached from the temporary fragment it was parsed into.
pub fn parse_with(data: &str, options: &ParseOptions) -> Result<Parsed, ParseError> {
    let mut markup = MarkupParser {
        src: data,
        pos: 0,
        skip_comments: options.skip_comments,
        text_spans: HashMap::new(),
    };
    let fragment = markup.parse()?;

    let mut ranges = RangeParser {
        src: data,
        same_selection_characters: options.same_selection_characters,
        text_spans: &markup.text_spans,
        positions: Vec::new(),
    };
    ranges.collect(&fragment.as_node())?;
    let ranges = ranges.into_ranges()?;
    let ranges = apply_order(data, ranges, &options.order)?;

    let view = match fragment.child_count() {
        1 => fragment.child(0).unwrap_or_else(|| fragment.as_node()),
        _ => fragment.as_node(),
    };

    if ranges.is_empty() {
        if !matches!(view, ViewNode::Fragment(_)) {
            view.remove();
        }
        return Ok(Parsed {
            view,
            selection: None,
        });
    }

    trace!(ranges = ranges.len(), "parsed selection");
    Ok(Parsed {
        view,
        selection: Some(ViewSelection::new(ranges, options.last_range_backward)),
    })
}

struct MarkupParser<'a> {
    src: &'a str,
    pos: usize,
    skip_comments: bool,
    text_spans: HashMap<ViewNodeId, (usize, usize)>,
}

struct OpenElement {
    element: ViewElement,
    tag: SmolStr,
    start: usize,
}

impl MarkupParser<'_> {
    fn error(&self, kind: ParseErrorKind, start: usize, len: usize) -> ParseError {
        ParseError::new(kind, self.src, (start, len))
    }

    fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    fn parse(&mut self) -> Result<ViewFragment, ParseError> {
        let fragment = ViewFragment::new();
        let mut stack: Vec<OpenElement> = Vec::new();

        while self.pos < self.src.len() {
            let start = self.pos;
            let current = stack
                .last()
                .map(|open| open.element.as_parent())
                .unwrap_or_else(|| fragment.as_parent());

            if self.rest().starts_with("<!--") {
                let body = &self.rest()[4..];
                let Some(end) = body.find("-->") else {
                    return Err(self.error(ParseErrorKind::UnterminatedComment, start, 4));
                };
                let data = body[..end].to_string();
                self.pos += 4 + end + 3;
                if !self.skip_comments {
                    self.append(&current, ViewElement::comment(data).as_node(), start)?;
                }
            } else if self.rest().starts_with("</") {
                let body = &self.rest()[2..];
                let Some(end) = body.find('>') else {
                    return Err(self.error(ParseErrorKind::MalformedTag, start, self.rest().len()));
                };
                let tag = SmolStr::new(body[..end].trim());
                self.pos += 2 + end + 1;
                match stack.pop() {
                    None => {
                        return Err(self.error(
                            ParseErrorKind::UnexpectedClosingTag(tag),
                            start,
                            self.pos - start,
                        ));
                    }
                    Some(open) if open.tag != tag => {
                        return Err(self.error(
                            ParseErrorKind::MismatchedClosingTag {
                                expected: open.tag,
                                found: tag,
                            },
                            start,
                            self.pos - start,
                        ));
                    }
                    Some(_) => {}
                }
            } else if self.rest().starts_with('<') {
                let (tag, element, self_closing) = self.open_tag()?;
                self.append(&current, element.as_node(), start)?;
                if !self_closing {
                    stack.push(OpenElement {
                        element,
                        tag,
                        start,
                    });
                }
            } else {
                let end = self.rest().find('<').unwrap_or(self.rest().len());
                let raw = &self.rest()[..end];
                let text = ViewText::new(unescape(raw));
                self.text_spans.insert(text.id(), (start, end));
                self.pos += end;
                self.append(&current, text.as_node(), start)?;
            }
        }

        if let Some(open) = stack.pop() {
            return Err(self.error(
                ParseErrorKind::UnclosedElement(open.tag),
                open.start,
                1,
            ));
        }

        Ok(fragment)
    }

    fn append(&self, parent: &ViewParent, node: ViewNode, start: usize) -> Result<(), ParseError> {
        parent.append_child(node).map_err(|_| {
            let name = parent
                .as_element()
                .map(|element| SmolStr::new(element.name()))
                .unwrap_or_default();
            self.error(ParseErrorKind::ChildrenNotAllowed(name), start, self.pos - start)
        })
    }

    /// Parse `<name attr="value" ...>` or its self-closing form.
    fn open_tag(&mut self) -> Result<(SmolStr, ViewElement, bool), ParseError> {
        let start = self.pos;
        self.pos += 1;

        let tag = self.read_name();
        if tag.is_empty() {
            return Err(self.error(ParseErrorKind::MalformedTag, start, 1));
        }
        let element = self.create_element(&tag, start)?;

        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return Err(self.error(ParseErrorKind::MalformedTag, start, self.pos - start));
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                return Ok((tag, element, true));
            }
            if rest.starts_with('>') {
                self.pos += 1;
                return Ok((tag, element, false));
            }

            let key = self.read_name();
            if key.is_empty() {
                return Err(self.error(ParseErrorKind::MalformedTag, start, self.pos - start + 1));
            }
            self.skip_whitespace();
            let value = if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                self.read_quoted()
                    .ok_or_else(|| self.error(ParseErrorKind::MalformedTag, start, self.pos - start))?
            } else {
                String::new()
            };
            element.set_attribute(key, value);
        }
    }

    fn create_element(&self, tag: &str, start: usize) -> Result<ViewElement, ParseError> {
        match tag.split_once(':') {
            Some((prefix, name)) => {
                let kind = ElementKind::from_notation_type(prefix).ok_or_else(|| {
                    self.error(
                        ParseErrorKind::UnknownNamespace(SmolStr::new(prefix)),
                        start + 1,
                        prefix.len(),
                    )
                })?;
                if name.is_empty() || name.contains(':') {
                    return Err(self.error(ParseErrorKind::MalformedTag, start, tag.len() + 1));
                }
                Ok(ViewElement::with_kind(kind, name))
            }
            None => Ok(ViewElement::new(tag)),
        }
    }

    fn read_name(&mut self) -> SmolStr {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '/' | '>' | '=' | '"' | '\'' | '<'))
            .unwrap_or(rest.len());
        let name = SmolStr::new(&rest[..end]);
        self.pos += end;
        name
    }

    fn read_quoted(&mut self) -> Option<String> {
        let rest = self.rest();
        let quote = rest.chars().next().filter(|c| matches!(c, '"' | '\''))?;
        let body = &rest[1..];
        let end = body.find(quote)?;
        let value = unescape(&body[..end]);
        self.pos += 1 + end + 1;
        Some(value)
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }
}

/// Unescape the character references the notation writer produces, plus
/// numeric ones. Anything else is kept verbatim.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{00A0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, semi + 1))
        });
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_text_bracket(bracket: char) -> bool {
    matches!(bracket, TEXT_RANGE_START | TEXT_RANGE_END)
}

fn is_start_bracket(bracket: char) -> bool {
    matches!(bracket, ELEMENT_RANGE_START | TEXT_RANGE_START)
}

struct RangeParser<'a> {
    src: &'a str,
    same_selection_characters: bool,
    text_spans: &'a HashMap<ViewNodeId, (usize, usize)>,
    positions: Vec<(char, ViewPosition, (usize, usize))>,
}

impl RangeParser<'_> {
    fn error(&self, kind: ParseErrorKind, span: (usize, usize)) -> ParseError {
        ParseError::new(kind, self.src, span)
    }

    fn collect(&mut self, node: &ViewNode) -> Result<(), ParseError> {
        match node {
            ViewNode::Element(_) | ViewNode::Fragment(_) => {
                if let Some(parent) = node.as_parent() {
                    for child in parent.children() {
                        self.collect(&child)?;
                    }
                }
                Ok(())
            }
            ViewNode::Text(text) => self.collect_from_text(text),
        }
    }

    fn collect_from_text(&mut self, text: &ViewText) -> Result<(), ParseError> {
        let span = self.text_spans.get(&text.id()).copied().unwrap_or((0, 0));
        let mut brackets = Vec::new();
        let mut cleaned = String::new();
        let mut offset = 0;
        for c in text.data().chars() {
            if matches!(
                c,
                ELEMENT_RANGE_START | ELEMENT_RANGE_END | TEXT_RANGE_START | TEXT_RANGE_END
            ) {
                brackets.push((c, offset));
            } else {
                cleaned.push(c);
                offset += 1;
            }
        }
        if brackets.is_empty() {
            return Ok(());
        }

        let node = text.as_node();
        let (Some(parent), Some(index)) = (node.parent(), node.index()) else {
            return Ok(());
        };
        let len = offset;
        text.set_data(cleaned.as_str());
        if cleaned.is_empty() {
            node.remove();
        }

        for (bracket, offset) in brackets {
            let position = if cleaned.is_empty() {
                if !self.same_selection_characters && is_text_bracket(bracket) {
                    return Err(self.error(ParseErrorKind::TextDelimiterInEmptyText(bracket), span));
                }
                ViewPosition::new(parent.clone(), index)
            } else if self.same_selection_characters || is_text_bracket(bracket) {
                ViewPosition::new(text.clone(), offset)
            } else if offset == 0 {
                ViewPosition::new(parent.clone(), index)
            } else if offset == len {
                ViewPosition::new(parent.clone(), index + 1)
            } else {
                return Err(self.error(ParseErrorKind::ElementDelimiterInsideText(bracket), span));
            };
            self.positions.push((bracket, position, span));
        }
        Ok(())
    }

    fn into_ranges(self) -> Result<Vec<ViewRange>, ParseError> {
        let mut ranges = Vec::new();
        let mut open: Option<(ViewPosition, (usize, usize))> = None;

        for (bracket, position, span) in &self.positions {
            if is_start_bracket(*bracket) {
                if open.is_some() {
                    return Err(self.error(ParseErrorKind::NestedRangeStart(*bracket), *span));
                }
                open = Some((position.clone(), *span));
            } else {
                let Some((start, _)) = open.take() else {
                    return Err(self.error(ParseErrorKind::RangeEndWithoutStart(*bracket), *span));
                };
                ranges.push(ViewRange::new(start, position.clone()));
            }
        }

        if let Some((_, span)) = open {
            return Err(self.error(ParseErrorKind::UnclosedRange, span));
        }
        Ok(ranges)
    }
}

fn apply_order(
    src: &str,
    ranges: Vec<ViewRange>,
    order: &[usize],
) -> Result<Vec<ViewRange>, ParseError> {
    if order.is_empty() {
        return Ok(ranges);
    }
    let whole = (0, src.len());
    if order.len() != ranges.len() {
        return Err(ParseError::new(
            ParseErrorKind::RangeOrderMismatch {
                expected: ranges.len(),
                found: order.len(),
            },
            src,
            whole,
        ));
    }

    let count = ranges.len();
    let mut sorted: Vec<Option<ViewRange>> = vec![None; count];
    for (range, &target) in ranges.into_iter().zip(order) {
        let slot = target
            .checked_sub(1)
            .and_then(|index| sorted.get_mut(index))
            .filter(|slot| slot.is_none())
            .ok_or_else(|| ParseError::new(ParseErrorKind::InvalidRangeOrder(count), src, whole))?;
        *slot = Some(range);
    }
    Ok(sorted.into_iter().flatten().collect())
}
