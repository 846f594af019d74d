//! Text notation for view trees and selections.
//!
//! Used to write fixtures and to print trees in test failures:
//!
//! ```text
//! <container:p>foo{bar}<attribute:b>[baz]</attribute:b></container:p>
//! ```
//!
//! `{` and `}` mark range boundaries inside text, `[` and `]` mark boundaries
//! between nodes. Elements may carry a kind prefix (`container`, `attribute`,
//! `empty`, `ui`, `raw`).

mod parse;
mod stringify;

pub use parse::{ParseError, ParseErrorKind, ParseOptions, Parsed, parse, parse_with};
pub use stringify::{StringifyOptions, stringify, stringify_node};

pub(crate) const ELEMENT_RANGE_START: char = '[';
pub(crate) const ELEMENT_RANGE_END: char = ']';
pub(crate) const TEXT_RANGE_START: char = '{';
pub(crate) const TEXT_RANGE_END: char = '}';
