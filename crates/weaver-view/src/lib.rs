//! weaver-view: the editor's platform-independent view tree.
//!
//! This crate provides:
//! - `ViewNode` handles (text, element, fragment) with identity equality
//! - `ViewPosition` / `ViewRange` / `ViewSelection`
//! - The `RenderWriter` capability used by UI and raw elements
//! - A text notation for fixtures (`dev` feature)

#[cfg(feature = "dev")]
pub mod dev;
mod filler_offset;
pub mod node;
pub mod position;
pub mod render;

pub use node::{
    Ancestors, COMMENT_ELEMENT_NAME, ElementKind, FillerOffsetFn, RAW_CONTENT_PROPERTY,
    TreeError, ViewElement, ViewFragment, ViewNode, ViewNodeId, ViewParent, ViewText,
    WeakViewParent,
};
pub use position::{ViewPosition, ViewRange, ViewSelection};
pub use render::{MarkupWriter, RenderFn, RenderWriter, escape_attribute, escape_text};
pub use smol_str::SmolStr;
