//! Host document layer for the weaver view tree.
//!
//! This crate converts between `weaver-view` trees and a host document,
//! generic over any [`HostDom`] implementation. [`MemoryDom`] is the
//! in-memory host used by tests and non-browser embeddings.
//!
//! # Architecture
//!
//! - `converter`: view ↔ host nodes, positions, ranges and selections
//! - `binding`: weak view ↔ host binding tables and fake selections
//! - `filler`: block and inline fillers
//! - `whitespace`: whitespace protection and collapsing
//! - `safety`: attribute and element quarantine in editing mode
//! - `html`: markup parsing and serialization for any host
//! - `matcher`, `config`: converter configuration
//!
//! # Re-exports
//!
//! This crate re-exports `weaver-view` for convenience, so consumers only
//! need to depend on `weaver-view-dom`.

pub use weaver_view;

pub mod binding;
pub mod config;
pub mod converter;
pub mod error;
pub mod filler;
pub mod host;
pub mod html;
pub mod matcher;
pub mod memory;
pub mod safety;
pub mod whitespace;

pub use binding::BindingTables;
pub use config::{ConverterConfig, RenderingMode};
pub use converter::{DomConverter, HostWriter, ToDomOptions, ToViewOptions};
pub use error::{ConfigError, HostError};
pub use filler::{BlockFillerMode, INLINE_FILLER, INLINE_FILLER_LENGTH, NBSP};
pub use host::{HostDom, HostNodeId, HostNodeType, HostPosition, HostRange, HostSelection};
pub use matcher::{ElementPattern, Matcher};
pub use memory::{MemoryDom, MemoryNode};
pub use safety::SafetyFilter;
pub use whitespace::WhitespaceRules;
