//! Document tree and JSON envelope.
//!
//! This module defines the contract between:
//! 1) parsing HTML -> `Page` (a tree of [`DocumentNode`]s), and
//! 2) rendering `Page` -> Markdown.
//!
//! The tree only keeps what the renderer needs: a closed [`NodeRole`], leaf
//! text, attributes and ordered children.

mod diagnostic;
mod envelope;
mod nodes;

pub use diagnostic::*;
pub use envelope::*;
pub use nodes::*;

/// JSON schema version for the page envelope.
///
/// Bump this when making non-backwards-compatible changes to the JSON structure.
pub const SCHEMA_VERSION: u32 = 1;

/// The generator name stored in the JSON envelope.
pub const GENERATOR_NAME: &str = "guide2md";

/// The generator version stored in the JSON envelope.
pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");
