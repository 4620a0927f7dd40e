//! # fxom-glue
//!
//! Format-preserving markup layer.
//!
//! ```text
//! source ──▶ lexer (logos, two morphing contexts) ──▶ GlueParser ──▶ GlueDocument
//!                                                                   │
//!                                        GlueSerializer ◀── edits ──┘
//! ```
//!
//! The glue tree keeps whitespace, comments, processing instructions and the
//! original attribute quoting, so documents written back by the editor differ
//! from their source only where they were edited.

pub mod document;
pub mod error;
pub mod escape;
pub mod lexer;
pub mod parser;
pub mod serializer;

pub use document::{
    GlueAttribute, GlueData, GlueDocument, GlueElement, GlueId, GlueInstruction, GlueNode,
    INDENT_UNIT,
};
pub use error::{GlueError, GlueResult, TextSpan};
#[cfg(feature = "pretty-errors")]
pub use error::format_error;
pub use escape::{escape_attribute, escape_text, unescape};
pub use parser::{parse, GlueParser};
pub use serializer::{serialize, serialize_node, GlueSerializer};
