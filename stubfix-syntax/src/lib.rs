//! Lossless concrete syntax tree for Python type-stub files.
//!
//! The tree only models what a stub patcher edits: classes, function signatures, decorators,
//! `from ... import ...` statements and top-level assignments. Every other statement is kept as
//! raw text. Rendering an unedited tree reproduces the input byte for byte.
//!
//! Nodes live in an arena owned by [`StubModule`] and are addressed by [`NodeId`]. Ids are
//! assigned at parse time and stay valid across removals and insertions, so callers can record
//! edit targets before the tree changes.

mod annotation;
mod parse;
mod print;
mod scan;
mod tree;

pub use annotation::canonical_annotation;
pub use parse::{ParseError, parse_module};
pub use tree::{
    Annotation, ClassDef, Decorator, FunctionDef, ImportFrom, ImportName, LineSpan, Node, NodeId,
    NodeKind, Param, ParamKind, ParamList, Returns, Statement, StubModule, Suite, Trailing,
};
