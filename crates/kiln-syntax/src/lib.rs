//! Kiln syntax tree
//!
//! The abstract syntax tree consumed by the kiln compiler core. Parsing is
//! someone else's job: embedders construct trees directly (see [`build`]) or
//! translate them from their own parser's output.

#![warn(missing_docs)]

pub mod ast;
pub mod build;
pub mod span;

pub use span::{NodeId, Span};
