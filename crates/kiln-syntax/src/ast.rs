//! Abstract Syntax Tree (AST) for kiln source modules.
//!
//! This module defines the tree the compiler core walks:
//! - Module structure
//! - Statements (declarations, control flow, exception handling)
//! - Expressions (literals, operators, calls, functions, classes, suspension)
//! - Patterns (for destructuring)
//!
//! Every node includes a `Span`; nodes that introduce a lexical scope also
//! carry a [`NodeId`](crate::NodeId).

use crate::span::Span;

pub mod expression;
pub mod pattern;
pub mod statement;
pub mod visitor;

pub use expression::*;
pub use pattern::*;
pub use statement::*;
pub use visitor::*;

/// Root node: one source module
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// Module name, used as the root scope identifier
    pub name: String,

    /// Top-level statements
    pub statements: Vec<Statement>,

    /// Span covering the entire module
    pub span: Span,
}

impl Module {
    /// Create a new module
    pub fn new(name: impl Into<String>, statements: Vec<Statement>, span: Span) -> Self {
        Self {
            name: name.into(),
            statements,
            span,
        }
    }

    /// Check if the module is empty
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Get the number of top-level statements
    pub fn len(&self) -> usize {
        self.statements.len()
    }
}

/// Identifier
///
/// Represents a name for a variable, function, class, property or label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

impl Identifier {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}
