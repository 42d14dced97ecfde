//! Pattern AST nodes
//!
//! Patterns are used in variable declarations, function parameters, catch
//! clauses and `for-of` heads.

use super::*;
use crate::span::Span;

/// Pattern (for destructuring and binding)
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// Simple identifier: x
    Identifier(Identifier),

    /// Array destructuring: [x, , y = 1]
    Array(ArrayPattern),

    /// Object destructuring: { x, y: z }
    Object(ObjectPattern),
}

impl Pattern {
    pub fn span(&self) -> &Span {
        match self {
            Pattern::Identifier(id) => &id.span,
            Pattern::Array(p) => &p.span,
            Pattern::Object(p) => &p.span,
        }
    }

    /// Check if this pattern is a plain identifier
    pub fn is_identifier(&self) -> bool {
        matches!(self, Pattern::Identifier(_))
    }

    /// Collect every identifier this pattern binds, in source order
    pub fn bound_identifiers(&self) -> Vec<&Identifier> {
        let mut out = Vec::new();
        self.collect_identifiers(&mut out);
        out
    }

    fn collect_identifiers<'a>(&'a self, out: &mut Vec<&'a Identifier>) {
        match self {
            Pattern::Identifier(id) => out.push(id),
            Pattern::Array(array) => {
                for element in array.elements.iter().flatten() {
                    element.pattern.collect_identifiers(out);
                }
            }
            Pattern::Object(object) => {
                for property in &object.properties {
                    property.value.collect_identifiers(out);
                }
            }
        }
    }
}

/// Array destructuring pattern; holes are `None`
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayPattern {
    pub elements: Vec<Option<PatternElement>>,
    pub span: Span,
}

/// One array pattern slot with an optional default
#[derive(Debug, Clone, PartialEq)]
pub struct PatternElement {
    pub pattern: Pattern,
    pub default: Option<Expression>,
}

/// Object destructuring pattern
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPattern {
    pub properties: Vec<ObjectPatternProperty>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPatternProperty {
    pub key: Identifier,
    pub value: Pattern,
    pub default: Option<Expression>,
    pub span: Span,
}
