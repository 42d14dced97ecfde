//! Expression AST nodes
//!
//! This module defines all expression types, including:
//! - Literal expressions (numbers, strings, booleans, arrays, objects)
//! - Unary, update and binary operations
//! - Function calls, construction and member access
//! - Function, arrow and class expressions
//! - Suspension: yield, yield* and await

use super::*;
use crate::span::Span;

/// Expression (produces a value)
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Number literal: 42, 3.14
    NumberLiteral(NumberLiteral),

    /// String literal: "hello"
    StringLiteral(StringLiteral),

    /// Boolean literal: true, false
    BooleanLiteral(BooleanLiteral),

    /// Null literal
    NullLiteral(Span),

    /// The `undefined` value
    UndefinedLiteral(Span),

    /// Identifier
    Identifier(Identifier),

    /// This expression: this
    This(Span),

    /// Array literal: [1, 2, 3]
    Array(ArrayExpression),

    /// Object literal: { x: 1, y: 2 }
    Object(ObjectExpression),

    /// Unary expression: !x, -y, typeof z
    Unary(UnaryExpression),

    /// Update expression: ++x, x--
    Update(UpdateExpression),

    /// Binary expression: x + y, a * b
    Binary(BinaryExpression),

    /// Logical expression: x && y, a || b, c ?? d
    Logical(LogicalExpression),

    /// Assignment: x = 42, y += 1
    Assignment(AssignmentExpression),

    /// Ternary: x ? y : z
    Conditional(ConditionalExpression),

    /// Function call: foo(1, 2, 3)
    Call(CallExpression),

    /// New expression: new Point(1, 2)
    New(NewExpression),

    /// Member access: obj.prop
    Member(MemberExpression),

    /// Index access: arr[0]
    Index(IndexExpression),

    /// Function or arrow expression
    Function(Box<Function>),

    /// Class expression
    Class(Box<Class>),

    /// Yield expression: yield x, yield* inner
    Yield(YieldExpression),

    /// Await expression: await promise
    Await(AwaitExpression),

    /// Comma sequence: (a, b, c)
    Sequence(SequenceExpression),
}

impl Expression {
    /// Get the span of this expression
    pub fn span(&self) -> &Span {
        match self {
            Expression::NumberLiteral(e) => &e.span,
            Expression::StringLiteral(e) => &e.span,
            Expression::BooleanLiteral(e) => &e.span,
            Expression::NullLiteral(span) => span,
            Expression::UndefinedLiteral(span) => span,
            Expression::Identifier(e) => &e.span,
            Expression::This(span) => span,
            Expression::Array(e) => &e.span,
            Expression::Object(e) => &e.span,
            Expression::Unary(e) => &e.span,
            Expression::Update(e) => &e.span,
            Expression::Binary(e) => &e.span,
            Expression::Logical(e) => &e.span,
            Expression::Assignment(e) => &e.span,
            Expression::Conditional(e) => &e.span,
            Expression::Call(e) => &e.span,
            Expression::New(e) => &e.span,
            Expression::Member(e) => &e.span,
            Expression::Index(e) => &e.span,
            Expression::Function(e) => &e.span,
            Expression::Class(e) => &e.span,
            Expression::Yield(e) => &e.span,
            Expression::Await(e) => &e.span,
            Expression::Sequence(e) => &e.span,
        }
    }

    /// Check if this expression is a literal
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Expression::NumberLiteral(_)
                | Expression::StringLiteral(_)
                | Expression::BooleanLiteral(_)
                | Expression::NullLiteral(_)
                | Expression::UndefinedLiteral(_)
        )
    }

    /// Check if this expression is a simple identifier
    pub fn is_identifier(&self) -> bool {
        matches!(self, Expression::Identifier(_))
    }

    /// Check if this expression creates a function or class value, the
    /// cases where an enclosing assignment target names the new scope
    pub fn is_anonymous_definition(&self) -> bool {
        match self {
            Expression::Function(func) => func.name.is_none(),
            Expression::Class(class) => class.name.is_none(),
            _ => false,
        }
    }
}

// ============================================================================
// Literal Expressions
// ============================================================================

/// Number literal: 42, 3.14, 1e10
#[derive(Debug, Clone, PartialEq)]
pub struct NumberLiteral {
    pub value: f64,
    pub span: Span,
}

/// String literal: "hello"
#[derive(Debug, Clone, PartialEq)]
pub struct StringLiteral {
    pub value: String,
    pub span: Span,
}

/// Boolean literal: true, false
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanLiteral {
    pub value: bool,
    pub span: Span,
}

// ============================================================================
// Array and Object Expressions
// ============================================================================

/// Array expression: [1, 2, 3]
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayExpression {
    pub elements: Vec<Expression>,
    pub span: Span,
}

/// Object expression: { x: 1, y: 2 }
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectExpression {
    pub properties: Vec<Property>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: Identifier,
    pub value: Expression,
    pub span: Span,
}

// ============================================================================
// Unary & Binary Expressions
// ============================================================================

/// Unary expression: !x, -y
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    pub operator: UnaryOperator,
    pub operand: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,       // +x
    Minus,      // -x
    Not,        // !x
    BitwiseNot, // ~x
    Typeof,     // typeof x
    Void,       // void x
}

/// Update expression: ++x, x--
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateExpression {
    pub operator: UpdateOperator,
    pub prefix: bool,
    pub argument: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOperator {
    Increment, // ++
    Decrement, // --
}

/// Binary expression: x + y, a * b
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    pub operator: BinaryOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,      // +
    Subtract, // -
    Multiply, // *
    Divide,   // /
    Modulo,   // %
    Exponent, // **

    // Comparison
    Equal,          // ==
    NotEqual,       // !=
    StrictEqual,    // ===
    StrictNotEqual, // !==
    LessThan,       // <
    LessEqual,      // <=
    GreaterThan,    // >
    GreaterEqual,   // >=

    // Bitwise
    BitwiseAnd,         // &
    BitwiseOr,          // |
    BitwiseXor,         // ^
    LeftShift,          // <<
    RightShift,         // >>
    UnsignedRightShift, // >>>

    // Relational
    InstanceOf, // instanceof
}

/// Logical expression: x && y, a || b
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalExpression {
    pub operator: LogicalOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,               // &&
    Or,                // ||
    NullishCoalescing, // ??
}

/// Assignment expression: x = 42, y += 1
///
/// The target is an identifier, member or index expression.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentExpression {
    pub operator: AssignmentOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOperator {
    Assign,    // =
    AddAssign, // +=
    SubAssign, // -=
    MulAssign, // *=
    DivAssign, // /=
    ModAssign, // %=
}

impl AssignmentOperator {
    /// The binary operator a compound assignment applies, if any
    pub fn binary_operator(&self) -> Option<BinaryOperator> {
        match self {
            AssignmentOperator::Assign => None,
            AssignmentOperator::AddAssign => Some(BinaryOperator::Add),
            AssignmentOperator::SubAssign => Some(BinaryOperator::Subtract),
            AssignmentOperator::MulAssign => Some(BinaryOperator::Multiply),
            AssignmentOperator::DivAssign => Some(BinaryOperator::Divide),
            AssignmentOperator::ModAssign => Some(BinaryOperator::Modulo),
        }
    }
}

// ============================================================================
// Complex Expressions
// ============================================================================

/// Conditional (ternary): x ? y : z
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExpression {
    pub test: Box<Expression>,
    pub consequent: Box<Expression>,
    pub alternate: Box<Expression>,
    pub span: Span,
}

/// Function call: foo(1, 2, 3), obj.method(x)
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    pub callee: Box<Expression>,
    pub arguments: Vec<Expression>,
    pub span: Span,
}

/// New expression: new Point(1, 2)
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpression {
    pub callee: Box<Expression>,
    pub arguments: Vec<Expression>,
    pub span: Span,
}

/// Member access: obj.prop
#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpression {
    pub object: Box<Expression>,
    pub property: Identifier,
    pub span: Span,
}

/// Index access: arr[0]
#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpression {
    pub object: Box<Expression>,
    pub index: Box<Expression>,
    pub span: Span,
}

/// Yield expression: `yield value` or delegating `yield* iterable`
#[derive(Debug, Clone, PartialEq)]
pub struct YieldExpression {
    pub argument: Option<Box<Expression>>,
    pub delegate: bool,
    pub span: Span,
}

/// Await expression: await promise
#[derive(Debug, Clone, PartialEq)]
pub struct AwaitExpression {
    pub argument: Box<Expression>,
    pub span: Span,
}

/// Comma sequence
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceExpression {
    pub expressions: Vec<Expression>,
    pub span: Span,
}
