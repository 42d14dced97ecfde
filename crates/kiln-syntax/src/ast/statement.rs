//! Statement AST nodes
//!
//! This module defines all statement types, including:
//! - Variable declarations (var, let, const)
//! - Function and class declarations
//! - Control flow statements (if, switch, while, for, for-of, for-in,
//!   labeled jumps)
//! - Exception handling (throw, try/catch/finally)

use super::*;
use crate::span::{NodeId, Span};

/// Top-level or block-level statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Variable declaration: var/let/const
    VariableDecl(VariableDecl),

    /// Function declaration (hoisted)
    FunctionDecl(Function),

    /// Class declaration
    ClassDecl(Class),

    /// Expression statement (e.g., function call)
    Expression(ExpressionStatement),

    /// If statement
    If(IfStatement),

    /// While loop
    While(WhileStatement),

    /// Do-while loop
    DoWhile(DoWhileStatement),

    /// For loop
    For(ForStatement),

    /// For-of loop
    ForOf(ForOfStatement),

    /// For-in loop over enumerable keys
    ForIn(ForInStatement),

    /// Switch statement
    Switch(SwitchStatement),

    /// Break statement
    Break(BreakStatement),

    /// Continue statement
    Continue(ContinueStatement),

    /// Return statement
    Return(ReturnStatement),

    /// Throw statement
    Throw(ThrowStatement),

    /// Try-catch-finally
    Try(TryStatement),

    /// Block statement: { ... }
    Block(BlockStatement),

    /// Labeled statement: outer: for (...) { ... }
    Labeled(LabeledStatement),

    /// Empty statement (;)
    Empty(Span),
}

impl Statement {
    /// Get the span of this statement
    pub fn span(&self) -> &Span {
        match self {
            Statement::VariableDecl(s) => &s.span,
            Statement::FunctionDecl(s) => &s.span,
            Statement::ClassDecl(s) => &s.span,
            Statement::Expression(s) => &s.span,
            Statement::If(s) => &s.span,
            Statement::While(s) => &s.span,
            Statement::DoWhile(s) => &s.span,
            Statement::For(s) => &s.span,
            Statement::ForOf(s) => &s.span,
            Statement::ForIn(s) => &s.span,
            Statement::Switch(s) => &s.span,
            Statement::Break(s) => &s.span,
            Statement::Continue(s) => &s.span,
            Statement::Return(s) => &s.span,
            Statement::Throw(s) => &s.span,
            Statement::Try(s) => &s.span,
            Statement::Block(s) => &s.span,
            Statement::Labeled(s) => &s.span,
            Statement::Empty(span) => span,
        }
    }

    /// Check if this statement is a declaration
    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            Statement::VariableDecl(_) | Statement::FunctionDecl(_) | Statement::ClassDecl(_)
        )
    }

    /// Check if this statement is a loop
    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            Statement::While(_)
                | Statement::DoWhile(_)
                | Statement::For(_)
                | Statement::ForOf(_)
                | Statement::ForIn(_)
        )
    }
}

// ============================================================================
// Variable Declaration
// ============================================================================

/// Variable declaration: `let x = 42, y;`
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    /// var, let or const
    pub kind: VariableKind,

    /// One entry per declarator
    pub declarations: Vec<VariableDeclarator>,

    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    /// Function-scoped, hoisted
    Var,
    /// Block-scoped
    Let,
    /// Block-scoped, single assignment
    Const,
}

impl VariableKind {
    /// Check if this declaration kind is block scoped
    pub fn is_lexical(&self) -> bool {
        !matches!(self, VariableKind::Var)
    }
}

/// One `pattern = initializer` entry of a declaration
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarator {
    /// Pattern (identifier or destructuring)
    pub pattern: Pattern,

    /// Initializer expression
    pub initializer: Option<Expression>,

    pub span: Span,
}

// ============================================================================
// Functions
// ============================================================================

/// Any function-like node: declaration, expression, arrow, method or
/// constructor.
///
/// # Example
/// ```text
/// function* range(start, end = 10) {
///     for (let i = start; i < end; i++) yield i;
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Node identity (the scope the function introduces)
    pub id: NodeId,

    /// Function name; `None` for anonymous expressions and arrows
    pub name: Option<Identifier>,

    /// Parameters
    pub params: Vec<Parameter>,

    /// Function body
    pub body: FunctionBody,

    /// Arrow function (no own receiver)?
    pub is_arrow: bool,

    /// Generator function?
    pub is_generator: bool,

    /// Async function?
    pub is_async: bool,

    pub span: Span,
}

impl Function {
    /// Check whether the body contains suspension points by construction
    /// (generator or async)
    pub fn is_resumable(&self) -> bool {
        self.is_generator || self.is_async
    }
}

/// Function body: a statement block, or a bare expression for arrows
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    Block(BlockStatement),
    Expression(Box<Expression>),
}

/// Function parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub pattern: Pattern,

    /// Default value for the parameter (e.g., `x = 10`)
    pub default_value: Option<Expression>,

    pub span: Span,
}

// ============================================================================
// Classes
// ============================================================================

/// Class declaration or expression
///
/// # Example
/// ```text
/// class Counter {
///     count = 0;
///     constructor(step) { this.step = step; }
///     tick() { this.count += this.step; return this.count; }
///     static zero() { return new Counter(0); }
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    /// Node identity (the class scope)
    pub id: NodeId,

    /// Class name; `None` for anonymous class expressions
    pub name: Option<Identifier>,

    pub members: Vec<ClassMember>,

    pub span: Span,
}

impl Class {
    /// The explicit constructor, if the class declares one
    pub fn constructor(&self) -> Option<&Function> {
        self.members.iter().find_map(|member| match member {
            ClassMember::Constructor(ctor) => Some(ctor),
            _ => None,
        })
    }

    /// Instance field declarations, in source order
    pub fn instance_fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.members.iter().filter_map(|member| match member {
            ClassMember::Field(field) if !field.is_static => Some(field),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassMember {
    Field(FieldDecl),
    Method(MethodDecl),
    Constructor(Function),
}

/// Field declaration: `count = 0;`
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: Identifier,
    pub initializer: Option<Expression>,
    pub is_static: bool,
    pub span: Span,
}

/// Method declaration
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: Identifier,
    pub function: Function,
    pub is_static: bool,
    pub span: Span,
}

// ============================================================================
// Control Flow Statements
// ============================================================================

/// Expression statement
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStatement {
    pub expression: Expression,
    pub span: Span,
}

/// If statement
#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub condition: Expression,
    pub then_branch: Box<Statement>,
    pub else_branch: Option<Box<Statement>>,
    pub span: Span,
}

/// While loop
#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    pub condition: Expression,
    pub body: Box<Statement>,
    pub span: Span,
}

/// Do-while loop
#[derive(Debug, Clone, PartialEq)]
pub struct DoWhileStatement {
    pub body: Box<Statement>,
    pub condition: Expression,
    pub span: Span,
}

/// For loop
#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    /// Node identity (the loop-iteration scope)
    pub id: NodeId,
    pub init: Option<ForInit>,
    pub test: Option<Expression>,
    pub update: Option<Expression>,
    pub body: Box<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    VariableDecl(VariableDecl),
    Expression(Expression),
}

/// For-of loop
#[derive(Debug, Clone, PartialEq)]
pub struct ForOfStatement {
    /// Node identity (the loop-iteration scope)
    pub id: NodeId,
    pub left: ForOfLeft,
    pub right: Expression,
    pub body: Box<Statement>,
    pub span: Span,
}

/// Left-hand side of a for-of or for-in head
#[derive(Debug, Clone, PartialEq)]
pub enum ForOfLeft {
    /// `for (const x of xs)`
    Declaration { kind: VariableKind, pattern: Pattern },
    /// `for (x of xs)` assigning existing bindings
    Pattern(Pattern),
}

/// For-in loop: `for (const key in object) ...`
#[derive(Debug, Clone, PartialEq)]
pub struct ForInStatement {
    /// Node identity (the loop-iteration scope)
    pub id: NodeId,
    pub left: ForOfLeft,
    pub right: Expression,
    pub body: Box<Statement>,
    pub span: Span,
}

/// Switch statement. All case bodies share one block scope.
///
/// # Example
/// ```text
/// switch (kind) {
///     case "a": first(); break;
///     case "b":
///     default: rest();
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchStatement {
    /// Node identity (the case block scope)
    pub id: NodeId,
    pub discriminant: Expression,
    pub cases: Vec<SwitchCase>,
    pub span: Span,
}

/// One `case test:` or `default:` clause
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// `None` for `default`
    pub test: Option<Expression>,
    pub body: Vec<Statement>,
    pub span: Span,
}

/// Break statement
#[derive(Debug, Clone, PartialEq)]
pub struct BreakStatement {
    pub label: Option<Identifier>,
    pub span: Span,
}

/// Continue statement
#[derive(Debug, Clone, PartialEq)]
pub struct ContinueStatement {
    pub label: Option<Identifier>,
    pub span: Span,
}

/// Return statement
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    pub value: Option<Expression>,
    pub span: Span,
}

/// Throw statement
#[derive(Debug, Clone, PartialEq)]
pub struct ThrowStatement {
    pub value: Expression,
    pub span: Span,
}

/// Try-catch-finally statement
#[derive(Debug, Clone, PartialEq)]
pub struct TryStatement {
    pub body: BlockStatement,
    pub catch_clause: Option<CatchClause>,
    pub finally_clause: Option<BlockStatement>,
    pub span: Span,
}

/// Catch clause; its body shares the clause's scope
#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    /// Node identity (the catch scope)
    pub id: NodeId,
    pub param: Option<Pattern>,
    pub body: BlockStatement,
    pub span: Span,
}

/// Block statement
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStatement {
    /// Node identity (the block scope)
    pub id: NodeId,
    pub statements: Vec<Statement>,
    pub span: Span,
}

/// Labeled statement
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledStatement {
    pub label: Identifier,
    pub body: Box<Statement>,
    pub span: Span,
}
