//! Programmatic AST construction
//!
//! `AstBuilder` hands out fresh [`NodeId`]s and distinct synthetic spans so
//! that trees assembled by hand (tests, benches, embedders translating from
//! another parser) satisfy the same uniqueness guarantees a parser would.
//! All methods take `&self`, so constructors nest freely:
//!
//! ```rust
//! use kiln_syntax::build::AstBuilder;
//!
//! let b = AstBuilder::new("main");
//! let module = b.module(vec![
//!     b.var("g", Some(b.num(1.0))),
//!     b.function_decl(b.function("outer").body(vec![
//!         b.return_(Some(b.ident("g"))),
//!     ])),
//! ]);
//! assert_eq!(module.len(), 2);
//! ```

use std::cell::Cell;

use crate::ast::*;
use crate::span::{NodeId, Span};

/// Factory for AST nodes
#[derive(Debug)]
pub struct AstBuilder {
    module_name: String,
    next_id: Cell<u32>,
    next_line: Cell<u32>,
}

impl AstBuilder {
    /// Create a builder for a module with the given name
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            next_id: Cell::new(0),
            next_line: Cell::new(1),
        }
    }

    /// Allocate a fresh span. Every node gets its own line so
    /// position-derived scope names never collide.
    pub fn span(&self) -> Span {
        let line = self.next_line.get();
        self.next_line.set(line + 1);
        Span::new(0, 0, line, 1)
    }

    /// Allocate a fresh node id
    pub fn node_id(&self) -> NodeId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        NodeId(id)
    }

    /// Finish a module
    pub fn module(&self, statements: Vec<Statement>) -> Module {
        Module::new(self.module_name.clone(), statements, self.span())
    }

    pub fn identifier(&self, name: &str) -> Identifier {
        Identifier::new(name, self.span())
    }

    // ========================================================================
    // Patterns
    // ========================================================================

    /// Identifier pattern
    pub fn pat(&self, name: &str) -> Pattern {
        Pattern::Identifier(self.identifier(name))
    }

    /// Object pattern: `{ key: pattern = default, ... }`
    pub fn object_pat(&self, properties: Vec<(&str, Pattern, Option<Expression>)>) -> Pattern {
        let properties = properties
            .into_iter()
            .map(|(key, value, default)| ObjectPatternProperty {
                key: self.identifier(key),
                value,
                default,
                span: self.span(),
            })
            .collect();
        Pattern::Object(ObjectPattern {
            properties,
            span: self.span(),
        })
    }

    /// Array pattern; `None` entries are holes
    pub fn array_pat(&self, elements: Vec<Option<Pattern>>) -> Pattern {
        let elements = elements
            .into_iter()
            .map(|element| {
                element.map(|pattern| PatternElement {
                    pattern,
                    default: None,
                })
            })
            .collect();
        Pattern::Array(ArrayPattern {
            elements,
            span: self.span(),
        })
    }

    // ========================================================================
    // Statements
    // ========================================================================

    pub fn declare(
        &self,
        kind: VariableKind,
        pattern: Pattern,
        initializer: Option<Expression>,
    ) -> Statement {
        Statement::VariableDecl(self.variable_decl(kind, pattern, initializer))
    }

    pub fn variable_decl(
        &self,
        kind: VariableKind,
        pattern: Pattern,
        initializer: Option<Expression>,
    ) -> VariableDecl {
        VariableDecl {
            kind,
            declarations: vec![VariableDeclarator {
                pattern,
                initializer,
                span: self.span(),
            }],
            span: self.span(),
        }
    }

    pub fn var(&self, name: &str, initializer: Option<Expression>) -> Statement {
        self.declare(VariableKind::Var, self.pat(name), initializer)
    }

    pub fn let_(&self, name: &str, initializer: Option<Expression>) -> Statement {
        self.declare(VariableKind::Let, self.pat(name), initializer)
    }

    pub fn const_(&self, name: &str, initializer: Expression) -> Statement {
        self.declare(VariableKind::Const, self.pat(name), Some(initializer))
    }

    pub fn expr(&self, expression: Expression) -> Statement {
        Statement::Expression(ExpressionStatement {
            expression,
            span: self.span(),
        })
    }

    pub fn if_(
        &self,
        condition: Expression,
        then_branch: Statement,
        else_branch: Option<Statement>,
    ) -> Statement {
        Statement::If(IfStatement {
            condition,
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
            span: self.span(),
        })
    }

    pub fn while_(&self, condition: Expression, body: Statement) -> Statement {
        Statement::While(WhileStatement {
            condition,
            body: Box::new(body),
            span: self.span(),
        })
    }

    pub fn do_while(&self, body: Statement, condition: Expression) -> Statement {
        Statement::DoWhile(DoWhileStatement {
            body: Box::new(body),
            condition,
            span: self.span(),
        })
    }

    pub fn for_(
        &self,
        init: Option<ForInit>,
        test: Option<Expression>,
        update: Option<Expression>,
        body: Statement,
    ) -> Statement {
        Statement::For(ForStatement {
            id: self.node_id(),
            init,
            test,
            update,
            body: Box::new(body),
            span: self.span(),
        })
    }

    /// `for (let name = init; test; update) body`
    pub fn for_let(
        &self,
        name: &str,
        init: Expression,
        test: Expression,
        update: Expression,
        body: Statement,
    ) -> Statement {
        let decl = self.variable_decl(VariableKind::Let, self.pat(name), Some(init));
        self.for_(Some(ForInit::VariableDecl(decl)), Some(test), Some(update), body)
    }

    pub fn for_of(
        &self,
        kind: VariableKind,
        pattern: Pattern,
        right: Expression,
        body: Statement,
    ) -> Statement {
        Statement::ForOf(ForOfStatement {
            id: self.node_id(),
            left: ForOfLeft::Declaration { kind, pattern },
            right,
            body: Box::new(body),
            span: self.span(),
        })
    }

    pub fn for_of_assign(&self, pattern: Pattern, right: Expression, body: Statement) -> Statement {
        Statement::ForOf(ForOfStatement {
            id: self.node_id(),
            left: ForOfLeft::Pattern(pattern),
            right,
            body: Box::new(body),
            span: self.span(),
        })
    }

    /// `for (kind name in right) body`
    pub fn for_in(&self, kind: VariableKind, name: &str, right: Expression, body: Statement) -> Statement {
        Statement::ForIn(ForInStatement {
            id: self.node_id(),
            left: ForOfLeft::Declaration {
                kind,
                pattern: self.pat(name),
            },
            right,
            body: Box::new(body),
            span: self.span(),
        })
    }

    pub fn switch(&self, discriminant: Expression, cases: Vec<SwitchCase>) -> Statement {
        Statement::Switch(SwitchStatement {
            id: self.node_id(),
            discriminant,
            cases,
            span: self.span(),
        })
    }

    /// `case test: body`
    pub fn case(&self, test: Expression, body: Vec<Statement>) -> SwitchCase {
        SwitchCase {
            test: Some(test),
            body,
            span: self.span(),
        }
    }

    /// `default: body`
    pub fn default_case(&self, body: Vec<Statement>) -> SwitchCase {
        SwitchCase {
            test: None,
            body,
            span: self.span(),
        }
    }

    pub fn break_(&self, label: Option<&str>) -> Statement {
        Statement::Break(BreakStatement {
            label: label.map(|l| self.identifier(l)),
            span: self.span(),
        })
    }

    pub fn continue_(&self, label: Option<&str>) -> Statement {
        Statement::Continue(ContinueStatement {
            label: label.map(|l| self.identifier(l)),
            span: self.span(),
        })
    }

    pub fn return_(&self, value: Option<Expression>) -> Statement {
        Statement::Return(ReturnStatement {
            value,
            span: self.span(),
        })
    }

    pub fn throw(&self, value: Expression) -> Statement {
        Statement::Throw(ThrowStatement {
            value,
            span: self.span(),
        })
    }

    /// General try statement
    pub fn try_stmt(
        &self,
        body: Vec<Statement>,
        catch_clause: Option<(Option<Pattern>, Vec<Statement>)>,
        finally_clause: Option<Vec<Statement>>,
    ) -> Statement {
        let catch_clause = catch_clause.map(|(param, statements)| CatchClause {
            id: self.node_id(),
            param,
            body: self.block_stmt(statements),
            span: self.span(),
        });
        Statement::Try(TryStatement {
            body: self.block_stmt(body),
            catch_clause,
            finally_clause: finally_clause.map(|statements| self.block_stmt(statements)),
            span: self.span(),
        })
    }

    pub fn try_catch(
        &self,
        body: Vec<Statement>,
        param: &str,
        handler: Vec<Statement>,
    ) -> Statement {
        self.try_stmt(body, Some((Some(self.pat(param)), handler)), None)
    }

    pub fn try_finally(&self, body: Vec<Statement>, finalizer: Vec<Statement>) -> Statement {
        self.try_stmt(body, None, Some(finalizer))
    }

    pub fn try_catch_finally(
        &self,
        body: Vec<Statement>,
        param: &str,
        handler: Vec<Statement>,
        finalizer: Vec<Statement>,
    ) -> Statement {
        self.try_stmt(body, Some((Some(self.pat(param)), handler)), Some(finalizer))
    }

    pub fn block(&self, statements: Vec<Statement>) -> Statement {
        Statement::Block(self.block_stmt(statements))
    }

    pub fn block_stmt(&self, statements: Vec<Statement>) -> BlockStatement {
        BlockStatement {
            id: self.node_id(),
            statements,
            span: self.span(),
        }
    }

    pub fn labeled(&self, label: &str, body: Statement) -> Statement {
        Statement::Labeled(LabeledStatement {
            label: self.identifier(label),
            body: Box::new(body),
            span: self.span(),
        })
    }

    pub fn function_decl(&self, function: Function) -> Statement {
        Statement::FunctionDecl(function)
    }

    pub fn class_decl(&self, class: Class) -> Statement {
        Statement::ClassDecl(class)
    }

    // ========================================================================
    // Functions & classes
    // ========================================================================

    /// Named function (declaration, named expression or method)
    pub fn function(&self, name: &str) -> FunctionBuilder<'_> {
        FunctionBuilder::new(self, Some(self.identifier(name)), false)
    }

    /// Anonymous function expression
    pub fn anonymous(&self) -> FunctionBuilder<'_> {
        FunctionBuilder::new(self, None, false)
    }

    /// Arrow function
    pub fn arrow(&self) -> FunctionBuilder<'_> {
        FunctionBuilder::new(self, None, true)
    }

    pub fn class(&self, name: &str) -> ClassBuilder<'_> {
        ClassBuilder::new(self, Some(self.identifier(name)))
    }

    pub fn anonymous_class(&self) -> ClassBuilder<'_> {
        ClassBuilder::new(self, None)
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    pub fn num(&self, value: f64) -> Expression {
        Expression::NumberLiteral(NumberLiteral {
            value,
            span: self.span(),
        })
    }

    pub fn str_(&self, value: &str) -> Expression {
        Expression::StringLiteral(StringLiteral {
            value: value.to_string(),
            span: self.span(),
        })
    }

    pub fn bool_(&self, value: bool) -> Expression {
        Expression::BooleanLiteral(BooleanLiteral {
            value,
            span: self.span(),
        })
    }

    pub fn null(&self) -> Expression {
        Expression::NullLiteral(self.span())
    }

    pub fn undefined(&self) -> Expression {
        Expression::UndefinedLiteral(self.span())
    }

    pub fn ident(&self, name: &str) -> Expression {
        Expression::Identifier(self.identifier(name))
    }

    pub fn this(&self) -> Expression {
        Expression::This(self.span())
    }

    pub fn array(&self, elements: Vec<Expression>) -> Expression {
        Expression::Array(ArrayExpression {
            elements,
            span: self.span(),
        })
    }

    pub fn object(&self, properties: Vec<(&str, Expression)>) -> Expression {
        let properties = properties
            .into_iter()
            .map(|(key, value)| Property {
                key: self.identifier(key),
                value,
                span: self.span(),
            })
            .collect();
        Expression::Object(ObjectExpression {
            properties,
            span: self.span(),
        })
    }

    pub fn unary(&self, operator: UnaryOperator, operand: Expression) -> Expression {
        Expression::Unary(UnaryExpression {
            operator,
            operand: Box::new(operand),
            span: self.span(),
        })
    }

    pub fn not(&self, operand: Expression) -> Expression {
        self.unary(UnaryOperator::Not, operand)
    }

    pub fn neg(&self, operand: Expression) -> Expression {
        self.unary(UnaryOperator::Minus, operand)
    }

    pub fn typeof_(&self, operand: Expression) -> Expression {
        self.unary(UnaryOperator::Typeof, operand)
    }

    pub fn binary(&self, operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
        Expression::Binary(BinaryExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
            span: self.span(),
        })
    }

    pub fn add(&self, left: Expression, right: Expression) -> Expression {
        self.binary(BinaryOperator::Add, left, right)
    }

    pub fn sub(&self, left: Expression, right: Expression) -> Expression {
        self.binary(BinaryOperator::Subtract, left, right)
    }

    pub fn mul(&self, left: Expression, right: Expression) -> Expression {
        self.binary(BinaryOperator::Multiply, left, right)
    }

    pub fn lt(&self, left: Expression, right: Expression) -> Expression {
        self.binary(BinaryOperator::LessThan, left, right)
    }

    pub fn gt(&self, left: Expression, right: Expression) -> Expression {
        self.binary(BinaryOperator::GreaterThan, left, right)
    }

    pub fn strict_eq(&self, left: Expression, right: Expression) -> Expression {
        self.binary(BinaryOperator::StrictEqual, left, right)
    }

    pub fn logical(&self, operator: LogicalOperator, left: Expression, right: Expression) -> Expression {
        Expression::Logical(LogicalExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
            span: self.span(),
        })
    }

    pub fn assign(&self, target: Expression, value: Expression) -> Expression {
        self.assign_op(AssignmentOperator::Assign, target, value)
    }

    pub fn assign_op(
        &self,
        operator: AssignmentOperator,
        target: Expression,
        value: Expression,
    ) -> Expression {
        Expression::Assignment(AssignmentExpression {
            operator,
            left: Box::new(target),
            right: Box::new(value),
            span: self.span(),
        })
    }

    pub fn update(&self, operator: UpdateOperator, prefix: bool, argument: Expression) -> Expression {
        Expression::Update(UpdateExpression {
            operator,
            prefix,
            argument: Box::new(argument),
            span: self.span(),
        })
    }

    /// Postfix increment: `argument++`
    pub fn increment(&self, argument: Expression) -> Expression {
        self.update(UpdateOperator::Increment, false, argument)
    }

    pub fn call(&self, callee: Expression, arguments: Vec<Expression>) -> Expression {
        Expression::Call(CallExpression {
            callee: Box::new(callee),
            arguments,
            span: self.span(),
        })
    }

    /// Call a function by name: `name(args...)`
    pub fn call_fn(&self, name: &str, arguments: Vec<Expression>) -> Expression {
        self.call(self.ident(name), arguments)
    }

    /// Method call: `object.name(args...)`
    pub fn method_call(&self, object: Expression, name: &str, arguments: Vec<Expression>) -> Expression {
        self.call(self.member(object, name), arguments)
    }

    pub fn member(&self, object: Expression, property: &str) -> Expression {
        Expression::Member(MemberExpression {
            object: Box::new(object),
            property: self.identifier(property),
            span: self.span(),
        })
    }

    pub fn index(&self, object: Expression, index: Expression) -> Expression {
        Expression::Index(IndexExpression {
            object: Box::new(object),
            index: Box::new(index),
            span: self.span(),
        })
    }

    pub fn new_(&self, callee: Expression, arguments: Vec<Expression>) -> Expression {
        Expression::New(NewExpression {
            callee: Box::new(callee),
            arguments,
            span: self.span(),
        })
    }

    pub fn func_expr(&self, function: Function) -> Expression {
        Expression::Function(Box::new(function))
    }

    pub fn class_expr(&self, class: Class) -> Expression {
        Expression::Class(Box::new(class))
    }

    pub fn yield_(&self, argument: Option<Expression>) -> Expression {
        Expression::Yield(YieldExpression {
            argument: argument.map(Box::new),
            delegate: false,
            span: self.span(),
        })
    }

    pub fn yield_star(&self, argument: Expression) -> Expression {
        Expression::Yield(YieldExpression {
            argument: Some(Box::new(argument)),
            delegate: true,
            span: self.span(),
        })
    }

    pub fn await_(&self, argument: Expression) -> Expression {
        Expression::Await(AwaitExpression {
            argument: Box::new(argument),
            span: self.span(),
        })
    }

    pub fn cond(&self, test: Expression, consequent: Expression, alternate: Expression) -> Expression {
        Expression::Conditional(ConditionalExpression {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
            span: self.span(),
        })
    }

    pub fn seq(&self, expressions: Vec<Expression>) -> Expression {
        Expression::Sequence(SequenceExpression {
            expressions,
            span: self.span(),
        })
    }
}

/// Builder for [`Function`] nodes
pub struct FunctionBuilder<'a> {
    ast: &'a AstBuilder,
    id: NodeId,
    name: Option<Identifier>,
    params: Vec<Parameter>,
    is_arrow: bool,
    is_generator: bool,
    is_async: bool,
    span: Span,
}

impl<'a> FunctionBuilder<'a> {
    fn new(ast: &'a AstBuilder, name: Option<Identifier>, is_arrow: bool) -> Self {
        Self {
            ast,
            id: ast.node_id(),
            name,
            params: Vec::new(),
            is_arrow,
            is_generator: false,
            is_async: false,
            span: ast.span(),
        }
    }

    pub fn param(self, name: &str) -> Self {
        let pattern = self.ast.pat(name);
        self.param_pattern(pattern, None)
    }

    pub fn param_default(self, name: &str, default: Expression) -> Self {
        let pattern = self.ast.pat(name);
        self.param_pattern(pattern, Some(default))
    }

    pub fn param_pattern(mut self, pattern: Pattern, default_value: Option<Expression>) -> Self {
        self.params.push(Parameter {
            pattern,
            default_value,
            span: self.ast.span(),
        });
        self
    }

    pub fn generator(mut self) -> Self {
        self.is_generator = true;
        self
    }

    pub fn asynchronous(mut self) -> Self {
        self.is_async = true;
        self
    }

    /// Finish with a statement body
    pub fn body(self, statements: Vec<Statement>) -> Function {
        let body = FunctionBody::Block(self.ast.block_stmt(statements));
        self.finish(body)
    }

    /// Finish with an expression body (arrows)
    pub fn expr_body(self, expression: Expression) -> Function {
        self.finish(FunctionBody::Expression(Box::new(expression)))
    }

    fn finish(self, body: FunctionBody) -> Function {
        Function {
            id: self.id,
            name: self.name,
            params: self.params,
            body,
            is_arrow: self.is_arrow,
            is_generator: self.is_generator,
            is_async: self.is_async,
            span: self.span,
        }
    }
}

/// Builder for [`Class`] nodes
pub struct ClassBuilder<'a> {
    ast: &'a AstBuilder,
    id: NodeId,
    name: Option<Identifier>,
    members: Vec<ClassMember>,
    span: Span,
}

impl<'a> ClassBuilder<'a> {
    fn new(ast: &'a AstBuilder, name: Option<Identifier>) -> Self {
        Self {
            ast,
            id: ast.node_id(),
            name,
            members: Vec::new(),
            span: ast.span(),
        }
    }

    pub fn field(self, name: &str, initializer: Option<Expression>) -> Self {
        self.push_field(name, initializer, false)
    }

    pub fn static_field(self, name: &str, initializer: Option<Expression>) -> Self {
        self.push_field(name, initializer, true)
    }

    fn push_field(mut self, name: &str, initializer: Option<Expression>, is_static: bool) -> Self {
        self.members.push(ClassMember::Field(FieldDecl {
            name: self.ast.identifier(name),
            initializer,
            is_static,
            span: self.ast.span(),
        }));
        self
    }

    pub fn constructor(mut self, function: Function) -> Self {
        self.members.push(ClassMember::Constructor(function));
        self
    }

    pub fn method(self, name: &str, function: Function) -> Self {
        self.push_method(name, function, false)
    }

    pub fn static_method(self, name: &str, function: Function) -> Self {
        self.push_method(name, function, true)
    }

    fn push_method(mut self, name: &str, function: Function, is_static: bool) -> Self {
        self.members.push(ClassMember::Method(MethodDecl {
            name: self.ast.identifier(name),
            function,
            is_static,
            span: self.ast.span(),
        }));
        self
    }

    pub fn build(self) -> Class {
        Class {
            id: self.id,
            name: self.name,
            members: self.members,
            span: self.span,
        }
    }
}
