//! AST visitor pattern for traversing the syntax tree
//!
//! This module provides a visitor trait for walking the AST. Visitors are used
//! for scope construction, suspension-point discovery and callable collection.
//!
//! Identifiers are split by role: [`Visitor::visit_identifier`] sees names in
//! expression (reference) position, [`Visitor::visit_binding_identifier`] sees
//! names introduced by patterns. Member property names and labels are visited
//! by neither.
//!
//! # Example
//!
//! ```rust
//! use kiln_syntax::ast::*;
//!
//! struct CountReferences {
//!     count: usize,
//! }
//!
//! impl<'ast> Visitor<'ast> for CountReferences {
//!     fn visit_identifier(&mut self, _id: &'ast Identifier) {
//!         self.count += 1;
//!     }
//! }
//! ```

use super::*;

/// AST visitor trait
///
/// Implement this trait to traverse the AST. Each visit method has a default
/// implementation that calls the corresponding walk function.
pub trait Visitor<'ast>: Sized {
    // Top-level
    fn visit_module(&mut self, module: &'ast Module) {
        walk_module(self, module);
    }

    // Statements
    fn visit_statement(&mut self, stmt: &'ast Statement) {
        walk_statement(self, stmt);
    }

    fn visit_variable_decl(&mut self, decl: &'ast VariableDecl) {
        walk_variable_decl(self, decl);
    }

    fn visit_variable_declarator(&mut self, kind: VariableKind, decl: &'ast VariableDeclarator) {
        walk_variable_declarator(self, kind, decl);
    }

    fn visit_function(&mut self, func: &'ast Function) {
        walk_function(self, func);
    }

    fn visit_parameter(&mut self, param: &'ast Parameter) {
        walk_parameter(self, param);
    }

    fn visit_class(&mut self, class: &'ast Class) {
        walk_class(self, class);
    }

    fn visit_if_statement(&mut self, stmt: &'ast IfStatement) {
        walk_if_statement(self, stmt);
    }

    fn visit_while_statement(&mut self, stmt: &'ast WhileStatement) {
        walk_while_statement(self, stmt);
    }

    fn visit_for_statement(&mut self, stmt: &'ast ForStatement) {
        walk_for_statement(self, stmt);
    }

    fn visit_for_of_statement(&mut self, stmt: &'ast ForOfStatement) {
        walk_for_of_statement(self, stmt);
    }

    fn visit_for_in_statement(&mut self, stmt: &'ast ForInStatement) {
        walk_for_in_statement(self, stmt);
    }

    fn visit_switch_statement(&mut self, stmt: &'ast SwitchStatement) {
        walk_switch_statement(self, stmt);
    }

    fn visit_try_statement(&mut self, stmt: &'ast TryStatement) {
        walk_try_statement(self, stmt);
    }

    fn visit_catch_clause(&mut self, clause: &'ast CatchClause) {
        walk_catch_clause(self, clause);
    }

    fn visit_block_statement(&mut self, stmt: &'ast BlockStatement) {
        walk_block_statement(self, stmt);
    }

    // Expressions
    fn visit_expression(&mut self, expr: &'ast Expression) {
        walk_expression(self, expr);
    }

    fn visit_assignment_expression(&mut self, expr: &'ast AssignmentExpression) {
        walk_assignment_expression(self, expr);
    }

    fn visit_update_expression(&mut self, expr: &'ast UpdateExpression) {
        walk_update_expression(self, expr);
    }

    fn visit_call_expression(&mut self, expr: &'ast CallExpression) {
        walk_call_expression(self, expr);
    }

    fn visit_object_expression(&mut self, expr: &'ast ObjectExpression) {
        walk_object_expression(self, expr);
    }

    fn visit_yield_expression(&mut self, expr: &'ast YieldExpression) {
        walk_yield_expression(self, expr);
    }

    fn visit_await_expression(&mut self, expr: &'ast AwaitExpression) {
        walk_await_expression(self, expr);
    }

    fn visit_this(&mut self, _span: &'ast crate::span::Span) {
        // Leaf node - no traversal needed
    }

    // Common
    fn visit_identifier(&mut self, _id: &'ast Identifier) {
        // Leaf node - no traversal needed
    }

    fn visit_binding_identifier(&mut self, _id: &'ast Identifier) {
        // Leaf node - no traversal needed
    }

    fn visit_pattern(&mut self, pattern: &'ast Pattern) {
        walk_pattern(self, pattern);
    }
}

// ============================================================================
// Walk Functions - Default Traversal Implementations
// ============================================================================

pub fn walk_module<'ast, V: Visitor<'ast>>(visitor: &mut V, module: &'ast Module) {
    for stmt in &module.statements {
        visitor.visit_statement(stmt);
    }
}

pub fn walk_statement<'ast, V: Visitor<'ast>>(visitor: &mut V, stmt: &'ast Statement) {
    match stmt {
        Statement::VariableDecl(decl) => visitor.visit_variable_decl(decl),
        Statement::FunctionDecl(func) => visitor.visit_function(func),
        Statement::ClassDecl(class) => visitor.visit_class(class),
        Statement::Expression(stmt) => visitor.visit_expression(&stmt.expression),
        Statement::If(stmt) => visitor.visit_if_statement(stmt),
        Statement::While(stmt) => visitor.visit_while_statement(stmt),
        Statement::DoWhile(stmt) => {
            visitor.visit_statement(&stmt.body);
            visitor.visit_expression(&stmt.condition);
        }
        Statement::For(stmt) => visitor.visit_for_statement(stmt),
        Statement::ForOf(stmt) => visitor.visit_for_of_statement(stmt),
        Statement::ForIn(stmt) => visitor.visit_for_in_statement(stmt),
        Statement::Switch(stmt) => visitor.visit_switch_statement(stmt),
        Statement::Break(_) | Statement::Continue(_) => {}
        Statement::Return(stmt) => {
            if let Some(value) = &stmt.value {
                visitor.visit_expression(value);
            }
        }
        Statement::Throw(stmt) => visitor.visit_expression(&stmt.value),
        Statement::Try(stmt) => visitor.visit_try_statement(stmt),
        Statement::Block(stmt) => visitor.visit_block_statement(stmt),
        Statement::Labeled(stmt) => visitor.visit_statement(&stmt.body),
        Statement::Empty(_) => {}
    }
}

pub fn walk_variable_decl<'ast, V: Visitor<'ast>>(visitor: &mut V, decl: &'ast VariableDecl) {
    for declarator in &decl.declarations {
        visitor.visit_variable_declarator(decl.kind, declarator);
    }
}

pub fn walk_variable_declarator<'ast, V: Visitor<'ast>>(
    visitor: &mut V,
    _kind: VariableKind,
    decl: &'ast VariableDeclarator,
) {
    visitor.visit_pattern(&decl.pattern);
    if let Some(init) = &decl.initializer {
        visitor.visit_expression(init);
    }
}

/// Walk parameters then body. A block body's statements are visited
/// directly: the body shares the function's scope rather than opening a
/// block scope of its own.
pub fn walk_function<'ast, V: Visitor<'ast>>(visitor: &mut V, func: &'ast Function) {
    for param in &func.params {
        visitor.visit_parameter(param);
    }
    walk_function_body(visitor, &func.body);
}

pub fn walk_function_body<'ast, V: Visitor<'ast>>(visitor: &mut V, body: &'ast FunctionBody) {
    match body {
        FunctionBody::Block(block) => {
            for stmt in &block.statements {
                visitor.visit_statement(stmt);
            }
        }
        FunctionBody::Expression(expr) => visitor.visit_expression(expr),
    }
}

pub fn walk_parameter<'ast, V: Visitor<'ast>>(visitor: &mut V, param: &'ast Parameter) {
    visitor.visit_pattern(&param.pattern);
    if let Some(default) = &param.default_value {
        visitor.visit_expression(default);
    }
}

pub fn walk_class<'ast, V: Visitor<'ast>>(visitor: &mut V, class: &'ast Class) {
    for member in &class.members {
        match member {
            ClassMember::Field(field) => {
                if let Some(init) = &field.initializer {
                    visitor.visit_expression(init);
                }
            }
            ClassMember::Method(method) => visitor.visit_function(&method.function),
            ClassMember::Constructor(ctor) => visitor.visit_function(ctor),
        }
    }
}

pub fn walk_if_statement<'ast, V: Visitor<'ast>>(visitor: &mut V, stmt: &'ast IfStatement) {
    visitor.visit_expression(&stmt.condition);
    visitor.visit_statement(&stmt.then_branch);
    if let Some(else_branch) = &stmt.else_branch {
        visitor.visit_statement(else_branch);
    }
}

pub fn walk_while_statement<'ast, V: Visitor<'ast>>(visitor: &mut V, stmt: &'ast WhileStatement) {
    visitor.visit_expression(&stmt.condition);
    visitor.visit_statement(&stmt.body);
}

pub fn walk_for_statement<'ast, V: Visitor<'ast>>(visitor: &mut V, stmt: &'ast ForStatement) {
    if let Some(init) = &stmt.init {
        match init {
            ForInit::VariableDecl(decl) => visitor.visit_variable_decl(decl),
            ForInit::Expression(expr) => visitor.visit_expression(expr),
        }
    }
    if let Some(test) = &stmt.test {
        visitor.visit_expression(test);
    }
    if let Some(update) = &stmt.update {
        visitor.visit_expression(update);
    }
    visitor.visit_statement(&stmt.body);
}

pub fn walk_for_of_statement<'ast, V: Visitor<'ast>>(visitor: &mut V, stmt: &'ast ForOfStatement) {
    visitor.visit_expression(&stmt.right);
    match &stmt.left {
        ForOfLeft::Declaration { pattern, .. } => visitor.visit_pattern(pattern),
        ForOfLeft::Pattern(pattern) => walk_assignment_pattern(visitor, pattern),
    }
    visitor.visit_statement(&stmt.body);
}

pub fn walk_for_in_statement<'ast, V: Visitor<'ast>>(visitor: &mut V, stmt: &'ast ForInStatement) {
    visitor.visit_expression(&stmt.right);
    match &stmt.left {
        ForOfLeft::Declaration { pattern, .. } => visitor.visit_pattern(pattern),
        ForOfLeft::Pattern(pattern) => walk_assignment_pattern(visitor, pattern),
    }
    visitor.visit_statement(&stmt.body);
}

pub fn walk_switch_statement<'ast, V: Visitor<'ast>>(visitor: &mut V, stmt: &'ast SwitchStatement) {
    visitor.visit_expression(&stmt.discriminant);
    for case in &stmt.cases {
        if let Some(test) = &case.test {
            visitor.visit_expression(test);
        }
        for body_stmt in &case.body {
            visitor.visit_statement(body_stmt);
        }
    }
}

/// Walk a pattern used as an assignment target: its identifiers are
/// references (writes), not declarations.
pub fn walk_assignment_pattern<'ast, V: Visitor<'ast>>(visitor: &mut V, pattern: &'ast Pattern) {
    match pattern {
        Pattern::Identifier(id) => visitor.visit_identifier(id),
        Pattern::Array(array) => {
            for element in array.elements.iter().flatten() {
                walk_assignment_pattern(visitor, &element.pattern);
                if let Some(default) = &element.default {
                    visitor.visit_expression(default);
                }
            }
        }
        Pattern::Object(object) => {
            for property in &object.properties {
                walk_assignment_pattern(visitor, &property.value);
                if let Some(default) = &property.default {
                    visitor.visit_expression(default);
                }
            }
        }
    }
}

pub fn walk_try_statement<'ast, V: Visitor<'ast>>(visitor: &mut V, stmt: &'ast TryStatement) {
    visitor.visit_block_statement(&stmt.body);
    if let Some(catch) = &stmt.catch_clause {
        visitor.visit_catch_clause(catch);
    }
    if let Some(finally) = &stmt.finally_clause {
        visitor.visit_block_statement(finally);
    }
}

/// Walk a catch clause. Like function bodies, the clause body's statements
/// share the clause scope.
pub fn walk_catch_clause<'ast, V: Visitor<'ast>>(visitor: &mut V, clause: &'ast CatchClause) {
    if let Some(param) = &clause.param {
        visitor.visit_pattern(param);
    }
    for stmt in &clause.body.statements {
        visitor.visit_statement(stmt);
    }
}

pub fn walk_block_statement<'ast, V: Visitor<'ast>>(visitor: &mut V, stmt: &'ast BlockStatement) {
    for statement in &stmt.statements {
        visitor.visit_statement(statement);
    }
}

pub fn walk_expression<'ast, V: Visitor<'ast>>(visitor: &mut V, expr: &'ast Expression) {
    match expr {
        Expression::NumberLiteral(_)
        | Expression::StringLiteral(_)
        | Expression::BooleanLiteral(_)
        | Expression::NullLiteral(_)
        | Expression::UndefinedLiteral(_) => {}
        Expression::This(span) => visitor.visit_this(span),
        Expression::Identifier(id) => visitor.visit_identifier(id),
        Expression::Array(arr) => {
            for element in &arr.elements {
                visitor.visit_expression(element);
            }
        }
        Expression::Object(obj) => visitor.visit_object_expression(obj),
        Expression::Unary(unary) => visitor.visit_expression(&unary.operand),
        Expression::Update(update) => visitor.visit_update_expression(update),
        Expression::Binary(binary) => {
            visitor.visit_expression(&binary.left);
            visitor.visit_expression(&binary.right);
        }
        Expression::Logical(logical) => {
            visitor.visit_expression(&logical.left);
            visitor.visit_expression(&logical.right);
        }
        Expression::Assignment(assign) => visitor.visit_assignment_expression(assign),
        Expression::Conditional(cond) => {
            visitor.visit_expression(&cond.test);
            visitor.visit_expression(&cond.consequent);
            visitor.visit_expression(&cond.alternate);
        }
        Expression::Call(call) => visitor.visit_call_expression(call),
        Expression::New(new) => {
            visitor.visit_expression(&new.callee);
            for arg in &new.arguments {
                visitor.visit_expression(arg);
            }
        }
        Expression::Member(member) => visitor.visit_expression(&member.object),
        Expression::Index(index) => {
            visitor.visit_expression(&index.object);
            visitor.visit_expression(&index.index);
        }
        Expression::Function(func) => visitor.visit_function(func),
        Expression::Class(class) => visitor.visit_class(class),
        Expression::Yield(expr) => visitor.visit_yield_expression(expr),
        Expression::Await(expr) => visitor.visit_await_expression(expr),
        Expression::Sequence(seq) => {
            for expr in &seq.expressions {
                visitor.visit_expression(expr);
            }
        }
    }
}

pub fn walk_assignment_expression<'ast, V: Visitor<'ast>>(
    visitor: &mut V,
    expr: &'ast AssignmentExpression,
) {
    visitor.visit_expression(&expr.left);
    visitor.visit_expression(&expr.right);
}

pub fn walk_update_expression<'ast, V: Visitor<'ast>>(
    visitor: &mut V,
    expr: &'ast UpdateExpression,
) {
    visitor.visit_expression(&expr.argument);
}

pub fn walk_call_expression<'ast, V: Visitor<'ast>>(visitor: &mut V, expr: &'ast CallExpression) {
    visitor.visit_expression(&expr.callee);
    for arg in &expr.arguments {
        visitor.visit_expression(arg);
    }
}

pub fn walk_object_expression<'ast, V: Visitor<'ast>>(
    visitor: &mut V,
    expr: &'ast ObjectExpression,
) {
    for property in &expr.properties {
        visitor.visit_expression(&property.value);
    }
}

pub fn walk_yield_expression<'ast, V: Visitor<'ast>>(visitor: &mut V, expr: &'ast YieldExpression) {
    if let Some(argument) = &expr.argument {
        visitor.visit_expression(argument);
    }
}

pub fn walk_await_expression<'ast, V: Visitor<'ast>>(visitor: &mut V, expr: &'ast AwaitExpression) {
    visitor.visit_expression(&expr.argument);
}

pub fn walk_pattern<'ast, V: Visitor<'ast>>(visitor: &mut V, pattern: &'ast Pattern) {
    match pattern {
        Pattern::Identifier(id) => visitor.visit_binding_identifier(id),
        Pattern::Array(array) => {
            for element in array.elements.iter().flatten() {
                visitor.visit_pattern(&element.pattern);
                if let Some(default) = &element.default {
                    visitor.visit_expression(default);
                }
            }
        }
        Pattern::Object(object) => {
            for property in &object.properties {
                visitor.visit_pattern(&property.value);
                if let Some(default) = &property.default {
                    visitor.visit_expression(default);
                }
            }
        }
    }
}
