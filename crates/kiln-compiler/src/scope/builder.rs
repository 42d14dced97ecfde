//! Scope tree construction
//!
//! Walks a module once and records a scope per function, arrow, method,
//! constructor, class, block, loop head and catch clause, the bindings each
//! declares and every identifier reference it contains. Resolution of those
//! references happens afterwards (see [`super::captures`]), so declaration
//! order inside a scope does not matter here.

use kiln_syntax::ast::*;
use kiln_syntax::Span;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use super::tree::{BindingKind, ScopeId, ScopeKind, ScopeTree, RECEIVER_NAME};

/// Declaration context while a binding pattern is being walked
#[derive(Debug, Clone, Copy)]
struct PendingDecl {
    scope: ScopeId,
    kind: BindingKind,
    parameter_index: Option<u32>,
    destructured: bool,
}

/// Builds a [`ScopeTree`] from a module
pub struct ScopeTreeBuilder {
    tree: ScopeTree,
    current: ScopeId,
    /// Name of the assignment target an anonymous function or class is
    /// about to be bound to
    name_hint: Option<String>,
    pending_decl: Option<PendingDecl>,
    child_names: FxHashMap<ScopeId, FxHashSet<String>>,
    class_counter: u32,
}

impl ScopeTreeBuilder {
    pub fn new(module_name: impl Into<String>, span: Span) -> Self {
        let tree = ScopeTree::new(module_name, span);
        let current = tree.root();
        Self {
            tree,
            current,
            name_hint: None,
            pending_decl: None,
            child_names: FxHashMap::default(),
            class_counter: 0,
        }
    }

    /// Build the scope tree for a module, rooted at the module's own name
    pub fn build(module: &Module) -> ScopeTree {
        Self::build_named(module, &module.name)
    }

    /// Build the scope tree for a module under an explicit root name
    pub fn build_named(module: &Module, module_name: &str) -> ScopeTree {
        let mut builder = Self::new(module_name, module.span);
        builder.visit_module(module);
        builder.tree
    }

    // ========================================================================
    // Scope management
    // ========================================================================

    fn unique_child_name(&mut self, parent: ScopeId, base: String) -> String {
        let names = self.child_names.entry(parent).or_default();
        if names.insert(base.clone()) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}_{}", base, n);
            if names.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    fn open_scope(
        &mut self,
        base_name: String,
        kind: ScopeKind,
        node: Option<kiln_syntax::NodeId>,
        span: Span,
    ) -> ScopeId {
        let parent = self.current;
        let name = self.unique_child_name(parent, base_name);
        let id = self.tree.add_scope(parent, name, kind, node, span);
        trace!(scope = %self.tree.scope(id).qualified_name, ?kind, "scope created");
        id
    }

    /// Nearest scope hosting `var` declarations
    fn var_scope(&self) -> ScopeId {
        let mut current = self.current;
        loop {
            let scope = self.tree.scope(current);
            if scope.kind.is_var_scope() {
                return current;
            }
            match scope.parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    fn declare_pattern<'ast>(&mut self, pattern: &'ast Pattern, decl: PendingDecl) {
        let saved = self.pending_decl.replace(decl);
        self.visit_pattern(pattern);
        self.pending_decl = saved;
    }

    fn reference(&mut self, name: &str, is_write: bool) {
        self.tree.add_reference(self.current, name, is_write);
    }

    // ========================================================================
    // Callables
    // ========================================================================

    fn function_scope_name(&mut self, func: &Function) -> String {
        let hint = self.name_hint.take();
        if let Some(name) = &func.name {
            return name.name.clone();
        }
        let prefix = if func.is_arrow {
            "ArrowFunction"
        } else {
            "FunctionExpression"
        };
        match hint {
            Some(target) => format!("{}_{}", prefix, target),
            None => format!("{}_{}", prefix, func.span.position_suffix()),
        }
    }

    /// Create a callable scope, declare its parameters and visit their
    /// defaults. Leaves `current` at the new scope; the caller restores it.
    fn begin_callable<'ast>(
        &mut self,
        name: String,
        kind: ScopeKind,
        func: Option<&'ast Function>,
        span: Span,
    ) -> ScopeId {
        let scope = self.open_scope(name, kind, func.map(|f| f.id), span);
        self.current = scope;

        if let Some(func) = func {
            {
                let s = self.tree.scope_mut(scope);
                s.is_generator = func.is_generator;
                s.is_async = func.is_async;
                s.arity = func.params.len() as u32;
            }
            for (index, param) in func.params.iter().enumerate() {
                let decl = PendingDecl {
                    scope,
                    kind: BindingKind::Parameter,
                    parameter_index: Some(index as u32),
                    destructured: !param.pattern.is_identifier(),
                };
                self.declare_pattern(&param.pattern, decl);
                if let Some(default) = &param.default_value {
                    self.visit_expression(default);
                }
            }
        }
        scope
    }

    fn enter_function<'ast>(&mut self, func: &'ast Function, is_expression: bool) {
        let name = self.function_scope_name(func);
        let kind = if func.is_arrow {
            ScopeKind::Arrow
        } else {
            ScopeKind::Function
        };
        let saved_scope = self.current;
        let saved_pending = self.pending_decl.take();

        let scope = self.begin_callable(name, kind, Some(func), func.span);
        if is_expression {
            if let Some(own_name) = &func.name {
                self.tree
                    .declare(scope, &own_name.name, BindingKind::Function, own_name.span);
            }
        }
        walk_function_body(self, &func.body);

        self.current = saved_scope;
        self.pending_decl = saved_pending;
    }

    fn enter_class<'ast>(&mut self, class: &'ast Class, is_expression: bool) {
        let hint = self.name_hint.take();
        let name = match (&class.name, hint) {
            (Some(name), _) => name.name.clone(),
            (None, Some(target)) => target,
            (None, None) => {
                let name = format!("Class{}", self.class_counter);
                self.class_counter += 1;
                name
            }
        };
        let saved_scope = self.current;
        let saved_pending = self.pending_decl.take();

        let class_scope = self.open_scope(name, ScopeKind::Class, Some(class.id), class.span);
        self.current = class_scope;
        if is_expression {
            if let Some(own_name) = &class.name {
                self.tree
                    .declare(class_scope, &own_name.name, BindingKind::Class, own_name.span);
            }
        }

        // Constructor first so its scope precedes the methods. Instance
        // field initializers run inside it.
        let ctor = class.constructor();
        let ctor_span = ctor.map(|f| f.span).unwrap_or(class.span);
        self.begin_callable("constructor".to_string(), ScopeKind::Constructor, ctor, ctor_span);
        for field in class.instance_fields() {
            if let Some(init) = &field.initializer {
                if init.is_anonymous_definition() {
                    self.name_hint = Some(field.name.name.clone());
                }
                self.visit_expression(init);
                self.name_hint = None;
            }
        }
        if let Some(ctor) = ctor {
            walk_function_body(self, &ctor.body);
        }
        self.current = class_scope;

        for member in &class.members {
            if let ClassMember::Method(method) = member {
                let scope = self.begin_callable(
                    method.name.name.clone(),
                    ScopeKind::Method,
                    Some(&method.function),
                    method.function.span,
                );
                self.tree.scope_mut(scope).is_static = method.is_static;
                walk_function_body(self, &method.function.body);
                self.current = class_scope;
            }
        }

        for member in &class.members {
            if let ClassMember::Field(field) = member {
                if let (true, Some(init)) = (field.is_static, &field.initializer) {
                    self.visit_expression(init);
                }
            }
        }

        self.current = saved_scope;
        self.pending_decl = saved_pending;
    }

    /// for-of and for-in: the iterated expression is evaluated outside the
    /// loop scope, the head declaration inside it
    fn enter_for_each<'ast>(
        &mut self,
        node: kiln_syntax::NodeId,
        span: Span,
        left: &'ast ForOfLeft,
        right: &'ast Expression,
        body: &'ast Statement,
    ) {
        self.visit_expression(right);

        let saved = self.current;
        let scope = self.enter_block("For", node, span, ScopeKind::For);
        match left {
            ForOfLeft::Declaration { kind, pattern } => {
                let (target, binding_kind) = match kind {
                    VariableKind::Var => (self.var_scope(), BindingKind::Var),
                    VariableKind::Let => (scope, BindingKind::Let),
                    VariableKind::Const => (scope, BindingKind::Const),
                };
                self.declare_pattern(
                    pattern,
                    PendingDecl {
                        scope: target,
                        kind: binding_kind,
                        parameter_index: None,
                        destructured: false,
                    },
                );
            }
            ForOfLeft::Pattern(pattern) => walk_assignment_pattern(self, pattern),
        }
        self.visit_statement(body);
        self.current = saved;
    }

    fn enter_block(&mut self, prefix: &str, node: kiln_syntax::NodeId, span: Span, kind: ScopeKind) -> ScopeId {
        let scope = self.open_scope(
            format!("{}_{}", prefix, span.position_suffix()),
            kind,
            Some(node),
            span,
        );
        self.current = scope;
        scope
    }
}

impl<'ast> Visitor<'ast> for ScopeTreeBuilder {
    fn visit_statement(&mut self, stmt: &'ast Statement) {
        match stmt {
            Statement::FunctionDecl(func) => {
                if let Some(name) = &func.name {
                    self.tree
                        .declare(self.current, &name.name, BindingKind::Function, name.span);
                }
                self.enter_function(func, false);
            }
            Statement::ClassDecl(class) => {
                if let Some(name) = &class.name {
                    self.tree
                        .declare(self.current, &name.name, BindingKind::Class, name.span);
                }
                self.enter_class(class, false);
            }
            _ => walk_statement(self, stmt),
        }
    }

    fn visit_variable_declarator(&mut self, kind: VariableKind, decl: &'ast VariableDeclarator) {
        let (scope, binding_kind) = match kind {
            VariableKind::Var => (self.var_scope(), BindingKind::Var),
            VariableKind::Let => (self.current, BindingKind::Let),
            VariableKind::Const => (self.current, BindingKind::Const),
        };
        self.declare_pattern(
            &decl.pattern,
            PendingDecl {
                scope,
                kind: binding_kind,
                parameter_index: None,
                destructured: false,
            },
        );
        if let Some(init) = &decl.initializer {
            if let (Pattern::Identifier(target), true) =
                (&decl.pattern, init.is_anonymous_definition())
            {
                self.name_hint = Some(target.name.clone());
            }
            self.visit_expression(init);
            self.name_hint = None;
        }
    }

    fn visit_function(&mut self, func: &'ast Function) {
        self.enter_function(func, true);
    }

    fn visit_class(&mut self, class: &'ast Class) {
        self.enter_class(class, true);
    }

    fn visit_for_statement(&mut self, stmt: &'ast ForStatement) {
        let saved = self.current;
        self.enter_block("For", stmt.id, stmt.span, ScopeKind::For);
        walk_for_statement(self, stmt);
        self.current = saved;
    }

    fn visit_for_of_statement(&mut self, stmt: &'ast ForOfStatement) {
        self.enter_for_each(stmt.id, stmt.span, &stmt.left, &stmt.right, &stmt.body);
    }

    fn visit_for_in_statement(&mut self, stmt: &'ast ForInStatement) {
        self.enter_for_each(stmt.id, stmt.span, &stmt.left, &stmt.right, &stmt.body);
    }

    fn visit_switch_statement(&mut self, stmt: &'ast SwitchStatement) {
        self.visit_expression(&stmt.discriminant);

        let saved = self.current;
        self.enter_block("Switch", stmt.id, stmt.span, ScopeKind::Block);
        for case in &stmt.cases {
            if let Some(test) = &case.test {
                self.visit_expression(test);
            }
            for body_stmt in &case.body {
                self.visit_statement(body_stmt);
            }
        }
        self.current = saved;
    }

    fn visit_catch_clause(&mut self, clause: &'ast CatchClause) {
        let saved = self.current;
        let scope = self.enter_block("Catch", clause.id, clause.span, ScopeKind::Catch);
        if let Some(param) = &clause.param {
            self.declare_pattern(
                param,
                PendingDecl {
                    scope,
                    kind: BindingKind::CatchParameter,
                    parameter_index: None,
                    destructured: false,
                },
            );
        }
        for stmt in &clause.body.statements {
            self.visit_statement(stmt);
        }
        self.current = saved;
    }

    fn visit_block_statement(&mut self, stmt: &'ast BlockStatement) {
        let saved = self.current;
        self.enter_block("Block", stmt.id, stmt.span, ScopeKind::Block);
        walk_block_statement(self, stmt);
        self.current = saved;
    }

    fn visit_assignment_expression(&mut self, expr: &'ast AssignmentExpression) {
        match expr.left.as_ref() {
            Expression::Identifier(target) => {
                self.reference(&target.name, true);
                if expr.right.is_anonymous_definition() {
                    self.name_hint = Some(target.name.clone());
                }
            }
            Expression::Member(member) => {
                self.visit_expression(&member.object);
                if expr.right.is_anonymous_definition() {
                    self.name_hint = Some(member.property.name.clone());
                }
            }
            other => self.visit_expression(other),
        }
        self.visit_expression(&expr.right);
        self.name_hint = None;
    }

    fn visit_update_expression(&mut self, expr: &'ast UpdateExpression) {
        match expr.argument.as_ref() {
            Expression::Identifier(target) => self.reference(&target.name, true),
            other => self.visit_expression(other),
        }
    }

    fn visit_object_expression(&mut self, expr: &'ast ObjectExpression) {
        for property in &expr.properties {
            if property.value.is_anonymous_definition() {
                self.name_hint = Some(property.key.name.clone());
            }
            self.visit_expression(&property.value);
            self.name_hint = None;
        }
    }

    fn visit_this(&mut self, _span: &'ast Span) {
        if let Some(receiver_scope) = self.tree.receiver_scope(self.current) {
            let span = self.tree.scope(receiver_scope).span;
            self.tree
                .declare(receiver_scope, RECEIVER_NAME, BindingKind::Receiver, span);
            self.reference(RECEIVER_NAME, false);
        }
    }

    fn visit_identifier(&mut self, id: &'ast Identifier) {
        self.reference(&id.name, false);
    }

    fn visit_binding_identifier(&mut self, id: &'ast Identifier) {
        let Some(decl) = self.pending_decl else {
            return;
        };
        let binding = self.tree.declare(decl.scope, &id.name, decl.kind, id.span);
        if decl.kind == BindingKind::Parameter {
            let binding = self.tree.binding_mut(binding);
            binding.parameter_index = decl.parameter_index;
            binding.is_destructured = decl.destructured;
        }
    }
}
