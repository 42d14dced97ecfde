//! Statement lowering
//!
//! Converts AST statements to LIR. Structured control flow becomes labels
//! and branches; `try` becomes protected regions whose finally bodies are
//! entered through a completion record (kind + value temps) so abrupt
//! exits replay after the finally body runs.

use kiln_syntax::ast::{self, Pattern, Statement, VariableKind};

use super::control_flow::{completion, ControlEntry, FinallyContext, JumpKind, LoopContext};
use super::suspend::contains_suspension;
use super::FunctionLowerer;
use crate::error::{CompileError, CompileResult};
use crate::lir::{BinaryOp, Constant, ExceptionRegionInfo, Instr, Label, RegionKind, Temp};

impl<'a> FunctionLowerer<'a> {
    /// Lower a statement list, hoisting its function declarations first
    pub(super) fn lower_statements(&mut self, statements: &[Statement]) -> CompileResult<()> {
        self.hoist_functions(statements)?;
        for stmt in statements {
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    fn hoist_functions(&mut self, statements: &[Statement]) -> CompileResult<()> {
        for stmt in statements {
            if let Statement::FunctionDecl(func) = stmt {
                let scope = self.node_scope(func.id)?;
                let closure = self.make_closure(scope)?;
                if let Some(name) = &func.name {
                    self.store_name(&name.name, closure)?;
                }
            }
        }
        Ok(())
    }

    pub(super) fn lower_stmt(&mut self, stmt: &Statement) -> CompileResult<()> {
        match stmt {
            Statement::VariableDecl(decl) => self.lower_var_decl(decl),
            // hoisted by lower_statements
            Statement::FunctionDecl(_) => Ok(()),
            Statement::ClassDecl(class) => {
                let value = self.lower_class(class)?;
                if let Some(name) = &class.name {
                    self.store_name(&name.name, value)?;
                }
                Ok(())
            }
            Statement::Expression(expr_stmt) => {
                self.lower_expr(&expr_stmt.expression)?;
                Ok(())
            }
            Statement::If(if_stmt) => self.lower_if(if_stmt),
            Statement::While(while_stmt) => self.lower_while(while_stmt),
            Statement::DoWhile(do_while) => self.lower_do_while(do_while),
            Statement::For(for_stmt) => self.lower_for(for_stmt),
            Statement::ForOf(for_of) => self.lower_for_of(for_of),
            Statement::ForIn(for_in) => self.lower_for_in(for_in),
            Statement::Switch(switch) => self.lower_switch(switch),
            Statement::Break(brk) => {
                self.lower_jump(JumpKind::Break, brk.label.as_ref().map(|l| l.name.as_str()))
            }
            Statement::Continue(cont) => {
                self.lower_jump(JumpKind::Continue, cont.label.as_ref().map(|l| l.name.as_str()))
            }
            Statement::Return(ret) => {
                let value = match &ret.value {
                    Some(expr) => self.lower_expr(expr)?,
                    None => self.constant(Constant::Undefined),
                };
                self.lower_return_value(value)
            }
            Statement::Throw(throw) => {
                let value = self.lower_expr(&throw.value)?;
                self.builder.emit(Instr::Throw { value });
                Ok(())
            }
            Statement::Try(try_stmt) => self.lower_try(try_stmt),
            Statement::Block(block) => self.lower_block(block),
            Statement::Labeled(labeled) => self.lower_labeled(labeled),
            Statement::Empty(_) => Ok(()),
        }
    }

    fn lower_var_decl(&mut self, decl: &ast::VariableDecl) -> CompileResult<()> {
        for declarator in &decl.declarations {
            match &declarator.initializer {
                Some(init) => {
                    let value = self.lower_expr(init)?;
                    self.store_pattern(&declarator.pattern, value)?;
                }
                // `var x;` keeps whatever the hoisted binding holds
                None if decl.kind == VariableKind::Var => {}
                None => match &declarator.pattern {
                    Pattern::Identifier(id) => {
                        let undefined = self.constant(Constant::Undefined);
                        self.store_name(&id.name, undefined)?;
                    }
                    _ => {
                        return Err(CompileError::UnsupportedFeature {
                            feature: "destructuring declaration without initializer".to_string(),
                        })
                    }
                },
            }
        }
        Ok(())
    }

    pub(super) fn lower_block(&mut self, block: &ast::BlockStatement) -> CompileResult<()> {
        let scope = self.node_scope(block.id)?;
        let saved = self.enter_scope(scope);
        self.lower_statements(&block.statements)?;
        self.current_scope = saved;
        Ok(())
    }

    fn lower_if(&mut self, if_stmt: &ast::IfStatement) -> CompileResult<()> {
        let cond = self.lower_expr(&if_stmt.condition)?;
        let else_label = self.builder.new_label();
        self.builder.emit(Instr::BranchIfFalse {
            cond,
            target: else_label,
        });
        self.lower_stmt(&if_stmt.then_branch)?;

        match &if_stmt.else_branch {
            Some(else_branch) => {
                let end = self.builder.new_label();
                if !self.builder.is_terminated() {
                    self.builder.emit(Instr::Branch { target: end });
                }
                self.builder.place(else_label);
                self.lower_stmt(else_branch)?;
                self.builder.place(end);
            }
            None => self.builder.place(else_label),
        }
        Ok(())
    }

    fn lower_while(&mut self, while_stmt: &ast::WhileStatement) -> CompileResult<()> {
        let labels = std::mem::take(&mut self.pending_labels);
        let header = self.builder.new_label();
        let exit = self.builder.new_label();

        self.builder.place(header);
        let cond = self.lower_expr(&while_stmt.condition)?;
        self.builder.emit(Instr::BranchIfFalse { cond, target: exit });

        self.control.push_loop(
            LoopContext::new(exit, header, self.protected_depth).with_labels(labels),
        );
        self.lower_stmt(&while_stmt.body)?;
        self.control.pop();

        if !self.builder.is_terminated() {
            self.builder.emit(Instr::Branch { target: header });
        }
        self.builder.place(exit);
        Ok(())
    }

    fn lower_do_while(&mut self, do_while: &ast::DoWhileStatement) -> CompileResult<()> {
        let labels = std::mem::take(&mut self.pending_labels);
        let body = self.builder.new_label();
        let cond_label = self.builder.new_label();
        let exit = self.builder.new_label();

        self.builder.place(body);
        self.control.push_loop(
            LoopContext::new(exit, cond_label, self.protected_depth).with_labels(labels),
        );
        self.lower_stmt(&do_while.body)?;
        self.control.pop();

        self.builder.place(cond_label);
        let cond = self.lower_expr(&do_while.condition)?;
        self.builder.emit(Instr::BranchIfTrue { cond, target: body });
        self.builder.place(exit);
        Ok(())
    }

    /// `for (init; test; update)`. Closures created in the body see the
    /// loop variables of their own iteration: the head scope's record is
    /// copied into a fresh one before each update.
    fn lower_for(&mut self, for_stmt: &ast::ForStatement) -> CompileResult<()> {
        let labels = std::mem::take(&mut self.pending_labels);
        let scope = self.node_scope(for_stmt.id)?;
        let saved = self.enter_scope(scope);

        match &for_stmt.init {
            Some(ast::ForInit::VariableDecl(decl)) => self.lower_var_decl(decl)?,
            Some(ast::ForInit::Expression(expr)) => {
                self.lower_expr(expr)?;
            }
            None => {}
        }

        let header = self.builder.new_label();
        let update = self.builder.new_label();
        let exit = self.builder.new_label();

        self.builder.place(header);
        if let Some(test) = &for_stmt.test {
            let cond = self.lower_expr(test)?;
            self.builder.emit(Instr::BranchIfFalse { cond, target: exit });
        }

        self.control.push_loop(
            LoopContext::new(exit, update, self.protected_depth).with_labels(labels),
        );
        self.lower_stmt(&for_stmt.body)?;
        self.control.pop();

        self.builder.place(update);
        if self.tree.has_record(scope) {
            self.builder.emit(Instr::RenewBlockScope {
                scope: self.tree.scope(scope).qualified_name.clone(),
            });
        }
        if let Some(update_expr) = &for_stmt.update {
            self.lower_expr(update_expr)?;
        }
        self.builder.emit(Instr::Branch { target: header });
        self.builder.place(exit);

        self.current_scope = saved;
        Ok(())
    }

    /// `for (left of right)`. The iterated expression is evaluated outside
    /// the loop scope; each iteration enters a fresh loop scope.
    fn lower_for_of(&mut self, for_of: &ast::ForOfStatement) -> CompileResult<()> {
        let labels = std::mem::take(&mut self.pending_labels);
        let iterable = self.lower_expr(&for_of.right)?;
        let iterator = self.builder.new_temp();
        self.builder.emit(Instr::GetIterator {
            dest: iterator,
            iterable,
        });
        self.lower_iteration(for_of.id, &for_of.left, &for_of.body, iterator, true, labels)
    }

    /// `for (left in right)`: iterates a snapshot of the enumerable keys
    /// taken before the first iteration
    fn lower_for_in(&mut self, for_in: &ast::ForInStatement) -> CompileResult<()> {
        let labels = std::mem::take(&mut self.pending_labels);
        let object = self.lower_expr(&for_in.right)?;
        let iterator = self.builder.new_temp();
        self.builder.emit(Instr::EnumerateKeys {
            dest: iterator,
            object,
        });
        self.lower_iteration(for_in.id, &for_in.left, &for_in.body, iterator, false, labels)
    }

    /// Shared loop of for-of and for-in. `closes` marks iterators that must
    /// be closed when the loop is left early.
    fn lower_iteration(
        &mut self,
        node: kiln_syntax::NodeId,
        left: &ast::ForOfLeft,
        body: &Statement,
        iterator: Temp,
        closes: bool,
        labels: Vec<String>,
    ) -> CompileResult<()> {
        let header = self.builder.new_label();
        let exit = self.builder.new_label();
        let done = self.builder.new_temp();
        let value = self.builder.new_temp();

        self.builder.place(header);
        self.builder.emit(Instr::IteratorStep {
            iterator,
            done,
            value,
        });
        self.builder.emit(Instr::BranchIfTrue {
            cond: done,
            target: exit,
        });

        let scope = self.node_scope(node)?;
        let saved = self.enter_scope(scope);
        match left {
            ast::ForOfLeft::Declaration { pattern, .. } | ast::ForOfLeft::Pattern(pattern) => {
                self.store_pattern(pattern, value)?;
            }
        }

        let mut ctx = LoopContext::new(exit, header, self.protected_depth).with_labels(labels);
        if closes {
            ctx = ctx.with_iterator(iterator);
        }
        self.control.push_loop(ctx);
        self.lower_stmt(body)?;
        self.control.pop();
        self.current_scope = saved;

        if !self.builder.is_terminated() {
            self.builder.emit(Instr::Branch { target: header });
        }
        self.builder.place(exit);
        Ok(())
    }

    /// Lower `switch`.
    ///
    /// ```text
    /// d = discriminant
    /// [enter block scope, hoist functions of every case]
    /// t0 = test0; br_if d === t0 -> L0
    /// t1 = test1; br_if d === t1 -> L1
    /// br Ldefault | exit
    /// L0: body0            (falls through)
    /// L1: body1
    /// exit:
    /// ```
    fn lower_switch(&mut self, switch: &ast::SwitchStatement) -> CompileResult<()> {
        let labels = std::mem::take(&mut self.pending_labels);
        let discriminant = self.lower_expr(&switch.discriminant)?;

        let scope = self.node_scope(switch.id)?;
        let saved = self.enter_scope(scope);
        for case in &switch.cases {
            self.hoist_functions(&case.body)?;
        }

        let exit = self.builder.new_label();
        let case_labels: Vec<Label> = switch.cases.iter().map(|_| self.builder.new_label()).collect();
        let mut default = None;
        for (case, &label) in switch.cases.iter().zip(&case_labels) {
            let Some(test) = &case.test else {
                default = Some(label);
                continue;
            };
            let value = self.lower_expr(test)?;
            let matched = self.builder.new_temp();
            self.builder.emit(Instr::Binary {
                dest: matched,
                op: BinaryOp::StrictEqual,
                left: discriminant,
                right: value,
            });
            self.builder.emit(Instr::BranchIfTrue {
                cond: matched,
                target: label,
            });
        }
        self.builder.emit(Instr::Branch {
            target: default.unwrap_or(exit),
        });

        self.control
            .push_loop(LoopContext::switch(exit, self.protected_depth).with_labels(labels));
        for (case, &label) in switch.cases.iter().zip(&case_labels) {
            self.builder.place(label);
            for stmt in &case.body {
                self.lower_stmt(stmt)?;
            }
        }
        self.control.pop();

        self.builder.place(exit);
        self.current_scope = saved;
        Ok(())
    }

    fn lower_labeled(&mut self, labeled: &ast::LabeledStatement) -> CompileResult<()> {
        let name = labeled.label.name.clone();
        if labeled.body.is_loop()
            || matches!(labeled.body.as_ref(), Statement::Labeled(_) | Statement::Switch(_))
        {
            self.pending_labels.push(name);
            return self.lower_stmt(&labeled.body);
        }

        let mut labels = std::mem::take(&mut self.pending_labels);
        labels.push(name.clone());
        let exit = self.builder.new_label();
        self.control.push_loop(
            LoopContext::labeled_block(exit, name, self.protected_depth).with_labels(labels),
        );
        self.lower_stmt(&labeled.body)?;
        self.control.pop();
        self.builder.place(exit);
        Ok(())
    }

    /// `break`/`continue`: close the iterators of for-of loops being exited
    /// and route through the innermost pending finally body, if any
    pub(super) fn lower_jump(&mut self, kind: JumpKind, label: Option<&str>) -> CompileResult<()> {
        let invalid = |message: String| CompileError::InvalidJump {
            callable: self.name().to_string(),
            message,
        };
        let describe = || match (label, kind) {
            (Some(l), _) => format!("'{}'", l),
            (None, JumpKind::Break) => "enclosing loop or switch".to_string(),
            (None, JumpKind::Continue) => "enclosing loop".to_string(),
        };
        let Some(target) = self.control.find_target(kind, label) else {
            return Err(invalid(format!("no {} for {:?}", describe(), kind)));
        };
        let (target_label, target_depth, target_iterator) = match self.control.get(target) {
            Some(ControlEntry::Loop(ctx)) => {
                let target_label = match kind {
                    JumpKind::Break => ctx.break_label,
                    JumpKind::Continue => ctx
                        .continue_label
                        .ok_or_else(|| invalid(format!("continue to non-loop {}", describe())))?,
                };
                (target_label, ctx.protected_depth, ctx.iterator)
            }
            _ => return Err(CompileError::internal("jump target is not a loop")),
        };

        for index in (target + 1..self.control.len()).rev() {
            match self.control.get_mut(index) {
                Some(ControlEntry::Loop(ctx)) => {
                    if let Some(iterator) = ctx.iterator {
                        self.builder.emit(Instr::IteratorClose { iterator });
                    }
                }
                Some(ControlEntry::Finally(ctx)) => {
                    let code = ctx.register_jump(kind, label);
                    let (kind_temp, entry) = (ctx.kind, ctx.entry);
                    self.builder.emit(Instr::Const {
                        dest: kind_temp,
                        value: Constant::Number(code as f64),
                    });
                    self.builder.emit(Instr::Leave { target: entry });
                    return Ok(());
                }
                None => {}
            }
        }

        if kind == JumpKind::Break {
            if let Some(iterator) = target_iterator {
                self.builder.emit(Instr::IteratorClose { iterator });
            }
        }
        if self.protected_depth > target_depth {
            self.builder.emit(Instr::Leave {
                target: target_label,
            });
        } else {
            self.builder.emit(Instr::Branch {
                target: target_label,
            });
        }
        Ok(())
    }

    /// Return `value` from the callable, running pending finally bodies
    /// first. Returns inside protected regions leave through a shared
    /// epilogue.
    pub(super) fn lower_return_value(&mut self, value: Temp) -> CompileResult<()> {
        for index in (0..self.control.len()).rev() {
            match self.control.get(index) {
                Some(ControlEntry::Loop(ctx)) => {
                    if let Some(iterator) = ctx.iterator {
                        self.builder.emit(Instr::IteratorClose { iterator });
                    }
                }
                Some(ControlEntry::Finally(ctx)) => {
                    let (kind_temp, value_temp, entry) = (ctx.kind, ctx.value, ctx.entry);
                    self.builder.emit(Instr::Move {
                        dest: value_temp,
                        src: value,
                    });
                    self.builder.emit(Instr::Const {
                        dest: kind_temp,
                        value: Constant::Number(completion::RETURN),
                    });
                    self.builder.emit(Instr::Leave { target: entry });
                    return Ok(());
                }
                None => {}
            }
        }

        if self.protected_depth == 0 {
            self.builder.emit(Instr::Return { value });
            return Ok(());
        }
        let (slot, exit) = match self.return_exit {
            Some(exit) => exit,
            None => {
                let exit = (self.builder.new_temp(), self.builder.new_label());
                self.return_exit = Some(exit);
                exit
            }
        };
        self.builder.emit(Instr::Move {
            dest: slot,
            src: value,
        });
        self.builder.emit(Instr::Leave { target: exit });
        Ok(())
    }

    /// Run `body` only when `value === code`
    pub(super) fn when_equals(
        &mut self,
        value: Temp,
        code: f64,
        body: impl FnOnce(&mut Self) -> CompileResult<()>,
    ) -> CompileResult<()> {
        let code_temp = self.constant(Constant::Number(code));
        let matched = self.builder.new_temp();
        self.builder.emit(Instr::Binary {
            dest: matched,
            op: BinaryOp::StrictEqual,
            left: value,
            right: code_temp,
        });
        let skip = self.builder.new_label();
        self.builder.emit(Instr::BranchIfFalse {
            cond: matched,
            target: skip,
        });
        body(self)?;
        self.builder.place(skip);
        Ok(())
    }

    /// Lower `try`/`catch`/`finally`.
    ///
    /// ```text
    /// kind = 0; value = undefined          (finally only)
    /// Lf_start:  [resume switch]
    ///   Lc_start:  [resume switch]
    ///     try body; leave F | after
    ///   Lc_end:
    ///   Lc_handler: exc = exception; leave Lc_body
    ///   Lc_body: catch body; leave F | br after
    /// Lf_end:
    /// Lf_handler: value = exception; kind = 1; leave F
    /// F: finally body
    ///    dispatch on kind: throw / return / replay jumps
    /// after:
    /// ```
    ///
    /// Catch and finally bodies are ordinary code outside their own
    /// regions, so suspensions inside them need no handler re-entry.
    fn lower_try(&mut self, try_stmt: &ast::TryStatement) -> CompileResult<()> {
        let after = self.builder.new_label();

        let finally_entry = match &try_stmt.finally_clause {
            Some(_) => {
                let kind = self.constant(Constant::Number(completion::NORMAL));
                let value = self.constant(Constant::Undefined);
                let entry = self.builder.new_label();
                self.control
                    .push_finally(FinallyContext::new(kind, value, entry));
                Some(entry)
            }
            None => None,
        };
        let normal_exit = finally_entry.unwrap_or(after);

        let try_suspends = contains_suspension(&try_stmt.body.statements);
        let catch_suspends = try_stmt
            .catch_clause
            .as_ref()
            .is_some_and(|c| contains_suspension(&c.body.statements));

        let finally_region = finally_entry.map(|_| {
            let start = self.builder.new_label();
            self.builder.place(start);
            let opened = self.open_dispatch_region(start, try_suspends || catch_suspends);
            self.protected_depth += 1;
            (start, opened)
        });

        match &try_stmt.catch_clause {
            Some(catch) => {
                let try_start = self.builder.new_label();
                let try_end = self.builder.new_label();
                let handler_start = self.builder.new_label();
                let handler_end = self.builder.new_label();
                let catch_body = self.builder.new_label();

                self.builder.place(try_start);
                let opened = self.open_dispatch_region(try_start, try_suspends);
                self.protected_depth += 1;
                self.lower_block(&try_stmt.body)?;
                if !self.builder.is_terminated() {
                    self.builder.emit(Instr::Leave {
                        target: normal_exit,
                    });
                }
                self.protected_depth -= 1;
                self.close_dispatch_region(opened);
                self.builder.place(try_end);

                self.builder.place(handler_start);
                let exception = self.builder.new_temp();
                self.builder.emit(Instr::StoreException { dest: exception });
                self.builder.emit(Instr::Leave { target: catch_body });
                self.builder.place(handler_end);
                self.builder.add_region(ExceptionRegionInfo {
                    kind: RegionKind::Catch,
                    try_start,
                    try_end,
                    handler_start,
                    handler_end,
                    exception_type_filter: None,
                });

                self.builder.place(catch_body);
                let scope = self.node_scope(catch.id)?;
                let saved = self.enter_scope(scope);
                if let Some(param) = &catch.param {
                    self.store_pattern(param, exception)?;
                }
                self.lower_statements(&catch.body.statements)?;
                self.current_scope = saved;
                if !self.builder.is_terminated() {
                    match finally_entry {
                        Some(entry) => self.builder.emit(Instr::Leave { target: entry }),
                        None => self.builder.emit(Instr::Branch { target: after }),
                    }
                }
            }
            None => {
                self.lower_block(&try_stmt.body)?;
                if !self.builder.is_terminated() {
                    self.builder.emit(Instr::Leave {
                        target: normal_exit,
                    });
                }
            }
        }

        if let (Some((try_start, opened)), Some(finally)) =
            (finally_region, &try_stmt.finally_clause)
        {
            self.protected_depth -= 1;
            self.close_dispatch_region(opened);
            let try_end = self.builder.new_label();
            let handler_start = self.builder.new_label();
            let handler_end = self.builder.new_label();
            self.builder.place(try_end);

            let ctx = self
                .control
                .pop_finally()
                .ok_or_else(|| CompileError::internal("finally context missing"))?;
            self.builder.place(handler_start);
            self.builder.emit(Instr::StoreException { dest: ctx.value });
            self.builder.emit(Instr::Const {
                dest: ctx.kind,
                value: Constant::Number(completion::THROW),
            });
            self.builder.emit(Instr::Leave { target: ctx.entry });
            self.builder.place(handler_end);
            self.builder.add_region(ExceptionRegionInfo {
                kind: RegionKind::Finally,
                try_start,
                try_end,
                handler_start,
                handler_end,
                exception_type_filter: None,
            });

            self.builder.place(ctx.entry);
            self.lower_block(finally)?;
            // An abrupt exit from the finally body discards the pending
            // completion
            if !self.builder.is_terminated() {
                let (kind, value) = (ctx.kind, ctx.value);
                self.when_equals(kind, completion::THROW, |this| {
                    this.builder.emit(Instr::Throw { value });
                    Ok(())
                })?;
                self.when_equals(kind, completion::RETURN, |this| {
                    this.lower_return_value(value)
                })?;
                for jump in &ctx.jumps {
                    self.when_equals(kind, jump.code as f64, |this| {
                        this.lower_jump(jump.kind, jump.label.as_deref())
                    })?;
                }
            }
        }

        self.builder.place(after);
        Ok(())
    }
}
