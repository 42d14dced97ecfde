//! Suspension point discovery
//!
//! Finds `yield`/`await` inside a statement list without entering nested
//! functions or classes, which suspend their own state machines.

use kiln_syntax::ast::*;

#[derive(Default)]
struct SuspendFinder {
    found: bool,
}

impl<'ast> Visitor<'ast> for SuspendFinder {
    fn visit_statement(&mut self, stmt: &'ast Statement) {
        if !self.found {
            walk_statement(self, stmt);
        }
    }

    fn visit_function(&mut self, _func: &'ast Function) {}

    fn visit_class(&mut self, _class: &'ast Class) {}

    fn visit_yield_expression(&mut self, _expr: &'ast YieldExpression) {
        self.found = true;
    }

    fn visit_await_expression(&mut self, _expr: &'ast AwaitExpression) {
        self.found = true;
    }
}

/// Whether any statement suspends the enclosing callable
pub fn contains_suspension(statements: &[Statement]) -> bool {
    let mut finder = SuspendFinder::default();
    for stmt in statements {
        finder.visit_statement(stmt);
        if finder.found {
            return true;
        }
    }
    false
}
