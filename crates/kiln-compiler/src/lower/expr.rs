//! Expression lowering
//!
//! Converts AST expressions to LIR, producing the temp that holds each
//! expression's value.

use kiln_syntax::ast::{self, Expression};

use super::FunctionLowerer;
use crate::error::{CompileError, CompileResult};
use crate::lir::{BinaryOp, Constant, Instr, SuspendKind, Temp, UnaryOp};
use crate::scope::{ScopeKind, RECEIVER_NAME};

/// An assignable location, with its object and key already evaluated
enum Place {
    Name(String),
    Property { object: Temp, name: String },
    Index { object: Temp, index: Temp },
}

fn binary_op(op: ast::BinaryOperator) -> BinaryOp {
    use ast::BinaryOperator as B;
    match op {
        B::Add => BinaryOp::Add,
        B::Subtract => BinaryOp::Sub,
        B::Multiply => BinaryOp::Mul,
        B::Divide => BinaryOp::Div,
        B::Modulo => BinaryOp::Mod,
        B::Exponent => BinaryOp::Exp,
        B::Equal => BinaryOp::Equal,
        B::NotEqual => BinaryOp::NotEqual,
        B::StrictEqual => BinaryOp::StrictEqual,
        B::StrictNotEqual => BinaryOp::StrictNotEqual,
        B::LessThan => BinaryOp::Less,
        B::LessEqual => BinaryOp::LessEqual,
        B::GreaterThan => BinaryOp::Greater,
        B::GreaterEqual => BinaryOp::GreaterEqual,
        B::BitwiseAnd => BinaryOp::BitAnd,
        B::BitwiseOr => BinaryOp::BitOr,
        B::BitwiseXor => BinaryOp::BitXor,
        B::LeftShift => BinaryOp::ShiftLeft,
        B::RightShift => BinaryOp::ShiftRight,
        B::UnsignedRightShift => BinaryOp::UnsignedShiftRight,
        B::InstanceOf => BinaryOp::InstanceOf,
    }
}

impl<'a> FunctionLowerer<'a> {
    /// Lower an expression and return the temp holding its value
    pub(super) fn lower_expr(&mut self, expr: &Expression) -> CompileResult<Temp> {
        match expr {
            Expression::NumberLiteral(lit) => Ok(self.constant(Constant::Number(lit.value))),
            Expression::StringLiteral(lit) => Ok(self.constant(Constant::String(lit.value.clone()))),
            Expression::BooleanLiteral(lit) => Ok(self.constant(Constant::Bool(lit.value))),
            Expression::NullLiteral(_) => Ok(self.constant(Constant::Null)),
            Expression::UndefinedLiteral(_) => Ok(self.constant(Constant::Undefined)),
            Expression::Identifier(id) => self.load_name(&id.name),
            Expression::This(_) => self.lower_this(),
            Expression::Array(array) => {
                let mut elements = Vec::with_capacity(array.elements.len());
                for element in &array.elements {
                    elements.push(self.lower_expr(element)?);
                }
                let dest = self.builder.new_temp();
                self.builder.emit(Instr::NewArray { dest, elements });
                Ok(dest)
            }
            Expression::Object(object) => {
                let dest = self.builder.new_temp();
                self.builder.emit(Instr::NewObject { dest });
                for property in &object.properties {
                    let value = self.lower_expr(&property.value)?;
                    self.builder.emit(Instr::SetProperty {
                        object: dest,
                        name: property.key.name.clone(),
                        value,
                    });
                }
                Ok(dest)
            }
            Expression::Unary(unary) => self.lower_unary(unary),
            Expression::Update(update) => self.lower_update(update),
            Expression::Binary(binary) => {
                let left = self.lower_expr(&binary.left)?;
                let right = self.lower_expr(&binary.right)?;
                let dest = self.builder.new_temp();
                self.builder.emit(Instr::Binary {
                    dest,
                    op: binary_op(binary.operator),
                    left,
                    right,
                });
                Ok(dest)
            }
            Expression::Logical(logical) => self.lower_logical(logical),
            Expression::Assignment(assign) => self.lower_assignment(assign),
            Expression::Conditional(cond) => self.lower_conditional(cond),
            Expression::Call(call) => self.lower_call(call),
            Expression::New(new_expr) => {
                let callee = self.lower_expr(&new_expr.callee)?;
                let args = self.lower_arguments(&new_expr.arguments)?;
                let dest = self.builder.new_temp();
                self.builder.emit(Instr::Construct { dest, callee, args });
                Ok(dest)
            }
            Expression::Member(member) => {
                let object = self.lower_expr(&member.object)?;
                let dest = self.builder.new_temp();
                self.builder.emit(Instr::GetProperty {
                    dest,
                    object,
                    name: member.property.name.clone(),
                });
                Ok(dest)
            }
            Expression::Index(index) => {
                let object = self.lower_expr(&index.object)?;
                let index = self.lower_expr(&index.index)?;
                let dest = self.builder.new_temp();
                self.builder.emit(Instr::GetIndex {
                    dest,
                    object,
                    index,
                });
                Ok(dest)
            }
            Expression::Function(func) => {
                let scope = self.node_scope(func.id)?;
                self.make_closure(scope)
            }
            Expression::Class(class) => self.lower_class(class),
            Expression::Yield(yield_expr) => {
                let value = match &yield_expr.argument {
                    Some(argument) => self.lower_expr(argument)?,
                    None => self.constant(Constant::Undefined),
                };
                if yield_expr.delegate {
                    self.lower_delegate(value)
                } else {
                    self.lower_suspend(SuspendKind::Yield, value)
                }
            }
            Expression::Await(await_expr) => {
                let value = self.lower_expr(&await_expr.argument)?;
                self.lower_suspend(SuspendKind::Await, value)
            }
            Expression::Sequence(seq) => {
                let mut last = None;
                for expr in &seq.expressions {
                    last = Some(self.lower_expr(expr)?);
                }
                match last {
                    Some(value) => Ok(value),
                    None => Ok(self.constant(Constant::Undefined)),
                }
            }
        }
    }

    fn lower_arguments(&mut self, arguments: &[Expression]) -> CompileResult<Vec<Temp>> {
        arguments.iter().map(|arg| self.lower_expr(arg)).collect()
    }

    /// `this` reads the receiver binding of the nearest non-arrow callable;
    /// at module level it is `undefined`
    fn lower_this(&mut self) -> CompileResult<Temp> {
        match self.tree.resolve(self.current_scope, RECEIVER_NAME) {
            Some(binding) => self.load_binding(binding),
            None => Ok(self.constant(Constant::Undefined)),
        }
    }

    fn lower_unary(&mut self, unary: &ast::UnaryExpression) -> CompileResult<Temp> {
        let operand = self.lower_expr(&unary.operand)?;
        let op = match unary.operator {
            ast::UnaryOperator::Plus => UnaryOp::Plus,
            ast::UnaryOperator::Minus => UnaryOp::Negate,
            ast::UnaryOperator::Not => UnaryOp::Not,
            ast::UnaryOperator::BitwiseNot => UnaryOp::BitNot,
            ast::UnaryOperator::Typeof => UnaryOp::Typeof,
            ast::UnaryOperator::Void => return Ok(self.constant(Constant::Undefined)),
        };
        let dest = self.builder.new_temp();
        self.builder.emit(Instr::Unary { dest, op, operand });
        Ok(dest)
    }

    fn lower_place(&mut self, target: &Expression) -> CompileResult<Place> {
        match target {
            Expression::Identifier(id) => Ok(Place::Name(id.name.clone())),
            Expression::Member(member) => {
                let object = self.lower_expr(&member.object)?;
                Ok(Place::Property {
                    object,
                    name: member.property.name.clone(),
                })
            }
            Expression::Index(index) => {
                let object = self.lower_expr(&index.object)?;
                let index = self.lower_expr(&index.index)?;
                Ok(Place::Index { object, index })
            }
            _ => Err(CompileError::UnsupportedFeature {
                feature: "assignment to this target".to_string(),
            }),
        }
    }

    fn load_place(&mut self, place: &Place) -> CompileResult<Temp> {
        match place {
            Place::Name(name) => self.load_name(name),
            Place::Property { object, name } => {
                let dest = self.builder.new_temp();
                self.builder.emit(Instr::GetProperty {
                    dest,
                    object: *object,
                    name: name.clone(),
                });
                Ok(dest)
            }
            Place::Index { object, index } => {
                let dest = self.builder.new_temp();
                self.builder.emit(Instr::GetIndex {
                    dest,
                    object: *object,
                    index: *index,
                });
                Ok(dest)
            }
        }
    }

    fn store_place(&mut self, place: Place, value: Temp) -> CompileResult<()> {
        match place {
            Place::Name(name) => self.store_name(&name, value),
            Place::Property { object, name } => {
                self.builder.emit(Instr::SetProperty {
                    object,
                    name,
                    value,
                });
                Ok(())
            }
            Place::Index { object, index } => {
                self.builder.emit(Instr::SetIndex {
                    object,
                    index,
                    value,
                });
                Ok(())
            }
        }
    }

    fn lower_assignment(&mut self, assign: &ast::AssignmentExpression) -> CompileResult<Temp> {
        let place = self.lower_place(&assign.left)?;
        let value = match assign.operator.binary_operator() {
            None => self.lower_expr(&assign.right)?,
            Some(op) => {
                let current = self.load_place(&place)?;
                let right = self.lower_expr(&assign.right)?;
                let dest = self.builder.new_temp();
                self.builder.emit(Instr::Binary {
                    dest,
                    op: binary_op(op),
                    left: current,
                    right,
                });
                dest
            }
        };
        self.store_place(place, value)?;
        Ok(value)
    }

    /// `++x` yields the new value, `x++` the old value converted to a number
    fn lower_update(&mut self, update: &ast::UpdateExpression) -> CompileResult<Temp> {
        let place = self.lower_place(&update.argument)?;
        let old = self.load_place(&place)?;
        let number = self.builder.new_temp();
        self.builder.emit(Instr::Unary {
            dest: number,
            op: UnaryOp::Plus,
            operand: old,
        });
        let one = self.constant(Constant::Number(1.0));
        let new_value = self.builder.new_temp();
        self.builder.emit(Instr::Binary {
            dest: new_value,
            op: match update.operator {
                ast::UpdateOperator::Increment => BinaryOp::Add,
                ast::UpdateOperator::Decrement => BinaryOp::Sub,
            },
            left: number,
            right: one,
        });
        self.store_place(place, new_value)?;
        Ok(if update.prefix { new_value } else { number })
    }

    fn lower_logical(&mut self, logical: &ast::LogicalExpression) -> CompileResult<Temp> {
        let result = self.builder.new_temp();
        let end = self.builder.new_label();
        let left = self.lower_expr(&logical.left)?;
        self.builder.emit(Instr::Move {
            dest: result,
            src: left,
        });
        match logical.operator {
            ast::LogicalOperator::And => self.builder.emit(Instr::BranchIfFalse {
                cond: left,
                target: end,
            }),
            ast::LogicalOperator::Or => self.builder.emit(Instr::BranchIfTrue {
                cond: left,
                target: end,
            }),
            ast::LogicalOperator::NullishCoalescing => {
                let null = self.constant(Constant::Null);
                let is_nullish = self.builder.new_temp();
                self.builder.emit(Instr::Binary {
                    dest: is_nullish,
                    op: BinaryOp::Equal,
                    left,
                    right: null,
                });
                self.builder.emit(Instr::BranchIfFalse {
                    cond: is_nullish,
                    target: end,
                });
            }
        }
        let right = self.lower_expr(&logical.right)?;
        self.builder.emit(Instr::Move {
            dest: result,
            src: right,
        });
        self.builder.place(end);
        Ok(result)
    }

    fn lower_conditional(&mut self, cond: &ast::ConditionalExpression) -> CompileResult<Temp> {
        let result = self.builder.new_temp();
        let else_label = self.builder.new_label();
        let end = self.builder.new_label();

        let test = self.lower_expr(&cond.test)?;
        self.builder.emit(Instr::BranchIfFalse {
            cond: test,
            target: else_label,
        });
        let consequent = self.lower_expr(&cond.consequent)?;
        self.builder.emit(Instr::Move {
            dest: result,
            src: consequent,
        });
        self.builder.emit(Instr::Branch { target: end });
        self.builder.place(else_label);
        let alternate = self.lower_expr(&cond.alternate)?;
        self.builder.emit(Instr::Move {
            dest: result,
            src: alternate,
        });
        self.builder.place(end);
        Ok(result)
    }

    fn lower_call(&mut self, call: &ast::CallExpression) -> CompileResult<Temp> {
        let dest = self.builder.new_temp();
        match call.callee.as_ref() {
            Expression::Member(member) => {
                let object = self.lower_expr(&member.object)?;
                let args = self.lower_arguments(&call.arguments)?;
                self.builder.emit(Instr::CallMethod {
                    dest,
                    object,
                    name: member.property.name.clone(),
                    args,
                });
            }
            callee => {
                let callee = self.lower_expr(callee)?;
                let args = self.lower_arguments(&call.arguments)?;
                self.builder.emit(Instr::Call { dest, callee, args });
            }
        }
        Ok(dest)
    }

    /// Create a class value: the constructor closure carries the instance
    /// methods; static members become properties of the class value
    pub(super) fn lower_class(&mut self, class: &ast::Class) -> CompileResult<Temp> {
        let class_scope = self.node_scope(class.id)?;
        let saved = self.enter_scope(class_scope);

        let ctor_scope = self
            .tree
            .scope(class_scope)
            .children
            .iter()
            .copied()
            .find(|&child| self.tree.scope(child).kind == ScopeKind::Constructor)
            .ok_or_else(|| {
                CompileError::internal(format!("{}: class without constructor scope", self.name()))
            })?;
        let constructor = self.callable_id(ctor_scope)?;

        let mut methods = Vec::new();
        for member in &class.members {
            if let ast::ClassMember::Method(method) = member {
                if !method.is_static {
                    let scope = self.node_scope(method.function.id)?;
                    methods.push((method.name.name.clone(), self.callable_id(scope)?));
                }
            }
        }

        let chain = self.chain_sources(ctor_scope)?;
        let dest = self.builder.new_temp();
        self.builder.emit(Instr::MakeClass {
            dest,
            name: self.tree.scope(class_scope).name.clone(),
            constructor,
            methods,
            chain,
        });

        // Class expressions see their own name inside the class body
        if let Some(name) = &class.name {
            if let Some(binding) = self.tree.scope(class_scope).lookup_local(&name.name) {
                self.store_binding(binding, dest)?;
            }
        }

        for member in &class.members {
            match member {
                ast::ClassMember::Method(method) if method.is_static => {
                    let scope = self.node_scope(method.function.id)?;
                    let closure = self.make_closure(scope)?;
                    self.builder.emit(Instr::SetProperty {
                        object: dest,
                        name: method.name.name.clone(),
                        value: closure,
                    });
                }
                ast::ClassMember::Field(field) if field.is_static => {
                    let value = match &field.initializer {
                        Some(init) => self.lower_expr(init)?,
                        None => self.constant(Constant::Undefined),
                    };
                    self.builder.emit(Instr::SetProperty {
                        object: dest,
                        name: field.name.name.clone(),
                        value,
                    });
                }
                _ => {}
            }
        }

        self.current_scope = saved;
        Ok(dest)
    }

    /// Instance field initializers, run by the constructor before its body
    pub(super) fn lower_instance_fields(&mut self, class: &ast::Class) -> CompileResult<()> {
        let mut receiver = None;
        for field in class.instance_fields() {
            let this = match receiver {
                Some(this) => this,
                None => {
                    let this = self.builder.new_temp();
                    self.builder.emit(Instr::LoadThis { dest: this });
                    receiver = Some(this);
                    this
                }
            };
            let value = match &field.initializer {
                Some(init) => self.lower_expr(init)?,
                None => self.constant(Constant::Undefined),
            };
            self.builder.emit(Instr::SetProperty {
                object: this,
                name: field.name.name.clone(),
                value,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CompileError;
    use crate::lir::{Instr, PrettyPrint};
    use crate::options::CompileOptions;
    use crate::pipeline::Compiler;
    use kiln_syntax::ast::{LogicalOperator, Module};
    use kiln_syntax::build::AstBuilder;

    fn main_text(module: &Module) -> String {
        let compiled = Compiler::new(CompileOptions::default()).compile(module).unwrap();
        compiled.callables[0].body.pretty_print()
    }

    #[test]
    fn test_lower_postfix_update_yields_old_value() {
        let b = AstBuilder::new("main");
        let module = b.module(vec![
            b.let_("i", Some(b.num(0.0))),
            b.let_("j", Some(b.increment(b.ident("i")))),
        ]);
        let text = main_text(&module);
        // i++ reads i, converts it, adds one, stores i and binds j to the
        // converted old value
        assert!(text.contains("t2 = +t1"));
        assert!(text.contains("t4 = t2 + t3"));
        assert!(text.contains("loc0 = t4"));
        assert!(text.contains("loc1 = t2"));
    }

    #[test]
    fn test_lower_nullish_coalescing() {
        let b = AstBuilder::new("main");
        let module = b.module(vec![b.expr(b.logical(
            LogicalOperator::NullishCoalescing,
            b.ident("a"),
            b.num(1.0),
        ))]);
        let text = main_text(&module);
        assert!(text.contains(" == "));
        assert!(text.contains("br_false"));
    }

    #[test]
    fn test_lower_class_value() {
        let b = AstBuilder::new("main");
        let class = b
            .class("Counter")
            .field("count", Some(b.num(0.0)))
            .method("tick", b.anonymous().body(vec![b.return_(Some(b.member(b.this(), "count")))]))
            .static_method("zero", b.anonymous().body(vec![b.return_(Some(b.num(0.0)))]))
            .build();
        let module = b.module(vec![b.class_decl(class)]);
        let compiled = Compiler::new(CompileOptions::default()).compile(&module).unwrap();
        let main = &compiled.callables[0];
        let make_class = main
            .body
            .instrs
            .iter()
            .find_map(|i| match i {
                Instr::MakeClass { name, methods, .. } => Some((name.clone(), methods.len())),
                _ => None,
            })
            .unwrap();
        assert_eq!(make_class, ("Counter".to_string(), 1));
        assert!(main.body.pretty_print().contains(".zero = "));

        let ctor = compiled
            .callables
            .iter()
            .find(|c| c.name.as_str() == "main/Counter/constructor")
            .unwrap();
        assert!(ctor.body.pretty_print().contains(".count = "));
    }

    #[test]
    fn test_assignment_to_call_is_unsupported() {
        let b = AstBuilder::new("main");
        let module = b.module(vec![b.expr(b.assign(b.call_fn("f", vec![]), b.num(1.0)))]);
        let err = Compiler::new(CompileOptions::default()).compile(&module).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedFeature { .. }));
    }

    #[test]
    fn test_yield_outside_generator_is_rejected() {
        let b = AstBuilder::new("main");
        let module = b.module(vec![b.function_decl(
            b.function("f").body(vec![b.expr(b.yield_(Some(b.num(1.0))))]),
        )]);
        let err = Compiler::new(CompileOptions::default()).compile(&module).unwrap_err();
        assert!(matches!(err, CompileError::InvalidSuspension { .. }));
    }
}
