//! Frame execution

use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::trace;

use super::generator::{Generator, GeneratorStep};
use super::value::{new_record, Chain, ClassInfo, Closure, ObjectKind, PromiseState, Record, Value};
use super::{ExecError, ExecResult, Interpreter};
use crate::abi::ScopesSource;
use crate::lir::{
    BinaryOp, Body, CallableId, ChainSource, Instr, Label, ResumeKind, StateId, SuspendKind, Temp,
    UnaryOp,
};
use crate::pipeline::CompiledCallable;
use crate::scope::ScopeName;

/// Activation of one callable. Generator frames outlive individual runs.
pub(crate) struct Frame {
    pub(super) callable: CallableId,
    temps: Vec<Value>,
    locals: Vec<Value>,
    args: Vec<Value>,
    this: Value,
    callee: Value,
    chain: Chain,
    records: FxHashMap<ScopeName, Record>,
    pub(super) pc: usize,
    pub(super) state: StateId,
    pub(super) resume_kind: ResumeKind,
    pub(super) resume_value: Value,
    exception: Value,
}

impl Frame {
    fn new(compiled: &CompiledCallable, this: Value, args: Vec<Value>, callee: Value, chain: Chain) -> Self {
        Self {
            callable: compiled.id,
            temps: vec![Value::Undefined; compiled.body.temp_count as usize],
            locals: vec![Value::Undefined; compiled.body.local_count as usize],
            args,
            this,
            callee,
            chain,
            records: FxHashMap::default(),
            pc: 0,
            state: StateId::INITIAL,
            resume_kind: ResumeKind::Next,
            resume_value: Value::Undefined,
            exception: Value::Undefined,
        }
    }

    fn get(&self, temp: Temp) -> Value {
        self.temps
            .get(temp.as_u32() as usize)
            .cloned()
            .unwrap_or(Value::Undefined)
    }

    fn set(&mut self, temp: Temp, value: Value) {
        let index = temp.as_u32() as usize;
        if index >= self.temps.len() {
            self.temps.resize(index + 1, Value::Undefined);
        }
        self.temps[index] = value;
    }

    fn record(&self, scope: &ScopeName) -> ExecResult<&Record> {
        self.records
            .get(scope)
            .ok_or_else(|| ExecError::Internal(format!("no live record for scope {}", scope)))
    }

    fn chain_record(&self, index: u32) -> ExecResult<&Record> {
        self.chain
            .get(index as usize)
            .and_then(|slot| slot.as_ref())
            .ok_or_else(|| ExecError::Internal(format!("chain slot {} is empty", index)))
    }
}

/// How a run of a frame ended
pub(crate) enum Completion {
    Return(Value),
    Suspend { kind: SuspendKind, value: Value },
}

enum Flow {
    Next,
    Jump(Label),
    Done(Completion),
}

impl<'m> Interpreter<'m> {
    fn compiled(&self, id: CallableId) -> ExecResult<&'m CompiledCallable> {
        let module = self.module;
        module
            .callable(id)
            .ok_or_else(|| ExecError::Internal(format!("unknown callable {}", id)))
    }

    /// Call a function value
    pub(super) fn call_value(&mut self, callee: &Value, this: Value, args: Vec<Value>) -> ExecResult<Value> {
        let Value::Object(object) = callee else {
            return Err(ExecError::TypeError(format!("{} is not a function", callee)));
        };
        let target = match &object.borrow().kind {
            ObjectKind::Function(closure) => CallTarget::Closure(closure.clone()),
            ObjectKind::BoundMethod { receiver, callable } => {
                CallTarget::Method(receiver.clone(), *callable)
            }
            ObjectKind::Host(function) => CallTarget::Host(Rc::clone(function)),
            ObjectKind::Class(class) => {
                return Err(ExecError::TypeError(format!(
                    "class constructor {} cannot be invoked without 'new'",
                    class.name
                )))
            }
            _ => return Err(ExecError::TypeError(format!("{} is not a function", callee))),
        };
        match target {
            CallTarget::Closure(closure) => {
                self.invoke(closure.callable, this, args, callee.clone(), closure.chain)
            }
            CallTarget::Method(receiver, callable) => self.invoke_method(receiver, callable, args),
            CallTarget::Host(function) => function(&args),
        }
    }

    /// Instance methods read their chain from the receiver
    fn invoke_method(&mut self, receiver: Value, callable: CallableId, args: Vec<Value>) -> ExecResult<Value> {
        let compiled = self.compiled(callable)?;
        let chain = match (compiled.layout.abi.scopes_source, &receiver) {
            (ScopesSource::ThisField, Value::Object(object)) => match &object.borrow().kind {
                ObjectKind::Instance {
                    scopes: Some(scopes),
                    ..
                } => Rc::clone(scopes),
                _ => {
                    return Err(ExecError::Internal(format!(
                        "{}: receiver carries no scope chain",
                        compiled.name
                    )))
                }
            },
            _ => Rc::new(Vec::new()),
        };
        self.invoke(callable, receiver, args, Value::Undefined, chain)
    }

    /// Start a callable. Generators return their generator object without
    /// running; async callables run to completion and return a settled
    /// promise.
    pub(super) fn invoke(
        &mut self,
        callable: CallableId,
        this: Value,
        args: Vec<Value>,
        callee: Value,
        chain: Chain,
    ) -> ExecResult<Value> {
        let compiled = self.compiled(callable)?;
        let frame = Frame::new(compiled, this, args, callee, chain);
        trace!(callable = %compiled.name, depth = self.depth, "invoke");

        if compiled.is_generator {
            return Ok(Value::object(ObjectKind::Generator(Generator::new(
                frame,
                compiled.is_async,
            ))));
        }
        let mut frame = frame;
        if compiled.is_async {
            let state = match self.drive_async(&mut frame) {
                Ok(value) => PromiseState::Fulfilled(value),
                Err(err) => match err.to_guest_value() {
                    Some(value) => PromiseState::Rejected(value),
                    None => return Err(err),
                },
            };
            return Ok(Value::object(ObjectKind::Promise(state)));
        }
        match self.run(&mut frame)? {
            Completion::Return(value) => Ok(value),
            Completion::Suspend { .. } => Err(ExecError::Internal(format!(
                "{} suspended but is not resumable",
                compiled.name
            ))),
        }
    }

    /// Run an async frame, settling each awaited value immediately
    fn drive_async(&mut self, frame: &mut Frame) -> ExecResult<Value> {
        loop {
            match self.run(frame)? {
                Completion::Return(value) => return Ok(value),
                Completion::Suspend { kind, value } => {
                    if kind != SuspendKind::Await {
                        return Err(ExecError::Internal("async callable yielded".to_string()));
                    }
                    settle_await(frame, value);
                }
            }
        }
    }

    fn construct(&mut self, callee: &Value, args: Vec<Value>) -> ExecResult<Value> {
        let Value::Object(object) = callee else {
            return Err(ExecError::TypeError(format!("{} is not a constructor", callee)));
        };
        let class = match &object.borrow().kind {
            ObjectKind::Class(info) => Some((info.constructor, Rc::clone(&info.chain))),
            ObjectKind::Function(_) | ObjectKind::Host(_) => None,
            _ => return Err(ExecError::TypeError(format!("{} is not a constructor", callee))),
        };
        match class {
            Some((constructor, chain)) => {
                let instance = Value::object(ObjectKind::Instance {
                    class: Rc::clone(object),
                    scopes: None,
                });
                let result =
                    self.invoke(constructor, instance.clone(), args, callee.clone(), chain)?;
                Ok(match result {
                    Value::Object(_) => result,
                    _ => instance,
                })
            }
            None => {
                let receiver = Value::object(ObjectKind::Plain);
                let result = self.call_value(callee, receiver.clone(), args)?;
                Ok(match result {
                    Value::Object(_) => result,
                    _ => receiver,
                })
            }
        }
    }

    /// Run `frame` from its current position until it returns or suspends.
    /// Guest exceptions are routed to the innermost protected region
    /// containing the faulting instruction.
    pub(crate) fn run(&mut self, frame: &mut Frame) -> ExecResult<Completion> {
        if self.depth >= self.max_depth {
            return Err(ExecError::CallDepthExceeded(self.max_depth));
        }
        self.depth += 1;
        let result = self.run_inner(frame);
        self.depth -= 1;
        result
    }

    fn run_inner(&mut self, frame: &mut Frame) -> ExecResult<Completion> {
        let compiled = self.compiled(frame.callable)?;
        let body = &compiled.body;
        loop {
            let position = frame.pc;
            let instr = body.instrs.get(position).ok_or_else(|| {
                ExecError::Internal(format!("{}: fell off the end of the body", compiled.name))
            })?;
            frame.pc += 1;

            match self.step(compiled, frame, instr) {
                Ok(Flow::Next) => {}
                Ok(Flow::Jump(label)) => frame.pc = jump_position(body, label)?,
                Ok(Flow::Done(completion)) => return Ok(completion),
                Err(err) => {
                    let Some(thrown) = err.to_guest_value() else {
                        return Err(err);
                    };
                    match self.find_handler(frame.callable, position) {
                        Some(handler) => {
                            trace!(callable = %compiled.name, position, handler, "exception caught");
                            frame.exception = thrown;
                            frame.pc = handler;
                        }
                        None => return Err(ExecError::Thrown(thrown)),
                    }
                }
            }
        }
    }

    /// Handler of the innermost region whose try range contains `position`
    fn find_handler(&self, callable: CallableId, position: usize) -> Option<usize> {
        self.ranges
            .get(callable.as_u32() as usize)?
            .iter()
            .filter(|range| range.start <= position && position < range.end)
            .min_by_key(|range| range.end - range.start)
            .map(|range| range.handler)
    }

    fn step(&mut self, compiled: &CompiledCallable, frame: &mut Frame, instr: &Instr) -> ExecResult<Flow> {
        match instr {
            Instr::Label(_) => {}
            Instr::Const { dest, value } => frame.set(*dest, Value::from_constant(value)),
            Instr::Move { dest, src } => {
                let value = frame.get(*src);
                frame.set(*dest, value);
            }

            Instr::LoadLocal { dest, slot } => {
                let value = frame
                    .locals
                    .get(slot.as_u32() as usize)
                    .cloned()
                    .unwrap_or(Value::Undefined);
                frame.set(*dest, value);
            }
            Instr::StoreLocal { slot, value } => {
                let index = slot.as_u32() as usize;
                if index >= frame.locals.len() {
                    frame.locals.resize(index + 1, Value::Undefined);
                }
                frame.locals[index] = frame.get(*value);
            }
            Instr::LoadArgument { dest, index } => {
                let value = frame
                    .args
                    .get(*index as usize)
                    .cloned()
                    .unwrap_or(Value::Undefined);
                frame.set(*dest, value);
            }
            Instr::StoreArgument { index, value } => {
                let index = *index as usize;
                if index >= frame.args.len() {
                    frame.args.resize(index + 1, Value::Undefined);
                }
                frame.args[index] = frame.get(*value);
            }
            Instr::LoadScopeField { dest, field } => {
                let value = read_field(frame.record(&field.scope)?, &field.name);
                frame.set(*dest, value);
            }
            Instr::StoreScopeField { field, value } => {
                let value = frame.get(*value);
                write_field(frame.record(&field.scope)?, &field.name, value);
            }
            Instr::LoadParentScopeField {
                dest,
                chain_index,
                field,
            } => {
                let value = read_field(frame.chain_record(*chain_index)?, &field.name);
                frame.set(*dest, value);
            }
            Instr::StoreParentScopeField {
                chain_index,
                field,
                value,
            } => {
                let value = frame.get(*value);
                write_field(frame.chain_record(*chain_index)?, &field.name, value);
            }
            Instr::LoadGlobal { dest, name } => {
                let value = self
                    .globals
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ExecError::ReferenceError(name.clone()))?;
                frame.set(*dest, value);
            }
            Instr::StoreGlobal { name, value } => {
                let value = frame.get(*value);
                self.globals.insert(name.clone(), value);
            }
            Instr::LoadThis { dest } => {
                let this = frame.this.clone();
                frame.set(*dest, this);
            }
            Instr::LoadCallee { dest } => {
                let callee = frame.callee.clone();
                frame.set(*dest, callee);
            }

            Instr::CreateScopeInstance { scope } | Instr::EnterBlockScope { scope } => {
                frame.records.insert(scope.clone(), new_record());
            }
            Instr::RenewBlockScope { scope } => {
                let copy = frame.record(scope)?.borrow().clone();
                frame
                    .records
                    .insert(scope.clone(), Rc::new(std::cell::RefCell::new(copy)));
            }
            Instr::StoreScopesOnReceiver => {
                let chain = Rc::clone(&frame.chain);
                let Value::Object(object) = &frame.this else {
                    return Err(ExecError::Internal("constructor without receiver".to_string()));
                };
                if let ObjectKind::Instance { scopes, .. } = &mut object.borrow_mut().kind {
                    *scopes = Some(chain);
                }
            }
            Instr::MakeClosure {
                dest,
                callable,
                chain,
            } => {
                let chain = materialize_chain(compiled, frame, chain)?;
                let closure = Value::object(ObjectKind::Function(Closure {
                    callable: *callable,
                    chain,
                }));
                frame.set(*dest, closure);
            }
            Instr::MakeClass {
                dest,
                name,
                constructor,
                methods,
                chain,
            } => {
                let chain = materialize_chain(compiled, frame, chain)?;
                let class = Value::object(ObjectKind::Class(ClassInfo {
                    name: name.clone(),
                    constructor: *constructor,
                    methods: methods.iter().cloned().collect(),
                    chain,
                }));
                frame.set(*dest, class);
            }

            Instr::Unary { dest, op, operand } => {
                let value = unary(*op, &frame.get(*operand));
                frame.set(*dest, value);
            }
            Instr::Binary {
                dest,
                op,
                left,
                right,
            } => {
                let value = binary(*op, &frame.get(*left), &frame.get(*right))?;
                frame.set(*dest, value);
            }
            Instr::GetProperty { dest, object, name } => {
                let object = frame.get(*object);
                if matches!(object, Value::Undefined | Value::Null) {
                    return Err(ExecError::TypeError(format!(
                        "cannot read property '{}' of {}",
                        name, object
                    )));
                }
                frame.set(*dest, object.get_property(name));
            }
            Instr::SetProperty {
                object,
                name,
                value,
            } => {
                let value = frame.get(*value);
                match frame.get(*object) {
                    Value::Object(object) => object.borrow_mut().set(name, value),
                    other => {
                        return Err(ExecError::TypeError(format!(
                            "cannot set property '{}' of {}",
                            name, other
                        )))
                    }
                }
            }
            Instr::GetIndex {
                dest,
                object,
                index,
            } => {
                let value = get_index(&frame.get(*object), &frame.get(*index))?;
                frame.set(*dest, value);
            }
            Instr::SetIndex {
                object,
                index,
                value,
            } => {
                let value = frame.get(*value);
                set_index(&frame.get(*object), &frame.get(*index), value)?;
            }
            Instr::NewArray { dest, elements } => {
                let elements = elements.iter().map(|t| frame.get(*t)).collect();
                frame.set(*dest, Value::array(elements));
            }
            Instr::NewObject { dest } => frame.set(*dest, Value::object(ObjectKind::Plain)),
            Instr::Call { dest, callee, args } => {
                let callee = frame.get(*callee);
                let args = args.iter().map(|t| frame.get(*t)).collect();
                let result = self.call_value(&callee, Value::Undefined, args)?;
                frame.set(*dest, result);
            }
            Instr::CallMethod {
                dest,
                object,
                name,
                args,
            } => {
                let object = frame.get(*object);
                let args = args.iter().map(|t| frame.get(*t)).collect();
                let result = self.call_method(&object, name, args)?;
                frame.set(*dest, result);
            }
            Instr::Construct { dest, callee, args } => {
                let callee = frame.get(*callee);
                let args = args.iter().map(|t| frame.get(*t)).collect();
                let result = self.construct(&callee, args)?;
                frame.set(*dest, result);
            }
            Instr::GetIterator { dest, iterable } => {
                let iterator = self.get_iterator(&frame.get(*iterable))?;
                frame.set(*dest, iterator);
            }
            Instr::IteratorStep {
                iterator,
                done,
                value,
            } => {
                let (finished, produced) =
                    self.delegate_step(&frame.get(*iterator), ResumeKind::Next, Value::Undefined)?;
                frame.set(*done, Value::Bool(finished));
                frame.set(*value, if finished { Value::Undefined } else { produced });
            }
            Instr::IteratorClose { iterator } => self.close_iterator(&frame.get(*iterator))?,
            Instr::EnumerateKeys { dest, object } => {
                let keys = enumerate_keys(&frame.get(*object));
                frame.set(
                    *dest,
                    Value::object(ObjectKind::ArrayIterator {
                        array: Value::array(keys),
                        index: 0,
                    }),
                );
            }

            Instr::Branch { target } | Instr::Leave { target } => return Ok(Flow::Jump(*target)),
            Instr::BranchIfTrue { cond, target } => {
                if frame.get(*cond).to_boolean() {
                    return Ok(Flow::Jump(*target));
                }
            }
            Instr::BranchIfFalse { cond, target } => {
                if !frame.get(*cond).to_boolean() {
                    return Ok(Flow::Jump(*target));
                }
            }
            Instr::Throw { value } => return Err(ExecError::Thrown(frame.get(*value))),
            Instr::Return { value } => {
                return Ok(Flow::Done(Completion::Return(frame.get(*value))))
            }
            Instr::StoreException { dest } => {
                let exception = std::mem::replace(&mut frame.exception, Value::Undefined);
                frame.set(*dest, exception);
            }

            Instr::GeneratorStateSwitch { cases } => {
                if let Some((_, label)) = cases.iter().find(|(state, _)| *state == frame.state) {
                    return Ok(Flow::Jump(*label));
                }
            }
            Instr::Suspend { kind, value, state } => {
                frame.state = *state;
                return Ok(Flow::Done(Completion::Suspend {
                    kind: *kind,
                    value: frame.get(*value),
                }));
            }
            Instr::ClearResumeState => frame.state = StateId::INITIAL,
            Instr::LoadResumeKind { dest } => {
                frame.set(*dest, Value::Number(frame.resume_kind.code()))
            }
            Instr::LoadResumeValue { dest } => {
                let value = frame.resume_value.clone();
                frame.set(*dest, value);
            }
            Instr::DelegateResume {
                iterator,
                mode,
                value,
                done,
                result,
            } => {
                let kind = ResumeKind::from_code(frame.get(*mode).to_number())
                    .ok_or_else(|| ExecError::Internal("bad delegate mode".to_string()))?;
                let (finished, produced) =
                    self.delegate_step(&frame.get(*iterator), kind, frame.get(*value))?;
                frame.set(*done, Value::Bool(finished));
                frame.set(*result, produced);
            }
        }
        Ok(Flow::Next)
    }

    fn call_method(&mut self, object: &Value, name: &str, args: Vec<Value>) -> ExecResult<Value> {
        if let Value::Object(target) = object {
            let is_generator = matches!(target.borrow().kind, ObjectKind::Generator(_));
            if is_generator {
                if let Some(kind) = generator_method(name) {
                    let value = args.into_iter().next().unwrap_or(Value::Undefined);
                    return self.call_generator_method(object, kind, value);
                }
            }
            let mut borrowed = target.borrow_mut();
            if let ObjectKind::Array(elements) = &mut borrowed.kind {
                match name {
                    "push" => {
                        elements.extend(args);
                        return Ok(Value::Number(elements.len() as f64));
                    }
                    "pop" => return Ok(elements.pop().unwrap_or(Value::Undefined)),
                    _ => {}
                }
            }
        }
        if matches!(object, Value::Undefined | Value::Null) {
            return Err(ExecError::TypeError(format!(
                "cannot read property '{}' of {}",
                name, object
            )));
        }
        let method = object.get_property(name);
        if method.is_undefined() {
            return Err(ExecError::TypeError(format!("{} is not a function", name)));
        }
        self.call_value(&method, object.clone(), args)
    }

    fn get_iterator(&mut self, iterable: &Value) -> ExecResult<Value> {
        if let Value::String(s) = iterable {
            let chars = s.chars().map(|c| Value::string(c.to_string())).collect();
            return Ok(Value::object(ObjectKind::ArrayIterator {
                array: Value::array(chars),
                index: 0,
            }));
        }
        let Value::Object(object) = iterable else {
            return Err(ExecError::TypeError(format!("{} is not iterable", iterable)));
        };
        match &object.borrow().kind {
            ObjectKind::Array(_) => Ok(Value::object(ObjectKind::ArrayIterator {
                array: iterable.clone(),
                index: 0,
            })),
            ObjectKind::Generator(_) | ObjectKind::ArrayIterator { .. } => Ok(iterable.clone()),
            _ => Err(ExecError::TypeError(format!("{} is not iterable", iterable))),
        }
    }

    /// Forward one resume event to an iterator. Returns whether it finished
    /// and the value it produced (its completion value when finished).
    fn delegate_step(&mut self, iterator: &Value, kind: ResumeKind, value: Value) -> ExecResult<(bool, Value)> {
        let Value::Object(object) = iterator else {
            return Err(ExecError::TypeError(format!("{} is not an iterator", iterator)));
        };
        let is_generator = matches!(object.borrow().kind, ObjectKind::Generator(_));
        if is_generator {
            return Ok(match self.resume_generator(iterator, kind, value)? {
                GeneratorStep::Yielded(produced) => (false, produced),
                GeneratorStep::Completed(result) => (true, result),
            });
        }

        let mut borrowed = object.borrow_mut();
        let ObjectKind::ArrayIterator { array, index } = &mut borrowed.kind else {
            return Err(ExecError::TypeError("object is not an iterator".to_string()));
        };
        match kind {
            ResumeKind::Next => {
                let element = match array {
                    Value::Object(array) => match &array.borrow().kind {
                        ObjectKind::Array(elements) => elements.get(*index).cloned(),
                        _ => None,
                    },
                    _ => None,
                };
                match element {
                    Some(element) => {
                        *index += 1;
                        Ok((false, element))
                    }
                    None => Ok((true, Value::Undefined)),
                }
            }
            ResumeKind::Throw => Err(ExecError::Thrown(value)),
            ResumeKind::Return => Ok((true, value)),
        }
    }

    fn close_iterator(&mut self, iterator: &Value) -> ExecResult<()> {
        let is_generator = iterator
            .as_object()
            .is_some_and(|o| matches!(o.borrow().kind, ObjectKind::Generator(_)));
        if is_generator {
            self.resume_generator(iterator, ResumeKind::Return, Value::Undefined)?;
        }
        Ok(())
    }
}

enum CallTarget {
    Closure(Closure),
    Method(Value, CallableId),
    Host(super::value::HostFn),
}

fn generator_method(name: &str) -> Option<ResumeKind> {
    match name {
        "next" => Some(ResumeKind::Next),
        "throw" => Some(ResumeKind::Throw),
        "return" => Some(ResumeKind::Return),
        _ => None,
    }
}

/// Resume an awaiting frame with the settled outcome of `value`
pub(super) fn settle_await(frame: &mut Frame, value: Value) {
    let settled = match &value {
        Value::Object(object) => match &object.borrow().kind {
            ObjectKind::Promise(state) => Some(state.clone()),
            _ => None,
        },
        _ => None,
    };
    let (kind, value) = match settled {
        Some(PromiseState::Fulfilled(result)) => (ResumeKind::Next, result),
        Some(PromiseState::Rejected(reason)) => (ResumeKind::Throw, reason),
        None => (ResumeKind::Next, value),
    };
    frame.resume_kind = kind;
    frame.resume_value = value;
    frame.pc = 0;
}

fn jump_position(body: &Body, label: Label) -> ExecResult<usize> {
    body.label_position(label)
        .ok_or_else(|| ExecError::Internal(format!("undefined label {}", label)))
}

fn read_field(record: &Record, name: &str) -> Value {
    record.borrow().get(name).cloned().unwrap_or(Value::Undefined)
}

fn write_field(record: &Record, name: &str, value: Value) {
    record.borrow_mut().insert(name.to_string(), value);
}

fn materialize_chain(compiled: &CompiledCallable, frame: &Frame, sources: &[ChainSource]) -> ExecResult<Chain> {
    let mut chain = Vec::with_capacity(sources.len());
    for source in sources {
        let slot = match source {
            ChainSource::Parent(index) => frame.chain.get(*index as usize).cloned().flatten(),
            ChainSource::Own => Some(Rc::clone(frame.record(&compiled.name)?)),
            ChainSource::Block(scope) => Some(Rc::clone(frame.record(scope)?)),
            ChainSource::Null => None,
        };
        chain.push(slot);
    }
    Ok(Rc::new(chain))
}

fn unary(op: UnaryOp, operand: &Value) -> Value {
    match op {
        UnaryOp::Plus => Value::Number(operand.to_number()),
        UnaryOp::Negate => Value::Number(-operand.to_number()),
        UnaryOp::Not => Value::Bool(!operand.to_boolean()),
        UnaryOp::BitNot => Value::Number(!operand.to_int32() as f64),
        UnaryOp::Typeof => Value::string(operand.type_of()),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> ExecResult<Value> {
    let number = |f: fn(f64, f64) -> f64| Value::Number(f(left.to_number(), right.to_number()));
    let int = |f: fn(i32, i32) -> i32| Value::Number(f(left.to_int32(), right.to_int32()) as f64);
    let compare = |f: fn(std::cmp::Ordering) -> bool| match (left, right) {
        (Value::String(a), Value::String(b)) => Value::Bool(f(a.cmp(b))),
        _ => {
            let (a, b) = (left.to_number(), right.to_number());
            Value::Bool(a.partial_cmp(&b).is_some_and(f))
        }
    };
    Ok(match op {
        BinaryOp::Add => match (left, right) {
            (Value::String(_) | Value::Object(_), _) | (_, Value::String(_) | Value::Object(_)) => {
                Value::string(format!("{}{}", left, right))
            }
            _ => number(|a, b| a + b),
        },
        BinaryOp::Sub => number(|a, b| a - b),
        BinaryOp::Mul => number(|a, b| a * b),
        BinaryOp::Div => number(|a, b| a / b),
        BinaryOp::Mod => number(|a, b| a % b),
        BinaryOp::Exp => number(f64::powf),
        BinaryOp::Equal => Value::Bool(left.loose_equals(right)),
        BinaryOp::NotEqual => Value::Bool(!left.loose_equals(right)),
        BinaryOp::StrictEqual => Value::Bool(left.strict_equals(right)),
        BinaryOp::StrictNotEqual => Value::Bool(!left.strict_equals(right)),
        BinaryOp::Less => compare(|o| o.is_lt()),
        BinaryOp::LessEqual => compare(|o| o.is_le()),
        BinaryOp::Greater => compare(|o| o.is_gt()),
        BinaryOp::GreaterEqual => compare(|o| o.is_ge()),
        BinaryOp::BitAnd => int(|a, b| a & b),
        BinaryOp::BitOr => int(|a, b| a | b),
        BinaryOp::BitXor => int(|a, b| a ^ b),
        BinaryOp::ShiftLeft => int(|a, b| a.wrapping_shl(b as u32 & 31)),
        BinaryOp::ShiftRight => int(|a, b| a.wrapping_shr(b as u32 & 31)),
        BinaryOp::UnsignedShiftRight => {
            let shifted = (left.to_int32() as u32) >> (right.to_int32() as u32 & 31);
            Value::Number(shifted as f64)
        }
        BinaryOp::InstanceOf => {
            let Value::Object(class) = right else {
                return Err(ExecError::TypeError(
                    "right-hand side of 'instanceof' is not callable".to_string(),
                ));
            };
            let is_instance = match left {
                Value::Object(object) => match &object.borrow().kind {
                    ObjectKind::Instance { class: own, .. } => Rc::ptr_eq(own, class),
                    _ => false,
                },
                _ => false,
            };
            Value::Bool(is_instance)
        }
    })
}

/// Keys a `for-in` loop visits. Primitives other than strings have none.
fn enumerate_keys(value: &Value) -> Vec<Value> {
    match value {
        Value::String(s) => (0..s.chars().count()).map(|i| Value::string(i.to_string())).collect(),
        Value::Object(object) => object.borrow().keys().into_iter().map(Value::string).collect(),
        _ => Vec::new(),
    }
}

/// Element index named by a number or a canonical index string ("2", not
/// "02"), as for-in produces
fn array_index(index: &Value) -> Option<usize> {
    if let Value::String(s) = index {
        return s.parse::<usize>().ok().filter(|i| i.to_string() == s.as_ref());
    }
    let n = index.as_number()?;
    (n >= 0.0 && n == n.trunc()).then_some(n as usize)
}

fn get_index(object: &Value, index: &Value) -> ExecResult<Value> {
    match object {
        Value::Undefined | Value::Null => Err(ExecError::TypeError(format!(
            "cannot read property '{}' of {}",
            index, object
        ))),
        Value::String(s) => Ok(match array_index(index) {
            Some(i) => s
                .chars()
                .nth(i)
                .map(|c| Value::string(c.to_string()))
                .unwrap_or(Value::Undefined),
            None => object.get_property(&index.to_string()),
        }),
        Value::Object(target) => {
            if let (ObjectKind::Array(elements), Some(i)) = (&target.borrow().kind, array_index(index)) {
                return Ok(elements.get(i).cloned().unwrap_or(Value::Undefined));
            }
            Ok(object.get_property(&index.to_string()))
        }
        _ => Ok(Value::Undefined),
    }
}

fn set_index(object: &Value, index: &Value, value: Value) -> ExecResult<()> {
    let Value::Object(target) = object else {
        return Err(ExecError::TypeError(format!(
            "cannot set property '{}' of {}",
            index, object
        )));
    };
    let mut target = target.borrow_mut();
    if let (ObjectKind::Array(elements), Some(i)) = (&mut target.kind, array_index(index)) {
        if i >= elements.len() {
            elements.resize(i + 1, Value::Undefined);
        }
        elements[i] = value;
        return Ok(());
    }
    target.set(&index.to_string(), value);
    Ok(())
}
