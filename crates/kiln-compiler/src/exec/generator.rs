//! Generator objects and resumption

use super::interp::{settle_await, Completion, Frame};
use super::value::{ObjectKind, PromiseState, Value};
use super::{ExecError, ExecResult, Interpreter};
use crate::lir::{ResumeKind, SuspendKind};

/// Lifecycle of a generator object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    NotStarted,
    Suspended,
    Running,
    Completed,
}

/// Suspended activation of a generator callable
pub struct Generator {
    pub(super) frame: Option<Frame>,
    pub state: GeneratorState,
    pub is_async: bool,
}

/// Outcome of one resumption
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratorStep {
    Yielded(Value),
    Completed(Value),
}

impl Generator {
    pub(super) fn new(frame: Frame, is_async: bool) -> Self {
        Self {
            frame: Some(frame),
            state: GeneratorState::NotStarted,
            is_async,
        }
    }

    /// State of `value` if it is a generator object
    pub fn state_of(value: &Value) -> Option<GeneratorState> {
        let object = value.as_object()?;
        let object = object.borrow();
        match &object.kind {
            ObjectKind::Generator(generator) => Some(generator.state),
            _ => None,
        }
    }
}

/// Resumption of a generator that will never run again
fn finished(kind: ResumeKind, value: Value) -> ExecResult<GeneratorStep> {
    match kind {
        ResumeKind::Next => Ok(GeneratorStep::Completed(Value::Undefined)),
        ResumeKind::Return => Ok(GeneratorStep::Completed(value)),
        ResumeKind::Throw => Err(ExecError::Thrown(value)),
    }
}

impl<'m> Interpreter<'m> {
    /// Resume `generator` with a next, throw or return request.
    ///
    /// A generator that has not started yet completes immediately on throw
    /// or return without running its body.
    pub fn resume_generator(
        &mut self,
        generator: &Value,
        kind: ResumeKind,
        value: Value,
    ) -> ExecResult<GeneratorStep> {
        let Some(object) = generator.as_object() else {
            return Err(ExecError::TypeError(format!("{} is not a generator", generator)));
        };

        let (mut frame, is_async) = {
            let mut borrowed = object.borrow_mut();
            let ObjectKind::Generator(state) = &mut borrowed.kind else {
                return Err(ExecError::TypeError("object is not a generator".to_string()));
            };
            match state.state {
                GeneratorState::Running => {
                    return Err(ExecError::TypeError("generator is already running".to_string()))
                }
                GeneratorState::Completed => return finished(kind, value),
                GeneratorState::NotStarted if kind != ResumeKind::Next => {
                    state.state = GeneratorState::Completed;
                    state.frame = None;
                    return finished(kind, value);
                }
                GeneratorState::NotStarted | GeneratorState::Suspended => {}
            }
            let mut frame = state.frame.take().ok_or_else(|| {
                ExecError::Internal("suspended generator lost its frame".to_string())
            })?;
            frame.resume_kind = kind;
            frame.resume_value = value;
            frame.pc = 0;
            state.state = GeneratorState::Running;
            (frame, state.is_async)
        };

        let result = self.run_generator(&mut frame, is_async);

        let mut borrowed = object.borrow_mut();
        let ObjectKind::Generator(state) = &mut borrowed.kind else {
            return Err(ExecError::Internal("generator object changed kind".to_string()));
        };
        match result {
            Ok(Completion::Suspend { value, .. }) => {
                state.frame = Some(frame);
                state.state = GeneratorState::Suspended;
                Ok(GeneratorStep::Yielded(value))
            }
            Ok(Completion::Return(value)) => {
                state.state = GeneratorState::Completed;
                Ok(GeneratorStep::Completed(value))
            }
            Err(err) => {
                state.state = GeneratorState::Completed;
                Err(err)
            }
        }
    }

    /// Run until the next yield or completion. Awaits inside async
    /// generators settle in place.
    fn run_generator(&mut self, frame: &mut Frame, is_async: bool) -> ExecResult<Completion> {
        loop {
            match self.run(frame)? {
                Completion::Suspend {
                    kind: SuspendKind::Await,
                    value,
                } if is_async => settle_await(frame, value),
                completion => return Ok(completion),
            }
        }
    }

    /// `next`, `throw` and `return` called on a generator object. Async
    /// generators hand back settled promises of the iterator result.
    pub(super) fn call_generator_method(
        &mut self,
        generator: &Value,
        kind: ResumeKind,
        value: Value,
    ) -> ExecResult<Value> {
        let is_async = generator
            .as_object()
            .map(|object| matches!(&object.borrow().kind, ObjectKind::Generator(g) if g.is_async))
            .unwrap_or(false);
        let result = self
            .resume_generator(generator, kind, value)
            .map(|step| match step {
                GeneratorStep::Yielded(value) => Value::iter_result(value, false),
                GeneratorStep::Completed(value) => Value::iter_result(value, true),
            });
        if !is_async {
            return result;
        }
        let settled = match result {
            Ok(value) => PromiseState::Fulfilled(value),
            Err(err) => match err.to_guest_value() {
                Some(reason) => PromiseState::Rejected(reason),
                None => return Err(err),
            },
        };
        Ok(Value::object(ObjectKind::Promise(settled)))
    }
}
