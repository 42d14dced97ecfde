//! Reference interpreter for lowered modules
//!
//! Executes the LIR bodies of a [`CompiledModule`] directly, with a small
//! dynamic value model. It plays the part of the emitter and runtime so the
//! behavior of lowered code (scope records, closures, protected regions,
//! resumable state machines) can be observed end to end:
//!
//! ```rust
//! use kiln_compiler::exec::{Interpreter, Value};
//! use kiln_compiler::{CompileOptions, Compiler};
//! use kiln_syntax::build::AstBuilder;
//!
//! let b = AstBuilder::new("main");
//! let module = b.module(vec![b.return_(Some(b.add(b.num(1.0), b.num(2.0))))]);
//! let compiled = Compiler::new(CompileOptions::default()).compile(&module).unwrap();
//! let result = Interpreter::new(&compiled).execute().unwrap();
//! assert_eq!(result, Value::Number(3.0));
//! ```
//!
//! Async callables run to completion before their promise is returned, so
//! every promise the interpreter hands out is already settled.

mod generator;
mod interp;
mod value;

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use thiserror::Error;

pub use generator::{Generator, GeneratorState, GeneratorStep};
pub use value::{
    format_number, Chain, ClassInfo, Closure, HostFn, Object, ObjectKind, ObjectRef, PromiseState,
    Record, Value,
};

use crate::pipeline::CompiledModule;

/// Result type for interpreter operations
pub type ExecResult<T> = Result<T, ExecError>;

/// Interpreter failures
#[derive(Debug, Error)]
pub enum ExecError {
    /// Guest exception nobody caught
    #[error("Uncaught exception: {0:?}")]
    Thrown(Value),

    #[error("TypeError: {0}")]
    TypeError(String),

    #[error("ReferenceError: {0} is not defined")]
    ReferenceError(String),

    #[error("RangeError: maximum call depth {0} exceeded")]
    CallDepthExceeded(usize),

    /// The lowered code broke an invariant the interpreter relies on
    #[error("Internal executor error: {0}")]
    Internal(String),
}

impl ExecError {
    /// The value guest code sees when it catches this error, if it can
    pub fn to_guest_value(&self) -> Option<Value> {
        match self {
            ExecError::Thrown(value) => Some(value.clone()),
            ExecError::TypeError(_) | ExecError::ReferenceError(_) => {
                Some(Value::string(self.to_string()))
            }
            ExecError::CallDepthExceeded(_) | ExecError::Internal(_) => None,
        }
    }

    /// The thrown guest value, for uncaught exceptions
    pub fn thrown(&self) -> Option<&Value> {
        match self {
            ExecError::Thrown(value) => Some(value),
            _ => None,
        }
    }
}

const DEFAULT_MAX_DEPTH: usize = 256;

/// Position ranges of one protected region
#[derive(Debug, Clone, Copy)]
struct ProtectedRange {
    start: usize,
    end: usize,
    handler: usize,
}

/// Executes one compiled module
pub struct Interpreter<'m> {
    module: &'m CompiledModule,
    globals: FxHashMap<String, Value>,
    output: Rc<RefCell<Vec<String>>>,
    /// Protected ranges per callable, indexed by callable id
    ranges: Vec<Vec<ProtectedRange>>,
    depth: usize,
    max_depth: usize,
}

impl<'m> Interpreter<'m> {
    pub fn new(module: &'m CompiledModule) -> Self {
        let ranges = module
            .callables
            .iter()
            .map(|callable| {
                let body = &callable.body;
                body.regions
                    .iter()
                    .filter_map(|region| {
                        Some(ProtectedRange {
                            start: body.label_position(region.try_start)?,
                            end: body.label_position(region.try_end)?,
                            handler: body.label_position(region.handler_start)?,
                        })
                    })
                    .collect()
            })
            .collect();

        let mut interpreter = Self {
            module,
            globals: FxHashMap::default(),
            output: Rc::new(RefCell::new(Vec::new())),
            ranges,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        };
        interpreter.install_builtins();
        interpreter
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn define_global(&mut self, name: impl Into<String>, value: Value) {
        self.globals.insert(name.into(), value);
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.get(name).cloned()
    }

    /// Lines written by the `log` builtin
    pub fn output(&self) -> Vec<String> {
        self.output.borrow().clone()
    }

    /// Run the module main and return its completion value
    pub fn execute(&mut self) -> ExecResult<Value> {
        let entry = self.module.entry;
        self.invoke(entry, Value::Undefined, Vec::new(), Value::Undefined, Rc::new(Vec::new()))
    }

    /// Call a guest function value with no receiver
    pub fn call(&mut self, callee: &Value, args: Vec<Value>) -> ExecResult<Value> {
        self.call_value(callee, Value::Undefined, args)
    }

    fn install_builtins(&mut self) {
        let output = Rc::clone(&self.output);
        self.define_global(
            "log",
            Value::host(move |args| {
                let line: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                output.borrow_mut().push(line.join(" "));
                Ok(Value::Undefined)
            }),
        );
        self.define_global(
            "Promise",
            Value::plain(vec![
                (
                    "resolve",
                    Value::host(|args| {
                        let value = args.first().cloned().unwrap_or(Value::Undefined);
                        Ok(Value::object(ObjectKind::Promise(PromiseState::Fulfilled(value))))
                    }),
                ),
                (
                    "reject",
                    Value::host(|args| {
                        let value = args.first().cloned().unwrap_or(Value::Undefined);
                        Ok(Value::object(ObjectKind::Promise(PromiseState::Rejected(value))))
                    }),
                ),
            ]),
        );
        self.define_global(
            "Error",
            Value::host(|args| {
                let message = args.first().cloned().unwrap_or(Value::string(""));
                Ok(Value::plain(vec![("message", message)]))
            }),
        );
    }
}
