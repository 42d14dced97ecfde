//! Test harness for end-to-end compilation and execution
//!
//! Modules are assembled with [`AstBuilder`], compiled with default options
//! and run in the reference interpreter.

pub use kiln_compiler::exec::{ExecError, GeneratorStep, Interpreter, ObjectKind, PromiseState, Value};
pub use kiln_compiler::lir::ResumeKind;
pub use kiln_syntax::ast::VariableKind;
pub use kiln_syntax::build::AstBuilder;

use kiln_compiler::{CompileOptions, CompiledModule, Compiler};
use kiln_syntax::ast::Module;

/// Compile with default options, panicking on failure
pub fn compile(module: &Module) -> CompiledModule {
    match Compiler::new(CompileOptions::default()).compile(module) {
        Ok(compiled) => compiled,
        Err(e) => panic!("Compilation failed: {}", e),
    }
}

/// Compile and execute, returning the completion value and the lines
/// written by `log`
pub fn run(module: &Module) -> Result<(Value, Vec<String>), ExecError> {
    let compiled = compile(module);
    let mut interpreter = Interpreter::new(&compiled);
    let value = interpreter.execute()?;
    Ok((value, interpreter.output()))
}

/// Compile and execute, then hand the interpreter and the completion value
/// to `drive` for further interaction
pub fn with_interpreter<R>(module: &Module, drive: impl FnOnce(&mut Interpreter<'_>, Value) -> R) -> R {
    let compiled = compile(module);
    let mut interpreter = Interpreter::new(&compiled);
    let value = match interpreter.execute() {
        Ok(value) => value,
        Err(e) => panic!("Execution failed: {}", e),
    };
    drive(&mut interpreter, value)
}

pub fn expect_value(module: &Module, expected: Value) {
    match run(module) {
        Ok((value, _)) => assert_eq!(value, expected),
        Err(e) => panic!("Execution failed: {}", e),
    }
}

pub fn expect_number(module: &Module, expected: f64) {
    expect_value(module, Value::Number(expected));
}

/// Compare the completion value by its display form (arrays, objects)
pub fn expect_display(module: &Module, expected: &str) {
    match run(module) {
        Ok((value, _)) => assert_eq!(value.to_string(), expected),
        Err(e) => panic!("Execution failed: {}", e),
    }
}

pub fn expect_output(module: &Module, expected: &[&str]) {
    match run(module) {
        Ok((_, output)) => assert_eq!(output, expected),
        Err(e) => panic!("Execution failed: {}", e),
    }
}

/// Expect an uncaught guest exception carrying `expected`
pub fn expect_thrown(module: &Module, expected: Value) {
    match run(module) {
        Ok((value, _)) => panic!("Expected an exception, completed with {:?}", value),
        Err(e) => assert_eq!(e.thrown(), Some(&expected), "unexpected error: {}", e),
    }
}

/// Settled state of a promise value
pub fn settled(value: &Value) -> PromiseState {
    let object = value.as_object().expect("expected a promise object");
    let object = object.borrow();
    match &object.kind {
        ObjectKind::Promise(state) => state.clone(),
        _ => panic!("expected a promise, got {:?}", value),
    }
}

/// Resume a generator, panicking if it throws
pub fn resume(interpreter: &mut Interpreter<'_>, generator: &Value, kind: ResumeKind, value: Value) -> GeneratorStep {
    match interpreter.resume_generator(generator, kind, value) {
        Ok(step) => step,
        Err(e) => panic!("Generator failed: {}", e),
    }
}
