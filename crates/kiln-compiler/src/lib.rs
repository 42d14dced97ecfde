//! Kiln Compiler - Scope Analysis and State-Machine Lowering
//!
//! This crate implements the analysis core of an ahead-of-time compiler
//! for a dynamic, closure-heavy language. It turns an AST module into
//! lowered callables ready for a backend emitter:
//!
//! 1. [`scope`]: lexical scope tree and capture analysis
//! 2. [`abi`]: per-callable calling convention, scope chain and binding storage
//! 3. [`lower`]: LIR bodies, with generators and async callables lowered to
//!    resumable state machines
//! 4. [`exec`]: a reference interpreter for lowered modules

pub mod abi;
pub mod error;
pub mod exec;
pub mod lir;
pub mod lower;
pub mod metrics;
pub mod options;
pub mod pipeline;
pub mod scope;

pub use abi::{CallableAbi, CallableKind, EnvironmentLayout, ScopesSource};
pub use error::{CompileError, CompileResult};
pub use metrics::CompileMetrics;
pub use options::CompileOptions;
pub use pipeline::{CompiledCallable, CompiledModule, Compiler};
pub use scope::{ScopeName, ScopeTree};
