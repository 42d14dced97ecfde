//! AST to LIR Lowering
//!
//! Lowers one callable at a time: the module main, a function or arrow, a
//! class constructor or a method. Every variable access goes through the
//! callable's [`EnvironmentLayout`], so where a binding lives (a local, an
//! argument, a field of the callable's own scope record or a field of an
//! ancestor record reached through the scope chain) is decided once by the
//! layout builder and only read here.
//!
//! Generators and async callables are lowered to resumable state machines
//! (see [`generator`]).

mod access;
mod control_flow;
mod expr;
mod generator;
mod liveness;
mod stmt;
mod suspend;

pub use control_flow::{completion, JumpKind};
pub use generator::{GeneratorStateMachineInfo, YieldPoint};
pub use liveness::live_temps_at;
pub use suspend::contains_suspension;

use kiln_syntax::ast::{Class, Function, FunctionBody, Module};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::abi::{CallableKind, EnvironmentLayout};
use crate::error::{CompileError, CompileResult};
use crate::lir::{Body, BodyBuilder, CallableId, ChainSource, Constant, Instr, Label, LocalSlot, Temp};
use crate::scope::{BindingId, BindingKind, ScopeId, ScopeTree, RECEIVER_NAME};
use control_flow::ControlStack;
use generator::ResumeDispatch;

/// Read-only inputs shared by every callable of a module
#[derive(Clone, Copy)]
pub struct LowerContext<'a> {
    pub tree: &'a ScopeTree,
    pub layouts: &'a FxHashMap<ScopeId, EnvironmentLayout>,
    pub callable_ids: &'a FxHashMap<ScopeId, CallableId>,
}

/// Syntax a callable body is lowered from
#[derive(Debug, Clone, Copy)]
pub enum CallableSource<'a> {
    Module(&'a Module),
    Function(&'a Function),
    Method(&'a Function),
    /// Constructors exist for every class; `function` is the explicit one
    Constructor {
        class: &'a Class,
        function: Option<&'a Function>,
    },
}

/// Output of lowering one callable
#[derive(Debug)]
pub struct LoweredCallable {
    pub body: Body,
    pub state_machine: Option<GeneratorStateMachineInfo>,
}

/// Lower the callable introduced by `scope`
pub fn lower_callable(
    ctx: LowerContext<'_>,
    scope: ScopeId,
    source: CallableSource<'_>,
) -> CompileResult<LoweredCallable> {
    let layout = ctx
        .layouts
        .get(&scope)
        .ok_or_else(|| CompileError::UnknownScope {
            callable: ctx.tree.scope(scope).qualified_name.to_string(),
            scope: scope.to_string(),
        })?;
    let mut lowerer = FunctionLowerer::new(ctx, scope, layout);
    lowerer.lower_source(source)?;
    lowerer.finish()
}

/// Per-callable lowering state
pub(crate) struct FunctionLowerer<'a> {
    tree: &'a ScopeTree,
    layouts: &'a FxHashMap<ScopeId, EnvironmentLayout>,
    callable_ids: &'a FxHashMap<ScopeId, CallableId>,
    /// Scope of the callable being lowered
    callable: ScopeId,
    layout: &'a EnvironmentLayout,
    builder: BodyBuilder,
    /// Innermost scope at the current lowering position
    current_scope: ScopeId,
    /// Slots of bindings stored as locals, allocated on first use
    locals: FxHashMap<BindingId, LocalSlot>,
    control: ControlStack,
    /// Number of protected regions enclosing the current position
    protected_depth: u32,
    /// Return value temp and epilogue label, used by returns that must
    /// leave protected regions
    return_exit: Option<(Temp, Label)>,
    /// Labels waiting for the loop statement they name
    pending_labels: Vec<String>,
    is_generator: bool,
    is_async: bool,
    dispatch: Option<ResumeDispatch>,
    state_machine: Option<GeneratorStateMachineInfo>,
}

impl<'a> FunctionLowerer<'a> {
    fn new(ctx: LowerContext<'a>, callable: ScopeId, layout: &'a EnvironmentLayout) -> Self {
        let scope = ctx.tree.scope(callable);
        let resumable = scope.is_resumable();
        Self {
            tree: ctx.tree,
            layouts: ctx.layouts,
            callable_ids: ctx.callable_ids,
            callable,
            layout,
            builder: BodyBuilder::new(),
            current_scope: callable,
            locals: FxHashMap::default(),
            control: ControlStack::new(),
            protected_depth: 0,
            return_exit: None,
            pending_labels: Vec::new(),
            is_generator: scope.is_generator,
            is_async: scope.is_async,
            dispatch: None,
            state_machine: resumable.then(GeneratorStateMachineInfo::new),
        }
    }

    /// Qualified name of the callable, used in errors and logs
    fn name(&self) -> &str {
        self.layout.callable.as_str()
    }

    fn lower_source(&mut self, source: CallableSource<'_>) -> CompileResult<()> {
        if self.state_machine.is_some() {
            let entry = self.builder.position();
            self.builder
                .emit(Instr::GeneratorStateSwitch { cases: Vec::new() });
            self.dispatch = Some(ResumeDispatch::new(entry));
        }

        if self.tree.has_record(self.callable) {
            self.builder.emit(Instr::CreateScopeInstance {
                scope: self.tree.scope(self.callable).qualified_name.clone(),
            });
        }
        if self.layout.abi.kind == CallableKind::Constructor && self.layout.abi.has_scopes_param {
            self.builder.emit(Instr::StoreScopesOnReceiver);
        }
        if let Some(receiver) = self.tree.scope(self.callable).lookup_local(RECEIVER_NAME) {
            let this = self.builder.new_temp();
            self.builder.emit(Instr::LoadThis { dest: this });
            self.store_binding(receiver, this)?;
        }

        match source {
            CallableSource::Module(module) => {
                self.lower_statements(&module.statements)?;
            }
            CallableSource::Function(func) | CallableSource::Method(func) => {
                self.bind_self_reference(func)?;
                self.lower_parameters(func)?;
                self.lower_function_body(&func.body)?;
            }
            CallableSource::Constructor { class, function } => {
                if let Some(func) = function {
                    self.lower_parameters(func)?;
                }
                self.lower_instance_fields(class)?;
                if let Some(func) = function {
                    self.lower_function_body(&func.body)?;
                }
            }
        }

        if !self.builder.is_terminated() {
            let undefined = self.constant(Constant::Undefined);
            self.lower_return_value(undefined)?;
        }
        if let Some((value, label)) = self.return_exit {
            self.builder.place(label);
            self.builder.emit(Instr::Return { value });
        }
        self.finish_dispatch();
        Ok(())
    }

    fn finish(self) -> CompileResult<LoweredCallable> {
        let body = self.builder.finish();
        let mut state_machine = self.state_machine;
        if let Some(info) = state_machine.as_mut() {
            info.compute_liveness(&body, self.layout.callable.as_str())?;
        }
        debug!(
            callable = %self.layout.callable,
            instrs = body.len(),
            temps = body.temp_count,
            regions = body.regions.len(),
            states = state_machine.as_ref().map(|i| i.yield_points.len()).unwrap_or(0),
            "lowered callable"
        );
        Ok(LoweredCallable {
            body,
            state_machine,
        })
    }

    /// Named function expressions see themselves under their own name
    fn bind_self_reference(&mut self, func: &Function) -> CompileResult<()> {
        let Some(name) = &func.name else {
            return Ok(());
        };
        let Some(binding) = self.tree.scope(self.callable).lookup_local(&name.name) else {
            return Ok(());
        };
        if self.tree.binding(binding).kind != BindingKind::Function {
            return Ok(());
        }
        let callee = self.builder.new_temp();
        self.builder.emit(Instr::LoadCallee { dest: callee });
        self.store_binding(binding, callee)
    }

    fn lower_function_body(&mut self, body: &FunctionBody) -> CompileResult<()> {
        match body {
            FunctionBody::Block(block) => self.lower_statements(&block.statements),
            FunctionBody::Expression(expr) => {
                let value = self.lower_expr(expr)?;
                self.lower_return_value(value)
            }
        }
    }

    fn constant(&mut self, value: Constant) -> Temp {
        let dest = self.builder.new_temp();
        self.builder.emit(Instr::Const { dest, value });
        dest
    }

    /// Chain a new closure of `callee` receives, one source per slot of the
    /// callee's chain layout, outermost first
    fn chain_sources(&self, callee: ScopeId) -> CompileResult<Vec<ChainSource>> {
        let callee_layout = self
            .layouts
            .get(&callee)
            .ok_or_else(|| CompileError::UnknownScope {
                callable: self.name().to_string(),
                scope: self.tree.scope(callee).qualified_name.to_string(),
            })?;
        if callee_layout.chain.is_empty() {
            return Ok(Vec::new());
        }

        let mut ancestors: Vec<ScopeId> = self.tree.ancestors(callee).collect();
        ancestors.reverse();
        let mut sources = Vec::with_capacity(callee_layout.chain.len());
        for (slot, ancestor) in callee_layout.chain.slots().iter().zip(ancestors) {
            let source = if ancestor == self.callable {
                if self.tree.has_record(ancestor) {
                    ChainSource::Own
                } else {
                    ChainSource::Null
                }
            } else if let Some(index) = self.layout.chain.index_of(&slot.scope) {
                ChainSource::Parent(index)
            } else if self.tree.enclosing_activation(ancestor) == self.callable
                && self.tree.has_record(ancestor)
            {
                ChainSource::Block(slot.scope.clone())
            } else {
                ChainSource::Null
            };
            sources.push(source);
        }
        Ok(sources)
    }

    fn callable_id(&self, scope: ScopeId) -> CompileResult<CallableId> {
        self.callable_ids
            .get(&scope)
            .copied()
            .ok_or_else(|| CompileError::UnknownScope {
                callable: self.name().to_string(),
                scope: self.tree.scope(scope).qualified_name.to_string(),
            })
    }

    /// Closure over the callable scope `callee`
    fn make_closure(&mut self, callee: ScopeId) -> CompileResult<Temp> {
        let callable = self.callable_id(callee)?;
        let chain = self.chain_sources(callee)?;
        let dest = self.builder.new_temp();
        self.builder.emit(Instr::MakeClosure {
            dest,
            callable,
            chain,
        });
        Ok(dest)
    }

    /// Scope a syntax node introduced, as recorded by the scope builder
    fn node_scope(&self, node: kiln_syntax::NodeId) -> CompileResult<ScopeId> {
        self.tree
            .scope_for_node(node)
            .ok_or_else(|| CompileError::internal(format!("{}: no scope for node {:?}", self.name(), node)))
    }

    /// Make `scope` current, materializing its record when it has one
    fn enter_scope(&mut self, scope: ScopeId) -> ScopeId {
        let saved = self.current_scope;
        self.current_scope = scope;
        if self.tree.has_record(scope) {
            self.builder.emit(Instr::EnterBlockScope {
                scope: self.tree.scope(scope).qualified_name.clone(),
            });
        }
        saved
    }
}
