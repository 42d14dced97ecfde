//! Compilation pipeline
//!
//! module → scope tree → captures → per-callable layout → lowered body →
//! verified [`CompiledModule`].

use kiln_syntax::ast::{walk_class, walk_function, Class, ClassMember, Function, Module, Visitor};
use kiln_syntax::NodeId;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, trace};

use crate::abi::{CallableKind, EnvironmentLayout, EnvironmentLayoutBuilder};
use crate::error::{CompileError, CompileResult};
use crate::lir::{verify_regions, Body, CallableId};
use crate::lower::{lower_callable, CallableSource, GeneratorStateMachineInfo, LowerContext, LoweredCallable};
use crate::metrics::CompileMetrics;
use crate::options::CompileOptions;
use crate::scope::{
    CaptureAnalyzer, CaptureSummary, ScopeId, ScopeKind, ScopeName, ScopeTree, ScopeTreeBuilder,
};

/// Everything the emitter needs for one callable
#[derive(Debug, Clone, Serialize)]
pub struct CompiledCallable {
    pub id: CallableId,
    pub name: ScopeName,
    #[serde(skip)]
    pub scope: ScopeId,
    pub kind: CallableKind,
    pub is_generator: bool,
    pub is_async: bool,
    pub is_arrow: bool,
    pub layout: EnvironmentLayout,
    pub body: Body,
    pub state_machine: Option<GeneratorStateMachineInfo>,
}

impl CompiledCallable {
    pub fn is_resumable(&self) -> bool {
        self.state_machine.is_some()
    }
}

/// A fully lowered module
#[derive(Debug, Clone, Serialize)]
pub struct CompiledModule {
    pub name: String,
    #[serde(skip)]
    pub tree: ScopeTree,
    #[serde(skip)]
    pub captures: CaptureSummary,
    /// Callables indexed by [`CallableId`]; the module main is first
    pub callables: Vec<CompiledCallable>,
    pub entry: CallableId,
    pub metrics: Option<CompileMetrics>,
}

impl CompiledModule {
    pub fn callable(&self, id: CallableId) -> Option<&CompiledCallable> {
        self.callables.get(id.as_u32() as usize)
    }

    /// Look up a callable by its qualified scope name
    pub fn find(&self, name: &str) -> Option<&CompiledCallable> {
        self.callables.iter().find(|c| c.name.as_str() == name)
    }

    pub fn main(&self) -> Option<&CompiledCallable> {
        self.callable(self.entry)
    }

    /// Emitter-facing JSON of every callable
    pub fn to_json(&self) -> CompileResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CompileError::internal(e.to_string()))
    }
}

/// Source syntax of every callable, keyed by the node that introduced it
#[derive(Default)]
struct CallableCollector<'ast> {
    functions: FxHashMap<NodeId, &'ast Function>,
    methods: FxHashMap<NodeId, &'ast Function>,
    classes: FxHashMap<NodeId, &'ast Class>,
}

impl<'ast> Visitor<'ast> for CallableCollector<'ast> {
    fn visit_function(&mut self, func: &'ast Function) {
        self.functions.insert(func.id, func);
        walk_function(self, func);
    }

    fn visit_class(&mut self, class: &'ast Class) {
        self.classes.insert(class.id, class);
        for member in &class.members {
            if let ClassMember::Method(method) = member {
                self.methods.insert(method.function.id, &method.function);
            }
        }
        walk_class(self, class);
    }
}

impl<'ast> CallableCollector<'ast> {
    fn collect(module: &'ast Module) -> Self {
        let mut collector = Self::default();
        collector.visit_module(module);
        collector
    }

    fn source(
        &self,
        tree: &ScopeTree,
        module: &'ast Module,
        scope: ScopeId,
    ) -> CompileResult<CallableSource<'ast>> {
        let s = tree.scope(scope);
        let missing = || CompileError::UnknownScope {
            callable: s.qualified_name.to_string(),
            scope: format!("{} has no source node", scope),
        };
        match s.kind {
            ScopeKind::Module => Ok(CallableSource::Module(module)),
            ScopeKind::Function | ScopeKind::Arrow => s
                .node
                .and_then(|node| self.functions.get(&node).copied())
                .map(CallableSource::Function)
                .ok_or_else(missing),
            ScopeKind::Method => s
                .node
                .and_then(|node| self.methods.get(&node).copied())
                .map(CallableSource::Method)
                .ok_or_else(missing),
            ScopeKind::Constructor => {
                let class = s
                    .parent
                    .and_then(|parent| tree.scope(parent).node)
                    .and_then(|node| self.classes.get(&node).copied())
                    .ok_or_else(missing)?;
                let function = s.node.and_then(|node| self.functions.get(&node).copied());
                Ok(CallableSource::Constructor { class, function })
            }
            _ => Err(missing()),
        }
    }
}

/// Compiler entry point
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile a module
    pub fn compile(&self, module: &Module) -> CompileResult<CompiledModule> {
        self.options.validate()?;
        let name = self
            .options
            .module_name
            .clone()
            .unwrap_or_else(|| module.name.clone());

        let mut tree = ScopeTreeBuilder::build_named(module, &name);
        let captures = CaptureAnalyzer::analyze(&mut tree);
        debug!(
            module = %name,
            scopes = tree.len(),
            captured = captures.captured.len(),
            globals = captures.globals.len(),
            "analyzed module"
        );

        let collector = CallableCollector::collect(module);
        let scopes: Vec<ScopeId> = tree.callables().map(|s| s.id).collect();
        let callable_ids: FxHashMap<ScopeId, CallableId> = scopes
            .iter()
            .enumerate()
            .map(|(index, scope)| (*scope, CallableId::new(index as u32)))
            .collect();

        let layout_builder = EnvironmentLayoutBuilder::new(&tree);
        let mut layouts = FxHashMap::default();
        for &scope in &scopes {
            layouts.insert(scope, layout_builder.build_for(scope)?);
        }

        let ctx = LowerContext {
            tree: &tree,
            layouts: &layouts,
            callable_ids: &callable_ids,
        };
        let mut callables = Vec::with_capacity(scopes.len());
        for (index, &scope) in scopes.iter().enumerate() {
            let source = collector.source(&tree, module, scope)?;
            let s = tree.scope(scope);
            let lowered = verified(lower_callable(ctx, scope, source)?, s.qualified_name.as_str())?;
            let layout = layouts
                .get(&scope)
                .cloned()
                .ok_or_else(|| CompileError::internal(format!("no layout for {}", s.qualified_name)))?;
            trace!(callable = %s.qualified_name, id = index, kind = %layout.abi.kind, "compiled callable");
            callables.push(CompiledCallable {
                id: CallableId::new(index as u32),
                name: s.qualified_name.clone(),
                scope,
                kind: layout.abi.kind,
                is_generator: s.is_generator,
                is_async: s.is_async,
                is_arrow: s.kind == ScopeKind::Arrow,
                layout,
                body: lowered.body,
                state_machine: lowered.state_machine,
            });
        }

        let metrics = self
            .options
            .collect_metrics
            .then(|| self.collect_metrics(&tree, &captures, &callables));

        Ok(CompiledModule {
            name,
            tree,
            captures,
            callables,
            entry: CallableId::new(0),
            metrics,
        })
    }

    fn collect_metrics(
        &self,
        tree: &ScopeTree,
        captures: &CaptureSummary,
        callables: &[CompiledCallable],
    ) -> CompileMetrics {
        let mut metrics = CompileMetrics {
            scopes: tree.len() as u32,
            bindings: tree.bindings().len() as u32,
            captured_bindings: captures.captured.len() as u32,
            callables: callables.len() as u32,
            ..CompileMetrics::default()
        };
        for callable in callables {
            if callable.layout.abi.has_chain() {
                metrics.chained_callables += 1;
            }
            if let Some(info) = &callable.state_machine {
                metrics.resumable_callables += 1;
                metrics.yield_points += info.yield_points.len() as u32;
            }
            metrics.exception_regions += callable.body.regions.len() as u32;
            if callable.layout.abi.physical_arg_count() > self.options.max_delegate_arity {
                metrics.oversized_arity += 1;
            }
        }
        metrics
    }
}

/// Region tables reach the emitter only after passing the verifier
fn verified(lowered: LoweredCallable, callable: &str) -> CompileResult<LoweredCallable> {
    verify_regions(&lowered.body, callable)?;
    Ok(lowered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::ScopesSource;
    use kiln_syntax::build::AstBuilder;

    #[test]
    fn test_callable_ids_follow_scope_order() {
        let b = AstBuilder::new("main");
        let module = b.module(vec![
            b.function_decl(b.function("a").body(vec![])),
            b.class_decl(b.class("C").method("m", b.function("m").body(vec![])).build()),
        ]);
        let compiled = Compiler::default().compile(&module).unwrap();
        let names: Vec<&str> = compiled.callables.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["main", "main/a", "main/C/constructor", "main/C/m"]);
        assert_eq!(compiled.main().unwrap().kind, CallableKind::ModuleMain);
        assert_eq!(compiled.find("main/C/m").unwrap().kind, CallableKind::ClassMethod);
    }

    #[test]
    fn test_module_name_override() {
        let b = AstBuilder::new("main");
        let module = b.module(vec![b.function_decl(b.function("f").body(vec![]))]);
        let options = CompileOptions {
            module_name: Some("app".to_string()),
            ..CompileOptions::default()
        };
        let compiled = Compiler::new(options).compile(&module).unwrap();
        assert_eq!(compiled.name, "app");
        assert!(compiled.find("app/f").is_some());
    }

    #[test]
    fn test_invalid_options_fail_before_analysis() {
        let b = AstBuilder::new("main");
        let module = b.module(vec![]);
        let options = CompileOptions {
            max_delegate_arity: 0,
            ..CompileOptions::default()
        };
        let err = Compiler::new(options).compile(&module).unwrap_err();
        assert!(matches!(err, CompileError::Config { .. }));
    }

    #[test]
    fn test_metrics_count_chains_and_arity() {
        let b = AstBuilder::new("main");
        let module = b.module(vec![b.function_decl(
            b.function("outer")
                .param("a")
                .body(vec![b.return_(Some(b.func_expr(
                    b.function("wide")
                        .param("p1")
                        .param("p2")
                        .param("p3")
                        .param("p4")
                        .param("p5")
                        .param("p6")
                        .body(vec![b.return_(Some(b.ident("a")))]),
                )))]),
        )]);
        let compiled = Compiler::default().compile(&module).unwrap();
        let wide = compiled.find("main/outer/wide").unwrap();
        assert_eq!(wide.layout.abi.scopes_source, ScopesSource::Argument);
        assert_eq!(wide.layout.abi.physical_arg_count(), 7);

        let metrics = compiled.metrics.as_ref().unwrap();
        assert_eq!(metrics.callables, 3);
        assert_eq!(metrics.chained_callables, 1);
        assert_eq!(metrics.captured_bindings, 1);
        assert_eq!(metrics.oversized_arity, 1);
    }

    #[test]
    fn test_metrics_disabled() {
        let b = AstBuilder::new("main");
        let module = b.module(vec![]);
        let options = CompileOptions {
            collect_metrics: false,
            ..CompileOptions::default()
        };
        let compiled = Compiler::new(options).compile(&module).unwrap();
        assert!(compiled.metrics.is_none());
        assert_eq!(compiled.callables.len(), 1);
    }

    #[test]
    fn test_malformed_body_never_leaves_pipeline() {
        let mut builder = crate::lir::BodyBuilder::new();
        let label = builder.new_label();
        builder.place(label);
        builder.place(label);
        let lowered = LoweredCallable {
            body: builder.finish(),
            state_machine: None,
        };
        let err = verified(lowered, "main/f").unwrap_err();
        assert!(matches!(err, CompileError::MalformedRegions { .. }));
    }
}
