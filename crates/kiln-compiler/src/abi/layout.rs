//! Environment layout construction
//!
//! For one callable, decides the calling convention, the shape of the
//! ancestor chain and the storage of every binding the callable touches:
//!
//! | binding                                   | storage              |
//! |-------------------------------------------|----------------------|
//! | declared here, captured                   | `OwnScopeField`      |
//! | declared here, plain parameter            | `Argument`           |
//! | declared here, anything else              | `Local`              |
//! | declared in an ancestor (always captured) | `AncestorScopeField` |
//!
//! "Declared here" covers the callable scope and the block, loop, catch and
//! class scopes that share its activation.

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::debug;

use super::callable::{CallableAbi, CallableKind};
use super::chain::ScopeChainLayout;
use super::storage::{BindingStorage, FieldId};
use crate::error::{CompileError, CompileResult};
use crate::scope::{BindingId, BindingKind, ScopeId, ScopeName, ScopeTree};

/// Storage decision for one binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageEntry {
    pub binding: BindingId,
    pub name: String,
    /// Declaring scope
    pub scope: ScopeName,
    pub storage: BindingStorage,
}

/// Everything the emitter needs to address bindings inside one callable
#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentLayout {
    pub callable: ScopeName,
    pub abi: CallableAbi,
    pub chain: ScopeChainLayout,
    entries: Vec<StorageEntry>,
    #[serde(skip)]
    index: FxHashMap<BindingId, usize>,
}

impl EnvironmentLayout {
    fn new(callable: ScopeName, abi: CallableAbi, chain: ScopeChainLayout) -> Self {
        Self {
            callable,
            abi,
            chain,
            entries: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    fn register(&mut self, tree: &ScopeTree, binding: BindingId, storage: BindingStorage) {
        if self.index.contains_key(&binding) {
            return;
        }
        let b = tree.binding(binding);
        self.index.insert(binding, self.entries.len());
        self.entries.push(StorageEntry {
            binding,
            name: b.name.clone(),
            scope: tree.scope(b.scope).qualified_name.clone(),
            storage,
        });
    }

    /// Storage entries in registration order
    pub fn entries(&self) -> &[StorageEntry] {
        &self.entries
    }

    pub fn lookup(&self, binding: BindingId) -> Option<&BindingStorage> {
        self.index.get(&binding).map(|&i| &self.entries[i].storage)
    }

    /// Storage of a binding this callable references. Asking for a binding
    /// that was never registered is a pipeline defect and fails.
    pub fn storage(&self, tree: &ScopeTree, binding: BindingId) -> CompileResult<&BindingStorage> {
        self.lookup(binding).ok_or_else(|| {
            let b = tree.binding(binding);
            CompileError::UnregisteredBinding {
                callable: self.callable.to_string(),
                binding: b.name.clone(),
                scope: tree.scope(b.scope).qualified_name.to_string(),
            }
        })
    }

    /// Distinct chain slots read by this callable, ascending
    pub fn required_chain_indices(&self) -> Vec<u32> {
        let mut indices: Vec<u32> = self
            .entries
            .iter()
            .filter_map(|e| match &e.storage {
                BindingStorage::AncestorScopeField { chain_index, .. } => Some(*chain_index),
                _ => None,
            })
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// Fields this callable's own scope records carry
    pub fn own_fields(&self) -> impl Iterator<Item = &FieldId> {
        self.entries.iter().filter_map(|e| match &e.storage {
            BindingStorage::OwnScopeField { field } => Some(field),
            _ => None,
        })
    }
}

/// Builds [`EnvironmentLayout`]s from an analyzed scope tree
pub struct EnvironmentLayoutBuilder<'a> {
    tree: &'a ScopeTree,
}

impl<'a> EnvironmentLayoutBuilder<'a> {
    pub fn new(tree: &'a ScopeTree) -> Self {
        Self { tree }
    }

    /// Build the layout of `scope`, deriving its callable kind
    pub fn build_for(&self, scope: ScopeId) -> CompileResult<EnvironmentLayout> {
        let kind = CallableKind::of(self.tree, scope)?;
        self.build(scope, kind)
    }

    pub fn build(&self, scope: ScopeId, kind: CallableKind) -> CompileResult<EnvironmentLayout> {
        let tree = self.tree;
        let s = tree.scope(scope);

        let needs_chain = kind != CallableKind::ModuleMain && s.references_ancestor_bindings;
        let destructured = s
            .bindings
            .iter()
            .filter(|&&b| {
                let b = tree.binding(b);
                b.kind == BindingKind::Parameter && b.is_destructured
            })
            .count() as u32;
        let declared = s
            .bindings
            .iter()
            .filter(|&&b| tree.binding(b).kind == BindingKind::Parameter)
            .count() as u32;
        let abi = CallableAbi::new(kind, needs_chain, declared - destructured, s.arity);

        let chain = if needs_chain {
            ScopeChainLayout::for_ancestors(tree, scope)
        } else {
            ScopeChainLayout::empty()
        };

        let mut layout = EnvironmentLayout::new(s.qualified_name.clone(), abi, chain);

        for own_scope in tree.activation_scopes(scope) {
            for &binding_id in &tree.scope(own_scope).bindings {
                let binding = tree.binding(binding_id);
                let storage = if binding.is_captured {
                    BindingStorage::OwnScopeField {
                        field: FieldId::new(
                            tree.scope(own_scope).qualified_name.clone(),
                            binding.name.clone(),
                        ),
                    }
                } else {
                    match (binding.kind, binding.parameter_index) {
                        (BindingKind::Parameter, Some(parameter_index))
                            if !binding.is_destructured =>
                        {
                            BindingStorage::Argument { parameter_index }
                        }
                        _ => BindingStorage::Local,
                    }
                };
                layout.register(tree, binding_id, storage);
            }
        }

        for inner in tree.subtree(scope) {
            for reference in &tree.scope(inner).references {
                let Some(binding_id) = tree.resolve(inner, &reference.name) else {
                    continue;
                };
                let binding = tree.binding(binding_id);
                if tree.is_ancestor_or_self(scope, binding.scope) {
                    continue;
                }
                let declaring = &tree.scope(binding.scope).qualified_name;
                if !binding.is_captured {
                    return Err(CompileError::internal(format!(
                        "{}: binding '{}' of {} is referenced across callables but not captured",
                        layout.callable, binding.name, declaring
                    )));
                }
                let Some(chain_index) = layout.chain.index_of(declaring) else {
                    return Err(CompileError::MissingChainScope {
                        callable: layout.callable.to_string(),
                        binding: binding.name.clone(),
                        scope: declaring.to_string(),
                    });
                };
                let storage = BindingStorage::AncestorScopeField {
                    field: FieldId::new(declaring.clone(), binding.name.clone()),
                    chain_index,
                };
                layout.register(tree, binding_id, storage);
            }
        }

        debug!(
            callable = %layout.callable,
            %kind,
            scopes_source = ?layout.abi.scopes_source,
            chain = layout.chain.len(),
            bindings = layout.entries.len(),
            "environment layout built"
        );
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::ScopesSource;
    use crate::scope::{CaptureAnalyzer, ScopeTreeBuilder};
    use kiln_syntax::ast::Module;
    use kiln_syntax::build::AstBuilder;

    fn analyzed(module: &Module) -> ScopeTree {
        let mut tree = ScopeTreeBuilder::build(module);
        CaptureAnalyzer::analyze(&mut tree);
        tree
    }

    fn layout_of(tree: &ScopeTree, name: &str) -> EnvironmentLayout {
        let scope = tree.find(name).unwrap();
        EnvironmentLayoutBuilder::new(tree).build_for(scope).unwrap()
    }

    fn storage_of<'l>(tree: &ScopeTree, layout: &'l EnvironmentLayout, scope: &str, name: &str) -> &'l BindingStorage {
        let scope = tree.find(scope).unwrap();
        let binding = tree.scope(scope).lookup_local(name).unwrap();
        layout.storage(tree, binding).unwrap()
    }

    fn outer_inner_module(b: &AstBuilder) -> Module {
        b.module(vec![
            b.var("g", Some(b.num(1.0))),
            b.function_decl(b.function("outer").body(vec![
                b.var("o", Some(b.num(2.0))),
                b.function_decl(b.function("inner").body(vec![b.return_(Some(
                    b.add(b.ident("g"), b.ident("o")),
                ))])),
            ])),
        ])
    }

    #[test]
    fn test_ancestor_fields_use_outermost_first_chain() {
        let b = AstBuilder::new("main");
        let tree = analyzed(&outer_inner_module(&b));
        let inner = layout_of(&tree, "main/outer/inner");

        assert_eq!(inner.abi.scopes_source, ScopesSource::Argument);
        assert_eq!(inner.chain.get(0).unwrap().scope.as_str(), "main");
        assert_eq!(
            storage_of(&tree, &inner, "main", "g"),
            &BindingStorage::AncestorScopeField {
                field: FieldId::new(ScopeName::new("main"), "g"),
                chain_index: 0,
            }
        );
        assert_eq!(
            storage_of(&tree, &inner, "main/outer", "o"),
            &BindingStorage::AncestorScopeField {
                field: FieldId::new(ScopeName::new("main/outer"), "o"),
                chain_index: 1,
            }
        );
        assert_eq!(inner.required_chain_indices(), vec![0, 1]);

        let outer = layout_of(&tree, "main/outer");
        assert!(matches!(
            storage_of(&tree, &outer, "main/outer", "o"),
            BindingStorage::OwnScopeField { .. }
        ));
        // outer forwards the chain inner needs, so it has one itself
        assert_eq!(outer.chain.len(), 1);
    }

    #[test]
    fn test_pure_function_has_no_chain() {
        let b = AstBuilder::new("main");
        let module = b.module(vec![b.function_decl(
            b.function("add")
                .param("a")
                .param("b")
                .body(vec![b.return_(Some(b.add(b.ident("a"), b.ident("b"))))]),
        )]);
        let tree = analyzed(&module);
        let add = layout_of(&tree, "main/add");

        assert_eq!(add.abi.scopes_source, ScopesSource::None);
        assert!(add.chain.is_empty());
        assert_eq!(
            storage_of(&tree, &add, "main/add", "b"),
            &BindingStorage::Argument { parameter_index: 1 }
        );
    }

    #[test]
    fn test_captured_parameter_moves_to_scope_field() {
        let b = AstBuilder::new("main");
        let module = b.module(vec![b.function_decl(b.function("counter").param("start").body(
            vec![b.return_(Some(b.func_expr(
                b.arrow().expr_body(b.increment(b.ident("start"))),
            )))],
        ))]);
        let tree = analyzed(&module);
        let counter = layout_of(&tree, "main/counter");

        assert_eq!(
            storage_of(&tree, &counter, "main/counter", "start"),
            &BindingStorage::OwnScopeField {
                field: FieldId::new(ScopeName::new("main/counter"), "start"),
            }
        );
        assert_eq!(counter.own_fields().count(), 1);
    }

    #[test]
    fn test_destructured_parameters_are_locals() {
        let b = AstBuilder::new("main");
        let module = b.module(vec![b.function_decl(
            b.function("f")
                .param_pattern(b.array_pat(vec![Some(b.pat("x")), Some(b.pat("y"))]), None)
                .param("z")
                .body(vec![]),
        )]);
        let tree = analyzed(&module);
        let f = layout_of(&tree, "main/f");

        assert_eq!(f.abi.js_parameter_count, 1);
        assert_eq!(f.abi.arity, 2);
        assert_eq!(storage_of(&tree, &f, "main/f", "x"), &BindingStorage::Local);
        assert_eq!(
            storage_of(&tree, &f, "main/f", "z"),
            &BindingStorage::Argument { parameter_index: 1 }
        );
    }

    #[test]
    fn test_block_scoped_capture_uses_block_field() {
        let b = AstBuilder::new("main");
        let module = b.module(vec![b.function_decl(b.function("f").body(vec![b.block(vec![
            b.let_("inside", Some(b.num(1.0))),
            b.expr(b.func_expr(b.arrow().expr_body(b.ident("inside")))),
        ])]))]);
        let tree = analyzed(&module);
        let f = layout_of(&tree, "main/f");

        let field = f.own_fields().next().unwrap();
        assert!(field.scope.as_str().starts_with("main/f/Block_"));
        assert_eq!(field.name, "inside");
    }

    #[test]
    fn test_class_member_abis() {
        let b = AstBuilder::new("main");
        let module = b.module(vec![
            b.var("scale", Some(b.num(2.0))),
            b.class_decl(
                b.class("Scaler")
                    .method(
                        "apply",
                        b.function("apply")
                            .param("n")
                            .body(vec![b.return_(Some(b.mul(b.ident("scale"), b.ident("n"))))]),
                    )
                    .build(),
            ),
        ]);
        let tree = analyzed(&module);

        let ctor = layout_of(&tree, "main/Scaler/constructor");
        assert_eq!(ctor.abi.kind, CallableKind::Constructor);
        assert_eq!(ctor.abi.scopes_source, ScopesSource::Argument);
        assert_eq!(ctor.abi.scopes_arg_index(), Some(1));

        let apply = layout_of(&tree, "main/Scaler/apply");
        assert_eq!(apply.abi.kind, CallableKind::ClassMethod);
        assert_eq!(apply.abi.scopes_source, ScopesSource::ThisField);
        assert_eq!(apply.chain, ctor.chain);
        assert_eq!(
            storage_of(&tree, &apply, "main/Scaler/apply", "n"),
            &BindingStorage::Argument { parameter_index: 0 }
        );
    }

    #[test]
    fn test_module_main_layout() {
        let b = AstBuilder::new("main");
        let tree = analyzed(&outer_inner_module(&b));
        let main = layout_of(&tree, "main");

        assert_eq!(main.abi.kind, CallableKind::ModuleMain);
        assert!(main.chain.is_empty());
        assert!(matches!(
            storage_of(&tree, &main, "main", "g"),
            BindingStorage::OwnScopeField { .. }
        ));
        assert_eq!(storage_of(&tree, &main, "main", "outer"), &BindingStorage::Local);
    }

    #[test]
    fn test_unregistered_binding_fails() {
        let b = AstBuilder::new("main");
        let tree = analyzed(&outer_inner_module(&b));
        let add = layout_of(&tree, "main/outer/inner");
        let main = tree.root();
        let outer_binding = tree.scope(main).lookup_local("outer").unwrap();

        let err = add.storage(&tree, outer_binding).unwrap_err();
        assert!(matches!(err, CompileError::UnregisteredBinding { .. }));
        assert!(err.to_string().contains("main/outer/inner"));
    }

    #[test]
    fn test_block_scope_is_not_a_callable() {
        let b = AstBuilder::new("main");
        let module = b.module(vec![b.block(vec![])]);
        let tree = analyzed(&module);
        let block = tree.scope(tree.root()).children[0];
        let err = EnvironmentLayoutBuilder::new(&tree).build_for(block).unwrap_err();
        assert!(matches!(err, CompileError::UnknownScope { .. }));
    }

    #[test]
    fn test_layout_is_deterministic() {
        let b = AstBuilder::new("main");
        let tree = analyzed(&outer_inner_module(&b));
        let first = serde_json::to_string(&layout_of(&tree, "main/outer/inner")).unwrap();
        let second = serde_json::to_string(&layout_of(&tree, "main/outer/inner")).unwrap();
        assert_eq!(first, second);
    }
}
