//! Scope tree
//!
//! Arena of lexical scopes and the bindings they declare. Parent links are
//! `ScopeId`s, so ancestor walks are index hops and the tree has no
//! ownership cycles.

use std::fmt;

use kiln_syntax::{NodeId, Span};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Unique identifier for a scope (index into the arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub fn new(id: u32) -> Self {
        ScopeId(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Unique identifier for a binding (index into the arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BindingId(pub u32);

impl BindingId {
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// Stable, module-unique scope identifier: the `/`-joined path of scope
/// names from the module root (`main/outer/inner`).
///
/// This is the only scope handle the emitter ever sees.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeName(String);

impl ScopeName {
    pub fn new(name: impl Into<String>) -> Self {
        ScopeName(name.into())
    }

    /// Identifier of a child scope
    pub fn child(&self, name: &str) -> ScopeName {
        ScopeName(format!("{}/{}", self.0, name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of lexical environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeKind {
    Module,
    Function,
    Arrow,
    Method,
    Constructor,
    Class,
    Block,
    Catch,
    /// Loop-iteration environment of a `for`/`for-of` head
    For,
}

impl ScopeKind {
    /// Scopes that are compiled as their own callable body
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            ScopeKind::Function | ScopeKind::Arrow | ScopeKind::Method | ScopeKind::Constructor
        )
    }

    /// Scopes that host `var` declarations
    pub fn is_var_scope(&self) -> bool {
        self.is_callable() || matches!(self, ScopeKind::Module)
    }

    /// Scopes that own an activation (module main or a callable)
    pub fn is_activation(&self) -> bool {
        self.is_var_scope()
    }
}

/// How a binding was declared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindingKind {
    Parameter,
    Var,
    Let,
    Const,
    Function,
    Class,
    CatchParameter,
    /// Implicit receiver (`this`) of a non-arrow callable
    Receiver,
}

/// Name under which the implicit receiver binding is declared. Not a
/// valid identifier, so it cannot collide with user bindings.
pub const RECEIVER_NAME: &str = "this";

/// One declared name
#[derive(Debug, Clone)]
pub struct Binding {
    pub id: BindingId,
    pub name: String,
    pub kind: BindingKind,
    /// Declaring scope
    pub scope: ScopeId,
    /// Read or written from another callable than the one owning `scope`
    pub is_captured: bool,
    /// Parameter bound through a destructuring pattern
    pub is_destructured: bool,
    /// Source position of the parameter this binding comes from
    pub parameter_index: Option<u32>,
    pub span: Span,
}

/// An identifier occurrence recorded during tree construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub is_write: bool,
}

/// One lexical environment
#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    /// Name unique among the parent's children
    pub name: String,
    pub qualified_name: ScopeName,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    /// Declared bindings in declaration order
    pub bindings: Vec<BindingId>,
    binding_index: FxHashMap<String, BindingId>,
    pub references: Vec<Reference>,
    /// Some reference in this scope or a descendant resolves to a binding
    /// declared in a strict ancestor
    pub references_ancestor_bindings: bool,
    /// Node that introduced the scope (None for module roots and
    /// synthesized constructors)
    pub node: Option<NodeId>,
    /// Number of source parameter positions (callables only)
    pub arity: u32,
    pub is_generator: bool,
    pub is_async: bool,
    pub is_static: bool,
    pub span: Span,
}

impl Scope {
    /// Look up a binding declared directly in this scope
    pub fn lookup_local(&self, name: &str) -> Option<BindingId> {
        self.binding_index.get(name).copied()
    }

    /// Check if the scope compiles to a resumable state machine
    pub fn is_resumable(&self) -> bool {
        self.is_generator || self.is_async
    }
}

/// The scope arena for one module
#[derive(Debug, Clone)]
pub struct ScopeTree {
    module_name: String,
    scopes: Vec<Scope>,
    bindings: Vec<Binding>,
    node_scopes: FxHashMap<NodeId, ScopeId>,
}

impl ScopeTree {
    /// Create a tree holding only the module root scope
    pub fn new(module_name: impl Into<String>, span: Span) -> Self {
        let module_name = module_name.into();
        let root = Scope {
            id: ScopeId(0),
            name: module_name.clone(),
            qualified_name: ScopeName::new(module_name.clone()),
            kind: ScopeKind::Module,
            parent: None,
            children: Vec::new(),
            bindings: Vec::new(),
            binding_index: FxHashMap::default(),
            references: Vec::new(),
            references_ancestor_bindings: false,
            node: None,
            arity: 0,
            is_generator: false,
            is_async: false,
            is_static: false,
            span,
        };
        Self {
            module_name,
            scopes: vec![root],
            bindings: Vec::new(),
            node_scopes: FxHashMap::default(),
        }
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// The module root scope
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub(crate) fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.bindings[id.index()]
    }

    pub(crate) fn binding_mut(&mut self, id: BindingId) -> &mut Binding {
        &mut self.bindings[id.index()]
    }

    /// All scopes in creation order
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    /// All bindings in declaration order
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Scope introduced by a syntax node
    pub fn scope_for_node(&self, node: NodeId) -> Option<ScopeId> {
        self.node_scopes.get(&node).copied()
    }

    /// Find a scope by its qualified name
    pub fn find(&self, qualified_name: &str) -> Option<ScopeId> {
        self.scopes
            .iter()
            .find(|s| s.qualified_name.as_str() == qualified_name)
            .map(|s| s.id)
    }

    /// Strict ancestors, innermost first
    pub fn ancestors(&self, id: ScopeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.scope(id).parent,
        }
    }

    /// Check whether `ancestor` is `scope` or one of its ancestors
    pub fn is_ancestor_or_self(&self, ancestor: ScopeId, scope: ScopeId) -> bool {
        scope == ancestor || self.ancestors(scope).any(|s| s == ancestor)
    }

    /// Nearest scope (inclusive) that owns an activation: the module root
    /// or a callable. Block, loop, catch and class scopes share the
    /// activation of the callable that contains them.
    pub fn enclosing_activation(&self, id: ScopeId) -> ScopeId {
        let mut current = id;
        loop {
            let scope = self.scope(current);
            if scope.kind.is_activation() {
                return current;
            }
            match scope.parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    /// Nearest enclosing scope (inclusive) with its own receiver: a
    /// non-arrow callable. `None` at module level.
    pub fn receiver_scope(&self, id: ScopeId) -> Option<ScopeId> {
        let mut current = Some(id);
        while let Some(scope_id) = current {
            let scope = self.scope(scope_id);
            match scope.kind {
                ScopeKind::Function | ScopeKind::Method | ScopeKind::Constructor => {
                    return Some(scope_id)
                }
                ScopeKind::Module => return None,
                _ => current = scope.parent,
            }
        }
        None
    }

    /// Resolve a name by walking the static scope chain outward
    pub fn resolve(&self, from: ScopeId, name: &str) -> Option<BindingId> {
        let mut current = Some(from);
        while let Some(scope_id) = current {
            let scope = self.scope(scope_id);
            if let Some(binding) = scope.lookup_local(name) {
                return Some(binding);
            }
            current = scope.parent;
        }
        None
    }

    /// Whether a scope needs a materialized scope record: it declares at
    /// least one captured binding
    pub fn has_record(&self, id: ScopeId) -> bool {
        self.scope(id)
            .bindings
            .iter()
            .any(|&b| self.binding(b).is_captured)
    }

    /// Scopes sharing `activation`'s activation, in preorder, starting with
    /// `activation` itself. Nested callables are not entered.
    pub fn activation_scopes(&self, activation: ScopeId) -> Vec<ScopeId> {
        let mut out = Vec::new();
        let mut stack = vec![activation];
        while let Some(id) = stack.pop() {
            out.push(id);
            for &child in self.scope(id).children.iter().rev() {
                if !self.scope(child).kind.is_callable() {
                    stack.push(child);
                }
            }
        }
        out
    }

    /// `scope` and every scope nested inside it, in preorder
    pub fn subtree(&self, scope: ScopeId) -> Vec<ScopeId> {
        let mut out = Vec::new();
        let mut stack = vec![scope];
        while let Some(id) = stack.pop() {
            out.push(id);
            for &child in self.scope(id).children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Callable scopes (module root first, then callables in creation order)
    pub fn callables(&self) -> impl Iterator<Item = &Scope> {
        self.scopes
            .iter()
            .filter(|s| s.kind.is_callable() || s.kind == ScopeKind::Module)
    }

    // ========================================================================
    // Construction (used by the builder)
    // ========================================================================

    pub(crate) fn add_scope(
        &mut self,
        parent: ScopeId,
        name: String,
        kind: ScopeKind,
        node: Option<NodeId>,
        span: Span,
    ) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        let qualified_name = self.scope(parent).qualified_name.child(&name);
        self.scopes.push(Scope {
            id,
            name,
            qualified_name,
            kind,
            parent: Some(parent),
            children: Vec::new(),
            bindings: Vec::new(),
            binding_index: FxHashMap::default(),
            references: Vec::new(),
            references_ancestor_bindings: false,
            node,
            arity: 0,
            is_generator: false,
            is_async: false,
            is_static: false,
            span,
        });
        self.scope_mut(parent).children.push(id);
        if let Some(node) = node {
            self.node_scopes.insert(node, id);
        }
        id
    }

    /// Declare a binding. Redeclaring an existing name in the same scope
    /// returns the existing binding (e.g. repeated `var`).
    pub(crate) fn declare(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: BindingKind,
        span: Span,
    ) -> BindingId {
        if let Some(existing) = self.scope(scope).lookup_local(name) {
            return existing;
        }
        let id = BindingId(self.bindings.len() as u32);
        self.bindings.push(Binding {
            id,
            name: name.to_string(),
            kind,
            scope,
            is_captured: false,
            is_destructured: false,
            parameter_index: None,
            span,
        });
        let scope = self.scope_mut(scope);
        scope.bindings.push(id);
        scope.binding_index.insert(name.to_string(), id);
        id
    }

    pub(crate) fn add_reference(&mut self, scope: ScopeId, name: &str, is_write: bool) {
        self.scope_mut(scope).references.push(Reference {
            name: name.to_string(),
            is_write,
        });
    }
}

/// Iterator over strict ancestors, innermost first
pub struct Ancestors<'a> {
    tree: &'a ScopeTree,
    next: Option<ScopeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = ScopeId;

    fn next(&mut self) -> Option<ScopeId> {
        let current = self.next?;
        self.next = self.tree.scope(current).parent;
        Some(current)
    }
}
