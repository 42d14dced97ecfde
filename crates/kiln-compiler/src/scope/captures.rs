//! Capture analysis
//!
//! Resolves every recorded reference against the static scope chain and
//! annotates the tree in place:
//!
//! - a binding is captured when it is referenced from a different
//!   activation (callable or module main) than the one that declares it
//! - every scope on the path from a referencing scope up to (not including)
//!   the declaring scope is flagged `references_ancestor_bindings`
//!
//! Both properties are pure functions of the tree, so the single pass over
//! scopes in arena order reaches the same result as any other traversal.

use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use super::tree::{BindingId, ScopeId, ScopeKind, ScopeTree};

/// Result of a capture analysis run
#[derive(Debug, Clone, Default)]
pub struct CaptureSummary {
    /// Captured bindings, in binding order
    pub captured: Vec<BindingId>,
    /// Scopes flagged as referencing ancestor bindings, in scope order
    pub flagged: Vec<ScopeId>,
    /// Names that resolve to no binding, in first-use order
    pub globals: Vec<String>,
}

impl CaptureSummary {
    pub fn is_captured(&self, binding: BindingId) -> bool {
        self.captured.binary_search(&binding).is_ok()
    }
}

/// Annotates a [`ScopeTree`] with capture information
pub struct CaptureAnalyzer;

impl CaptureAnalyzer {
    pub fn analyze(tree: &mut ScopeTree) -> CaptureSummary {
        let mut captured: FxHashSet<BindingId> = FxHashSet::default();
        let mut flagged: FxHashSet<ScopeId> = FxHashSet::default();
        let mut globals = Vec::new();
        let mut seen_globals: FxHashSet<String> = FxHashSet::default();

        for index in 0..tree.len() {
            let scope_id = ScopeId::new(index as u32);
            let activation = tree.enclosing_activation(scope_id);

            for reference in &tree.scope(scope_id).references {
                let Some(binding_id) = tree.resolve(scope_id, &reference.name) else {
                    if seen_globals.insert(reference.name.clone()) {
                        globals.push(reference.name.clone());
                    }
                    continue;
                };
                let declaring = tree.binding(binding_id).scope;
                if declaring == scope_id {
                    continue;
                }

                if tree.enclosing_activation(declaring) != activation {
                    captured.insert(binding_id);
                }

                let mut current = scope_id;
                while current != declaring {
                    flagged.insert(current);
                    match tree.scope(current).parent {
                        Some(parent) => current = parent,
                        None => break,
                    }
                }
            }
        }

        // A class constructor stores the chain its instance methods read
        // from the receiver, so it needs one whenever they do.
        for index in 0..tree.len() {
            let class_id = ScopeId::new(index as u32);
            let class = tree.scope(class_id);
            if class.kind != ScopeKind::Class {
                continue;
            }
            let needs_chain = flagged.contains(&class_id)
                || class.children.iter().any(|&child| {
                    let child = tree.scope(child);
                    child.kind == ScopeKind::Method && !child.is_static && flagged.contains(&child.id)
                });
            if !needs_chain {
                continue;
            }
            let ctor = class
                .children
                .iter()
                .copied()
                .find(|&child| tree.scope(child).kind == ScopeKind::Constructor);
            if let Some(ctor) = ctor {
                flagged.insert(ctor);
            }
        }

        for &binding_id in &captured {
            tree.binding_mut(binding_id).is_captured = true;
        }
        for &scope_id in &flagged {
            tree.scope_mut(scope_id).references_ancestor_bindings = true;
        }

        let mut captured: Vec<_> = captured.into_iter().collect();
        captured.sort();
        let mut flagged: Vec<_> = flagged.into_iter().collect();
        flagged.sort();

        for &binding_id in &captured {
            let binding = tree.binding(binding_id);
            trace!(
                binding = %binding.name,
                scope = %tree.scope(binding.scope).qualified_name,
                "binding captured"
            );
        }
        debug!(
            module = tree.module_name(),
            captured = captured.len(),
            flagged = flagged.len(),
            globals = globals.len(),
            "capture analysis complete"
        );

        CaptureSummary {
            captured,
            flagged,
            globals,
        }
    }
}
