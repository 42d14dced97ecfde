//! Ancestor scope chain layout

use serde::Serialize;

use crate::scope::{ScopeId, ScopeName, ScopeTree};

/// One position in a scope chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeSlot {
    pub index: u32,
    pub scope: ScopeName,
}

/// Shape of the ancestor chain a callable receives, outermost first.
/// Slot 0 is always the module root when the chain is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ScopeChainLayout {
    slots: Vec<ScopeSlot>,
}

impl ScopeChainLayout {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Chain of the strict ancestors of `scope`
    pub fn for_ancestors(tree: &ScopeTree, scope: ScopeId) -> Self {
        let mut ancestors: Vec<ScopeId> = tree.ancestors(scope).collect();
        ancestors.reverse();
        let slots = ancestors
            .into_iter()
            .enumerate()
            .map(|(index, id)| ScopeSlot {
                index: index as u32,
                scope: tree.scope(id).qualified_name.clone(),
            })
            .collect();
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[ScopeSlot] {
        &self.slots
    }

    pub fn get(&self, index: u32) -> Option<&ScopeSlot> {
        self.slots.get(index as usize)
    }

    /// Chain index holding `scope`
    pub fn index_of(&self, scope: &ScopeName) -> Option<u32> {
        self.slots
            .iter()
            .find(|slot| &slot.scope == scope)
            .map(|slot| slot.index)
    }
}
