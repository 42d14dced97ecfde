//! Binding storage kinds

use std::fmt;

use serde::Serialize;

use crate::scope::ScopeName;

/// Identifier of a field on a scope record. The emitter maps it to its own
/// storage handle; the core only ever deals in these names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FieldId {
    /// Scope whose record holds the field
    pub scope: ScopeName,
    pub name: String,
}

impl FieldId {
    pub fn new(scope: ScopeName, name: impl Into<String>) -> Self {
        Self {
            scope,
            name: name.into(),
        }
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.scope, self.name)
    }
}

/// Where the value of a binding lives inside one callable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum BindingStorage {
    /// Register/local slot of the activation
    Local,
    /// Incoming argument at a source parameter position
    Argument { parameter_index: u32 },
    /// Field on a scope record created by this callable
    OwnScopeField { field: FieldId },
    /// Field on an ancestor's scope record, reached through the chain
    AncestorScopeField { field: FieldId, chain_index: u32 },
}

impl BindingStorage {
    /// Check if the binding lives on a scope record
    pub fn is_scope_field(&self) -> bool {
        matches!(
            self,
            BindingStorage::OwnScopeField { .. } | BindingStorage::AncestorScopeField { .. }
        )
    }

    pub fn field(&self) -> Option<&FieldId> {
        match self {
            BindingStorage::OwnScopeField { field }
            | BindingStorage::AncestorScopeField { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl fmt::Display for BindingStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingStorage::Local => write!(f, "local"),
            BindingStorage::Argument { parameter_index } => write!(f, "arg[{}]", parameter_index),
            BindingStorage::OwnScopeField { field } => write!(f, "own {}", field),
            BindingStorage::AncestorScopeField { field, chain_index } => {
                write!(f, "chain[{}] {}", chain_index, field)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_serialize() {
        let storage = BindingStorage::AncestorScopeField {
            field: FieldId::new(ScopeName::new("main/outer"), "o"),
            chain_index: 1,
        };
        assert_eq!(storage.to_string(), "chain[1] main/outer::o");
        assert!(storage.is_scope_field());

        let json = serde_json::to_string(&storage).unwrap();
        assert_eq!(
            json,
            r#"{"kind":"AncestorScopeField","field":{"scope":"main/outer","name":"o"},"chain_index":1}"#
        );
        assert!(!BindingStorage::Local.is_scope_field());
    }
}
