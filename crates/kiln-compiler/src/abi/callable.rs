//! Calling convention descriptors

use std::fmt;

use serde::Serialize;

use crate::error::{CompileError, CompileResult};
use crate::scope::{ScopeId, ScopeKind, ScopeTree};

/// Largest physical argument count passed through a typed delegate
pub const MAX_SUPPORTED_DELEGATE_ARITY: u32 = 6;

/// How a callable is invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CallableKind {
    /// Functions, arrows and static methods
    Function,
    Constructor,
    /// Instance method on an already-constructed receiver
    ClassMethod,
    ModuleMain,
}

impl CallableKind {
    /// Kind of the callable compiled from `scope`
    pub fn of(tree: &ScopeTree, scope: ScopeId) -> CompileResult<Self> {
        let s = tree.scope(scope);
        match s.kind {
            ScopeKind::Module => Ok(CallableKind::ModuleMain),
            ScopeKind::Function | ScopeKind::Arrow => Ok(CallableKind::Function),
            ScopeKind::Constructor => Ok(CallableKind::Constructor),
            ScopeKind::Method if s.is_static => Ok(CallableKind::Function),
            ScopeKind::Method => Ok(CallableKind::ClassMethod),
            _ => Err(CompileError::UnknownScope {
                callable: s.qualified_name.to_string(),
                scope: format!("{} is a {:?} scope, not a callable", scope, s.kind),
            }),
        }
    }
}

impl fmt::Display for CallableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallableKind::Function => write!(f, "function"),
            CallableKind::Constructor => write!(f, "constructor"),
            CallableKind::ClassMethod => write!(f, "method"),
            CallableKind::ModuleMain => write!(f, "main"),
        }
    }
}

/// Where a callable gets its ancestor scope chain from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScopesSource {
    /// Explicit argument after the receiver
    Argument,
    /// Field stored on the receiver by its constructor
    ThisField,
    None,
}

/// Calling convention of one compiled callable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallableAbi {
    pub kind: CallableKind,
    /// Receives an implicit receiver in argument slot 0
    pub is_instance: bool,
    pub has_scopes_param: bool,
    pub scopes_source: ScopesSource,
    /// Declared parameters minus destructured bindings
    pub js_parameter_count: u32,
    /// Source parameter positions; each occupies one physical slot
    pub arity: u32,
}

impl CallableAbi {
    /// Select the calling convention for a callable of `kind`
    pub fn new(kind: CallableKind, needs_chain: bool, js_parameter_count: u32, arity: u32) -> Self {
        let (is_instance, has_scopes_param, scopes_source) = match kind {
            CallableKind::Function if needs_chain => (false, true, ScopesSource::Argument),
            CallableKind::Function => (false, false, ScopesSource::None),
            CallableKind::Constructor if needs_chain => (true, true, ScopesSource::Argument),
            CallableKind::Constructor => (true, false, ScopesSource::None),
            CallableKind::ClassMethod if needs_chain => (true, false, ScopesSource::ThisField),
            CallableKind::ClassMethod => (true, false, ScopesSource::None),
            CallableKind::ModuleMain => (false, false, ScopesSource::None),
        };
        Self {
            kind,
            is_instance,
            has_scopes_param,
            scopes_source,
            js_parameter_count,
            arity,
        }
    }

    /// Physical slot of the scope chain argument
    pub fn scopes_arg_index(&self) -> Option<u32> {
        self.has_scopes_param
            .then_some(if self.is_instance { 1 } else { 0 })
    }

    /// Physical slot of the parameter at source position `index`
    pub fn js_param_to_arg_index(&self, index: u32) -> u32 {
        let receiver = if self.is_instance { 1 } else { 0 };
        let scopes = if self.has_scopes_param { 1 } else { 0 };
        receiver + scopes + index
    }

    /// Receiver, chain and parameter slots together
    pub fn physical_arg_count(&self) -> u32 {
        self.js_param_to_arg_index(self.arity)
    }

    /// Whether the callable reads an ancestor chain at all
    pub fn has_chain(&self) -> bool {
        self.scopes_source != ScopesSource::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_abi() {
        let abi = CallableAbi::new(CallableKind::Function, false, 2, 2);
        assert_eq!(abi.scopes_source, ScopesSource::None);
        assert_eq!(abi.scopes_arg_index(), None);
        assert_eq!(abi.js_param_to_arg_index(0), 0);
        assert_eq!(abi.physical_arg_count(), 2);

        let abi = CallableAbi::new(CallableKind::Function, true, 2, 2);
        assert_eq!(abi.scopes_source, ScopesSource::Argument);
        assert_eq!(abi.scopes_arg_index(), Some(0));
        assert_eq!(abi.js_param_to_arg_index(0), 1);
        assert_eq!(abi.physical_arg_count(), 3);
    }

    #[test]
    fn test_constructor_and_method_abi() {
        let ctor = CallableAbi::new(CallableKind::Constructor, true, 1, 1);
        assert!(ctor.is_instance);
        assert_eq!(ctor.scopes_arg_index(), Some(1));
        assert_eq!(ctor.js_param_to_arg_index(0), 2);

        let method = CallableAbi::new(CallableKind::ClassMethod, true, 1, 1);
        assert!(method.is_instance);
        assert!(!method.has_scopes_param);
        assert_eq!(method.scopes_source, ScopesSource::ThisField);
        assert_eq!(method.js_param_to_arg_index(0), 1);
        assert!(method.has_chain());
    }

    #[test]
    fn test_module_main_never_has_chain() {
        let main = CallableAbi::new(CallableKind::ModuleMain, true, 0, 0);
        assert!(!main.has_chain());
        assert!(!main.is_instance);
    }
}
