//! Environment layout
//!
//! Per-callable calling convention, ancestor chain shape and binding
//! storage, built from an analyzed [`ScopeTree`](crate::scope::ScopeTree).

mod callable;
mod chain;
mod layout;
mod storage;

pub use callable::{CallableAbi, CallableKind, ScopesSource, MAX_SUPPORTED_DELEGATE_ARITY};
pub use chain::{ScopeChainLayout, ScopeSlot};
pub use layout::{EnvironmentLayout, EnvironmentLayoutBuilder, StorageEntry};
pub use storage::{BindingStorage, FieldId};
