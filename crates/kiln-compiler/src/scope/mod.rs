//! Scope analysis
//!
//! Builds the lexical scope tree of a module and annotates it with capture
//! information consumed by the environment layout builder.

mod builder;
mod captures;
mod tree;

pub use builder::ScopeTreeBuilder;
pub use captures::{CaptureAnalyzer, CaptureSummary};
pub use tree::{
    Ancestors, Binding, BindingId, BindingKind, Reference, Scope, ScopeId, ScopeKind, ScopeName,
    ScopeTree, RECEIVER_NAME,
};
