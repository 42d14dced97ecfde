//! Linear low-level instruction form
//!
//! Lowered callable bodies are flat instruction lists with inline labels,
//! unlimited temporaries and local slots, plus a table of protected
//! regions. Everything the emitter needs to produce protected-region
//! metadata and resume dispatch is expressed with labels, so bodies stay
//! backend-agnostic.

mod body;
mod instr;
mod pretty;
mod region;
mod verify;

use std::fmt;

use serde::Serialize;

pub use body::{Body, BodyBuilder};
pub use instr::{BinaryOp, ChainSource, Constant, Instr, ResumeKind, SuspendKind, UnaryOp};
pub use pretty::PrettyPrint;
pub use region::{ExceptionRegionInfo, RegionKind};
pub use verify::verify_regions;

macro_rules! lir_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub fn new(id: u32) -> Self {
                Self(id)
            }

            pub fn as_u32(&self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

lir_id!(
    /// Jump target placed inline with `Instr::Label`
    Label,
    "L"
);
lir_id!(
    /// Unlimited virtual register
    Temp,
    "t"
);
lir_id!(
    /// Activation local slot
    LocalSlot,
    "loc"
);
lir_id!(
    /// Index of a compiled callable within its module
    CallableId,
    "fn"
);
lir_id!(
    /// Resume state of a state machine; 0 means not started
    StateId,
    "state"
);

impl StateId {
    pub const INITIAL: StateId = StateId(0);
}
