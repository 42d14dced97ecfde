//! LIR instructions

use serde::Serialize;

use super::{CallableId, Label, LocalSlot, StateId, Temp};
use crate::abi::FieldId;
use crate::scope::ScopeName;

/// Immediate value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Constant {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

/// Binary operators handed to the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
    UnsignedShiftRight,
    InstanceOf,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Exp => "**",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::StrictEqual => "===",
            BinaryOp::StrictNotEqual => "!==",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
            BinaryOp::UnsignedShiftRight => ">>>",
            BinaryOp::InstanceOf => "instanceof",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOp {
    Plus,
    Negate,
    Not,
    BitNot,
    Typeof,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::Typeof => "typeof ",
        }
    }
}

/// What a suspension hands to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SuspendKind {
    /// `yield value`
    Yield,
    /// One step of a `yield*` delegation loop
    Delegate,
    /// `await value`
    Await,
}

/// How a suspended machine was resumed. Materialized as a number by
/// `LoadResumeKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResumeKind {
    Next = 0,
    Throw = 1,
    Return = 2,
}

impl ResumeKind {
    pub fn code(self) -> f64 {
        self as u8 as f64
    }

    pub fn from_code(code: f64) -> Option<Self> {
        match code as i64 {
            0 => Some(ResumeKind::Next),
            1 => Some(ResumeKind::Throw),
            2 => Some(ResumeKind::Return),
            _ => None,
        }
    }
}

/// Where one slot of a new closure's chain comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ChainSource {
    /// Slot of the creating callable's own incoming chain
    Parent(u32),
    /// The creating callable's own scope record
    Own,
    /// The live record of a block, loop, catch or class scope of the
    /// creating callable
    Block(ScopeName),
    /// Slot the callee never reads
    Null,
}

/// One LIR instruction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Instr {
    Label(Label),
    Const { dest: Temp, value: Constant },
    Move { dest: Temp, src: Temp },

    // ------------------------------------------------------------------
    // Binding access
    // ------------------------------------------------------------------
    LoadLocal { dest: Temp, slot: LocalSlot },
    StoreLocal { slot: LocalSlot, value: Temp },
    /// `index` is the source parameter position; the emitter maps it
    /// through `CallableAbi::js_param_to_arg_index`
    LoadArgument { dest: Temp, index: u32 },
    StoreArgument { index: u32, value: Temp },
    LoadScopeField { dest: Temp, field: FieldId },
    StoreScopeField { field: FieldId, value: Temp },
    LoadParentScopeField { dest: Temp, chain_index: u32, field: FieldId },
    StoreParentScopeField { chain_index: u32, field: FieldId, value: Temp },
    LoadGlobal { dest: Temp, name: String },
    StoreGlobal { name: String, value: Temp },
    LoadThis { dest: Temp },
    /// The running closure itself (named function expression self-binding)
    LoadCallee { dest: Temp },

    // ------------------------------------------------------------------
    // Scope records
    // ------------------------------------------------------------------
    /// Create the callable's own scope record
    CreateScopeInstance { scope: ScopeName },
    /// Install a fresh record for a block-level scope, replacing any
    /// previous record of the same scope
    EnterBlockScope { scope: ScopeName },
    /// Replace a block record with a copy of itself (per-iteration loop
    /// bindings)
    RenewBlockScope { scope: ScopeName },
    /// Constructor prologue: stash the incoming chain on the receiver for
    /// instance methods
    StoreScopesOnReceiver,
    MakeClosure { dest: Temp, callable: CallableId, chain: Vec<ChainSource> },
    MakeClass {
        dest: Temp,
        name: String,
        constructor: CallableId,
        /// Instance methods by name
        methods: Vec<(String, CallableId)>,
        /// Chain handed to the constructor
        chain: Vec<ChainSource>,
    },

    // ------------------------------------------------------------------
    // Runtime operations
    // ------------------------------------------------------------------
    Unary { dest: Temp, op: UnaryOp, operand: Temp },
    Binary { dest: Temp, op: BinaryOp, left: Temp, right: Temp },
    GetProperty { dest: Temp, object: Temp, name: String },
    SetProperty { object: Temp, name: String, value: Temp },
    GetIndex { dest: Temp, object: Temp, index: Temp },
    SetIndex { object: Temp, index: Temp, value: Temp },
    NewArray { dest: Temp, elements: Vec<Temp> },
    NewObject { dest: Temp },
    Call { dest: Temp, callee: Temp, args: Vec<Temp> },
    CallMethod { dest: Temp, object: Temp, name: String, args: Vec<Temp> },
    Construct { dest: Temp, callee: Temp, args: Vec<Temp> },
    GetIterator { dest: Temp, iterable: Temp },
    IteratorStep { iterator: Temp, done: Temp, value: Temp },
    IteratorClose { iterator: Temp },
    /// Iterator over the enumerable keys of `object`, as `for-in` sees them
    EnumerateKeys { dest: Temp, object: Temp },

    // ------------------------------------------------------------------
    // Control flow
    // ------------------------------------------------------------------
    Branch { target: Label },
    BranchIfTrue { cond: Temp, target: Label },
    BranchIfFalse { cond: Temp, target: Label },
    /// Jump that exits one or more protected regions
    Leave { target: Label },
    Throw { value: Temp },
    Return { value: Temp },
    /// First instruction of every handler: the in-flight exception
    StoreException { dest: Temp },

    // ------------------------------------------------------------------
    // State machines
    // ------------------------------------------------------------------
    /// Jump to the case matching the current state; falls through when no
    /// case matches (state 0 at the entry switch)
    GeneratorStateSwitch { cases: Vec<(StateId, Label)> },
    /// Record `state`, hand `value` to the caller and exit. Resumption
    /// re-enters at the entry switch.
    Suspend { kind: SuspendKind, value: Temp, state: StateId },
    /// Reset the state to "running" after dispatch reached a resume label
    ClearResumeState,
    LoadResumeKind { dest: Temp },
    LoadResumeValue { dest: Temp },
    /// Forward one resume event (`mode` is a `ResumeKind` code) to an
    /// inner iterator, reporting whether it finished and what it produced
    DelegateResume { iterator: Temp, mode: Temp, value: Temp, done: Temp, result: Temp },
}

impl Instr {
    /// Control never continues with the next instruction
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instr::Branch { .. } | Instr::Leave { .. } | Instr::Throw { .. } | Instr::Return { .. }
        )
    }

    /// Labels this instruction may transfer control to
    pub fn jump_targets(&self) -> Vec<Label> {
        match self {
            Instr::Branch { target }
            | Instr::BranchIfTrue { target, .. }
            | Instr::BranchIfFalse { target, .. }
            | Instr::Leave { target } => vec![*target],
            Instr::GeneratorStateSwitch { cases } => cases.iter().map(|(_, l)| *l).collect(),
            _ => Vec::new(),
        }
    }

    /// Temps read by this instruction
    pub fn uses(&self) -> Vec<Temp> {
        match self {
            Instr::Move { src, .. } => vec![*src],
            Instr::StoreLocal { value, .. }
            | Instr::StoreArgument { value, .. }
            | Instr::StoreScopeField { value, .. }
            | Instr::StoreParentScopeField { value, .. }
            | Instr::StoreGlobal { value, .. }
            | Instr::Throw { value }
            | Instr::Return { value }
            | Instr::Suspend { value, .. } => vec![*value],
            Instr::Unary { operand, .. } => vec![*operand],
            Instr::Binary { left, right, .. } => vec![*left, *right],
            Instr::GetProperty { object, .. } => vec![*object],
            Instr::SetProperty { object, value, .. } => vec![*object, *value],
            Instr::GetIndex { object, index, .. } => vec![*object, *index],
            Instr::SetIndex { object, index, value } => vec![*object, *index, *value],
            Instr::NewArray { elements, .. } => elements.clone(),
            Instr::Call { callee, args, .. } | Instr::Construct { callee, args, .. } => {
                let mut uses = vec![*callee];
                uses.extend(args.iter().copied());
                uses
            }
            Instr::CallMethod { object, args, .. } => {
                let mut uses = vec![*object];
                uses.extend(args.iter().copied());
                uses
            }
            Instr::GetIterator { iterable, .. } => vec![*iterable],
            Instr::EnumerateKeys { object, .. } => vec![*object],
            Instr::IteratorStep { iterator, .. } | Instr::IteratorClose { iterator } => {
                vec![*iterator]
            }
            Instr::BranchIfTrue { cond, .. } | Instr::BranchIfFalse { cond, .. } => vec![*cond],
            Instr::DelegateResume {
                iterator,
                mode,
                value,
                ..
            } => vec![*iterator, *mode, *value],
            _ => Vec::new(),
        }
    }

    /// Temps written by this instruction
    pub fn defs(&self) -> Vec<Temp> {
        match self {
            Instr::Const { dest, .. }
            | Instr::Move { dest, .. }
            | Instr::LoadLocal { dest, .. }
            | Instr::LoadArgument { dest, .. }
            | Instr::LoadScopeField { dest, .. }
            | Instr::LoadParentScopeField { dest, .. }
            | Instr::LoadGlobal { dest, .. }
            | Instr::LoadThis { dest }
            | Instr::LoadCallee { dest }
            | Instr::MakeClosure { dest, .. }
            | Instr::MakeClass { dest, .. }
            | Instr::Unary { dest, .. }
            | Instr::Binary { dest, .. }
            | Instr::GetProperty { dest, .. }
            | Instr::GetIndex { dest, .. }
            | Instr::NewArray { dest, .. }
            | Instr::NewObject { dest }
            | Instr::Call { dest, .. }
            | Instr::CallMethod { dest, .. }
            | Instr::Construct { dest, .. }
            | Instr::GetIterator { dest, .. }
            | Instr::EnumerateKeys { dest, .. }
            | Instr::StoreException { dest }
            | Instr::LoadResumeKind { dest }
            | Instr::LoadResumeValue { dest } => vec![*dest],
            Instr::IteratorStep { done, value, .. } => vec![*done, *value],
            Instr::DelegateResume { done, result, .. } => vec![*done, *result],
            _ => Vec::new(),
        }
    }
}
