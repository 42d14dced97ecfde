//! Pretty-printing for LIR
//!
//! Human-readable listings for debugging and snapshot-style tests.

use std::fmt;

use super::{Body, ChainSource, Constant, Instr, RegionKind};

/// Trait for pretty-printing LIR constructs
pub trait PrettyPrint {
    fn pretty_print(&self) -> String;
}

impl PrettyPrint for Body {
    fn pretty_print(&self) -> String {
        let mut output = String::new();
        for instr in &self.instrs {
            match instr {
                Instr::Label(label) => output.push_str(&format!("{}:\n", label)),
                other => output.push_str(&format!("  {}\n", other)),
            }
        }
        for region in &self.regions {
            let kind = match region.kind {
                RegionKind::Catch => "catch",
                RegionKind::Finally => "finally",
            };
            output.push_str(&format!(
                "; {} try [{}, {}) handler [{}, {})",
                kind, region.try_start, region.try_end, region.handler_start, region.handler_end
            ));
            if let Some(filter) = &region.exception_type_filter {
                output.push_str(&format!(" filter {}", filter));
            }
            output.push('\n');
        }
        output
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Undefined => write!(f, "undefined"),
            Constant::Null => write!(f, "null"),
            Constant::Bool(b) => write!(f, "{}", b),
            Constant::Number(n) => write!(f, "{}", n),
            Constant::String(s) => write!(f, "{:?}", s),
        }
    }
}

impl fmt::Display for ChainSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainSource::Parent(index) => write!(f, "chain[{}]", index),
            ChainSource::Own => write!(f, "own"),
            ChainSource::Block(scope) => write!(f, "block {}", scope),
            ChainSource::Null => write!(f, "null"),
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Label(label) => write!(f, "{}:", label),
            Instr::Const { dest, value } => write!(f, "{} = {}", dest, value),
            Instr::Move { dest, src } => write!(f, "{} = {}", dest, src),
            Instr::LoadLocal { dest, slot } => write!(f, "{} = {}", dest, slot),
            Instr::StoreLocal { slot, value } => write!(f, "{} = {}", slot, value),
            Instr::LoadArgument { dest, index } => write!(f, "{} = arg[{}]", dest, index),
            Instr::StoreArgument { index, value } => write!(f, "arg[{}] = {}", index, value),
            Instr::LoadScopeField { dest, field } => write!(f, "{} = scope {}", dest, field),
            Instr::StoreScopeField { field, value } => write!(f, "scope {} = {}", field, value),
            Instr::LoadParentScopeField {
                dest,
                chain_index,
                field,
            } => write!(f, "{} = chain[{}] {}", dest, chain_index, field),
            Instr::StoreParentScopeField {
                chain_index,
                field,
                value,
            } => write!(f, "chain[{}] {} = {}", chain_index, field, value),
            Instr::LoadGlobal { dest, name } => write!(f, "{} = global {}", dest, name),
            Instr::StoreGlobal { name, value } => write!(f, "global {} = {}", name, value),
            Instr::LoadThis { dest } => write!(f, "{} = this", dest),
            Instr::LoadCallee { dest } => write!(f, "{} = callee", dest),
            Instr::CreateScopeInstance { scope } => write!(f, "create_scope {}", scope),
            Instr::EnterBlockScope { scope } => write!(f, "enter_block {}", scope),
            Instr::RenewBlockScope { scope } => write!(f, "renew_block {}", scope),
            Instr::StoreScopesOnReceiver => write!(f, "store_scopes_on_receiver"),
            Instr::MakeClosure {
                dest,
                callable,
                chain,
            } => write!(f, "{} = closure {} [{}]", dest, callable, join(chain)),
            Instr::MakeClass {
                dest,
                name,
                constructor,
                methods,
                chain,
            } => {
                let methods: Vec<String> = methods
                    .iter()
                    .map(|(name, id)| format!("{}: {}", name, id))
                    .collect();
                write!(
                    f,
                    "{} = class {} ctor {} {{{}}} [{}]",
                    dest,
                    name,
                    constructor,
                    methods.join(", "),
                    join(chain)
                )
            }
            Instr::Unary { dest, op, operand } => write!(f, "{} = {}{}", dest, op.symbol(), operand),
            Instr::Binary {
                dest,
                op,
                left,
                right,
            } => write!(f, "{} = {} {} {}", dest, left, op.symbol(), right),
            Instr::GetProperty { dest, object, name } => write!(f, "{} = {}.{}", dest, object, name),
            Instr::SetProperty {
                object,
                name,
                value,
            } => write!(f, "{}.{} = {}", object, name, value),
            Instr::GetIndex { dest, object, index } => write!(f, "{} = {}[{}]", dest, object, index),
            Instr::SetIndex {
                object,
                index,
                value,
            } => write!(f, "{}[{}] = {}", object, index, value),
            Instr::NewArray { dest, elements } => write!(f, "{} = [{}]", dest, join(elements)),
            Instr::NewObject { dest } => write!(f, "{} = {{}}", dest),
            Instr::Call { dest, callee, args } => {
                write!(f, "{} = call {}({})", dest, callee, join(args))
            }
            Instr::CallMethod {
                dest,
                object,
                name,
                args,
            } => write!(f, "{} = call {}.{}({})", dest, object, name, join(args)),
            Instr::Construct { dest, callee, args } => {
                write!(f, "{} = new {}({})", dest, callee, join(args))
            }
            Instr::GetIterator { dest, iterable } => write!(f, "{} = iter {}", dest, iterable),
            Instr::IteratorStep {
                iterator,
                done,
                value,
            } => write!(f, "{}, {} = step {}", done, value, iterator),
            Instr::IteratorClose { iterator } => write!(f, "close {}", iterator),
            Instr::EnumerateKeys { dest, object } => write!(f, "{} = keys {}", dest, object),
            Instr::Branch { target } => write!(f, "br {}", target),
            Instr::BranchIfTrue { cond, target } => write!(f, "br_true {}, {}", cond, target),
            Instr::BranchIfFalse { cond, target } => write!(f, "br_false {}, {}", cond, target),
            Instr::Leave { target } => write!(f, "leave {}", target),
            Instr::Throw { value } => write!(f, "throw {}", value),
            Instr::Return { value } => write!(f, "return {}", value),
            Instr::StoreException { dest } => write!(f, "{} = exception", dest),
            Instr::GeneratorStateSwitch { cases } => {
                let cases: Vec<String> = cases
                    .iter()
                    .map(|(state, label)| format!("{} => {}", state, label))
                    .collect();
                write!(f, "switch_state [{}]", cases.join(", "))
            }
            Instr::Suspend { kind, value, state } => {
                write!(f, "suspend {:?} {} -> {}", kind, value, state)
            }
            Instr::ClearResumeState => write!(f, "clear_resume_state"),
            Instr::LoadResumeKind { dest } => write!(f, "{} = resume_kind", dest),
            Instr::LoadResumeValue { dest } => write!(f, "{} = resume_value", dest),
            Instr::DelegateResume {
                iterator,
                mode,
                value,
                done,
                result,
            } => write!(
                f,
                "{}, {} = delegate {}({}, {})",
                done, result, iterator, mode, value
            ),
        }
    }
}
