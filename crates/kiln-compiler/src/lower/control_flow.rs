//! Control Flow Lowering Utilities
//!
//! Break, continue and return targets during lowering. Loops, switches,
//! labeled blocks and pending finally bodies share one stack, so an abrupt exit
//! can find every construct it crosses in nesting order.

use crate::lir::{Label, Temp};

/// Kind of structured jump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    Break,
    Continue,
}

/// Completion record codes stored in a finally's kind temp. Codes from
/// `FIRST_JUMP_CODE` up identify break/continue jumps routed through it.
pub mod completion {
    pub const NORMAL: f64 = 0.0;
    pub const THROW: f64 = 1.0;
    pub const RETURN: f64 = 2.0;
    pub const FIRST_JUMP_CODE: u32 = 3;
}

/// A jump target: a loop, a switch or a labeled statement
#[derive(Debug, Clone)]
pub struct LoopContext {
    /// Label to jump to for 'break'
    pub break_label: Label,
    /// Label to jump to for 'continue'; `None` for switches and labeled
    /// non-loops
    pub continue_label: Option<Label>,
    /// Unlabeled `break` stops here even though this is not a loop
    pub is_switch: bool,
    /// Statement labels naming this target
    pub labels: Vec<String>,
    /// Iterator of a for-of loop, closed when the loop is exited early
    pub iterator: Option<Temp>,
    /// Protected region depth at the loop statement
    pub protected_depth: u32,
}

impl LoopContext {
    /// Create a new loop context
    pub fn new(break_label: Label, continue_label: Label, protected_depth: u32) -> Self {
        Self {
            break_label,
            continue_label: Some(continue_label),
            is_switch: false,
            labels: Vec::new(),
            iterator: None,
            protected_depth,
        }
    }

    /// Labeled statement that is not a loop: only `break label` targets it
    pub fn labeled_block(break_label: Label, label: impl Into<String>, protected_depth: u32) -> Self {
        Self {
            break_label,
            continue_label: None,
            is_switch: false,
            labels: vec![label.into()],
            iterator: None,
            protected_depth,
        }
    }

    /// A switch statement: the innermost target of an unlabeled `break`,
    /// transparent to an unlabeled `continue`
    pub fn switch(break_label: Label, protected_depth: u32) -> Self {
        Self {
            break_label,
            continue_label: None,
            is_switch: true,
            labels: Vec::new(),
            iterator: None,
            protected_depth,
        }
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_iterator(mut self, iterator: Temp) -> Self {
        self.iterator = Some(iterator);
        self
    }

    pub fn is_loop(&self) -> bool {
        self.continue_label.is_some()
    }

    /// Unlabeled continue targets the innermost loop, unlabeled break the
    /// innermost loop or switch
    fn matches(&self, kind: JumpKind, label: Option<&str>) -> bool {
        match (label, kind) {
            (Some(l), _) => self.labels.iter().any(|own| own == l),
            (None, JumpKind::Break) => self.is_loop() || self.is_switch,
            (None, JumpKind::Continue) => self.is_loop(),
        }
    }
}

/// A jump routed through a finally body, replayed after it completes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingJump {
    pub code: u32,
    pub kind: JumpKind,
    pub label: Option<String>,
}

/// A try statement whose finally body has not been emitted yet
#[derive(Debug, Clone)]
pub struct FinallyContext {
    /// Completion kind (see [`completion`])
    pub kind: Temp,
    /// Exception or return value of the completion
    pub value: Temp,
    /// Start of the finally body
    pub entry: Label,
    pub jumps: Vec<PendingJump>,
}

impl FinallyContext {
    pub fn new(kind: Temp, value: Temp, entry: Label) -> Self {
        Self {
            kind,
            value,
            entry,
            jumps: Vec::new(),
        }
    }

    /// Code for a jump leaving through this finally, reusing an existing
    /// code for an identical jump
    pub fn register_jump(&mut self, kind: JumpKind, label: Option<&str>) -> u32 {
        if let Some(existing) = self
            .jumps
            .iter()
            .find(|j| j.kind == kind && j.label.as_deref() == label)
        {
            return existing.code;
        }
        let code = completion::FIRST_JUMP_CODE + self.jumps.len() as u32;
        self.jumps.push(PendingJump {
            code,
            kind,
            label: label.map(str::to_string),
        });
        code
    }
}

#[derive(Debug, Clone)]
pub enum ControlEntry {
    Loop(LoopContext),
    Finally(FinallyContext),
}

/// Stack of active jump targets and pending finally bodies
#[derive(Debug, Default)]
pub struct ControlStack {
    stack: Vec<ControlEntry>,
}

impl ControlStack {
    /// Create a new empty control stack
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_loop(&mut self, ctx: LoopContext) {
        self.stack.push(ControlEntry::Loop(ctx));
    }

    pub fn push_finally(&mut self, ctx: FinallyContext) {
        self.stack.push(ControlEntry::Finally(ctx));
    }

    pub fn pop(&mut self) -> Option<ControlEntry> {
        self.stack.pop()
    }

    /// Pop the innermost entry, which must be a finally
    pub fn pop_finally(&mut self) -> Option<FinallyContext> {
        match self.stack.pop() {
            Some(ControlEntry::Finally(ctx)) => Some(ctx),
            Some(other) => {
                self.stack.push(other);
                None
            }
            None => None,
        }
    }

    /// Index of the innermost target of a break/continue
    pub fn find_target(&self, kind: JumpKind, label: Option<&str>) -> Option<usize> {
        self.stack.iter().rposition(|entry| match entry {
            ControlEntry::Loop(ctx) => ctx.matches(kind, label),
            ControlEntry::Finally(_) => false,
        })
    }

    pub fn get(&self, index: usize) -> Option<&ControlEntry> {
        self.stack.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ControlEntry> {
        self.stack.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}
