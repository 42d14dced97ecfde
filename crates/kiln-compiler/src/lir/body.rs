//! Lowered bodies and their builder

use rustc_hash::FxHashMap;
use serde::Serialize;

use super::{ExceptionRegionInfo, Instr, Label, LocalSlot, Temp};

/// A lowered callable body
#[derive(Debug, Clone, Serialize)]
pub struct Body {
    pub instrs: Vec<Instr>,
    pub regions: Vec<ExceptionRegionInfo>,
    pub temp_count: u32,
    pub local_count: u32,
    #[serde(skip)]
    label_positions: FxHashMap<Label, usize>,
}

impl Body {
    /// Instruction index of a label. Labels defined more than once resolve
    /// to their first definition; the verifier rejects those bodies.
    pub fn label_position(&self, label: Label) -> Option<usize> {
        self.label_positions.get(&label).copied()
    }

    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }
}

/// Incrementally assembles a [`Body`]
#[derive(Debug, Default)]
pub struct BodyBuilder {
    instrs: Vec<Instr>,
    regions: Vec<ExceptionRegionInfo>,
    next_temp: u32,
    next_local: u32,
    next_label: u32,
}

impl BodyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_temp(&mut self) -> Temp {
        let temp = Temp(self.next_temp);
        self.next_temp += 1;
        temp
    }

    pub fn new_local(&mut self) -> LocalSlot {
        let slot = LocalSlot(self.next_local);
        self.next_local += 1;
        slot
    }

    pub fn new_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    pub fn emit(&mut self, instr: Instr) {
        self.instrs.push(instr);
    }

    pub fn place(&mut self, label: Label) {
        self.instrs.push(Instr::Label(label));
    }

    /// Index the next emitted instruction will get
    pub fn position(&self) -> usize {
        self.instrs.len()
    }

    /// Replace a previously emitted instruction (resume switches are
    /// emitted as placeholders and filled once all states are known)
    pub fn patch(&mut self, position: usize, instr: Instr) {
        if let Some(slot) = self.instrs.get_mut(position) {
            *slot = instr;
        }
    }

    /// Whether the last emitted instruction ends straight-line flow
    pub fn is_terminated(&self) -> bool {
        self.instrs.last().is_some_and(Instr::is_terminator)
    }

    pub fn add_region(&mut self, region: ExceptionRegionInfo) {
        self.regions.push(region);
    }

    pub fn finish(self) -> Body {
        let mut label_positions = FxHashMap::default();
        for (index, instr) in self.instrs.iter().enumerate() {
            if let Instr::Label(label) = instr {
                label_positions.entry(*label).or_insert(index);
            }
        }
        Body {
            instrs: self.instrs,
            regions: self.regions,
            temp_count: self.next_temp,
            local_count: self.next_local,
            label_positions,
        }
    }
}
