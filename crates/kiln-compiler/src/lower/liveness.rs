//! Temp liveness over a lowered body
//!
//! Backward dataflow over instruction positions. Exception edges are
//! conservative: every instruction inside a try range may transfer to that
//! region's handler. Used to report which temporaries must survive each
//! suspension.

use crate::error::{CompileError, CompileResult};
use crate::lir::{Body, Instr, Label, Temp};

struct TempSet {
    words: Vec<u64>,
}

impl TempSet {
    fn new(temp_count: u32) -> Self {
        Self {
            words: vec![0; (temp_count as usize).div_ceil(64)],
        }
    }

    fn insert(&mut self, temp: Temp) {
        let i = temp.as_u32() as usize;
        if let Some(word) = self.words.get_mut(i / 64) {
            *word |= 1 << (i % 64);
        }
    }

    fn remove(&mut self, temp: Temp) {
        let i = temp.as_u32() as usize;
        if let Some(word) = self.words.get_mut(i / 64) {
            *word &= !(1 << (i % 64));
        }
    }

    /// Union `other` into `self`, reporting whether anything changed
    fn union_with(&mut self, other: &TempSet) -> bool {
        let mut changed = false;
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            let merged = *a | *b;
            changed |= merged != *a;
            *a = merged;
        }
        changed
    }

    fn temps(&self) -> Vec<Temp> {
        let mut out = Vec::new();
        for (w, word) in self.words.iter().enumerate() {
            for bit in 0..64 {
                if word & (1u64 << bit) != 0 {
                    out.push(Temp((w * 64 + bit) as u32));
                }
            }
        }
        out
    }
}

fn position_of(body: &Body, callable: &str, label: Label) -> CompileResult<usize> {
    body.label_position(label).ok_or_else(|| {
        CompileError::internal(format!("{}: label {} is referenced but never placed", callable, label))
    })
}

fn successors(body: &Body, callable: &str, position: usize) -> CompileResult<Vec<usize>> {
    let instr = &body.instrs[position];
    let mut succ = instr
        .jump_targets()
        .into_iter()
        .map(|label| position_of(body, callable, label))
        .collect::<CompileResult<Vec<usize>>>()?;
    if !instr.is_terminator() && position + 1 < body.instrs.len() {
        succ.push(position + 1);
    }
    for region in &body.regions {
        let start = position_of(body, callable, region.try_start)?;
        let end = position_of(body, callable, region.try_end)?;
        if start <= position && position < end {
            succ.push(position_of(body, callable, region.handler_start)?);
        }
    }
    Ok(succ)
}

/// Temps live on entry to each of `positions` in `callable`'s body. A jump
/// or region naming a label that was never placed is an internal error.
pub fn live_temps_at(body: &Body, callable: &str, positions: &[usize]) -> CompileResult<Vec<Vec<Temp>>> {
    let len = body.instrs.len();
    let succs = (0..len)
        .map(|i| successors(body, callable, i))
        .collect::<CompileResult<Vec<_>>>()?;
    let mut live_in: Vec<TempSet> = (0..len).map(|_| TempSet::new(body.temp_count)).collect();

    let mut changed = true;
    while changed {
        changed = false;
        for i in (0..len).rev() {
            let mut set = TempSet::new(body.temp_count);
            for &s in &succs[i] {
                set.union_with(&live_in[s]);
            }
            let instr: &Instr = &body.instrs[i];
            for def in instr.defs() {
                set.remove(def);
            }
            for used in instr.uses() {
                set.insert(used);
            }
            if live_in[i].union_with(&set) {
                changed = true;
            }
        }
    }

    Ok(positions
        .iter()
        .map(|&p| live_in.get(p).map(TempSet::temps).unwrap_or_default())
        .collect())
}
